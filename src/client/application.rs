use crate::error::Error;
use crate::models::Preferences;
use crate::version::ApiVersion;

/// `torrents/info` can embed tracker lists from this Web API version on.
pub(crate) const INCLUDE_TRACKERS_MIN: ApiVersion = ApiVersion::new(2, 11, 4);
/// `torrents/pause`/`resume` became `torrents/stop`/`start` here.
const STOP_START_MIN: ApiVersion = ApiVersion::new(2, 11, 0);

impl super::Api {
    /// Get the Web API version, e.g. `2.11.2`.
    ///
    /// Fetched once per client and cached; the version gates below consult
    /// the cache.
    pub async fn webapi_version(&self) -> Result<ApiVersion, Error> {
        if let Some(version) = *self.webapi_version.read().await {
            return Ok(version);
        }

        let response = self.get("app/webapiVersion", Vec::new()).await?;
        Self::ensure_success("app/webapiVersion", &response)?;
        let version: ApiVersion = response.text().await?.parse()?;
        *self.webapi_version.write().await = Some(version);
        Ok(version)
    }

    /// Get the application version, e.g. `4.6.0` (the `v` prefix the server
    /// sends is stripped).
    pub async fn app_version(&self) -> Result<ApiVersion, Error> {
        if let Some(version) = *self.app_version.read().await {
            return Ok(version);
        }

        let response = self.get("app/version", Vec::new()).await?;
        Self::ensure_success("app/version", &response)?;
        let version: ApiVersion = response.text().await?.parse()?;
        *self.app_version.write().await = Some(version);
        Ok(version)
    }

    /// Whether the connected server accepts `includeTrackers` on
    /// `torrents/info`. Unreachable or unparsable version info reads as
    /// unsupported.
    pub async fn supports_include_trackers(&self) -> bool {
        self.webapi_version()
            .await
            .map(|v| v >= INCLUDE_TRACKERS_MIN)
            .unwrap_or(false)
    }

    /// The pause/resume endpoint pair for the connected server.
    pub(crate) async fn stop_start_endpoints(&self) -> (&'static str, &'static str) {
        match self.webapi_version().await {
            Ok(v) if v < STOP_START_MIN => ("torrents/pause", "torrents/resume"),
            _ => ("torrents/stop", "torrents/start"),
        }
    }

    /// The application version used for filter-name translation, if it can
    /// be discovered.
    pub(crate) async fn filter_translation_version(&self) -> Option<ApiVersion> {
        self.app_version().await.ok()
    }

    /// Get the application preferences.
    pub async fn preferences(&self) -> Result<Preferences, Error> {
        let response = self.get("app/preferences", Vec::new()).await?;
        Self::ensure_success("app/preferences", &response)?;
        Ok(response.json::<Preferences>().await?)
    }

    /// Get the default save path, e.g. `/home/user/Downloads`.
    pub async fn default_save_path(&self) -> Result<String, Error> {
        let response = self.get("app/defaultSavePath", Vec::new()).await?;
        Self::ensure_success("app/defaultSavePath", &response)?;
        Ok(response.text().await?)
    }
}
