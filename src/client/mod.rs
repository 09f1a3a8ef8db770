use std::str::FromStr;
use std::time::Duration;

use derive_builder::Builder;
use rand::Rng;
use reqwest::{
    Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode, Url,
    header::{self, HeaderMap},
    multipart,
};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{
    Credentials, LoginState,
    error::Error,
    parameters::TorrentFile,
    version::ApiVersion,
};

mod application;
mod authentication;
mod sync;
mod torrent;

/// Connection settings for [`Api`].
#[derive(Debug, Builder, Clone)]
pub struct ClientConfig {
    /// Base URL of the Web UI, e.g. `http://localhost:8080`
    #[builder(setter(into))]
    pub host: String,
    #[builder(setter(into), default)]
    pub username: String,
    #[builder(setter(into), default)]
    pub password: String,
    /// Username for HTTP Basic auth in front of the Web UI
    #[builder(setter(into, strip_option), default)]
    pub basic_user: Option<String>,
    #[builder(setter(into, strip_option), default)]
    pub basic_pass: Option<String>,
    /// Accept invalid TLS certificates
    #[builder(default)]
    pub tls_skip_verify: bool,
    /// Per-request timeout
    #[builder(setter(strip_option), default)]
    pub timeout: Option<Duration>,
    /// Attempt budget for requests failing at the connection level
    #[builder(default = "10")]
    pub max_retries: u32,
}

/// A request body in buffered form.
///
/// Requests are rebuilt from these owned parts on every retry, so a replayed
/// POST carries exactly the bytes of the first attempt.
#[derive(Debug, Clone)]
pub(crate) enum Payload {
    Empty,
    Form(Vec<(String, String)>),
    TorrentUpload {
        files: Vec<TorrentFile>,
        fields: Vec<(String, String)>,
    },
}

/// A client for the qBittorrent Web API.
///
/// Owns the HTTP connection pool, the session cookie and the discovered
/// server versions. All methods take `&self`; the client is safe to share
/// behind an `Arc`.
pub struct Api {
    http_client: ReqwestClient,
    base_url: Url,
    state: RwLock<LoginState>,
    basic_auth: Option<(String, String)>,
    max_retries: u32,
    webapi_version: RwLock<Option<ApiVersion>>,
    app_version: RwLock<Option<ApiVersion>>,
}

impl Api {
    /// Creates a new `Api` instance without contacting the server.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let mut builder = ReqwestClient::builder();
        if config.tls_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        let mut base_url = Url::from_str(&config.host)?;
        // join() resolves relative to the last path segment
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let state = if config.username.is_empty() {
            LoginState::Unknown
        } else {
            LoginState::NotLoggedIn {
                credentials: Credentials::new(config.username, config.password),
            }
        };

        let basic_auth = match (config.basic_user, config.basic_pass) {
            (Some(user), pass) => Some((user, pass.unwrap_or_default())),
            _ => None,
        };

        Ok(Self {
            http_client,
            base_url,
            state: RwLock::new(state),
            basic_auth,
            max_retries: config.max_retries.max(1),
            webapi_version: RwLock::new(None),
            app_version: RwLock::new(None),
        })
    }

    /// Creates a new `Api` instance and logs in immediately.
    pub async fn new_login(config: ClientConfig) -> Result<Self, Error> {
        let api = Self::new(config)?;
        api.login().await?;
        Ok(api)
    }

    pub async fn sid_cookie(&self) -> Option<String> {
        self.state.read().await.as_cookie()
    }

    /// Install a session cookie obtained elsewhere, skipping `login`.
    pub async fn set_sid_cookie(&self, value: &str) {
        let mut state = self.state.write().await;
        *state = state.add_cookie(value);
    }

    fn endpoint_url(&self, endpoint: &str, query: &[(String, String)]) -> Result<Url, Error> {
        let mut url = self.base_url.join(&format!("api/v2/{endpoint}"))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            drop(pairs);
        }
        Ok(url)
    }

    async fn build_request(&self, method: &Method, url: &Url, payload: &Payload) -> RequestBuilder {
        let mut header_map = HeaderMap::new();
        if let Some(cookie) = self.state.read().await.as_cookie() {
            let cookie = format!("SID={cookie}");
            if let Ok(value) = cookie.parse() {
                header_map.insert(header::COOKIE, value);
            }
        }

        let mut builder = self
            .http_client
            .request(method.clone(), url.clone())
            .headers(header_map);

        if let Some((user, pass)) = &self.basic_auth {
            builder = builder.basic_auth(user, Some(pass));
        }

        match payload {
            Payload::Empty => builder,
            Payload::Form(fields) => builder.form(fields),
            Payload::TorrentUpload { files, fields } => {
                let mut form = multipart::Form::new();
                for file in files {
                    let part = multipart::Part::bytes(file.data.to_vec())
                        .file_name(file.filename.clone());
                    form = form.part("torrents", part);
                }
                for (key, value) in fields {
                    form = form.text(key.clone(), value.clone());
                }
                builder.multipart(form)
            }
        }
    }

    /// Dispatch a request with the retry/re-login policy.
    ///
    /// Connection failures are retried with up to a second of random delay.
    /// A 403 means the session expired: re-login once per attempt, then
    /// replay the request. Timeouts and 5xx statuses are final.
    pub(crate) async fn request(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(String, String)],
        payload: Payload,
    ) -> Result<Response, Error> {
        {
            let state = self.state.read().await;
            if state.as_cookie().is_none() && state.credentials().is_some() {
                drop(state);
                self.login().await?;
            }
        }

        let url = self.endpoint_url(endpoint, query)?;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let builder = self.build_request(&method, &url, &payload).await;
            match builder.send().await {
                Err(err) => {
                    if !Error::retryable(&err) || attempts >= self.max_retries {
                        return Err(err.into());
                    }
                    let delay = Duration::from_millis(rand::rng().random_range(0..=1000));
                    debug!(endpoint, attempt = attempts, ?delay, "request failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Ok(response) if response.status() == StatusCode::FORBIDDEN => {
                    if attempts >= self.max_retries {
                        return Err(Error::unexpected_status(endpoint, response.status()));
                    }
                    warn!(endpoint, "session rejected, logging in again");
                    self.relogin().await?;
                }
                Ok(response) if response.status().is_server_error() => {
                    return Err(Error::unexpected_status(endpoint, response.status()));
                }
                Ok(response) => return Ok(response),
            }
        }
    }

    pub(crate) async fn get(
        &self,
        endpoint: &str,
        query: Vec<(String, String)>,
    ) -> Result<Response, Error> {
        self.request(Method::GET, endpoint, &query, Payload::Empty)
            .await
    }

    pub(crate) async fn post(
        &self,
        endpoint: &str,
        form: Vec<(String, String)>,
    ) -> Result<Response, Error> {
        self.request(Method::POST, endpoint, &[], Payload::Form(form))
            .await
    }

    pub(crate) async fn post_torrent_files(
        &self,
        endpoint: &str,
        files: Vec<TorrentFile>,
        fields: Vec<(String, String)>,
    ) -> Result<Response, Error> {
        self.request(
            Method::POST,
            endpoint,
            &[],
            Payload::TorrentUpload { files, fields },
        )
        .await
    }

    /// Translate a non-2xx status the endpoint contract does not cover.
    pub(crate) fn ensure_success(endpoint: &str, response: &Response) -> Result<(), Error> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::unexpected_status(endpoint, response.status()))
        }
    }

    /// A bare POST without cookie preflight or retry; `login` uses this.
    pub(crate) async fn post_basic(
        &self,
        endpoint: &str,
        form: Vec<(String, String)>,
    ) -> Result<Response, Error> {
        let url = self.endpoint_url(endpoint, &[])?;
        let mut builder = self.http_client.post(url).form(&form);
        if let Some((user, pass)) = &self.basic_auth {
            builder = builder.basic_auth(user, Some(pass));
        }
        Ok(builder.send().await?)
    }
}
