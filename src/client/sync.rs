use reqwest::StatusCode;

use crate::error::Error;
use crate::models::{MainDataUpdate, TorrentPeersUpdate};

impl super::Api {
    /// Fetch main data changes since `rid`.
    ///
    /// `rid = 0` requests a full snapshot; re-sending the last seen rid asks
    /// for a delta relative to it. Sections with no changes are omitted from
    /// the reply and decode to `None`.
    pub async fn main_data(&self, rid: i64) -> Result<MainDataUpdate, Error> {
        let query = vec![("rid".to_string(), rid.to_string())];
        let response = self.get("sync/maindata", query).await?;
        Self::ensure_success("sync/maindata", &response)?;
        Ok(response.json::<MainDataUpdate>().await?)
    }

    /// Fetch peer list changes for one torrent since `rid`.
    pub async fn torrent_peers(&self, hash: &str, rid: i64) -> Result<TorrentPeersUpdate, Error> {
        let query = vec![
            ("hash".to_string(), hash.to_string()),
            ("rid".to_string(), rid.to_string()),
        ];
        let response = self.get("sync/torrentPeers", query).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::TorrentNotFound {
                hash: hash.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(Error::unexpected_status("sync/torrentPeers", response.status()));
        }
        Ok(response.json::<TorrentPeersUpdate>().await?)
    }
}
