use std::time::Duration;

use reqwest::StatusCode;

use crate::error::Error;
use crate::models::{FilePriority, Torrent, TorrentTracker, TrackerStatus};
use crate::parameters::{TorrentAddOptions, TorrentFilterOptions};

use super::application::INCLUDE_TRACKERS_MIN;

fn join_hashes(hashes: &[String]) -> String {
    if hashes.is_empty() {
        "all".to_string()
    } else {
        hashes.join("|")
    }
}

impl super::Api {
    /// Get the torrent list from `torrents/info`.
    ///
    /// Filter names are translated to whichever spelling the connected
    /// server understands; `include_trackers` requires Web API 2.11.4.
    pub async fn torrents(
        &self,
        options: &TorrentFilterOptions,
    ) -> Result<Vec<Torrent>, Error> {
        let mut query: Vec<(String, String)> = Vec::new();

        if let Some(filter) = options.filter {
            use crate::parameters::TorrentFilter::{Paused, Resumed, Running, Stopped};
            // only the renamed filters need the app version
            let version = match filter {
                Paused | Stopped | Resumed | Running => self.filter_translation_version().await,
                _ => None,
            };
            query.push(("filter".to_string(), filter.wire_name(version).to_string()));
        }
        if let Some(category) = &options.category {
            query.push(("category".to_string(), category.clone()));
        }
        if let Some(tag) = &options.tag {
            query.push(("tag".to_string(), tag.clone()));
        }
        if let Some(sort) = options.sort {
            query.push(("sort".to_string(), sort.to_string()));
        }
        if options.reverse {
            query.push(("reverse".to_string(), "true".to_string()));
        }
        if let Some(limit) = options.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = options.offset {
            query.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(hashes) = &options.hashes {
            query.push(("hashes".to_string(), hashes.join("|")));
        }
        if options.include_trackers {
            if !self.supports_include_trackers().await {
                return Err(Error::UnsupportedVersion {
                    feature: "includeTrackers",
                    required: INCLUDE_TRACKERS_MIN,
                });
            }
            query.push(("includeTrackers".to_string(), "true".to_string()));
        }

        let response = self.get("torrents/info", query).await?;
        Self::ensure_success("torrents/info", &response)?;
        Ok(response.json::<Vec<Torrent>>().await?)
    }

    /// Get the tracker list of one torrent.
    pub async fn torrent_trackers(&self, hash: &str) -> Result<Vec<TorrentTracker>, Error> {
        let query = vec![("hash".to_string(), hash.to_string())];
        let response = self.get("torrents/trackers", query).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::TorrentNotFound {
                hash: hash.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(Error::unexpected_status("torrents/trackers", response.status()));
        }
        Ok(response.json::<Vec<TorrentTracker>>().await?)
    }

    /// Add torrents from magnet links, URLs or uploaded .torrent files.
    pub async fn add_torrent(&self, options: &TorrentAddOptions) -> Result<(), Error> {
        if options.urls.is_empty() && options.files.is_empty() {
            return Err(Error::EmptyTorrentSource);
        }

        let response = self
            .post_torrent_files("torrents/add", options.files.clone(), options.to_form())
            .await?;
        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::UNSUPPORTED_MEDIA_TYPE => Err(Error::Conflict {
                endpoint: "torrents/add".to_string(),
                reason: "torrent file is not valid",
            }),
            other => Err(Error::unexpected_status("torrents/add", other)),
        }
    }

    /// Delete torrents, optionally with their downloaded data.
    pub async fn delete_torrents(
        &self,
        hashes: &[String],
        delete_files: bool,
    ) -> Result<(), Error> {
        let form = vec![
            ("hashes".to_string(), join_hashes(hashes)),
            ("deleteFiles".to_string(), delete_files.to_string()),
        ];
        let response = self.post("torrents/delete", form).await?;
        Self::ensure_success("torrents/delete", &response)
    }

    /// Stop torrents; an empty slice means all. Routed to `torrents/pause`
    /// on servers older than Web API 2.11.
    pub async fn stop_torrents(&self, hashes: &[String]) -> Result<(), Error> {
        let (stop, _) = self.stop_start_endpoints().await;
        let form = vec![("hashes".to_string(), join_hashes(hashes))];
        let response = self.post(stop, form).await?;
        Self::ensure_success(stop, &response)
    }

    /// Start torrents; an empty slice means all. Routed to `torrents/resume`
    /// on servers older than Web API 2.11.
    pub async fn start_torrents(&self, hashes: &[String]) -> Result<(), Error> {
        let (_, start) = self.stop_start_endpoints().await;
        let form = vec![("hashes".to_string(), join_hashes(hashes))];
        let response = self.post(start, form).await?;
        Self::ensure_success(start, &response)
    }

    pub async fn recheck_torrents(&self, hashes: &[String]) -> Result<(), Error> {
        let form = vec![("hashes".to_string(), join_hashes(hashes))];
        let response = self.post("torrents/recheck", form).await?;
        Self::ensure_success("torrents/recheck", &response)
    }

    pub async fn reannounce_torrents(&self, hashes: &[String]) -> Result<(), Error> {
        let form = vec![("hashes".to_string(), join_hashes(hashes))];
        let response = self.post("torrents/reannounce", form).await?;
        Self::ensure_success("torrents/reannounce", &response)
    }

    /// Rename a torrent.
    pub async fn rename_torrent(&self, hash: &str, name: &str) -> Result<(), Error> {
        let form = vec![
            ("hash".to_string(), hash.to_string()),
            ("name".to_string(), name.to_string()),
        ];
        let response = self.post("torrents/rename", form).await?;
        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(Error::TorrentNotFound {
                hash: hash.to_string(),
            }),
            StatusCode::CONFLICT => Err(Error::Conflict {
                endpoint: "torrents/rename".to_string(),
                reason: "torrent name is empty",
            }),
            other => Err(Error::unexpected_status("torrents/rename", other)),
        }
    }

    /// Move torrents into a category; an empty name clears the category.
    pub async fn set_torrent_category(
        &self,
        hashes: &[String],
        category: &str,
    ) -> Result<(), Error> {
        let form = vec![
            ("hashes".to_string(), join_hashes(hashes)),
            ("category".to_string(), category.to_string()),
        ];
        let response = self.post("torrents/setCategory", form).await?;
        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::CONFLICT => Err(Error::CategoryNotFound {
                name: category.to_string(),
            }),
            other => Err(Error::unexpected_status("torrents/setCategory", other)),
        }
    }

    pub async fn add_torrent_tags(&self, hashes: &[String], tags: &[String]) -> Result<(), Error> {
        let form = vec![
            ("hashes".to_string(), join_hashes(hashes)),
            ("tags".to_string(), tags.join(",")),
        ];
        let response = self.post("torrents/addTags", form).await?;
        Self::ensure_success("torrents/addTags", &response)
    }

    pub async fn remove_torrent_tags(
        &self,
        hashes: &[String],
        tags: &[String],
    ) -> Result<(), Error> {
        let form = vec![
            ("hashes".to_string(), join_hashes(hashes)),
            ("tags".to_string(), tags.join(",")),
        ];
        let response = self.post("torrents/removeTags", form).await?;
        Self::ensure_success("torrents/removeTags", &response)
    }

    pub async fn create_category(&self, name: &str, save_path: &str) -> Result<(), Error> {
        if name.is_empty() {
            return Err(Error::InvalidCategoryName {
                name: name.to_string(),
            });
        }
        let form = vec![
            ("category".to_string(), name.to_string()),
            ("savePath".to_string(), save_path.to_string()),
        ];
        let response = self.post("torrents/createCategory", form).await?;
        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT => Err(Error::InvalidCategoryName {
                name: name.to_string(),
            }),
            other => Err(Error::unexpected_status("torrents/createCategory", other)),
        }
    }

    pub async fn edit_category(&self, name: &str, save_path: &str) -> Result<(), Error> {
        let form = vec![
            ("category".to_string(), name.to_string()),
            ("savePath".to_string(), save_path.to_string()),
        ];
        let response = self.post("torrents/editCategory", form).await?;
        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::BAD_REQUEST => Err(Error::InvalidCategoryName {
                name: name.to_string(),
            }),
            StatusCode::CONFLICT => Err(Error::CategoryNotFound {
                name: name.to_string(),
            }),
            other => Err(Error::unexpected_status("torrents/editCategory", other)),
        }
    }

    /// Remove categories; the wire format is a newline-delimited name list.
    pub async fn remove_categories(&self, names: &[String]) -> Result<(), Error> {
        let form = vec![("categories".to_string(), names.join("\n"))];
        let response = self.post("torrents/removeCategories", form).await?;
        Self::ensure_success("torrents/removeCategories", &response)
    }

    /// Move torrent data to a new location.
    pub async fn set_torrent_location(
        &self,
        hashes: &[String],
        location: &str,
    ) -> Result<(), Error> {
        if location.is_empty() {
            return Err(Error::EmptySavePath);
        }
        let form = vec![
            ("hashes".to_string(), join_hashes(hashes)),
            ("location".to_string(), location.to_string()),
        ];
        let response = self.post("torrents/setLocation", form).await?;
        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::BAD_REQUEST => Err(Error::EmptySavePath),
            StatusCode::CONFLICT => Err(Error::Conflict {
                endpoint: "torrents/setLocation".to_string(),
                reason: "unable to create save path directory",
            }),
            other => Err(Error::unexpected_status("torrents/setLocation", other)),
        }
    }

    /// Connect torrents to extra peers, given as `ip:port`.
    pub async fn add_torrent_peers(&self, hashes: &[String], peers: &[String]) -> Result<(), Error> {
        if peers.is_empty() || peers.iter().any(|p| !p.contains(':')) {
            return Err(Error::InvalidPeers);
        }
        let form = vec![
            ("hashes".to_string(), join_hashes(hashes)),
            ("peers".to_string(), peers.join("|")),
        ];
        let response = self.post("torrents/addPeers", form).await?;
        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::BAD_REQUEST => Err(Error::InvalidPeers),
            other => Err(Error::unexpected_status("torrents/addPeers", other)),
        }
    }

    /// Set the download priority of files within a torrent.
    pub async fn set_file_priority(
        &self,
        hash: &str,
        file_ids: &[i64],
        priority: FilePriority,
    ) -> Result<(), Error> {
        let ids = file_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join("|");
        let form = vec![
            ("hash".to_string(), hash.to_string()),
            ("id".to_string(), ids),
            ("priority".to_string(), (priority as u8).to_string()),
        ];
        let response = self.post("torrents/filePrio", form).await?;
        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::BAD_REQUEST => Err(Error::InvalidPriority),
            StatusCode::NOT_FOUND => Err(Error::TorrentNotFound {
                hash: hash.to_string(),
            }),
            StatusCode::CONFLICT => Err(Error::MetadataNotReady),
            other => Err(Error::unexpected_status("torrents/filePrio", other)),
        }
    }

    pub async fn increase_torrent_priority(&self, hashes: &[String]) -> Result<(), Error> {
        self.queue_move("torrents/increasePrio", hashes).await
    }

    pub async fn decrease_torrent_priority(&self, hashes: &[String]) -> Result<(), Error> {
        self.queue_move("torrents/decreasePrio", hashes).await
    }

    pub async fn top_torrent_priority(&self, hashes: &[String]) -> Result<(), Error> {
        self.queue_move("torrents/topPrio", hashes).await
    }

    pub async fn bottom_torrent_priority(&self, hashes: &[String]) -> Result<(), Error> {
        self.queue_move("torrents/bottomPrio", hashes).await
    }

    /// Queue position moves share one contract: 409 when queueing is off.
    async fn queue_move(&self, endpoint: &str, hashes: &[String]) -> Result<(), Error> {
        let form = vec![("hashes".to_string(), join_hashes(hashes))];
        let response = self.post(endpoint, form).await?;
        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::CONFLICT => Err(Error::QueueingDisabled),
            other => Err(Error::unexpected_status(endpoint, other)),
        }
    }

    /// Reannounce until some tracker reports working, waiting `interval`
    /// between rounds. Gives up with an error once `max_attempts` rounds
    /// have passed.
    pub async fn reannounce_until_working(
        &self,
        hash: &str,
        max_attempts: u32,
        interval: Duration,
    ) -> Result<(), Error> {
        for attempt in 0..max_attempts {
            if attempt > 0 {
                tokio::time::sleep(interval).await;
            }
            let trackers = self.torrent_trackers(hash).await?;
            if trackers.iter().any(|t| t.status == TrackerStatus::Ok) {
                return Ok(());
            }
            self.reannounce_torrents(&[hash.to_string()]).await?;
        }
        Err(Error::ReannounceBudgetExceeded {
            hash: hash.to_string(),
        })
    }
}
