use std::fmt::Display;

use bytes::Bytes;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::version::ApiVersion;

/// Options for `torrents/info` and for filtering the local mirror.
#[derive(Debug, Default, Builder, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TorrentFilterOptions {
    /// Filter torrent list by state
    #[builder(setter(strip_option), default)]
    pub filter: Option<TorrentFilter>,
    /// Keep torrents with exactly this category (empty string means
    /// "without category")
    #[builder(setter(into, strip_option), default)]
    pub category: Option<String>,
    /// Keep torrents carrying exactly this tag
    #[builder(setter(into, strip_option), default)]
    pub tag: Option<String>,
    /// Sort torrents by the given field
    #[builder(setter(strip_option), default)]
    pub sort: Option<TorrentSort>,
    /// Reverse the sort order
    #[builder(default)]
    pub reverse: bool,
    /// Limit the number of torrents returned
    #[builder(setter(strip_option), default)]
    pub limit: Option<i64>,
    /// Skip this many torrents from the start of the sorted list
    #[builder(setter(strip_option), default)]
    pub offset: Option<i64>,
    /// Keep only torrents whose hash is in this list
    #[builder(setter(into, strip_option), default)]
    pub hashes: Option<Vec<String>>,
    /// Ask the server to embed each torrent's tracker list
    /// (requires Web API 2.11.4)
    #[builder(default)]
    pub include_trackers: bool,
}

/// State filters accepted by `torrents/info`.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TorrentFilter {
    #[default]
    All,
    Downloading,
    Uploading,
    Seeding,
    Completed,
    /// Pre-4.6.0 name of [`TorrentFilter::Stopped`]
    Paused,
    Stopped,
    Active,
    Inactive,
    /// Pre-4.6.0 name of [`TorrentFilter::Running`]
    Resumed,
    Running,
    Stalled,
    StalledUploading,
    StalledDownloading,
    Errored,
}

impl TorrentFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Downloading => "downloading",
            Self::Uploading => "uploading",
            Self::Seeding => "seeding",
            Self::Completed => "completed",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Resumed => "resumed",
            Self::Running => "running",
            Self::Stalled => "stalled",
            Self::StalledUploading => "stalled_uploading",
            Self::StalledDownloading => "stalled_downloading",
            Self::Errored => "errored",
        }
    }

    /// The name to send on the wire. qBittorrent 4.6.0 renamed
    /// `paused`/`resumed` to `stopped`/`running`; whichever spelling the
    /// caller used, the connected server gets the one it understands.
    pub(crate) fn wire_name(&self, app_version: Option<ApiVersion>) -> &'static str {
        const RENAME: ApiVersion = ApiVersion::new(4, 6, 0);
        match (self, app_version) {
            (Self::Paused, Some(v)) if v >= RENAME => "stopped",
            (Self::Resumed, Some(v)) if v >= RENAME => "running",
            (Self::Stopped, Some(v)) if v < RENAME => "paused",
            (Self::Running, Some(v)) if v < RENAME => "resumed",
            _ => self.as_str(),
        }
    }
}

impl Display for TorrentFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sort keys for torrent lists.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TorrentSort {
    /// Time when the torrent was added to the client
    #[default]
    AddedOn,
    /// Percentage of file pieces currently available
    Availability,
    Category,
    /// Amount of transfer data completed
    Completed,
    /// Time when the torrent completed
    CompletionOn,
    Dlspeed,
    Downloaded,
    Eta,
    Hash,
    /// Last time when a chunk was downloaded/uploaded
    LastActivity,
    Name,
    /// Number of seeds in the swarm
    NumComplete,
    /// Number of leechers in the swarm
    NumIncomplete,
    NumLeechs,
    NumSeeds,
    Priority,
    Progress,
    Ratio,
    /// Time until the next tracker reannounce
    Reannounce,
    SavePath,
    SeedingTime,
    /// Total size of files selected for download
    Size,
    State,
    Tags,
    TimeActive,
    /// Total size of all files in the torrent, including unselected ones
    TotalSize,
    Uploaded,
    Upspeed,
}

impl Display for TorrentSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::AddedOn => "added_on",
                Self::Availability => "availability",
                Self::Category => "category",
                Self::Completed => "completed",
                Self::CompletionOn => "completion_on",
                Self::Dlspeed => "dlspeed",
                Self::Downloaded => "downloaded",
                Self::Eta => "eta",
                Self::Hash => "hash",
                Self::LastActivity => "last_activity",
                Self::Name => "name",
                Self::NumComplete => "num_complete",
                Self::NumIncomplete => "num_incomplete",
                Self::NumLeechs => "num_leechs",
                Self::NumSeeds => "num_seeds",
                Self::Priority => "priority",
                Self::Progress => "progress",
                Self::Ratio => "ratio",
                Self::Reannounce => "reannounce",
                Self::SavePath => "save_path",
                Self::SeedingTime => "seeding_time",
                Self::Size => "size",
                Self::State => "state",
                Self::Tags => "tags",
                Self::TimeActive => "time_active",
                Self::TotalSize => "total_size",
                Self::Uploaded => "uploaded",
                Self::Upspeed => "upspeed",
            }
        )
    }
}

/// The subfolder layout used when adding a torrent.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentLayout {
    #[default]
    Original,
    Subfolder,
    NoSubfolder,
}

impl ContentLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "Original",
            Self::Subfolder => "Subfolder",
            Self::NoSubfolder => "NoSubfolder",
        }
    }
}

/// A .torrent file payload for upload.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct TorrentFile {
    pub filename: String,
    #[serde(with = "serde_bytes_compat")]
    pub data: Bytes,
}

mod serde_bytes_compat {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(data)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        Vec::<u8>::deserialize(deserializer).map(Bytes::from)
    }
}

/// Add-torrent parameter object.
///
/// `urls` and `files` may both be set; at least one source is required.
#[derive(Debug, Default, Builder, Clone, PartialEq)]
pub struct TorrentAddOptions {
    /// Magnet links or URLs to .torrent files
    #[builder(setter(into), default)]
    pub urls: Vec<String>,
    /// .torrent files to upload
    #[builder(setter(into), default)]
    pub files: Vec<TorrentFile>,
    /// Download folder
    #[builder(setter(into, strip_option), default)]
    pub savepath: Option<String>,
    #[builder(setter(into, strip_option), default)]
    pub category: Option<String>,
    /// Tags for the torrent, joined by `,` on the wire
    #[builder(setter(into, strip_option), default)]
    pub tags: Option<Vec<String>>,
    /// Skip hash checking
    #[builder(default)]
    pub skip_checking: bool,
    /// Add the torrent in a stopped state
    #[builder(default)]
    pub paused: bool,
    #[builder(setter(strip_option), default)]
    pub content_layout: Option<ContentLayout>,
    /// Rename the torrent on add
    #[builder(setter(into, strip_option), default)]
    pub rename: Option<String>,
    /// Torrent upload speed limit (KiB/s)
    #[builder(setter(strip_option), default)]
    pub limit_upload_speed: Option<i64>,
    /// Torrent download speed limit (KiB/s)
    #[builder(setter(strip_option), default)]
    pub limit_download_speed: Option<i64>,
    /// Share ratio limit
    #[builder(setter(strip_option), default)]
    pub limit_ratio: Option<f64>,
    /// Seeding time limit (minutes)
    #[builder(setter(strip_option), default)]
    pub limit_seed_time: Option<i64>,
    /// Whether Automatic Torrent Management should be used
    #[builder(default)]
    pub auto_tmm: bool,
    #[builder(default)]
    pub sequential_download: bool,
    /// Prioritize the first and last pieces
    #[builder(default)]
    pub first_last_piece_prio: bool,
}

impl TorrentAddOptions {
    /// Encode into form fields for `torrents/add`.
    ///
    /// Booleans are literal `"true"`/`"false"`. Both the pre- and post-5.0
    /// pause keys are sent so one encoding serves every server. Rate limits
    /// convert from KiB/s to the bytes/s the API expects.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form: Vec<(String, String)> = Vec::new();
        let mut push = |key: &str, value: String| form.push((key.to_string(), value));

        if !self.urls.is_empty() {
            push("urls", self.urls.join("\n"));
        }
        push("paused", self.paused.to_string());
        push("stopped", self.paused.to_string());
        push("skip_checking", self.skip_checking.to_string());
        if let Some(layout) = self.content_layout {
            push("contentLayout", layout.as_str().to_string());
            match layout {
                ContentLayout::Subfolder => push("root_folder", "true".to_string()),
                ContentLayout::NoSubfolder => push("root_folder", "false".to_string()),
                ContentLayout::Original => {}
            }
        }
        if let Some(savepath) = &self.savepath {
            push("savepath", savepath.clone());
        }
        if let Some(category) = &self.category {
            push("category", category.clone());
        }
        if let Some(tags) = &self.tags {
            push("tags", tags.join(","));
        }
        if let Some(rename) = &self.rename {
            push("rename", rename.clone());
        }
        if let Some(up_limit) = self.limit_upload_speed {
            push("upLimit", (up_limit * 1024).to_string());
        }
        if let Some(dl_limit) = self.limit_download_speed {
            push("dlLimit", (dl_limit * 1024).to_string());
        }
        if let Some(ratio) = self.limit_ratio {
            push("ratioLimit", ratio.to_string());
        }
        if let Some(seed_time) = self.limit_seed_time {
            push("seedingTimeLimit", seed_time.to_string());
        }
        push("autoTMM", self.auto_tmm.to_string());
        push("sequentialDownload", self.sequential_download.to_string());
        push("firstLastPiecePrio", self.first_last_piece_prio.to_string());

        form
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_of<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn add_options_encoding() {
        let options = TorrentAddOptionsBuilder::default()
            .paused(true)
            .content_layout(ContentLayout::Subfolder)
            .savepath("/x")
            .category("c")
            .limit_upload_speed(100_000)
            .build()
            .unwrap();
        let form = options.to_form();

        assert_eq!(value_of(&form, "paused"), Some("true"));
        assert_eq!(value_of(&form, "stopped"), Some("true"));
        assert_eq!(value_of(&form, "root_folder"), Some("true"));
        assert_eq!(value_of(&form, "contentLayout"), Some("Subfolder"));
        assert_eq!(value_of(&form, "savepath"), Some("/x"));
        assert_eq!(value_of(&form, "autoTMM"), Some("false"));
        assert_eq!(value_of(&form, "category"), Some("c"));
        assert_eq!(value_of(&form, "upLimit"), Some("102400000"));
        assert_eq!(value_of(&form, "firstLastPiecePrio"), Some("false"));
    }

    #[test]
    fn add_options_no_subfolder_layout() {
        let options = TorrentAddOptionsBuilder::default()
            .content_layout(ContentLayout::NoSubfolder)
            .build()
            .unwrap();
        let form = options.to_form();
        assert_eq!(value_of(&form, "root_folder"), Some("false"));
        assert_eq!(value_of(&form, "contentLayout"), Some("NoSubfolder"));
    }

    #[test]
    fn filter_names_translate_across_rename_boundary() {
        let old = Some(ApiVersion::new(4, 5, 2));
        let new = Some(ApiVersion::new(4, 6, 0));

        assert_eq!(TorrentFilter::Paused.wire_name(new), "stopped");
        assert_eq!(TorrentFilter::Resumed.wire_name(new), "running");
        assert_eq!(TorrentFilter::Stopped.wire_name(old), "paused");
        assert_eq!(TorrentFilter::Running.wire_name(old), "resumed");

        assert_eq!(TorrentFilter::Paused.wire_name(old), "paused");
        assert_eq!(TorrentFilter::Stopped.wire_name(new), "stopped");
        assert_eq!(TorrentFilter::Downloading.wire_name(None), "downloading");
    }
}
