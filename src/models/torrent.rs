use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// A torrent as mirrored from `torrents/info` or `sync/maindata`.
///
/// Fields default to their zero value so the struct also decodes the stripped
/// objects older servers emit.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Torrent {
    /// Time when the torrent was added (unix timestamp)
    pub added_on: i64,
    /// Amount of data left to download (bytes)
    pub amount_left: i64,
    /// Whether this torrent is managed by Automatic Torrent Management
    pub auto_tmm: bool,
    /// Percentage of file pieces currently available
    pub availability: f64,
    pub category: String,
    /// Amount of transfer data completed (bytes)
    pub completed: i64,
    /// Time when the torrent completed (unix timestamp)
    pub completion_on: i64,
    pub content_path: String,
    /// Torrent download speed limit (bytes/s)
    pub dl_limit: i64,
    pub dlspeed: i64,
    pub downloaded: i64,
    pub downloaded_session: i64,
    /// Torrent ETA (seconds)
    pub eta: i64,
    /// First and last pieces are prioritized
    pub f_l_piece_prio: bool,
    pub force_start: bool,
    pub hash: String,
    pub infohash_v1: String,
    pub infohash_v2: String,
    /// Last time a chunk was downloaded/uploaded (unix timestamp)
    pub last_activity: i64,
    pub magnet_uri: String,
    pub max_ratio: f64,
    pub max_seeding_time: i64,
    pub name: String,
    /// Number of seeds in the swarm
    pub num_complete: i64,
    /// Number of leechers in the swarm
    pub num_incomplete: i64,
    /// Number of leechers connected to
    pub num_leechs: i64,
    /// Number of seeds connected to
    pub num_seeds: i64,
    pub priority: i64,
    /// True if torrent is from a private tracker. Field name is "private",
    /// not "isPrivate" as older documentation claims.
    pub private: bool,
    pub progress: f64,
    pub ratio: f64,
    pub ratio_limit: f64,
    /// Seconds until the next tracker announce
    pub reannounce: i64,
    pub save_path: String,
    pub seeding_time: i64,
    pub seeding_time_limit: i64,
    /// Time when this torrent was last seen complete (unix timestamp)
    pub seen_complete: i64,
    pub seq_dl: bool,
    /// Total size of files selected for download (bytes)
    pub size: i64,
    pub state: TorrentState,
    pub super_seeding: bool,
    /// Comma-separated tag list
    pub tags: String,
    pub time_active: i64,
    /// Total size of all files in this torrent, including unselected ones
    pub total_size: i64,
    /// The first tracker with a working status, empty if none
    pub tracker: String,
    /// Full tracker list, present only when requested with `includeTrackers`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trackers: Option<Vec<TorrentTracker>>,
    pub up_limit: i64,
    pub uploaded: i64,
    pub uploaded_session: i64,
    pub upspeed: i64,
}

impl Torrent {
    /// Backfill `hash` from the v1 or v2 infohash when the server leaves the
    /// canonical field empty (hybrid and v2-only torrents).
    pub(crate) fn normalize_hash(&mut self) {
        if self.hash.is_empty() {
            if !self.infohash_v1.is_empty() {
                self.hash = self.infohash_v1.clone();
            } else if !self.infohash_v2.is_empty() {
                self.hash = self.infohash_v2.clone();
            }
        }
    }
}

/// A partial torrent object from a `sync/maindata` delta.
///
/// Every field is optional: `None` means the key was absent from the JSON
/// object and the previous value must be kept, which is distinct from a field
/// present with its zero value (a download speed dropping to 0 is a real
/// update).
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct TorrentUpdate {
    pub added_on: Option<i64>,
    pub amount_left: Option<i64>,
    pub auto_tmm: Option<bool>,
    pub availability: Option<f64>,
    pub category: Option<String>,
    pub completed: Option<i64>,
    pub completion_on: Option<i64>,
    pub content_path: Option<String>,
    pub dl_limit: Option<i64>,
    pub dlspeed: Option<i64>,
    pub downloaded: Option<i64>,
    pub downloaded_session: Option<i64>,
    pub eta: Option<i64>,
    pub f_l_piece_prio: Option<bool>,
    pub force_start: Option<bool>,
    pub hash: Option<String>,
    pub infohash_v1: Option<String>,
    pub infohash_v2: Option<String>,
    pub last_activity: Option<i64>,
    pub magnet_uri: Option<String>,
    pub max_ratio: Option<f64>,
    pub max_seeding_time: Option<i64>,
    pub name: Option<String>,
    pub num_complete: Option<i64>,
    pub num_incomplete: Option<i64>,
    pub num_leechs: Option<i64>,
    pub num_seeds: Option<i64>,
    pub priority: Option<i64>,
    pub private: Option<bool>,
    pub progress: Option<f64>,
    pub ratio: Option<f64>,
    pub ratio_limit: Option<f64>,
    pub reannounce: Option<i64>,
    pub save_path: Option<String>,
    pub seeding_time: Option<i64>,
    pub seeding_time_limit: Option<i64>,
    pub seen_complete: Option<i64>,
    pub seq_dl: Option<bool>,
    pub size: Option<i64>,
    pub state: Option<TorrentState>,
    pub super_seeding: Option<bool>,
    pub tags: Option<String>,
    pub time_active: Option<i64>,
    pub total_size: Option<i64>,
    pub tracker: Option<String>,
    pub up_limit: Option<i64>,
    pub uploaded: Option<i64>,
    pub uploaded_session: Option<i64>,
    pub upspeed: Option<i64>,
}

/// Possible torrent states as reported by the server.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TorrentState {
    /// Some error occurred, applies to paused torrents
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "missingFiles")]
    MissingFiles,
    /// Torrent is being seeded and data is being transferred
    #[serde(rename = "uploading")]
    Uploading,
    /// Torrent is paused and has finished downloading (pre-5.0 name)
    #[serde(rename = "pausedUP")]
    PausedUp,
    /// Torrent is stopped and has finished downloading
    #[serde(rename = "stoppedUP")]
    StoppedUp,
    #[serde(rename = "queuedUP")]
    QueuedUp,
    /// Torrent is being seeded, but no connections were made
    #[serde(rename = "stalledUP")]
    StalledUp,
    #[serde(rename = "checkingUP")]
    CheckingUp,
    #[serde(rename = "forcedUP")]
    ForcedUp,
    #[serde(rename = "allocating")]
    Allocating,
    #[serde(rename = "downloading")]
    Downloading,
    /// Torrent has just started downloading and is fetching metadata
    #[serde(rename = "metaDL")]
    MetaDl,
    #[serde(rename = "forcedMetaDL")]
    ForcedMetaDl,
    /// Torrent is paused and has not finished downloading (pre-5.0 name)
    #[serde(rename = "pausedDL")]
    PausedDl,
    #[serde(rename = "stoppedDL")]
    StoppedDl,
    #[serde(rename = "queuedDL")]
    QueuedDl,
    /// Torrent is being downloaded, but no connections were made
    #[serde(rename = "stalledDL")]
    StalledDl,
    #[serde(rename = "checkingDL")]
    CheckingDl,
    #[serde(rename = "forcedDL")]
    ForcedDl,
    #[serde(rename = "checkingResumeData")]
    CheckingResumeData,
    #[serde(rename = "moving")]
    Moving,
    #[default]
    #[serde(other, rename = "unknown")]
    Unknown,
}

impl TorrentState {
    pub fn is_stopped(&self) -> bool {
        matches!(
            self,
            Self::PausedUp | Self::PausedDl | Self::StoppedUp | Self::StoppedDl
        )
    }

    pub fn is_errored(&self) -> bool {
        matches!(self, Self::Error | Self::MissingFiles)
    }
}

/// Torrent tracker data object
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct TorrentTracker {
    /// Tracker url
    pub url: String,
    pub status: TrackerStatus,
    /// Tracker priority tier. Lower tiers are tried first; `< 0` is a
    /// placeholder for special entries such as DHT.
    #[serde(default, deserialize_with = "tier_as_i64")]
    pub tier: i64,
    /// Number of peers for the torrent, as reported by the tracker
    pub num_peers: i64,
    pub num_seeds: i64,
    pub num_leeches: i64,
    /// Number of completed downloads, as reported by the tracker
    pub num_downloaded: i64,
    /// Tracker message, content is up to the tracker admin
    pub msg: String,
}

/// Tracker status enum
#[derive(
    Debug, Deserialize_repr, Serialize_repr, Clone, Copy, Default, PartialEq, Eq, Hash,
)]
#[repr(i64)]
pub enum TrackerStatus {
    /// Tracker is disabled (used for DHT, PeX and LSD)
    Disabled = 0,
    #[default]
    NotContacted = 1,
    /// Tracker has been contacted and is working
    Ok = 2,
    Updating = 3,
    NotWorking = 4,
}

/// File download priority.
#[derive(
    Debug, Deserialize_repr, Serialize_repr, Clone, Copy, Default, PartialEq, Eq, Hash,
)]
#[repr(u8)]
pub enum FilePriority {
    DoNotDownload = 0,
    #[default]
    Normal = 1,
    High = 6,
    Maximal = 7,
}

/// Special tracker rows carry `""` for `tier` instead of a number.
fn tier_as_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(n) => Ok(n),
        Raw::Str(_) => Ok(-1),
    }
}
