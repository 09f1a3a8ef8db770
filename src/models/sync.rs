use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{ConnectionStatus, Torrent, TorrentUpdate};

/// The locally mirrored server snapshot maintained by the sync manager.
///
/// `rid` is the last response ID acknowledged to the server; the `*_removed`
/// lists hold the removals reported by the most recent delta so diff
/// consumers can observe them.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct MainData {
    /// Response ID
    pub rid: i64,
    /// Whether the last applied payload was a complete replacement
    pub full_update: bool,
    /// Torrent hash -> torrent
    pub torrents: HashMap<String, Torrent>,
    /// Hashes of torrents removed by the last delta
    pub torrents_removed: Vec<String>,
    /// Category name -> category
    pub categories: HashMap<String, Category>,
    pub categories_removed: Vec<String>,
    /// Sorted, duplicate-free tag list
    pub tags: Vec<String>,
    pub tags_removed: Vec<String>,
    /// Torrent hash -> tracker URLs
    pub trackers: HashMap<String, Vec<String>>,
    /// Global transfer info
    pub server_state: ServerState,
}

/// A `sync/maindata` reply.
///
/// Sections the server omitted decode to `None`; the merge must leave the
/// corresponding local state untouched in that case.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MainDataUpdate {
    /// Response ID
    pub rid: i64,
    /// When true the payload replaces the local state wholesale
    pub full_update: bool,
    pub torrents: Option<HashMap<String, TorrentUpdate>>,
    /// Hashes of torrents removed since the acknowledged rid
    pub torrents_removed: Option<Vec<String>>,
    pub categories: Option<HashMap<String, CategoryUpdate>>,
    pub categories_removed: Option<Vec<String>>,
    /// Tags added since the acknowledged rid
    pub tags: Option<Vec<String>>,
    pub tags_removed: Option<Vec<String>>,
    /// Torrent hash -> tracker URLs; entries replace wholesale
    pub trackers: Option<HashMap<String, Vec<String>>>,
    pub server_state: Option<ServerStateUpdate>,
}

/// Category response data object
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Category {
    pub name: String,
    #[serde(rename = "savePath")]
    pub save_path: String,
}

/// Partial category object from a delta.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    #[serde(rename = "savePath")]
    pub save_path: Option<String>,
}

/// Global transfer info.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ServerState {
    /// Alltime download (bytes)
    pub alltime_dl: i64,
    /// Alltime upload (bytes)
    pub alltime_ul: i64,
    pub average_time_queue: i64,
    pub connection_status: ConnectionStatus,
    /// DHT nodes connected to
    pub dht_nodes: i64,
    /// Data downloaded this session (bytes)
    pub dl_info_data: i64,
    /// Global download speed (bytes/s)
    pub dl_info_speed: i64,
    /// Download rate limit (bytes/s)
    pub dl_rate_limit: i64,
    pub free_space_on_disk: i64,
    /// Global share ratio, a float in string format
    pub global_ratio: String,
    pub last_external_address_v4: String,
    pub last_external_address_v6: String,
    pub queued_io_jobs: i64,
    /// True if torrent queueing is enabled
    pub queueing: bool,
    /// An integer in string format
    pub read_cache_hits: String,
    pub read_cache_overload: String,
    /// Refresh interval the server suggests (ms)
    pub refresh_interval: i64,
    pub total_buffers_size: i64,
    pub total_peer_connections: i64,
    pub total_queued_size: i64,
    pub total_wasted_session: i64,
    /// Data uploaded this session (bytes)
    pub up_info_data: i64,
    /// Global upload speed (bytes/s)
    pub up_info_speed: i64,
    pub up_rate_limit: i64,
    pub use_alt_speed_limits: bool,
    pub use_subcategories: bool,
    pub write_cache_overload: String,
}

/// Partial server state from a delta; every field gated on raw presence.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ServerStateUpdate {
    pub alltime_dl: Option<i64>,
    pub alltime_ul: Option<i64>,
    pub average_time_queue: Option<i64>,
    pub connection_status: Option<ConnectionStatus>,
    pub dht_nodes: Option<i64>,
    pub dl_info_data: Option<i64>,
    pub dl_info_speed: Option<i64>,
    pub dl_rate_limit: Option<i64>,
    pub free_space_on_disk: Option<i64>,
    pub global_ratio: Option<String>,
    pub last_external_address_v4: Option<String>,
    pub last_external_address_v6: Option<String>,
    pub queued_io_jobs: Option<i64>,
    pub queueing: Option<bool>,
    pub read_cache_hits: Option<String>,
    pub read_cache_overload: Option<String>,
    pub refresh_interval: Option<i64>,
    pub total_buffers_size: Option<i64>,
    pub total_peer_connections: Option<i64>,
    pub total_queued_size: Option<i64>,
    pub total_wasted_session: Option<i64>,
    pub up_info_data: Option<i64>,
    pub up_info_speed: Option<i64>,
    pub up_rate_limit: Option<i64>,
    pub use_alt_speed_limits: Option<bool>,
    pub use_subcategories: Option<bool>,
    pub write_cache_overload: Option<String>,
}

/// The locally mirrored peer list of a single torrent.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct TorrentPeers {
    /// Response ID
    pub rid: i64,
    pub full_update: bool,
    /// True once the server reported country flags are available
    pub show_flags: bool,
    /// "ip:port" -> peer
    pub peers: HashMap<String, TorrentPeer>,
    /// Peer keys removed by the last delta
    pub peers_removed: Vec<String>,
}

/// A `sync/torrentPeers` reply.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct TorrentPeersUpdate {
    pub rid: i64,
    pub full_update: bool,
    pub show_flags: Option<bool>,
    pub peers: Option<HashMap<String, TorrentPeerUpdate>>,
    pub peers_removed: Option<Vec<String>>,
}

/// A peer connected to a torrent.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct TorrentPeer {
    /// Client used by the peer (qBittorrent, Transmission, ...)
    pub client: String,
    /// Connection type (BT, uTP, ...)
    pub connection: String,
    pub country: String,
    pub country_code: String,
    pub dl_speed: i64,
    /// Total downloaded from this peer (bytes)
    pub downloaded: i64,
    /// Files the peer is interested in
    pub files: String,
    pub flags: String,
    pub flags_desc: String,
    pub ip: String,
    pub peer_id_client: String,
    pub port: i64,
    pub progress: f64,
    pub relevance: f64,
    pub up_speed: i64,
    pub uploaded: i64,
}

/// Partial peer object from a delta.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct TorrentPeerUpdate {
    pub client: Option<String>,
    pub connection: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub dl_speed: Option<i64>,
    pub downloaded: Option<i64>,
    pub files: Option<String>,
    pub flags: Option<String>,
    pub flags_desc: Option<String>,
    pub ip: Option<String>,
    pub peer_id_client: Option<String>,
    pub port: Option<i64>,
    pub progress: Option<f64>,
    pub relevance: Option<f64>,
    pub up_speed: Option<i64>,
    pub uploaded: Option<i64>,
}
