use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Application preferences, reduced to the settings a management client acts
/// on. Unknown keys in the reply are ignored.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Preferences {
    /// Currently selected language (e.g. en_GB for English)
    pub locale: String,
    /// Default save path for torrents, separated by slashes
    pub save_path: String,
    /// True if a folder for incomplete torrents is enabled
    pub temp_path_enabled: bool,
    /// Path for incomplete torrents, separated by slashes
    pub temp_path: String,
    /// True if ".!qB" should be appended to incomplete files
    pub incomplete_files_ext: bool,
    /// True if Automatic Torrent Management is enabled by default
    pub auto_tmm_enabled: bool,
    /// True if torrents should be relocated when their category changes
    pub torrent_changed_tmm_enabled: bool,
    /// True if torrents should be relocated when the default save path changes
    pub save_path_changed_tmm_enabled: bool,
    /// True if torrents should be relocated when their category's save path changes
    pub category_changed_tmm_enabled: bool,
    /// True if torrents are added in a stopped state
    pub start_paused_enabled: bool,
    /// Global download speed limit (KiB/s), 0 for unlimited
    pub dl_limit: i64,
    /// Global upload speed limit (KiB/s), 0 for unlimited
    pub up_limit: i64,
    /// Maximum global number of simultaneous connections
    pub max_connec: i64,
    /// Maximum number of simultaneous connections per torrent
    pub max_connec_per_torrent: i64,
    pub max_uploads: i64,
    pub max_uploads_per_torrent: i64,
    pub proxy_type: ProxyType,
    /// Proxy IP address or domain name
    pub proxy_ip: String,
    pub proxy_port: u16,
    /// True if peer and web seed connections should be proxified
    pub proxy_peer_connections: bool,
    pub proxy_auth_enabled: bool,
    pub proxy_username: String,
    pub proxy_password: String,
    /// True if torrent queueing is enabled
    pub queueing_enabled: bool,
    pub max_active_downloads: i64,
    pub max_active_torrents: i64,
    pub max_active_uploads: i64,
    /// True if a torrent reaching its ratio limit triggers `max_ratio_act`
    pub max_ratio_enabled: bool,
    /// The global maximum share ratio, -1 for unlimited
    pub max_ratio: f64,
    /// Action performed when the ratio limit is reached (0 stop, 1 remove)
    pub max_ratio_act: i64,
    /// Port used for incoming connections
    pub listen_port: i64,
    pub upnp: bool,
    pub random_port: bool,
    pub dht: bool,
    pub pex: bool,
    pub lsd: bool,
    /// Encryption mode (0 prefer, 1 force on, 2 force off)
    pub encryption: i64,
    pub web_ui_address: String,
    pub web_ui_port: u16,
    pub web_ui_username: String,
    /// True if authentication is skipped for clients on localhost
    pub bypass_local_auth: bool,
    pub alternative_webui_enabled: bool,
    pub alternative_webui_path: String,
}

/// Proxy type as reported by `app/preferences`.
///
/// Older servers report an integer code, newer ones a string name; both
/// decode into this enum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProxyType {
    #[default]
    Disabled,
    HttpWithoutAuth,
    Socks5WithoutAuth,
    HttpWithAuth,
    Socks5WithAuth,
    Socks4WithoutAuth,
    /// A string name this client does not recognize
    Other(String),
}

impl<'de> Deserialize<'de> for ProxyType {
    fn deserialize<D>(deserializer: D) -> Result<ProxyType, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i8),
            Str(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(-1) | Raw::Int(0) => ProxyType::Disabled,
            Raw::Int(1) => ProxyType::HttpWithoutAuth,
            Raw::Int(2) => ProxyType::Socks5WithoutAuth,
            Raw::Int(3) => ProxyType::HttpWithAuth,
            Raw::Int(4) => ProxyType::Socks5WithAuth,
            Raw::Int(5) => ProxyType::Socks4WithoutAuth,
            Raw::Int(_) => ProxyType::Disabled,
            Raw::Str(s) => match s.as_str() {
                "None" => ProxyType::Disabled,
                "HTTP" => ProxyType::HttpWithoutAuth,
                "SOCKS5" => ProxyType::Socks5WithoutAuth,
                "SOCKS4" => ProxyType::Socks4WithoutAuth,
                _ => ProxyType::Other(s),
            },
        })
    }
}

impl Serialize for ProxyType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let name = match self {
            ProxyType::Disabled => "None",
            ProxyType::HttpWithoutAuth | ProxyType::HttpWithAuth => "HTTP",
            ProxyType::Socks5WithoutAuth | ProxyType::Socks5WithAuth => "SOCKS5",
            ProxyType::Socks4WithoutAuth => "SOCKS4",
            ProxyType::Other(s) => s,
        };
        serializer.serialize_str(name)
    }
}
