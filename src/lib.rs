//! # qBittorrent Web API client with a synced local mirror
//!
//! This crate wraps the qBittorrent Web API (v2) behind a structured,
//! type-safe interface and maintains a local, incrementally updated mirror
//! of the server's torrent fleet via the `sync/maindata` delta protocol.
//!
//! The [`Api`] client handles the session: login, cookie capture, automatic
//! re-login on expiry, and retries with request-body replay. On top of it,
//! [`manager::SyncManager`] keeps the mirror fresh and serves filtered
//! snapshots without a network round trip, [`manager::PeerSyncManager`] does
//! the same for a single torrent's peer list, and [`manager::TrackerManager`]
//! hydrates tracker lists through a TTL cache.
//!
//! # Example
//!
//! ```no_run
//! use qbit_sync::{Api, ClientConfigBuilder};
//! use qbit_sync::manager::{SyncManager, SyncOptions};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ClientConfigBuilder::default()
//!         .host("http://localhost:8080")
//!         .username("admin")
//!         .password("adminadmin")
//!         .build()
//!         .unwrap();
//!     let client = Arc::new(Api::new_login(config).await.unwrap());
//!
//!     let manager = SyncManager::new(client, SyncOptions::default());
//!     manager.sync().await.unwrap();
//!
//!     for torrent in manager.torrents(&Default::default()).await {
//!         println!("{} {:?}", torrent.name, torrent.state);
//!     }
//! }
//! ```

mod client;
mod error;
mod version;

pub mod filter;
/// Sync, peer and tracker managers built on the client.
pub mod manager;
/// Data object models.
pub mod models;
/// Parameter objects.
pub mod parameters;

use std::fmt::Display;

pub use client::{Api, ClientConfig, ClientConfigBuilder};
pub use error::Error;
pub use version::ApiVersion;

use serde::{Deserialize, Serialize};

/// Authentication state of the session.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub enum LoginState {
    /// Logged in with a live session cookie.
    LoggedIn {
        credentials: Credentials,
        cookie_sid: String,
    },
    /// Credentials available, no session yet.
    NotLoggedIn { credentials: Credentials },
    /// A session cookie was provided externally; re-login is not possible.
    CookieProvided { cookie_sid: String },
    #[default]
    Unknown,
}

impl LoginState {
    pub(crate) fn as_cookie(&self) -> Option<String> {
        match self {
            Self::LoggedIn { cookie_sid, .. } | Self::CookieProvided { cookie_sid } => {
                Some(cookie_sid.clone())
            }
            Self::NotLoggedIn { .. } | Self::Unknown => None,
        }
    }

    pub(crate) fn credentials(&self) -> Option<&Credentials> {
        match self {
            Self::LoggedIn { credentials, .. } | Self::NotLoggedIn { credentials } => {
                (!credentials.is_empty()).then_some(credentials)
            }
            Self::CookieProvided { .. } | Self::Unknown => None,
        }
    }

    pub(crate) fn add_cookie(&self, cookie: &str) -> Self {
        match self {
            Self::LoggedIn { credentials, .. } | Self::NotLoggedIn { credentials } => {
                Self::LoggedIn {
                    credentials: credentials.clone(),
                    cookie_sid: cookie.to_string(),
                }
            }
            Self::CookieProvided { .. } | Self::Unknown => Self::CookieProvided {
                cookie_sid: cookie.to_string(),
            },
        }
    }

    pub(crate) fn clear_cookie(&self) -> Self {
        match self {
            Self::LoggedIn { credentials, .. } => Self::NotLoggedIn {
                credentials: credentials.clone(),
            },
            Self::NotLoggedIn { credentials } => Self::NotLoggedIn {
                credentials: credentials.clone(),
            },
            Self::CookieProvided { .. } | Self::Unknown => Self::Unknown,
        }
    }
}

/// A user's login credentials.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.username.is_empty() || self.password.is_empty()
    }

    pub(crate) fn form(&self) -> Vec<(String, String)> {
        vec![
            ("username".to_string(), self.username.clone()),
            ("password".to_string(), self.password.clone()),
        ]
    }
}

impl Display for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "username={}&password=<redacted>", self.username)
    }
}
