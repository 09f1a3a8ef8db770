//!
//! Data object models shared across the client and the sync managers.
//!

use serde::{Deserialize, Serialize};

mod application;
mod sync;
mod torrent;

pub use application::*;
pub use sync::*;
pub use torrent::*;

/// Connection status of the server
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[serde(rename = "connected")]
    Connected,
    #[serde(rename = "firewalled")]
    Firewalled,
    #[serde(rename = "disconnected")]
    #[default]
    Disconnected,
}
