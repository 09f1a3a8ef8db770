//! Per-torrent peer list mirroring via `sync/torrentPeers`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use derive_builder::Builder;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::client::Api;
use crate::error::Error;
use crate::models::{TorrentPeer, TorrentPeers, TorrentPeersUpdate};

use super::merge::{merge_fields, merge_nonempty, merge_positive};

/// Tuning knobs for [`PeerSyncManager`].
#[derive(Debug, Clone, Builder)]
pub struct PeerSyncOptions {
    /// Staleness threshold for reads through [`PeerSyncManager::peers`]
    #[builder(default = "Duration::from_secs(2)")]
    pub sync_interval: Duration,
}

impl Default for PeerSyncOptions {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(2),
        }
    }
}

#[derive(Default)]
struct PeerSyncState {
    data: Option<TorrentPeers>,
    last_sync: Option<Instant>,
    last_error: Option<Arc<Error>>,
}

/// Maintains the peer map of a single torrent, keyed `ip:port`.
///
/// Same contract as [`super::SyncManager`]: concurrent syncs collapse into
/// one request, readers get deep copies.
pub struct PeerSyncManager {
    client: Arc<Api>,
    hash: String,
    options: PeerSyncOptions,
    state: RwLock<PeerSyncState>,
    sync_mutex: Mutex<()>,
    generation: AtomicU64,
}

impl PeerSyncManager {
    pub fn new(client: Arc<Api>, hash: impl Into<String>, options: PeerSyncOptions) -> Self {
        Self {
            client,
            hash: hash.into(),
            options,
            state: RwLock::new(PeerSyncState::default()),
            sync_mutex: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Refresh the peer mirror; single-flight across concurrent callers.
    pub async fn sync(&self) -> Result<(), Error> {
        let generation = self.generation.load(Ordering::Acquire);
        let _guard = self.sync_mutex.lock().await;
        if self.generation.load(Ordering::Acquire) != generation {
            return match &self.state.read().await.last_error {
                Some(error) => Err(Error::Sync(error.clone())),
                None => Ok(()),
            };
        }

        let result = self.sync_once().await;
        self.generation.fetch_add(1, Ordering::Release);
        result
    }

    async fn sync_once(&self) -> Result<(), Error> {
        let rid = {
            let state = self.state.read().await;
            state.data.as_ref().map(|d| d.rid).unwrap_or(0)
        };

        match self.client.torrent_peers(&self.hash, rid).await {
            Ok(update) => {
                let mut state = self.state.write().await;
                let data = state.data.get_or_insert_with(TorrentPeers::default);
                merge_torrent_peers(data, update);
                state.last_sync = Some(Instant::now());
                state.last_error = None;
                Ok(())
            }
            Err(error) => {
                let shared = Arc::new(error);
                self.state.write().await.last_error = Some(shared.clone());
                Err(Error::Sync(shared))
            }
        }
    }

    /// A deep copy of the mirrored peer map, refreshed in the background
    /// when stale. `None` before the first sync.
    pub async fn peers(&self) -> Option<TorrentPeers> {
        let stale = {
            let state = self.state.read().await;
            match state.last_sync {
                Some(last) => last.elapsed() >= self.options.sync_interval,
                None => true,
            }
        };
        if stale {
            // Blocking here is fine for the peer view: the map is small and
            // callers poll it interactively.
            let _ = self.sync().await;
        }
        self.peers_unchecked().await
    }

    pub async fn peers_unchecked(&self) -> Option<TorrentPeers> {
        self.state.read().await.data.clone()
    }

    pub async fn rid(&self) -> i64 {
        self.state.read().await.data.as_ref().map(|d| d.rid).unwrap_or(0)
    }

    pub async fn last_error(&self) -> Option<Arc<Error>> {
        self.state.read().await.last_error.clone()
    }
}

/// Merge a `sync/torrentPeers` reply into the mirror.
pub(crate) fn merge_torrent_peers(data: &mut TorrentPeers, update: TorrentPeersUpdate) {
    if update.full_update {
        let show_flags = data.show_flags;
        *data = TorrentPeers {
            full_update: true,
            show_flags,
            ..Default::default()
        };
    } else {
        data.full_update = false;
    }

    data.rid = update.rid;
    if update.show_flags == Some(true) {
        data.show_flags = true;
    }

    if let Some(peers) = update.peers {
        for (key, partial) in peers {
            let entry = data.peers.entry(key).or_default();
            merge_peer(entry, partial);
        }
    }

    let removed = update.peers_removed.unwrap_or_default();
    for key in &removed {
        data.peers.remove(key);
    }
    data.peers_removed = removed;
}

fn merge_peer(peer: &mut TorrentPeer, update: crate::models::TorrentPeerUpdate) {
    merge_nonempty!(
        peer,
        update,
        client,
        connection,
        country,
        country_code,
        files,
        flags,
        flags_desc,
        ip,
        peer_id_client,
    );
    // cumulative counters, and a port report of 0 is meaningless
    merge_positive!(peer, update, port, downloaded, uploaded);
    // transient values, zero included
    merge_fields!(peer, update, dl_speed, up_speed, progress, relevance);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update_from(value: serde_json::Value) -> TorrentPeersUpdate {
        serde_json::from_value(value).unwrap()
    }

    fn seeded() -> TorrentPeers {
        let mut data = TorrentPeers::default();
        merge_torrent_peers(
            &mut data,
            update_from(json!({
                "rid": 1,
                "full_update": true,
                "show_flags": true,
                "peers": {
                    "10.0.0.1:6881": {
                        "ip": "10.0.0.1",
                        "port": 6881,
                        "client": "qBittorrent/5.0",
                        "dl_speed": 1000,
                        "up_speed": 200,
                        "downloaded": 4096,
                        "progress": 0.5
                    }
                }
            })),
        );
        data
    }

    #[test]
    fn delta_merges_by_field_rules() {
        let mut data = seeded();
        merge_torrent_peers(
            &mut data,
            update_from(json!({
                "rid": 2,
                "peers": {
                    "10.0.0.1:6881": {
                        "client": "",
                        "port": 0,
                        "dl_speed": 0,
                        "downloaded": 0,
                        "progress": 0.75
                    }
                }
            })),
        );

        let peer = &data.peers["10.0.0.1:6881"];
        // empty string and zero port/cumulative are "no report"
        assert_eq!(peer.client, "qBittorrent/5.0");
        assert_eq!(peer.port, 6881);
        assert_eq!(peer.downloaded, 4096);
        // transient values take zero
        assert_eq!(peer.dl_speed, 0);
        assert_eq!(peer.progress, 0.75);
        assert_eq!(data.rid, 2);
    }

    #[test]
    fn delta_adds_new_peers() {
        let mut data = seeded();
        merge_torrent_peers(
            &mut data,
            update_from(json!({
                "rid": 2,
                "peers": {
                    "10.0.0.2:51413": { "ip": "10.0.0.2", "port": 51413 }
                }
            })),
        );
        assert_eq!(data.peers.len(), 2);
        assert_eq!(data.peers["10.0.0.2:51413"].port, 51413);
    }

    #[test]
    fn removals_apply() {
        let mut data = seeded();
        merge_torrent_peers(
            &mut data,
            update_from(json!({ "rid": 2, "peers_removed": ["10.0.0.1:6881"] })),
        );
        assert!(data.peers.is_empty());
        assert_eq!(data.peers_removed, vec!["10.0.0.1:6881"]);
    }

    #[test]
    fn show_flags_latches_true() {
        let mut data = seeded();
        assert!(data.show_flags);
        merge_torrent_peers(&mut data, update_from(json!({ "rid": 2 })));
        assert!(data.show_flags);
    }

    #[test]
    fn full_update_replaces_peer_map() {
        let mut data = seeded();
        merge_torrent_peers(
            &mut data,
            update_from(json!({
                "rid": 5,
                "full_update": true,
                "peers": { "10.9.9.9:1234": { "ip": "10.9.9.9", "port": 1234 } }
            })),
        );
        assert_eq!(data.peers.len(), 1);
        assert_eq!(data.rid, 5);
    }
}
