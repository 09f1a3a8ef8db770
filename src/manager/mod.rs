//! Managers that keep local mirrors of server state fresh.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use derive_builder::Builder;
use rand::Rng;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::client::Api;
use crate::error::Error;
use crate::filter;
use crate::models::{Category, MainData, ServerState, Torrent};
use crate::parameters::TorrentFilterOptions;

mod merge;
mod peers;
mod trackers;

pub use peers::{PeerSyncManager, PeerSyncOptions, PeerSyncOptionsBuilder};
pub use trackers::{TrackerManager, TrackerManagerOptions, TrackerManagerOptionsBuilder};

/// Called with a fresh snapshot after every successful sync.
pub type UpdateCallback = Arc<dyn Fn(&MainData) + Send + Sync + 'static>;
/// Called with the failure after every unsuccessful sync.
pub type ErrorCallback = Arc<dyn Fn(&Error) + Send + Sync + 'static>;

/// Readers short-circuit when the mirror was refreshed this recently,
/// debouncing tight `torrents()`/`data()` loops.
const FRESH_FAST_PATH: Duration = Duration::from_millis(5);

/// Tuning knobs for [`SyncManager`].
#[derive(Clone, Builder)]
pub struct SyncOptions {
    /// Refresh the mirror from a background task started by
    /// [`SyncManager::start`]
    #[builder(default)]
    pub auto_sync: bool,
    /// Base period between background syncs
    #[builder(default = "Duration::from_secs(2)")]
    pub sync_interval: Duration,
    /// Derive the next interval from the last sync duration
    /// (2x, clamped to the min/max below) instead of the fixed period
    #[builder(default)]
    pub dynamic_sync: bool,
    #[builder(default = "Duration::from_secs(1)")]
    pub min_sync_interval: Duration,
    #[builder(default = "Duration::from_secs(30)")]
    pub max_sync_interval: Duration,
    /// Symmetric random perturbation of the interval, 0-100
    #[builder(default = "10")]
    pub jitter_percent: u8,
    #[builder(setter(strip_option), default)]
    pub on_update: Option<UpdateCallback>,
    #[builder(setter(strip_option), default)]
    pub on_error: Option<ErrorCallback>,
    /// Keep removed torrents/categories/tags visible for one extra cycle so
    /// diff consumers can observe the removals
    #[builder(default)]
    pub retain_removed_data: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            auto_sync: false,
            sync_interval: Duration::from_secs(2),
            dynamic_sync: false,
            min_sync_interval: Duration::from_secs(1),
            max_sync_interval: Duration::from_secs(30),
            jitter_percent: 10,
            on_update: None,
            on_error: None,
            retain_removed_data: false,
        }
    }
}

#[derive(Default)]
struct SyncState {
    data: Option<MainData>,
    /// Mirror of `data.torrents`, sorted by hash, for cheap filtered reads
    torrent_cache: Vec<Torrent>,
    last_sync: Option<Instant>,
    last_duration: Duration,
    last_error: Option<Arc<Error>>,
}

/// Maintains a local mirror of the server's torrent fleet via the
/// `sync/maindata` delta protocol.
///
/// Concurrent [`sync`](Self::sync) calls are collapsed into a single network
/// request whose outcome every caller observes. Readers return deep copies
/// taken under a shared lock, so they never see a partially merged state,
/// and the observed rid never decreases.
pub struct SyncManager {
    client: Arc<Api>,
    options: SyncOptions,
    state: RwLock<SyncState>,
    /// Serializes actual network syncs; see [`SyncManager::sync`]
    sync_mutex: Mutex<()>,
    /// Bumped after every completed sync so waiters detect piggybacked work
    generation: AtomicU64,
    weak: Weak<SyncManager>,
    auto_sync_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SyncManager {
    pub fn new(client: Arc<Api>, options: SyncOptions) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            client,
            options,
            state: RwLock::new(SyncState::default()),
            sync_mutex: Mutex::new(()),
            generation: AtomicU64::new(0),
            weak: weak.clone(),
            auto_sync_task: std::sync::Mutex::new(None),
        })
    }

    /// Perform an initial sync, then spawn the auto-sync task when
    /// configured. The task holds no strong reference and dies with the
    /// manager; [`stop`](Self::stop) ends it early.
    pub async fn start(&self) -> Result<(), Error> {
        self.sync().await?;
        if self.options.auto_sync {
            self.spawn_auto_sync();
        }
        Ok(())
    }

    /// Cancel the auto-sync task if one is running.
    pub fn stop(&self) {
        if let Ok(mut slot) = self.auto_sync_task.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }

    /// Refresh the mirror.
    ///
    /// Single-flight: while one sync's network call is in progress, further
    /// callers wait on it and then observe its outcome (re-read from the
    /// shared state, so no result is lost) without issuing a request of
    /// their own.
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

        let started = Instant::now();
        match self.client.main_data(rid).await {
            Ok(update) => {
                debug!(rid = update.rid, full_update = update.full_update, "applying maindata");
                let snapshot = {
                    let mut state = self.state.write().await;
                    let data = state.data.get_or_insert_with(MainData::default);
                    merge::merge_main_data(data, update, self.options.retain_removed_data);
                    let mut cache: Vec<Torrent> = data.torrents.values().cloned().collect();
                    cache.sort_by(|a, b| a.hash.cmp(&b.hash));
                    state.torrent_cache = cache;
                    state.last_sync = Some(Instant::now());
                    state.last_duration = started.elapsed();
                    state.last_error = None;
                    self.options
                        .on_update
                        .as_ref()
                        .and_then(|_| state.data.clone())
                };
                if let (Some(callback), Some(data)) = (&self.options.on_update, snapshot) {
                    callback(&data);
                }
                Ok(())
            }
            Err(error) => {
                let shared = Arc::new(error);
                {
                    let mut state = self.state.write().await;
                    state.last_duration = started.elapsed();
                    state.last_error = Some(shared.clone());
                }
                if let Some(callback) = &self.options.on_error {
                    callback(shared.as_ref());
                }
                Err(Error::Sync(shared))
            }
        }
    }

    fn spawn_auto_sync(&self) {
        let weak = self.weak.clone();
        let handle = tokio::spawn(async move {
            loop {
                let interval = match weak.upgrade() {
                    Some(manager) => manager.next_interval().await,
                    None => break,
                };
                tokio::time::sleep(interval).await;
                match weak.upgrade() {
                    Some(manager) => {
                        if let Err(error) = manager.sync().await {
                            warn!(%error, "auto-sync failed");
                        }
                    }
                    None => break,
                }
            }
        });
        if let Ok(mut slot) = self.auto_sync_task.lock() {
            if let Some(old) = slot.replace(handle) {
                old.abort();
            }
        }
    }

    async fn next_interval(&self) -> Duration {
        let base = if self.options.dynamic_sync {
            let last = self.state.read().await.last_duration;
            (last * 2).clamp(self.options.min_sync_interval, self.options.max_sync_interval)
        } else {
            self.options.sync_interval
        };
        apply_jitter(base, self.options.jitter_percent, self.options.min_sync_interval)
    }

    /// Kick off a background refresh when the mirror is missing or stale.
    /// Never blocks: the caller reads whatever is mirrored right now.
    async fn ensure_fresh(&self) {
        let needs_sync = {
            let state = self.state.read().await;
            match state.last_sync {
                Some(last) if state.data.is_some() => {
                    let age = last.elapsed();
                    age > FRESH_FAST_PATH && age >= self.stale_threshold(state.last_duration)
                }
                _ => true,
            }
        };
        if needs_sync {
            if let Some(manager) = self.weak.upgrade() {
                tokio::spawn(async move {
                    if let Err(error) = manager.sync().await {
                        debug!(%error, "background refresh failed");
                    }
                });
            }
        }
    }

    fn stale_threshold(&self, last_duration: Duration) -> Duration {
        if self.options.dynamic_sync {
            (last_duration * 2).clamp(self.options.min_sync_interval, self.options.max_sync_interval)
        } else {
            self.options.sync_interval
        }
    }

    /// A deep copy of the mirrored state, `None` before the first sync.
    pub async fn data(&self) -> Option<MainData> {
        self.ensure_fresh().await;
        self.data_unchecked().await
    }

    /// Like [`data`](Self::data) but without the freshness check, for tight
    /// read loops.
    pub async fn data_unchecked(&self) -> Option<MainData> {
        self.state.read().await.data.clone()
    }

    /// Filter, sort and paginate the mirrored torrents locally.
    pub async fn torrents(&self, options: &TorrentFilterOptions) -> Vec<Torrent> {
        self.ensure_fresh().await;
        self.torrents_unchecked(options).await
    }

    pub async fn torrents_unchecked(&self, options: &TorrentFilterOptions) -> Vec<Torrent> {
        let state = self.state.read().await;
        filter::apply(&state.torrent_cache, options)
    }

    pub async fn torrent(&self, hash: &str) -> Option<Torrent> {
        self.ensure_fresh().await;
        self.torrent_unchecked(hash).await
    }

    pub async fn torrent_unchecked(&self, hash: &str) -> Option<Torrent> {
        let state = self.state.read().await;
        state.data.as_ref()?.torrents.get(hash).cloned()
    }

    pub async fn server_state(&self) -> Option<ServerState> {
        self.ensure_fresh().await;
        self.server_state_unchecked().await
    }

    pub async fn server_state_unchecked(&self) -> Option<ServerState> {
        let state = self.state.read().await;
        state.data.as_ref().map(|d| d.server_state.clone())
    }

    pub async fn categories(&self) -> HashMap<String, Category> {
        self.ensure_fresh().await;
        self.categories_unchecked().await
    }

    pub async fn categories_unchecked(&self) -> HashMap<String, Category> {
        let state = self.state.read().await;
        state
            .data
            .as_ref()
            .map(|d| d.categories.clone())
            .unwrap_or_default()
    }

    pub async fn tags(&self) -> Vec<String> {
        self.ensure_fresh().await;
        self.tags_unchecked().await
    }

    pub async fn tags_unchecked(&self) -> Vec<String> {
        let state = self.state.read().await;
        state.data.as_ref().map(|d| d.tags.clone()).unwrap_or_default()
    }

    /// The rid acknowledged to the server; 0 before the first sync.
    pub async fn rid(&self) -> i64 {
        self.state.read().await.data.as_ref().map(|d| d.rid).unwrap_or(0)
    }

    /// The failure recorded by the most recent sync, if it failed.
    pub async fn last_error(&self) -> Option<Arc<Error>> {
        self.state.read().await.last_error.clone()
    }

    pub async fn last_synced(&self) -> Option<Instant> {
        self.state.read().await.last_sync
    }

    pub async fn last_sync_duration(&self) -> Duration {
        self.state.read().await.last_duration
    }
}

impl Drop for SyncManager {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Perturb `base` by up to `percent`% using a single uniform draw: the draw
/// picks both the magnitude and, via `r < 0.5`, the direction.
fn apply_jitter(base: Duration, percent: u8, min: Duration) -> Duration {
    if percent == 0 {
        return base;
    }
    let r: f64 = rand::rng().random();
    let jitter = base.mul_f64(f64::from(percent.min(100)) / 100.0 * r);
    let jittered = if r < 0.5 {
        base + jitter
    } else {
        base.saturating_sub(jitter)
    };
    jittered.max(min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_within_bounds() {
        let base = Duration::from_secs(2);
        let min = Duration::from_secs(1);
        for _ in 0..1000 {
            let jittered = apply_jitter(base, 10, min);
            assert!(jittered >= Duration::from_millis(1800), "{jittered:?}");
            assert!(jittered <= Duration::from_millis(2200), "{jittered:?}");
        }
    }

    #[test]
    fn jitter_respects_minimum() {
        let base = Duration::from_secs(1);
        let min = Duration::from_secs(1);
        for _ in 0..1000 {
            assert!(apply_jitter(base, 100, min) >= min);
        }
    }

    #[test]
    fn zero_jitter_is_identity() {
        let base = Duration::from_secs(2);
        assert_eq!(apply_jitter(base, 0, Duration::from_secs(1)), base);
    }
}
