//! Tracker list hydration with a TTL cache and bounded-concurrency fetching.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use derive_builder::Builder;
use tokio::sync::{RwLock, Semaphore};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::client::Api;
use crate::error::Error;
use crate::models::{Torrent, TorrentTracker};
use crate::parameters::TorrentFilterOptions;

/// Bulk fetches are chunked to keep request URLs bounded.
const BULK_CHUNK_SIZE: usize = 100;

/// Tuning knobs for [`TrackerManager`].
#[derive(Debug, Clone, Builder)]
pub struct TrackerManagerOptions {
    /// How long a fetched tracker list stays valid. A torrent's next
    /// reannounce shortens this per entry.
    #[builder(default = "Duration::from_secs(30 * 60)")]
    pub cache_ttl: Duration,
    /// Cap on in-flight per-hash tracker requests
    #[builder(default = "4")]
    pub max_concurrent: usize,
}

impl Default for TrackerManagerOptions {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30 * 60),
            max_concurrent: 4,
        }
    }
}

struct CacheEntry {
    trackers: Vec<TorrentTracker>,
    expires_at: Instant,
}

/// Hydrates torrents with their tracker lists.
///
/// Results are cached per hash. Servers with `includeTrackers` support
/// (Web API 2.11.4) are asked in bulk through `torrents/info`; older servers
/// get per-hash `torrents/trackers` calls bounded by a semaphore.
pub struct TrackerManager {
    client: Arc<Api>,
    options: TrackerManagerOptions,
    cache: RwLock<HashMap<String, CacheEntry>>,
    semaphore: Arc<Semaphore>,
}

impl TrackerManager {
    pub fn new(client: Arc<Api>) -> Self {
        Self::with_options(client, TrackerManagerOptions::default())
    }

    pub fn with_options(client: Arc<Api>, options: TrackerManagerOptions) -> Self {
        let permits = options.max_concurrent.max(1);
        Self {
            client,
            options,
            cache: RwLock::new(HashMap::new()),
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Fill in `trackers` on every torrent in the batch that lacks them.
    ///
    /// Fetch failures leave the affected torrents untouched; the first error
    /// is returned after the whole batch was attempted.
    pub async fn populate(&self, torrents: &mut [Torrent]) -> Option<Error> {
        let needed: Vec<(String, Duration)> = torrents
            .iter()
            .filter(|t| t.trackers.is_none() && !t.hash.is_empty())
            .map(|t| (t.hash.clone(), self.entry_ttl(t.reannounce)))
            .collect();
        if needed.is_empty() {
            return None;
        }

        let (found, error) = self.fetch_cached(&needed).await;
        for torrent in torrents.iter_mut() {
            if torrent.trackers.is_none() {
                if let Some(list) = found.get(&torrent.hash) {
                    torrent.trackers = Some(list.clone());
                }
            }
        }
        error
    }

    /// Fetch tracker lists for `hashes`, consulting the cache first.
    ///
    /// Returns whatever could be resolved together with the first error
    /// encountered; hashes that failed are simply absent from the map.
    pub async fn trackers(
        &self,
        hashes: &[String],
    ) -> (HashMap<String, Vec<TorrentTracker>>, Option<Error>) {
        let needed: Vec<(String, Duration)> = hashes
            .iter()
            .map(|h| (h.clone(), self.options.cache_ttl))
            .collect();
        self.fetch_cached(&needed).await
    }

    /// Drop expired cache entries; lookups already ignore them, this just
    /// reclaims the memory.
    pub async fn sweep(&self) {
        let now = Instant::now();
        self.cache.write().await.retain(|_, e| e.expires_at > now);
    }

    fn entry_ttl(&self, reannounce: i64) -> Duration {
        if reannounce > 0 {
            self.options.cache_ttl.min(Duration::from_secs(reannounce as u64))
        } else {
            self.options.cache_ttl
        }
    }

    async fn fetch_cached(
        &self,
        wanted: &[(String, Duration)],
    ) -> (HashMap<String, Vec<TorrentTracker>>, Option<Error>) {
        // dedupe so the server is asked at most once per hash
        let mut seen = HashSet::new();
        let wanted: Vec<&(String, Duration)> = wanted
            .iter()
            .filter(|(hash, _)| seen.insert(hash.clone()))
            .collect();

        let mut found = HashMap::new();
        let mut missing: Vec<String> = Vec::new();
        {
            let now = Instant::now();
            let cache = self.cache.read().await;
            for (hash, _) in wanted.iter().copied() {
                match cache.get(hash) {
                    Some(entry) if entry.expires_at > now => {
                        found.insert(hash.clone(), entry.trackers.clone());
                    }
                    _ => missing.push(hash.clone()),
                }
            }
        }
        if missing.is_empty() {
            return (found, None);
        }

        let (fetched, error) = if self.client.supports_include_trackers().await {
            self.fetch_bulk(&missing).await
        } else {
            self.fetch_per_hash(&missing).await
        };

        let ttls: HashMap<&String, Duration> = wanted
            .iter()
            .copied()
            .map(|(hash, ttl)| (hash, *ttl))
            .collect();
        let mut cache = self.cache.write().await;
        let now = Instant::now();
        for (hash, trackers) in fetched {
            let ttl = ttls.get(&hash).copied().unwrap_or(self.options.cache_ttl);
            cache.insert(
                hash.clone(),
                CacheEntry {
                    trackers: trackers.clone(),
                    expires_at: now + ttl,
                },
            );
            found.insert(hash, trackers);
        }

        (found, error)
    }

    /// Bulk path: `torrents/info` with `includeTrackers`. Unfulfilled hashes
    /// are retried in chunks; a failing chunk downgrades to one unfiltered
    /// fetch-all.
    async fn fetch_bulk(
        &self,
        hashes: &[String],
    ) -> (HashMap<String, Vec<TorrentTracker>>, Option<Error>) {
        let mut fetched = HashMap::new();

        match self.bulk_request(Some(hashes.to_vec())).await {
            Ok(torrents) => collect_embedded(&mut fetched, torrents),
            Err(error) => {
                warn!(%error, "bulk tracker fetch failed, falling back to fetch-all");
                return self.fetch_all(fetched).await;
            }
        }

        let remaining: Vec<String> = hashes
            .iter()
            .filter(|h| !fetched.contains_key(*h))
            .cloned()
            .collect();
        for chunk in remaining.chunks(BULK_CHUNK_SIZE) {
            match self.bulk_request(Some(chunk.to_vec())).await {
                Ok(torrents) => collect_embedded(&mut fetched, torrents),
                Err(error) => {
                    warn!(%error, "tracker chunk fetch failed, falling back to fetch-all");
                    return self.fetch_all(fetched).await;
                }
            }
        }

        (fetched, None)
    }

    /// Last resort of the bulk path: one unfiltered `torrents/info` and keep
    /// whatever comes back.
    async fn fetch_all(
        &self,
        mut fetched: HashMap<String, Vec<TorrentTracker>>,
    ) -> (HashMap<String, Vec<TorrentTracker>>, Option<Error>) {
        match self.bulk_request(None).await {
            Ok(torrents) => {
                collect_embedded(&mut fetched, torrents);
                (fetched, None)
            }
            Err(error) => (fetched, Some(error)),
        }
    }

    async fn bulk_request(&self, hashes: Option<Vec<String>>) -> Result<Vec<Torrent>, Error> {
        let options = TorrentFilterOptions {
            include_trackers: true,
            hashes,
            ..Default::default()
        };
        self.client.torrents(&options).await
    }

    /// Per-hash path for servers without `includeTrackers`. All hashes are
    /// attempted even after a failure; the first error is kept.
    async fn fetch_per_hash(
        &self,
        hashes: &[String],
    ) -> (HashMap<String, Vec<TorrentTracker>>, Option<Error>) {
        let futures = hashes.iter().map(|hash| {
            let client = self.client.clone();
            let semaphore = self.semaphore.clone();
            let hash = hash.clone();
            async move {
                let _permit = semaphore.acquire_owned().await.ok();
                debug!(hash = %hash, "fetching trackers");
                let result = client.torrent_trackers(&hash).await;
                (hash, result)
            }
        });

        let mut fetched = HashMap::new();
        let mut first_error = None;
        for (hash, result) in futures::future::join_all(futures).await {
            match result {
                Ok(trackers) => {
                    fetched.insert(hash, trackers);
                }
                Err(error) => {
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }
        (fetched, first_error)
    }
}

fn collect_embedded(
    fetched: &mut HashMap<String, Vec<TorrentTracker>>,
    torrents: Vec<Torrent>,
) {
    for torrent in torrents {
        if let Some(trackers) = torrent.trackers {
            fetched.insert(torrent.hash, trackers);
        }
    }
}
