//! Concurrent TTL cache for short-lived vendor credentials.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_LIMIT: usize = 100;
const MIN_SWEEP_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// In-memory cache whose entries expire `ttl` after insertion.
///
/// Expired entries are never returned. They are physically removed by
/// [`TtlCache::purge_expired`], which runs automatically after a write once
/// the cache holds `limit` or more entries.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    ttl: Duration,
    limit: usize,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration, limit: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            limit,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Insert or replace `key`, then shrink if the limit is reached.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
        self.shrink();
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.expires_at > Instant::now() {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            tracing::debug!(purged, remaining = self.entries.len(), "purged expired cache entries");
        }
        purged
    }

    /// Purge only once the cache has grown to its limit.
    pub fn shrink(&self) -> usize {
        if self.entries.len() < self.limit {
            return 0;
        }
        self.purge_expired()
    }
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    /// Spawn a background task that purges expired entries every `period`.
    ///
    /// The task stops when the returned handle is dropped. A zero period is
    /// raised to one second.
    pub fn start_sweeper(self: Arc<Self>, period: Duration) -> SweeperHandle {
        let period = period.max(MIN_SWEEP_PERIOD);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                self.purge_expired();
            }
        });
        SweeperHandle { task }
    }
}

/// Owns a cache sweeper task and aborts it on drop.
#[derive(Debug)]
pub struct SweeperHandle {
    task: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
