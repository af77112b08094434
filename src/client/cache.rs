//! In-memory query cache.
//!
//! Entries hold type-erased data plus the last error of their query. Data is
//! stale after `stale_time` and the entry is evicted once nobody has read it
//! for `gc_time`. Eviction happens on read, and a background sweep collects
//! entries that are never read again.

use std::any::Any;
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::client::config::QueryConfig;

type SharedData = Arc<dyn Any + Send + Sync>;
type Entries = DashMap<String, CacheEntry>;

/// Shortest period of the background sweep.
const MIN_SWEEP_PERIOD: Duration = Duration::from_secs(1);

/// Cache entry with data and error bookkeeping.
#[derive(Clone)]
struct CacheEntry {
    data: Option<SharedData>,
    data_updated_at: Option<Instant>,
    invalidated: bool,
    error: Option<String>,
    failure_count: u32,
    last_accessed: Instant,
}

impl CacheEntry {
    fn empty(now: Instant) -> Self {
        Self {
            data: None,
            data_updated_at: None,
            invalidated: false,
            error: None,
            failure_count: 0,
            last_accessed: now,
        }
    }
}

/// What the cache knows about one query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntrySnapshot<T> {
    /// Last successfully fetched data.
    pub data: Option<T>,
    /// Whether the data should be refetched.
    pub is_stale: bool,
    /// Message of the last failure since the last success.
    pub error: Option<String>,
    /// Failed attempts since the last success.
    pub failure_count: u32,
}

/// Thread-safe keyed cache for query results.
pub struct QueryCache {
    config: QueryConfig,
    entries: Arc<Entries>,
}

impl QueryCache {
    /// Create a new cache with the given configuration.
    ///
    /// Inside a Tokio runtime this also starts a task that evicts idle
    /// entries every `gc_time`; the task ends when the cache is dropped.
    #[must_use]
    pub fn new(config: QueryConfig) -> Self {
        let entries = Arc::new(Entries::new());
        if let Ok(runtime) = Handle::try_current() {
            runtime.spawn(sweep_idle_entries(Arc::downgrade(&entries), config.gc_time));
        }
        Self { config, entries }
    }

    /// Read an entry.
    ///
    /// Returns `None` when the key is unknown or its entry has been idle for
    /// longer than `gc_time`. Data stored under another type reads as absent.
    #[must_use]
    pub fn snapshot<T>(&self, key: &str) -> Option<EntrySnapshot<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let now = Instant::now();
        let mut entry = self.entries.get_mut(key)?;

        if now.duration_since(entry.last_accessed) >= self.config.gc_time {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        entry.last_accessed = now;

        let data = entry
            .data
            .as_ref()
            .and_then(|data| data.downcast_ref::<T>())
            .cloned();
        let is_stale = entry.invalidated
            || entry
                .data_updated_at
                .is_none_or(|at| now.duration_since(at) >= self.config.stale_time);

        Some(EntrySnapshot {
            data,
            is_stale,
            error: entry.error.clone(),
            failure_count: entry.failure_count,
        })
    }

    /// Fresh data for `key`, if any.
    #[must_use]
    pub fn fresh<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.snapshot::<T>(key)
            .filter(|snapshot| !snapshot.is_stale)
            .and_then(|snapshot| snapshot.data)
    }

    /// Store fetched data, clearing any previous error.
    pub fn set_data<T>(&self, key: &str, data: T)
    where
        T: Send + Sync + 'static,
    {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| CacheEntry::empty(now));
        entry.data = Some(Arc::new(data));
        entry.data_updated_at = Some(now);
        entry.invalidated = false;
        entry.error = None;
        entry.failure_count = 0;
        entry.last_accessed = now;
    }

    /// Record a failed fetch. Previously fetched data is kept.
    pub fn set_error(&self, key: &str, message: impl Into<String>, failures: u32) {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| CacheEntry::empty(now));
        entry.error = Some(message.into());
        entry.failure_count = failures;
        entry.last_accessed = now;
    }

    /// Mark an entry stale so its next use refetches.
    pub fn invalidate(&self, key: &str) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.invalidated = true;
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of entries, including idle ones not yet collected.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict entries idle for longer than `gc_time`.
    pub fn collect_garbage(&self) {
        evict_idle(&self.entries, self.config.gc_time);
    }
}

fn evict_idle(entries: &Entries, gc_time: Duration) {
    let now = Instant::now();
    entries.retain(|_, entry| now.duration_since(entry.last_accessed) < gc_time);
}

async fn sweep_idle_entries(entries: Weak<Entries>, gc_time: Duration) {
    let period = gc_time.max(MIN_SWEEP_PERIOD);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(entries) = entries.upgrade() else {
            break;
        };
        let before = entries.len();
        evict_idle(&entries, gc_time);
        let evicted = before.saturating_sub(entries.len());
        if evicted > 0 {
            tracing::debug!(evicted, "swept idle query cache entries");
        }
    }
}
