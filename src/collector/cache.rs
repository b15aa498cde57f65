//! Single-entry, time-bounded cache for the latest [`Batch`].
//!
//! Staleness is computed from the entry's expiry at access time; nothing
//! runs in the background.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::types::Batch;

/// A cached batch and the instant it stops being served.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    batch: Arc<Batch>,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(batch: Arc<Batch>, expires_at: DateTime<Utc>) -> Self {
        Self { batch, expires_at }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Holds at most one [`CacheEntry`]. Readers get a shared `Arc<Batch>`;
/// [`BatchCache::store`] swaps the whole entry.
#[derive(Debug)]
pub struct BatchCache {
    ttl: TimeDelta,
    entry: RwLock<Option<CacheEntry>>,
}

impl BatchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            entry: RwLock::new(None),
        }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// `true` when there is no entry or the entry has expired.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.read_entry().as_ref().is_none_or(|e| e.is_stale(now))
    }

    /// The cached batch, if it is still fresh at `now`.
    pub fn fresh(&self, now: DateTime<Utc>) -> Option<Arc<Batch>> {
        self.read_entry()
            .as_ref()
            .filter(|e| !e.is_stale(now))
            .map(|e| Arc::clone(&e.batch))
    }

    /// Replaces the entry with `batch`, fresh until `now + ttl`.
    pub fn store(&self, batch: Batch, now: DateTime<Utc>) -> Arc<Batch> {
        let batch = Arc::new(batch);
        let expires_at = now
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut entry = self.entry.write().unwrap_or_else(PoisonError::into_inner);
        *entry = Some(CacheEntry::new(Arc::clone(&batch), expires_at));
        batch
    }

    pub fn entry(&self) -> Option<CacheEntry> {
        self.read_entry().clone()
    }

    fn read_entry(&self) -> std::sync::RwLockReadGuard<'_, Option<CacheEntry>> {
        self.entry.read().unwrap_or_else(PoisonError::into_inner)
    }
}
