//! Time-bounded caching.
//!
//! [`Cached`] carries explicit metadata (value, store time, TTL) so freshness
//! is checked against a [`Clock`](crate::clock::Clock) instead of hidden in a
//! decorator. [`ResultCache`] keys query results by SQL text and parameters.
//! [`Stored`] is the wall-clock form written to disk between runs.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::query::QueryParams;
use crate::table::TabularResult;

/// A value with the instant it was stored and how long it stays valid.
#[derive(Debug, Clone)]
pub struct Cached<T> {
    /// The cached value.
    pub value: T,
    /// When the value was stored.
    pub stored_at: Instant,
    /// How long the value stays fresh.
    pub ttl: Duration,
}

impl<T> Cached<T> {
    /// Wraps a value stored at `now`.
    pub fn new(value: T, now: Instant, ttl: Duration) -> Self {
        Self {
            value,
            stored_at: now,
            ttl,
        }
    }

    /// Returns true while `now` is inside the TTL window.
    pub fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }

    /// Returns the value if still fresh.
    pub fn get(&self, now: Instant) -> Option<&T> {
        self.is_fresh(now).then_some(&self.value)
    }
}

impl<T: Clone> Cached<T> {
    /// Saved form, with the store time converted to wall-clock time.
    pub fn to_stored(&self, now: Instant, now_utc: DateTime<Utc>) -> Stored<T> {
        let age = ChronoDuration::from_std(now.saturating_duration_since(self.stored_at))
            .unwrap_or_else(|_| ChronoDuration::zero());
        Stored {
            value: self.value.clone(),
            stored_at: now_utc.checked_sub_signed(age).unwrap_or(now_utc),
        }
    }
}

impl<T> Cached<T> {
    /// Rebuilds a saved value under `ttl`.
    ///
    /// Returns `None` when the value is already stale, or stamped later than
    /// `now_utc`.
    pub fn from_stored(
        stored: Stored<T>,
        ttl: Duration,
        now: Instant,
        now_utc: DateTime<Utc>,
    ) -> Option<Self> {
        let age = (now_utc - stored.stored_at).to_std().ok()?;
        if age >= ttl {
            return None;
        }
        let stored_at = now.checked_sub(age)?;
        Some(Self::new(stored.value, stored_at, ttl))
    }
}

/// A cached value as saved between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<T> {
    pub value: T,
    pub stored_at: DateTime<Utc>,
}

/// How a query run treats the result cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// Serve a fresh cached result when there is one.
    #[default]
    Reuse,
    /// Always run the query, then store the new result.
    Refresh,
}

/// Cache of query results keyed by SQL text and parameters.
///
/// Advisory: a miss just means the query runs again.
#[derive(Debug)]
pub struct ResultCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Cached<TabularResult>>>,
}

impl ResultCache {
    /// Creates an empty cache with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Builds the cache key for a query.
    pub fn key(sql: &str, params: &QueryParams) -> String {
        format!("{}\u{1f}{}", sql.trim(), params.cache_key())
    }

    /// Returns a fresh cached result, evicting it if stale.
    pub fn get(&self, key: &str, now: Instant) -> Option<TabularResult> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if entry.is_fresh(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores a result.
    pub fn insert(&self, key: String, result: TabularResult, now: Instant) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, Cached::new(result, now, self.ttl));
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Fresh entries in saved form.
    pub fn snapshot(
        &self,
        now: Instant,
        now_utc: DateTime<Utc>,
    ) -> BTreeMap<String, Stored<TabularResult>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .filter(|(_, entry)| entry.is_fresh(now))
            .map(|(key, entry)| (key.clone(), entry.to_stored(now, now_utc)))
            .collect()
    }

    /// Loads saved entries that are still fresh under this cache's TTL.
    /// Returns how many were kept.
    pub fn restore(
        &self,
        saved: BTreeMap<String, Stored<TabularResult>>,
        now: Instant,
        now_utc: DateTime<Utc>,
    ) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut kept = 0;
        for (key, stored) in saved {
            if let Some(entry) = Cached::from_stored(stored, self.ttl, now, now_utc) {
                entries.insert(key, entry);
                kept += 1;
            }
        }
        kept
    }

    /// Number of stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
