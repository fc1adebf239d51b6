//! In-memory, retention-bounded history of aggregated records.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::{AggregatedRecord, CoreError, Location, LocationKey, UtcDateTime};

/// Dual retention applied on every write. Zero disables either bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_entries: usize,
    pub max_age: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_entries: 96,
            max_age: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl RetentionPolicy {
    pub const fn unbounded() -> Self {
        Self {
            max_entries: 0,
            max_age: Duration::ZERO,
        }
    }
}

#[derive(Debug, Default)]
struct HistoryInner {
    map: HashMap<LocationKey, VecDeque<AggregatedRecord>>,
}

impl HistoryInner {
    fn append(
        &mut self,
        key: LocationKey,
        record: AggregatedRecord,
        policy: RetentionPolicy,
        now: UtcDateTime,
    ) {
        let history = self.map.entry(key).or_default();
        history.push_back(record);

        if policy.max_entries > 0 {
            while history.len() > policy.max_entries {
                history.pop_front();
            }
        }

        if !policy.max_age.is_zero() {
            evict_older_than(history, now.saturating_sub(policy.max_age));
        }
    }
}

fn evict_older_than(history: &mut VecDeque<AggregatedRecord>, cutoff: UtcDateTime) {
    while history
        .front()
        .is_some_and(|oldest| oldest.observed_at < cutoff)
    {
        history.pop_front();
    }
}

/// Thread-safe per-location history.
///
/// One read/write lock guards the whole map: reads run concurrently, writes
/// (append plus eviction) are exclusive. Clones share the same history.
#[derive(Clone)]
pub struct HistoryStore {
    inner: Arc<tokio::sync::RwLock<HistoryInner>>,
    policy: RetentionPolicy,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(RetentionPolicy::default())
    }
}

impl HistoryStore {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: RetentionPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(HistoryInner::default())),
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Appends `record`, then trims by count, then by age.
    pub async fn write(&self, location: &Location, record: AggregatedRecord) {
        let now = self.clock.now();
        let mut store = self.inner.write().await;
        store.append(location.key(), record, self.policy, now);
    }

    /// Most recently written record for `location`.
    pub async fn latest(&self, location: &Location) -> Result<AggregatedRecord, CoreError> {
        let key = location.key();
        let store = self.inner.read().await;
        store
            .map
            .get(&key)
            .and_then(|history| history.back().cloned())
            .ok_or_else(|| CoreError::not_found(key.as_str()))
    }

    /// Records with `from <= observed_at <= to`, in write order.
    ///
    /// An unknown location, an inverted range and an empty match all report
    /// `NotFound`.
    pub async fn range(
        &self,
        location: &Location,
        from: UtcDateTime,
        to: UtcDateTime,
    ) -> Result<Vec<AggregatedRecord>, CoreError> {
        let key = location.key();
        if from > to {
            return Err(CoreError::not_found(key.as_str()));
        }

        let store = self.inner.read().await;
        let records: Vec<AggregatedRecord> = store
            .map
            .get(&key)
            .map(|history| {
                history
                    .iter()
                    .filter(|record| record.observed_at >= from && record.observed_at <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if records.is_empty() {
            Err(CoreError::not_found(key.as_str()))
        } else {
            Ok(records)
        }
    }

    /// Applies the age bound to every history without writing.
    ///
    /// Returns the number of evicted records.
    pub async fn evict_expired(&self) -> usize {
        if self.policy.max_age.is_zero() {
            return 0;
        }

        let cutoff = self.clock.now().saturating_sub(self.policy.max_age);
        let mut store = self.inner.write().await;
        let mut evicted = 0;
        for history in store.map.values_mut() {
            let before = history.len();
            evict_older_than(history, cutoff);
            evicted += before - history.len();
        }
        store.map.retain(|_, history| !history.is_empty());
        evicted
    }

    /// Keys with at least one stored record, sorted.
    pub async fn locations(&self) -> Vec<LocationKey> {
        let store = self.inner.read().await;
        let mut keys: Vec<LocationKey> = store
            .map
            .iter()
            .filter(|(_, history)| !history.is_empty())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Number of records held for `location`.
    pub async fn len(&self, location: &Location) -> usize {
        let store = self.inner.read().await;
        store.map.get(&location.key()).map_or(0, VecDeque::len)
    }
}
