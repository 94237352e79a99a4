//! In-memory `SearchStore` backend.
//!
//! The default backend for `spillway serve` and the reference
//! implementation the conformance suite is written against. State lives
//! in a single mutex; contention is negligible at the call rates involved
//! (a handful of writes per analysis session).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::{Date, OffsetDateTime};

use crate::error::StorageError;
use crate::record::{NewSearch, SearchId, SearchRecord, StoredReading};
use crate::traits::SearchStore;

#[derive(Default)]
struct Inner {
    next_id: i64,
    searches: Vec<SearchRecord>,
    readings: HashMap<SearchId, Vec<StoredReading>>,
}

/// Mutex-protected in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave partial state here;
        // recover the guard instead of propagating the poison.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SearchStore for MemoryStore {
    async fn insert_search(&self, search: NewSearch) -> Result<SearchRecord, StorageError> {
        let mut inner = self.lock();
        inner.next_id += 1;
        let record = SearchRecord {
            id: SearchId(inner.next_id),
            dam_name: search.dam_name,
            lat: search.lat,
            lon: search.lon,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.searches.push(record.clone());
        Ok(record)
    }

    async fn insert_readings(
        &self,
        search_id: SearchId,
        readings: &[StoredReading],
    ) -> Result<(), StorageError> {
        let mut inner = self.lock();
        if !inner.searches.iter().any(|s| s.id == search_id) {
            return Err(StorageError::SearchNotFound { id: search_id });
        }
        inner
            .readings
            .entry(search_id)
            .or_default()
            .extend_from_slice(readings);
        Ok(())
    }

    async fn recent_searches(&self, limit: usize) -> Result<Vec<SearchRecord>, StorageError> {
        let inner = self.lock();
        let mut searches = inner.searches.clone();
        searches.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        searches.truncate(limit);
        Ok(searches)
    }

    async fn latest_search_for_dam(
        &self,
        dam_name: &str,
    ) -> Result<Option<SearchRecord>, StorageError> {
        let inner = self.lock();
        Ok(inner
            .searches
            .iter()
            .filter(|s| s.dam_name == dam_name)
            .max_by_key(|s| (s.created_at, s.id))
            .cloned())
    }

    async fn readings_in_range(
        &self,
        search_id: SearchId,
        start: Date,
        end: Date,
    ) -> Result<Vec<StoredReading>, StorageError> {
        let inner = self.lock();
        let mut readings: Vec<StoredReading> = inner
            .readings
            .get(&search_id)
            .map(|all| {
                all.iter()
                    .copied()
                    .filter(|r| start <= r.timestamp && r.timestamp <= end)
                    .collect()
            })
            .unwrap_or_default();
        readings.sort_by_key(|r| r.timestamp);
        Ok(readings)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
