use async_trait::async_trait;

use time::Date;

use crate::error::StorageError;
use crate::record::{NewSearch, SearchId, SearchRecord, StoredReading};

/// The persistence trait for Spillway backends.
///
/// A `SearchStore` keeps one record per completed analysis (the "search")
/// plus the bulk time-series readings attached to it. The two writes are
/// deliberately separate calls, not a transaction: the pipeline treats the
/// search insert as mandatory and the readings insert as best-effort, and
/// a backend must not couple them.
///
/// ## Write path
///
/// 1. `insert_search` -- persist the search, get back its assigned id
/// 2. `insert_readings` -- attach the cleaned series to that id
///
/// ## Read path
///
/// History and range-comparison queries never mutate. Reads of a search id
/// that does not exist return empty results rather than an error; only
/// writes against a missing id fail, because a reading without its parent
/// search would be unreachable garbage.
///
/// ## Thread safety
///
/// Implementations must be `Send + Sync + 'static` to be used in axum
/// application state and across async task boundaries, and must tolerate
/// concurrent independent calls (many analysis sessions run at once).
#[async_trait]
pub trait SearchStore: Send + Sync + 'static {
    // ── Write path ────────────────────────────────────────────────────────

    /// Persist a new search record.
    ///
    /// Assigns the id and creation timestamp; ids are unique and strictly
    /// increasing in insertion order. Concurrent inserts of the same dam
    /// name are two records -- deduplication is explicitly not performed.
    async fn insert_search(&self, search: NewSearch) -> Result<SearchRecord, StorageError>;

    /// Bulk-attach readings to an existing search.
    ///
    /// Returns `Err(StorageError::SearchNotFound)` if no search with this
    /// id exists. An empty slice is a valid no-op.
    async fn insert_readings(
        &self,
        search_id: SearchId,
        readings: &[StoredReading],
    ) -> Result<(), StorageError>;

    // ── Read path ─────────────────────────────────────────────────────────

    /// The most recent `limit` searches, newest first.
    async fn recent_searches(&self, limit: usize) -> Result<Vec<SearchRecord>, StorageError>;

    /// The most recent search whose dam name matches `dam_name` exactly,
    /// or `None` if that dam has never been analyzed. Ties on timestamp
    /// resolve to the higher id (the later insert).
    async fn latest_search_for_dam(
        &self,
        dam_name: &str,
    ) -> Result<Option<SearchRecord>, StorageError>;

    /// Readings attached to `search_id` with `start <= timestamp <= end`,
    /// ascending by timestamp. Unknown ids read as empty.
    async fn readings_in_range(
        &self,
        search_id: SearchId,
        start: Date,
        end: Date,
    ) -> Result<Vec<StoredReading>, StorageError>;
}
