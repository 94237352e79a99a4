use std::future::Future;

use time::macros::date;
use time::Date;

use super::{make_reading, make_search, TestResult};
use crate::{SearchId, SearchStore, StorageError};

pub(super) async fn run_reading_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: SearchStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "readings",
        "readings_attach_to_their_search",
        readings_attach_to_their_search(factory).await,
    ));
    results.push(TestResult::from_result(
        "readings",
        "insert_for_unknown_search_fails",
        insert_for_unknown_search_fails(factory).await,
    ));
    results.push(TestResult::from_result(
        "readings",
        "empty_insert_is_a_no_op",
        empty_insert_is_a_no_op(factory).await,
    ));
    results.push(TestResult::from_result(
        "readings",
        "range_query_is_inclusive_on_both_ends",
        range_query_is_inclusive_on_both_ends(factory).await,
    ));
    results.push(TestResult::from_result(
        "readings",
        "range_query_sorts_ascending",
        range_query_sorts_ascending(factory).await,
    ));
    results.push(TestResult::from_result(
        "readings",
        "range_query_outside_data_is_empty",
        range_query_outside_data_is_empty(factory).await,
    ));
    results.push(TestResult::from_result(
        "readings",
        "unknown_search_reads_as_empty",
        unknown_search_reads_as_empty(factory).await,
    ));
    results.push(TestResult::from_result(
        "readings",
        "searches_do_not_share_readings",
        searches_do_not_share_readings(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

/// Inserted readings must be readable back under the same search id.
async fn readings_attach_to_their_search<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SearchStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = s
        .insert_search(make_search("Tehri Dam"))
        .await
        .map_err(|e| e.to_string())?;
    s.insert_readings(
        rec.id,
        &[
            make_reading(date!(2025 - 01 - 10), 826.5),
            make_reading(date!(2025 - 02 - 10), 827.1),
        ],
    )
    .await
    .map_err(|e| e.to_string())?;

    let back = s
        .readings_in_range(rec.id, date!(2025 - 01 - 01), date!(2025 - 12 - 31))
        .await
        .map_err(|e| e.to_string())?;
    if back.len() != 2 {
        return Err(format!("expected 2 readings, got {}", back.len()));
    }
    Ok(())
}

/// Writing readings against a missing search id must fail with
/// SearchNotFound carrying that id.
async fn insert_for_unknown_search_fails<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SearchStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let result = s
        .insert_readings(SearchId(42), &[make_reading(date!(2025 - 01 - 10), 826.5)])
        .await;
    match result {
        Err(StorageError::SearchNotFound { id }) => {
            if id != SearchId(42) {
                return Err(format!("error carries wrong id: {id}"));
            }
            Ok(())
        }
        Err(e) => Err(format!("expected SearchNotFound, got: {e}")),
        Ok(()) => Err("expected SearchNotFound error, but got Ok".to_string()),
    }
}

/// An empty batch is valid and leaves the search readable with no readings.
async fn empty_insert_is_a_no_op<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SearchStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = s
        .insert_search(make_search("Tehri Dam"))
        .await
        .map_err(|e| e.to_string())?;
    s.insert_readings(rec.id, &[])
        .await
        .map_err(|e| e.to_string())?;

    let back = s
        .readings_in_range(rec.id, date!(2020 - 01 - 01), date!(2030 - 01 - 01))
        .await
        .map_err(|e| e.to_string())?;
    if !back.is_empty() {
        return Err(format!("expected no readings, got {}", back.len()));
    }
    Ok(())
}

/// Readings exactly on the window edges must be included.
async fn range_query_is_inclusive_on_both_ends<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SearchStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = s
        .insert_search(make_search("Tehri Dam"))
        .await
        .map_err(|e| e.to_string())?;
    s.insert_readings(
        rec.id,
        &[
            make_reading(date!(2025 - 01 - 01), 826.0),
            make_reading(date!(2025 - 01 - 15), 826.4),
            make_reading(date!(2025 - 01 - 31), 826.9),
        ],
    )
    .await
    .map_err(|e| e.to_string())?;

    let back = s
        .readings_in_range(rec.id, date!(2025 - 01 - 01), date!(2025 - 01 - 31))
        .await
        .map_err(|e| e.to_string())?;
    if back.len() != 3 {
        return Err(format!("expected 3 readings (inclusive ends), got {}", back.len()));
    }
    Ok(())
}

/// Results come back ascending by timestamp regardless of insert order.
async fn range_query_sorts_ascending<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SearchStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = s
        .insert_search(make_search("Tehri Dam"))
        .await
        .map_err(|e| e.to_string())?;
    s.insert_readings(
        rec.id,
        &[
            make_reading(date!(2025 - 03 - 01), 828.0),
            make_reading(date!(2025 - 01 - 01), 826.0),
            make_reading(date!(2025 - 02 - 01), 827.0),
        ],
    )
    .await
    .map_err(|e| e.to_string())?;

    let back = s
        .readings_in_range(rec.id, date!(2025 - 01 - 01), date!(2025 - 12 - 31))
        .await
        .map_err(|e| e.to_string())?;
    let dates: Vec<Date> = back.iter().map(|r| r.timestamp).collect();
    let mut sorted = dates.clone();
    sorted.sort();
    if dates != sorted {
        return Err(format!("readings not ascending: {dates:?}"));
    }
    Ok(())
}

/// A window with no overlapping readings reads as empty, not an error.
async fn range_query_outside_data_is_empty<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SearchStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = s
        .insert_search(make_search("Tehri Dam"))
        .await
        .map_err(|e| e.to_string())?;
    s.insert_readings(rec.id, &[make_reading(date!(2025 - 06 - 15), 828.4)])
        .await
        .map_err(|e| e.to_string())?;

    let back = s
        .readings_in_range(rec.id, date!(2024 - 01 - 01), date!(2024 - 12 - 31))
        .await
        .map_err(|e| e.to_string())?;
    if !back.is_empty() {
        return Err(format!("expected empty window, got {} readings", back.len()));
    }
    Ok(())
}

/// Reading a search id that does not exist is empty, not an error.
async fn unknown_search_reads_as_empty<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SearchStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let back = s
        .readings_in_range(SearchId(7), date!(2020 - 01 - 01), date!(2030 - 01 - 01))
        .await
        .map_err(|e| e.to_string())?;
    if !back.is_empty() {
        return Err(format!("expected empty result, got {} readings", back.len()));
    }
    Ok(())
}

/// Readings attached to one search must not leak into another.
async fn searches_do_not_share_readings<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SearchStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let tehri = s
        .insert_search(make_search("Tehri Dam"))
        .await
        .map_err(|e| e.to_string())?;
    let idukki = s
        .insert_search(make_search("Idukki Dam"))
        .await
        .map_err(|e| e.to_string())?;
    s.insert_readings(tehri.id, &[make_reading(date!(2025 - 06 - 15), 828.4)])
        .await
        .map_err(|e| e.to_string())?;

    let other = s
        .readings_in_range(idukki.id, date!(2020 - 01 - 01), date!(2030 - 01 - 01))
        .await
        .map_err(|e| e.to_string())?;
    if !other.is_empty() {
        return Err(format!(
            "readings leaked across searches: {} readings",
            other.len()
        ));
    }
    Ok(())
}
