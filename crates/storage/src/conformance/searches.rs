use std::future::Future;

use super::{make_search, TestResult};
use crate::SearchStore;

pub(super) async fn run_search_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: SearchStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "searches",
        "insert_assigns_increasing_ids",
        insert_assigns_increasing_ids(factory).await,
    ));
    results.push(TestResult::from_result(
        "searches",
        "insert_echoes_dam_name_and_coords",
        insert_echoes_dam_name_and_coords(factory).await,
    ));
    results.push(TestResult::from_result(
        "searches",
        "recent_searches_newest_first",
        recent_searches_newest_first(factory).await,
    ));
    results.push(TestResult::from_result(
        "searches",
        "recent_searches_honors_limit",
        recent_searches_honors_limit(factory).await,
    ));
    results.push(TestResult::from_result(
        "searches",
        "latest_search_picks_most_recent_insert",
        latest_search_picks_most_recent_insert(factory).await,
    ));
    results.push(TestResult::from_result(
        "searches",
        "latest_search_matches_dam_name_exactly",
        latest_search_matches_dam_name_exactly(factory).await,
    ));
    results.push(TestResult::from_result(
        "searches",
        "latest_search_for_unknown_dam_is_none",
        latest_search_for_unknown_dam_is_none(factory).await,
    ));
    results.push(TestResult::from_result(
        "searches",
        "duplicate_dam_names_are_kept_as_separate_records",
        duplicate_dam_names_are_kept_as_separate_records(factory).await,
    ));
    results.push(TestResult::from_result(
        "searches",
        "interleaved_inserts_keep_ids_unique",
        interleaved_inserts_keep_ids_unique(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

/// Ids must be unique and strictly increasing in insertion order.
async fn insert_assigns_increasing_ids<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SearchStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let a = s
        .insert_search(make_search("Tehri Dam"))
        .await
        .map_err(|e| e.to_string())?;
    let b = s
        .insert_search(make_search("Idukki Dam"))
        .await
        .map_err(|e| e.to_string())?;
    if a.id >= b.id {
        return Err(format!("expected id {} < id {}", a.id, b.id));
    }
    Ok(())
}

/// The returned record must carry the inserted name and coordinates.
async fn insert_echoes_dam_name_and_coords<S, F, Fut>(factory: &F) -> Result<(), String>
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
    if rec.dam_name != "Tehri Dam" {
        return Err(format!("expected dam_name \"Tehri Dam\", got \"{}\"", rec.dam_name));
    }
    if rec.lat != 30.3804 || rec.lon != 78.4806 {
        return Err(format!("coords do not round-trip: {}/{}", rec.lat, rec.lon));
    }
    Ok(())
}

/// History must come back newest first.
async fn recent_searches_newest_first<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SearchStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for name in ["first", "second", "third"] {
        s.insert_search(make_search(name))
            .await
            .map_err(|e| e.to_string())?;
    }
    let recent = s.recent_searches(10).await.map_err(|e| e.to_string())?;
    let names: Vec<&str> = recent.iter().map(|r| r.dam_name.as_str()).collect();
    if names != ["third", "second", "first"] {
        return Err(format!("expected newest first, got {names:?}"));
    }
    Ok(())
}

/// The limit caps the listing without changing its order.
async fn recent_searches_honors_limit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SearchStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for i in 0..12 {
        s.insert_search(make_search(&format!("dam-{i}")))
            .await
            .map_err(|e| e.to_string())?;
    }
    let recent = s.recent_searches(10).await.map_err(|e| e.to_string())?;
    if recent.len() != 10 {
        return Err(format!("expected 10 records, got {}", recent.len()));
    }
    if recent[0].dam_name != "dam-11" {
        return Err(format!(
            "expected \"dam-11\" first, got \"{}\"",
            recent[0].dam_name
        ));
    }
    Ok(())
}

/// Re-analyzing a dam must make the newer record the latest.
async fn latest_search_picks_most_recent_insert<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SearchStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let older = s
        .insert_search(make_search("Tehri Dam"))
        .await
        .map_err(|e| e.to_string())?;
    let newer = s
        .insert_search(make_search("Tehri Dam"))
        .await
        .map_err(|e| e.to_string())?;

    let latest = s
        .latest_search_for_dam("Tehri Dam")
        .await
        .map_err(|e| e.to_string())?
        .ok_or("expected a latest search, got None")?;
    if latest.id != newer.id {
        return Err(format!(
            "expected latest id {} (not {}), got {}",
            newer.id, older.id, latest.id
        ));
    }
    Ok(())
}

/// Lookup is by exact stored name, not fuzzy matching.
async fn latest_search_matches_dam_name_exactly<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SearchStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_search(make_search("Tehri Dam"))
        .await
        .map_err(|e| e.to_string())?;

    if s.latest_search_for_dam("Tehri")
        .await
        .map_err(|e| e.to_string())?
        .is_some()
    {
        return Err("\"Tehri\" must not match the stored \"Tehri Dam\"".to_string());
    }
    if s.latest_search_for_dam("Tehri Dam")
        .await
        .map_err(|e| e.to_string())?
        .is_none()
    {
        return Err("exact name lookup came back empty".to_string());
    }
    Ok(())
}

/// A dam that was never analyzed reads as None, not an error.
async fn latest_search_for_unknown_dam_is_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SearchStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.latest_search_for_dam("Hoover Dam").await {
        Ok(None) => Ok(()),
        Ok(Some(rec)) => Err(format!("expected None, got record id {}", rec.id)),
        Err(e) => Err(format!("expected Ok(None), got error: {e}")),
    }
}

/// No deduplication: the same dam name inserted twice is two records.
async fn duplicate_dam_names_are_kept_as_separate_records<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: SearchStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_search(make_search("Tehri Dam"))
        .await
        .map_err(|e| e.to_string())?;
    s.insert_search(make_search("Tehri Dam"))
        .await
        .map_err(|e| e.to_string())?;

    let recent = s.recent_searches(10).await.map_err(|e| e.to_string())?;
    let count = recent.iter().filter(|r| r.dam_name == "Tehri Dam").count();
    if count != 2 {
        return Err(format!("expected 2 records for the dam, got {count}"));
    }
    Ok(())
}

/// Concurrent-ish inserts (interleaved on one runtime) must not reuse ids.
async fn interleaved_inserts_keep_ids_unique<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SearchStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (a, b, c, d) = tokio::join!(
        s.insert_search(make_search("dam-a")),
        s.insert_search(make_search("dam-b")),
        s.insert_search(make_search("dam-c")),
        s.insert_search(make_search("dam-d")),
    );
    let mut ids = vec![
        a.map_err(|e| e.to_string())?.id,
        b.map_err(|e| e.to_string())?.id,
        c.map_err(|e| e.to_string())?.id,
        d.map_err(|e| e.to_string())?.id,
    ];
    ids.sort();
    ids.dedup();
    if ids.len() != 4 {
        return Err(format!("expected 4 distinct ids, got {}", ids.len()));
    }
    Ok(())
}
