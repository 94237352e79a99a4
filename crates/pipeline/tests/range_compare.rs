//! Range-comparison tests over a seeded in-memory store.
//!
//! [`compare_range`] is pure read-path: every test seeds searches and
//! readings through the storage trait, then asserts the derived levels,
//! rate, and projection. Error texts are asserted verbatim because the
//! HTTP layer returns them to the client as-is.

use time::macros::date;
use time::Date;

use spillway_core::{DamRegistry, Prediction};
use spillway_pipeline::{compare_range, CompareError};
use spillway_storage::{MemoryStore, NewSearch, SearchId, SearchStore, StoredReading};

// ──────────────────────────────────────────────
// Test fixtures
// ──────────────────────────────────────────────

/// Insert one search for `dam_name` with the given `(date, level)`
/// readings attached; returns the assigned search id.
async fn seed_search(store: &MemoryStore, dam_name: &str, readings: &[(Date, f64)]) -> SearchId {
    let record = store
        .insert_search(NewSearch {
            dam_name: dam_name.to_string(),
            lat: 30.3804,
            lon: 78.4806,
        })
        .await
        .unwrap();
    let stored: Vec<StoredReading> = readings
        .iter()
        .map(|&(timestamp, water_level_m)| StoredReading {
            timestamp,
            water_level_m,
        })
        .collect();
    store.insert_readings(record.id, &stored).await.unwrap();
    record.id
}

// ──────────────────────────────────────────────
// Derived quantities
// ──────────────────────────────────────────────

/// First and last readings in the window anchor the comparison; the rate
/// spans the full ten days and feeds a capacity projection.
#[tokio::test]
async fn comparison_spans_first_to_last_reading() {
    let store = MemoryStore::new();
    let registry = DamRegistry::builtin();
    seed_search(
        &store,
        "Tehri Dam",
        &[
            (date!(2025 - 06 - 05), 826.0),
            (date!(2025 - 06 - 10), 827.0),
            (date!(2025 - 06 - 15), 828.5),
        ],
    )
    .await;

    let comparison = compare_range(
        &store,
        &registry,
        "Tehri Dam",
        date!(2025 - 06 - 01),
        date!(2025 - 06 - 30),
    )
    .await
    .expect("seeded range should compare");

    assert_eq!(comparison.start_level, 826.0);
    assert_eq!(comparison.end_level, 828.5);
    assert_eq!(comparison.difference, 2.5);
    assert_eq!(comparison.days, 10);
    assert_eq!(comparison.rate_of_change, 0.25);
    assert_eq!(comparison.data.len(), 3);

    // Tehri capacity is 830.0: 1.5 m of headroom at 0.25 m/day.
    match comparison.prediction {
        Prediction::Ready {
            days_to_open,
            predicted_open_date,
            predicted_level_at_open,
            ..
        } => {
            assert_eq!(days_to_open, 6);
            assert_eq!(predicted_open_date, date!(2025 - 06 - 21));
            assert_eq!(predicted_level_at_open, 830.0);
        }
        Prediction::Unavailable { message } => panic!("expected Ready, got {message}"),
    }
}

/// A narrower window drops readings outside it and re-anchors the
/// endpoints to what remains.
#[tokio::test]
async fn window_clips_the_comparison() {
    let store = MemoryStore::new();
    let registry = DamRegistry::builtin();
    seed_search(
        &store,
        "Tehri Dam",
        &[
            (date!(2025 - 06 - 05), 826.0),
            (date!(2025 - 06 - 10), 827.0),
            (date!(2025 - 06 - 15), 828.5),
        ],
    )
    .await;

    let comparison = compare_range(
        &store,
        &registry,
        "Tehri Dam",
        date!(2025 - 06 - 08),
        date!(2025 - 06 - 30),
    )
    .await
    .expect("clipped range should compare");

    assert_eq!(comparison.start_level, 827.0);
    assert_eq!(comparison.end_level, 828.5);
    assert_eq!(comparison.difference, 1.5);
    assert_eq!(comparison.days, 5);
    assert_eq!(comparison.rate_of_change, 0.3);
    assert_eq!(comparison.data.len(), 2);
}

/// One reading in range compares to itself: zero difference over a
/// clamped one-day span, and a flat level is "not rising".
#[tokio::test]
async fn single_reading_compares_to_itself() {
    let store = MemoryStore::new();
    let registry = DamRegistry::builtin();
    seed_search(&store, "Tehri Dam", &[(date!(2025 - 06 - 15), 828.5)]).await;

    let comparison = compare_range(
        &store,
        &registry,
        "Tehri Dam",
        date!(2025 - 06 - 01),
        date!(2025 - 06 - 30),
    )
    .await
    .expect("a single reading should still compare");

    assert_eq!(comparison.start_level, 828.5);
    assert_eq!(comparison.end_level, 828.5);
    assert_eq!(comparison.difference, 0.0);
    assert_eq!(comparison.days, 1);
    assert_eq!(comparison.rate_of_change, 0.0);
    assert_eq!(comparison.prediction, Prediction::unavailable("not rising"));
}

/// Falling levels come back with a negative difference and no projection.
#[tokio::test]
async fn falling_levels_yield_a_negative_difference() {
    let store = MemoryStore::new();
    let registry = DamRegistry::builtin();
    seed_search(
        &store,
        "Tehri Dam",
        &[
            (date!(2025 - 06 - 05), 828.5),
            (date!(2025 - 06 - 15), 826.0),
        ],
    )
    .await;

    let comparison = compare_range(
        &store,
        &registry,
        "Tehri Dam",
        date!(2025 - 06 - 01),
        date!(2025 - 06 - 30),
    )
    .await
    .expect("falling levels should still compare");

    assert_eq!(comparison.difference, -2.5);
    assert_eq!(comparison.rate_of_change, -0.25);
    assert_eq!(comparison.prediction, Prediction::unavailable("not rising"));
}

// ──────────────────────────────────────────────
// Anchoring
// ──────────────────────────────────────────────

/// When a dam has been analyzed twice, the comparison reads the readings
/// of the most recent search, not the first.
#[tokio::test]
async fn comparison_anchors_to_the_latest_search() {
    let store = MemoryStore::new();
    let registry = DamRegistry::builtin();
    seed_search(&store, "Tehri Dam", &[(date!(2025 - 06 - 05), 820.0)]).await;
    seed_search(
        &store,
        "Tehri Dam",
        &[
            (date!(2025 - 06 - 05), 826.0),
            (date!(2025 - 06 - 15), 828.5),
        ],
    )
    .await;

    let comparison = compare_range(
        &store,
        &registry,
        "Tehri Dam",
        date!(2025 - 06 - 01),
        date!(2025 - 06 - 30),
    )
    .await
    .expect("the later search should anchor the comparison");

    assert_eq!(comparison.data.len(), 2, "older search's readings ignored");
    assert_eq!(comparison.start_level, 826.0);
}

/// Names match the search record verbatim; the registry's fuzzy matching
/// does not apply to the anchor lookup.
#[tokio::test]
async fn anchor_lookup_is_exact_on_the_stored_name() {
    let store = MemoryStore::new();
    let registry = DamRegistry::builtin();
    seed_search(&store, "Tehri Dam", &[(date!(2025 - 06 - 15), 828.5)]).await;

    let err = compare_range(
        &store,
        &registry,
        "Tehri",
        date!(2025 - 06 - 01),
        date!(2025 - 06 - 30),
    )
    .await
    .expect_err("a different spelling has no prior analysis");
    assert!(matches!(err, CompareError::NoPriorAnalysis));
}

// ──────────────────────────────────────────────
// Error paths
// ──────────────────────────────────────────────

/// No prior analysis at all: the user is told to run a search first.
#[tokio::test]
async fn unknown_dam_needs_a_search_first() {
    let store = MemoryStore::new();
    let registry = DamRegistry::builtin();

    let err = compare_range(
        &store,
        &registry,
        "Tehri Dam",
        date!(2025 - 06 - 01),
        date!(2025 - 06 - 30),
    )
    .await
    .expect_err("an empty store has no prior analysis");

    assert!(matches!(err, CompareError::NoPriorAnalysis));
    assert_eq!(
        err.to_string(),
        "Could not find a previous analysis for this dam. Please run a search first."
    );
}

/// A window that misses every stored reading is a distinct error from
/// never having analyzed the dam.
#[tokio::test]
async fn empty_window_has_no_data() {
    let store = MemoryStore::new();
    let registry = DamRegistry::builtin();
    seed_search(&store, "Tehri Dam", &[(date!(2025 - 06 - 15), 828.5)]).await;

    let err = compare_range(
        &store,
        &registry,
        "Tehri Dam",
        date!(2025 - 01 - 01),
        date!(2025 - 01 - 31),
    )
    .await
    .expect_err("January has no readings");

    assert!(matches!(err, CompareError::NoDataInRange));
    assert_eq!(err.to_string(), "No data found for the selected range.");
}

/// A dam outside the registry still gets its levels compared; only the
/// projection degrades, because there is no capacity to project against.
#[tokio::test]
async fn unconfigured_dam_reports_capacity_unavailable() {
    let store = MemoryStore::new();
    let registry = DamRegistry::builtin();
    seed_search(
        &store,
        "Koyna Dam",
        &[
            (date!(2025 - 06 - 05), 650.0),
            (date!(2025 - 06 - 15), 652.5),
        ],
    )
    .await;

    let comparison = compare_range(
        &store,
        &registry,
        "Koyna Dam",
        date!(2025 - 06 - 01),
        date!(2025 - 06 - 30),
    )
    .await
    .expect("missing capacity must not fail the comparison");

    assert_eq!(comparison.difference, 2.5);
    assert_eq!(
        comparison.prediction,
        Prediction::unavailable("capacity or rate unavailable")
    );
}
