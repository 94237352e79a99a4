//! Water-level comparison between two dates of a previously analyzed dam.
//!
//! Reads persisted readings only; no oracle round-trips. The dam must have
//! been analyzed at least once, since the comparison is anchored to the
//! most recent search record for that exact name.

use serde::Serialize;
use time::Date;

use spillway_core::{predict, round2, DamRegistry, Prediction};
use spillway_storage::{SearchStore, StorageError, StoredReading};

/// Why a comparison could not be produced.
///
/// The first two variants are user-correctable and their messages are
/// returned verbatim to the client; `Storage` is an operational fault.
#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    #[error("Could not find a previous analysis for this dam. Please run a search first.")]
    NoPriorAnalysis,
    #[error("No data found for the selected range.")]
    NoDataInRange,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Comparison of the first and last persisted readings in a date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeComparison {
    pub start_level: f64,
    pub end_level: f64,
    /// End minus start, rounded to two decimals.
    pub difference: f64,
    /// Calendar days between the two readings, at least 1.
    pub days: i64,
    /// Meters per day over the span, from the unrounded difference.
    pub rate_of_change: f64,
    /// Every reading in the range, ascending by date.
    pub data: Vec<StoredReading>,
    pub prediction: Prediction,
}

/// Compare the stored water levels of `dam_name` between `start` and `end`
/// (inclusive).
///
/// The rate divides the unrounded level difference by the day span between
/// the first and last reading, clamped to one day so two readings on the
/// same date yield a finite rate. The projection reuses that rate against
/// the registry capacity when the dam is configured; otherwise the
/// prediction reports why it is unavailable.
pub async fn compare_range(
    store: &dyn SearchStore,
    registry: &DamRegistry,
    dam_name: &str,
    start: Date,
    end: Date,
) -> Result<RangeComparison, CompareError> {
    let search = store
        .latest_search_for_dam(dam_name)
        .await?
        .ok_or(CompareError::NoPriorAnalysis)?;

    let readings = store.readings_in_range(search.id, start, end).await?;
    let (Some(first), Some(last)) = (readings.first(), readings.last()) else {
        return Err(CompareError::NoDataInRange);
    };
    let (start_level, end_level) = (first.water_level_m, last.water_level_m);
    let days = (last.timestamp - first.timestamp).whole_days().max(1);
    let end_date = last.timestamp;

    let raw_difference = end_level - start_level;
    let rate = raw_difference / days as f64;

    let capacity = registry.find(dam_name).map(|config| config.capacity_m);
    let prediction = predict(end_level, Some(rate), capacity, end_date);

    Ok(RangeComparison {
        start_level,
        end_level,
        difference: round2(raw_difference),
        days,
        rate_of_change: rate,
        data: readings,
        prediction,
    })
}
