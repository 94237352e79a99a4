//! The five-stage analysis session.
//!
//! One call to [`run_session`] is one session: strictly sequential stages,
//! each consuming the previous stage's output from an explicit
//! [`SessionContext`], progress emitted after every transition, exactly
//! one terminal event. Sessions share nothing mutable with each other;
//! concurrency across sessions is the caller's business (the server
//! spawns one task per request).

use std::collections::BTreeMap;

use time::{Date, Month, OffsetDateTime};

use spillway_core::{
    decide, predict, round2, AnalysisArea, Coordinates, DamConfig, DamRegistry, DateRange,
    Decision, DecisionParams, DepthTier, ElevationProfile, Prediction, RawReading, SummaryStats,
    TimeSeriesReading,
};
use spillway_oracle::{AnalysisOracle, Geocoder};
use spillway_storage::{NewSearch, SearchStore, StoredReading};

use crate::error::PipelineError;
use crate::event::{AnalysisEvent, ProgressSink, StageEvent};
use crate::payload::AnalysisResults;

/// Radius of the circular analysis area around the geocoded point.
pub const ANALYSIS_BUFFER_RADIUS_M: f64 = 20_000.0;
/// Length of the historical window, in calendar years back from today.
pub const HISTORY_WINDOW_YEARS: i32 = 5;
/// Depth offsets (m, relative to the surface height) of the elevation
/// profile tiers, surface first.
pub const DEPTH_OFFSETS_M: [f64; 6] = [0.0, -2.0, -5.0, -10.0, -15.0, -20.0];

/// Opaque per-session identifier, used only for log correlation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        SessionId(format!("{:016x}", rand::random::<u64>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tunables of one session. `today` is injected rather than read from the
/// clock inside the pipeline so tests and replays are deterministic.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub buffer_radius_m: f64,
    pub history_years: i32,
    pub today: Date,
}

impl PipelineConfig {
    pub fn for_today(today: Date) -> Self {
        Self {
            buffer_radius_m: ANALYSIS_BUFFER_RADIUS_M,
            history_years: HISTORY_WINDOW_YEARS,
            today,
        }
    }
}

/// Today in UTC; the conventional argument to [`PipelineConfig::for_today`].
pub fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}

/// The collaborators one session runs against.
///
/// Borrowed, not owned: the server keeps the long-lived instances and
/// lends them to each spawned session.
pub struct SessionEnv<'a> {
    pub geocoder: &'a dyn Geocoder,
    pub oracle: &'a dyn AnalysisOracle,
    pub store: &'a dyn SearchStore,
    pub registry: &'a DamRegistry,
    pub config: PipelineConfig,
}

/// Bookkeeping for an in-flight session: its id, the query, and the
/// stage counter. The counter is how the "strictly increasing, at most
/// once per stage" event invariant is enforced in one place.
pub struct SessionContext {
    session_id: SessionId,
    dam_name: String,
    stage: u8,
}

impl SessionContext {
    pub fn new(dam_name: &str) -> Self {
        Self {
            session_id: SessionId::generate(),
            dam_name: dam_name.to_string(),
            stage: 0,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn dam_name(&self) -> &str {
        &self.dam_name
    }

    /// Last stage entered, 0 before stage 1.
    pub fn stage(&self) -> u8 {
        self.stage
    }

    fn enter_stage(&mut self, sink: &dyn ProgressSink, stage: u8, message: String) {
        debug_assert!(stage == self.stage + 1, "stages must advance one at a time");
        self.stage = stage;
        tracing::debug!(session = %self.session_id, stage, "entering stage");
        sink.emit(AnalysisEvent::Update(StageEvent { stage, message }));
    }
}

/// Run one full analysis session.
///
/// Emits stage updates and exactly one terminal event on `sink`, and
/// returns the same outcome to the caller. The terminal event is emitted
/// before this function returns, so a caller that only forwards `sink`
/// events can ignore the return value entirely.
pub async fn run_session(
    env: &SessionEnv<'_>,
    sink: &dyn ProgressSink,
    dam_name: &str,
) -> Result<AnalysisResults, PipelineError> {
    let mut ctx = SessionContext::new(dam_name);
    tracing::info!(session = %ctx.session_id(), dam = %ctx.dam_name(), "analysis session started");

    let outcome = run_stages(env, sink, &mut ctx).await;
    match &outcome {
        Ok(results) => {
            tracing::info!(session = %ctx.session_id(), "analysis session complete");
            sink.emit(AnalysisEvent::Complete(Box::new(results.clone())));
        }
        Err(err) => {
            tracing::warn!(session = %ctx.session_id(), stage = ctx.stage(), error = %err, "analysis session failed");
            sink.emit(AnalysisEvent::Error {
                message: err.to_string(),
            });
        }
    }
    outcome
}

async fn run_stages(
    env: &SessionEnv<'_>,
    sink: &dyn ProgressSink,
    ctx: &mut SessionContext,
) -> Result<AnalysisResults, PipelineError> {
    // Stage 1: geocode the dam name.
    ctx.enter_stage(
        sink,
        1,
        format!("Geocoding location for \"{}\"...", ctx.dam_name()),
    );
    let coords = env
        .geocoder
        .geocode(ctx.dam_name())
        .await?
        .ok_or_else(|| PipelineError::LocationNotFound {
            query: ctx.dam_name().to_string(),
        })?;

    // Stage 2: composite imagery and vectorize the water mask.
    ctx.enter_stage(sink, 2, "Analyzing satellite imagery...".to_string());
    let area = AnalysisArea::around(coords, env.config.buffer_radius_m);
    let features = env.oracle.water_vectors(&area).await?;
    if features.is_empty() {
        // An empty vector set must fail here, before geometry extraction.
        return Err(PipelineError::NoWaterBody);
    }

    // Stage 3: keep the single largest feature's boundary.
    ctx.enter_stage(sink, 3, "Extracting precise water boundary...".to_string());
    let largest = features
        .into_iter()
        .max_by(|a, b| a.area_sq_m.total_cmp(&b.area_sq_m))
        .ok_or(PipelineError::NoWaterBody)?;
    let boundary = largest
        .geometry
        .ok_or(PipelineError::PolygonExtractionFailed)?;

    // Stage 4: elevation statistics and the tiered depth profile.
    ctx.enter_stage(sink, 4, "Calculating elevation profile...".to_string());
    let stats = env
        .oracle
        .elevation_stats(&boundary)
        .await?
        .ok_or(PipelineError::ElevationUnavailable)?;
    // The 10th percentile stands in for the water surface: the naive max
    // overestimates badly on noisy DEMs and shoreline pixels.
    let surface_height = stats.p10;
    let mut tiers = Vec::with_capacity(DEPTH_OFFSETS_M.len());
    for offset in DEPTH_OFFSETS_M {
        let elevation_m = surface_height + offset;
        let area_sq_m = env.oracle.flooded_area(&boundary, elevation_m).await?;
        tiers.push(DepthTier {
            depth_offset_m: offset,
            elevation_m,
            area_sq_m,
        });
    }
    let profile = ElevationProfile {
        summary: SummaryStats {
            min: stats.min,
            mean: stats.mean,
            max: stats.max,
        },
        tiers,
    };

    // Stage 5: the historical water-level series.
    ctx.enter_stage(sink, 5, "Compiling historical water levels...".to_string());
    let window = DateRange::new(
        history_start(env.config.today, env.config.history_years),
        env.config.today,
    );
    let raw = env.oracle.water_level_series(&boundary, window).await?;
    let series = clean_series(raw);
    tracing::debug!(session = %ctx.session_id(), points = series.len(), "historical series cleaned");

    // Post-stage: decision, prediction, persistence.
    let (decision, prediction) = evaluate_series(&series, env.registry.find(ctx.dam_name()));
    persist(env, ctx, coords, &series).await?;

    Ok(AnalysisResults {
        coords,
        water_polygon: boundary,
        analysis: profile,
        time_series_data: series,
        decision,
        current_prediction: prediction,
    })
}

/// First day of the historical window: `today` moved back `years` years.
/// Feb 29 maps to Mar 1 when the target year is not a leap year.
fn history_start(today: Date, years: i32) -> Date {
    let target_year = today.year() - years;
    today.replace_year(target_year).unwrap_or_else(|_| {
        Date::from_calendar_date(target_year, Month::March, 1).unwrap_or(today)
    })
}

/// Filter, round, sort, dedup.
///
/// Drops readings without a finite level, rounds to two decimals, sorts
/// ascending by date; when the oracle reports one date twice, the last
/// occurrence wins.
fn clean_series(raw: Vec<RawReading>) -> Vec<TimeSeriesReading> {
    let mut by_date: BTreeMap<Date, f64> = BTreeMap::new();
    for reading in raw {
        if let Some(level) = reading.water_level_m.filter(|v| v.is_finite()) {
            by_date.insert(reading.date, round2(level));
        }
    }
    by_date
        .into_iter()
        .map(|(date, water_level_m)| TimeSeriesReading {
            date,
            water_level_m,
        })
        .collect()
}

/// Decision and prediction from the cleaned series, both degrading
/// gracefully: too little history or no dam configuration are ordinary
/// outcomes that leave the decision out and explain the prediction.
fn evaluate_series(
    series: &[TimeSeriesReading],
    config: Option<&DamConfig>,
) -> (Option<Decision>, Prediction) {
    let [.., previous, latest] = series else {
        return (
            None,
            Prediction::unavailable("insufficient history to derive a rate of change"),
        );
    };

    let Some(config) = config else {
        return (
            None,
            Prediction::unavailable("no configured capacity for this dam"),
        );
    };

    let decision = decide(
        latest.water_level_m,
        previous.water_level_m,
        &DecisionParams::from_config(config),
    );

    // Observations are days or weeks apart, so normalize the rise by the
    // actual gap before projecting forward.
    let gap_days = (latest.date - previous.date).whole_days().max(1);
    let rate = (latest.water_level_m - previous.water_level_m) / gap_days as f64;
    let prediction = predict(
        latest.water_level_m,
        Some(rate),
        Some(config.capacity_m),
        latest.date,
    );

    (Some(decision), prediction)
}

/// Persist the search record (mandatory) and its readings (best-effort).
async fn persist(
    env: &SessionEnv<'_>,
    ctx: &SessionContext,
    coords: Coordinates,
    series: &[TimeSeriesReading],
) -> Result<(), PipelineError> {
    let record = env
        .store
        .insert_search(NewSearch {
            dam_name: ctx.dam_name().to_string(),
            lat: coords.lat,
            lon: coords.lon,
        })
        .await?;

    if series.is_empty() {
        tracing::warn!(session = %ctx.session_id(), "no time-series data to save");
        return Ok(());
    }

    let readings: Vec<StoredReading> = series
        .iter()
        .map(|r| StoredReading {
            timestamp: r.date,
            water_level_m: r.water_level_m,
        })
        .collect();
    // The analysis is already computed; losing its history is preferable
    // to failing the whole session here.
    if let Err(err) = env.store.insert_readings(record.id, &readings).await {
        tracing::warn!(
            session = %ctx.session_id(),
            search_id = %record.id,
            error = %err,
            "failed to save time-series data, proceeding anyway"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn reading(date: Date, level: f64) -> TimeSeriesReading {
        TimeSeriesReading {
            date,
            water_level_m: level,
        }
    }

    #[test]
    fn history_start_moves_back_whole_years() {
        assert_eq!(
            history_start(date!(2025 - 07 - 15), 5),
            date!(2020 - 07 - 15)
        );
    }

    #[test]
    fn history_start_handles_leap_day() {
        assert_eq!(
            history_start(date!(2024 - 02 - 29), 5),
            date!(2019 - 03 - 01)
        );
        // A leap target year keeps Feb 29.
        assert_eq!(
            history_start(date!(2024 - 02 - 29), 4),
            date!(2020 - 02 - 29)
        );
    }

    #[test]
    fn clean_series_filters_sorts_rounds_and_dedups() {
        let raw = vec![
            RawReading {
                date: date!(2025 - 03 - 01),
                water_level_m: Some(828.333_33),
            },
            RawReading {
                date: date!(2025 - 01 - 01),
                water_level_m: None,
            },
            RawReading {
                date: date!(2025 - 02 - 01),
                water_level_m: Some(f64::NAN),
            },
            RawReading {
                date: date!(2025 - 01 - 15),
                water_level_m: Some(826.0),
            },
            // duplicate date, later occurrence wins
            RawReading {
                date: date!(2025 - 03 - 01),
                water_level_m: Some(829.0),
            },
        ];
        let cleaned = clean_series(raw);
        assert_eq!(
            cleaned,
            vec![
                reading(date!(2025 - 01 - 15), 826.0),
                reading(date!(2025 - 03 - 01), 829.0),
            ]
        );
    }

    #[test]
    fn short_series_yields_no_decision_and_an_explanation() {
        let registry = DamRegistry::builtin();
        let series = vec![reading(date!(2025 - 06 - 15), 828.5)];
        let (decision, prediction) = evaluate_series(&series, registry.find("Tehri Dam"));
        assert!(decision.is_none());
        assert_eq!(
            prediction,
            Prediction::unavailable("insufficient history to derive a rate of change")
        );
    }

    #[test]
    fn unconfigured_dam_yields_no_decision_and_an_explanation() {
        let series = vec![
            reading(date!(2025 - 06 - 14), 828.0),
            reading(date!(2025 - 06 - 15), 828.5),
        ];
        let (decision, prediction) = evaluate_series(&series, None);
        assert!(decision.is_none());
        assert_eq!(
            prediction,
            Prediction::unavailable("no configured capacity for this dam")
        );
    }

    #[test]
    fn decision_uses_raw_day_over_day_rate_but_prediction_normalizes_gaps() {
        let config = DamConfig {
            capacity_m: 830.0,
            warn_fraction: 0.9,
            rate_threshold_m_per_day: 1.0,
        };
        // 1.0 m rise over a 10-day gap
        let series = vec![
            reading(date!(2025 - 06 - 05), 827.0),
            reading(date!(2025 - 06 - 15), 828.0),
        ];
        let (decision, prediction) = evaluate_series(&series, Some(&config));

        let decision = decision.expect("config present, two points");
        assert_eq!(decision.rate_of_change_m_per_day, 1.0);

        match prediction {
            Prediction::Ready {
                rate_of_change_m_per_day,
                days_to_open,
                predicted_open_date,
                ..
            } => {
                assert!((rate_of_change_m_per_day - 0.1).abs() < 1e-12);
                // 2.0 m remaining at 0.1 m/day
                assert_eq!(days_to_open, 20);
                assert_eq!(predicted_open_date, date!(2025 - 07 - 05));
            }
            Prediction::Unavailable { message } => panic!("expected Ready, got {message}"),
        }
    }

    #[test]
    fn same_day_readings_collapse_before_evaluation() {
        // Two readings on one date dedup to a single point, which is
        // insufficient history.
        let cleaned = clean_series(vec![
            RawReading {
                date: date!(2025 - 06 - 15),
                water_level_m: Some(828.0),
            },
            RawReading {
                date: date!(2025 - 06 - 15),
                water_level_m: Some(828.4),
            },
        ]);
        assert_eq!(cleaned.len(), 1);
        let (decision, _) = evaluate_series(&cleaned, None);
        assert!(decision.is_none());
    }
}
