//! spillway-core: domain library for dam water-level monitoring.
//!
//! Provides the shared vocabulary of the Spillway workspace: coordinates,
//! water-body geometry, elevation profiles, and time-series readings, plus
//! the two pure decision engines that the pipeline and CLI build on.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`decide()`] -- classify today's reservoir state into a [`GateAction`]
//! - [`predict()`] -- project when a rising reservoir reaches capacity
//! - [`DamRegistry`] -- fuzzy name-to-configuration lookup
//! - Domain types: [`Coordinates`], [`WaterBodyGeometry`], [`ElevationProfile`],
//!   [`TimeSeriesReading`], [`DateRange`]

pub mod decision;
pub mod predict;
pub mod registry;
pub mod types;

// ── Convenience re-exports: domain types ─────────────────────────────

pub use types::{
    round2, AnalysisArea, Coordinates, DateRange, DepthTier, ElevationProfile, ElevationStats,
    RawReading, SummaryStats, TimeSeriesReading, WaterBodyGeometry, WaterFeature,
};

// ── Convenience re-exports: decision and prediction engines ──────────

pub use decision::{
    decide, decide_with_stage_area, default_stage_area, overflow_volume_m3, Decision,
    DecisionParams, GateAction, DEFAULT_EMERGENCY_MARGIN_M, DEFAULT_RATE_THRESHOLD_M_PER_DAY,
    DEFAULT_STAGE_AREA_SQ_M, DEFAULT_WARN_FRACTION,
};
pub use predict::{predict, Prediction};
pub use registry::{DamConfig, DamRegistry, RegistryError};
