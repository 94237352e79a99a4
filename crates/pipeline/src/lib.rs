//! spillway-pipeline: the analysis orchestrator.
//!
//! Runs the five-stage analysis for one dam name as an independent
//! session: geocode, water mask, boundary extraction, elevation profile,
//! historical series. Emits progress over a [`ProgressSink`] after every
//! stage transition and exactly one terminal event per session. On
//! success the session also runs the decision and prediction engines,
//! persists its outputs, and hands back the completion payload.
//!
//! The [`compare`] module answers range-comparison queries over
//! previously persisted sessions; it never touches the oracle.

pub mod compare;
mod error;
mod event;
mod payload;
mod session;

pub use compare::{compare_range, CompareError, RangeComparison};
pub use error::PipelineError;
pub use event::{AnalysisEvent, EventCollector, NullSink, ProgressSink, StageEvent};
pub use payload::AnalysisResults;
pub use session::{
    run_session, today_utc, PipelineConfig, SessionContext, SessionEnv, SessionId,
    ANALYSIS_BUFFER_RADIUS_M, DEPTH_OFFSETS_M, HISTORY_WINDOW_YEARS,
};
