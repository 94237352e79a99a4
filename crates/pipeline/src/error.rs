//! Session-fatal error taxonomy.
//!
//! Every variant's `Display` text is surfaced verbatim to the client as
//! the terminal `analysis-error` message, so the texts are user-facing
//! sentences, not debug strings.

use spillway_oracle::OracleError;
use spillway_storage::StorageError;

/// A failure that aborts an analysis session.
///
/// Missing dam configuration and an empty historical series are *not*
/// errors: the session still completes, with the decision omitted and the
/// prediction degraded to an explanatory message.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Stage 1: the geocoder had no candidate for the requested name.
    #[error("Could not find the location for \"{query}\".")]
    LocationNotFound { query: String },

    /// Stage 2: the water mask came back with no features at all.
    #[error("Could not find a distinct water body at this location.")]
    NoWaterBody,

    /// Stage 3: the largest feature has no usable boundary polygon.
    #[error("Could not extract a water-body boundary polygon.")]
    PolygonExtractionFailed,

    /// Stage 4: no elevation statistics for the boundary.
    #[error("Could not determine surface elevation from DEM.")]
    ElevationUnavailable,

    /// The primary search record could not be written; derived data
    /// would be unreachable, so the session fails.
    #[error("Failed to save search record: {0}")]
    PersistenceFailed(#[from] StorageError),

    /// A collaborator call failed outright (transport, quota, decode).
    #[error("Analysis service error: {0}")]
    Oracle(#[from] OracleError),
}
