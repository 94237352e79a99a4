//! spillway-oracle: the pipeline's external collaborators.
//!
//! Two seams, both async traits so the orchestrator never knows which
//! backend it is talking to:
//!
//! - [`Geocoder`] -- free-text place name to coordinates
//! - [`AnalysisOracle`] -- imagery/elevation analysis over a water body
//!
//! [`HttpGeocoder`] and [`HttpAnalysisOracle`] (feature `http`, on by
//! default) talk to real services; [`StaticGeocoder`] and [`StaticOracle`]
//! serve canned data for tests and for running the server without any
//! external service configured.

use async_trait::async_trait;

use spillway_core::{
    AnalysisArea, Coordinates, DateRange, ElevationStats, RawReading, WaterBodyGeometry,
    WaterFeature,
};

mod error;
#[cfg(feature = "http")]
mod http;
mod static_adapter;

pub use error::OracleError;
#[cfg(feature = "http")]
pub use http::{HttpAnalysisOracle, HttpGeocoder};
pub use static_adapter::{StaticGeocoder, StaticOracle};

/// Resolves a free-text place name to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best candidate for the query, or `None` when the provider has no
    /// match. `None` is an answer, not an error; transport and protocol
    /// problems are `Err`.
    async fn geocode(&self, query: &str) -> Result<Option<Coordinates>, OracleError>;
}

/// The external imagery/elevation analysis service.
///
/// Every call may fail (transport, quota, malformed response) or come back
/// empty; the orchestrator decides what emptiness means at each stage.
/// Implementations must tolerate concurrent independent calls.
#[async_trait]
pub trait AnalysisOracle: Send + Sync {
    /// Vectorized surface-water features inside the area.
    async fn water_vectors(&self, area: &AnalysisArea) -> Result<Vec<WaterFeature>, OracleError>;

    /// Elevation statistics over the boundary, `None` when the DEM has no
    /// usable pixels there.
    async fn elevation_stats(
        &self,
        boundary: &WaterBodyGeometry,
    ) -> Result<Option<ElevationStats>, OracleError>;

    /// Area (m^2) flooded when the water stands at `elevation_m`.
    async fn flooded_area(
        &self,
        boundary: &WaterBodyGeometry,
        elevation_m: f64,
    ) -> Result<f64, OracleError>;

    /// Historical per-scene water-level estimates over the window.
    /// Cloudy scenes come back with a `None` level.
    async fn water_level_series(
        &self,
        boundary: &WaterBodyGeometry,
        window: DateRange,
    ) -> Result<Vec<RawReading>, OracleError>;
}
