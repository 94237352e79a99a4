//! Shared domain types for reservoir analysis.
//!
//! Everything on the wire is JSON; field names follow the client payload
//! conventions (camelCase) where a type is part of a response body, and
//! snake_case where it only crosses an internal adapter boundary.

use serde::{Deserialize, Serialize};
use time::Date;

/// A WGS84 point, latitude/longitude in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// A circular region of interest around a geocoded point.
///
/// The analysis oracle searches this area for surface water; the radius is
/// a plain buffer in meters, not a projected geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisArea {
    pub center: Coordinates,
    pub buffer_radius_m: f64,
}

impl AnalysisArea {
    pub fn around(center: Coordinates, buffer_radius_m: f64) -> Self {
        Self {
            center,
            buffer_radius_m,
        }
    }
}

/// An opaque water-body boundary polygon.
///
/// The geometry is produced and consumed by the analysis oracle; Spillway
/// never interprets the coordinates itself, so it is carried as raw GeoJSON
/// and passed back verbatim on follow-up queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaterBodyGeometry(pub serde_json::Value);

/// One detected surface-water feature inside an [`AnalysisArea`].
///
/// Vectorization can yield features without a usable boundary polygon;
/// those carry `geometry: None` and are rejected during extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterFeature {
    pub area_sq_m: f64,
    pub geometry: Option<WaterBodyGeometry>,
}

/// Elevation statistics over a water-body boundary, meters above datum.
///
/// `p10` is the 10th percentile, used as the representative water-surface
/// height: it sits below shoreline noise but above channel-bottom outliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationStats {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    pub p10: f64,
}

/// The min/mean/max triple reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

/// Flooded area at one depth offset below the water surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthTier {
    /// Offset from the surface height, zero or negative, in meters.
    pub depth_offset_m: f64,
    /// Absolute elevation of this tier (surface height plus offset).
    pub elevation_m: f64,
    /// Area flooded at this elevation, square meters.
    pub area_sq_m: f64,
}

/// Stage-4 output: summary statistics plus the tiered depth profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationProfile {
    #[serde(rename = "summaryStats")]
    pub summary: SummaryStats,
    #[serde(rename = "tieredResults")]
    pub tiers: Vec<DepthTier>,
}

/// One cleaned historical water-level observation.
///
/// Levels are meters above datum, rounded to two decimals; the series a
/// reading belongs to is sorted ascending by date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesReading {
    pub date: Date,
    pub water_level_m: f64,
}

/// A raw observation as produced by the analysis oracle, before cleaning.
///
/// Cloud cover and sensor gaps leave holes in the record, so the level is
/// optional here; cleaning drops the `None`s.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub date: Date,
    pub water_level_m: Option<f64>,
}

/// An inclusive date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Date,
    pub end: Date,
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Round to two decimal places, the precision used for all reported levels.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
