//! Static collaborators -- canned data, no network.
//!
//! Used by tests and by `spillway serve` when no external services are
//! configured, so the whole pipeline can be exercised offline. The demo
//! constructors carry a plausible Himalayan reservoir.

use std::collections::BTreeMap;

use async_trait::async_trait;

use spillway_core::{
    AnalysisArea, Coordinates, DateRange, ElevationStats, RawReading, WaterBodyGeometry,
    WaterFeature,
};

use crate::{AnalysisOracle, Geocoder, OracleError};

/// Geocoder answering from an in-memory place table.
///
/// Matching mirrors the registry: a query resolves to the first place
/// (alphabetically) whose lowercased name occurs inside the lowercased
/// query. Unknown queries resolve to `None`.
#[derive(Debug, Default)]
pub struct StaticGeocoder {
    places: BTreeMap<String, Coordinates>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_place(mut self, name: &str, coords: Coordinates) -> Self {
        self.places.insert(name.to_lowercase(), coords);
        self
    }

    /// Large Indian dams, coordinates good to a few hundred meters.
    pub fn demo() -> Self {
        Self::new()
            .with_place("tehri", Coordinates { lat: 30.3804, lon: 78.4806 })
            .with_place("bhakra", Coordinates { lat: 31.4108, lon: 76.4336 })
            .with_place("sardar sarovar", Coordinates { lat: 21.8308, lon: 73.7477 })
            .with_place("hirakud", Coordinates { lat: 21.5200, lon: 83.8520 })
            .with_place("nagarjuna sagar", Coordinates { lat: 16.5755, lon: 79.3129 })
            .with_place("idukki", Coordinates { lat: 9.8436, lon: 76.9762 })
            .with_place("srisailam", Coordinates { lat: 16.0877, lon: 78.8960 })
            .with_place("mettur", Coordinates { lat: 11.7904, lon: 77.8011 })
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<Coordinates>, OracleError> {
        let needle = query.to_lowercase();
        Ok(self
            .places
            .iter()
            .find(|(name, _)| needle.contains(name.as_str()))
            .map(|(_, coords)| *coords))
    }
}

/// Analysis oracle answering from fixed data.
///
/// Flooded areas are interpolated linearly between the configured
/// elevation extremes (a crude hypsometric curve); series queries honor
/// the requested window.
#[derive(Debug, Default)]
pub struct StaticOracle {
    features: Vec<WaterFeature>,
    stats: Option<ElevationStats>,
    full_area_sq_m: f64,
    series: Vec<RawReading>,
}

impl StaticOracle {
    /// An oracle that finds no water anywhere.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_features(mut self, features: Vec<WaterFeature>) -> Self {
        self.features = features;
        self
    }

    pub fn with_stats(mut self, stats: ElevationStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_full_area(mut self, area_sq_m: f64) -> Self {
        self.full_area_sq_m = area_sq_m;
        self
    }

    pub fn with_series(mut self, series: Vec<RawReading>) -> Self {
        self.series = series;
        self
    }

    /// A Tehri-like reservoir: one dominant polygon, a noise sliver
    /// without geometry, and two seasons of observations including a
    /// cloudy gap.
    pub fn demo() -> Self {
        let polygon = WaterBodyGeometry(serde_json::json!({
            "type": "Polygon",
            "coordinates": [[
                [78.43, 30.35], [78.52, 30.35], [78.52, 30.41],
                [78.43, 30.41], [78.43, 30.35]
            ]]
        }));

        Self::new()
            .with_features(vec![
                WaterFeature {
                    area_sq_m: 48_500_000.0,
                    geometry: Some(polygon),
                },
                WaterFeature {
                    area_sq_m: 12_000.0,
                    geometry: None,
                },
            ])
            .with_stats(ElevationStats {
                min: 780.0,
                mean: 812.5,
                max: 835.0,
                p10: 828.6,
            })
            .with_full_area(48_500_000.0)
            .with_series(demo_series())
    }
}

fn demo_series() -> Vec<RawReading> {
    use time::macros::date;
    let levels: [(time::Date, Option<f64>); 9] = [
        (date!(2024 - 11 - 05), Some(826.10)),
        (date!(2024 - 12 - 15), Some(827.00)),
        (date!(2025 - 01 - 20), None), // cloud cover
        (date!(2025 - 02 - 18), Some(827.60)),
        (date!(2025 - 03 - 22), Some(828.05)),
        (date!(2025 - 04 - 18), Some(828.02)),
        (date!(2025 - 05 - 16), Some(828.30)),
        (date!(2025 - 06 - 15), Some(828.55)),
        (date!(2025 - 06 - 25), Some(828.75)),
    ];
    levels
        .into_iter()
        .map(|(date, water_level_m)| RawReading {
            date,
            water_level_m,
        })
        .collect()
}

#[async_trait]
impl AnalysisOracle for StaticOracle {
    async fn water_vectors(&self, _area: &AnalysisArea) -> Result<Vec<WaterFeature>, OracleError> {
        Ok(self.features.clone())
    }

    async fn elevation_stats(
        &self,
        _boundary: &WaterBodyGeometry,
    ) -> Result<Option<ElevationStats>, OracleError> {
        Ok(self.stats)
    }

    async fn flooded_area(
        &self,
        _boundary: &WaterBodyGeometry,
        elevation_m: f64,
    ) -> Result<f64, OracleError> {
        let Some(stats) = self.stats else {
            return Ok(0.0);
        };
        let span = stats.max - stats.min;
        if span <= 0.0 {
            return Ok(self.full_area_sq_m);
        }
        let fraction = ((elevation_m - stats.min) / span).clamp(0.0, 1.0);
        Ok(fraction * self.full_area_sq_m)
    }

    async fn water_level_series(
        &self,
        _boundary: &WaterBodyGeometry,
        window: DateRange,
    ) -> Result<Vec<RawReading>, OracleError> {
        Ok(self
            .series
            .iter()
            .copied()
            .filter(|reading| window.contains(reading.date))
            .collect())
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
