//! The completion payload.

use serde::{Deserialize, Serialize};

use spillway_core::{
    Coordinates, Decision, ElevationProfile, Prediction, TimeSeriesReading, WaterBodyGeometry,
};

/// Everything a successful session hands back to the client.
///
/// Serialized inside the terminal `analysis-complete` event. `decision`
/// is `null` when the dam has no configuration or the series is too short
/// to derive a trend; `current_prediction` always carries either numbers
/// or an explanatory message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResults {
    pub coords: Coordinates,
    pub water_polygon: WaterBodyGeometry,
    pub analysis: ElevationProfile,
    pub time_series_data: Vec<TimeSeriesReading>,
    pub decision: Option<Decision>,
    pub current_prediction: Prediction,
}
