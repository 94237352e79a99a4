//! HTTP adapters for the geocoding and analysis services.
//!
//! Uses `ureq` (sync) wrapped in `tokio::task::spawn_blocking` to avoid
//! blocking the async runtime. No retries: a failed call surfaces as an
//! [`OracleError`] and the caller decides what that means for its session.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use spillway_core::{
    AnalysisArea, Coordinates, DateRange, ElevationStats, RawReading, WaterBodyGeometry,
    WaterFeature,
};

use crate::{AnalysisOracle, Geocoder, OracleError};

/// Env var consulted for the geocoding API key when none is set explicitly.
pub const GEOCODE_KEY_ENV: &str = "SPILLWAY_GEOCODE_KEY";
/// Env var consulted for the analysis-service bearer token.
pub const ORACLE_TOKEN_ENV: &str = "SPILLWAY_ORACLE_TOKEN";

/// Geocoder backed by an OpenCage-style forward-geocoding endpoint.
///
/// Sends `GET {endpoint}?q={query}&limit=1` (plus `key` when configured)
/// and reads `results[0].geometry.{lat,lng}` from the JSON response. An
/// empty `results` array is a clean "no match", not an error.
pub struct HttpGeocoder {
    endpoint: String,
    api_key: Option<String>,
    region_hint: Option<String>,
}

impl HttpGeocoder {
    /// Create a geocoder for the given endpoint URL.
    ///
    /// The API key falls back to the `SPILLWAY_GEOCODE_KEY` env var.
    pub fn new(endpoint: &str) -> Self {
        HttpGeocoder {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: std::env::var(GEOCODE_KEY_ENV).ok(),
            region_hint: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Append a fixed regional context to every query, e.g. "India" turns
    /// "Tehri Dam" into "Tehri Dam, India". Narrows ambiguous dam names.
    pub fn with_region_hint(mut self, hint: impl Into<String>) -> Self {
        self.region_hint = Some(hint.into());
        self
    }

    fn query_text(&self, query: &str) -> String {
        match &self.region_hint {
            Some(hint) => format!("{query}, {hint}"),
            None => query.to_string(),
        }
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<Coordinates>, OracleError> {
        let url = self.endpoint.clone();
        let q = self.query_text(query);
        let api_key = self.api_key.clone();

        tokio::task::spawn_blocking(move || {
            let agent = ureq::Agent::new_with_defaults();
            let mut request = agent.get(&url).query("q", &q).query("limit", "1");
            if let Some(ref key) = api_key {
                request = request.query("key", key);
            }

            let response = request
                .call()
                .map_err(|e| OracleError::fetch(e.to_string()))?;
            let value: serde_json::Value = response
                .into_body()
                .read_json()
                .map_err(|e| OracleError::decode(format!("geocode response is not JSON: {e}")))?;

            parse_geocode_response(&value)
        })
        .await
        .map_err(|e| OracleError::fetch(format!("task join error: {e}")))?
    }
}

/// Pull the best candidate out of an OpenCage-style response body.
fn parse_geocode_response(value: &serde_json::Value) -> Result<Option<Coordinates>, OracleError> {
    let results = value
        .get("results")
        .and_then(|r| r.as_array())
        .ok_or_else(|| OracleError::decode("geocode response missing 'results' array"))?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let geometry = first
        .get("geometry")
        .ok_or_else(|| OracleError::decode("geocode candidate missing 'geometry'"))?;
    let lat = geometry.get("lat").and_then(serde_json::Value::as_f64);
    let lon = geometry.get("lng").and_then(serde_json::Value::as_f64);
    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(Some(Coordinates { lat, lon })),
        _ => Err(OracleError::decode(
            "geocode candidate missing numeric 'lat'/'lng'",
        )),
    }
}

/// Analysis oracle speaking the sidecar's JSON-over-POST protocol.
///
/// One endpoint per query kind under a common base URL:
///
/// - `POST {base}/water-vectors` -> `{ "features": [...] }`
/// - `POST {base}/elevation-stats` -> `{ "stats": {...} | null }`
/// - `POST {base}/flooded-area` -> `{ "area_sq_m": n }`
/// - `POST {base}/water-level-series` -> `{ "readings": [...] }`
pub struct HttpAnalysisOracle {
    base_url: String,
    auth_token: Option<String>,
}

impl HttpAnalysisOracle {
    /// Create an oracle client for the given base URL.
    ///
    /// The bearer token falls back to the `SPILLWAY_ORACLE_TOKEN` env var.
    pub fn new(base_url: &str) -> Self {
        HttpAnalysisOracle {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: std::env::var(ORACLE_TOKEN_ENV).ok(),
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, OracleError> {
        let url = self.url(path);
        let auth_token = self.auth_token.clone();

        tokio::task::spawn_blocking(move || {
            let agent = ureq::Agent::new_with_defaults();
            let mut request = agent.post(&url);
            if let Some(ref token) = auth_token {
                request = request.header("Authorization", &format!("Bearer {}", token));
            }

            let response = request
                .send_json(&body)
                .map_err(|e| OracleError::fetch(e.to_string()))?;
            response
                .into_body()
                .read_json()
                .map_err(|e| OracleError::decode(format!("oracle response is not JSON: {e}")))
        })
        .await
        .map_err(|e| OracleError::fetch(format!("task join error: {e}")))?
    }
}

#[async_trait]
impl AnalysisOracle for HttpAnalysisOracle {
    async fn water_vectors(&self, area: &AnalysisArea) -> Result<Vec<WaterFeature>, OracleError> {
        let body = serde_json::json!({
            "lat": area.center.lat,
            "lon": area.center.lon,
            "buffer_radius_m": area.buffer_radius_m,
        });
        let value = self.post("water-vectors", body).await?;
        let parsed: VectorsResponse = decode_response(value, "water-vectors")?;
        Ok(parsed.features)
    }

    async fn elevation_stats(
        &self,
        boundary: &WaterBodyGeometry,
    ) -> Result<Option<ElevationStats>, OracleError> {
        let body = serde_json::json!({ "geometry": boundary });
        let value = self.post("elevation-stats", body).await?;
        let parsed: StatsResponse = decode_response(value, "elevation-stats")?;
        Ok(parsed.stats)
    }

    async fn flooded_area(
        &self,
        boundary: &WaterBodyGeometry,
        elevation_m: f64,
    ) -> Result<f64, OracleError> {
        let body = serde_json::json!({ "geometry": boundary, "elevation_m": elevation_m });
        let value = self.post("flooded-area", body).await?;
        let parsed: AreaResponse = decode_response(value, "flooded-area")?;
        Ok(parsed.area_sq_m)
    }

    async fn water_level_series(
        &self,
        boundary: &WaterBodyGeometry,
        window: DateRange,
    ) -> Result<Vec<RawReading>, OracleError> {
        let body = serde_json::json!({
            "geometry": boundary,
            "start": window.start,
            "end": window.end,
        });
        let value = self.post("water-level-series", body).await?;
        let parsed: SeriesResponse = decode_response(value, "water-level-series")?;
        Ok(parsed.readings)
    }
}

#[derive(serde::Deserialize)]
struct VectorsResponse {
    features: Vec<WaterFeature>,
}

#[derive(serde::Deserialize)]
struct StatsResponse {
    stats: Option<ElevationStats>,
}

#[derive(serde::Deserialize)]
struct AreaResponse {
    area_sq_m: f64,
}

#[derive(serde::Deserialize)]
struct SeriesResponse {
    readings: Vec<RawReading>,
}

fn decode_response<T: DeserializeOwned>(
    value: serde_json::Value,
    endpoint: &str,
) -> Result<T, OracleError> {
    serde_json::from_value(value)
        .map_err(|e| OracleError::decode(format!("unexpected {endpoint} response shape: {e}")))
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
