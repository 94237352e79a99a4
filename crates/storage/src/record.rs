use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

/// Backend-assigned identifier of a persisted search.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SearchId(pub i64);

impl std::fmt::Display for SearchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A search about to be persisted; the backend assigns id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSearch {
    pub dam_name: String,
    pub lat: f64,
    pub lon: f64,
}

/// One completed analysis, as listed by the history endpoint.
///
/// `dam_name` is stored exactly as the user typed it; follow-up queries
/// (range comparison) match on it verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub id: SearchId,
    pub dam_name: String,
    pub lat: f64,
    pub lon: f64,
    /// When the analysis completed; orders the history listing.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// One persisted water-level observation, day granularity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredReading {
    pub timestamp: Date,
    #[serde(rename = "water_level")]
    pub water_level_m: f64,
}
