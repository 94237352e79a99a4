//! Level prediction: when does a rising reservoir reach capacity?
//!
//! A straight-line extrapolation from the current level at the observed
//! rate of change. Deliberately simple; the point is a scheduling hint
//! ("gates open in N days"), not a hydrological forecast.

use serde::{Deserialize, Serialize};
use time::{Date, Duration};

/// Outcome of a capacity projection.
///
/// Serialized untagged: a `Ready` projection is an object with the four
/// projection fields, an `Unavailable` one is `{"message": ...}`. The two
/// shapes share no field names, so deserialization is unambiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prediction {
    #[serde(rename_all = "camelCase")]
    Ready {
        rate_of_change_m_per_day: f64,
        /// Whole days until capacity, always at least 1.
        days_to_open: i64,
        predicted_open_date: Date,
        predicted_level_at_open: f64,
    },
    Unavailable { message: String },
}

impl Prediction {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Prediction::Unavailable {
            message: message.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Prediction::Ready { .. })
    }
}

/// Project the date the reservoir reaches capacity.
///
/// Counts whole days (rounded up) until `current_level_m` grows past
/// `capacity_m` at `rate_m_per_day`, anchored at `reference_date`. Returns
/// a [`Prediction::Unavailable`] with a short reason whenever a projection
/// cannot be made: missing or non-finite inputs, a flat or falling level,
/// or a reservoir already at capacity. Those are ordinary answers, not
/// errors; a healthy reservoir is "not rising" most of the year.
pub fn predict(
    current_level_m: f64,
    rate_m_per_day: Option<f64>,
    capacity_m: Option<f64>,
    reference_date: Date,
) -> Prediction {
    let (rate, capacity) = match (rate_m_per_day, capacity_m) {
        (Some(rate), Some(capacity)) if rate.is_finite() && capacity.is_finite() => {
            (rate, capacity)
        }
        _ => return Prediction::unavailable("capacity or rate unavailable"),
    };

    if rate <= 0.0 {
        return Prediction::unavailable("not rising");
    }
    let remaining = capacity - current_level_m;
    if remaining <= 0.0 {
        return Prediction::unavailable("already at/above capacity");
    }

    let days = (remaining / rate).ceil() as i64;
    let open_date = match reference_date.checked_add(Duration::days(days)) {
        Some(date) => date,
        // A microscopic rate can push the date past the representable range.
        None => return Prediction::unavailable("projected date out of range"),
    };

    Prediction::Ready {
        rate_of_change_m_per_day: rate,
        days_to_open: days,
        predicted_open_date: open_date,
        predicted_level_at_open: current_level_m + rate * days as f64,
    }
}
