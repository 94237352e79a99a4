//! Gate-decision engine.
//!
//! A pure threshold cascade over two consecutive water levels. Reads two
//! observations (today and yesterday), derives the daily rate of change and
//! a one-day linear projection, and classifies the reservoir into one of
//! four escalating actions. No I/O, no clock: callers supply the levels and
//! the dam parameters, which keeps the ladder trivially testable.

use serde::{Deserialize, Serialize};

use crate::registry::DamConfig;

/// Warn threshold as a fraction of capacity when a dam does not override it.
pub const DEFAULT_WARN_FRACTION: f64 = 0.9;
/// Rise rate (m/day) considered fast enough to escalate on its own.
pub const DEFAULT_RATE_THRESHOLD_M_PER_DAY: f64 = 1.0;
/// Extra headroom above capacity before the emergency tier trips.
pub const DEFAULT_EMERGENCY_MARGIN_M: f64 = 0.0;
/// Fallback stage area (m^2) for overflow volume when no curve is known.
pub const DEFAULT_STAGE_AREA_SQ_M: f64 = 50_000.0;

/// Recommended gate action, ordered from benign to critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateAction {
    NoAction,
    Warn,
    PrepareRelease,
    EmergencyRelease,
}

impl GateAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateAction::NoAction => "NO_ACTION",
            GateAction::Warn => "WARN",
            GateAction::PrepareRelease => "PREPARE_RELEASE",
            GateAction::EmergencyRelease => "EMERGENCY_RELEASE",
        }
    }
}

impl std::fmt::Display for GateAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-dam thresholds feeding [`decide`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionParams {
    /// Maximum safe reservoir level, meters above datum.
    pub capacity_m: f64,
    /// Fraction of capacity at which the warn band starts, in (0, 1].
    pub warn_fraction: f64,
    /// Headroom above capacity before emergency release, meters.
    pub emergency_margin_m: f64,
    /// Daily rise considered dangerous, m/day.
    pub rate_threshold_m_per_day: f64,
}

impl DecisionParams {
    /// Default thresholds for a dam known only by its capacity.
    pub fn for_capacity(capacity_m: f64) -> Self {
        Self {
            capacity_m,
            warn_fraction: DEFAULT_WARN_FRACTION,
            emergency_margin_m: DEFAULT_EMERGENCY_MARGIN_M,
            rate_threshold_m_per_day: DEFAULT_RATE_THRESHOLD_M_PER_DAY,
        }
    }

    pub fn from_config(config: &DamConfig) -> Self {
        Self {
            capacity_m: config.capacity_m,
            warn_fraction: config.warn_fraction,
            emergency_margin_m: DEFAULT_EMERGENCY_MARGIN_M,
            rate_threshold_m_per_day: config.rate_threshold_m_per_day,
        }
    }

    fn warn_threshold_m(&self) -> f64 {
        self.capacity_m * self.warn_fraction
    }

    fn emergency_threshold_m(&self) -> f64 {
        self.capacity_m + self.emergency_margin_m
    }
}

/// Full decision report: the action plus every derived quantity that fed it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub status: GateAction,
    pub today_level_m: f64,
    pub yesterday_level_m: f64,
    pub dam_capacity_m: f64,
    pub rate_of_change_m_per_day: f64,
    pub predicted_next_level_m: f64,
    pub warn_threshold_m: f64,
    pub emergency_threshold_m: f64,
    pub rate_threshold_m_per_day: f64,
    /// Volume above capacity right now, cubic meters; zero when below.
    pub overflow_m3: f64,
}

/// Stage-area curve used when converting excess level to volume.
///
/// The single default is a flat [`DEFAULT_STAGE_AREA_SQ_M`]; dams with a
/// surveyed elevation-area curve plug their own in via
/// [`decide_with_stage_area`].
pub fn default_stage_area(_elevation_m: f64) -> f64 {
    DEFAULT_STAGE_AREA_SQ_M
}

/// Overflow volume above capacity, `max(0, level - capacity) * area(capacity)`.
pub fn overflow_volume_m3(level_m: f64, capacity_m: f64, stage_area: impl Fn(f64) -> f64) -> f64 {
    if level_m <= capacity_m {
        0.0
    } else {
        (level_m - capacity_m) * stage_area(capacity_m)
    }
}

/// Classify today's reservoir state using the default flat stage area.
pub fn decide(today_level_m: f64, yesterday_level_m: f64, params: &DecisionParams) -> Decision {
    decide_with_stage_area(today_level_m, yesterday_level_m, params, default_stage_area)
}

/// Classify today's reservoir state.
///
/// First matching rule wins, checked from most to least severe:
///
/// 1. above the emergency threshold (strictly) -> `EMERGENCY_RELEASE`
/// 2. at or above capacity -> `PREPARE_RELEASE`
/// 3. in the warn band and rising fast, or projected to reach capacity
///    tomorrow -> `PREPARE_RELEASE`
/// 4. in the warn band otherwise -> `WARN`
/// 5. below the warn band but rising fast or projected to reach capacity
///    tomorrow -> `WARN`
/// 6. otherwise -> `NO_ACTION`
///
/// A falling or flat reservoir never projects above today's level, so rules
/// 3 and 5 only ever fire while the level is rising.
pub fn decide_with_stage_area(
    today_level_m: f64,
    yesterday_level_m: f64,
    params: &DecisionParams,
    stage_area: impl Fn(f64) -> f64,
) -> Decision {
    let rate = today_level_m - yesterday_level_m;
    let predicted_next = today_level_m + rate;
    let warn_threshold = params.warn_threshold_m();
    let emergency_threshold = params.emergency_threshold_m();

    let status = if today_level_m > emergency_threshold {
        GateAction::EmergencyRelease
    } else if today_level_m >= params.capacity_m {
        GateAction::PrepareRelease
    } else if today_level_m >= warn_threshold {
        if rate >= params.rate_threshold_m_per_day || predicted_next >= params.capacity_m {
            GateAction::PrepareRelease
        } else {
            GateAction::Warn
        }
    } else if predicted_next >= params.capacity_m || rate >= params.rate_threshold_m_per_day {
        GateAction::Warn
    } else {
        GateAction::NoAction
    };

    Decision {
        status,
        today_level_m,
        yesterday_level_m,
        dam_capacity_m: params.capacity_m,
        rate_of_change_m_per_day: rate,
        predicted_next_level_m: predicted_next,
        warn_threshold_m: warn_threshold,
        emergency_threshold_m: emergency_threshold,
        rate_threshold_m_per_day: params.rate_threshold_m_per_day,
        overflow_m3: overflow_volume_m3(today_level_m, params.capacity_m, &stage_area),
    }
}
