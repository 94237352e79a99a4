//! Dam registry: free-text name to per-dam configuration.
//!
//! Lookups are deliberately forgiving. Users type "Tehri", "Tehri Dam,
//! Uttarakhand" or "the tehri dam"; the registry matches case-insensitively
//! by substring containment of the configured key in the query. Keys are
//! kept in a sorted map so a query matching several dams always resolves
//! the same way.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

/// Registry shipped with the crate, approximate full-reservoir levels for
/// a handful of large Indian dams.
const BUILTIN_REGISTRY_JSON: &str = include_str!("../data/dams.json");

/// Thresholds configured for one dam.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DamConfig {
    /// Maximum safe reservoir level, meters above datum.
    pub capacity_m: f64,
    /// Fraction of capacity at which the warn band starts, in (0, 1].
    #[serde(default = "default_warn_fraction")]
    pub warn_fraction: f64,
    /// Daily rise considered dangerous, m/day.
    #[serde(default = "default_rate_threshold")]
    pub rate_threshold_m_per_day: f64,
}

fn default_warn_fraction() -> f64 {
    crate::decision::DEFAULT_WARN_FRACTION
}

fn default_rate_threshold() -> f64 {
    crate::decision::DEFAULT_RATE_THRESHOLD_M_PER_DAY
}

impl DamConfig {
    fn is_valid(&self) -> bool {
        self.capacity_m.is_finite()
            && self.capacity_m > 0.0
            && self.warn_fraction.is_finite()
            && self.warn_fraction > 0.0
            && self.warn_fraction <= 1.0
            && self.rate_threshold_m_per_day.is_finite()
            && self.rate_threshold_m_per_day > 0.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read registry file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse registry JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("registry contains no usable dam entries")]
    Empty,
}

/// In-memory dam registry keyed by normalized dam name.
#[derive(Debug, Clone)]
pub struct DamRegistry {
    entries: BTreeMap<String, DamConfig>,
}

impl DamRegistry {
    /// Registry embedded in the binary.
    pub fn builtin() -> Self {
        // The embedded file is validated by a unit test.
        Self::from_json_str(BUILTIN_REGISTRY_JSON).expect("embedded dam registry must parse")
    }

    /// Load a registry from a JSON file of `{ "dam name": { ... } }` entries.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parse a registry from JSON text.
    ///
    /// Entries with out-of-range thresholds are skipped with a warning
    /// rather than poisoning the rest of the file; an entirely unusable
    /// file is an error.
    pub fn from_json_str(text: &str) -> Result<Self, RegistryError> {
        let parsed: BTreeMap<String, DamConfig> = serde_json::from_str(text)?;
        let total = parsed.len();
        let mut entries = BTreeMap::new();
        for (key, config) in parsed {
            if !config.is_valid() {
                tracing::warn!(dam = %key, "skipping dam entry with out-of-range thresholds");
                continue;
            }
            entries.insert(normalize(&key), config);
        }
        if entries.is_empty() && total > 0 {
            return Err(RegistryError::Empty);
        }
        Ok(Self { entries })
    }

    /// Resolve a free-text dam name.
    ///
    /// Returns the first (alphabetically by key) configured dam whose key
    /// appears inside the query, compared case-insensitively. `None` means
    /// no configured dam matched; callers treat that as "analysis only, no
    /// gate decision".
    pub fn find(&self, query: &str) -> Option<&DamConfig> {
        let needle = normalize(query);
        self.entries
            .iter()
            .find(|(key, _)| needle.contains(key.as_str()))
            .map(|(_, config)| config)
    }

    /// Like [`find`](Self::find), also returning the matched registry key.
    pub fn find_entry(&self, query: &str) -> Option<(&str, &DamConfig)> {
        let needle = normalize(query);
        self.entries
            .iter()
            .find(|(key, _)| needle.contains(key.as_str()))
            .map(|(key, config)| (key.as_str(), config))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DamConfig)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn normalize(name: &str) -> String {
    name.trim().replace('_', " ").to_lowercase()
}
