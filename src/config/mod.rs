//! Configuration loading and validation.

use crate::error::{EngineError, EngineResult};
use crate::model::Modifiers;
use serde::Deserialize;
use std::path::Path;

/// Maximum size in bytes for a scenario, unit or config file.
pub const MAX_SCENARIO_FILE_BYTES: u64 = 1024 * 1024;

/// Attack trials convolved for the kill distribution before the volume is clamped.
pub const DEFAULT_MAX_DISTRIBUTION_TRIALS: usize = 400;

/// Damage tracked by the distributions before the remainder folds into the last bucket.
pub const DEFAULT_MAX_TRACKED_DAMAGE: usize = 2000;

/// Tolerance for distribution sums and for hiding negligible tail mass in reports.
pub const DEFAULT_PROBABILITY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_distribution_trials: usize,
    /// Upper bound on the defender wounds tracked by the kill distribution.
    pub max_tracked_damage: usize,
    pub probability_epsilon: f64,
    /// Used when a scenario carries no modifiers block.
    pub default_modifiers: Modifiers,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_distribution_trials: DEFAULT_MAX_DISTRIBUTION_TRIALS,
            max_tracked_damage: DEFAULT_MAX_TRACKED_DAMAGE,
            probability_epsilon: DEFAULT_PROBABILITY_EPSILON,
            default_modifiers: Modifiers::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> EngineResult<Self> {
        let mut cfg: EngineConfig = toml::from_str(s)?;
        cfg.max_distribution_trials = cfg.max_distribution_trials.max(1);
        cfg.max_tracked_damage = cfg.max_tracked_damage.max(1);
        if !(cfg.probability_epsilon > 0.0 && cfg.probability_epsilon < 1.0) {
            tracing::debug!(
                epsilon = cfg.probability_epsilon,
                "probability_epsilon out of range, using default"
            );
            cfg.probability_epsilon = DEFAULT_PROBABILITY_EPSILON;
        }
        Ok(cfg)
    }

    /// Load from a TOML file; `None` gives the defaults.
    pub fn load(path: Option<&Path>) -> EngineResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let s = crate::util::read_bounded(path, MAX_SCENARIO_FILE_BYTES)?;
        Self::from_toml_str(&s).map_err(|e| match e {
            EngineError::Toml(inner) => EngineError::InvalidScenario(format!(
                "config {}: {}",
                path.display(),
                inner
            )),
            other => other,
        })
    }
}
