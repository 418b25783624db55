use crate::errors::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const DEFAULT_RULES: &str = include_str!("../data/rules.ron");

/// Tunable balance constants for damage, criticals, field durations and speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleRules {
    pub stab_multiplier: f64,
    pub critical_multiplier: f64,
    /// Critical-hit chance indexed by crit stage; stages past the end use the last entry.
    pub critical_rates: Vec<f64>,
    /// Inclusive bounds of the uniform damage roll.
    pub random_factor: (f64, f64),
    pub default_field_duration: u8,
    pub screen_multiplier: f64,
    pub tailwind_speed_multiplier: f64,
    pub paralysis_speed_multiplier: f64,
}

impl Default for BattleRules {
    fn default() -> Self {
        Self {
            stab_multiplier: 1.5,
            critical_multiplier: 1.5,
            critical_rates: vec![1.0 / 24.0, 1.0 / 8.0, 1.0 / 2.0, 1.0],
            random_factor: (0.85, 1.0),
            default_field_duration: 5,
            screen_multiplier: 0.5,
            tailwind_speed_multiplier: 2.0,
            paralysis_speed_multiplier: 0.5,
        }
    }
}

impl BattleRules {
    /// The rules shipped with the crate in `data/rules.ron`.
    pub fn standard() -> ConfigResult<Self> {
        Self::from_ron_str(DEFAULT_RULES)
    }

    /// Parse rules from RON text. Missing fields fall back to their defaults.
    pub fn from_ron_str(source: &str) -> ConfigResult<Self> {
        let rules: BattleRules = ron::from_str(source)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Load rules from a RON file on disk
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_ron_str(&content)
    }

    /// Chance of a critical hit at the given crit stage.
    pub fn critical_rate(&self, stage: u8) -> f64 {
        let index = (stage as usize).min(self.critical_rates.len().saturating_sub(1));
        self.critical_rates.get(index).copied().unwrap_or(0.0)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        check_positive("stab_multiplier", self.stab_multiplier)?;
        check_positive("critical_multiplier", self.critical_multiplier)?;
        check_positive("screen_multiplier", self.screen_multiplier)?;
        check_positive("tailwind_speed_multiplier", self.tailwind_speed_multiplier)?;
        check_positive("paralysis_speed_multiplier", self.paralysis_speed_multiplier)?;

        if self.critical_rates.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "critical_rates".to_string(),
                reason: "at least one stage is required".to_string(),
            });
        }
        for rate in &self.critical_rates {
            check_probability("critical_rates", *rate)?;
        }

        let (low, high) = self.random_factor;
        if !(low > 0.0 && low <= high) {
            return Err(ConfigError::InvalidValue {
                field: "random_factor".to_string(),
                reason: format!("bounds must satisfy 0 < low <= high, got ({}, {})", low, high),
            });
        }
        if self.default_field_duration == 0 {
            return Err(ConfigError::InvalidValue {
                field: "default_field_duration".to_string(),
                reason: "must be at least one turn".to_string(),
            });
        }
        Ok(())
    }
}

fn check_positive(field: &str, value: f64) -> ConfigResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("must be positive, got {}", value),
        })
    }
}

fn check_probability(field: &str, value: f64) -> ConfigResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability {
            field: field.to_string(),
            value,
        })
    }
}
