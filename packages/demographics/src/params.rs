//! Prevalence parameters.
//!
//! Rates are stored per capita. The defaults are the published anchors:
//! registry prevalence of 1.3 / 1.47 / 1.8 per 10,000 males, of which an
//! estimated 75% are the target condition, and a diagnosed prevalence of 6
//! per 100,000 males. A TOML file may override any subset.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::DemographicsError;

/// Registry-derived prevalence, low bound, per capita.
pub const REGISTRY_RATE_LOW: f64 = 1.3 / 10_000.0;
/// Registry-derived prevalence, central value, per capita.
pub const REGISTRY_RATE_MID: f64 = 1.47 / 10_000.0;
/// Registry-derived prevalence, high bound, per capita.
pub const REGISTRY_RATE_HIGH: f64 = 1.8 / 10_000.0;
/// Share of registry conditions that are the target condition.
pub const TARGET_FRACTION: f64 = 0.75;
/// Diagnosed prevalence, per capita.
pub const DIAGNOSED_RATE: f64 = 6.0 / 100_000.0;

/// The constants an estimate is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrevalenceParams {
    /// Registry rate, low.
    pub registry_rate_low: f64,
    /// Registry rate, mid.
    pub registry_rate_mid: f64,
    /// Registry rate, high.
    pub registry_rate_high: f64,
    /// Fraction of registry cases that are the target condition.
    pub target_fraction: f64,
    /// Diagnosed-rate anchor.
    pub diagnosed_rate: f64,
}

impl Default for PrevalenceParams {
    fn default() -> Self {
        Self {
            registry_rate_low: REGISTRY_RATE_LOW,
            registry_rate_mid: REGISTRY_RATE_MID,
            registry_rate_high: REGISTRY_RATE_HIGH,
            target_fraction: TARGET_FRACTION,
            diagnosed_rate: DIAGNOSED_RATE,
        }
    }
}

impl PrevalenceParams {
    /// Parses parameters from TOML; omitted keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`DemographicsError::Params`] for malformed TOML and
    /// [`DemographicsError::InvalidParam`] for negative or non-finite
    /// values.
    pub fn from_toml_str(text: &str) -> Result<Self, DemographicsError> {
        let params: Self = toml::de::from_str(text)?;
        params.validate()?;
        Ok(params)
    }

    /// Reads parameters from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`DemographicsError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, DemographicsError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    fn validate(&self) -> Result<(), DemographicsError> {
        for (name, value) in [
            ("registry_rate_low", self.registry_rate_low),
            ("registry_rate_mid", self.registry_rate_mid),
            ("registry_rate_high", self.registry_rate_high),
            ("target_fraction", self.target_fraction),
            ("diagnosed_rate", self.diagnosed_rate),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DemographicsError::InvalidParam { name, value });
            }
        }
        Ok(())
    }

    /// Human-readable description of the method, written into every county
    /// model row.
    #[must_use]
    pub fn methodology_note(&self) -> String {
        format!(
            "Registry prevalence {} / {} / {} per 10k males 5-24 multiplied by {} for the target condition; \
             diagnosed prevalence {} per 100k males 5-24; low = min and high = max of the two anchors, \
             mid = mean of registry mid and diagnosed",
            trim(self.registry_rate_low * 10_000.0),
            trim(self.registry_rate_mid * 10_000.0),
            trim(self.registry_rate_high * 10_000.0),
            trim(self.target_fraction),
            trim(self.diagnosed_rate * 100_000.0),
        )
    }
}

/// Renders a rate with at most four decimals and no trailing zeros, so
/// `1.4699999999999998` prints as `1.47`.
fn trim(value: f64) -> String {
    let rendered = format!("{value:.4}");
    rendered.trim_end_matches('0').trim_end_matches('.').to_string()
}
