//! The population-at-risk aggregator.

use serde::{Deserialize, Serialize};

use crate::params::PrevalenceParams;

/// Male population counts in the four five-year bands from 5 to 24.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AgeBandCounts {
    /// Ages 5-9.
    pub male_5_9: f64,
    /// Ages 10-14.
    pub male_10_14: f64,
    /// Ages 15-19.
    pub male_15_19: f64,
    /// Ages 20-24.
    pub male_20_24: f64,
}

impl AgeBandCounts {
    /// Sum of the four bands. Negative and non-finite counts contribute
    /// zero.
    #[must_use]
    pub fn total(&self) -> f64 {
        [self.male_5_9, self.male_10_14, self.male_15_19, self.male_20_24]
            .into_iter()
            .map(clamp_count)
            .sum()
    }
}

fn clamp_count(count: f64) -> f64 {
    if count.is_finite() && count > 0.0 { count } else { 0.0 }
}

/// Low, mid and high population-at-risk estimates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationEstimate {
    /// Lower bound.
    pub low: f64,
    /// Central estimate.
    pub mid: f64,
    /// Upper bound.
    pub high: f64,
}

/// Rounds to one decimal place, half away from zero.
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Estimates the population at risk for `total_at_risk` people.
///
/// Each registry rate is scaled by the target fraction and compared with
/// the diagnosed-rate anchor: the low bound takes the smaller of the two,
/// the high bound the larger, and the mid estimate averages registry mid
/// with the diagnosed anchor. Negative or non-finite totals count as zero.
/// Results are rounded to one decimal.
#[must_use]
pub fn estimate(total_at_risk: f64, params: &PrevalenceParams) -> PopulationEstimate {
    let total = clamp_count(total_at_risk);
    let registry = |rate: f64| total * rate * params.target_fraction;
    let diagnosed = total * params.diagnosed_rate;

    PopulationEstimate {
        low: round1(registry(params.registry_rate_low).min(diagnosed)),
        mid: round1(f64::midpoint(registry(params.registry_rate_mid), diagnosed)),
        high: round1(registry(params.registry_rate_high).max(diagnosed)),
    }
}
