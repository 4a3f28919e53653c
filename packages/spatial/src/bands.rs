//! Named half-open bands for distance and travel time.
//!
//! A band covers `[lower, upper)`; the last band of a table has no upper
//! bound. Tables are evaluated in order and the first match wins, so a
//! value sitting exactly on a boundary lands in the band whose lower bound
//! equals it.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A single named interval `[lower, upper)`. `upper == None` means
/// unbounded above.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band<K> {
    /// The value returned when this band matches.
    pub key: K,
    /// Inclusive lower bound.
    pub lower: f64,
    /// Exclusive upper bound, or `None` for the open-ended final band.
    pub upper: Option<f64>,
}

impl<K> Band<K> {
    /// Creates a band.
    #[must_use]
    pub const fn new(key: K, lower: f64, upper: Option<f64>) -> Self {
        Self { key, lower, upper }
    }

    /// Whether `value` falls inside this band.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && self.upper.is_none_or(|upper| value < upper)
    }
}

/// Returns the key of the first band containing `value`.
///
/// `None` and `NaN` never match; neither does a value below the first
/// band's lower bound.
#[must_use]
pub fn classify_band<K: Copy>(value: Option<f64>, bands: &[Band<K>]) -> Option<K> {
    let value = value.filter(|v| !v.is_nan())?;
    bands.iter().find(|band| band.contains(value)).map(|band| band.key)
}

/// Straight-line distance band, in miles.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum DistanceBand {
    /// `[0, 150)` miles. The `<=150` label is historical; exactly 150
    /// miles falls in [`Self::From150To300`].
    #[serde(rename = "<=150")]
    #[strum(serialize = "<=150")]
    Within150,
    /// `[150, 300)` miles.
    #[serde(rename = "150_300")]
    #[strum(serialize = "150_300")]
    From150To300,
    /// `[300, inf)` miles.
    #[serde(rename = ">300")]
    #[strum(serialize = ">300")]
    Beyond300,
    /// No resolved coordinate.
    #[serde(rename = "unknown")]
    #[strum(serialize = "unknown")]
    Unknown,
}

impl DistanceBand {
    /// Classification table, in evaluation order.
    pub const TABLE: &'static [Band<Self>] = &[
        Band::new(Self::Within150, 0.0, Some(150.0)),
        Band::new(Self::From150To300, 150.0, Some(300.0)),
        Band::new(Self::Beyond300, 300.0, None),
    ];

    /// Classifies a distance in miles; missing values are [`Self::Unknown`].
    #[must_use]
    pub fn classify(miles: Option<f64>) -> Self {
        classify_band(miles, Self::TABLE).unwrap_or(Self::Unknown)
    }

    /// Whether this is the worst (open-ended) tier.
    #[must_use]
    pub const fn is_worst_tier(self) -> bool {
        matches!(self, Self::Beyond300)
    }

    /// The three classifiable bands, excluding [`Self::Unknown`].
    #[must_use]
    pub const fn known() -> &'static [Self] {
        &[Self::Within150, Self::From150To300, Self::Beyond300]
    }
}

/// Approximate travel-time band, in minutes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum TravelTimeBand {
    /// `[0, 120)` minutes.
    #[serde(rename = "<=120")]
    #[strum(serialize = "<=120")]
    Within120,
    /// `[120, 360)` minutes.
    #[serde(rename = "120_360")]
    #[strum(serialize = "120_360")]
    From120To360,
    /// `[360, inf)` minutes.
    #[serde(rename = ">360")]
    #[strum(serialize = ">360")]
    Beyond360,
    /// No resolved coordinate.
    #[serde(rename = "unknown")]
    #[strum(serialize = "unknown")]
    Unknown,
}

impl TravelTimeBand {
    /// Classification table, in evaluation order.
    pub const TABLE: &'static [Band<Self>] = &[
        Band::new(Self::Within120, 0.0, Some(120.0)),
        Band::new(Self::From120To360, 120.0, Some(360.0)),
        Band::new(Self::Beyond360, 360.0, None),
    ];

    /// Classifies a travel time in minutes; missing values are
    /// [`Self::Unknown`].
    #[must_use]
    pub fn classify(minutes: Option<f64>) -> Self {
        classify_band(minutes, Self::TABLE).unwrap_or(Self::Unknown)
    }

    /// Whether this is the worst (open-ended) tier.
    #[must_use]
    pub const fn is_worst_tier(self) -> bool {
        matches!(self, Self::Beyond360)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn every_number_lands_in_exactly_one_band() {
        for value in [0.0, 0.5, 149.999, 150.0, 299.9, 300.0, 1.0e12, f64::INFINITY] {
            let matches = DistanceBand::TABLE
                .iter()
                .filter(|band| band.contains(value))
                .count();
            assert_eq!(matches, 1, "{value} matched {matches} bands");
        }
    }

    #[test]
    fn boundaries_are_lower_inclusive() {
        assert_eq!(DistanceBand::classify(Some(0.0)), DistanceBand::Within150);
        assert_eq!(DistanceBand::classify(Some(150.0)), DistanceBand::From150To300);
        assert_eq!(DistanceBand::classify(Some(300.0)), DistanceBand::Beyond300);
        assert_eq!(DistanceBand::classify(Some(1.0e9)), DistanceBand::Beyond300);
        assert_eq!(TravelTimeBand::classify(Some(120.0)), TravelTimeBand::From120To360);
        assert_eq!(TravelTimeBand::classify(Some(360.0)), TravelTimeBand::Beyond360);
    }

    #[test]
    fn missing_values_are_unknown() {
        assert_eq!(DistanceBand::classify(None), DistanceBand::Unknown);
        assert_eq!(DistanceBand::classify(Some(f64::NAN)), DistanceBand::Unknown);
        assert_eq!(TravelTimeBand::classify(None), TravelTimeBand::Unknown);
    }

    #[test]
    fn caller_supplied_order_decides_overlaps() {
        let bands = [Band::new('a', 0.0, Some(10.0)), Band::new('b', 5.0, None)];
        assert_eq!(classify_band(Some(7.0), &bands), Some('a'));
        assert_eq!(classify_band(Some(10.0), &bands), Some('b'));
        assert_eq!(classify_band(Some(-1.0), &bands), None);
    }

    #[test]
    fn keys_render_as_canonical_strings() {
        assert_eq!(DistanceBand::Within150.to_string(), "<=150");
        assert_eq!(DistanceBand::From150To300.as_ref(), "150_300");
        assert_eq!(DistanceBand::from_str(">300").unwrap(), DistanceBand::Beyond300);
        assert_eq!(TravelTimeBand::Unknown.to_string(), "unknown");
    }

    #[test]
    fn worst_tier_flags() {
        assert!(DistanceBand::Beyond300.is_worst_tier());
        assert!(!DistanceBand::Unknown.is_worst_tier());
        assert!(TravelTimeBand::Beyond360.is_worst_tier());
        assert!(!TravelTimeBand::From120To360.is_worst_tier());
    }
}
