//! US state reference table.
//!
//! One authoritative table mapping each two-digit state FIPS code to its
//! postal abbreviation, full name, and approximate geographic center. Every
//! lookup that needs "state code -> something" goes through [`STATES`] so the
//! mappings cannot drift apart.

use crate::{Coordinate, normalize_state_fips};

/// Geographic center of the contiguous United States, used when nothing
/// more specific can be resolved.
pub const US_CENTER: Coordinate = Coordinate::new(39.8283, -98.5795);

/// Reference data for a single state (or DC).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateInfo {
    /// Two-digit FIPS code (e.g. `"01"`).
    pub fips: &'static str,
    /// Two-letter postal abbreviation (e.g. `"AL"`).
    pub abbr: &'static str,
    /// Full state name.
    pub name: &'static str,
    /// Approximate geographic center of the state.
    pub centroid: Coordinate,
}

const fn state(
    fips: &'static str,
    abbr: &'static str,
    name: &'static str,
    latitude: f64,
    longitude: f64,
) -> StateInfo {
    StateInfo {
        fips,
        abbr,
        name,
        centroid: Coordinate::new(latitude, longitude),
    }
}

/// The 50 US states + DC, ordered by FIPS code.
pub const STATES: &[StateInfo] = &[
    state("01", "AL", "Alabama", 32.806_671, -86.791_130),
    state("02", "AK", "Alaska", 61.370_716, -152.404_419),
    state("04", "AZ", "Arizona", 33.729_759, -111.431_221),
    state("05", "AR", "Arkansas", 34.969_704, -92.373_123),
    state("06", "CA", "California", 36.116_203, -119.681_564),
    state("08", "CO", "Colorado", 39.059_811, -105.311_104),
    state("09", "CT", "Connecticut", 41.597_782, -72.755_371),
    state("10", "DE", "Delaware", 39.318_523, -75.507_141),
    state("11", "DC", "District of Columbia", 38.897_438, -77.026_817),
    state("12", "FL", "Florida", 27.766_279, -81.686_783),
    state("13", "GA", "Georgia", 33.040_619, -83.643_074),
    state("15", "HI", "Hawaii", 21.094_318, -157.498_337),
    state("16", "ID", "Idaho", 44.240_459, -114.478_828),
    state("17", "IL", "Illinois", 40.349_457, -88.986_137),
    state("18", "IN", "Indiana", 39.849_426, -86.258_278),
    state("19", "IA", "Iowa", 42.011_539, -93.210_526),
    state("20", "KS", "Kansas", 38.526_600, -96.726_486),
    state("21", "KY", "Kentucky", 37.668_140, -84.670_067),
    state("22", "LA", "Louisiana", 31.169_546, -91.867_805),
    state("23", "ME", "Maine", 44.693_947, -69.381_927),
    state("24", "MD", "Maryland", 39.063_946, -76.802_101),
    state("25", "MA", "Massachusetts", 42.230_171, -71.530_106),
    state("26", "MI", "Michigan", 43.326_618, -84.536_095),
    state("27", "MN", "Minnesota", 45.694_454, -93.900_192),
    state("28", "MS", "Mississippi", 32.741_646, -89.678_696),
    state("29", "MO", "Missouri", 38.456_085, -92.288_368),
    state("30", "MT", "Montana", 46.921_925, -110.454_353),
    state("31", "NE", "Nebraska", 41.125_370, -98.268_082),
    state("32", "NV", "Nevada", 38.313_515, -117.055_374),
    state("33", "NH", "New Hampshire", 43.452_492, -71.563_896),
    state("34", "NJ", "New Jersey", 40.298_904, -74.521_011),
    state("35", "NM", "New Mexico", 34.840_515, -106.248_482),
    state("36", "NY", "New York", 42.165_726, -74.948_051),
    state("37", "NC", "North Carolina", 35.630_066, -79.806_419),
    state("38", "ND", "North Dakota", 47.528_912, -99.784_012),
    state("39", "OH", "Ohio", 40.388_783, -82.764_915),
    state("40", "OK", "Oklahoma", 35.565_342, -96.928_917),
    state("41", "OR", "Oregon", 44.572_021, -122.070_938),
    state("42", "PA", "Pennsylvania", 40.590_752, -77.209_755),
    state("44", "RI", "Rhode Island", 41.680_893, -71.511_780),
    state("45", "SC", "South Carolina", 33.856_892, -80.945_007),
    state("46", "SD", "South Dakota", 44.299_782, -99.438_828),
    state("47", "TN", "Tennessee", 35.747_845, -86.692_345),
    state("48", "TX", "Texas", 31.054_487, -97.563_461),
    state("49", "UT", "Utah", 40.150_032, -111.862_434),
    state("50", "VT", "Vermont", 44.045_876, -72.710_686),
    state("51", "VA", "Virginia", 37.769_337, -78.169_968),
    state("53", "WA", "Washington", 47.400_902, -121.490_494),
    state("54", "WV", "West Virginia", 38.491_226, -80.954_453),
    state("55", "WI", "Wisconsin", 44.268_543, -89.616_508),
    state("56", "WY", "Wyoming", 42.756_771, -107.302_490),
];

/// Looks up a state by its two-digit FIPS code.
#[must_use]
pub fn by_fips(fips: &str) -> Option<&'static StateInfo> {
    STATES.iter().find(|s| s.fips == fips)
}

/// Looks up a state by its postal abbreviation (case-insensitive).
#[must_use]
pub fn by_abbr(abbr: &str) -> Option<&'static StateInfo> {
    let abbr = abbr.trim();
    STATES.iter().find(|s| s.abbr.eq_ignore_ascii_case(abbr))
}

/// Looks up a state by a region code that may be either a postal
/// abbreviation (`"oh"`, `"OH"`) or a FIPS code in any padding (`"39"`,
/// `"6"`).
#[must_use]
pub fn by_region_code(code: &str) -> Option<&'static StateInfo> {
    by_abbr(code).or_else(|| normalize_state_fips(code).and_then(|fips| by_fips(&fips)))
}

/// Maps a two-digit FIPS code to the corresponding two-letter state
/// abbreviation.
///
/// Returns `"??"` for unrecognized codes.
#[must_use]
pub fn state_abbr(fips: &str) -> &'static str {
    by_fips(fips).map_or("??", |s| s.abbr)
}

/// Maps a two-digit FIPS code to the full state name.
///
/// Returns `"Unknown"` for unrecognized codes.
#[must_use]
pub fn state_name(fips: &str) -> &'static str {
    by_fips(fips).map_or("Unknown", |s| s.name)
}

/// Maps a two-letter state abbreviation to the corresponding FIPS code.
#[must_use]
pub fn abbr_to_fips(abbr: &str) -> Option<&'static str> {
    by_abbr(abbr).map(|s| s.fips)
}

/// Approximate centroid for a region code (abbreviation or FIPS).
#[must_use]
pub fn region_centroid(code: &str) -> Option<Coordinate> {
    by_region_code(code).map(|s| s.centroid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_and_unique() {
        for pair in STATES.windows(2) {
            assert!(
                pair[0].fips < pair[1].fips,
                "{} should sort before {}",
                pair[0].fips,
                pair[1].fips
            );
        }
        assert_eq!(STATES.len(), 51);
    }

    #[test]
    fn abbr_and_fips_agree() {
        for s in STATES {
            assert_eq!(abbr_to_fips(s.abbr), Some(s.fips));
            assert_eq!(state_abbr(s.fips), s.abbr);
        }
    }

    #[test]
    fn region_code_accepts_abbr_and_fips() {
        let oh = region_centroid("oh").unwrap();
        assert_eq!(region_centroid("39"), Some(oh));
        assert_eq!(region_centroid("6"), region_centroid("CA"));
        assert!(region_centroid("ZZ").is_none());
        assert!(region_centroid("03").is_none());
    }

    #[test]
    fn unknown_codes_fall_back_to_placeholders() {
        assert_eq!(state_abbr("99"), "??");
        assert_eq!(state_name("99"), "Unknown");
    }
}
