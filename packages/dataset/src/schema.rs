//! The canonical coverage-table schema and the historical column names that
//! map onto it.

/// Two-digit state FIPS code.
pub const STATE_FIPS: &str = "state_fips";
/// Three-digit county FIPS code.
pub const COUNTY_FIPS: &str = "county_fips";
/// Five-digit combined GEOID.
pub const GEO_ID: &str = "geo_id";
/// County display name.
pub const COUNTY_NAME: &str = "county_name";
/// Latitude in decimal degrees.
pub const LATITUDE: &str = "latitude";
/// Longitude in decimal degrees.
pub const LONGITUDE: &str = "longitude";
/// Nearest care-center identifier.
pub const NEAREST_CENTER_ID: &str = "nearest_center_id";
/// Nearest care-center name.
pub const NEAREST_CENTER_NAME: &str = "nearest_center_name";
/// Great-circle distance to the nearest center.
pub const DISTANCE_MILES: &str = "great_circle_distance_miles";
/// Approximate travel time to the nearest center.
pub const TRAVEL_MINUTES: &str = "approximate_travel_minutes";
/// Distance band key.
pub const DISTANCE_BAND: &str = "distance_band";
/// Travel-time band key.
pub const TRAVEL_TIME_BAND: &str = "travel_time_band";
/// `true` when either band is in the worst tier.
pub const GAP_FLAG: &str = "gap_flag";
/// Mid population-at-risk estimate.
pub const POPULATION_MID: &str = "population_at_risk_mid";
/// Low population-at-risk estimate.
pub const POPULATION_LOW: &str = "population_at_risk_low";
/// High population-at-risk estimate.
pub const POPULATION_HIGH: &str = "population_at_risk_high";
/// Care-center identifier.
pub const CENTER_ID: &str = "center_id";

/// Canonical coverage columns, in output order.
pub const COVERAGE_COLUMNS: &[&str] = &[
    STATE_FIPS,
    COUNTY_FIPS,
    GEO_ID,
    COUNTY_NAME,
    LATITUDE,
    LONGITUDE,
    NEAREST_CENTER_ID,
    NEAREST_CENTER_NAME,
    DISTANCE_MILES,
    TRAVEL_MINUTES,
    DISTANCE_BAND,
    TRAVEL_TIME_BAND,
    GAP_FLAG,
    POPULATION_MID,
];

/// Columns that must hold numbers when present.
pub const NUMERIC_COLUMNS: &[&str] = &[
    LATITUDE,
    LONGITUDE,
    DISTANCE_MILES,
    TRAVEL_MINUTES,
    POPULATION_LOW,
    POPULATION_MID,
    POPULATION_HIGH,
];

/// A canonical column together with every name it has appeared under.
#[derive(Debug, Clone, Copy)]
pub struct ColumnAlias {
    /// Canonical name.
    pub canonical: &'static str,
    /// Accepted spellings, compared case-insensitively, most specific
    /// first. The canonical name itself is always accepted.
    pub variants: &'static [&'static str],
}

/// Historical spellings of each canonical column.
///
/// Order matters within `variants`: when a file carries more than one
/// spelling, the earliest listed wins and the others are left untouched.
/// A bare `state` column may hold postal abbreviations; a bare `county`
/// column usually holds names and is deliberately not recognized.
pub const ALIASES: &[ColumnAlias] = &[
    ColumnAlias {
        canonical: STATE_FIPS,
        variants: &["statefp", "state_code", "state"],
    },
    ColumnAlias {
        canonical: COUNTY_FIPS,
        variants: &["countyfp", "county_code"],
    },
    ColumnAlias {
        canonical: GEO_ID,
        variants: &["geoid", "fips", "county_geoid"],
    },
    ColumnAlias {
        canonical: COUNTY_NAME,
        variants: &["ctyname", "namelsad", "name"],
    },
    ColumnAlias {
        canonical: LATITUDE,
        variants: &["lat", "centroid_lat", "intptlat", "pclat10", "lat_dd"],
    },
    ColumnAlias {
        canonical: LONGITUDE,
        variants: &[
            "lon",
            "lng",
            "long",
            "centroid_lon",
            "intptlong",
            "pclon10",
            "lon_dd",
        ],
    },
    ColumnAlias {
        canonical: DISTANCE_MILES,
        variants: &["great_circle_mi", "distance_miles", "distance_mi"],
    },
    ColumnAlias {
        canonical: TRAVEL_MINUTES,
        variants: &["drive_time_minutes", "travel_minutes"],
    },
    ColumnAlias {
        canonical: DISTANCE_BAND,
        variants: &["band_miles", "band_distance"],
    },
    ColumnAlias {
        canonical: TRAVEL_TIME_BAND,
        variants: &["band_drive_time", "band_travel_time"],
    },
    ColumnAlias {
        canonical: GAP_FLAG,
        variants: &["flags", "gap"],
    },
    ColumnAlias {
        canonical: POPULATION_MID,
        variants: &["modeled_dmd_5_24_mid", "population_mid"],
    },
    ColumnAlias {
        canonical: POPULATION_LOW,
        variants: &["modeled_dmd_5_24_low", "population_low"],
    },
    ColumnAlias {
        canonical: POPULATION_HIGH,
        variants: &["modeled_dmd_5_24_high", "population_high"],
    },
];

/// Interprets a gap-flag cell.
///
/// Older files stored a reason string (`distance_gt_300`) or an empty cell
/// instead of a boolean; any non-empty value other than an explicit false
/// counts as flagged.
#[must_use]
pub fn parse_gap_flag(cell: &str) -> bool {
    let trimmed = cell.trim();
    !(trimmed.is_empty()
        || ["false", "0", "no", "n", "f"]
            .iter()
            .any(|falsy| trimmed.eq_ignore_ascii_case(falsy)))
}
