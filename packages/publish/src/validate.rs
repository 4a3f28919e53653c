//! Validation of an edited table against its original.
//!
//! Every rule runs over every row; all findings are collected into one
//! [`ValidationReport`] instead of stopping at the first problem.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use care_access_dataset::Table;
use care_access_dataset::coerce::{Coerced, coerce};
use care_access_dataset::schema::{
    COUNTY_FIPS, DISTANCE_BAND, GEO_ID, LATITUDE, LONGITUDE, NUMERIC_COLUMNS, STATE_FIPS,
};
use care_access_geography_models::{COUNTY_FIPS_WIDTH, GEO_ID_WIDTH, STATE_FIPS_WIDTH, is_fixed_width_digits};
use care_access_spatial::DistanceBand;
use regex::Regex;
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};

/// Samples kept per issue kind.
pub const MAX_SAMPLES: usize = 5;

/// Which curated table is being edited. Decides the numeric columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DatasetKind {
    /// The county coverage table or the gap-county table.
    Coverage,
    /// The county model table.
    CountyModel,
    /// The resolved care-center table.
    Centers,
}

impl DatasetKind {
    /// Guesses the kind from a file name, defaulting to coverage.
    #[must_use]
    pub fn infer(file_name: &str) -> Self {
        let name = file_name.to_ascii_lowercase();
        if name.contains("center") {
            Self::Centers
        } else if name.contains("model") {
            Self::CountyModel
        } else {
            Self::Coverage
        }
    }

    /// Columns that must hold numbers when present.
    #[must_use]
    pub const fn numeric_columns(self) -> &'static [&'static str] {
        match self {
            Self::Coverage => NUMERIC_COLUMNS,
            Self::CountyModel => &[
                "male_5_9",
                "male_10_14",
                "male_15_19",
                "male_20_24",
                "population_at_risk_low",
                "population_at_risk_mid",
                "population_at_risk_high",
                LATITUDE,
                LONGITUDE,
            ],
            Self::Centers => &[LATITUDE, LONGITUDE, "certification_year"],
        }
    }
}

/// Identifier columns and their fixed widths.
const IDENTIFIER_RULES: &[(&str, usize)] = &[
    (STATE_FIPS, STATE_FIPS_WIDTH),
    (COUNTY_FIPS, COUNTY_FIPS_WIDTH),
    (GEO_ID, GEO_ID_WIDTH),
];

/// One offending cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueSample {
    /// 1-based data row (the header is row 0).
    pub row: usize,
    /// Column name.
    pub column: String,
    /// The cell as entered.
    pub value: String,
}

impl fmt::Display for IssueSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {} {}={:?}", self.row, self.column, self.value)
    }
}

/// All findings of one kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// How many cells were affected.
    pub count: usize,
    /// The first few of them.
    pub samples: Vec<IssueSample>,
}

/// Findings keyed by issue kind (`invalid_state_fips`,
/// `invalid_distance_band`, `non_numeric_latitude`, ...). Empty means
/// valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Issues by kind.
    pub issues: BTreeMap<String, Issue>,
}

impl ValidationReport {
    /// Whether no issues were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Total affected cells across kinds.
    #[must_use]
    pub fn issue_count(&self) -> usize {
        self.issues.values().map(|i| i.count).sum()
    }

    /// The issue of `kind`, if any.
    #[must_use]
    pub fn get(&self, kind: &str) -> Option<&Issue> {
        self.issues.get(kind)
    }

    fn record(&mut self, kind: String, row: usize, column: &str, value: &str) {
        let issue = self.issues.entry(kind).or_default();
        issue.count += 1;
        if issue.samples.len() < MAX_SAMPLES {
            issue.samples.push(IssueSample {
                row: row + 1,
                column: column.to_string(),
                value: value.to_string(),
            });
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return write!(f, "no issues");
        }
        for (index, (kind, issue)) in self.issues.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", kind.replace('_', " "), issue.count)?;
            let samples: Vec<String> = issue.samples.iter().map(ToString::to_string).collect();
            if !samples.is_empty() {
                write!(f, " ({})", samples.join("; "))?;
            }
        }
        Ok(())
    }
}

const NUMBER: &str = "([0-9]+(?:\\.[0-9]+)?)";

static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{NUMBER}(?:_|-|to)(?:{NUMBER})$")).expect("valid regex"));

static BOUND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^(<=|<|le|lt|under|upto|>=|>|ge|gt|over|above){NUMBER}$")).expect("valid regex")
});

static PLUS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(&format!("^{NUMBER}\\+$")).expect("valid regex"));

/// Parses a distance-band cell the way people actually type it.
///
/// Accepts the canonical labels and `unknown`, case and whitespace
/// variations, en and em dashes, a leading comparison (`< 150`,
/// `over 300`), ranges (`0-150`, `150 to 300`), a trailing unit (`mi`,
/// `miles`), `300+`, and bare distances, which are bucketed with the same
/// thresholds as the coverage engine.
#[must_use]
pub fn parse_distance_band(value: &str) -> Option<DistanceBand> {
    let mut s: String = value
        .to_lowercase()
        .replace(['\u{2013}', '\u{2014}', '\u{2212}'], "-")
        .replace('\u{2264}', "<=")
        .replace('\u{2265}', ">=")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    for unit in ["miles", "mile", "mi"] {
        if let Some(stripped) = s.strip_suffix(unit) {
            s = stripped.to_string();
            break;
        }
    }

    match s.as_str() {
        "" => return None,
        "unknown" => return Some(DistanceBand::Unknown),
        _ => {}
    }
    if let Some(band) = DistanceBand::known().iter().find(|b| b.to_string() == s) {
        return Some(*band);
    }

    let number = |text: &str| text.parse::<f64>().ok();
    let same = |a: f64, b: f64| (a - b).abs() < f64::EPSILON;

    if let Some(caps) = RANGE_RE.captures(&s) {
        let (lower, upper) = (number(&caps[1])?, number(&caps[2])?);
        return DistanceBand::TABLE
            .iter()
            .find(|band| same(band.lower, lower) && band.upper.is_some_and(|u| same(u, upper)))
            .map(|band| band.key);
    }

    if let Some(caps) = BOUND_RE.captures(&s) {
        let limit = number(&caps[2])?;
        let first = DistanceBand::TABLE.first()?;
        let last = DistanceBand::TABLE.last()?;
        return match &caps[1] {
            "<=" | "<" | "le" | "lt" | "under" | "upto" if first.upper.is_some_and(|u| same(u, limit)) => {
                Some(first.key)
            }
            ">=" | ">" | "ge" | "gt" | "over" | "above" if same(last.lower, limit) => Some(last.key),
            _ => None,
        };
    }

    if let Some(caps) = PLUS_RE.captures(&s) {
        let last = DistanceBand::TABLE.last()?;
        return same(number(&caps[1])?, last.lower).then_some(last.key);
    }

    let miles = number(&s).filter(|v| v.is_finite() && *v >= 0.0)?;
    Some(DistanceBand::classify(Some(miles)))
}

/// Validates `edited` as a table of `kind`, using `original` to tell new
/// non-numeric values from ones that were already there.
///
/// Rules apply only to columns the edited table has:
///
/// * identifiers: `state_fips`, `county_fips` and `geo_id` are 2, 3 and 5
///   digit strings;
/// * `distance_band` parses with [`parse_distance_band`];
/// * numeric columns of `kind` hold numbers or are blank. A value that
///   does not parse is an issue unless the original had the same value in
///   the same row.
#[must_use]
pub fn validate_edits(original: &Table, edited: &Table, kind: DatasetKind) -> ValidationReport {
    let mut report = ValidationReport::default();

    for &(column, width) in IDENTIFIER_RULES {
        let Some(col) = edited.column_index(column) else {
            continue;
        };
        for (row, value) in edited.column_values(col).enumerate() {
            if !is_fixed_width_digits(value.trim(), width) {
                report.record(format!("invalid_{column}"), row, column, value);
            }
        }
    }

    if let Some(col) = edited.column_index(DISTANCE_BAND) {
        for (row, value) in edited.column_values(col).enumerate() {
            if parse_distance_band(value).is_none() {
                report.record(format!("invalid_{DISTANCE_BAND}"), row, DISTANCE_BAND, value);
            }
        }
    }

    for &column in kind.numeric_columns() {
        let Some(col) = edited.column_index(column) else {
            continue;
        };
        let before = original.column_index(column);
        for (row, value) in edited.column_values(col).enumerate() {
            if coerce(value) != Coerced::Invalid {
                continue;
            }
            let pre_existing = before
                .and_then(|b| original.cell(row, b))
                .is_some_and(|old| old.trim() == value.trim());
            if !pre_existing {
                report.record(format!("non_numeric_{column}"), row, column, value);
            }
        }
    }

    if report.is_valid() {
        log::debug!("Validation passed for {} rows", edited.len());
    } else {
        log::info!("Validation found {} issue(s): {}", report.issue_count(), report);
    }
    report
}
