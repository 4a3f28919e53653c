//! Maps heterogeneous coverage files onto the canonical schema.

use std::collections::{BTreeMap, BTreeSet};

use care_access_geography_models::{fips, normalize_county_fips, normalize_geo_id, normalize_state_fips, split_geo_id};
use serde::Serialize;

use crate::coerce::{Coerced, coerce, format_number};
use crate::schema::{self, ColumnAlias};
use crate::{DatasetError, Table};

/// What normalization changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    /// `(original, canonical)` header renames, in application order.
    pub renamed: Vec<(String, String)>,
    /// Rows dropped because no identifier could be derived.
    pub dropped_unidentified: usize,
    /// Rows dropped because their GEOID repeated an earlier row.
    pub duplicates: usize,
    /// Per-column count of present values that failed numeric coercion.
    pub coercion_failures: BTreeMap<String, usize>,
}

/// Renames the first matching historical variant of each canonical column.
///
/// A column that already carries the canonical name (in any case) is only
/// re-cased; variants are not consulted for it.
pub fn rename_aliases(table: &mut Table, aliases: &[ColumnAlias]) -> Vec<(String, String)> {
    let mut renamed = Vec::new();
    for alias in aliases {
        if table.has_column(alias.canonical) {
            continue;
        }
        let col = table
            .find_column(&[alias.canonical])
            .or_else(|| table.find_column(alias.variants));
        if let Some(col) = col {
            renamed.push((table.headers()[col].clone(), alias.canonical.to_string()));
            table.rename_column(col, alias.canonical);
        }
    }
    renamed
}

/// Resolves a state cell that may be a FIPS code or a postal abbreviation.
fn state_code(cell: &str) -> Option<String> {
    normalize_state_fips(cell).or_else(|| fips::by_abbr(cell.trim()).map(|s| s.fips.to_string()))
}

/// Derives zero-padded `state_fips`, `county_fips` and `geo_id` for every
/// row, dropping rows with no usable identifier and rows whose GEOID
/// repeats an earlier one.
///
/// A valid GEOID wins over the separate state and county columns; when it
/// is absent or malformed the GEOID is composed from them. Returns
/// `(dropped_unidentified, duplicates)`.
///
/// # Errors
///
/// Returns [`DatasetError::MissingIdentifiers`] if the table has neither a
/// GEOID column nor both state and county columns.
pub fn normalize_identifiers(table: &mut Table) -> Result<(usize, usize), DatasetError> {
    let has_geo = table.has_column(schema::GEO_ID);
    let has_parts = table.has_column(schema::STATE_FIPS) && table.has_column(schema::COUNTY_FIPS);
    if !has_geo && !has_parts {
        return Err(DatasetError::MissingIdentifiers);
    }

    let state_col = table.ensure_column(schema::STATE_FIPS);
    let county_col = table.ensure_column(schema::COUNTY_FIPS);
    let geo_col = table.ensure_column(schema::GEO_ID);

    let mut seen = BTreeSet::new();
    let mut dropped = 0;
    let mut duplicates = 0;
    let mut keep = Vec::with_capacity(table.len());

    for index in 0..table.len() {
        let cell = |col| table.cell(index, col).unwrap_or("");
        let geo = normalize_geo_id(cell(geo_col))
            .filter(|g| split_geo_id(g).is_some())
            .or_else(|| {
                let state = state_code(cell(state_col))?;
                let county = normalize_county_fips(cell(county_col))?;
                Some(format!("{state}{county}"))
            });

        let Some(geo) = geo else {
            dropped += 1;
            keep.push(None);
            continue;
        };
        if !seen.insert(geo.clone()) {
            duplicates += 1;
            keep.push(None);
            continue;
        }
        keep.push(Some(geo));
    }

    let mut rows = Vec::with_capacity(table.len());
    for (index, geo) in keep.into_iter().enumerate() {
        let Some(geo) = geo else { continue };
        let Some((state, county)) = split_geo_id(&geo) else { continue };
        let mut row = table.row(index).map(<[String]>::to_vec).unwrap_or_default();
        row[state_col] = state.to_string();
        row[county_col] = county.to_string();
        row[geo_col] = geo.clone();
        rows.push(row);
    }

    let headers = table.headers().to_vec();
    *table = Table::new(headers);
    for row in rows {
        table.push_row(row);
    }

    if dropped > 0 {
        log::warn!("Dropped {dropped} row(s) without a usable county identifier");
    }
    if duplicates > 0 {
        log::warn!("Dropped {duplicates} row(s) with a repeated GEOID (kept the first)");
    }
    Ok((dropped, duplicates))
}

/// Coerces every present numeric column in place.
///
/// Numbers are rewritten in plain form, null tokens become empty cells and
/// values that fail to parse are blanked and counted.
pub fn coerce_numeric_columns(table: &mut Table, columns: &[&str]) -> BTreeMap<String, usize> {
    let mut failures = BTreeMap::new();
    for &name in columns {
        let Some(col) = table.column_index(name) else {
            continue;
        };
        let mut failed = 0;
        for row in 0..table.len() {
            let replacement = match coerce(table.cell(row, col).unwrap_or("")) {
                Coerced::Number(value) => format_number(value),
                Coerced::Missing => String::new(),
                Coerced::Invalid => {
                    failed += 1;
                    String::new()
                }
            };
            // Row and column both come from the table's own bounds.
            let _ = table.set_cell(row, col, replacement);
        }
        if failed > 0 {
            log::warn!("Column {name}: {failed} non-numeric value(s) cleared");
            failures.insert(name.to_string(), failed);
        }
    }
    failures
}

/// Rewrites the gap flag as `true`/`false` and lower-cases `unknown` band
/// sentinels.
fn normalize_flags(table: &mut Table) {
    if let Some(col) = table.column_index(schema::GAP_FLAG) {
        for row in 0..table.len() {
            let flag = schema::parse_gap_flag(table.cell(row, col).unwrap_or(""));
            let _ = table.set_cell(row, col, flag.to_string());
        }
    }
    for name in [schema::DISTANCE_BAND, schema::TRAVEL_TIME_BAND] {
        let Some(col) = table.column_index(name) else {
            continue;
        };
        for row in 0..table.len() {
            if table.cell(row, col).is_some_and(|c| c.trim().eq_ignore_ascii_case("unknown")) {
                let _ = table.set_cell(row, col, "unknown");
            }
        }
    }
}

/// Normalizes a raw coverage table onto [`schema::COVERAGE_COLUMNS`].
///
/// Every canonical column is present afterwards (empty when the input had
/// no counterpart), canonical columns come first in canonical order, and
/// any extra input columns follow unchanged.
///
/// # Errors
///
/// Returns [`DatasetError::MissingIdentifiers`] if no identifier columns
/// can be found.
pub fn normalize_coverage(mut table: Table) -> Result<(Table, NormalizeReport), DatasetError> {
    let renamed = rename_aliases(&mut table, schema::ALIASES);
    for (from, to) in &renamed {
        log::debug!("Renamed column {from} -> {to}");
    }

    let (dropped_unidentified, duplicates) = normalize_identifiers(&mut table)?;
    let coercion_failures = coerce_numeric_columns(&mut table, schema::NUMERIC_COLUMNS);
    normalize_flags(&mut table);

    for column in schema::COVERAGE_COLUMNS {
        table.ensure_column(column);
    }
    table.reorder_columns(schema::COVERAGE_COLUMNS);

    Ok((
        table,
        NormalizeReport {
            renamed,
            dropped_unidentified,
            duplicates,
            coercion_failures,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> Table {
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn renames_historical_variants() {
        let (out, report) = normalize_coverage(table(
            "STATEFP,COUNTYFP,ctyname,great_circle_mi,band_miles,flags\n1,1,Autauga,120.5,<=150,\n",
        ))
        .unwrap();
        assert_eq!(&out.headers()[..super::schema::COVERAGE_COLUMNS.len()], super::schema::COVERAGE_COLUMNS);
        assert_eq!(out.get(0, "state_fips"), Some("01"));
        assert_eq!(out.get(0, "county_fips"), Some("001"));
        assert_eq!(out.get(0, "geo_id"), Some("01001"));
        assert_eq!(out.get(0, "county_name"), Some("Autauga"));
        assert_eq!(out.get(0, "great_circle_distance_miles"), Some("120.5"));
        assert_eq!(out.get(0, "gap_flag"), Some("false"));
        assert!(report.renamed.contains(&("STATEFP".to_string(), "state_fips".to_string())));
    }

    #[test]
    fn identifiers_are_fixed_width_for_every_variant() {
        for csv in [
            "GEOID,lat,lon\n1001,32.5,-86.6\n",
            "fips,lat,lon\n01001.0,32.5,-86.6\n",
            "state,county_fips,lat,lon\nAL,1,32.5,-86.6\n",
            "state_fips,county_fips,lat,lon\n01,01001,32.5,-86.6\n",
        ] {
            let (out, _) = normalize_coverage(table(csv)).unwrap();
            assert_eq!(out.get(0, "geo_id"), Some("01001"), "{csv}");
            assert_eq!(out.get(0, "state_fips"), Some("01"), "{csv}");
            assert_eq!(out.get(0, "county_fips"), Some("001"), "{csv}");
        }
    }

    #[test]
    fn drops_unidentifiable_and_duplicate_rows() {
        let (out, report) =
            normalize_coverage(table("geo_id,county_name\n01001,A\n,B\n1001,C\nxx,D\n")).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.get(0, "county_name"), Some("A"));
        assert_eq!(report.dropped_unidentified, 2);
        assert_eq!(report.duplicates, 1);
    }

    #[test]
    fn counts_coercion_failures() {
        let (out, report) = normalize_coverage(table(
            "geo_id,lat,lon,population_at_risk_mid\n01001,abc,-86.6,NA\n01003,30.1,,8.50\n",
        ))
        .unwrap();
        assert_eq!(report.coercion_failures.get("latitude"), Some(&1));
        assert!(!report.coercion_failures.contains_key("population_at_risk_mid"));
        assert_eq!(out.get(0, "latitude"), Some(""));
        assert_eq!(out.get(0, "population_at_risk_mid"), Some(""));
        assert_eq!(out.get(1, "population_at_risk_mid"), Some("8.5"));
    }

    #[test]
    fn fails_without_identifier_columns() {
        assert!(matches!(
            normalize_coverage(table("name,lat\nA,1\n")),
            Err(DatasetError::MissingIdentifiers)
        ));
    }

    #[test]
    fn canonical_column_is_preferred_over_variants() {
        let mut t = table("lat,Latitude\n1,2\n");
        let renamed = rename_aliases(&mut t, schema::ALIASES);
        assert_eq!(renamed, vec![("Latitude".to_string(), "latitude".to_string())]);
        assert_eq!(t.headers(), ["lat", "latitude"]);
    }

    #[test]
    fn unknown_band_is_lower_cased() {
        let (out, _) = normalize_coverage(table("geo_id,band_miles\n01001,Unknown\n")).unwrap();
        assert_eq!(out.get(0, "distance_band"), Some("unknown"));
    }
}
