//! Loads a coverage table into the canonical schema and caches the
//! coordinate-enriched result.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use care_access_geography_models::CentroidLookup;
use serde::Serialize;

use crate::coerce::{format_number, parse_number};
use crate::normalize::normalize_coverage;
use crate::{DatasetError, Table, schema};

/// Observability counters for one load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Source file that was read.
    pub source: PathBuf,
    /// Data rows in the source file.
    pub rows_in: usize,
    /// Data rows in the normalized table.
    pub rows_out: usize,
    /// Rows dropped because no identifier could be derived.
    pub dropped_unidentified: usize,
    /// Rows dropped as repeated GEOIDs.
    pub duplicates: usize,
    /// Per-column count of values that failed numeric coercion.
    pub coercion_failures: BTreeMap<String, usize>,
    /// Rows missing latitude or longitude before backfill.
    pub missing_before: usize,
    /// Rows that received at least one coordinate from the centroid table.
    pub backfilled: usize,
    /// Rows still missing latitude or longitude after backfill.
    pub missing_after: usize,
    /// Where the enriched table was written, if it was.
    pub cache_path: Option<PathBuf>,
    /// Why the load failed, when [`load_or_empty`] fell back.
    pub error: Option<String>,
}

/// Returns an empty table with the canonical coverage columns.
#[must_use]
pub fn empty_coverage_table() -> Table {
    Table::new(schema::COVERAGE_COLUMNS.iter().copied())
}

fn missing_coordinates(table: &Table, lat: usize, lon: usize) -> usize {
    (0..table.len())
        .filter(|&row| {
            table.cell(row, lat).and_then(parse_number).is_none()
                || table.cell(row, lon).and_then(parse_number).is_none()
        })
        .count()
}

/// Fills missing `latitude`/`longitude` cells from `centroids`, keyed by
/// `geo_id`. Present values are never overwritten; a row missing only one
/// part receives only that part. Returns the number of rows touched.
pub fn backfill_coordinates(table: &mut Table, centroids: &dyn CentroidLookup) -> usize {
    let lat = table.ensure_column(schema::LATITUDE);
    let lon = table.ensure_column(schema::LONGITUDE);
    let Some(geo) = table.column_index(schema::GEO_ID) else {
        return 0;
    };

    let mut backfilled = 0;
    for row in 0..table.len() {
        let has_lat = table.cell(row, lat).and_then(parse_number).is_some();
        let has_lon = table.cell(row, lon).and_then(parse_number).is_some();
        if has_lat && has_lon {
            continue;
        }
        let Some(centroid) = table.cell(row, geo).and_then(|g| centroids.centroid(g)) else {
            continue;
        };
        if !has_lat {
            let _ = table.set_cell(row, lat, format_number(centroid.latitude));
        }
        if !has_lon {
            let _ = table.set_cell(row, lon, format_number(centroid.longitude));
        }
        backfilled += 1;
    }
    backfilled
}

/// Reads `source`, normalizes it, backfills missing coordinates from
/// `centroids`, and overwrites the enriched artifact at `cache_path`.
///
/// # Errors
///
/// Returns [`DatasetError`] if the source cannot be read or has no
/// identifier columns, or if the cache cannot be written.
pub fn load_coverage_table(
    source: &Path,
    centroids: Option<&dyn CentroidLookup>,
    cache_path: &Path,
) -> Result<(Table, LoadReport), DatasetError> {
    let raw = Table::read(source)?;
    let rows_in = raw.len();
    let (mut table, normalized) = normalize_coverage(raw)?;

    let lat = table.ensure_column(schema::LATITUDE);
    let lon = table.ensure_column(schema::LONGITUDE);
    let missing_before = missing_coordinates(&table, lat, lon);

    let backfilled = match centroids {
        Some(lookup) if missing_before > 0 => backfill_coordinates(&mut table, lookup),
        _ => 0,
    };
    let missing_after = missing_coordinates(&table, lat, lon);

    table.write(cache_path)?;

    let report = LoadReport {
        source: source.to_path_buf(),
        rows_in,
        rows_out: table.len(),
        dropped_unidentified: normalized.dropped_unidentified,
        duplicates: normalized.duplicates,
        coercion_failures: normalized.coercion_failures,
        missing_before,
        backfilled,
        missing_after,
        cache_path: Some(cache_path.to_path_buf()),
        error: None,
    };

    log::info!(
        "Loaded {} ({} -> {} rows, {} backfilled, {} still missing coordinates)",
        source.display(),
        report.rows_in,
        report.rows_out,
        report.backfilled,
        report.missing_after,
    );

    Ok((table, report))
}

/// Like [`load_coverage_table`], but a failed load yields an empty
/// canonical table and a report carrying the error instead of failing.
#[must_use]
pub fn load_or_empty(
    source: &Path,
    centroids: Option<&dyn CentroidLookup>,
    cache_path: &Path,
) -> (Table, LoadReport) {
    match load_coverage_table(source, centroids, cache_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            log::error!("Failed to load {}: {e}", source.display());
            let report = LoadReport {
                source: source.to_path_buf(),
                error: Some(e.to_string()),
                ..LoadReport::default()
            };
            (empty_coverage_table(), report)
        }
    }
}
