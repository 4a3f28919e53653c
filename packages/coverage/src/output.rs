//! Writers for the resolved-centers, coverage and gap-county tables.

use std::path::Path;

use care_access_coverage_models::{CareCenter, CoverageRecord};
use care_access_dataset::Table;
use care_access_dataset::schema::COVERAGE_COLUMNS;

use crate::CoverageError;
use crate::engine::gap_counties;

/// Column order of the resolved care-center table.
pub const CENTER_COLUMNS: &[&str] = &[
    "center_id",
    "name",
    "parent_organization",
    "city",
    "region_code",
    "certification_year",
    "latitude",
    "longitude",
    "coordinate_source",
    "phone",
    "website",
];

/// Builds the coverage table in canonical column order.
///
/// # Errors
///
/// Returns [`CoverageError::Dataset`] if serialization fails.
pub fn coverage_table(records: &[CoverageRecord]) -> Result<Table, CoverageError> {
    Ok(Table::from_records(records, COVERAGE_COLUMNS)?)
}

/// Writes the resolved care centers.
///
/// # Errors
///
/// Returns [`CoverageError::Dataset`] if serialization or writing fails.
pub fn write_centers(centers: &[CareCenter], path: &Path) -> Result<(), CoverageError> {
    Table::from_records(centers, CENTER_COLUMNS)?.write(path)?;
    log::info!("Wrote {} care centers to {}", centers.len(), path.display());
    Ok(())
}

/// Writes the full coverage table and the gap-county table.
///
/// Returns the number of gap counties.
///
/// # Errors
///
/// Returns [`CoverageError::Dataset`] if serialization or writing fails.
pub fn write_coverage(
    records: &[CoverageRecord],
    coverage_path: &Path,
    gap_path: &Path,
) -> Result<usize, CoverageError> {
    coverage_table(records)?.write(coverage_path)?;
    log::info!("Wrote coverage for {} counties to {}", records.len(), coverage_path.display());

    let gaps = gap_counties(records);
    coverage_table(&gaps)?.write(gap_path)?;
    log::info!("Wrote {} gap counties to {}", gaps.len(), gap_path.display());
    Ok(gaps.len())
}

#[cfg(test)]
mod tests {
    use care_access_coverage_models::CountyRecord;
    use care_access_geography_models::{Coordinate, ResolutionSource};
    use care_access_spatial::DistanceBand;

    use super::*;
    use crate::engine::compute_coverage;

    fn county(geo_id: &str, coordinate: Option<Coordinate>, mid: f64) -> CountyRecord {
        let mut record = CountyRecord {
            state_fips: geo_id[..2].to_string(),
            county_fips: geo_id[2..].to_string(),
            geo_id: geo_id.to_string(),
            county_name: format!("County {geo_id}"),
            population_at_risk_low: 0.0,
            population_at_risk_mid: mid,
            population_at_risk_high: 0.0,
            latitude: None,
            longitude: None,
        };
        record.set_coordinate(coordinate);
        record
    }

    fn center() -> CareCenter {
        CareCenter {
            center_id: CareCenter::make_id(1),
            name: "Denver Health".to_string(),
            parent_organization: "Denver Health".to_string(),
            city: "Denver".to_string(),
            region_code: "CO".to_string(),
            certification_year: Some(2019),
            latitude: 39.7392,
            longitude: -104.9903,
            coordinate_source: ResolutionSource::Geocoded,
            phone: None,
            website: None,
        }
    }

    #[test]
    fn writes_both_tables_in_canonical_order() {
        let dir = tempfile::tempdir().unwrap();
        let coverage_path = dir.path().join("final/county_coverage.csv");
        let gap_path = dir.path().join("final/gap_counties.csv");
        let counties = [
            county("08031", Some(Coordinate::new(39.76, -104.88)), 4.0),
            county("17031", Some(Coordinate::new(41.84, -87.82)), 50.0),
            county("02013", None, 0.5),
        ];
        let records = compute_coverage(&counties, &[center()]);

        let gaps = write_coverage(&records, &coverage_path, &gap_path).unwrap();
        assert_eq!(gaps, 1);

        let coverage = Table::read(&coverage_path).unwrap();
        assert_eq!(coverage.headers(), COVERAGE_COLUMNS);
        assert_eq!(coverage.len(), 3);
        assert_eq!(coverage.get(0, "distance_band"), Some("<=150"));
        assert_eq!(coverage.get(0, "nearest_center_id"), Some("CTR001"));
        assert_eq!(coverage.get(1, "distance_band"), Some(">300"));
        assert_eq!(coverage.get(1, "gap_flag"), Some("true"));
        assert_eq!(coverage.get(2, "distance_band"), Some("unknown"));
        assert_eq!(coverage.get(2, "nearest_center_id"), Some(""));

        let gap_table = Table::read(&gap_path).unwrap();
        assert_eq!(gap_table.len(), 1);
        assert_eq!(gap_table.get(0, "geo_id"), Some("17031"));

        let back: Vec<CoverageRecord> = coverage.to_records().unwrap();
        assert_eq!(back[1].distance_band, DistanceBand::Beyond300);
    }

    #[test]
    fn empty_gap_table_keeps_headers() {
        let dir = tempfile::tempdir().unwrap();
        let gap_path = dir.path().join("gaps.csv");
        let records = compute_coverage(&[county("08031", Some(Coordinate::new(39.76, -104.88)), 1.0)], &[center()]);

        write_coverage(&records, &dir.path().join("coverage.csv"), &gap_path).unwrap();

        let gap_table = Table::read(&gap_path).unwrap();
        assert!(gap_table.is_empty());
        assert_eq!(gap_table.headers(), COVERAGE_COLUMNS);
    }

    #[test]
    fn centers_table_records_the_tier() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("centers.csv");
        write_centers(&[center()], &path).unwrap();

        let table = Table::read(&path).unwrap();
        assert_eq!(table.headers(), CENTER_COLUMNS);
        assert_eq!(table.get(0, "coordinate_source"), Some("geocoded"));
        let back: Vec<CareCenter> = table.to_records().unwrap();
        assert_eq!(back, [center()]);
    }
}
