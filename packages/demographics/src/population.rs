//! County population ingestion.
//!
//! Two input shapes are accepted:
//!
//! * a **tidy** table with one row per county and one column per age band
//!   (`male_5_9`, `male_10_14`, `male_15_19`, `male_20_24`);
//! * the **bridged-race** extract with one row per county, age group and
//!   reference year (`state`, `county`, `ctyname`, `agegrp`, `yearref`,
//!   `tot_male`). Age groups 3 through 6 are the 5-9 through 20-24 bands;
//!   counts are averaged across reference years and rounded to whole
//!   persons.

use std::collections::BTreeMap;

use care_access_dataset::Table;
use care_access_dataset::coerce::{Coerced, coerce};
use care_access_geography_models::{geo_id, normalize_geo_id, split_geo_id};
use serde::{Deserialize, Serialize};

use crate::DemographicsError;
use crate::estimate::AgeBandCounts;

/// Age-band column names, in band order.
pub const AGE_BAND_COLUMNS: [&str; 4] = ["male_5_9", "male_10_14", "male_15_19", "male_20_24"];

const GEO_ID_COLUMNS: &[&str] = &["geo_id", "geoid", "fips"];
const STATE_COLUMNS: &[&str] = &["state_fips", "statefp", "state_code", "state"];
const COUNTY_COLUMNS: &[&str] = &["county_fips", "countyfp", "county_code", "county"];
const NAME_COLUMNS: &[&str] = &["county_name", "ctyname", "name"];

/// One county's raw population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyPopulation {
    /// Two-digit state FIPS code.
    pub state_fips: String,
    /// Three-digit county FIPS code.
    pub county_fips: String,
    /// Five-digit GEOID.
    pub geo_id: String,
    /// County display name.
    pub county_name: String,
    /// Male population by age band.
    pub counts: AgeBandCounts,
}

impl CountyPopulation {
    fn new(geo_id: String, county_name: String, counts: AgeBandCounts) -> Option<Self> {
        let (state, county) = split_geo_id(&geo_id)?;
        Some(Self {
            state_fips: state.to_string(),
            county_fips: county.to_string(),
            county_name,
            counts,
            geo_id,
        })
    }
}

/// Reads a count cell. Missing, non-numeric and negative values are zero;
/// the second element reports whether the cell was present but unusable.
fn count_cell(cell: &str) -> (f64, bool) {
    match coerce(cell) {
        Coerced::Number(value) if value >= 0.0 => (value, false),
        Coerced::Number(_) | Coerced::Invalid => (0.0, true),
        Coerced::Missing => (0.0, false),
    }
}

/// Locates the county identifier of each row: a GEOID column, or state
/// and county code columns.
struct IdColumns {
    geo_id: Option<usize>,
    parts: Option<(usize, usize)>,
}

impl IdColumns {
    fn find(table: &Table) -> Result<Self, DemographicsError> {
        let geo_id = table.find_column(GEO_ID_COLUMNS);
        let parts = table
            .find_column(STATE_COLUMNS)
            .zip(table.find_column(COUNTY_COLUMNS));
        if geo_id.is_none() && parts.is_none() {
            return Err(DemographicsError::MissingColumn("state/county FIPS"));
        }
        Ok(Self { geo_id, parts })
    }

    fn geo_id(&self, table: &Table, row: usize) -> Option<String> {
        let cell = |col| table.cell(row, col).unwrap_or("");
        self.geo_id
            .and_then(|col| normalize_geo_id(cell(col)))
            .or_else(|| {
                let (state, county) = self.parts?;
                geo_id(cell(state), cell(county))
            })
    }
}

/// Reads a tidy county population table.
///
/// Rows without a usable identifier are skipped. Missing age-band columns
/// count as zero.
///
/// # Errors
///
/// Returns [`DemographicsError::MissingColumn`] if no identifier columns
/// exist.
pub fn read_tidy(table: &Table) -> Result<Vec<CountyPopulation>, DemographicsError> {
    let ids = IdColumns::find(table)?;
    let name_col = table.find_column(NAME_COLUMNS);
    let band_cols = AGE_BAND_COLUMNS.map(|name| table.find_column(&[name]));
    for (name, col) in AGE_BAND_COLUMNS.iter().zip(&band_cols) {
        if col.is_none() {
            log::warn!("Population table has no {name} column; treating it as zero");
        }
    }

    let mut out = Vec::with_capacity(table.len());
    let mut skipped = 0;
    let mut bad_counts = 0;

    for row in 0..table.len() {
        let Some(geo) = ids.geo_id(table, row) else {
            skipped += 1;
            continue;
        };
        let mut band = |index: usize| {
            let cell = band_cols[index].and_then(|col| table.cell(row, col)).unwrap_or("");
            let (value, bad) = count_cell(cell);
            bad_counts += usize::from(bad);
            value
        };
        let counts = AgeBandCounts {
            male_5_9: band(0),
            male_10_14: band(1),
            male_15_19: band(2),
            male_20_24: band(3),
        };
        let name = name_col
            .and_then(|col| table.cell(row, col))
            .unwrap_or("")
            .trim()
            .to_string();
        if let Some(population) = CountyPopulation::new(geo, name, counts) {
            out.push(population);
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} population row(s) without a usable county identifier");
    }
    if bad_counts > 0 {
        log::warn!("{bad_counts} negative or non-numeric population count(s) treated as zero");
    }
    log::info!("Read population for {} counties", out.len());
    Ok(out)
}

/// Running sum and count for one county and age group.
#[derive(Default)]
struct Mean {
    sum: f64,
    count: u32,
}

impl Mean {
    fn value(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / f64::from(self.count)
        }
    }
}

/// Aggregates the bridged-race population extract.
///
/// Counties come out sorted by GEOID. An age group with no rows for a
/// county is zero.
///
/// # Errors
///
/// Returns [`DemographicsError::MissingColumn`] if the identifier,
/// `agegrp` or `tot_male` columns are absent.
pub fn read_bridged_race(table: &Table) -> Result<Vec<CountyPopulation>, DemographicsError> {
    let ids = IdColumns::find(table)?;
    let name_col = table.find_column(NAME_COLUMNS);
    let age_col = table
        .find_column(&["agegrp"])
        .ok_or(DemographicsError::MissingColumn("agegrp"))?;
    let male_col = table
        .find_column(&["tot_male"])
        .ok_or(DemographicsError::MissingColumn("tot_male"))?;

    let mut counties: BTreeMap<String, (String, [Mean; 4])> = BTreeMap::new();
    let mut skipped = 0;

    for row in 0..table.len() {
        let band = match table.cell(row, age_col).map(str::trim) {
            Some("3" | "3.0") => 0,
            Some("4" | "4.0") => 1,
            Some("5" | "5.0") => 2,
            Some("6" | "6.0") => 3,
            _ => continue,
        };
        let Some(geo) = ids.geo_id(table, row) else {
            skipped += 1;
            continue;
        };
        let (count, _) = count_cell(table.cell(row, male_col).unwrap_or(""));

        let entry = counties.entry(geo).or_insert_with(|| {
            let name = name_col
                .and_then(|col| table.cell(row, col))
                .unwrap_or("")
                .trim()
                .to_string();
            (name, Default::default())
        });
        entry.1[band].sum += count;
        entry.1[band].count += 1;
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} bridged-race row(s) without a usable county identifier");
    }

    let out: Vec<CountyPopulation> = counties
        .into_iter()
        .filter_map(|(geo, (name, means))| {
            let [a, b, c, d] = means.map(|m| m.value().round());
            CountyPopulation::new(
                geo,
                name,
                AgeBandCounts {
                    male_5_9: a,
                    male_10_14: b,
                    male_15_19: c,
                    male_20_24: d,
                },
            )
        })
        .collect();
    log::info!("Aggregated bridged-race population for {} counties", out.len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> Table {
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn reads_tidy_table() {
        let populations = read_tidy(&table(
            "state_fips,county_fips,county_name,male_5_9,male_10_14,male_15_19,male_20_24\n\
             1,1,Autauga County,1000,1100,-5,abc\n\
             ,,Nowhere,1,1,1,1\n",
        ))
        .unwrap();
        assert_eq!(populations.len(), 1);
        let autauga = &populations[0];
        assert_eq!(autauga.geo_id, "01001");
        assert_eq!(autauga.state_fips, "01");
        assert_eq!(autauga.county_fips, "001");
        assert_eq!(autauga.county_name, "Autauga County");
        assert!((autauga.counts.total() - 2100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn tidy_table_requires_identifiers() {
        assert!(matches!(
            read_tidy(&table("name,male_5_9\nA,1\n")),
            Err(DemographicsError::MissingColumn(_))
        ));
    }

    #[test]
    fn averages_bridged_race_years_per_band() {
        let populations = read_bridged_race(&table(
            "state,county,stname,ctyname,agegrp,yearref,tot_male\n\
             6,37,California,Los Angeles County,3,2014,100\n\
             6,37,California,Los Angeles County,3,2015,103\n\
             6,37,California,Los Angeles County,4,2014,50\n\
             6,37,California,Los Angeles County,6,2014,7\n\
             6,37,California,Los Angeles County,2,2014,9999\n\
             1,1,Alabama,Autauga County,5,2014,20\n",
        ))
        .unwrap();

        assert_eq!(populations.len(), 2);
        assert_eq!(populations[0].geo_id, "01001");
        assert!((populations[0].counts.male_15_19 - 20.0).abs() < f64::EPSILON);

        let la = &populations[1];
        assert_eq!(la.geo_id, "06037");
        assert_eq!(la.county_name, "Los Angeles County");
        assert!((la.counts.male_5_9 - 102.0).abs() < f64::EPSILON);
        assert!((la.counts.male_10_14 - 50.0).abs() < f64::EPSILON);
        assert!(la.counts.male_15_19.abs() < f64::EPSILON);
        assert!((la.counts.male_20_24 - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bridged_race_requires_age_columns() {
        assert!(matches!(
            read_bridged_race(&table("state,county,tot_male\n1,1,5\n")),
            Err(DemographicsError::MissingColumn("agegrp"))
        ));
    }
}
