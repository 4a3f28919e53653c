//! Loads county centroid reference tables.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::Path;
use std::time::Duration;

use care_access_dataset::Table;
use care_access_dataset::coerce::parse_number;
use care_access_geography_models::{CentroidLookup, Coordinate, geo_id, normalize_geo_id};

use crate::CentroidError;

/// Public county-centers dataset with 2010 population-weighted
/// (`pclat10`/`pclon10`) and geographic (`clat10`/`clon10`) centroids.
pub const DEFAULT_CENTROID_URL: &str =
    "https://raw.githubusercontent.com/btskinner/spatial/master/data/county_centers.csv";

const USER_AGENT: &str = "care-access-coverage/0.1 (+https://github.com/care-access/care-access-coverage)";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const ID_COLUMNS: &[&str] = &["geo_id", "geoid", "fips", "county_geoid"];
const STATE_COLUMNS: &[&str] = &["state_fips", "statefp", "state"];
const COUNTY_COLUMNS: &[&str] = &["county_fips", "countyfp", "county"];

/// Latitude columns, most preferred first. Population-weighted centroids
/// come before geographic ones.
const LAT_COLUMNS: &[&str] = &[
    "pclat10",
    "pclat",
    "centroid_lat",
    "intptlat",
    "latitude",
    "lat",
    "lat_dd",
    "clat10",
    "clat",
];

/// Longitude columns, paired index-for-index with [`LAT_COLUMNS`].
const LON_COLUMNS: &[&str] = &[
    "pclon10",
    "pclon",
    "centroid_lon",
    "intptlong",
    "longitude",
    "lon",
    "lon_dd",
    "clon10",
    "clon",
];

/// Counters from building a centroid table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CentroidStats {
    /// Data rows read.
    pub rows: usize,
    /// Rows stored in the table.
    pub loaded: usize,
    /// Rows that used a lower-preference coordinate pair.
    pub fell_back: usize,
    /// Rows without a usable identifier.
    pub bad_id: usize,
    /// Rows with no numeric coordinate pair.
    pub no_coordinate: usize,
}

/// GEOID to centroid lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CentroidTable {
    centroids: BTreeMap<String, Coordinate>,
    stats: CentroidStats,
}

impl CentroidTable {
    /// Builds a table from parsed CSV.
    ///
    /// The identifier is a GEOID-like column or a state + county column
    /// pair. Every recognized latitude/longitude column pair is tried per
    /// row in preference order, so a blank population-weighted centroid
    /// falls back to the geographic one. The first row for a GEOID wins.
    ///
    /// # Errors
    ///
    /// Returns [`CentroidError::MissingIdColumn`] or
    /// [`CentroidError::MissingCoordinateColumns`] if the columns cannot
    /// be inferred.
    pub fn from_table(table: &Table) -> Result<Self, CentroidError> {
        enum Id {
            Combined(usize),
            Parts(usize, usize),
        }

        let id = match table.find_column(ID_COLUMNS) {
            Some(col) => Id::Combined(col),
            None => match (table.find_column(STATE_COLUMNS), table.find_column(COUNTY_COLUMNS)) {
                (Some(state), Some(county)) => Id::Parts(state, county),
                _ => return Err(CentroidError::MissingIdColumn),
            },
        };

        let pairs: Vec<(usize, usize)> = LAT_COLUMNS
            .iter()
            .zip(LON_COLUMNS)
            .filter_map(|(lat, lon)| Some((table.find_column(&[*lat])?, table.find_column(&[*lon])?)))
            .collect();
        if pairs.is_empty() {
            return Err(CentroidError::MissingCoordinateColumns);
        }

        let mut centroids = BTreeMap::new();
        let mut stats = CentroidStats {
            rows: table.len(),
            ..CentroidStats::default()
        };

        for row in 0..table.len() {
            let cell = |col| table.cell(row, col).unwrap_or("");
            let key = match id {
                Id::Combined(col) => normalize_geo_id(cell(col)),
                Id::Parts(state, county) => geo_id(cell(state), cell(county)),
            };
            let Some(key) = key else {
                stats.bad_id += 1;
                continue;
            };

            let found = pairs.iter().enumerate().find_map(|(rank, &(lat, lon))| {
                Coordinate::from_parts(parse_number(cell(lat)), parse_number(cell(lon)))
                    .map(|coordinate| (rank, coordinate))
            });
            let Some((rank, coordinate)) = found else {
                stats.no_coordinate += 1;
                continue;
            };
            if rank > 0 {
                stats.fell_back += 1;
            }
            if let Entry::Vacant(entry) = centroids.entry(key) {
                entry.insert(coordinate);
                stats.loaded += 1;
            }
        }

        log::info!(
            "Centroid table: {} of {} rows loaded ({} geographic fallback, {} bad id, {} without coordinates)",
            stats.loaded,
            stats.rows,
            stats.fell_back,
            stats.bad_id,
            stats.no_coordinate,
        );

        Ok(Self { centroids, stats })
    }

    /// Loads a table from a local CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`CentroidError`] if the file cannot be read or its columns
    /// cannot be inferred.
    pub fn load(path: &Path) -> Result<Self, CentroidError> {
        Self::from_table(&Table::read(path)?)
    }

    /// Downloads and parses a remote CSV.
    ///
    /// # Errors
    ///
    /// Returns [`CentroidError`] on network failure, a non-success status,
    /// or unparseable content.
    pub async fn fetch(url: &str) -> Result<Self, CentroidError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        log::info!("Downloading county centroids from {url}");
        let resp = client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(CentroidError::Status {
                status: resp.status().as_u16(),
            });
        }
        let body = resp.bytes().await?;
        Self::from_table(&Table::from_reader(body.as_ref())?)
    }

    /// Loads from `source`, which is either an `http(s)://` URL or a local
    /// path.
    ///
    /// # Errors
    ///
    /// Returns [`CentroidError`] from [`Self::fetch`] or [`Self::load`].
    pub async fn from_source(source: &str) -> Result<Self, CentroidError> {
        if source.starts_with("http://") || source.starts_with("https://") {
            Self::fetch(source).await
        } else {
            Self::load(Path::new(source))
        }
    }

    /// Number of counties in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    /// Build counters.
    #[must_use]
    pub const fn stats(&self) -> CentroidStats {
        self.stats
    }
}

impl CentroidLookup for CentroidTable {
    fn centroid(&self, geo_id: &str) -> Option<Coordinate> {
        self.centroids.get(geo_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTY_CENTERS: &str = "\
fips,clon10,clat10,pclon10,pclat10
1001,-86.64,32.53,-86.49,32.50
01003,-87.74,30.73,,
1005,-85.40,31.87,NA,NA
x,-85.0,31.0,-85.0,31.0
01009,,,,
01001,0,0,0,0
";

    fn table(csv: &str) -> Table {
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn prefers_population_weighted_centroids() {
        let centroids = CentroidTable::from_table(&table(COUNTY_CENTERS)).unwrap();
        assert_eq!(centroids.centroid("01001"), Some(Coordinate::new(32.50, -86.49)));
    }

    #[test]
    fn falls_back_to_geographic_centroid_per_row() {
        let centroids = CentroidTable::from_table(&table(COUNTY_CENTERS)).unwrap();
        assert_eq!(centroids.centroid("01003"), Some(Coordinate::new(30.73, -87.74)));
        assert_eq!(centroids.centroid("01005"), Some(Coordinate::new(31.87, -85.40)));
        let stats = centroids.stats();
        assert_eq!(stats.rows, 6);
        assert_eq!(stats.loaded, 3);
        assert_eq!(stats.fell_back, 2);
        assert_eq!(stats.bad_id, 1);
        assert_eq!(stats.no_coordinate, 1);
    }

    #[test]
    fn accepts_state_and_county_columns() {
        let centroids =
            CentroidTable::from_table(&table("STATEFP,COUNTYFP,INTPTLAT,INTPTLONG\n6,37,34.3,-118.2\n")).unwrap();
        assert_eq!(centroids.centroid("06037"), Some(Coordinate::new(34.3, -118.2)));
        assert!(centroids.centroid("06038").is_none());
    }

    #[test]
    fn rejects_tables_without_usable_columns() {
        assert!(matches!(
            CentroidTable::from_table(&table("name,lat,lon\nA,1,2\n")),
            Err(CentroidError::MissingIdColumn)
        ));
        assert!(matches!(
            CentroidTable::from_table(&table("geoid,x,y\n01001,1,2\n")),
            Err(CentroidError::MissingCoordinateColumns)
        ));
    }

    #[test]
    fn loads_from_local_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("county_centroids.csv");
        std::fs::write(&path, COUNTY_CENTERS).unwrap();
        let centroids = CentroidTable::load(&path).unwrap();
        assert_eq!(centroids.len(), 3);
    }

    #[tokio::test]
    async fn fetches_remote_csv() {
        let server = httpmock::MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/county_centers.csv");
                then.status(200).body(COUNTY_CENTERS);
            })
            .await;

        let centroids = CentroidTable::from_source(&server.url("/county_centers.csv"))
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(centroids.len(), 3);
    }

    #[tokio::test]
    async fn reports_http_failures() {
        let server = httpmock::MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET);
                then.status(404);
            })
            .await;

        let result = CentroidTable::fetch(&server.url("/missing.csv")).await;
        assert!(matches!(result, Err(CentroidError::Status { status: 404 })));
    }
}
