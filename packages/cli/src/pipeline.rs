//! The county model, care-center, coverage and load stages.
//!
//! Each stage reads its inputs from the canonical paths in
//! [`care_access_dataset::paths`] (or an explicit input file) and writes
//! its output tables there, so stages can be run one at a time or chained
//! with [`run`].

use std::path::{Path, PathBuf};
use std::time::Instant;

use care_access_cli_utils::{IndicatifProgress, MultiProgress};
use care_access_coverage::output::{write_centers, write_coverage};
use care_access_coverage::resolve::{read_centers, read_counties, resolve_centers, resolve_counties};
use care_access_coverage::{CoverageSummary, compute_coverage};
use care_access_coverage_models::CareCenter;
use care_access_dataset::{Table, load_or_empty, paths};
use care_access_demographics::population::{read_bridged_race, read_tidy};
use care_access_demographics::{PrevalenceParams, build_county_model, model::write_county_model};
use care_access_geocoder::cache::GeocodeCache;
use care_access_geocoder::nominatim::NominatimGeocoder;
use care_access_geocoder::resolver::{CoordinateResolver, FallbackPolicy};
use care_access_geocoder::service_registry::resolve_service;
use care_access_geography::{CentroidTable, DEFAULT_CENTROID_URL};
use care_access_geography_models::CentroidLookup;

/// How many gap counties the coverage summary lists.
const TOP_GAPS: usize = 10;

/// Arguments of the `run` subcommand.
pub struct RunOptions {
    pub population: PathBuf,
    pub centers: PathBuf,
    pub bridged_race: bool,
    pub params: Option<PathBuf>,
    pub no_geocode: bool,
    pub geocoder_config: Option<PathBuf>,
    pub centroids: Option<String>,
    pub state_fallback: bool,
}

/// Builds and writes the county model. Returns the number of counties.
///
/// # Errors
///
/// Returns an error if the population table or parameter file cannot be
/// read, or the model cannot be written.
pub fn model(population: &Path, bridged_race: bool, params: Option<&Path>) -> Result<usize, Box<dyn std::error::Error>> {
    let params = params.map_or_else(|| Ok(PrevalenceParams::default()), PrevalenceParams::load)?;

    let table = Table::read(population)?;
    let populations = if bridged_race {
        read_bridged_race(&table)?
    } else {
        read_tidy(&table)?
    };
    log::info!("Read population for {} counties from {}", populations.len(), population.display());

    let run_date = chrono::Utc::now().date_naive();
    let (rows, _duplicates) = build_county_model(&populations, &params, run_date);
    write_county_model(&rows, &paths::county_model_path())?;
    Ok(rows.len())
}

/// Resolves care-center coordinates and writes the centers table.
///
/// The persistent geocode cache is loaded first and saved afterwards; a
/// cache that cannot be saved is logged and otherwise ignored.
///
/// # Errors
///
/// Returns an error if the input cannot be read, the geocoder cannot be
/// configured, or the centers table cannot be written.
pub async fn centers(
    multi: &MultiProgress,
    input: &Path,
    no_geocode: bool,
    geocoder_config: Option<&Path>,
) -> Result<Vec<CareCenter>, Box<dyn std::error::Error>> {
    let inputs = read_centers(&Table::read(input)?)?;
    log::info!("Read {} care centers from {}", inputs.len(), input.display());

    let geocoder = if no_geocode {
        None
    } else {
        Some(NominatimGeocoder::new(&resolve_service(geocoder_config)?)?)
    };
    let policy = if no_geocode {
        FallbackPolicy::CENTER_OFFLINE
    } else {
        FallbackPolicy::CENTER
    };

    let mut resolver = CoordinateResolver::new().with_cache(GeocodeCache::load(&paths::geocode_cache_path())?);
    if let Some(geocoder) = &geocoder {
        resolver = resolver.with_geocoder(geocoder);
    }

    let progress = IndicatifProgress::resolve_bar(multi, "Resolving care centers");
    let centers = resolve_centers(&inputs, &mut resolver, policy, &progress).await;

    if let Err(e) = resolver.cache_mut().save() {
        log::warn!("Failed to save geocode cache: {e}");
    }

    write_centers(&centers, &paths::centers_path())?;
    Ok(centers)
}

/// Loads the county centroid table from `source`, or from the local lookup
/// table, or from the public county-centers dataset.
///
/// A table that cannot be loaded is logged and treated as absent.
async fn load_centroids(source: Option<&str>) -> Option<CentroidTable> {
    let local = paths::county_centroids_path();
    let source = match source {
        Some(source) => source.to_string(),
        None if local.exists() => local.to_string_lossy().into_owned(),
        None => DEFAULT_CENTROID_URL.to_string(),
    };

    match CentroidTable::from_source(&source).await {
        Ok(table) => {
            log::info!("Loaded {} county centroids from {source}", table.len());
            Some(table)
        }
        Err(e) => {
            log::warn!("County centroids unavailable from {source}: {e}");
            None
        }
    }
}

/// Resolves county coordinates, computes coverage, writes the coverage and
/// gap tables, and logs the summary.
///
/// # Errors
///
/// Returns an error if the county model or centers table cannot be read,
/// or the output tables cannot be written.
pub async fn coverage(
    multi: &MultiProgress,
    centroids: Option<&str>,
    state_fallback: bool,
) -> Result<CoverageSummary, Box<dyn std::error::Error>> {
    let mut counties = read_counties(&Table::read(&paths::county_model_path())?)?;
    let centers: Vec<CareCenter> = Table::read(&paths::centers_path())?.to_records()?;
    log::info!("Computing coverage for {} counties and {} care centers", counties.len(), centers.len());

    let table = load_centroids(centroids).await;
    let policy = if state_fallback {
        FallbackPolicy::COUNTY_WITH_STATE_FALLBACK
    } else {
        FallbackPolicy::COUNTY
    };

    let mut resolver = CoordinateResolver::new();
    if let Some(table) = &table {
        resolver = resolver.with_lookup(table);
    }
    let progress = IndicatifProgress::resolve_bar(multi, "Resolving county coordinates");
    resolve_counties(&mut counties, &mut resolver, policy, &progress).await;

    let records = compute_coverage(&counties, &centers);
    write_coverage(&records, &paths::coverage_path(), &paths::gap_path())?;

    let summary = CoverageSummary::build(&records, &centers, TOP_GAPS);
    summary.log();
    Ok(summary)
}

/// Runs the model, centers and coverage stages in order.
///
/// # Errors
///
/// Returns the first stage error; later stages do not run.
pub async fn run(multi: &MultiProgress, options: &RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let stages = IndicatifProgress::stages_bar(multi, "Pipeline", 3);

    stages.set_message("County model".to_string());
    model(&options.population, options.bridged_race, options.params.as_deref())?;
    stages.inc(1);

    stages.set_message("Care centers".to_string());
    centers(multi, &options.centers, options.no_geocode, options.geocoder_config.as_deref()).await?;
    stages.inc(1);

    stages.set_message("Coverage".to_string());
    let summary = coverage(multi, options.centroids.as_deref(), options.state_fallback).await?;
    stages.inc(1);

    stages.finish(format!(
        "{} counties, {} gap counties in {:.1}s",
        summary.counties,
        summary.gap_counties,
        start.elapsed().as_secs_f64()
    ));
    Ok(())
}

/// Loads a coverage table, writes the enriched cache and prints the load
/// report as JSON.
///
/// # Errors
///
/// Returns an error only if the report cannot be printed; a failed load is
/// reported in the printed JSON.
pub async fn load(source: Option<PathBuf>, centroids: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let source = source.unwrap_or_else(paths::coverage_path);
    let table = load_centroids(centroids).await;
    let lookup = table.as_ref().map(|t| t as &dyn CentroidLookup);

    let (_table, report) = load_or_empty(&source, lookup, &paths::enriched_coverage_path());
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
