//! Coordinate resolution passes over care centers and counties.

use std::sync::Arc;

use care_access_coverage_models::{CareCenter, CenterInput, CountyRecord};
use care_access_dataset::Table;
use care_access_geocoder::progress::ProgressCallback;
use care_access_geocoder::resolver::{CoordinateResolver, FallbackPolicy, ResolveRequest};

use crate::CoverageError;

/// Reads the curated care-center list.
///
/// # Errors
///
/// Returns [`CoverageError::Dataset`] if a row does not fit
/// [`CenterInput`].
pub fn read_centers(table: &Table) -> Result<Vec<CenterInput>, CoverageError> {
    let centers: Vec<CenterInput> = table.to_records()?;
    log::info!("Read {} care centers", centers.len());
    Ok(centers)
}

/// Reads counties from the county model table.
///
/// # Errors
///
/// Returns [`CoverageError::Dataset`] if a row does not fit
/// [`CountyRecord`].
pub fn read_counties(table: &Table) -> Result<Vec<CountyRecord>, CoverageError> {
    Ok(table.to_records()?)
}

/// Resolves every care center and assigns sequential ids in input order.
///
/// With a policy that ends at the default tier every center resolves. A
/// center the policy leaves unresolved is dropped with a warning; the ids
/// of the others do not shift.
pub async fn resolve_centers(
    inputs: &[CenterInput],
    resolver: &mut CoordinateResolver<'_>,
    policy: FallbackPolicy,
    progress: &Arc<dyn ProgressCallback>,
) -> Vec<CareCenter> {
    progress.set_total(inputs.len() as u64);
    progress.set_message("Resolving care centers".to_string());

    let mut centers = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        let query = input.geocode_query();
        let region = input.region_code.trim();
        let request = ResolveRequest {
            existing: input.coordinate(),
            geo_id: None,
            query: Some(query.as_str()),
            region_code: (!region.is_empty()).then_some(region),
        };
        let resolution = resolver.resolve(&request, policy).await;
        progress.inc(1);

        let Some(resolution) = resolution else {
            log::warn!("Could not place care center {:?}; leaving it out", input.name);
            continue;
        };
        centers.push(CareCenter {
            center_id: CareCenter::make_id(index + 1),
            name: input.name.trim().to_string(),
            parent_organization: input.parent_organization.trim().to_string(),
            city: input.city.trim().to_string(),
            region_code: region.to_string(),
            certification_year: input.certification_year,
            latitude: resolution.coordinate.latitude,
            longitude: resolution.coordinate.longitude,
            coordinate_source: resolution.source,
            phone: input.phone.clone(),
            website: input.website.clone(),
        });
    }

    let stats = resolver.stats();
    progress.finish(format!("Resolved {} care centers", centers.len()));
    log::info!(
        "Care centers: {} existing, {} geocoded, {} regional, {} default ({} geocoder calls, {} cache hits, {} failures)",
        stats.existing,
        stats.geocoded,
        stats.regional,
        stats.default,
        stats.geocoder_calls,
        stats.cache_hits,
        stats.geocoder_errors,
    );
    centers
}

/// Fills in county coordinates in place. Returns how many counties end up
/// with a coordinate.
///
/// Counties the policy cannot place keep no coordinate and later classify
/// as `unknown`.
pub async fn resolve_counties(
    counties: &mut [CountyRecord],
    resolver: &mut CoordinateResolver<'_>,
    policy: FallbackPolicy,
    progress: &Arc<dyn ProgressCallback>,
) -> usize {
    progress.set_total(counties.len() as u64);
    progress.set_message("Resolving county coordinates".to_string());

    let before = resolver.stats();
    let mut resolved = 0;
    for county in counties.iter_mut() {
        let request = ResolveRequest {
            existing: county.coordinate(),
            geo_id: Some(county.geo_id.as_str()),
            query: None,
            region_code: Some(county.state_fips.as_str()),
        };
        let resolution = resolver.resolve(&request, policy).await;
        county.set_coordinate(resolution.map(|r| r.coordinate));
        resolved += usize::from(resolution.is_some());
        progress.inc(1);
    }

    let after = resolver.stats();
    progress.finish(format!("Resolved {resolved} of {} counties", counties.len()));
    log::info!(
        "Counties: {} existing, {} from centroid table, {} state fallback, {} unresolved",
        after.existing - before.existing,
        after.lookup - before.lookup,
        after.regional - before.regional,
        after.unresolved - before.unresolved,
    );
    resolved
}
