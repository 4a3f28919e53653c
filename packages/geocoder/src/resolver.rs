//! The coordinate fallback chain.
//!
//! Resolution never fails: every problem (missing lookup entry, geocoder
//! miss, network error) degrades to the next tier, and the last enabled
//! tier either answers or the entity stays unresolved.

use std::collections::BTreeMap;

pub use care_access_geography_models::ResolutionSource;
use care_access_geography_models::{CentroidLookup, Coordinate, fips};
use serde::{Deserialize, Serialize};

use crate::Geocoder;
use crate::cache::GeocodeCache;

/// A resolved coordinate and the tier it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// The coordinate.
    pub coordinate: Coordinate,
    /// Where it came from.
    pub source: ResolutionSource,
}

/// Which tiers beyond "existing" an entity may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    /// Consult the GEOID-keyed centroid table.
    pub lookup: bool,
    /// Call the free-text geocoder.
    pub geocode: bool,
    /// Fall back to the region's centroid.
    pub regional: bool,
    /// Fall back to the national center.
    pub default: bool,
}

impl FallbackPolicy {
    /// Counties: existing coordinate or centroid table only, so an
    /// unresolvable county stays unresolved.
    pub const COUNTY: Self = Self {
        lookup: true,
        geocode: false,
        regional: false,
        default: false,
    };

    /// Counties, additionally allowed to fall back to their state centroid.
    pub const COUNTY_WITH_STATE_FALLBACK: Self = Self {
        lookup: true,
        geocode: false,
        regional: true,
        default: false,
    };

    /// Care centers: the whole chain, so a center always ends up with a
    /// coordinate.
    pub const CENTER: Self = Self {
        lookup: false,
        geocode: true,
        regional: true,
        default: true,
    };

    /// Care centers without network access.
    pub const CENTER_OFFLINE: Self = Self {
        lookup: false,
        geocode: false,
        regional: true,
        default: true,
    };
}

/// What is known about an entity before resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveRequest<'a> {
    /// Coordinate already on the record.
    pub existing: Option<Coordinate>,
    /// Canonical five-digit GEOID, for the lookup tier.
    pub geo_id: Option<&'a str>,
    /// Free-text query, for the geocode tier.
    pub query: Option<&'a str>,
    /// State FIPS code or postal abbreviation, for the regional tier.
    pub region_code: Option<&'a str>,
}

/// Per-tier counters for one resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    /// Resolved from an existing coordinate.
    pub existing: usize,
    /// Resolved from the centroid table.
    pub lookup: usize,
    /// Resolved by the geocoder (fresh, cached, or memoized).
    pub geocoded: usize,
    /// Resolved from a state centroid.
    pub regional: usize,
    /// Resolved to the national center.
    pub default: usize,
    /// Left unresolved.
    pub unresolved: usize,
    /// Requests actually sent to the geocoder.
    pub geocoder_calls: usize,
    /// Geocoder answers with no match.
    pub geocoder_misses: usize,
    /// Geocoder calls that failed.
    pub geocoder_errors: usize,
    /// Queries answered from the persistent cache.
    pub cache_hits: usize,
}

impl ResolverStats {
    fn record(&mut self, source: Option<ResolutionSource>) {
        match source {
            Some(ResolutionSource::Existing) => self.existing += 1,
            Some(ResolutionSource::Lookup) => self.lookup += 1,
            Some(ResolutionSource::Geocoded) => self.geocoded += 1,
            Some(ResolutionSource::Regional) => self.regional += 1,
            Some(ResolutionSource::Default) => self.default += 1,
            None => self.unresolved += 1,
        }
    }
}

/// Runs the fallback chain, holding the per-run query memo and the
/// persistent geocode cache.
pub struct CoordinateResolver<'a> {
    lookup: Option<&'a dyn CentroidLookup>,
    geocoder: Option<&'a dyn Geocoder>,
    cache: GeocodeCache,
    memo: BTreeMap<String, Option<Coordinate>>,
    stats: ResolverStats,
}

impl<'a> CoordinateResolver<'a> {
    /// A resolver with no centroid table, no geocoder, and an in-memory
    /// cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lookup: None,
            geocoder: None,
            cache: GeocodeCache::in_memory(),
            memo: BTreeMap::new(),
            stats: ResolverStats::default(),
        }
    }

    /// Sets the GEOID-keyed centroid table.
    #[must_use]
    pub fn with_lookup(mut self, lookup: &'a dyn CentroidLookup) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Sets the free-text geocoder.
    #[must_use]
    pub fn with_geocoder(mut self, geocoder: &'a dyn Geocoder) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// Replaces the geocode cache.
    #[must_use]
    pub fn with_cache(mut self, cache: GeocodeCache) -> Self {
        self.cache = cache;
        self
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> ResolverStats {
        self.stats
    }

    /// The geocode cache, including entries added during this run.
    pub const fn cache_mut(&mut self) -> &mut GeocodeCache {
        &mut self.cache
    }

    /// Resolves one entity, trying each tier `policy` allows in order and
    /// stopping at the first that answers.
    pub async fn resolve(
        &mut self,
        request: &ResolveRequest<'_>,
        policy: FallbackPolicy,
    ) -> Option<Resolution> {
        let resolution = self.resolve_inner(request, policy).await;
        self.stats.record(resolution.map(|r| r.source));
        if resolution.is_none() {
            log::debug!(
                "Unresolved entity (geo_id={:?}, query={:?})",
                request.geo_id,
                request.query
            );
        }
        resolution
    }

    async fn resolve_inner(
        &mut self,
        request: &ResolveRequest<'_>,
        policy: FallbackPolicy,
    ) -> Option<Resolution> {
        let found = |coordinate: Coordinate, source| Resolution { coordinate, source };

        if let Some(existing) = request.existing.filter(|c| c.latitude.is_finite() && c.longitude.is_finite()) {
            return Some(found(existing, ResolutionSource::Existing));
        }

        if policy.lookup
            && let (Some(lookup), Some(geo_id)) = (self.lookup, request.geo_id)
            && let Some(centroid) = lookup.centroid(geo_id)
        {
            return Some(found(centroid, ResolutionSource::Lookup));
        }

        if policy.geocode
            && let Some(query) = request.query
            && let Some(coordinate) = self.geocode(query).await
        {
            return Some(found(coordinate, ResolutionSource::Geocoded));
        }

        if policy.regional
            && let Some(centroid) = request.region_code.and_then(fips::region_centroid)
        {
            return Some(found(centroid, ResolutionSource::Regional));
        }

        policy
            .default
            .then(|| found(fips::US_CENTER, ResolutionSource::Default))
    }

    /// Asks the memo, then the persistent cache, then the geocoder. Each
    /// distinct query reaches the geocoder at most once per resolver.
    async fn geocode(&mut self, query: &str) -> Option<Coordinate> {
        if let Some(known) = self.memo.get(query) {
            return *known;
        }

        if let Some(cached) = self.cache.get(query) {
            self.stats.cache_hits += 1;
            self.memo.insert(query.to_string(), cached);
            return cached;
        }

        let geocoder = self.geocoder?;
        self.stats.geocoder_calls += 1;
        let answer = match geocoder.geocode(query).await {
            Ok(Some(hit)) => {
                self.cache.insert(query, Some(hit.coordinate));
                Some(hit.coordinate)
            }
            Ok(None) => {
                self.stats.geocoder_misses += 1;
                log::debug!("No geocoding match for {query:?}");
                self.cache.insert(query, None);
                None
            }
            Err(e) => {
                self.stats.geocoder_errors += 1;
                log::warn!("Geocoding failed for {query:?}: {e}");
                None
            }
        };
        self.memo.insert(query.to_string(), answer);
        answer
    }
}

impl Default for CoordinateResolver<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::{GeocodeError, GeocodeHit};

    /// Answers from a fixed table and records every query it receives.
    #[derive(Default)]
    struct FakeGeocoder {
        answers: BTreeMap<String, Coordinate>,
        failing: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeGeocoder {
        fn with(query: &str, coordinate: Coordinate) -> Self {
            let mut fake = Self::default();
            fake.answers.insert(query.to_string(), coordinate);
            fake
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn geocode(&self, query: &str) -> Result<Option<GeocodeHit>, GeocodeError> {
            self.calls.lock().unwrap().push(query.to_string());
            if self.failing.iter().any(|q| q == query) {
                return Err(GeocodeError::RateLimited);
            }
            Ok(self.answers.get(query).map(|&coordinate| GeocodeHit {
                coordinate,
                display_name: None,
            }))
        }
    }

    fn lookup() -> BTreeMap<String, Coordinate> {
        BTreeMap::from([("01001".to_string(), Coordinate::new(32.5, -86.6))])
    }

    #[tokio::test]
    async fn existing_coordinate_wins_over_lookup() {
        let table = lookup();
        let mut resolver = CoordinateResolver::new().with_lookup(&table);
        let request = ResolveRequest {
            existing: Some(Coordinate::new(1.0, 2.0)),
            geo_id: Some("01001"),
            ..ResolveRequest::default()
        };
        let resolution = resolver.resolve(&request, FallbackPolicy::COUNTY).await.unwrap();
        assert_eq!(resolution.source, ResolutionSource::Existing);
        assert_eq!(resolution.coordinate, Coordinate::new(1.0, 2.0));
    }

    #[tokio::test]
    async fn county_uses_lookup_then_stays_unresolved() {
        let table = lookup();
        let mut resolver = CoordinateResolver::new().with_lookup(&table);

        let hit = ResolveRequest {
            geo_id: Some("01001"),
            region_code: Some("01"),
            ..ResolveRequest::default()
        };
        let miss = ResolveRequest {
            geo_id: Some("01003"),
            region_code: Some("01"),
            ..ResolveRequest::default()
        };

        let resolution = resolver.resolve(&hit, FallbackPolicy::COUNTY).await.unwrap();
        assert_eq!(resolution.source, ResolutionSource::Lookup);
        assert!(resolver.resolve(&miss, FallbackPolicy::COUNTY).await.is_none());

        let stats = resolver.stats();
        assert_eq!(stats.lookup, 1);
        assert_eq!(stats.unresolved, 1);
    }

    #[tokio::test]
    async fn county_state_fallback_is_opt_in() {
        let mut resolver = CoordinateResolver::new();
        let request = ResolveRequest {
            geo_id: Some("48201"),
            region_code: Some("48"),
            ..ResolveRequest::default()
        };
        let resolution = resolver
            .resolve(&request, FallbackPolicy::COUNTY_WITH_STATE_FALLBACK)
            .await
            .unwrap();
        assert_eq!(resolution.source, ResolutionSource::Regional);
        assert_eq!(Some(resolution.coordinate), fips::region_centroid("TX"));
    }

    #[tokio::test]
    async fn center_falls_through_every_tier() {
        let geocoder = FakeGeocoder::with("Found, City, OH, USA", Coordinate::new(41.0, -81.5));
        let mut resolver = CoordinateResolver::new().with_geocoder(&geocoder);

        let geocoded = ResolveRequest {
            query: Some("Found, City, OH, USA"),
            region_code: Some("OH"),
            ..ResolveRequest::default()
        };
        let regional = ResolveRequest {
            query: Some("Lost, City, OH, USA"),
            region_code: Some("OH"),
            ..ResolveRequest::default()
        };
        let national = ResolveRequest {
            query: Some("Lost, Nowhere, ZZ, USA"),
            region_code: Some("ZZ"),
            ..ResolveRequest::default()
        };

        let sources = [
            resolver.resolve(&geocoded, FallbackPolicy::CENTER).await.unwrap().source,
            resolver.resolve(&regional, FallbackPolicy::CENTER).await.unwrap().source,
            resolver.resolve(&national, FallbackPolicy::CENTER).await.unwrap().source,
        ];
        assert_eq!(
            sources,
            [
                ResolutionSource::Geocoded,
                ResolutionSource::Regional,
                ResolutionSource::Default
            ]
        );
        assert_eq!(
            resolver.resolve(&national, FallbackPolicy::CENTER).await.unwrap().coordinate,
            fips::US_CENTER
        );
    }

    #[tokio::test]
    async fn each_query_reaches_the_geocoder_once() {
        let mut geocoder = FakeGeocoder::with("A", Coordinate::new(1.0, 1.0));
        geocoder.failing.push("C".to_string());
        let mut resolver = CoordinateResolver::new().with_geocoder(&geocoder);

        for query in ["A", "B", "C", "A", "B", "C"] {
            let request = ResolveRequest {
                query: Some(query),
                ..ResolveRequest::default()
            };
            resolver.resolve(&request, FallbackPolicy::CENTER).await;
        }

        assert_eq!(geocoder.calls(), ["A", "B", "C"]);
        let stats = resolver.stats();
        assert_eq!(stats.geocoder_calls, 3);
        assert_eq!(stats.geocoder_misses, 1);
        assert_eq!(stats.geocoder_errors, 1);
        assert_eq!(stats.geocoded, 2);
        assert_eq!(stats.default, 4);
    }

    #[tokio::test]
    async fn persistent_cache_skips_the_geocoder_and_omits_failures() {
        let mut geocoder = FakeGeocoder::with("A", Coordinate::new(1.0, 1.0));
        geocoder.failing.push("C".to_string());
        let mut cache = GeocodeCache::in_memory();
        cache.insert("B", Some(Coordinate::new(2.0, 2.0)));

        let mut resolver = CoordinateResolver::new().with_geocoder(&geocoder).with_cache(cache);
        for query in ["A", "B", "C"] {
            let request = ResolveRequest {
                query: Some(query),
                ..ResolveRequest::default()
            };
            resolver.resolve(&request, FallbackPolicy::CENTER).await;
        }

        assert_eq!(geocoder.calls(), ["A", "C"]);
        assert_eq!(resolver.stats().cache_hits, 1);
        let cache = resolver.cache_mut();
        assert_eq!(cache.get("A"), Some(Some(Coordinate::new(1.0, 1.0))));
        assert_eq!(cache.get("C"), None);
    }

    #[tokio::test]
    async fn nothing_enabled_means_unresolved() {
        let mut resolver = CoordinateResolver::default();
        let request = ResolveRequest {
            geo_id: Some("01001"),
            query: Some("x"),
            region_code: Some("AL"),
            ..ResolveRequest::default()
        };
        assert!(resolver.resolve(&request, FallbackPolicy::COUNTY).await.is_none());
    }
}
