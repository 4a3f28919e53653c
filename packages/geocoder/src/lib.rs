#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate resolution for counties and care centers.
//!
//! Free-text geocoding sits behind the [`Geocoder`] trait so the resolver
//! can be driven by Nominatim in production and by in-memory fakes in
//! tests. The [`resolver`] module layers the geocoder between a precise
//! centroid table and the static state-centroid table:
//!
//! 1. **Existing** coordinates on the record.
//! 2. **Lookup** in a GEOID-keyed centroid table.
//! 3. **Geocoded** via [`Geocoder`], memoized per run and cached on disk.
//! 4. **Regional** state centroid.
//! 5. **Default** geographic center of the United States.
//!
//! Which tiers apply is a per-entity [`resolver::FallbackPolicy`].

pub mod cache;
pub mod nominatim;
pub mod progress;
pub mod resolver;
pub mod service_registry;

use async_trait::async_trait;
use care_access_geography_models::Coordinate;
use thiserror::Error;

/// A successful geocoding match.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeHit {
    /// Matched coordinate.
    pub coordinate: Coordinate,
    /// The provider's display name for the match, if any.
    pub display_name: Option<String>,
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed (including timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Geocoder returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Service configuration could not be parsed.
    #[error("Invalid service configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Geocode cache I/O failed.
    #[error("Geocode cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Geocode cache CSV failed.
    #[error("Geocode cache CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Resolves a free-text query to a coordinate.
///
/// `Ok(None)` means the provider answered and found nothing; `Err` means
/// the call itself failed. Callers that only need a coordinate may treat
/// both as "no result".
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Looks up a single free-text query.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request or response handling fails.
    async fn geocode(&self, query: &str) -> Result<Option<GeocodeHit>, GeocodeError>;
}
