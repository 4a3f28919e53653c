//! Geocoding service configuration.
//!
//! The default Nominatim service definition is embedded at compile time
//! from `services/nominatim.toml`. A deployment pointing at its own
//! Nominatim instance supplies a TOML file of the same shape.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::GeocodeError;

/// A geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier (e.g., `"nominatim"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether geocoding is active. A disabled service resolves nothing.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Search endpoint (e.g., `"https://nominatim.openstreetmap.org/search"`).
    pub base_url: String,
    /// `User-Agent` header; the public Nominatim instance requires one
    /// that identifies the application.
    pub user_agent: String,
    /// Comma-separated ISO country codes to restrict matches to.
    #[serde(default)]
    pub country_codes: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Minimum delay between requests in milliseconds.
    #[serde(default)]
    pub rate_limit_ms: u64,
}

const fn default_true() -> bool {
    true
}

const fn default_timeout_secs() -> u64 {
    10
}

impl GeocodingService {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Minimum spacing between requests as a [`Duration`].
    #[must_use]
    pub const fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    /// Parses a service definition from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Config`] if the TOML is malformed.
    pub fn from_toml_str(text: &str) -> Result<Self, GeocodeError> {
        Ok(toml::de::from_str(text)?)
    }

    /// Reads a service definition from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, GeocodeError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}

const NOMINATIM_TOML: &str = include_str!("../services/nominatim.toml");

/// Returns the embedded Nominatim service definition.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (this is a compile-time
/// guarantee since the config is embedded and covered by tests).
#[must_use]
pub fn nominatim() -> GeocodingService {
    GeocodingService::from_toml_str(NOMINATIM_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse embedded geocoding service 'nominatim': {e}"))
}

/// Returns the service at `path`, or the embedded default when `path` is
/// `None`.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the override cannot be read or parsed.
pub fn resolve_service(path: Option<&Path>) -> Result<GeocodingService, GeocodeError> {
    path.map_or_else(|| Ok(nominatim()), GeocodingService::load)
}
