//! Nominatim / `OpenStreetMap` geocoder client.
//!
//! The public instance allows **1 request per second**; the client waits
//! out the configured `rate_limit_ms` between consecutive requests, so a
//! single instance can be shared by every caller in a run.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use std::time::Duration;

use async_trait::async_trait;
use care_access_geography_models::Coordinate;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::service_registry::GeocodingService;
use crate::{GeocodeError, GeocodeHit, Geocoder};

/// Free-text Nominatim search client.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    country_codes: Option<String>,
    rate_limit: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimGeocoder {
    /// Builds a client from a service definition.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(service: &GeocodingService) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(service.user_agent.as_str())
            .timeout(service.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: service.base_url.clone(),
            country_codes: service.country_codes.clone(),
            rate_limit: service.rate_limit(),
            last_request: Mutex::new(None),
        })
    }

    /// Sleeps until `rate_limit` has passed since the previous request,
    /// then records this request's start time.
    async fn wait_turn(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let ready = previous + self.rate_limit;
            if ready > Instant::now() {
                tokio::time::sleep_until(ready).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodeHit>, GeocodeError> {
        self.wait_turn().await;

        let mut params = vec![("q", query), ("format", "jsonv2"), ("limit", "1")];
        if let Some(codes) = &self.country_codes {
            params.push(("countrycodes", codes.as_str()));
        }

        let resp = self.client.get(&self.base_url).query(&params).send().await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(GeocodeError::Status {
                status: resp.status().as_u16(),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

/// Parses a Nominatim `jsonv2` search response.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodeHit>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing or non-finite lat in Nominatim response".to_string(),
        })?;

    let lon = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing or non-finite lon in Nominatim response".to_string(),
        })?;

    Ok(Some(GeocodeHit {
        coordinate: Coordinate::new(lat, lon),
        display_name: first["display_name"].as_str().map(String::from),
    }))
}
