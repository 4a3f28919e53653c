#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Nearest-center coverage for every county.
//!
//! The pipeline runs in three steps, each to completion before the next:
//!
//! 1. [`resolve`] gives care centers and counties their coordinates
//!    through the geocoder crate's fallback chain.
//! 2. [`engine`] scans every center for every resolved county, keeps the
//!    nearest one, and classifies distance and travel time into bands.
//! 3. [`summary`] condenses the result for logging, and [`output`] writes
//!    the coverage and gap-county tables.

pub mod engine;
pub mod output;
pub mod resolve;
pub mod summary;

use care_access_dataset::DatasetError;
use care_access_geocoder::GeocodeError;
use thiserror::Error;

pub use engine::{ASSUMED_SPEED_MPH, compute_coverage, gap_counties, travel_minutes};
pub use summary::CoverageSummary;

/// Errors from reading or writing coverage tables.
#[derive(Debug, Error)]
pub enum CoverageError {
    /// Reading, parsing or writing a table failed.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Loading or saving the geocode cache failed.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
}
