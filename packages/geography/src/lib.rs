#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! County centroid reference tables.
//!
//! A centroid table maps a five-digit county GEOID to a representative
//! coordinate. Population-weighted centroids are preferred when the source
//! carries them; geographic centroids fill in per row otherwise. Tables
//! come from a local CSV or from a remote CSV fetched over HTTP.

pub mod centroids;

pub use centroids::{CentroidStats, CentroidTable, DEFAULT_CENTROID_URL};

use thiserror::Error;

/// Errors that can occur while loading a centroid table.
#[derive(Debug, Error)]
pub enum CentroidError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote server answered with a non-success status.
    #[error("Centroid download returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The CSV could not be read.
    #[error("Dataset error: {0}")]
    Dataset(#[from] care_access_dataset::DatasetError),

    /// No identifier column could be found.
    #[error("Centroid table has no GEOID or state/county columns")]
    MissingIdColumn,

    /// No usable latitude/longitude column pair could be found.
    #[error("Could not infer latitude/longitude columns from centroid table")]
    MissingCoordinateColumns,
}
