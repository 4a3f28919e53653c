#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Population-at-risk estimation.
//!
//! Raw county population (four five-year male age bands, 5 through 24) is
//! turned into low/mid/high estimates by bracketing two independent
//! prevalence anchors: a registry-derived rate scaled to the target
//! condition, and a diagnosed-rate anchor. See [`estimate::estimate`].

pub mod estimate;
pub mod model;
pub mod params;
pub mod population;

pub use estimate::{AgeBandCounts, PopulationEstimate, estimate};
pub use model::{CountyModelRow, build_county_model};
pub use params::PrevalenceParams;
pub use population::CountyPopulation;

use thiserror::Error;

/// Errors from population ingestion and county modeling.
#[derive(Debug, Error)]
pub enum DemographicsError {
    /// Reading or writing a table failed.
    #[error("Dataset error: {0}")]
    Dataset(#[from] care_access_dataset::DatasetError),

    /// Reading a parameter file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A parameter file is not valid TOML for [`PrevalenceParams`].
    #[error("Invalid prevalence parameters: {0}")]
    Params(#[from] toml::de::Error),

    /// A parameter is negative or not finite.
    #[error("Prevalence parameter {name} must be a non-negative number, got {value}")]
    InvalidParam {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// A required input column is absent.
    #[error("Population table is missing a {0} column")]
    MissingColumn(&'static str),
}
