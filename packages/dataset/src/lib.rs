#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tabular IO, canonical paths, and coverage-table normalization.
//!
//! Every dataset the pipeline touches is a header-addressed CSV held as a
//! [`table::Table`] of strings. The [`normalize`] module maps the historical
//! column layouts onto one canonical schema and [`loader`] turns a raw
//! coverage file into that schema, backfilling coordinates and caching the
//! enriched result.

pub mod coerce;
pub mod loader;
pub mod normalize;
pub mod paths;
pub mod schema;
pub mod table;

use std::path::PathBuf;

pub use loader::{LoadReport, load_coverage_table, load_or_empty};
pub use table::Table;

/// Errors that can occur while reading, writing, or reshaping tables.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A source file could not be opened.
    #[error("Failed to open {}: {source}", path.display())]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// CSV parse or write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The input had no usable header row.
    #[error("Table has no header row")]
    EmptyHeader,

    /// A named column does not exist.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// A cell position is outside the table.
    #[error("Cell ({row}, {col}) is out of range for a table of width {width}")]
    OutOfRange {
        /// Row index.
        row: usize,
        /// Column index.
        col: usize,
        /// Number of columns.
        width: usize,
    },

    /// Neither identifier column group could be found.
    #[error("Table has no county identifier columns (expected a GEOID or state and county codes)")]
    MissingIdentifiers,
}
