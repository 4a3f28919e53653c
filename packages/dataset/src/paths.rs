#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the pipeline's data directory.
//!
//! Everything lives under a single `data/` directory, which defaults to
//! `<workspace root>/data` and can be moved with the `CARE_ACCESS_DATA_DIR`
//! environment variable.

use std::path::{Path, PathBuf};

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "CARE_ACCESS_DATA_DIR";

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`; falls back to the
/// manifest directory itself if the expected ancestors are missing.
#[must_use]
pub fn project_root() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.ancestors().nth(2).unwrap_or(manifest).to_path_buf()
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV).map_or_else(|| project_root().join("data"), PathBuf::from)
}

/// Returns the `data/raw/` directory for untouched inputs.
#[must_use]
pub fn raw_dir() -> PathBuf {
    data_dir().join("raw")
}

/// Returns the `data/lookup/` directory for reference tables.
#[must_use]
pub fn lookup_dir() -> PathBuf {
    data_dir().join("lookup")
}

/// Returns the `data/final/` directory for published pipeline outputs.
#[must_use]
pub fn final_dir() -> PathBuf {
    data_dir().join("final")
}

/// Returns the `data/derived/` directory for cached artifacts.
#[must_use]
pub fn derived_dir() -> PathBuf {
    data_dir().join("derived")
}

/// Returns the `data/shared/` directory for caches shared across runs.
#[must_use]
pub fn shared_dir() -> PathBuf {
    data_dir().join("shared")
}

/// County model table (population-at-risk estimates).
#[must_use]
pub fn county_model_path() -> PathBuf {
    final_dir().join("county_model.csv")
}

/// Resolved care-center table.
#[must_use]
pub fn centers_path() -> PathBuf {
    final_dir().join("centers.csv")
}

/// Per-county coverage table.
#[must_use]
pub fn coverage_path() -> PathBuf {
    final_dir().join("county_coverage.csv")
}

/// Gap-county table.
#[must_use]
pub fn gap_path() -> PathBuf {
    final_dir().join("gap_counties.csv")
}

/// Optional local county centroid reference table.
#[must_use]
pub fn county_centroids_path() -> PathBuf {
    lookup_dir().join("county_centroids.csv")
}

/// Enriched coverage artifact, rewritten on every load.
#[must_use]
pub fn enriched_coverage_path() -> PathBuf {
    derived_dir().join("coverage_with_coords.csv")
}

/// Persistent geocode cache.
#[must_use]
pub fn geocode_cache_path() -> PathBuf {
    shared_dir().join("geocode_cache.csv")
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Ensures the parent directory of `path` exists.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outputs_live_under_final_dir() {
        for path in [county_model_path(), centers_path(), coverage_path(), gap_path()] {
            assert!(path.starts_with(final_dir()), "{}", path.display());
        }
        assert!(enriched_coverage_path().starts_with(derived_dir()));
    }

    #[test]
    fn ensure_parent_creates_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/file.csv");
        ensure_parent(&nested).unwrap();
        assert!(dir.path().join("a/b").is_dir());
        ensure_parent(Path::new("bare.csv")).unwrap();
    }
}
