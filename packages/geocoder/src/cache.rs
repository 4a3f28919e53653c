//! Persistent geocode cache.
//!
//! Caches both hits and misses so that re-running the pipeline never asks
//! the provider the same question twice. Transport failures are never
//! stored; they get another chance on the next run.
//!
//! Stored as a three-column CSV (`query`, `latitude`, `longitude`). A miss
//! has empty coordinate cells.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use care_access_geography_models::Coordinate;
use serde::{Deserialize, Serialize};

use crate::GeocodeError;

#[derive(Debug, Serialize, Deserialize)]
struct CacheRow {
    query: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// Query to coordinate-or-miss map, optionally backed by a file.
#[derive(Debug, Clone, Default)]
pub struct GeocodeCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, Option<Coordinate>>,
    dirty: bool,
}

impl GeocodeCache {
    /// An empty cache that is never written anywhere.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the cache at `path`. A missing file yields an empty cache
    /// that will be created on [`Self::save`].
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the file exists but cannot be read.
    pub fn load(path: &Path) -> Result<Self, GeocodeError> {
        let mut cache = Self {
            path: Some(path.to_path_buf()),
            ..Self::default()
        };
        if !path.exists() {
            return Ok(cache);
        }

        let mut reader = csv::Reader::from_path(path)?;
        for row in reader.deserialize() {
            let row: CacheRow = row?;
            let coordinate = Coordinate::from_parts(row.latitude, row.longitude);
            cache.entries.insert(normalize_query(&row.query), coordinate);
        }
        log::debug!("Loaded {} geocode cache entries from {}", cache.len(), path.display());
        Ok(cache)
    }

    /// Cached answer for `query`: `Some(Some(_))` a hit, `Some(None)` a
    /// known miss, `None` never asked.
    #[must_use]
    pub fn get(&self, query: &str) -> Option<Option<Coordinate>> {
        self.entries.get(&normalize_query(query)).copied()
    }

    /// Records the provider's answer for `query`.
    pub fn insert(&mut self, query: &str, coordinate: Option<Coordinate>) {
        self.entries.insert(normalize_query(query), coordinate);
        self.dirty = true;
    }

    /// Number of cached queries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the cache back to its file if anything changed.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the file cannot be written.
    pub fn save(&mut self) -> Result<(), GeocodeError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(path)?;
        for (query, coordinate) in &self.entries {
            writer.serialize(CacheRow {
                query: query.clone(),
                latitude: coordinate.map(|c| c.latitude),
                longitude: coordinate.map(|c| c.longitude),
            })?;
        }
        writer.flush()?;
        self.dirty = false;
        log::debug!("Saved {} geocode cache entries to {}", self.len(), path.display());
        Ok(())
    }
}

/// Collapses whitespace and case so trivially different spellings of the
/// same query share an entry.
fn normalize_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_hits_and_misses() {
        let mut cache = GeocodeCache::in_memory();
        assert_eq!(cache.get("a"), None);
        cache.insert("a", Some(Coordinate::new(1.0, 2.0)));
        cache.insert("b", None);
        assert_eq!(cache.get("a"), Some(Some(Coordinate::new(1.0, 2.0))));
        assert_eq!(cache.get("b"), Some(None));
    }

    #[test]
    fn queries_match_ignoring_case_and_spacing() {
        let mut cache = GeocodeCache::in_memory();
        cache.insert("Billings Clinic,  Billings, MT, USA", None);
        assert_eq!(cache.get("billings clinic, Billings, MT, USA"), Some(None));
    }

    #[test]
    fn persists_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared/geocode_cache.csv");

        let mut cache = GeocodeCache::load(&path).unwrap();
        assert!(cache.is_empty());
        cache.insert("hit", Some(Coordinate::new(41.5, -81.7)));
        cache.insert("miss", None);
        cache.save().unwrap();

        let reloaded = GeocodeCache::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("hit"), Some(Some(Coordinate::new(41.5, -81.7))));
        assert_eq!(reloaded.get("miss"), Some(None));
    }

    #[test]
    fn in_memory_cache_never_writes() {
        let mut cache = GeocodeCache::in_memory();
        cache.insert("a", None);
        cache.save().unwrap();
    }
}
