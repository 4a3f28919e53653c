//! Machine-readable summary of what an edit changed.

use std::collections::{BTreeMap, BTreeSet};

use care_access_dataset::Table;
use serde::{Deserialize, Serialize};

/// Row counts before and after an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    /// Dataset file name.
    pub file: String,
    /// Rows in the original table.
    pub rows_before: usize,
    /// Rows in the edited table.
    pub rows_after: usize,
    /// Rows only in the edited table.
    pub rows_added: usize,
    /// Rows only in the original table.
    pub rows_removed: usize,
    /// Rows present in both whose values differ. Always zero when the
    /// tables have no key column.
    pub rows_modified: usize,
    /// Column(s) rows were matched on, if any.
    pub key: Option<String>,
}

/// Key columns tried in order; every column of a candidate must exist in
/// both tables.
const KEY_CANDIDATES: &[&[&str]] = &[&["geo_id"], &["state_fips", "county_fips"], &["center_id"]];

impl ChangeSummary {
    /// Compares `edited` against `original`.
    ///
    /// Rows are matched by the first key candidate both tables carry and
    /// compared on the union of their columns. Without a key, rows are
    /// compared as whole-row multisets.
    #[must_use]
    pub fn compute(file: &str, original: &Table, edited: &Table) -> Self {
        let columns = column_union(original, edited);
        let key = KEY_CANDIDATES
            .iter()
            .find(|candidate| candidate.iter().all(|c| original.has_column(c) && edited.has_column(c)));

        let (rows_added, rows_removed, rows_modified) = match key {
            Some(key) => keyed_diff(original, edited, key, &columns),
            None => multiset_diff(original, edited, &columns),
        };

        Self {
            file: file.to_string(),
            rows_before: original.len(),
            rows_after: edited.len(),
            rows_added,
            rows_removed,
            rows_modified,
            key: key.map(|k| k.join("+")),
        }
    }

    /// Whether the edit changed anything.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows_added == 0 && self.rows_removed == 0 && self.rows_modified == 0
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn column_union(original: &Table, edited: &Table) -> Vec<String> {
    let mut seen = BTreeSet::new();
    original
        .headers()
        .iter()
        .chain(edited.headers())
        .filter(|h| seen.insert(h.as_str()))
        .cloned()
        .collect()
}

/// A row's values over `columns`, blank where the table lacks the column.
fn aligned(table: &Table, row: usize, columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .map(|c| table.get(row, c).unwrap_or("").to_string())
        .collect()
}

fn row_key(table: &Table, row: usize, key: &[&str]) -> String {
    key.iter()
        .map(|c| table.get(row, c).unwrap_or("").trim())
        .collect::<Vec<_>>()
        .join("\u{1f}")
}

fn keyed_diff(original: &Table, edited: &Table, key: &[&str], columns: &[String]) -> (usize, usize, usize) {
    let mut before: BTreeMap<String, usize> = BTreeMap::new();
    for row in 0..original.len() {
        before.entry(row_key(original, row, key)).or_insert(row);
    }

    let mut matched = BTreeSet::new();
    let (mut added, mut modified) = (0, 0);
    for row in 0..edited.len() {
        let k = row_key(edited, row, key);
        match before.get(&k) {
            Some(&old) if matched.insert(k.clone()) => {
                if aligned(original, old, columns) != aligned(edited, row, columns) {
                    modified += 1;
                }
            }
            _ => added += 1,
        }
    }
    let removed = original.len() - matched.len().min(original.len());
    (added, removed, modified)
}

fn multiset_diff(original: &Table, edited: &Table, columns: &[String]) -> (usize, usize, usize) {
    let mut remaining: BTreeMap<Vec<String>, usize> = BTreeMap::new();
    for row in 0..original.len() {
        *remaining.entry(aligned(original, row, columns)).or_default() += 1;
    }

    let mut added = 0;
    for row in 0..edited.len() {
        match remaining.get_mut(&aligned(edited, row, columns)) {
            Some(count) if *count > 0 => *count -= 1,
            _ => added += 1,
        }
    }
    let removed = remaining.values().sum();
    (added, removed, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> Table {
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn keyed_by_geo_id() {
        let original = table("geo_id,distance_band\n01001,<=150\n01003,>300\n01005,150_300\n");
        let edited = table("geo_id,distance_band\n01001,<=150\n01003,150_300\n06037,<=150\n");

        let summary = ChangeSummary::compute("county_coverage.csv", &original, &edited);

        assert_eq!(summary.rows_before, 3);
        assert_eq!(summary.rows_after, 3);
        assert_eq!(summary.rows_added, 1);
        assert_eq!(summary.rows_removed, 1);
        assert_eq!(summary.rows_modified, 1);
        assert_eq!(summary.key.as_deref(), Some("geo_id"));
    }

    #[test]
    fn falls_back_to_state_and_county() {
        let original = table("state_fips,county_fips,n\n01,001,1\n01,003,2\n");
        let edited = table("state_fips,county_fips,n\n01,003,2\n01,001,9\n");

        let summary = ChangeSummary::compute("model.csv", &original, &edited);

        assert_eq!(summary.key.as_deref(), Some("state_fips+county_fips"));
        assert_eq!(summary.rows_modified, 1);
        assert_eq!(summary.rows_added + summary.rows_removed, 0);
    }

    #[test]
    fn added_column_counts_as_modification() {
        let original = table("center_id,name\nCTR001,A\n");
        let edited = table("center_id,name,phone\nCTR001,A,555-0100\n");
        let summary = ChangeSummary::compute("centers.csv", &original, &edited);
        assert_eq!(summary.rows_modified, 1);
    }

    #[test]
    fn unkeyed_tables_compare_as_multisets() {
        let original = table("a,b\n1,2\n1,2\n3,4\n");
        let edited = table("a,b\n3,4\n1,2\n5,6\n");

        let summary = ChangeSummary::compute("other.csv", &original, &edited);

        assert_eq!(summary.key, None);
        assert_eq!(summary.rows_added, 1);
        assert_eq!(summary.rows_removed, 1);
        assert_eq!(summary.rows_modified, 0);
    }

    #[test]
    fn identical_tables_are_empty() {
        let original = table("geo_id\n01001\n");
        let summary = ChangeSummary::compute("x.csv", &original, &original.clone());
        assert!(summary.is_empty());
        assert!(summary.to_json_pretty().unwrap().contains("\"rows_modified\": 0"));
    }
}
