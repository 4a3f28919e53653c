//! An in-memory, header-addressed string table.
//!
//! Every cell is kept as the exact text found in the source file. This is
//! the shape the editing workflow operates on and the shape the loader
//! normalizes into; typed records are layered on top via
//! [`Table::from_records`] and [`Table::to_records`].

use std::io;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{DatasetError, paths};

/// A CSV-shaped table of strings with a header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates an empty table with the given headers.
    #[must_use]
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Parses a table from CSV. Header names are trimmed; short rows are
    /// padded with empty cells and long rows truncated to the header width.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Csv`] on malformed CSV and
    /// [`DatasetError::EmptyHeader`] if there is no header row.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_owned())
            .collect();

        if headers.iter().all(String::is_empty) {
            return Err(DatasetError::EmptyHeader);
        }

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let row = (0..headers.len())
                .map(|i| record.get(i).unwrap_or("").to_owned())
                .collect();
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    /// Reads a table from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the file cannot be opened or parsed.
    pub fn read(path: &Path) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path).map_err(|source| DatasetError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(io::BufReader::new(file))
    }

    /// Serializes the table as CSV into `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Csv`] if writing fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), DatasetError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Serializes the table to CSV bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Csv`] if serialization fails.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, DatasetError> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Writes the table to `path`, replacing any existing file.
    ///
    /// The content is written to a sibling temporary file first and then
    /// renamed over the destination, so readers never observe a partial
    /// file. Concurrent writers are last-writer-wins.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] on I/O or serialization failure.
    pub fn write(&self, path: &Path) -> Result<(), DatasetError> {
        paths::ensure_parent(path)?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);

        let file = std::fs::File::create(&tmp)?;
        self.write_to(io::BufWriter::new(file))?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Builds a table from serializable records, using their field names as
    /// headers. An empty slice yields `headers` with no rows.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Csv`] if a record cannot be serialized.
    pub fn from_records<T: Serialize>(records: &[T], headers: &[&str]) -> Result<Self, DatasetError> {
        if records.is_empty() {
            return Ok(Self::new(headers.iter().copied()));
        }
        let mut writer = csv::Writer::from_writer(Vec::new());
        for record in records {
            writer.serialize(record)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| DatasetError::Io(e.into_error()))?;
        Self::from_reader(bytes.as_slice())
    }

    /// Deserializes every row into `T`, matching fields by header name.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Csv`] if a row does not fit `T`.
    pub fn to_records<T: DeserializeOwned>(&self) -> Result<Vec<T>, DatasetError> {
        let bytes = self.to_csv_bytes()?;
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        reader
            .deserialize()
            .map(|row| row.map_err(DatasetError::from))
            .collect()
    }

    /// Header names in column order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// All rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// A single row.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column named exactly `name`.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of the first column matching any of `candidates`, compared
    /// case-insensitively and tried in candidate order.
    #[must_use]
    pub fn find_column(&self, candidates: &[&str]) -> Option<usize> {
        candidates.iter().find_map(|candidate| {
            self.headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(candidate))
        })
    }

    /// Whether a column named exactly `name` exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// The cell at (`row`, `column`), or `None` if either is out of range.
    #[must_use]
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.cell(row, col)
    }

    /// The cell at (`row`, `col`) by index.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// Iterates one column's cells, top to bottom.
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(col).map_or("", String::as_str))
    }

    /// Overwrites the cell at (`row`, `col`).
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::OutOfRange`] if the position does not exist.
    pub fn set_cell(&mut self, row: usize, col: usize, value: impl Into<String>) -> Result<(), DatasetError> {
        let width = self.headers.len();
        let cell = self
            .rows
            .get_mut(row)
            .and_then(|r| r.get_mut(col))
            .ok_or(DatasetError::OutOfRange { row, col, width })?;
        *cell = value.into();
        Ok(())
    }

    /// Overwrites the cell at (`row`, column named `column`).
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::UnknownColumn`] or
    /// [`DatasetError::OutOfRange`].
    pub fn set(&mut self, row: usize, column: &str, value: impl Into<String>) -> Result<(), DatasetError> {
        let col = self
            .column_index(column)
            .ok_or_else(|| DatasetError::UnknownColumn(column.to_string()))?;
        self.set_cell(row, col, value)
    }

    /// Appends a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// Removes and returns a row.
    pub fn remove_row(&mut self, index: usize) -> Option<Vec<String>> {
        (index < self.rows.len()).then(|| self.rows.remove(index))
    }

    /// Keeps only the rows for which `keep` returns `true`.
    pub fn retain_rows(&mut self, mut keep: impl FnMut(&[String]) -> bool) {
        self.rows.retain(|row| keep(row));
    }

    /// Returns the index of `name`, appending an empty column if absent.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(col) = self.column_index(name) {
            return col;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    /// Renames the column at `col`.
    pub fn rename_column(&mut self, col: usize, name: &str) {
        if let Some(header) = self.headers.get_mut(col) {
            *header = name.to_string();
        }
    }

    /// Removes the column named `name`, if present.
    pub fn drop_column(&mut self, name: &str) {
        let Some(col) = self.column_index(name) else {
            return;
        };
        self.headers.remove(col);
        for row in &mut self.rows {
            if col < row.len() {
                row.remove(col);
            }
        }
    }

    /// Reorders columns so that `leading` (those that exist) come first, in
    /// the given order, followed by every other column in its current order.
    pub fn reorder_columns(&mut self, leading: &[&str]) {
        let mut order: Vec<usize> = leading
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect();
        for col in 0..self.headers.len() {
            if !order.contains(&col) {
                order.push(col);
            }
        }
        self.headers = order.iter().map(|&c| self.headers[c].clone()).collect();
        for row in &mut self.rows {
            *row = order.iter().map(|&c| row[c].clone()).collect();
        }
    }
}
