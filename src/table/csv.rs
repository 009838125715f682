use crate::error::TableError;

use super::{Cell, RawTable, TableReader};

/// Reader for comma-separated text with a header row.
///
/// Rows may be ragged; short rows read as empty cells downstream.
pub struct CsvReader;

impl CsvReader {
    pub fn new() -> Self {
        Self
    }
}

impl TableReader for CsvReader {
    fn read(&self, bytes: &[u8]) -> Result<RawTable, TableError> {
        // Excel "CSV UTF-8" exports start with a BOM that would otherwise
        // stick to the first header name.
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(Cell::from_text).collect());
        }

        Ok(RawTable { headers, rows })
    }
}
