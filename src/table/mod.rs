//! In-memory tables and the readers that build them.
//!
//! A [`RawTable`] is the only thing the scoring pipeline sees: an ordered
//! sequence of rows with named columns. Where the bytes came from and what
//! format they were in stops mattering once one of the readers has run.
//!
//! - [`csv`] — comma-separated text, first row is the header.
//! - [`workbook`] — first worksheet of an XLSX/XLS/ODS file.
//! - [`json`] — an array of flat objects.

use crate::error::TableError;

pub mod csv;
pub mod json;
pub mod workbook;

/// One cell as it appeared in the source, before any coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Classify a text cell: blank → `Empty`, numeric → `Number`, else `Text`.
    pub fn from_text(raw: &str) -> Cell {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Cell::Number(n),
            _ => Cell::Text(trimmed.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// Index of a column, comparing trimmed header names exactly.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Like [`column`](Self::column) but ignores ASCII case.
    pub fn column_ignore_case(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    }

    /// Cell at `(row, col)`; short rows read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        const EMPTY: &Cell = &Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(EMPTY)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Workbook,
    Json,
}

impl TableFormat {
    /// Pick a format from the file name's extension, if it has a known one.
    pub fn from_name(name: &str) -> Option<TableFormat> {
        let path = name.split(['?', '#']).next().unwrap_or(name);
        let ext = path.rsplit('.').next()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "txt" => Some(TableFormat::Csv),
            "xlsx" | "xlsm" | "xls" | "ods" => Some(TableFormat::Workbook),
            "json" => Some(TableFormat::Json),
            _ => None,
        }
    }

    /// Guess a format from the leading bytes.
    pub fn sniff(bytes: &[u8]) -> TableFormat {
        if bytes.starts_with(b"PK") || bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
            return TableFormat::Workbook;
        }
        let first = bytes.iter().find(|b| !b.is_ascii_whitespace());
        match first {
            Some(b'[') => TableFormat::Json,
            _ => TableFormat::Csv,
        }
    }
}

impl std::fmt::Display for TableFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableFormat::Csv => write!(f, "CSV"),
            TableFormat::Workbook => write!(f, "workbook"),
            TableFormat::Json => write!(f, "JSON"),
        }
    }
}

pub trait TableReader {
    fn read(&self, bytes: &[u8]) -> Result<RawTable, TableError>;
}

/// Format implied by the extension of `name`, else sniffed from `bytes`.
pub fn detect_format(name: &str, bytes: &[u8]) -> TableFormat {
    TableFormat::from_name(name).unwrap_or_else(|| TableFormat::sniff(bytes))
}

/// Parse `bytes` into a table, using `name` (a path or URL) as a format hint.
pub fn read_table(name: &str, bytes: &[u8]) -> Result<RawTable, TableError> {
    let format = detect_format(name, bytes);
    tracing::debug!(source = name, %format, bytes = bytes.len(), "reading table");

    let table = match format {
        TableFormat::Csv => csv::CsvReader::new().read(bytes)?,
        TableFormat::Workbook => workbook::WorkbookReader::new().read(bytes)?,
        TableFormat::Json => json::JsonReader::new().read(bytes)?,
    };

    if table.headers.is_empty() {
        return Err(TableError::NoHeader);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_from_text() {
        assert_eq!(Cell::from_text("  "), Cell::Empty);
        assert_eq!(Cell::from_text(" 42.5 "), Cell::Number(42.5));
        assert_eq!(Cell::from_text("-1.2"), Cell::Number(-1.2));
        assert_eq!(Cell::from_text("45%"), Cell::Text("45%".to_string()));
        assert_eq!(Cell::from_text("NaN"), Cell::Text("NaN".to_string()));
    }

    #[test]
    fn test_format_from_name() {
        assert_eq!(TableFormat::from_name("data/pipe.CSV"), Some(TableFormat::Csv));
        assert_eq!(
            TableFormat::from_name("https://host/raw/main/Pipeline_data.xlsx?raw=1"),
            Some(TableFormat::Workbook)
        );
        assert_eq!(TableFormat::from_name("stations.json"), Some(TableFormat::Json));
        assert_eq!(TableFormat::from_name("stations"), None);
    }

    #[test]
    fn test_sniff() {
        assert_eq!(TableFormat::sniff(b"PK\x03\x04rest"), TableFormat::Workbook);
        assert_eq!(TableFormat::sniff(b"  \n[{\"a\":1}]"), TableFormat::Json);
        assert_eq!(TableFormat::sniff(b"Stationing (m),Pipe Age\n"), TableFormat::Csv);
    }

    #[test]
    fn test_column_lookup_trims_headers() {
        let table = RawTable {
            headers: vec![" Pipe Age ".to_string(), "Latitude".to_string()],
            rows: vec![vec![Cell::Number(12.0)]],
        };
        assert_eq!(table.column("Pipe Age"), Some(0));
        assert_eq!(table.column("pipe age"), None);
        assert_eq!(table.column_ignore_case("LATITUDE"), Some(1));
        assert_eq!(table.cell(0, 1), &Cell::Empty);
        assert_eq!(table.cell(5, 0), &Cell::Empty);
    }

    #[test]
    fn test_read_table_dispatches_on_extension() {
        let table = read_table("stations.csv", b"Stationing (m),Pipe Age\n10,12\n").unwrap();
        assert_eq!(table.headers, vec!["Stationing (m)", "Pipe Age"]);
        assert_eq!(table.rows[0], vec![Cell::Number(10.0), Cell::Number(12.0)]);
    }
}
