//! Error taxonomy for loading and assessing station tables.
//!
//! Only [`AssessError::Schema`] and the I/O-side errors abort a source.
//! [`CellParseError`] never leaves the normalizer: it is recovered on the spot
//! by substituting the column's fallback value.

use thiserror::Error;

/// Failure of one assessment pass over a loaded table.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssessError {
    /// One or more required columns are absent. Raised before any row is read.
    #[error("Missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// Every row lacked a usable stationing value.
    #[error("No stations with a stationing value ({rows_read} rows read)")]
    EmptyDataset { rows_read: usize },
}

/// A single cell that could not be coerced to a number.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot parse {value:?} as a number")]
pub struct CellParseError {
    pub value: String,
}

/// Failure while turning raw bytes into a [`RawTable`](crate::table::RawTable).
#[derive(Error, Debug)]
pub enum TableError {
    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("workbook has no worksheets")]
    NoWorksheet,

    #[error("JSON input must be an array of objects")]
    JsonShape,

    #[error("table has no header row")]
    NoHeader,
}

/// Failure while reading a data source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_lists_every_missing_column() {
        let err = AssessError::Schema {
            missing: vec!["Pipe Age".to_string(), "Temperature".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Missing required columns: Pipe Age, Temperature"
        );
    }

    #[test]
    fn test_empty_dataset_message_is_distinct() {
        let err = AssessError::EmptyDataset { rows_read: 12 };
        assert!(err.to_string().contains("12 rows read"));
        assert!(!err.to_string().contains("Missing"));
    }
}
