use serde_json::Value;

use crate::error::TableError;

use super::{Cell, RawTable, TableReader};

/// Reader for a JSON array of flat objects, one object per row.
///
/// The header is the union of keys in first-seen order. Nested values are
/// kept as their JSON text.
pub struct JsonReader;

impl JsonReader {
    pub fn new() -> Self {
        Self
    }
}

impl TableReader for JsonReader {
    fn read(&self, bytes: &[u8]) -> Result<RawTable, TableError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let items = value.as_array().ok_or(TableError::JsonShape)?;

        let mut headers: Vec<String> = Vec::new();
        for item in items {
            let obj = item.as_object().ok_or(TableError::JsonShape)?;
            for key in obj.keys() {
                if !headers.iter().any(|h| h == key.trim()) {
                    headers.push(key.trim().to_string());
                }
            }
        }

        let rows = items
            .iter()
            .filter_map(Value::as_object)
            .map(|obj| {
                let mut row = vec![Cell::Empty; headers.len()];
                for (key, value) in obj {
                    if let Some(idx) = headers.iter().position(|h| h == key.trim()) {
                        row[idx] = value_to_cell(value);
                    }
                }
                row
            })
            .collect();

        Ok(RawTable { headers, rows })
    }
}

fn value_to_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
        Value::String(s) => Cell::from_text(s),
        other => Cell::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_json_records() {
        let input = r#"[
            {"Stationing (m)": 0, "Hoop stress% of SMYS": "45%", "CoatingType": null},
            {"Stationing (m)": "10", "Latitude": 21.5}
        ]"#;
        let table = JsonReader::new().read(input.as_bytes()).unwrap();

        assert_eq!(table.headers.len(), 4);
        let st = table.column("Stationing (m)").unwrap();
        let hs = table.column("Hoop stress% of SMYS").unwrap();
        let lat = table.column("Latitude").unwrap();
        assert_eq!(table.cell(0, st), &Cell::Number(0.0));
        assert_eq!(table.cell(1, st), &Cell::Number(10.0));
        assert_eq!(table.cell(0, hs), &Cell::Text("45%".to_string()));
        assert_eq!(table.cell(1, hs), &Cell::Empty);
        assert_eq!(table.cell(1, lat), &Cell::Number(21.5));
    }

    #[test]
    fn test_headers_keep_first_seen_order() {
        let input = r#"[
            {"Stationing (m)": 0, "CoatingType": "CTE", "Pipe Age": 3},
            {"Pipe Age": 4, "Latitude": 21.5, "Stationing (m)": 10}
        ]"#;
        let table = JsonReader::new().read(input.as_bytes()).unwrap();
        assert_eq!(
            table.headers,
            vec!["Stationing (m)", "CoatingType", "Pipe Age", "Latitude"]
        );
        assert_eq!(table.cell(1, 0), &Cell::Number(10.0));
    }

    #[test]
    fn test_rejects_non_array() {
        let err = JsonReader::new().read(br#"{"a": 1}"#).unwrap_err();
        assert!(matches!(err, TableError::JsonShape));
    }
}
