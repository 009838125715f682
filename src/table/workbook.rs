use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::error::TableError;

use super::{Cell, RawTable, TableReader};

/// Reader for the first worksheet of a spreadsheet workbook.
///
/// The first row with a non-blank cell is taken as the header. Typed numeric cells stay
/// numeric; everything else (dates, booleans, error cells) becomes text and
/// is left for the normalizer to coerce.
pub struct WorkbookReader;

impl WorkbookReader {
    pub fn new() -> Self {
        Self
    }
}

impl TableReader for WorkbookReader {
    fn read(&self, bytes: &[u8]) -> Result<RawTable, TableError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(TableError::NoWorksheet)??;

        let mut rows = range
            .rows()
            .skip_while(|row| row.iter().all(is_blank));

        let headers: Vec<String> = match rows.next() {
            Some(row) => row.iter().map(|c| c.to_string().trim().to_string()).collect(),
            None => return Err(TableError::NoHeader),
        };

        let rows = rows
            .map(|row| row.iter().map(data_to_cell).collect())
            .collect();

        Ok(RawTable { headers, rows })
    }
}

fn is_blank(data: &Data) -> bool {
    match data {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) if f.is_finite() => Cell::Number(*f),
        Data::String(s) => Cell::from_text(s),
        other => Cell::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::RiskCategory;
    use crate::scoring::Scorer;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const COLUMNS: [&str; 8] = ["A", "B", "C", "D", "E", "F", "G", "H"];

    enum XCell<'a> {
        Str(&'a str),
        Num(f64),
    }

    fn sheet_xml(rows: &[(u32, Vec<XCell>)]) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        );
        for (r, cells) in rows {
            xml.push_str(&format!(r#"<row r="{r}">"#));
            for (col, cell) in COLUMNS.iter().zip(cells) {
                match cell {
                    XCell::Str(s) => xml.push_str(&format!(
                        r#"<c r="{col}{r}" t="inlineStr"><is><t xml:space="preserve">{s}</t></is></c>"#
                    )),
                    XCell::Num(n) => xml.push_str(&format!(r#"<c r="{col}{r}"><v>{n}</v></c>"#)),
                }
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData></worksheet>");
        xml
    }

    /// Minimal single-sheet XLSX package around `sheet`.
    fn xlsx_bytes(sheet: &str) -> Vec<u8> {
        let parts = [
            (
                "[Content_Types].xml",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#,
            ),
            (
                "_rels/.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
            ),
            (
                "xl/workbook.xml",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Stations" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#,
            ),
            ("xl/worksheets/sheet1.xml", sheet),
        ];

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in parts {
            zip.start_file(name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn station_sheet() -> Vec<u8> {
        use XCell::{Num, Str};
        let sheet = sheet_xml(&[
            (1, vec![Str(" ")]),
            (
                2,
                vec![
                    Str("Stationing (m) "),
                    Str("Hoop stress% of SMYS"),
                    Str("Soil Resistivity (Ω-cm)"),
                    Str(" Distance from Pump(KM)"),
                    Str("Pipe Age"),
                    Str("Temperature"),
                    Str("CoatingType"),
                    Str("OFF PSP (VE V)"),
                ],
            ),
            (
                3,
                vec![
                    Num(0.0),
                    Num(0.72),
                    Num(3000.0),
                    Num(5.0),
                    Num(25.0),
                    Num(40.0),
                    Str("Coal Tar"),
                    Num(-1.5),
                ],
            ),
            (
                4,
                vec![
                    Num(100.0),
                    Num(0.45),
                    Num(9000.0),
                    Num(80.0),
                    Num(5.0),
                    Num(20.0),
                    Str("FBE"),
                    Num(-0.9),
                ],
            ),
        ]);
        xlsx_bytes(&sheet)
    }

    #[test]
    fn test_reads_worksheet_below_blank_rows() {
        let table = WorkbookReader::new().read(&station_sheet()).unwrap();

        assert_eq!(table.headers[0], "Stationing (m)");
        assert_eq!(table.headers[3], "Distance from Pump(KM)");
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 1), &Cell::Number(0.72));
        assert_eq!(table.cell(0, 6), &Cell::Text("Coal Tar".to_string()));
        assert_eq!(table.cell(1, 0), &Cell::Number(100.0));
    }

    #[test]
    fn test_workbook_scores_end_to_end() {
        let table = WorkbookReader::new().read(&station_sheet()).unwrap();
        let scorer = Scorer::new(&Config::default()).unwrap();
        let a = scorer.assess("line.xlsx", &table).unwrap();

        assert!(a.normalization.hoop_stress_rescaled);
        assert!((a.stations[0].record.hoop_stress_pct - 72.0).abs() < 1e-9);
        assert!((a.stations[1].record.hoop_stress_pct - 45.0).abs() < 1e-9);
        assert_eq!(a.stations[0].risk_category, RiskCategory::High);
        assert_eq!(a.stations[1].risk_category, RiskCategory::Low);
        assert_eq!(a.ranked, vec![0, 1]);
    }

    #[test]
    fn test_data_to_cell() {
        assert_eq!(data_to_cell(&Data::Empty), Cell::Empty);
        assert_eq!(data_to_cell(&Data::Int(7)), Cell::Number(7.0));
        assert_eq!(data_to_cell(&Data::Float(0.62)), Cell::Number(0.62));
        assert_eq!(data_to_cell(&Data::String(" 45% ".to_string())), Cell::Text("45%".to_string()));
        assert_eq!(data_to_cell(&Data::String("12".to_string())), Cell::Number(12.0));
        assert_eq!(data_to_cell(&Data::Bool(true)), Cell::Text("true".to_string()));
    }

    #[test]
    fn test_rejects_bytes_that_are_not_a_workbook() {
        let result = WorkbookReader::new().read(b"PK\x03\x04 definitely not a zip");
        assert!(result.is_err());
    }
}
