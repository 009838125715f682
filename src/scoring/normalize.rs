use crate::config::HoopStressScale;
use crate::error::{AssessError, CellParseError};
use crate::models::{NormalizationReport, StationRecord};
use crate::table::{Cell, RawTable};

pub const STATIONING: &str = "Stationing (m)";
pub const HOOP_STRESS: &str = "Hoop stress% of SMYS";
pub const SOIL_RESISTIVITY: &str = "Soil Resistivity (Ω-cm)";
pub const DISTANCE_FROM_PUMP: &str = "Distance from Pump(KM)";
pub const PIPE_AGE: &str = "Pipe Age";
pub const TEMPERATURE: &str = "Temperature";
pub const COATING_TYPE: &str = "CoatingType";
pub const OFF_PSP: &str = "OFF PSP (VE V)";

pub const REQUIRED_COLUMNS: [&str; 8] = [
    STATIONING,
    HOOP_STRESS,
    SOIL_RESISTIVITY,
    DISTANCE_FROM_PUMP,
    PIPE_AGE,
    TEMPERATURE,
    COATING_TYPE,
    OFF_PSP,
];

// Fallbacks keep every criterion well-defined for blank or unreadable cells.
pub const FALLBACK_HOOP_STRESS: f64 = 0.0;
pub const FALLBACK_SOIL_RESISTIVITY: f64 = 1e9;
pub const FALLBACK_DISTANCE: f64 = 1e6;
pub const FALLBACK_PIPE_AGE: f64 = 0.0;
pub const FALLBACK_TEMPERATURE: f64 = 0.0;
pub const FALLBACK_OFF_PSP: f64 = 0.0;

/// Hoop-stress columns whose maximum is below this are read as fractions
/// under [`HoopStressScale::Auto`].
pub const FRACTION_DETECTION_MAX: f64 = 10.0;

/// Resolved positions of every column the normalizer reads.
struct Columns {
    stationing: usize,
    hoop_stress: usize,
    soil: usize,
    distance: usize,
    age: usize,
    temperature: usize,
    coating: usize,
    off_psp: usize,
    latitude: Option<usize>,
    longitude: Option<usize>,
}

impl Columns {
    fn resolve(table: &RawTable) -> Result<Self, AssessError> {
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| table.column(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AssessError::Schema { missing });
        }

        // Presence was checked above.
        let col = |name: &str| table.column(name).unwrap_or_default();
        Ok(Columns {
            stationing: col(STATIONING),
            hoop_stress: col(HOOP_STRESS),
            soil: col(SOIL_RESISTIVITY),
            distance: col(DISTANCE_FROM_PUMP),
            age: col(PIPE_AGE),
            temperature: col(TEMPERATURE),
            coating: col(COATING_TYPE),
            off_psp: col(OFF_PSP),
            latitude: table
                .column_ignore_case("Latitude")
                .or_else(|| table.column_ignore_case("Lat")),
            longitude: table
                .column_ignore_case("Longitude")
                .or_else(|| table.column_ignore_case("Lon"))
                .or_else(|| table.column_ignore_case("Long")),
        })
    }
}

/// Counts cells replaced by a fallback, per column, in first-seen order.
#[derive(Default)]
struct Recoveries(Vec<(String, usize)>);

impl Recoveries {
    fn record(&mut self, column: &str, row: usize, err: &CellParseError) {
        tracing::debug!(row, column, value = %err.value, "unparsable cell, using fallback");
        match self.0.iter_mut().find(|(c, _)| c == column) {
            Some((_, n)) => *n += 1,
            None => self.0.push((column.to_string(), 1)),
        }
    }
}

/// Coerce a cell to a number. Blank cells are `Ok(None)`.
pub fn parse_number(cell: &Cell) -> Result<Option<f64>, CellParseError> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::Number(n) if n.is_finite() => Ok(Some(*n)),
        Cell::Number(n) => Err(CellParseError { value: n.to_string() }),
        Cell::Text(s) => parse_numeric_text(s),
    }
}

/// Like [`parse_number`] but tolerates a trailing `%`.
pub fn parse_percent(cell: &Cell) -> Result<Option<f64>, CellParseError> {
    match cell {
        Cell::Text(s) => parse_numeric_text(s.trim().trim_end_matches('%')),
        other => parse_number(other),
    }
}

fn parse_numeric_text(text: &str) -> Result<Option<f64>, CellParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let cleaned: String = trimmed.chars().filter(|c| *c != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(CellParseError {
            value: trimmed.to_string(),
        }),
    }
}

fn cell_text(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Number(n) => n.to_string(),
        Cell::Text(s) => s.trim().to_string(),
    }
}

/// Turn a raw table into station records.
///
/// Fails only when a required column is missing. Rows without a usable
/// stationing value are dropped; any other blank or unparsable cell takes its
/// column's fallback value and is counted in the returned report.
pub fn normalize(
    table: &RawTable,
    scale: HoopStressScale,
) -> Result<(Vec<StationRecord>, NormalizationReport), AssessError> {
    let cols = Columns::resolve(table)?;
    let mut recoveries = Recoveries::default();
    let mut records = Vec::with_capacity(table.len());
    let mut dropped = 0usize;

    for row in 0..table.len() {
        let stationing = match parse_number(table.cell(row, cols.stationing)) {
            Ok(Some(v)) => v,
            Ok(None) => {
                dropped += 1;
                continue;
            }
            Err(err) => {
                tracing::debug!(row, value = %err.value, "dropping row with unparsable stationing");
                dropped += 1;
                continue;
            }
        };

        let mut number = |column: &str, idx: usize, fallback: f64| {
            match parse_number(table.cell(row, idx)) {
                Ok(v) => v.unwrap_or(fallback),
                Err(err) => {
                    recoveries.record(column, row, &err);
                    fallback
                }
            }
        };

        let soil = number(SOIL_RESISTIVITY, cols.soil, FALLBACK_SOIL_RESISTIVITY);
        let distance = number(DISTANCE_FROM_PUMP, cols.distance, FALLBACK_DISTANCE);
        let age = number(PIPE_AGE, cols.age, FALLBACK_PIPE_AGE);
        let temperature = number(TEMPERATURE, cols.temperature, FALLBACK_TEMPERATURE);
        let off_psp = number(OFF_PSP, cols.off_psp, FALLBACK_OFF_PSP).abs();

        let hoop_stress = match parse_percent(table.cell(row, cols.hoop_stress)) {
            Ok(v) => v.unwrap_or(FALLBACK_HOOP_STRESS),
            Err(err) => {
                recoveries.record(HOOP_STRESS, row, &err);
                FALLBACK_HOOP_STRESS
            }
        };

        let coord = |idx: Option<usize>| idx.and_then(|i| parse_number(table.cell(row, i)).ok().flatten());

        records.push(StationRecord {
            stationing_m: stationing,
            hoop_stress_pct: hoop_stress,
            soil_resistivity_ohm_cm: soil,
            distance_from_pump_km: distance,
            pipe_age_years: age,
            temperature_c: temperature,
            coating_type: cell_text(table.cell(row, cols.coating)),
            off_psp_v: off_psp,
            latitude: coord(cols.latitude),
            longitude: coord(cols.longitude),
        });
    }

    let hoop_stress_rescaled = apply_hoop_stress_scale(&mut records, scale);

    for (column, count) in &recoveries.0 {
        tracing::warn!(column = column.as_str(), count, "cells could not be parsed and were replaced by fallback values");
    }
    if dropped > 0 {
        tracing::info!(dropped, "rows without stationing were dropped");
    }

    let report = NormalizationReport {
        rows_read: table.len(),
        rows_dropped: dropped,
        recoveries: recoveries.0,
        hoop_stress_rescaled,
    };
    Ok((records, report))
}

/// Apply the hoop-stress scaling policy. Returns whether values were multiplied.
fn apply_hoop_stress_scale(records: &mut [StationRecord], scale: HoopStressScale) -> bool {
    let rescale = match scale {
        HoopStressScale::Percent => false,
        HoopStressScale::Fraction => true,
        HoopStressScale::Auto => {
            let max = records
                .iter()
                .map(|r| r.hoop_stress_pct)
                .fold(f64::NEG_INFINITY, f64::max);
            let detected = !records.is_empty() && max < FRACTION_DETECTION_MAX;
            if detected {
                tracing::warn!(
                    max,
                    "hoop stress maximum is below {}; reading values as fractions of SMYS",
                    FRACTION_DETECTION_MAX
                );
            }
            detected
        }
    };

    if rescale {
        for r in records.iter_mut() {
            r.hoop_stress_pct *= 100.0;
        }
    }
    rescale
}
