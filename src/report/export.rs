use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::models::{Assessment, Flag, RiskAssessment};
use crate::scoring::normalize;

/// Header of both CSV exports.
pub fn csv_header() -> Vec<String> {
    let mut header: Vec<String> = [
        normalize::STATIONING,
        normalize::HOOP_STRESS,
        normalize::SOIL_RESISTIVITY,
        normalize::DISTANCE_FROM_PUMP,
        normalize::PIPE_AGE,
        normalize::TEMPERATURE,
        normalize::COATING_TYPE,
        "OFF PSP magnitude (V)",
        "Latitude",
        "Longitude",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend(Flag::ALL.iter().map(|f| f.label().to_string()));
    header.extend(["Flag Count", "Score", "Risk Category"].iter().map(|s| s.to_string()));
    header
}

fn csv_row(s: &RiskAssessment) -> Vec<String> {
    let r = &s.record;
    let optional = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
    let mut row = vec![
        r.stationing_m.to_string(),
        r.hoop_stress_pct.to_string(),
        r.soil_resistivity_ohm_cm.to_string(),
        r.distance_from_pump_km.to_string(),
        r.pipe_age_years.to_string(),
        r.temperature_c.to_string(),
        r.coating_type.clone(),
        r.off_psp_v.to_string(),
        optional(r.latitude),
        optional(r.longitude),
    ];
    row.extend(s.flags.iter().map(|(_, raised)| raised.to_string()));
    row.push(s.flag_count.to_string());
    row.push(s.composite_score.to_string());
    row.push(s.risk_category.to_string());
    row
}

/// Write stations as CSV with a header row.
pub fn write_csv<'a, W: Write>(
    writer: W,
    stations: impl Iterator<Item = &'a RiskAssessment>,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(csv_header())?;
    for s in stations {
        wtr.write_record(csv_row(s))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `<label>_full_results.csv` and `<label>_top_ranked.csv` into `dir`.
pub fn export_csv(a: &Assessment, dir: &Path, label: &str) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;

    let full = dir.join(format!("{label}_full_results.csv"));
    let top = dir.join(format!("{label}_top_ranked.csv"));

    let file = std::fs::File::create(&full)
        .with_context(|| format!("Failed to create {}", full.display()))?;
    write_csv(file, a.stations.iter())?;

    let file = std::fs::File::create(&top)
        .with_context(|| format!("Failed to create {}", top.display()))?;
    write_csv(file, a.top())?;

    tracing::info!(full = %full.display(), top = %top.display(), "exported CSV results");
    Ok((full, top))
}

/// Serialize assessments as pretty JSON: one object for a single source,
/// an array otherwise.
pub fn to_json(assessments: &[Assessment]) -> Result<String> {
    let json = match assessments {
        [single] => serde_json::to_string_pretty(single)?,
        many => serde_json::to_string_pretty(many)?,
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlagSet, NormalizationReport, RiskCategory, ScoringScheme, StationRecord};
    use tempfile::TempDir;

    fn station(stationing: f64, over: bool) -> RiskAssessment {
        RiskAssessment {
            record: StationRecord {
                stationing_m: stationing,
                hoop_stress_pct: 65.0,
                soil_resistivity_ohm_cm: 3000.0,
                distance_from_pump_km: 10.0,
                pipe_age_years: 20.0,
                temperature_c: 40.0,
                coating_type: "CTE".to_string(),
                off_psp_v: 1.3,
                latitude: Some(23.5),
                longitude: None,
            },
            flags: FlagSet {
                over_protected: over,
                ..Default::default()
            },
            flag_count: u8::from(over),
            risk_category: RiskCategory::Low,
            composite_score: 0.5,
        }
    }

    fn assessment() -> Assessment {
        Assessment {
            source: "line.csv".to_string(),
            scheme: ScoringScheme::Weighted,
            stations: vec![station(0.0, false), station(10.0, true), station(20.0, false)],
            ranked: vec![1],
            normalization: NormalizationReport::default(),
        }
    }

    #[test]
    fn test_csv_has_flag_columns_and_values() {
        let mut buf = Vec::new();
        write_csv(&mut buf, assessment().stations.iter()).unwrap();

        let mut rdr = csv::Reader::from_reader(buf.as_slice());
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.len(), 10 + 7 + 3);
        assert_eq!(&headers[0], "Stationing (m)");
        assert_eq!(&headers[16], "OverProt");

        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[1][16], "true");
        assert_eq!(&rows[0][8], "23.5");
        assert_eq!(&rows[0][9], "");
        assert_eq!(&rows[0][19], "Low");
    }

    #[test]
    fn test_export_writes_full_and_ranked_files() {
        let dir = TempDir::new().unwrap();
        let (full, top) = export_csv(&assessment(), dir.path(), "line").unwrap();

        assert_eq!(full.file_name().unwrap(), "line_full_results.csv");
        assert_eq!(top.file_name().unwrap(), "line_top_ranked.csv");

        let count = |p: &Path| csv::Reader::from_path(p).unwrap().records().count();
        assert_eq!(count(&full), 3);
        assert_eq!(count(&top), 1);
    }

    #[test]
    fn test_json_single_is_object_many_is_array() {
        let one = to_json(&[assessment()]).unwrap();
        assert!(one.trim_start().starts_with('{'));
        let two = to_json(&[assessment(), assessment()]).unwrap();
        assert!(two.trim_start().starts_with('['));
    }
}
