//! Report renderers for station assessments.
//!
//! - [`terminal`] — colored criteria panel, summary box and ranked table; respects `--verbose` / `--quiet`.
//! - [`export`] — CSV files for the full and ranked sets, and JSON.
//! - [`chart`] — a parameter plotted against stationing, to a file or an RGB buffer.
//! - [`pdf`] — cover, category summary, paginated ranked table and chart page.

pub mod chart;
pub mod export;
pub mod pdf;
pub mod terminal;

use crate::config::Thresholds;
use crate::models::{Flag, ScoringScheme};

/// Human-readable threshold for each criterion, in [`Flag::ALL`] order.
pub fn criteria_rows(t: &Thresholds) -> Vec<(Flag, String)> {
    Flag::ALL
        .iter()
        .map(|&flag| {
            let threshold = match flag {
                Flag::StressHigh => format!("> {}% SMYS", t.hoop_stress_pct),
                Flag::SoilCorrosive => format!("< {} Ω·cm", t.soil_resistivity_ohm_cm),
                Flag::NearPump => format!("≤ {} km", t.near_pump_km),
                Flag::PipeOld => format!("≥ {} years", t.pipe_age_years),
                Flag::TempHigh => format!("> {} °C", t.temperature_c),
                Flag::CoatingSensitive => t.coating_keywords.join(" / "),
                Flag::OverProtected => format!("|OFF PSP| > {} V", t.over_protection_v),
            };
            (flag, threshold)
        })
        .collect()
}

/// Scores are points under the fixed-point scheme and a 0..1 index otherwise.
pub fn format_score(scheme: ScoringScheme, score: f64) -> String {
    match scheme {
        ScoringScheme::FixedPoint => format!("{:.0}", score),
        ScoringScheme::Weighted | ScoringScheme::FlagCount => format!("{:.3}", score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criteria_rows_follow_thresholds() {
        let t = Thresholds {
            hoop_stress_pct: 72.0,
            ..Default::default()
        };
        let rows = criteria_rows(&t);
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0], (Flag::StressHigh, "> 72% SMYS".to_string()));
        assert_eq!(rows[5].1, "CTE / COAL TAR");
    }

    #[test]
    fn test_format_score_by_scheme() {
        assert_eq!(format_score(ScoringScheme::FixedPoint, 35.0), "35");
        assert_eq!(format_score(ScoringScheme::Weighted, 0.51234), "0.512");
    }
}
