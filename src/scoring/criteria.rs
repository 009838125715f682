use regex::Regex;

use crate::config::Thresholds;
use crate::models::{FlagSet, StationRecord};

/// Case-insensitive substring matcher for coating descriptions.
///
/// Word breaks inside a keyword match any run of spaces, hyphens or
/// underscores, so `COAL TAR` also matches `coal-tar` and `Coal_Tar`.
#[derive(Debug, Clone)]
pub struct CoatingMatcher {
    pattern: Option<Regex>,
}

impl CoatingMatcher {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Result<Self, regex::Error> {
        let alternatives: Vec<String> = keywords
            .iter()
            .map(|k| {
                k.as_ref()
                    .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
                    .filter(|w| !w.is_empty())
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"[\s\-_]+")
            })
            .filter(|alt| !alt.is_empty())
            .collect();

        if alternatives.is_empty() {
            return Ok(CoatingMatcher { pattern: None });
        }

        let pattern = Regex::new(&format!("(?i){}", alternatives.join("|")))?;
        Ok(CoatingMatcher {
            pattern: Some(pattern),
        })
    }

    pub fn matches(&self, coating: &str) -> bool {
        self.pattern
            .as_ref()
            .map(|p| p.is_match(coating))
            .unwrap_or(false)
    }
}

/// The seven SCC criteria with their thresholds resolved.
#[derive(Debug, Clone)]
pub struct Criteria {
    thresholds: Thresholds,
    coating: CoatingMatcher,
}

impl Criteria {
    pub fn new(thresholds: &Thresholds) -> Result<Self, regex::Error> {
        Ok(Criteria {
            thresholds: thresholds.clone(),
            coating: CoatingMatcher::new(&thresholds.coating_keywords)?,
        })
    }

    /// Evaluate every criterion against one station. Pure: depends only on
    /// `record` and the thresholds.
    ///
    /// `off_psp_v` is a magnitude, so over-protection ("more negative than
    /// −1.2 V") is a magnitude above the threshold.
    pub fn evaluate(&self, record: &StationRecord) -> FlagSet {
        let t = &self.thresholds;
        FlagSet {
            stress_high: record.hoop_stress_pct > t.hoop_stress_pct,
            soil_corrosive: record.soil_resistivity_ohm_cm < t.soil_resistivity_ohm_cm,
            near_pump: record.distance_from_pump_km <= t.near_pump_km,
            pipe_old: record.pipe_age_years >= t.pipe_age_years,
            temp_high: record.temperature_c > t.temperature_c,
            coating_sensitive: self.coating.matches(&record.coating_type),
            over_protected: record.off_psp_v > t.over_protection_v,
        }
    }
}
