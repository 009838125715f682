use serde::{Deserialize, Serialize};

/// One measured location along the pipeline, after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    pub stationing_m: f64,
    pub hoop_stress_pct: f64,
    pub soil_resistivity_ohm_cm: f64,
    pub distance_from_pump_km: f64,
    pub pipe_age_years: f64,
    pub temperature_c: f64,
    pub coating_type: String,
    /// Magnitude of the "off" pipe-to-soil potential in volts (always ≥ 0).
    pub off_psp_v: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flag {
    StressHigh,
    SoilCorrosive,
    NearPump,
    PipeOld,
    TempHigh,
    CoatingSensitive,
    OverProtected,
}

impl Flag {
    pub const ALL: [Flag; 7] = [
        Flag::StressHigh,
        Flag::SoilCorrosive,
        Flag::NearPump,
        Flag::PipeOld,
        Flag::TempHigh,
        Flag::CoatingSensitive,
        Flag::OverProtected,
    ];

    /// Short column label used in tables and exports.
    pub fn label(&self) -> &'static str {
        match self {
            Flag::StressHigh => "Stress",
            Flag::SoilCorrosive => "Soil",
            Flag::NearPump => "NearPump",
            Flag::PipeOld => "Age",
            Flag::TempHigh => "Temp",
            Flag::CoatingSensitive => "Coating",
            Flag::OverProtected => "OverProt",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Flag::StressHigh => "High mechanical stress",
            Flag::SoilCorrosive => "Corrosive soil environment",
            Flag::NearPump => "Proximity to pump discharge",
            Flag::PipeOld => "Age increases susceptibility",
            Flag::TempHigh => "Thermal acceleration",
            Flag::CoatingSensitive => "Sensitive coating",
            Flag::OverProtected => "Cathodic over-protection",
        }
    }
}

impl std::fmt::Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The seven independent risk predicates for one station.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSet {
    pub stress_high: bool,
    pub soil_corrosive: bool,
    pub near_pump: bool,
    pub pipe_old: bool,
    pub temp_high: bool,
    pub coating_sensitive: bool,
    pub over_protected: bool,
}

impl FlagSet {
    pub fn get(&self, flag: Flag) -> bool {
        match flag {
            Flag::StressHigh => self.stress_high,
            Flag::SoilCorrosive => self.soil_corrosive,
            Flag::NearPump => self.near_pump,
            Flag::PipeOld => self.pipe_old,
            Flag::TempHigh => self.temp_high,
            Flag::CoatingSensitive => self.coating_sensitive,
            Flag::OverProtected => self.over_protected,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Flag, bool)> + '_ {
        Flag::ALL.iter().map(move |f| (*f, self.get(*f)))
    }

    /// Number of raised flags (0..=7).
    pub fn count(&self) -> u8 {
        self.iter().filter(|(_, raised)| *raised).count() as u8
    }

    /// Labels of the raised flags, comma separated.
    pub fn summary(&self) -> String {
        let raised: Vec<&str> = self
            .iter()
            .filter(|(_, raised)| *raised)
            .map(|(f, _)| f.label())
            .collect();
        if raised.is_empty() {
            "—".to_string()
        } else {
            raised.join(", ")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskCategory::Low => write!(f, "Low"),
            RiskCategory::Medium => write!(f, "Medium"),
            RiskCategory::High => write!(f, "High"),
        }
    }
}

/// A station together with everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    #[serde(flatten)]
    pub record: StationRecord,
    pub flags: FlagSet,
    pub flag_count: u8,
    pub risk_category: RiskCategory,
    pub composite_score: f64,
}

/// Scoring scheme active for a pass. Exactly one applies per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringScheme {
    /// Weighted composite score, flag-count categories, every row ranked.
    #[default]
    Weighted,
    /// Flag-count categories, ranked by flag count, High rows only.
    FlagCount,
    /// Fixed points per criterion with point bands, High rows only.
    FixedPoint,
}

impl std::fmt::Display for ScoringScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoringScheme::Weighted => write!(f, "weighted"),
            ScoringScheme::FlagCount => write!(f, "flag-count"),
            ScoringScheme::FixedPoint => write!(f, "fixed-point"),
        }
    }
}

/// Bookkeeping from the normalizer: what was dropped or defaulted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationReport {
    pub rows_read: usize,
    pub rows_dropped: usize,
    /// `(column, count)` of cells replaced by their fallback value.
    pub recoveries: Vec<(String, usize)>,
    pub hoop_stress_rescaled: bool,
}

impl NormalizationReport {
    pub fn total_recoveries(&self) -> usize {
        self.recoveries.iter().map(|(_, n)| n).sum()
    }
}

/// Result of one pipeline pass over one data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub source: String,
    pub scheme: ScoringScheme,
    pub stations: Vec<RiskAssessment>,
    /// Indices into `stations`, highest risk first.
    pub ranked: Vec<usize>,
    pub normalization: NormalizationReport,
}

impl Assessment {
    /// An assessment with no stations, used when every row was dropped.
    pub fn empty(source: &str, scheme: ScoringScheme, normalization: NormalizationReport) -> Self {
        Assessment {
            source: source.to_string(),
            scheme,
            stations: Vec::new(),
            ranked: Vec::new(),
            normalization,
        }
    }

    pub fn top(&self) -> impl Iterator<Item = &RiskAssessment> + '_ {
        self.ranked.iter().map(move |&i| &self.stations[i])
    }

    pub fn count(&self, category: RiskCategory) -> usize {
        self.stations
            .iter()
            .filter(|s| s.risk_category == category)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_count_matches_raised_flags() {
        let flags = FlagSet {
            stress_high: true,
            near_pump: true,
            over_protected: true,
            ..Default::default()
        };
        assert_eq!(flags.count(), 3);
        assert_eq!(flags.summary(), "Stress, NearPump, OverProt");
        assert_eq!(FlagSet::default().count(), 0);
        assert_eq!(FlagSet::default().summary(), "—");
    }

    #[test]
    fn test_category_ordering() {
        assert!(RiskCategory::High > RiskCategory::Medium);
        assert!(RiskCategory::Medium > RiskCategory::Low);
    }

    #[test]
    fn test_scheme_serde_names() {
        let json = serde_json::to_string(&ScoringScheme::FixedPoint).unwrap();
        assert_eq!(json, "\"fixed-point\"");
        assert_eq!(ScoringScheme::FlagCount.to_string(), "flag-count");
    }
}
