//! Flag-count categories, the weighted composite score, and the strategies
//! that decide which of them drives categorisation and ranking.

use crate::config::{Config, FixedPointRules, Weights};
use crate::models::{FlagSet, RiskAssessment, RiskCategory, ScoringScheme, StationRecord};

use super::criteria::CoatingMatcher;

/// Lowest flag count in the High band.
pub const HIGH_FLAG_COUNT: u8 = 4;
/// Lowest flag count in the Medium band.
pub const MEDIUM_FLAG_COUNT: u8 = 2;

/// Category from the number of raised flags (inclusive lower bounds).
pub fn category_for_flag_count(flag_count: u8) -> RiskCategory {
    if flag_count >= HIGH_FLAG_COUNT {
        RiskCategory::High
    } else if flag_count >= MEDIUM_FLAG_COUNT {
        RiskCategory::Medium
    } else {
        RiskCategory::Low
    }
}

/// Dataset-wide values the per-station score depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreContext {
    pub max_distance_km: f64,
}

impl ScoreContext {
    /// `max_distance_km` is the largest non-zero finite distance, or 1 when
    /// there is none.
    pub fn from_records(records: &[StationRecord]) -> Self {
        let max = records
            .iter()
            .map(|r| r.distance_from_pump_km)
            .filter(|d| d.is_finite() && *d != 0.0)
            .fold(f64::NEG_INFINITY, f64::max);
        ScoreContext {
            max_distance_km: if max.is_finite() && max != 0.0 { max } else { 1.0 },
        }
    }
}

/// Weighted composite score; grows with risk.
///
/// The PSP term is defined on the signed potential (−2 V → 1, 0 V → 0), which
/// is rebuilt from the stored magnitude. It therefore works out to `m / 2` and
/// rises with over-protection; applying `1 - (m + 2) / 2` to the magnitude
/// directly would invert its sign.
pub fn composite_score(record: &StationRecord, weights: &Weights, ctx: &ScoreContext) -> f64 {
    let hoop = record.hoop_stress_pct / 100.0;
    let signed_psp = -record.off_psp_v;
    let psp = 1.0 - (signed_psp + 2.0) / 2.0;
    let dist = (ctx.max_distance_km - record.distance_from_pump_km) / ctx.max_distance_km;
    let soil = 1.0 - (record.soil_resistivity_ohm_cm / weights.soil_reference_ohm_cm).clamp(0.0, 1.0);

    weights.hoop_stress * hoop + weights.psp * psp + weights.distance * dist + weights.soil * soil
}

/// How one scoring scheme turns a station and its flags into a score,
/// a category, and a place in the ranking.
pub trait ScoringStrategy {
    fn scheme(&self) -> ScoringScheme;

    fn score(&self, record: &StationRecord, flags: &FlagSet, ctx: &ScoreContext) -> f64;

    fn categorize(&self, flag_count: u8, score: f64) -> RiskCategory;

    /// Whether a station is eligible for the ranked list.
    fn qualifies(&self, assessment: &RiskAssessment) -> bool;

    /// First sort key of the ranking, descending.
    fn primary_key(&self, assessment: &RiskAssessment) -> f64;

    fn assess(&self, record: StationRecord, flags: FlagSet, ctx: &ScoreContext) -> RiskAssessment {
        let flag_count = flags.count();
        let composite_score = self.score(&record, &flags, ctx);
        RiskAssessment {
            risk_category: self.categorize(flag_count, composite_score),
            record,
            flags,
            flag_count,
            composite_score,
        }
    }
}

/// Composite score ranks every station; categories come from flag counts.
pub struct WeightedStrategy {
    weights: Weights,
}

impl WeightedStrategy {
    pub fn new(weights: Weights) -> Self {
        Self { weights }
    }
}

impl ScoringStrategy for WeightedStrategy {
    fn scheme(&self) -> ScoringScheme {
        ScoringScheme::Weighted
    }

    fn score(&self, record: &StationRecord, _flags: &FlagSet, ctx: &ScoreContext) -> f64 {
        composite_score(record, &self.weights, ctx)
    }

    fn categorize(&self, flag_count: u8, _score: f64) -> RiskCategory {
        category_for_flag_count(flag_count)
    }

    fn qualifies(&self, _assessment: &RiskAssessment) -> bool {
        true
    }

    fn primary_key(&self, assessment: &RiskAssessment) -> f64 {
        assessment.composite_score
    }
}

/// Flag count ranks High stations only; the composite score is still reported.
pub struct FlagCountStrategy {
    weights: Weights,
}

impl FlagCountStrategy {
    pub fn new(weights: Weights) -> Self {
        Self { weights }
    }
}

impl ScoringStrategy for FlagCountStrategy {
    fn scheme(&self) -> ScoringScheme {
        ScoringScheme::FlagCount
    }

    fn score(&self, record: &StationRecord, _flags: &FlagSet, ctx: &ScoreContext) -> f64 {
        composite_score(record, &self.weights, ctx)
    }

    fn categorize(&self, flag_count: u8, _score: f64) -> RiskCategory {
        category_for_flag_count(flag_count)
    }

    fn qualifies(&self, assessment: &RiskAssessment) -> bool {
        assessment.risk_category == RiskCategory::High
    }

    fn primary_key(&self, assessment: &RiskAssessment) -> f64 {
        f64::from(assessment.flag_count)
    }
}

/// Fixed points per criterion, categorised by point bands.
pub struct FixedPointStrategy {
    rules: FixedPointRules,
    coating: CoatingMatcher,
}

impl FixedPointStrategy {
    pub fn new(rules: FixedPointRules) -> Result<Self, regex::Error> {
        let coating = CoatingMatcher::new(&[rules.coating_keyword.as_str()])?;
        Ok(Self { rules, coating })
    }

    pub fn points(&self, record: &StationRecord) -> f64 {
        let r = &self.rules;
        let mut points = 0.0;
        if record.hoop_stress_pct >= r.hoop_stress_pct {
            points += r.points;
        }
        if self.coating.matches(&record.coating_type) {
            points += r.points;
        }
        if record.distance_from_pump_km < r.near_pump_km {
            points += r.points;
        }
        if record.pipe_age_years > r.pipe_age_years {
            points += r.points;
        }
        if record.temperature_c > r.temperature_c {
            points += r.points;
        }
        if record.off_psp_v > r.over_protection_v {
            points += r.psp_points;
        }
        points
    }
}

impl ScoringStrategy for FixedPointStrategy {
    fn scheme(&self) -> ScoringScheme {
        ScoringScheme::FixedPoint
    }

    fn score(&self, record: &StationRecord, _flags: &FlagSet, _ctx: &ScoreContext) -> f64 {
        self.points(record)
    }

    fn categorize(&self, _flag_count: u8, score: f64) -> RiskCategory {
        if score >= self.rules.high_from {
            RiskCategory::High
        } else if score >= self.rules.moderate_from {
            RiskCategory::Medium
        } else {
            RiskCategory::Low
        }
    }

    fn qualifies(&self, assessment: &RiskAssessment) -> bool {
        assessment.risk_category == RiskCategory::High
    }

    fn primary_key(&self, assessment: &RiskAssessment) -> f64 {
        assessment.composite_score
    }
}

/// Build the strategy for the configured scheme.
pub fn strategy_for(config: &Config) -> Result<Box<dyn ScoringStrategy>, regex::Error> {
    let strategy: Box<dyn ScoringStrategy> = match config.scoring.scheme {
        ScoringScheme::Weighted => Box::new(WeightedStrategy::new(config.weights.clone())),
        ScoringScheme::FlagCount => Box::new(FlagCountStrategy::new(config.weights.clone())),
        ScoringScheme::FixedPoint => {
            Box::new(FixedPointStrategy::new(config.fixed_point.clone())?)
        }
    };
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hoop: f64, psp: f64, dist: f64, soil: f64) -> StationRecord {
        StationRecord {
            stationing_m: 0.0,
            hoop_stress_pct: hoop,
            soil_resistivity_ohm_cm: soil,
            distance_from_pump_km: dist,
            pipe_age_years: 0.0,
            temperature_c: 0.0,
            coating_type: String::new(),
            off_psp_v: psp,
            latitude: None,
            longitude: None,
        }
    }

    #[test]
    fn test_category_boundaries() {
        assert_eq!(category_for_flag_count(0), RiskCategory::Low);
        assert_eq!(category_for_flag_count(1), RiskCategory::Low);
        assert_eq!(category_for_flag_count(2), RiskCategory::Medium);
        assert_eq!(category_for_flag_count(3), RiskCategory::Medium);
        assert_eq!(category_for_flag_count(4), RiskCategory::High);
        assert_eq!(category_for_flag_count(7), RiskCategory::High);
    }

    #[test]
    fn test_category_is_monotonic_in_flag_count() {
        for n in 0..7u8 {
            assert!(category_for_flag_count(n) <= category_for_flag_count(n + 1));
        }
    }

    #[test]
    fn test_max_distance_ignores_zero_and_defaults_to_one() {
        let recs = vec![record(0.0, 0.0, 0.0, 0.0), record(0.0, 0.0, 40.0, 0.0)];
        assert_eq!(ScoreContext::from_records(&recs).max_distance_km, 40.0);

        let zeros = vec![record(0.0, 0.0, 0.0, 0.0)];
        assert_eq!(ScoreContext::from_records(&zeros).max_distance_km, 1.0);
        assert_eq!(ScoreContext::from_records(&[]).max_distance_km, 1.0);
    }

    #[test]
    fn test_composite_score_terms() {
        let w = Weights::default();
        let ctx = ScoreContext { max_distance_km: 100.0 };

        // hoop 50% → 0.3; psp 2 V → signed −2 → term 1 → 0.3;
        // dist 0 → term 1 → 0.2; soil 0 → term 1 → 0.1.
        let s = composite_score(&record(50.0, 2.0, 0.0, 0.0), &w, &ctx);
        assert!((s - 0.9).abs() < 1e-12);

        // psp 0 → term 0; dist at max → 0; soil above reference → 0.
        let s = composite_score(&record(0.0, 0.0, 100.0, 50_000.0), &w, &ctx);
        assert!(s.abs() < 1e-12);
    }

    #[test]
    fn test_composite_score_rises_with_each_risk_driver() {
        let w = Weights::default();
        let ctx = ScoreContext { max_distance_km: 100.0 };
        let base = composite_score(&record(40.0, 0.9, 50.0, 8000.0), &w, &ctx);

        assert!(composite_score(&record(70.0, 0.9, 50.0, 8000.0), &w, &ctx) > base);
        assert!(composite_score(&record(40.0, 1.4, 50.0, 8000.0), &w, &ctx) > base);
        assert!(composite_score(&record(40.0, 0.9, 10.0, 8000.0), &w, &ctx) > base);
        assert!(composite_score(&record(40.0, 0.9, 50.0, 2000.0), &w, &ctx) > base);
    }

    #[test]
    fn test_custom_weights_are_used() {
        let w = Weights {
            hoop_stress: 1.0,
            psp: 0.0,
            distance: 0.0,
            soil: 0.0,
            ..Weights::default()
        };
        let ctx = ScoreContext { max_distance_km: 1.0 };
        let s = composite_score(&record(80.0, 2.0, 0.0, 0.0), &w, &ctx);
        assert!((s - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_fixed_point_awards_and_bands() {
        let strategy = FixedPointStrategy::new(FixedPointRules::default()).unwrap();
        let mut r = record(60.0, 1.3, 31.0, 0.0);
        r.coating_type = "Plant CTE".to_string();
        r.pipe_age_years = 11.0;
        r.temperature_c = 39.0;
        assert_eq!(strategy.points(&r), 55.0);
        assert_eq!(strategy.categorize(0, 55.0), RiskCategory::High);

        // Field-applied CTE and an exact 32 km distance earn nothing.
        let mut r = record(59.0, 1.2, 32.0, 0.0);
        r.coating_type = "field CTE".to_string();
        r.pipe_age_years = 10.0;
        assert_eq!(strategy.points(&r), 0.0);

        assert_eq!(strategy.categorize(7, 19.0), RiskCategory::Low);
        assert_eq!(strategy.categorize(0, 20.0), RiskCategory::Medium);
        assert_eq!(strategy.categorize(0, 34.0), RiskCategory::Medium);
        assert_eq!(strategy.categorize(0, 35.0), RiskCategory::High);
    }

    #[test]
    fn test_assess_keeps_flag_count_consistent() {
        let strategy = WeightedStrategy::new(Weights::default());
        let flags = FlagSet {
            stress_high: true,
            soil_corrosive: true,
            near_pump: true,
            pipe_old: true,
            ..Default::default()
        };
        let ctx = ScoreContext { max_distance_km: 1.0 };
        let a = strategy.assess(record(70.0, 1.0, 0.5, 100.0), flags, &ctx);
        assert_eq!(a.flag_count, 4);
        assert_eq!(a.flag_count, a.flags.count());
        assert_eq!(a.risk_category, RiskCategory::High);
    }

    #[test]
    fn test_strategy_for_each_scheme() {
        let mut cfg = Config::default();
        for scheme in [
            ScoringScheme::Weighted,
            ScoringScheme::FlagCount,
            ScoringScheme::FixedPoint,
        ] {
            cfg.scoring.scheme = scheme;
            assert_eq!(strategy_for(&cfg).unwrap().scheme(), scheme);
        }
    }
}
