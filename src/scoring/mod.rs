//! The risk-scoring pipeline: normalize → evaluate → aggregate → rank.
//!
//! - [`normalize`] — raw cells to [`StationRecord`]s with fallback values.
//! - [`criteria`] — the seven boolean SCC criteria.
//! - [`aggregate`] — categories, composite score, and the scheme strategies.
//! - [`rank`] — deterministic, stable top-N ordering.
//!
//! Each pass is synchronous and recomputes everything from the table.

pub mod aggregate;
pub mod criteria;
pub mod normalize;
pub mod rank;

use anyhow::{Context, Result};

use crate::config::{Config, HoopStressScale};
use crate::error::AssessError;
use crate::models::{Assessment, RiskAssessment, ScoringScheme, StationRecord};
use crate::table::RawTable;

use aggregate::{strategy_for, ScoreContext, ScoringStrategy};
use criteria::Criteria;

/// A configured pipeline, built once per run and applied to each table.
pub struct Scorer {
    criteria: Criteria,
    strategy: Box<dyn ScoringStrategy>,
    scale: HoopStressScale,
    top_n: usize,
}

impl Scorer {
    pub fn new(config: &Config) -> Result<Self> {
        let criteria = Criteria::new(&config.thresholds).context("Invalid coating keywords")?;
        let strategy = strategy_for(config).context("Invalid fixed-point coating keyword")?;
        Ok(Scorer {
            criteria,
            strategy,
            scale: config.normalization.hoop_stress_scale,
            top_n: config.scoring.top_n,
        })
    }

    pub fn scheme(&self) -> ScoringScheme {
        self.strategy.scheme()
    }

    /// Run one full pass over `table`.
    ///
    /// Returns [`AssessError::Schema`] before touching any row when a required
    /// column is missing, and [`AssessError::EmptyDataset`] when no row has a
    /// stationing value.
    pub fn assess(&self, source: &str, table: &RawTable) -> Result<Assessment, AssessError> {
        let (records, normalization) = normalize::normalize(table, self.scale)?;
        if records.is_empty() {
            return Err(AssessError::EmptyDataset {
                rows_read: normalization.rows_read,
            });
        }

        let stations = self.score_records(records);
        let ranked = rank::rank(&stations, self.strategy.as_ref(), self.top_n);

        tracing::info!(
            source,
            stations = stations.len(),
            ranked = ranked.len(),
            scheme = %self.scheme(),
            "assessment complete"
        );

        Ok(Assessment {
            source: source.to_string(),
            scheme: self.scheme(),
            stations,
            ranked,
            normalization,
        })
    }

    fn score_records(&self, records: Vec<StationRecord>) -> Vec<RiskAssessment> {
        let ctx = ScoreContext::from_records(&records);
        records
            .into_iter()
            .map(|record| {
                let flags = self.criteria.evaluate(&record);
                self.strategy.assess(record, flags, &ctx)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskCategory;
    use crate::table::Cell;
    use normalize::REQUIRED_COLUMNS;

    fn headers() -> Vec<String> {
        REQUIRED_COLUMNS.iter().map(|s| s.to_string()).collect()
    }

    /// Required-column row with low-risk values for everything but the
    /// given stationing, hoop stress and OFF-PSP.
    fn row(stationing: f64, hoop: f64, psp: f64) -> Vec<Cell> {
        vec![
            Cell::Number(stationing),
            Cell::Number(hoop),
            Cell::Number(20_000.0),
            Cell::Number(100.0),
            Cell::Number(1.0),
            Cell::Number(15.0),
            Cell::Text("FBE".to_string()),
            Cell::Number(psp),
        ]
    }

    #[test]
    fn test_three_row_scenario_sign_handling() {
        let table = RawTable {
            headers: headers(),
            rows: vec![row(0.0, 70.0, -2.0), row(10.0, 50.0, -0.5), row(20.0, 61.0, -1.3)],
        };
        let scorer = Scorer::new(&Config::default()).unwrap();
        let a = scorer.assess("scenario", &table).unwrap();

        let stress: Vec<bool> = a.stations.iter().map(|s| s.flags.stress_high).collect();
        let over: Vec<bool> = a.stations.iter().map(|s| s.flags.over_protected).collect();
        let psp: Vec<f64> = a.stations.iter().map(|s| s.record.off_psp_v).collect();

        assert_eq!(stress, vec![true, false, true]);
        assert_eq!(psp, vec![2.0, 0.5, 1.3]);
        assert_eq!(over, vec![true, false, true]);
        let categories: Vec<RiskCategory> = a.stations.iter().map(|s| s.risk_category).collect();
        assert_eq!(
            categories,
            vec![RiskCategory::Medium, RiskCategory::Low, RiskCategory::Medium]
        );
        // 70% stress and 2 V outrank 61% and 1.3 V, which outrank 50% and 0.5 V.
        assert_eq!(a.ranked, vec![0, 2, 1]);
    }

    #[test]
    fn test_schema_error_aborts_before_scoring() {
        let mut h = headers();
        h.retain(|c| c != "Pipe Age");
        let table = RawTable {
            headers: h,
            rows: vec![vec![Cell::Number(0.0)]],
        };
        let scorer = Scorer::new(&Config::default()).unwrap();
        let err = scorer.assess("broken", &table).unwrap_err();
        assert_eq!(
            err,
            AssessError::Schema {
                missing: vec!["Pipe Age".to_string()]
            }
        );
    }

    #[test]
    fn test_empty_dataset_is_distinct_error() {
        let mut r = row(0.0, 50.0, -1.0);
        r[0] = Cell::Empty;
        let table = RawTable {
            headers: headers(),
            rows: vec![r],
        };
        let scorer = Scorer::new(&Config::default()).unwrap();
        assert_eq!(
            scorer.assess("empty", &table).unwrap_err(),
            AssessError::EmptyDataset { rows_read: 1 }
        );
    }

    #[test]
    fn test_no_high_risk_rows_is_a_valid_empty_ranking() {
        let mut cfg = Config::default();
        cfg.scoring.scheme = ScoringScheme::FlagCount;
        let table = RawTable {
            headers: headers(),
            rows: vec![row(0.0, 30.0, -0.9), row(1.0, 30.0, -0.9)],
        };
        let a = Scorer::new(&cfg).unwrap().assess("calm", &table).unwrap();
        assert_eq!(a.stations.len(), 2);
        assert!(a.ranked.is_empty());
        assert_eq!(a.scheme, ScoringScheme::FlagCount);
    }

    #[test]
    fn test_ranked_view_is_bounded_subset() {
        let mut cfg = Config::default();
        cfg.scoring.top_n = 5;
        let rows = (0..12).map(|i| row(i as f64, 40.0 + i as f64, -1.0)).collect();
        let table = RawTable { headers: headers(), rows };

        let a = Scorer::new(&cfg).unwrap().assess("bounded", &table).unwrap();
        assert_eq!(a.ranked.len(), 5);
        assert!(a.ranked.iter().all(|&i| i < a.stations.len()));
        let top: Vec<f64> = a.top().map(|s| s.record.stationing_m).collect();
        assert_eq!(top, vec![11.0, 10.0, 9.0, 8.0, 7.0]);
    }
}
