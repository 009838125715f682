use std::cmp::Ordering;

use crate::models::RiskAssessment;

use super::aggregate::ScoringStrategy;

/// Default length of the ranked list.
pub const DEFAULT_TOP_N: usize = 50;

/// Order two stations from highest to lowest risk.
///
/// Keys, in order: the strategy's primary key (desc), hoop stress (desc),
/// OFF-PSP magnitude (desc), distance from pump (asc), pipe age (desc),
/// temperature (desc).
pub fn compare(strategy: &dyn ScoringStrategy, a: &RiskAssessment, b: &RiskAssessment) -> Ordering {
    let (ra, rb) = (&a.record, &b.record);
    strategy
        .primary_key(b)
        .total_cmp(&strategy.primary_key(a))
        .then_with(|| rb.hoop_stress_pct.total_cmp(&ra.hoop_stress_pct))
        .then_with(|| rb.off_psp_v.total_cmp(&ra.off_psp_v))
        .then_with(|| ra.distance_from_pump_km.total_cmp(&rb.distance_from_pump_km))
        .then_with(|| rb.pipe_age_years.total_cmp(&ra.pipe_age_years))
        .then_with(|| rb.temperature_c.total_cmp(&ra.temperature_c))
}

/// Indices of the `top_n` highest-risk qualifying stations, highest first.
///
/// The sort is stable: stations with equal keys keep their input order.
pub fn rank(stations: &[RiskAssessment], strategy: &dyn ScoringStrategy, top_n: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = stations
        .iter()
        .enumerate()
        .filter(|(_, s)| strategy.qualifies(s))
        .map(|(i, _)| i)
        .collect();

    indices.sort_by(|&a, &b| compare(strategy, &stations[a], &stations[b]));
    indices.truncate(top_n);
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Weights;
    use crate::models::{FlagSet, RiskCategory, StationRecord};
    use crate::scoring::aggregate::{FlagCountStrategy, WeightedStrategy};

    fn station(stationing: f64, score: f64) -> RiskAssessment {
        RiskAssessment {
            record: StationRecord {
                stationing_m: stationing,
                hoop_stress_pct: 50.0,
                soil_resistivity_ohm_cm: 8000.0,
                distance_from_pump_km: 40.0,
                pipe_age_years: 12.0,
                temperature_c: 30.0,
                coating_type: String::new(),
                off_psp_v: 1.0,
                latitude: None,
                longitude: None,
            },
            flags: FlagSet::default(),
            flag_count: 0,
            risk_category: RiskCategory::Low,
            composite_score: score,
        }
    }

    fn weighted() -> WeightedStrategy {
        WeightedStrategy::new(Weights::default())
    }

    fn stationings(stations: &[RiskAssessment], idx: &[usize]) -> Vec<f64> {
        idx.iter().map(|&i| stations[i].record.stationing_m).collect()
    }

    #[test]
    fn test_sorts_by_score_descending() {
        let stations = vec![station(0.0, 0.2), station(10.0, 0.9), station(20.0, 0.5)];
        let idx = rank(&stations, &weighted(), DEFAULT_TOP_N);
        assert_eq!(stationings(&stations, &idx), vec![10.0, 20.0, 0.0]);
    }

    #[test]
    fn test_tie_break_chain() {
        let mut s = vec![station(0.0, 0.5); 6];
        for (i, st) in s.iter_mut().enumerate() {
            st.record.stationing_m = i as f64;
        }
        s[1].record.temperature_c = 40.0; // temperature breaks the last tie
        s[2].record.pipe_age_years = 30.0; // age beats temperature
        s[3].record.distance_from_pump_km = 5.0; // closer beats age
        s[4].record.off_psp_v = 1.4; // PSP beats distance
        s[5].record.hoop_stress_pct = 65.0; // stress beats PSP

        let idx = rank(&s, &weighted(), DEFAULT_TOP_N);
        assert_eq!(stationings(&s, &idx), vec![5.0, 4.0, 3.0, 2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_equal_keys_preserve_input_order() {
        let stations: Vec<RiskAssessment> = (0..10).map(|i| station(i as f64, 0.7)).collect();
        let idx = rank(&stations, &weighted(), DEFAULT_TOP_N);
        assert_eq!(idx, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_truncates_to_top_n() {
        let thirty: Vec<RiskAssessment> = (0..30).map(|i| station(i as f64, i as f64)).collect();
        assert_eq!(rank(&thirty, &weighted(), DEFAULT_TOP_N).len(), 30);

        let eighty: Vec<RiskAssessment> = (0..80).map(|i| station(i as f64, i as f64)).collect();
        let idx = rank(&eighty, &weighted(), DEFAULT_TOP_N);
        assert_eq!(idx.len(), 50);
        // The 50 highest scores are stations 79 down to 30.
        assert_eq!(idx.first(), Some(&79));
        assert_eq!(idx.last(), Some(&30));
    }

    #[test]
    fn test_flag_count_scheme_only_ranks_high_stations() {
        let mut stations: Vec<RiskAssessment> = (0..80).map(|i| station(i as f64, 0.1)).collect();
        for (i, s) in stations.iter_mut().enumerate() {
            if i % 2 == 0 {
                s.flag_count = 4 + (i % 3) as u8;
                s.risk_category = RiskCategory::High;
            } else {
                s.flag_count = 3;
                s.risk_category = RiskCategory::Medium;
            }
        }
        let strategy = FlagCountStrategy::new(Weights::default());
        let idx = rank(&stations, &strategy, DEFAULT_TOP_N);

        assert_eq!(idx.len(), 40);
        assert!(idx.iter().all(|&i| stations[i].risk_category == RiskCategory::High));
        let counts: Vec<u8> = idx.iter().map(|&i| stations[i].flag_count).collect();
        assert!(counts.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_nan_scores_do_not_panic() {
        let stations = vec![station(0.0, f64::NAN), station(1.0, 0.3)];
        assert_eq!(rank(&stations, &weighted(), DEFAULT_TOP_N).len(), 2);
    }
}
