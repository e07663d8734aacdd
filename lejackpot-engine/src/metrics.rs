use serde::{Deserialize, Serialize};

use lejackpot_core::models::Draw;
use lejackpot_core::stats;

use crate::methods::Prediction;

/// Pondérations du score composite. Constantes de politique : documentées et
/// stables sur toute la durée d'un run pour que les méthodes soient comparées
/// à conditions identiques.
pub const W_AVG_MATCHES: f64 = 0.4;
pub const W_HIT_RATE: f64 = 0.3;
pub const W_WIN_RATE: f64 = 0.2;
pub const W_POSITION_ERROR: f64 = 0.1;

/// Seuil de « hit » : au moins 3 numéros principaux retrouvés.
pub const HIT_THRESHOLD: usize = 3;

/// Erreur positionnelle maximale par slot (|1 - 69|), pour la normalisation.
const MAX_POSITION_ERROR: f64 = 68.0;

/// Paliers de gain, indexés par (nombre de bons numéros, bonus retrouvé).
/// Du jackpot (5+bonus) au plus petit palier payant (1+bonus).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrizeTier {
    Jackpot,
    Match5,
    Match4Bonus,
    Match4,
    Match3Bonus,
    Match3,
    Match2Bonus,
    Match1Bonus,
}

/// Table fixe (matchCount, bonusMatch) → palier ; tout le reste ne paie pas.
pub fn classify_tier(match_count: usize, bonus_match: bool) -> Option<PrizeTier> {
    match (match_count, bonus_match) {
        (5, true) => Some(PrizeTier::Jackpot),
        (5, false) => Some(PrizeTier::Match5),
        (4, true) => Some(PrizeTier::Match4Bonus),
        (4, false) => Some(PrizeTier::Match4),
        (3, true) => Some(PrizeTier::Match3Bonus),
        (3, false) => Some(PrizeTier::Match3),
        (2, true) => Some(PrizeTier::Match2Bonus),
        (1, true) => Some(PrizeTier::Match1Bonus),
        _ => None,
    }
}

/// Résultat d'une prédiction confrontée au tirage réel. Immuable, consommé
/// par l'agrégation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub method: String,
    pub predicted_primary: [u8; 5],
    pub predicted_bonus: u8,
    pub actual: Draw,
    pub match_count: usize,
    pub bonus_match: bool,
    pub prize_tier: Option<PrizeTier>,
    /// |slot prédit - slot réel| sur les numéros triés.
    pub position_errors: [f64; 5],
    /// Fraction des 6 valeurs réelles tombées dans leur intervalle prédit,
    /// quand la méthode émet des intervalles.
    pub interval_coverage: Option<f64>,
}

/// Confronte une prédiction au tirage réel.
pub fn score_prediction(method: &str, prediction: &Prediction, actual: &Draw) -> PredictionRecord {
    let match_count = prediction
        .primary
        .iter()
        .filter(|n| actual.primary.contains(n))
        .count();
    let bonus_match = prediction.bonus == actual.bonus;

    let actual_sorted = actual.sorted_primary();
    let mut predicted_sorted = prediction.primary;
    predicted_sorted.sort();

    let mut position_errors = [0.0f64; 5];
    for i in 0..5 {
        position_errors[i] = (predicted_sorted[i] as f64 - actual_sorted[i] as f64).abs();
    }

    // Couverture d'intervalle : slots 0..4 puis bonus
    let interval_coverage = if prediction.intervals.len() == 6 {
        let mut inside = 0usize;
        for (i, interval) in prediction.intervals.iter().take(5).enumerate() {
            let v = actual_sorted[i] as f64;
            if v >= interval.lower && v <= interval.upper {
                inside += 1;
            }
        }
        let b = actual.bonus as f64;
        let bonus_interval = &prediction.intervals[5];
        if b >= bonus_interval.lower && b <= bonus_interval.upper {
            inside += 1;
        }
        Some(inside as f64 / 6.0)
    } else {
        None
    };

    PredictionRecord {
        method: method.to_string(),
        predicted_primary: prediction.primary,
        predicted_bonus: prediction.bonus,
        actual: actual.clone(),
        match_count,
        bonus_match,
        prize_tier: classify_tier(match_count, bonus_match),
        position_errors,
        interval_coverage,
    }
}

/// Contrôle de calibration : couverture observée contre niveau nominal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationCheck {
    pub observed_coverage: f64,
    pub nominal_level: f64,
    /// |couverture observée - niveau nominal|
    pub calibration_error: f64,
}

/// Agrégat par méthode. L'agrégation est idempotente : deux passes sur la
/// même liste de records produisent exactement le même résumé.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracySummary {
    pub predictions: usize,
    pub avg_matches: f64,
    pub bonus_rate: f64,
    /// Fraction des prédictions avec au moins HIT_THRESHOLD bons numéros.
    pub hit_rate: f64,
    /// Fraction des prédictions atteignant un palier payant quelconque.
    pub win_rate: f64,
    pub consistency: f64,
    pub avg_position_error: f64,
    pub composite_score: f64,
    pub calibration: Option<CalibrationCheck>,
}

impl AccuracySummary {
    /// Résumé dégénéré pour une méthode dont toutes les prédictions ont
    /// échoué : zéro partout, le run continue.
    pub fn empty() -> Self {
        Self {
            predictions: 0,
            avg_matches: 0.0,
            bonus_rate: 0.0,
            hit_rate: 0.0,
            win_rate: 0.0,
            consistency: 0.0,
            avg_position_error: 0.0,
            composite_score: 0.0,
            calibration: None,
        }
    }
}

pub fn aggregate(records: &[PredictionRecord], confidence_level: f64) -> AccuracySummary {
    if records.is_empty() {
        return AccuracySummary::empty();
    }

    let n = records.len() as f64;
    let match_counts: Vec<f64> = records.iter().map(|r| r.match_count as f64).collect();

    let avg_matches = stats::mean(&match_counts);
    let bonus_rate = records.iter().filter(|r| r.bonus_match).count() as f64 / n;
    let hit_rate =
        records.iter().filter(|r| r.match_count >= HIT_THRESHOLD).count() as f64 / n;
    let win_rate = records.iter().filter(|r| r.prize_tier.is_some()).count() as f64 / n;

    // consistency = max(0, 1 - std/mean), 0 si la moyenne est nulle
    let consistency = if avg_matches > 0.0 {
        (1.0 - stats::std_dev(&match_counts) / avg_matches).max(0.0)
    } else {
        0.0
    };

    let avg_position_error = records
        .iter()
        .map(|r| r.position_errors.iter().sum::<f64>() / 5.0)
        .sum::<f64>()
        / n;
    let normalized_position_error = (avg_position_error / MAX_POSITION_ERROR).min(1.0);

    let composite_score = W_AVG_MATCHES * (avg_matches / 5.0)
        + W_HIT_RATE * hit_rate
        + W_WIN_RATE * win_rate
        + W_POSITION_ERROR * (1.0 - normalized_position_error);

    let coverages: Vec<f64> =
        records.iter().filter_map(|r| r.interval_coverage).collect();
    let calibration = if coverages.is_empty() {
        None
    } else {
        let observed = stats::mean(&coverages);
        Some(CalibrationCheck {
            observed_coverage: observed,
            nominal_level: confidence_level,
            calibration_error: (observed - confidence_level).abs(),
        })
    };

    AccuracySummary {
        predictions: records.len(),
        avg_matches,
        bonus_rate,
        hit_rate,
        win_rate,
        consistency,
        avg_position_error,
        composite_score,
        calibration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::MethodKind;
    use chrono::NaiveDate;

    fn actual(primary: [u8; 5], bonus: u8) -> Draw {
        Draw {
            date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            primary,
            bonus,
        }
    }

    fn prediction(primary: [u8; 5], bonus: u8) -> Prediction {
        Prediction {
            primary,
            bonus,
            confidence: 0.5,
            kind: MethodKind::Frequency,
            intervals: Vec::new(),
        }
    }

    #[test]
    fn test_match_count_intersection() {
        let rec = score_prediction(
            "test",
            &prediction([1, 2, 3, 4, 5], 9),
            &actual([3, 4, 5, 6, 7], 9),
        );
        assert_eq!(rec.match_count, 3);
        assert!(rec.bonus_match);
        assert_eq!(rec.prize_tier, Some(PrizeTier::Match3Bonus));
    }

    #[test]
    fn test_prize_tier_table() {
        assert_eq!(classify_tier(5, true), Some(PrizeTier::Jackpot));
        assert_eq!(classify_tier(5, false), Some(PrizeTier::Match5));
        assert_eq!(classify_tier(4, true), Some(PrizeTier::Match4Bonus));
        assert_eq!(classify_tier(3, false), Some(PrizeTier::Match3));
        assert_eq!(classify_tier(2, true), Some(PrizeTier::Match2Bonus));
        assert_eq!(classify_tier(1, true), Some(PrizeTier::Match1Bonus));
        // Non payants
        assert_eq!(classify_tier(2, false), None);
        assert_eq!(classify_tier(1, false), None);
        assert_eq!(classify_tier(0, true), None);
        assert_eq!(classify_tier(0, false), None);
    }

    #[test]
    fn test_position_errors_on_sorted_slots() {
        let rec = score_prediction(
            "test",
            &prediction([10, 20, 30, 40, 50], 1),
            &actual([12, 20, 28, 45, 50], 2),
        );
        assert_eq!(rec.position_errors, [2.0, 0.0, 2.0, 5.0, 0.0]);
        assert!(!rec.bonus_match);
    }

    #[test]
    fn test_consistency_zero_mean_guard() {
        let records = vec![score_prediction(
            "test",
            &prediction([1, 2, 3, 4, 5], 1),
            &actual([60, 61, 62, 63, 64], 2),
        )];
        let summary = aggregate(&records, 0.95);
        assert_eq!(summary.avg_matches, 0.0);
        assert_eq!(summary.consistency, 0.0);
    }

    #[test]
    fn test_consistency_perfect_constant() {
        // Même nombre de matches partout → std=0 → consistency=1
        let records: Vec<PredictionRecord> = (0..5)
            .map(|_| {
                score_prediction(
                    "test",
                    &prediction([1, 2, 3, 4, 5], 1),
                    &actual([1, 2, 3, 50, 60], 2),
                )
            })
            .collect();
        let summary = aggregate(&records, 0.95);
        assert!((summary.consistency - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_aggregate_idempotent() {
        let records: Vec<PredictionRecord> = (0..10)
            .map(|i| {
                score_prediction(
                    "test",
                    &prediction([1, 2, 3, 4, 5], 1),
                    &actual([i as u8 + 1, 20, 30, 40, 50], (i % 26) as u8 + 1),
                )
            })
            .collect();
        let a = aggregate(&records, 0.95);
        let b = aggregate(&records, 0.95);
        assert_eq!(a.avg_matches, b.avg_matches);
        assert_eq!(a.composite_score, b.composite_score);
        assert_eq!(a.hit_rate, b.hit_rate);
        assert_eq!(a.consistency, b.consistency);
    }

    #[test]
    fn test_empty_records_degenerate_summary() {
        let summary = aggregate(&[], 0.95);
        assert_eq!(summary.predictions, 0);
        assert_eq!(summary.composite_score, 0.0);
        assert!(summary.calibration.is_none());
    }

    #[test]
    fn test_composite_score_perfect_prediction() {
        let records = vec![score_prediction(
            "test",
            &prediction([1, 2, 3, 4, 5], 7),
            &actual([1, 2, 3, 4, 5], 7),
        )];
        let summary = aggregate(&records, 0.95);
        // 0.4·1 + 0.3·1 + 0.2·1 + 0.1·1 = 1.0
        assert!((summary.composite_score - 1.0).abs() < 1e-10,
            "score composite = {}", summary.composite_score);
        assert_eq!(records[0].prize_tier, Some(PrizeTier::Jackpot));
    }

    #[test]
    fn test_calibration_from_intervals() {
        use lejackpot_core::intervals::{ConfidenceInterval, IntervalMethod};

        let wide = |center: f64| ConfidenceInterval {
            prediction: center,
            lower: 1.0,
            upper: 69.0,
            method: IntervalMethod::Normal,
            confidence_level: 0.95,
            iterations: None,
            effective_n: None,
            sample_size: 10,
        };
        let mut pred = prediction([10, 20, 30, 40, 50], 5);
        pred.intervals = (0..6).map(|i| wide(10.0 * i as f64 + 5.0)).collect();

        let rec = score_prediction("test", &pred, &actual([12, 22, 32, 42, 52], 5));
        // Intervalles couvrant tout le domaine → couverture 1.0
        assert_eq!(rec.interval_coverage, Some(1.0));

        let summary = aggregate(&[rec], 0.95);
        let cal = summary.calibration.unwrap();
        assert!((cal.observed_coverage - 1.0).abs() < 1e-10);
        assert!((cal.calibration_error - 0.05).abs() < 1e-10);
    }
}
