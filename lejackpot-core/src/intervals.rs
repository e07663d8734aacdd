use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::stats;

pub const DEFAULT_BOOTSTRAP_ITERATIONS: usize = 1000;
pub const DEFAULT_DECAY_RATE: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum IntervalMethod {
    Bootstrap,
    #[clap(name = "time-weighted")]
    TimeWeighted,
    Normal,
}

/// Forme commune aux trois estimateurs. Invariant après clamp :
/// lower <= prediction <= upper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub prediction: f64,
    pub lower: f64,
    pub upper: f64,
    pub method: IntervalMethod,
    pub confidence_level: f64,
    /// Diagnostic propre à l'estimateur : itérations bootstrap utilisées.
    pub iterations: Option<usize>,
    /// Diagnostic propre à l'estimateur : taille d'échantillon effective.
    pub effective_n: Option<f64>,
    pub sample_size: usize,
}

impl ConfidenceInterval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Restreint l'intervalle au domaine [min, max] en préservant l'invariant
    /// lower <= prediction <= upper.
    pub fn clamp_to(&mut self, min: f64, max: f64) {
        self.prediction = self.prediction.clamp(min, max);
        self.lower = self.lower.clamp(min, max).min(self.prediction);
        self.upper = self.upper.clamp(min, max).max(self.prediction);
    }

    /// Décale tout l'intervalle de `delta` (réparation d'ordre des slots).
    pub fn shift(&mut self, delta: f64) {
        self.prediction += delta;
        self.lower += delta;
        self.upper += delta;
    }
}

/// Intervalle bootstrap percentile : `iterations` moyennes rééchantillonnées,
/// triées, bornes aux percentiles empiriques [α/2, 1-α/2], arrondies à
/// l'entier le plus proche.
pub fn bootstrap_interval(
    data: &[f64],
    confidence_level: f64,
    iterations: usize,
    rng: &mut StdRng,
) -> ConfidenceInterval {
    // Au moins un rééchantillonnage, sinon les percentiles n'existent pas
    let iterations = iterations.max(1);
    let mut means = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let sample = stats::resample(data, rng);
        means.push(stats::mean(&sample));
    }
    means.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let alpha = 1.0 - confidence_level;
    let lo_idx = ((alpha / 2.0) * iterations as f64) as usize;
    let hi_idx = (((1.0 - alpha / 2.0) * iterations as f64) as usize).min(iterations - 1);

    let prediction = stats::mean(data);
    let mut lower = means[lo_idx].round();
    let mut upper = means[hi_idx].round();

    // L'arrondi ne doit pas inverser l'invariant autour du point estimé
    if lower > prediction {
        lower = prediction.floor();
    }
    if upper < prediction {
        upper = prediction.ceil();
    }

    ConfidenceInterval {
        prediction,
        lower,
        upper,
        method: IntervalMethod::Bootstrap,
        confidence_level,
        iterations: Some(iterations),
        effective_n: None,
        sample_size: data.len(),
    }
}

/// Intervalle à décroissance temporelle : poids decay^(n-1-i) pour la i-ème
/// observation (ordre chronologique, la plus ancienne en premier), taille
/// d'échantillon effective (Σw)²/Σw², erreur standard sqrt(var_w / n_eff).
pub fn time_weighted_interval(
    data: &[f64],
    confidence_level: f64,
    decay_rate: f64,
) -> ConfidenceInterval {
    let n = data.len();
    let weights: Vec<f64> = (0..n)
        .map(|i| decay_rate.powi((n - 1 - i) as i32))
        .collect();

    let wm = stats::weighted_mean(data, &weights);
    let wv = stats::weighted_variance(data, &weights);

    let sum_w: f64 = weights.iter().sum();
    let sum_w2: f64 = weights.iter().map(|w| w * w).sum();
    let effective_n = sum_w * sum_w / sum_w2;

    let standard_error = (wv / effective_n).sqrt();
    let z = stats::z_score(confidence_level);

    ConfidenceInterval {
        prediction: wm,
        lower: wm - z * standard_error,
        upper: wm + z * standard_error,
        method: IntervalMethod::TimeWeighted,
        confidence_level,
        iterations: None,
        effective_n: Some(effective_n),
        sample_size: n,
    }
}

/// Approximation normale classique : mean ± z·std/√n.
pub fn normal_interval(data: &[f64], confidence_level: f64) -> ConfidenceInterval {
    let m = stats::mean(data);
    let sd = stats::std_dev(data);
    let n = data.len() as f64;
    let z = stats::z_score(confidence_level);
    let margin = z * sd / n.sqrt();

    ConfidenceInterval {
        prediction: m,
        lower: m - margin,
        upper: m + margin,
        method: IntervalMethod::Normal,
        confidence_level,
        iterations: None,
        effective_n: None,
        sample_size: data.len(),
    }
}

/// Point d'entrée agnostique : les appelants choisissent l'estimateur par tag.
pub fn estimate(
    method: IntervalMethod,
    data: &[f64],
    confidence_level: f64,
    bootstrap_iterations: usize,
    decay_rate: f64,
    rng: &mut StdRng,
) -> ConfidenceInterval {
    match method {
        IntervalMethod::Bootstrap => {
            bootstrap_interval(data, confidence_level, bootstrap_iterations, rng)
        }
        IntervalMethod::TimeWeighted => {
            time_weighted_interval(data, confidence_level, decay_rate)
        }
        IntervalMethod::Normal => normal_interval(data, confidence_level),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn sample() -> Vec<f64> {
        vec![10.0, 12.0, 11.0, 14.0, 9.0, 13.0, 12.0, 10.0, 15.0, 11.0,
             12.0, 13.0, 9.0, 14.0, 10.0, 12.0, 11.0, 13.0, 12.0, 11.0]
    }

    #[test]
    fn test_bootstrap_constant_sample_collapses() {
        let data = vec![7.0; 30];
        let mut rng = StdRng::seed_from_u64(1);
        let ci = bootstrap_interval(&data, 0.95, 200, &mut rng);
        assert_eq!(ci.lower, ci.upper);
        assert!((ci.prediction - 7.0).abs() < 1e-10);
        assert_eq!(ci.iterations, Some(200));
    }

    #[test]
    fn test_bootstrap_zero_iterations_clamped() {
        let mut rng = StdRng::seed_from_u64(9);
        let ci = bootstrap_interval(&sample(), 0.95, 0, &mut rng);
        assert_eq!(ci.iterations, Some(1));
        assert!(ci.lower <= ci.prediction && ci.prediction <= ci.upper);
    }

    #[test]
    fn test_bootstrap_invariant_holds() {
        let mut rng = StdRng::seed_from_u64(2);
        let ci = bootstrap_interval(&sample(), 0.95, 500, &mut rng);
        assert!(ci.lower <= ci.prediction, "lower={} pred={}", ci.lower, ci.prediction);
        assert!(ci.prediction <= ci.upper, "pred={} upper={}", ci.prediction, ci.upper);
    }

    #[test]
    fn test_width_monotone_in_confidence_level_all_methods() {
        // Pour c1 < c2, largeur(c2) >= largeur(c1), pour les trois estimateurs
        let data = sample();
        let levels = [0.90, 0.95, 0.99];

        for pair in levels.windows(2) {
            let mut rng1 = StdRng::seed_from_u64(3);
            let mut rng2 = StdRng::seed_from_u64(3);
            let b1 = bootstrap_interval(&data, pair[0], 1000, &mut rng1);
            let b2 = bootstrap_interval(&data, pair[1], 1000, &mut rng2);
            assert!(b2.width() >= b1.width(),
                "bootstrap : largeur({})={} < largeur({})={}", pair[1], b2.width(), pair[0], b1.width());

            let t1 = time_weighted_interval(&data, pair[0], 0.95);
            let t2 = time_weighted_interval(&data, pair[1], 0.95);
            assert!(t2.width() >= t1.width(), "time-weighted non monotone");

            let n1 = normal_interval(&data, pair[0]);
            let n2 = normal_interval(&data, pair[1]);
            assert!(n2.width() >= n1.width(), "normal non monotone");
        }
    }

    #[test]
    fn test_time_weighted_effective_n_uniform_weights() {
        // decay=1 → poids uniformes → n_eff = n
        let data = sample();
        let ci = time_weighted_interval(&data, 0.95, 1.0);
        let n_eff = ci.effective_n.unwrap();
        assert!((n_eff - data.len() as f64).abs() < 1e-9, "n_eff={n_eff}");
    }

    #[test]
    fn test_time_weighted_effective_n_shrinks_with_decay() {
        let data = sample();
        let strong = time_weighted_interval(&data, 0.95, 0.7);
        let weak = time_weighted_interval(&data, 0.95, 0.99);
        assert!(strong.effective_n.unwrap() < weak.effective_n.unwrap());
    }

    #[test]
    fn test_normal_interval_known_values() {
        // [1..10] : mean=5.5, std≈2.8723, n=10 → marge = 1.96*2.8723/√10
        let data: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let ci = normal_interval(&data, 0.95);
        let expected_margin = 1.960 * 2.8722813232690143 / 10f64.sqrt();
        assert!((ci.prediction - 5.5).abs() < 1e-10);
        assert!(((ci.upper - ci.lower) / 2.0 - expected_margin).abs() < 1e-9);
    }

    #[test]
    fn test_clamp_to_preserves_invariant() {
        let mut ci = normal_interval(&[1.0, 2.0, 3.0], 0.95);
        ci.lower = -5.0;
        ci.upper = 100.0;
        ci.clamp_to(1.0, 69.0);
        assert!(ci.lower >= 1.0 && ci.upper <= 69.0);
        assert!(ci.lower <= ci.prediction && ci.prediction <= ci.upper);
    }

    #[test]
    fn test_estimate_dispatch_tags() {
        let data = sample();
        let mut rng = StdRng::seed_from_u64(4);
        let b = estimate(IntervalMethod::Bootstrap, &data, 0.95, 100, 0.95, &mut rng);
        let t = estimate(IntervalMethod::TimeWeighted, &data, 0.95, 100, 0.95, &mut rng);
        let n = estimate(IntervalMethod::Normal, &data, 0.95, 100, 0.95, &mut rng);
        assert_eq!(b.method, IntervalMethod::Bootstrap);
        assert_eq!(t.method, IntervalMethod::TimeWeighted);
        assert_eq!(n.method, IntervalMethod::Normal);
    }
}
