use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use lejackpot_core::error::{EngineError, EngineResult};
use lejackpot_core::intervals::{self, ConfidenceInterval};
use lejackpot_core::models::Draw;
use lejackpot_core::stats;

use crate::methods::frequency::FrequencyMethod;
use crate::methods::signature::SignatureMethod;
use crate::methods::PredictionMethod;
use crate::metrics;
use crate::progress::{CancelToken, ProgressEvent};

/// Bornes d'échantillonnage des décalages par position.
pub const OFFSET_BOUND: i8 = 5;

/// Cadence d'émission de la progression, en essais — jamais à l'intérieur
/// de l'évaluation d'un pli.
pub const PROGRESS_EVERY: usize = 5;

/// Parts réservées au préfixe d'entraînement minimal.
const TRAIN_PREFIX_RATIO: f64 = 0.30;

/// Référence de comparaison, figée pour que « amélioration » garde le même
/// sens d'un run à l'autre : probabilité d'au moins 3 bons numéros en jeu
/// uniforme (hypergéométrique, 5 tirés parmi 69) ≈ 0,182 %.
pub const BASELINE_HIT_RATE: f64 = 20_481.0 / 11_238_513.0;

/// Cible de recherche : quels paramètres explorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationTarget {
    FrequencyOffsets,
    SignatureWeights,
}

impl OptimizationTarget {
    /// Nom de la méthode sous-jacente, repris dans les messages de
    /// progression.
    pub fn label(self) -> &'static str {
        match self {
            Self::FrequencyOffsets => "Fréquence",
            Self::SignatureWeights => "Signature",
        }
    }
}

impl FromStr for OptimizationTarget {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "frequency-offsets" => Ok(Self::FrequencyOffsets),
            "signature-weights" => Ok(Self::SignatureWeights),
            other => Err(EngineError::UnknownOptimizationType(other.to_string())),
        }
    }
}

/// Pli de validation croisée chronologique. L'entraînement est tout ce qui
/// précède le bloc de test : les plis tardifs voient plus d'historique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvFold {
    pub test_start: usize,
    pub test_end: usize,
}

/// Découpe chronologique : les premiers 30 % forment un préfixe
/// d'entraînement fixe, le reste est partitionné en `folds` blocs de test
/// contigus et ordonnés — ce n'est pas du k-fold mélangé.
pub fn split_chronological(data_len: usize, folds: usize) -> Vec<CvFold> {
    if folds == 0 {
        return Vec::new();
    }
    let prefix = (data_len as f64 * TRAIN_PREFIX_RATIO).floor() as usize;
    let remainder = data_len.saturating_sub(prefix);
    if remainder < folds {
        return Vec::new();
    }

    let block = remainder / folds;
    (0..folds)
        .map(|k| {
            let test_start = prefix + k * block;
            // Le dernier pli absorbe le reliquat de la division entière
            let test_end = if k == folds - 1 { data_len } else { test_start + block };
            CvFold { test_start, test_end }
        })
        .collect()
}

/// Performance cross-validée d'un candidat : moyennes des métriques par pli,
/// plus l'écart-type du taux de hit entre plis comme signal de stabilité.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialPerformance {
    pub hit_rate: f64,
    pub avg_matches: f64,
    pub consistency: f64,
    pub hit_rate_std: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationTrial {
    pub iteration: usize,
    pub params: std::collections::HashMap<String, f64>,
    pub performance: TrialPerformance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub target: OptimizationTarget,
    pub trials: Vec<OptimizationTrial>,
    pub best: Option<OptimizationTrial>,
    pub improvement_over_baseline: f64,
    /// Intervalle normal à 95 % sur la distribution des taux de hit des
    /// essais.
    pub hit_rate_interval: Option<ConfidenceInterval>,
    pub cancelled: bool,
}

/// Candidat échantillonné pour un essai.
enum Candidate {
    Offsets([i8; 5]),
    Weights([f64; 4]),
}

impl Candidate {
    fn sample(target: OptimizationTarget, rng: &mut StdRng) -> Self {
        match target {
            OptimizationTarget::FrequencyOffsets => {
                // Décalages distincts, tirés uniformément dans les bornes
                let mut offsets = [i8::MIN; 5];
                let mut k = 0;
                while k < 5 {
                    let candidate = rng.random_range(-OFFSET_BOUND..=OFFSET_BOUND);
                    if !offsets[..k].contains(&candidate) {
                        offsets[k] = candidate;
                        k += 1;
                    }
                }
                Candidate::Offsets(offsets)
            }
            OptimizationTarget::SignatureWeights => {
                let mut weights = [0.0f64; 4];
                for w in &mut weights {
                    *w = rng.random_range(0.0..1.0);
                }
                let sum: f64 = weights.iter().sum();
                if sum > 0.0 {
                    for w in &mut weights {
                        *w /= sum;
                    }
                } else {
                    weights = [0.25; 4];
                }
                Candidate::Weights(weights)
            }
        }
    }

    fn build(&self) -> Box<dyn PredictionMethod> {
        match self {
            Candidate::Offsets(offsets) => {
                Box::new(FrequencyMethod::new(crate::methods::frequency::DEFAULT_LOOKBACK, *offsets))
            }
            Candidate::Weights(weights) => Box::new(SignatureMethod::new(*weights)),
        }
    }
}

/// Recherche aléatoire cross-validée. Une seule exécution à la fois par
/// instance : le drapeau `running` refuse les invocations concurrentes.
pub struct ParameterOptimizer {
    running: AtomicBool,
}

impl Default for ParameterOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterOptimizer {
    pub fn new() -> Self {
        Self { running: AtomicBool::new(false) }
    }

    /// Évalue un candidat : la méthode tourne sur chaque pli (contexte
    /// expansif au fil du bloc de test), les métriques de pli sont moyennées.
    fn evaluate(
        candidate: &Candidate,
        draws: &[Draw],
        folds: &[CvFold],
        seed: u64,
    ) -> TrialPerformance {
        let fold_summaries: Vec<metrics::AccuracySummary> = folds
            .par_iter()
            .enumerate()
            .map(|(f_idx, fold)| {
                let method = candidate.build();
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(f_idx as u64));
                let mut records = Vec::with_capacity(fold.test_end - fold.test_start);
                for i in fold.test_start..fold.test_end {
                    let context = &draws[..i];
                    if let Ok(pred) = method.predict(context, &mut rng) {
                        records.push(metrics::score_prediction(
                            method.name(),
                            &pred,
                            &draws[i],
                        ));
                    }
                }
                metrics::aggregate(&records, 0.95)
            })
            .collect();

        let hit_rates: Vec<f64> = fold_summaries.iter().map(|s| s.hit_rate).collect();
        TrialPerformance {
            hit_rate: stats::mean(&hit_rates),
            avg_matches: stats::mean(
                &fold_summaries.iter().map(|s| s.avg_matches).collect::<Vec<_>>(),
            ),
            consistency: stats::mean(
                &fold_summaries.iter().map(|s| s.consistency).collect::<Vec<_>>(),
            ),
            hit_rate_std: stats::std_dev(&hit_rates),
        }
    }

    /// Recherche aléatoire : `iterations` candidats tirés uniformément dans
    /// les bornes déclarées, meilleur essai retenu par taux de hit.
    /// La progression est émise tous les PROGRESS_EVERY essais ; l'annulation
    /// est sondée entre les itérations et un arrêt propre rend les essais
    /// déjà faits avec `cancelled: true`.
    pub fn run(
        &self,
        draws: &[Draw],
        target: OptimizationTarget,
        iterations: usize,
        folds: usize,
        seed: u64,
        progress: &mut dyn FnMut(ProgressEvent),
        cancel: &CancelToken,
    ) -> EngineResult<OptimizationResult> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(EngineError::OptimizationAlreadyRunning);
        }
        // Relâché quoi qu'il arrive, y compris sur retour anticipé
        let _guard = RunningGuard(&self.running);

        let splits = split_chronological(draws.len(), folds);
        if splits.is_empty() {
            return Err(EngineError::InsufficientData {
                required: folds.max(1) * 2,
                actual: draws.len(),
            });
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut trials = Vec::with_capacity(iterations);
        let mut cancelled = false;

        for iteration in 0..iterations {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let candidate = Candidate::sample(target, &mut rng);
            let method = candidate.build();
            let performance = Self::evaluate(
                &candidate,
                draws,
                &splits,
                seed.wrapping_add((iteration as u64) << 16),
            );
            info!(
                "essai {iteration} : hit_rate {:.4}, stabilité ±{:.4}",
                performance.hit_rate, performance.hit_rate_std
            );
            trials.push(OptimizationTrial {
                iteration,
                params: method.params(),
                performance,
            });

            let done = iteration + 1;
            if done % PROGRESS_EVERY == 0 || done == iterations {
                progress(ProgressEvent {
                    progress: (done * 100 / iterations) as u8,
                    current_method: target.label().to_string(),
                    window_index: iteration,
                    total_windows: iterations,
                });
            }
        }

        let best = trials
            .iter()
            .max_by(|a, b| {
                a.performance
                    .hit_rate
                    .partial_cmp(&b.performance.hit_rate)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned();

        let improvement = best
            .as_ref()
            .map(|t| t.performance.hit_rate - BASELINE_HIT_RATE)
            .unwrap_or(0.0);

        let hit_rates: Vec<f64> =
            trials.iter().map(|t| t.performance.hit_rate).collect();
        let hit_rate_interval = if hit_rates.len() >= 2 {
            Some(intervals::normal_interval(&hit_rates, 0.95))
        } else {
            None
        };

        Ok(OptimizationResult {
            target,
            trials,
            best,
            improvement_over_baseline: improvement,
            hit_rate_interval,
            cancelled,
        })
    }
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
