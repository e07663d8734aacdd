use log::warn;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use lejackpot_core::error::{EngineError, EngineResult};
use lejackpot_core::models::Draw;
use lejackpot_core::options::ValidationOptions;

use crate::ensemble::{EnsembleCombiner, MethodState};
use crate::methods::{Prediction, PredictionMethod};
use crate::metrics::{self, AccuracySummary, PredictionRecord};
use crate::progress::{CancelToken, ProgressEvent};

/// Fenêtre chronologique train/test. Invariants : train_end == test_start
/// (ni trou ni recouvrement) et train_end - train_start >= min_training_size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWindow {
    pub index: usize,
    pub train_start: usize,
    pub train_end: usize,
    pub test_start: usize,
    pub test_end: usize,
}

/// Génère les fenêtres : entraînement de longueur fixe immédiatement suivi
/// du segment de test, départ avancé de step_size, arrêt en fin de données
/// ou au plafond de périodes.
pub fn generate_windows(data_len: usize, opts: &ValidationOptions) -> Vec<ValidationWindow> {
    let mut windows = Vec::new();
    let mut start = 0usize;

    while start + opts.min_training_size + opts.test_window_size <= data_len
        && windows.len() < opts.max_validation_periods
    {
        let train_end = start + opts.min_training_size;
        windows.push(ValidationWindow {
            index: windows.len(),
            train_start: start,
            train_end,
            test_start: train_end,
            test_end: train_end + opts.test_window_size,
        });
        start += opts.step_size;
    }

    windows
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// Résultats d'une méthode sur l'ensemble des fenêtres.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodReport {
    pub name: String,
    pub records: Vec<PredictionRecord>,
    pub summary: AccuracySummary,
    /// Prédictions échouées, comptées puis ignorées.
    pub failures: usize,
}

/// Structure de résultats remise aux collaborateurs d'affichage/export —
/// seule interface de sortie, aucun état intermédiaire n'est exposé.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub state: RunState,
    pub cancelled: bool,
    pub total_windows: usize,
    pub completed_windows: usize,
    pub methods: Vec<MethodReport>,
    pub ensemble: Option<MethodReport>,
    /// Instantané des poids après la mise à jour adaptative.
    pub weights: Option<Vec<MethodState>>,
}

/// Validateur walk-forward : Idle → Running → {Completed, Cancelled, Failed}.
pub struct WalkForwardValidator {
    state: RunState,
}

impl Default for WalkForwardValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl WalkForwardValidator {
    pub fn new() -> Self {
        Self { state: RunState::Idle }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Exécute la validation complète. Contexte d'entraînement expansif : au
    /// pas i du segment de test, la méthode voit train + test[0..i) — les
    /// tirages de test déjà révélés redeviennent de l'historique, jamais le
    /// tirage courant ni les suivants.
    pub fn run(
        &mut self,
        draws: &[Draw],
        opts: &ValidationOptions,
        methods: &[Box<dyn PredictionMethod>],
        progress: &mut dyn FnMut(ProgressEvent),
        cancel: &CancelToken,
    ) -> EngineResult<ValidationReport> {
        let required = opts.required_draws();
        if draws.len() < required {
            self.state = RunState::Failed;
            return Err(EngineError::InsufficientData {
                required,
                actual: draws.len(),
            });
        }

        self.state = RunState::Running;
        let windows = generate_windows(draws.len(), opts);
        let total_windows = windows.len();
        let total_units = (total_windows * methods.len()).max(1);

        let mut rng = StdRng::seed_from_u64(opts.seed.unwrap_or(42));

        let mut records: Vec<Vec<PredictionRecord>> = vec![Vec::new(); methods.len()];
        let mut failures = vec![0usize; methods.len()];
        let mut ensemble_records: Vec<PredictionRecord> = Vec::new();

        let method_names: Vec<String> =
            methods.iter().map(|m| m.name().to_string()).collect();
        let mut combiner = EnsembleCombiner::new(&method_names);

        let mut cancelled = false;
        let mut completed_windows = 0usize;
        let mut done_units = 0usize;

        'outer: for window in &windows {
            let test_len = window.test_end - window.test_start;
            // Prédictions du pas i par méthode, pour le vote d'ensemble
            let mut per_step: Vec<Vec<Option<Prediction>>> =
                vec![vec![None; methods.len()]; test_len];

            for (m_idx, method) in methods.iter().enumerate() {
                for i in 0..test_len {
                    if cancel.is_cancelled() {
                        cancelled = true;
                        break 'outer;
                    }

                    let context = &draws[window.train_start..window.test_start + i];
                    let actual = &draws[window.test_start + i];

                    match method.predict(context, &mut rng) {
                        Ok(prediction) => {
                            records[m_idx].push(metrics::score_prediction(
                                method.name(),
                                &prediction,
                                actual,
                            ));
                            per_step[i][m_idx] = Some(prediction);
                        }
                        Err(e) => {
                            warn!(
                                "fenêtre {}, pas {} : {} a échoué : {e}",
                                window.index, i, method.name()
                            );
                            failures[m_idx] += 1;
                        }
                    }
                }

                done_units += 1;
                progress(ProgressEvent {
                    progress: (done_units * 100 / total_units) as u8,
                    current_method: method.name().to_string(),
                    window_index: window.index,
                    total_windows,
                });
            }

            if opts.include_ensemble {
                for (i, step) in per_step.iter().enumerate() {
                    let votes: Vec<(String, Prediction)> = step
                        .iter()
                        .enumerate()
                        .filter_map(|(m_idx, p)| {
                            p.clone().map(|p| (method_names[m_idx].clone(), p))
                        })
                        .collect();
                    if votes.is_empty() {
                        continue;
                    }
                    let combined = combiner.combine(&votes);
                    let actual = &draws[window.test_start + i];
                    ensemble_records.push(metrics::score_prediction(
                        "Ensemble", &combined, actual,
                    ));
                }
            }

            completed_windows += 1;
        }

        let method_reports: Vec<MethodReport> = methods
            .iter()
            .enumerate()
            .map(|(m_idx, method)| MethodReport {
                name: method.name().to_string(),
                summary: metrics::aggregate(&records[m_idx], opts.confidence_level),
                records: std::mem::take(&mut records[m_idx]),
                failures: failures[m_idx],
            })
            .collect();

        // Mise à jour adaptative : exactement une fois par run, à partir des
        // scores composites agrégés — jamais par tirage de test
        let weights = if opts.include_ensemble && opts.adaptive_weighting {
            let scores: Vec<(String, f64)> = method_reports
                .iter()
                .map(|r| (r.name.clone(), r.summary.composite_score))
                .collect();
            combiner.update_weights(&scores);
            Some(combiner.states().to_vec())
        } else if opts.include_ensemble {
            Some(combiner.states().to_vec())
        } else {
            None
        };

        let ensemble = if opts.include_ensemble {
            Some(MethodReport {
                name: "Ensemble".to_string(),
                summary: metrics::aggregate(&ensemble_records, opts.confidence_level),
                records: ensemble_records,
                failures: 0,
            })
        } else {
            None
        };

        self.state = if cancelled { RunState::Cancelled } else { RunState::Completed };

        Ok(ValidationReport {
            state: self.state,
            cancelled,
            total_windows,
            completed_windows,
            methods: method_reports,
            ensemble,
            weights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use lejackpot_core::models::make_test_draws;

    use crate::methods::{MethodKind, all_methods};

    fn fast_opts() -> ValidationOptions {
        ValidationOptions {
            min_training_size: 100,
            test_window_size: 20,
            step_size: 10,
            bootstrap_iterations: 20,
            ..Default::default()
        }
    }

    fn no_progress() -> impl FnMut(ProgressEvent) {
        |_| {}
    }

    #[test]
    fn test_window_count_scenario() {
        // 150 tirages, train=100, test=20, step=10 → floor((150-120)/10)+1 = 4
        let windows = generate_windows(150, &fast_opts());
        assert_eq!(windows.len(), 4);
    }

    #[test]
    fn test_window_invariants() {
        let opts = fast_opts();
        let windows = generate_windows(200, &opts);
        for w in &windows {
            assert_eq!(w.test_start, w.train_end, "trou ou recouvrement");
            assert_eq!(w.train_end - w.train_start, opts.min_training_size);
            assert_eq!(w.test_end - w.test_start, opts.test_window_size);
        }
        for pair in windows.windows(2) {
            assert_eq!(pair[1].train_start, pair[0].train_start + opts.step_size);
        }
    }

    #[test]
    fn test_max_periods_cap() {
        let opts = ValidationOptions { max_validation_periods: 2, ..fast_opts() };
        assert_eq!(generate_windows(1000, &opts).len(), 2);
    }

    #[test]
    fn test_insufficient_data_fails_fast() {
        let draws = make_test_draws(50);
        let mut validator = WalkForwardValidator::new();
        let err = validator
            .run(&draws, &fast_opts(), &all_methods(&fast_opts()), &mut no_progress(), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientData { required: 120, actual: 50 }));
        assert_eq!(validator.state(), RunState::Failed);
    }

    /// Méthode sonde : enregistre la taille du contexte d'entraînement reçu.
    struct ProbeMethod {
        seen: Arc<Mutex<Vec<usize>>>,
    }

    impl PredictionMethod for ProbeMethod {
        fn kind(&self) -> MethodKind {
            MethodKind::Frequency
        }
        fn name(&self) -> &str {
            "Sonde"
        }
        fn params(&self) -> HashMap<String, f64> {
            HashMap::new()
        }
        fn predict(
            &self,
            training: &[Draw],
            _rng: &mut StdRng,
        ) -> lejackpot_core::error::EngineResult<Prediction> {
            self.seen.lock().unwrap().push(training.len());
            Ok(Prediction {
                primary: [1, 2, 3, 4, 5],
                bonus: 1,
                confidence: 0.0,
                kind: MethodKind::Frequency,
                intervals: Vec::new(),
            })
        }
    }

    #[test]
    fn test_no_leakage_context_grows_by_one() {
        let draws = make_test_draws(130);
        let opts = ValidationOptions {
            max_validation_periods: 1,
            include_ensemble: false,
            ..fast_opts()
        };
        let seen = Arc::new(Mutex::new(Vec::new()));
        let probe: Vec<Box<dyn PredictionMethod>> =
            vec![Box::new(ProbeMethod { seen: Arc::clone(&seen) })];

        let mut validator = WalkForwardValidator::new();
        validator
            .run(&draws, &opts, &probe, &mut no_progress(), &CancelToken::new())
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), opts.test_window_size);
        // Le contexte grandit d'exactement 1 à chaque pas, en partant de
        // min_training_size : aucun tirage futur visible
        for (i, &len) in seen.iter().enumerate() {
            assert_eq!(len, opts.min_training_size + i, "pas {i}");
        }
    }

    #[test]
    fn test_full_run_completes() {
        let draws = make_test_draws(150);
        let opts = fast_opts();
        let mut validator = WalkForwardValidator::new();
        let report = validator
            .run(&draws, &opts, &all_methods(&opts), &mut no_progress(), &CancelToken::new())
            .unwrap();

        assert_eq!(report.state, RunState::Completed);
        assert!(!report.cancelled);
        assert_eq!(report.total_windows, 4);
        assert_eq!(report.completed_windows, 4);
        assert_eq!(report.methods.len(), 4);
        for m in &report.methods {
            assert_eq!(
                m.records.len() + m.failures,
                report.total_windows * opts.test_window_size,
                "{} : records+échecs incohérents", m.name
            );
        }
        let ensemble = report.ensemble.expect("ensemble activé");
        assert!(ensemble.summary.predictions > 0);
        let weights = report.weights.expect("poids attendus");
        let sum: f64 = weights.iter().map(|s| s.weight).sum();
        assert!((sum - 1.0).abs() < 1e-9, "Σ poids = {sum}");
    }

    #[test]
    fn test_cancelled_run_returns_partial() {
        let draws = make_test_draws(300);
        let opts = ValidationOptions { max_validation_periods: 10, ..fast_opts() };
        let token = CancelToken::new();
        token.cancel(); // annulation immédiate

        let mut validator = WalkForwardValidator::new();
        let report = validator
            .run(&draws, &opts, &all_methods(&opts), &mut no_progress(), &token)
            .unwrap();

        assert!(report.cancelled, "le drapeau cancelled doit être posé");
        assert_eq!(report.state, RunState::Cancelled);
        assert_eq!(validator.state(), RunState::Cancelled);
        assert!(report.completed_windows < report.total_windows);
    }

    #[test]
    fn test_progress_emitted_per_window_method() {
        let draws = make_test_draws(150);
        let opts = ValidationOptions { include_ensemble: false, ..fast_opts() };
        let methods = all_methods(&opts);
        let mut events: Vec<ProgressEvent> = Vec::new();

        let mut validator = WalkForwardValidator::new();
        validator
            .run(&draws, &opts, &methods, &mut |e| events.push(e), &CancelToken::new())
            .unwrap();

        // Un événement par (fenêtre, méthode), jamais par tirage
        assert_eq!(events.len(), 4 * methods.len());
        assert_eq!(events.last().unwrap().progress, 100);
    }

    #[test]
    fn test_no_ensemble_when_disabled() {
        let draws = make_test_draws(130);
        let opts = ValidationOptions {
            include_ensemble: false,
            max_validation_periods: 1,
            ..fast_opts()
        };
        let mut validator = WalkForwardValidator::new();
        let report = validator
            .run(&draws, &opts, &all_methods(&opts), &mut no_progress(), &CancelToken::new())
            .unwrap();
        assert!(report.ensemble.is_none());
        assert!(report.weights.is_none());
    }
}
