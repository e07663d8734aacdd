use serde::{Deserialize, Serialize};

use crate::intervals::IntervalMethod;

/// Options de validation walk-forward. Objet plat : toute clé absente prend
/// sa valeur par défaut, toute clé inconnue est ignorée à la désérialisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    pub min_training_size: usize,
    pub test_window_size: usize,
    pub step_size: usize,
    pub max_validation_periods: usize,
    pub bootstrap_iterations: usize,
    /// 0.90, 0.95 ou 0.99 — tout autre niveau retombe sur le z de 95 %.
    pub confidence_level: f64,
    pub method: IntervalMethod,
    pub include_ensemble: bool,
    pub adaptive_weighting: bool,
    /// Décroissance par observation de l'estimateur time-weighted.
    pub decay_rate: f64,
    /// Réparation d'ordre inter-positions (écart minimal entre slots).
    pub enforce_ordering: bool,
    pub min_gap: u8,
    /// Seed RNG ; None = seed dérivé de la date du jour côté CLI.
    pub seed: Option<u64>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            min_training_size: 100,
            test_window_size: 20,
            step_size: 10,
            max_validation_periods: 50,
            bootstrap_iterations: crate::intervals::DEFAULT_BOOTSTRAP_ITERATIONS,
            confidence_level: 0.95,
            method: IntervalMethod::Bootstrap,
            include_ensemble: true,
            adaptive_weighting: true,
            decay_rate: crate::intervals::DEFAULT_DECAY_RATE,
            enforce_ordering: true,
            min_gap: 2,
            seed: None,
        }
    }
}

impl ValidationOptions {
    /// Taille minimale d'historique exigée avant tout travail.
    pub fn required_draws(&self) -> usize {
        self.min_training_size + self.test_window_size
    }
}
