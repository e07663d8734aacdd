use std::collections::HashMap;

use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;

use lejackpot_core::error::{EngineError, EngineResult};
use lejackpot_core::models::{Draw, Pool};

use super::{MethodKind, Prediction, PredictionMethod};

/// Décroissance par tirage d'ancienneté : un numéro vu hier pèse ~20 fois
/// plus qu'un numéro vu il y a 30 tirages.
const DEFAULT_RECENCY_DECAY: f64 = 0.90;

/// Masse de base donnée à chaque numéro, vu ou non : garantit un support
/// complet pour l'échantillonnage.
const BASELINE_MASS: f64 = 1.0;

/// Confiance fixe, volontairement basse : l'échantillonneur n'apprend rien.
const PLACEHOLDER_CONFIDENCE: f64 = 0.1;

/// Emplacement réservé pour un futur modèle appris. En attendant, un simple
/// échantillonneur pondéré par récence derrière le même contrat que les
/// autres méthodes : les numéros récents pèsent plus lourd, le tirage se
/// fait sans remise.
pub struct LearnedMethod {
    pub recency_decay: f64,
}

impl Default for LearnedMethod {
    fn default() -> Self {
        Self { recency_decay: DEFAULT_RECENCY_DECAY }
    }
}

impl LearnedMethod {
    /// Poids par numéro du pool : masse de base + décroissance géométrique
    /// par ancienneté d'apparition.
    fn recency_weights(&self, training: &[Draw], pool: Pool) -> Vec<f64> {
        let mut weights = vec![BASELINE_MASS; pool.size()];
        let n = training.len();
        for (i, draw) in training.iter().enumerate() {
            let age = (n - 1 - i) as i32;
            let boost = self.recency_decay.powi(age);
            match pool {
                Pool::Primary => {
                    for &num in &draw.primary {
                        weights[(num - 1) as usize] += boost;
                    }
                }
                Pool::Bonus => {
                    weights[(draw.bonus - 1) as usize] += boost;
                }
            }
        }
        weights
    }

    /// Tirage sans remise : le poids d'un numéro choisi est mis à zéro avant
    /// le tirage suivant.
    fn sample_distinct(
        &self,
        weights: &mut [f64],
        count: usize,
        rng: &mut StdRng,
    ) -> EngineResult<Vec<u8>> {
        let mut picked = Vec::with_capacity(count);
        for _ in 0..count {
            let dist = WeightedIndex::new(weights.iter().copied()).map_err(|e| {
                EngineError::PredictionFailure {
                    method: "Apprentissage".to_string(),
                    reason: format!("poids d'échantillonnage dégénérés : {e}"),
                }
            })?;
            let idx = dist.sample(rng);
            picked.push((idx + 1) as u8);
            weights[idx] = 0.0;
        }
        picked.sort();
        Ok(picked)
    }
}

impl PredictionMethod for LearnedMethod {
    fn kind(&self) -> MethodKind {
        MethodKind::Learned
    }

    fn name(&self) -> &str {
        "Apprentissage"
    }

    fn params(&self) -> HashMap<String, f64> {
        HashMap::from([("recency_decay".to_string(), self.recency_decay)])
    }

    fn predict(&self, training: &[Draw], rng: &mut StdRng) -> EngineResult<Prediction> {
        let mut primary_weights = self.recency_weights(training, Pool::Primary);
        let picked = self.sample_distinct(&mut primary_weights, Pool::Primary.pick_count(), rng)?;
        let mut primary = [0u8; 5];
        primary.copy_from_slice(&picked);

        let mut bonus_weights = self.recency_weights(training, Pool::Bonus);
        let bonus = self.sample_distinct(&mut bonus_weights, 1, rng)?[0];

        Ok(Prediction {
            primary,
            bonus,
            confidence: PLACEHOLDER_CONFIDENCE,
            kind: MethodKind::Learned,
            intervals: Vec::new(),
        })
    }
}
