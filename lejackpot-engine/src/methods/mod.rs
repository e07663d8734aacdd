pub mod frequency;
pub mod interval;
pub mod learned;
pub mod signature;

use std::collections::HashMap;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use lejackpot_core::error::EngineResult;
use lejackpot_core::intervals::ConfidenceInterval;
use lejackpot_core::models::Draw;
use lejackpot_core::options::ValidationOptions;

/// Variantes fermées du registre : ajouter une méthode = ajouter un variant,
/// pas une branche sur chaîne.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodKind {
    Interval,
    Frequency,
    Signature,
    Learned,
    /// Tag de la prédiction combinée par vote pondéré — pas une méthode du
    /// registre.
    Ensemble,
}

/// Prédiction typée : 5 numéros principaux distincts triés + 1 bonus.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub primary: [u8; 5],
    pub bonus: u8,
    pub confidence: f64,
    pub kind: MethodKind,
    /// Intervalles par slot quand la méthode en émet (sert au contrôle de
    /// calibration), vide sinon.
    pub intervals: Vec<ConfidenceInterval>,
}

/// Contrat uniforme des stratégies de prédiction. `training` est en lecture
/// seule et borné par l'appelant : c'est la défense principale contre la
/// fuite temporelle.
pub trait PredictionMethod: Send + Sync {
    fn kind(&self) -> MethodKind;
    fn name(&self) -> &str;
    fn params(&self) -> HashMap<String, f64>;
    fn predict(&self, training: &[Draw], rng: &mut StdRng) -> EngineResult<Prediction>;
}

/// Les quatre méthodes du registre, configurées depuis les options.
pub fn all_methods(opts: &ValidationOptions) -> Vec<Box<dyn PredictionMethod>> {
    vec![
        Box::new(interval::IntervalBasedMethod::new(opts.clone())),
        Box::new(frequency::FrequencyMethod::default()),
        Box::new(signature::SignatureMethod::default()),
        Box::new(learned::LearnedMethod::default()),
    ]
}

/// Force 5 numéros distincts triés en poussant les doublons vers le haut
/// (repli quand la réparation d'ordre est désactivée).
pub(crate) fn dedup_ascending(numbers: &mut [u8; 5]) {
    numbers.sort();
    for i in 1..numbers.len() {
        if numbers[i] <= numbers[i - 1] {
            numbers[i] = (numbers[i - 1] + 1).min(69);
        }
    }
    // Saturation en haut du domaine : redescendre les premiers si besoin
    for i in (0..numbers.len() - 1).rev() {
        if numbers[i] >= numbers[i + 1] {
            numbers[i] = numbers[i + 1].saturating_sub(1).max(1);
        }
    }
}
