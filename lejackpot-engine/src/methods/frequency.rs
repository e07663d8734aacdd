use std::collections::HashMap;

use rand::Rng;
use rand::rngs::StdRng;

use lejackpot_core::error::EngineResult;
use lejackpot_core::models::Draw;

use super::{MethodKind, Prediction, PredictionMethod, dedup_ascending};

pub const DEFAULT_LOOKBACK: usize = 50;

/// Méthode fréquentielle : compte les occurrences de chaque numéro dans une
/// fenêtre de repli, retourne le top-5 principal et le bonus le plus fréquent
/// (tirage aléatoire semé en cas d'égalité). Les offsets par slot sont les
/// paramètres explorés par l'optimiseur.
pub struct FrequencyMethod {
    pub lookback: usize,
    pub offsets: [i8; 5],
}

impl Default for FrequencyMethod {
    fn default() -> Self {
        Self { lookback: DEFAULT_LOOKBACK, offsets: [0; 5] }
    }
}

impl FrequencyMethod {
    pub fn new(lookback: usize, offsets: [i8; 5]) -> Self {
        Self { lookback, offsets }
    }

    fn count_window<'a>(&self, training: &'a [Draw]) -> &'a [Draw] {
        let start = training.len().saturating_sub(self.lookback);
        &training[start..]
    }
}

impl PredictionMethod for FrequencyMethod {
    fn kind(&self) -> MethodKind {
        MethodKind::Frequency
    }

    fn name(&self) -> &str {
        "Fréquence"
    }

    fn params(&self) -> HashMap<String, f64> {
        let mut map = HashMap::from([("lookback".to_string(), self.lookback as f64)]);
        for (i, &o) in self.offsets.iter().enumerate() {
            map.insert(format!("offset_{i}"), o as f64);
        }
        map
    }

    fn predict(&self, training: &[Draw], rng: &mut StdRng) -> EngineResult<Prediction> {
        let window = self.count_window(training);

        let mut primary_counts = [0u32; 69];
        let mut bonus_counts = [0u32; 26];
        for draw in window {
            for &n in &draw.primary {
                primary_counts[(n - 1) as usize] += 1;
            }
            bonus_counts[(draw.bonus - 1) as usize] += 1;
        }

        // Top-5 par fréquence décroissante (à fréquence égale : plus petit
        // numéro d'abord, ordre stable)
        let mut by_count: Vec<usize> = (0..69).collect();
        by_count.sort_by(|&a, &b| primary_counts[b].cmp(&primary_counts[a]).then(a.cmp(&b)));

        let mut primary = [0u8; 5];
        for (slot, &idx) in by_count.iter().take(5).enumerate() {
            let shifted = (idx as i32 + 1 + self.offsets[slot] as i32).clamp(1, 69);
            primary[slot] = shifted as u8;
        }
        dedup_ascending(&mut primary);

        // Bonus le plus fréquent ; égalité départagée au hasard (aléa de
        // remplissage, distinct du rééchantillonnage statistique)
        let best = *bonus_counts.iter().max().expect("26 compteurs");
        let tied: Vec<u8> = (0..26u8)
            .filter(|&i| bonus_counts[i as usize] == best)
            .map(|i| i + 1)
            .collect();
        let bonus = tied[rng.random_range(0..tied.len())];

        // Confiance : part des tirages de la fenêtre couverte par le top-5
        let total: u32 = primary_counts.iter().sum();
        let covered: u32 = primary.iter().map(|&n| primary_counts[(n - 1) as usize]).sum();
        let confidence = if total > 0 { covered as f64 / total as f64 } else { 0.0 };

        Ok(Prediction {
            primary,
            bonus,
            confidence,
            kind: MethodKind::Frequency,
            intervals: Vec::new(),
        })
    }
}
