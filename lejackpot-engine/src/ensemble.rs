use std::path::Path;

use serde::{Deserialize, Serialize};

use lejackpot_core::models::Pool;

use crate::methods::{MethodKind, Prediction};

pub const DEFAULT_LEARNING_RATE: f64 = 0.10;
pub const DEFAULT_MIN_WEIGHT: f64 = 0.05;
pub const DEFAULT_MAX_WEIGHT: f64 = 0.60;

/// État par méthode, détenu exclusivement par le combineur : seule l'étape
/// de mise à jour des poids le mute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodState {
    pub name: String,
    pub weight: f64,
    /// Score d'exactitude lissé (EMA, alpha 0.2).
    pub rolling_score: f64,
}

const ROLLING_ALPHA: f64 = 0.2;

/// Combineur par vote pondéré + règle d'apprentissage adaptatif.
/// Invariant : Σ poids = 1 après chaque mise à jour, chaque poids dans
/// [min_weight, max_weight].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleCombiner {
    states: Vec<MethodState>,
    pub learning_rate: f64,
    pub min_weight: f64,
    pub max_weight: f64,
}

impl EnsembleCombiner {
    pub fn new(method_names: &[String]) -> Self {
        let n = method_names.len().max(1);
        let uniform = 1.0 / n as f64;
        Self {
            states: method_names
                .iter()
                .map(|name| MethodState {
                    name: name.clone(),
                    weight: uniform,
                    rolling_score: 0.0,
                })
                .collect(),
            learning_rate: DEFAULT_LEARNING_RATE,
            min_weight: DEFAULT_MIN_WEIGHT,
            max_weight: DEFAULT_MAX_WEIGHT,
        }
    }

    /// Reconstruit un combineur depuis un instantané de poids sauvegardé.
    pub fn from_states(states: Vec<MethodState>) -> Self {
        Self {
            states,
            learning_rate: DEFAULT_LEARNING_RATE,
            min_weight: DEFAULT_MIN_WEIGHT,
            max_weight: DEFAULT_MAX_WEIGHT,
        }
    }

    pub fn states(&self) -> &[MethodState] {
        &self.states
    }

    fn weight_of(&self, name: &str) -> f64 {
        self.states
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.weight)
            .unwrap_or(0.0)
    }

    /// Vote pondéré : chaque valeur candidate accumule la somme des poids des
    /// méthodes qui l'ont prédite ; top-5 principal, top-1 bonus. Égalités
    /// départagées par le plus petit numéro (déterministe).
    pub fn combine(&self, predictions: &[(String, Prediction)]) -> Prediction {
        let mut primary_votes = [0.0f64; 69];
        let mut bonus_votes = [0.0f64; 26];

        for (name, pred) in predictions {
            let w = self.weight_of(name);
            for &n in &pred.primary {
                primary_votes[(n - 1) as usize] += w;
            }
            bonus_votes[(pred.bonus - 1) as usize] += w;
        }

        let mut order: Vec<usize> = (0..69).collect();
        order.sort_by(|&a, &b| {
            primary_votes[b]
                .partial_cmp(&primary_votes[a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });

        let mut primary = [0u8; 5];
        for (i, &idx) in order.iter().take(5).enumerate() {
            primary[i] = (idx + 1) as u8;
        }
        primary.sort();

        let bonus_idx = (0..26)
            .max_by(|&a, &b| {
                bonus_votes[a]
                    .partial_cmp(&bonus_votes[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(b.cmp(&a))
            })
            .expect("26 candidats bonus");

        // Confiance : part du vote total captée par le top-5
        let total_votes: f64 = primary_votes.iter().sum();
        let captured: f64 = primary.iter().map(|&n| primary_votes[(n - 1) as usize]).sum();
        let confidence = if total_votes > 0.0 { captured / total_votes } else { 0.0 };

        debug_assert_eq!(Pool::Primary.pick_count(), 5);

        Prediction {
            primary,
            bonus: (bonus_idx + 1) as u8,
            confidence,
            kind: MethodKind::Ensemble,
            intervals: Vec::new(),
        }
    }

    /// Mise à jour adaptative, appliquée exactement une fois par run
    /// d'exactitude (jamais par tirage de test) :
    /// w' = clamp(w + lr·(score - moyenne des scores)), puis renormalisation
    /// à somme 1 sous contrainte de bornes. Déterministe à entrées égales.
    pub fn update_weights(&mut self, scores: &[(String, f64)]) {
        if scores.is_empty() {
            return;
        }
        let mean_score: f64 =
            scores.iter().map(|(_, s)| s).sum::<f64>() / scores.len() as f64;

        for state in &mut self.states {
            if let Some((_, score)) = scores.iter().find(|(n, _)| n == &state.name) {
                let delta = self.learning_rate * (score - mean_score);
                state.weight =
                    (state.weight + delta).clamp(self.min_weight, self.max_weight);
                state.rolling_score =
                    (1.0 - ROLLING_ALPHA) * state.rolling_score + ROLLING_ALPHA * score;
            }
        }

        self.renormalize();
    }

    /// Projette les poids sur le simplexe contraint : somme 1, chacun dans
    /// [min_weight, max_weight]. Le reliquat est redistribué entre les poids
    /// qui ont encore de la marge.
    fn renormalize(&mut self) {
        for _ in 0..16 {
            for s in &mut self.states {
                s.weight = s.weight.clamp(self.min_weight, self.max_weight);
            }
            let total: f64 = self.states.iter().map(|s| s.weight).sum();
            let deficit = 1.0 - total;
            if deficit.abs() < 1e-12 {
                return;
            }

            let adjustable: Vec<usize> = self
                .states
                .iter()
                .enumerate()
                .filter(|(_, s)| {
                    if deficit > 0.0 {
                        s.weight < self.max_weight - 1e-12
                    } else {
                        s.weight > self.min_weight + 1e-12
                    }
                })
                .map(|(i, _)| i)
                .collect();
            if adjustable.is_empty() {
                return;
            }

            let share = deficit / adjustable.len() as f64;
            for i in adjustable {
                self.states[i].weight += share;
            }
        }
        for s in &mut self.states {
            s.weight = s.weight.clamp(self.min_weight, self.max_weight);
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["A".into(), "B".into(), "C".into(), "D".into()]
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

    fn assert_weights_valid(combiner: &EnsembleCombiner) {
        let sum: f64 = combiner.states().iter().map(|s| s.weight).sum();
        assert!((sum - 1.0).abs() < 1e-9, "Σ poids = {sum}");
        for s in combiner.states() {
            assert!(
                s.weight >= combiner.min_weight - 1e-9
                    && s.weight <= combiner.max_weight + 1e-9,
                "poids hors bornes : {} = {}", s.name, s.weight
            );
        }
    }

    #[test]
    fn test_initial_weights_uniform() {
        let combiner = EnsembleCombiner::new(&names());
        for s in combiner.states() {
            assert!((s.weight - 0.25).abs() < 1e-10);
        }
    }

    #[test]
    fn test_vote_majority_wins() {
        let combiner = EnsembleCombiner::new(&names());
        let preds = vec![
            ("A".to_string(), prediction([1, 2, 3, 4, 5], 7)),
            ("B".to_string(), prediction([1, 2, 3, 4, 5], 7)),
            ("C".to_string(), prediction([1, 2, 3, 4, 5], 7)),
            ("D".to_string(), prediction([10, 20, 30, 40, 50], 9)),
        ];
        let combined = combiner.combine(&preds);
        assert_eq!(combined.primary, [1, 2, 3, 4, 5]);
        assert_eq!(combined.bonus, 7);
        assert_eq!(combined.kind, MethodKind::Ensemble);
    }

    #[test]
    fn test_heavier_weight_dominates() {
        let mut combiner = EnsembleCombiner::new(&names());
        // Pousser le poids de D vers le haut via des scores
        combiner.update_weights(&[
            ("A".into(), 0.0),
            ("B".into(), 0.0),
            ("C".into(), 0.0),
            ("D".into(), 10.0),
        ]);
        assert_weights_valid(&combiner);
        let d_weight = combiner.weight_of("D");
        assert!(d_weight > combiner.weight_of("A"), "D = {d_weight}");
    }

    #[test]
    fn test_update_keeps_invariants() {
        let mut combiner = EnsembleCombiner::new(&names());
        combiner.update_weights(&[
            ("A".into(), 0.9),
            ("B".into(), 0.1),
            ("C".into(), 0.4),
            ("D".into(), 0.4),
        ]);
        assert_weights_valid(&combiner);
    }

    #[test]
    fn test_update_extreme_scores_still_bounded() {
        let mut combiner = EnsembleCombiner::new(&names());
        for _ in 0..20 {
            combiner.update_weights(&[
                ("A".into(), 100.0),
                ("B".into(), -100.0),
                ("C".into(), 0.0),
                ("D".into(), 0.0),
            ]);
            assert_weights_valid(&combiner);
        }
        assert!((combiner.weight_of("A") - combiner.max_weight).abs() < 1e-6);
        assert!((combiner.weight_of("B") - combiner.min_weight).abs() < 1e-6);
    }

    #[test]
    fn test_update_deterministic() {
        let mut c1 = EnsembleCombiner::new(&names());
        let mut c2 = EnsembleCombiner::new(&names());
        let scores: Vec<(String, f64)> = vec![
            ("A".into(), 0.3),
            ("B".into(), 0.6),
            ("C".into(), 0.1),
            ("D".into(), 0.2),
        ];
        c1.update_weights(&scores);
        c2.update_weights(&scores);
        for (a, b) in c1.states().iter().zip(c2.states().iter()) {
            assert_eq!(a.weight, b.weight);
        }
    }

    #[test]
    fn test_equal_scores_leave_weights_unchanged() {
        let mut combiner = EnsembleCombiner::new(&names());
        combiner.update_weights(&[
            ("A".into(), 0.5),
            ("B".into(), 0.5),
            ("C".into(), 0.5),
            ("D".into(), 0.5),
        ]);
        for s in combiner.states() {
            assert!((s.weight - 0.25).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rolling_score_ema() {
        let mut combiner = EnsembleCombiner::new(&names());
        combiner.update_weights(&[
            ("A".into(), 1.0),
            ("B".into(), 1.0),
            ("C".into(), 1.0),
            ("D".into(), 1.0),
        ]);
        // rolling = 0.8·0 + 0.2·1 = 0.2
        assert!((combiner.states()[0].rolling_score - 0.2).abs() < 1e-10);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let combiner = EnsembleCombiner::new(&names());
        let tmp = std::env::temp_dir().join("lejackpot_test_weights.json");
        combiner.save(&tmp).unwrap();
        let loaded = EnsembleCombiner::load(&tmp).unwrap();
        assert_eq!(loaded.states().len(), 4);
        assert!((loaded.states()[0].weight - 0.25).abs() < 1e-10);
        let _ = std::fs::remove_file(&tmp);
    }

    #[test]
    fn test_tie_break_prefers_smaller_numbers() {
        let combiner = EnsembleCombiner::new(&["A".to_string()]);
        let preds = vec![("A".to_string(), prediction([5, 10, 15, 20, 25], 3))];
        let combined = combiner.combine(&preds);
        // Une seule méthode : ses 5 numéros gagnent, le reste est à égalité 0
        assert_eq!(combined.primary, [5, 10, 15, 20, 25]);
        assert_eq!(combined.bonus, 3);
    }
}
