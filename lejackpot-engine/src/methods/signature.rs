use std::collections::HashMap;

use rand::rngs::StdRng;

use lejackpot_core::error::EngineResult;
use lejackpot_core::models::{Draw, Pool};

use super::{MethodKind, Prediction, PredictionMethod};

/// Disposition spatiale fixe du bulletin : 7 lignes × 10 colonnes pour les
/// numéros principaux. Le poids positionnel décroît avec la distance au
/// centre de la grille.
const GRID_COLS: u8 = 10;
const GRID_ROWS: u8 = 7;

/// Somme maximale des chiffres sur 1..=69 (atteinte par 69 : 6+9=15).
const MAX_DIGIT_SUM: f64 = 15.0;

/// Méthode par signature structurelle : score composite par candidat à
/// partir de quatre caractéristiques (primalité, résidu modulaire, poids
/// positionnel, somme des chiffres), combinées par un vecteur de poids
/// fourni par l'appelant — c'est ce vecteur que l'optimiseur explore.
pub struct SignatureMethod {
    pub weights: [f64; 4],
}

impl Default for SignatureMethod {
    fn default() -> Self {
        Self { weights: [0.25, 0.25, 0.25, 0.25] }
    }
}

fn is_prime(n: u8) -> bool {
    if n < 2 {
        return false;
    }
    let mut d = 2u8;
    while (d as u16) * (d as u16) <= n as u16 {
        if n % d == 0 {
            return false;
        }
        d += 1;
    }
    true
}

fn digit_sum(n: u8) -> u8 {
    n / 10 + n % 10
}

/// Poids positionnel dans la grille 7×10 : 1 au centre, 0 aux coins.
fn grid_weight(n: u8) -> f64 {
    let idx = (n - 1) as f64;
    let row = (idx / GRID_COLS as f64).floor();
    let col = idx % GRID_COLS as f64;
    let center_row = (GRID_ROWS - 1) as f64 / 2.0;
    let center_col = (GRID_COLS - 1) as f64 / 2.0;
    let dist = ((row - center_row).powi(2) + (col - center_col).powi(2)).sqrt();
    let max_dist = (center_row.powi(2) + center_col.powi(2)).sqrt();
    1.0 - dist / max_dist
}

impl SignatureMethod {
    pub fn new(weights: [f64; 4]) -> Self {
        Self { weights }
    }

    /// Score composite d'un candidat, indépendant de l'historique : la
    /// signature est structurelle, seule la pondération varie.
    pub fn score(&self, n: u8) -> f64 {
        let features = [
            if is_prime(n) { 1.0 } else { 0.0 },
            (n % 7) as f64 / 6.0,
            grid_weight(n),
            digit_sum(n) as f64 / MAX_DIGIT_SUM,
        ];
        features.iter().zip(self.weights.iter()).map(|(f, w)| f * w).sum()
    }

    fn top_candidates(&self, pool: Pool, count: usize) -> Vec<u8> {
        let mut candidates: Vec<u8> = (pool.min()..=pool.max()).collect();
        candidates.sort_by(|&a, &b| {
            self.score(b)
                .partial_cmp(&self.score(a))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });
        candidates.truncate(count);
        candidates.sort();
        candidates
    }
}

impl PredictionMethod for SignatureMethod {
    fn kind(&self) -> MethodKind {
        MethodKind::Signature
    }

    fn name(&self) -> &str {
        "Signature"
    }

    fn params(&self) -> HashMap<String, f64> {
        HashMap::from([
            ("w_prime".to_string(), self.weights[0]),
            ("w_residue".to_string(), self.weights[1]),
            ("w_grid".to_string(), self.weights[2]),
            ("w_digit_sum".to_string(), self.weights[3]),
        ])
    }

    fn predict(&self, _training: &[Draw], _rng: &mut StdRng) -> EngineResult<Prediction> {
        let top = self.top_candidates(Pool::Primary, 5);
        let mut primary = [0u8; 5];
        primary.copy_from_slice(&top);

        let bonus = self.top_candidates(Pool::Bonus, 1)[0];

        // Confiance : dispersion des poids — un vecteur concentré tranche
        // plus nettement qu'un vecteur uniforme
        let max_w = self.weights.iter().cloned().fold(0.0f64, f64::max);
        let sum_w: f64 = self.weights.iter().sum();
        let confidence = if sum_w > 0.0 { max_w / sum_w } else { 0.0 };

        Ok(Prediction {
            primary,
            bonus,
            confidence,
            kind: MethodKind::Signature,
            intervals: Vec::new(),
        })
    }
}
