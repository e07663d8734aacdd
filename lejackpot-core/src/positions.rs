use std::collections::HashMap;

use rand::rngs::StdRng;

use crate::error::{EngineError, EngineResult};
use crate::intervals::{self, ConfidenceInterval};
use crate::models::{Draw, Pool};
use crate::options::ValidationOptions;
use crate::stats;

/// Nombre de valeurs récentes conservées pour les estimateurs sensibles à la
/// récence.
pub const RECENT_WINDOW: usize = 20;

/// Statistiques d'une série positionnelle (un slot principal ou le bonus).
#[derive(Debug, Clone)]
pub struct SeriesStats {
    /// Valeurs en ordre chronologique (la plus ancienne en premier).
    pub values: Vec<f64>,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: u8,
    pub max: u8,
    pub sample_size: usize,
    pub frequencies: HashMap<u8, u32>,
    /// Les RECENT_WINDOW dernières valeurs.
    pub recent: Vec<f64>,
}

impl SeriesStats {
    fn from_values(values: Vec<f64>) -> Self {
        let mean = stats::mean(&values);
        let median = stats::median(&values);
        let std_dev = stats::std_dev(&values);
        let min = values.iter().cloned().fold(f64::MAX, f64::min) as u8;
        let max = values.iter().cloned().fold(f64::MIN, f64::max) as u8;

        let mut frequencies = HashMap::new();
        for &v in &values {
            *frequencies.entry(v as u8).or_insert(0) += 1;
        }

        let start = values.len().saturating_sub(RECENT_WINDOW);
        let recent = values[start..].to_vec();

        Self {
            sample_size: values.len(),
            values,
            mean,
            median,
            std_dev,
            min,
            max,
            frequencies,
            recent,
        }
    }
}

/// Prédiction d'un slot : estimation ponctuelle arrondie + intervalle.
#[derive(Debug, Clone)]
pub struct SlotPrediction {
    pub value: u8,
    pub interval: ConfidenceInterval,
    pub constraint_adjusted: bool,
}

#[derive(Debug, Clone)]
pub struct PositionPrediction {
    /// Slots 0..4 = numéros principaux du plus petit au plus grand.
    pub slots: Vec<SlotPrediction>,
    pub bonus: SlotPrediction,
}

impl PositionPrediction {
    pub fn primary_numbers(&self) -> [u8; 5] {
        let mut out = [0u8; 5];
        for (i, s) in self.slots.iter().enumerate() {
            out[i] = s.value;
        }
        out
    }
}

/// Modèle positionnel : six séries parallèles extraites de l'historique
/// (5 slots principaux triés + bonus).
#[derive(Debug, Clone)]
pub struct PositionModel {
    pub slots: Vec<SeriesStats>,
    pub bonus: SeriesStats,
    /// Tirages écartés car malformés.
    pub discarded: usize,
}

impl PositionModel {
    /// Filtre les tirages malformés puis extrait les séries. Erreur fatale si
    /// plus rien n'est exploitable.
    pub fn new(draws: &[Draw]) -> EngineResult<Self> {
        let usable: Vec<&Draw> = draws.iter().filter(|d| d.is_well_formed()).collect();
        let discarded = draws.len() - usable.len();

        if usable.is_empty() {
            return Err(EngineError::InvalidDrawData {
                reason: format!("{} tirage(s) fournis, tous malformés ou absents", draws.len()),
            });
        }

        let mut slot_values: Vec<Vec<f64>> = vec![Vec::with_capacity(usable.len()); 5];
        let mut bonus_values = Vec::with_capacity(usable.len());

        for draw in &usable {
            let sorted = draw.sorted_primary();
            for (i, &v) in sorted.iter().enumerate() {
                slot_values[i].push(v as f64);
            }
            bonus_values.push(draw.bonus as f64);
        }

        Ok(Self {
            slots: slot_values.into_iter().map(SeriesStats::from_values).collect(),
            bonus: SeriesStats::from_values(bonus_values),
            discarded,
        })
    }

    /// Lance l'estimateur d'intervalle choisi sur chacune des six séries,
    /// restreint au domaine du slot, puis répare l'ordre des cinq slots
    /// principaux si demandé. Le bonus n'est jamais réordonné ni ajusté.
    pub fn generate_prediction(
        &self,
        opts: &ValidationOptions,
        rng: &mut StdRng,
    ) -> PositionPrediction {
        let mut slots: Vec<SlotPrediction> = self
            .slots
            .iter()
            .map(|series| predict_series(series, Pool::Primary, opts, rng))
            .collect();

        if opts.enforce_ordering {
            repair_ordering(&mut slots, opts.min_gap);
        }

        let bonus = predict_series(&self.bonus, Pool::Bonus, opts, rng);

        PositionPrediction { slots, bonus }
    }
}

fn predict_series(
    series: &SeriesStats,
    pool: Pool,
    opts: &ValidationOptions,
    rng: &mut StdRng,
) -> SlotPrediction {
    let mut interval = intervals::estimate(
        opts.method,
        &series.values,
        opts.confidence_level,
        opts.bootstrap_iterations,
        opts.decay_rate,
        rng,
    );
    interval.clamp_to(pool.min() as f64, pool.max() as f64);

    let value = (interval.prediction.round() as u8).clamp(pool.min(), pool.max());

    SlotPrediction { value, interval, constraint_adjusted: false }
}

/// Réparation d'ordre : slots triés par valeur croissante, toute paire
/// adjacente plus proche que `min_gap` voit le second slot poussé vers le
/// haut du déficit ; ses bornes d'intervalle sont décalées d'autant et le
/// slot est marqué ajusté.
pub fn repair_ordering(slots: &mut [SlotPrediction], min_gap: u8) {
    slots.sort_by_key(|s| s.value);

    for i in 1..slots.len() {
        let floor = slots[i - 1].value as i32 + min_gap as i32;
        let current = slots[i].value as i32;
        if current < floor {
            let deficit = (floor - current) as f64;
            let pushed = (floor as u8).min(Pool::Primary.max());
            slots[i].value = pushed;
            slots[i].interval.shift(deficit);
            slots[i]
                .interval
                .clamp_to(Pool::Primary.min() as f64, Pool::Primary.max() as f64);
            slots[i].constraint_adjusted = true;
        }
    }
}
