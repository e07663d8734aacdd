use std::collections::HashMap;

use rand::rngs::StdRng;

use lejackpot_core::error::EngineResult;
use lejackpot_core::models::Draw;
use lejackpot_core::options::ValidationOptions;
use lejackpot_core::positions::PositionModel;

use super::{MethodKind, Prediction, PredictionMethod, dedup_ascending};

/// Méthode par intervalles : délègue au modèle positionnel et prend les
/// estimations ponctuelles des cinq slots et du bonus.
pub struct IntervalBasedMethod {
    opts: ValidationOptions,
}

impl IntervalBasedMethod {
    pub fn new(opts: ValidationOptions) -> Self {
        Self { opts }
    }
}

impl PredictionMethod for IntervalBasedMethod {
    fn kind(&self) -> MethodKind {
        MethodKind::Interval
    }

    fn name(&self) -> &str {
        "Intervalles"
    }

    fn params(&self) -> HashMap<String, f64> {
        HashMap::from([
            ("confidence_level".to_string(), self.opts.confidence_level),
            ("bootstrap_iterations".to_string(), self.opts.bootstrap_iterations as f64),
            ("decay_rate".to_string(), self.opts.decay_rate),
            ("min_gap".to_string(), self.opts.min_gap as f64),
        ])
    }

    fn predict(&self, training: &[Draw], rng: &mut StdRng) -> EngineResult<Prediction> {
        let model = PositionModel::new(training)?;
        let positional = model.generate_prediction(&self.opts, rng);

        let mut primary = positional.primary_numbers();
        dedup_ascending(&mut primary);

        let mut intervals: Vec<_> =
            positional.slots.iter().map(|s| s.interval.clone()).collect();
        intervals.push(positional.bonus.interval.clone());

        Ok(Prediction {
            primary,
            bonus: positional.bonus.value,
            confidence: self.opts.confidence_level,
            kind: MethodKind::Interval,
            intervals,
        })
    }
}
