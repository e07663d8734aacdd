//! Socle statistique du moteur de validation walk-forward : modèle de
//! données, options, erreurs typées, statistiques de base, estimateurs
//! d'intervalles de confiance et modèle positionnel.

pub mod error;
pub mod intervals;
pub mod models;
pub mod options;
pub mod positions;
pub mod stats;

pub use error::{EngineError, EngineResult};
pub use intervals::{ConfidenceInterval, IntervalMethod};
pub use models::{Draw, Pool, make_test_draws, validate_draw};
pub use options::ValidationOptions;
pub use positions::{PositionModel, PositionPrediction, SlotPrediction};
