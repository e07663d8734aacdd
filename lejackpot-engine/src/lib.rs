//! Moteur de validation walk-forward et d'optimisation d'ensemble : registre
//! de méthodes de prédiction, validateur chronologique, métriques
//! d'exactitude, combineur adaptatif et recherche de paramètres
//! cross-validée. Aucune E/S bloquante : tout entre et sort en mémoire.

pub mod ensemble;
pub mod methods;
pub mod metrics;
pub mod optimizer;
pub mod progress;
pub mod validator;

pub use ensemble::{EnsembleCombiner, MethodState};
pub use methods::{all_methods, MethodKind, Prediction, PredictionMethod};
pub use metrics::{AccuracySummary, PredictionRecord, PrizeTier};
pub use optimizer::{OptimizationResult, OptimizationTarget, ParameterOptimizer};
pub use progress::{CancelToken, ProgressEvent};
pub use validator::{
    generate_windows, MethodReport, RunState, ValidationReport, ValidationWindow,
    WalkForwardValidator,
};
