use thiserror::Error;

/// Erreurs typées du moteur. Les deux premières sont fatales pour un run ;
/// `PredictionFailure` est locale (comptée puis ignorée) ; les deux dernières
/// protègent l'optimiseur.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("Données insuffisantes : il faut au moins {required} tirages, reçu {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Aucun tirage exploitable : {reason}")]
    InvalidDrawData { reason: String },

    #[error("Échec de prédiction ({method}) : {reason}")]
    PredictionFailure { method: String, reason: String },

    #[error("Une optimisation est déjà en cours sur cette instance")]
    OptimizationAlreadyRunning,

    #[error("Type d'optimisation inconnu : {0}")]
    UnknownOptimizationType(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
