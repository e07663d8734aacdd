use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

/// Message de progression émis à gros grain (par fenêtre ou par lot
/// d'itérations), jamais dans la boucle interne par tirage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// 0..=100
    pub progress: u8,
    pub current_method: String,
    pub window_index: usize,
    pub total_windows: usize,
}

/// Jeton d'annulation coopératif, sondé aux frontières de boucle. Un run
/// annulé retourne ses résultats partiels, jamais une erreur.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
