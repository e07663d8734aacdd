use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Un tirage historique : 5 numéros principaux (1-69) + 1 numéro bonus (1-26).
/// Créé une seule fois à l'ingestion, immuable ensuite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draw {
    pub date: NaiveDate,
    pub primary: [u8; 5],
    pub bonus: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pool {
    Primary,
    Bonus,
}

impl Pool {
    pub fn size(&self) -> usize {
        match self {
            Pool::Primary => 69,
            Pool::Bonus => 26,
        }
    }

    pub fn pick_count(&self) -> usize {
        match self {
            Pool::Primary => 5,
            Pool::Bonus => 1,
        }
    }

    pub fn min(&self) -> u8 {
        1
    }

    pub fn max(&self) -> u8 {
        self.size() as u8
    }
}

impl Draw {
    /// Numéros principaux triés par ordre croissant (slot 0 = le plus petit).
    pub fn sorted_primary(&self) -> [u8; 5] {
        let mut sorted = self.primary;
        sorted.sort();
        sorted
    }

    /// Vérifie domaines et unicité sans consommer le tirage.
    pub fn is_well_formed(&self) -> bool {
        validate_draw(&self.primary, self.bonus).is_ok()
    }
}

pub fn validate_draw(primary: &[u8; 5], bonus: u8) -> Result<()> {
    for &n in primary {
        if n < 1 || n > 69 {
            bail!("Numéro {} hors limites (1-69)", n);
        }
    }
    if bonus < 1 || bonus > 26 {
        bail!("Bonus {} hors limites (1-26)", bonus);
    }
    for i in 0..primary.len() {
        for j in (i + 1)..primary.len() {
            if primary[i] == primary[j] {
                bail!("Numéro en double : {}", primary[i]);
            }
        }
    }
    Ok(())
}

/// Historique synthétique déterministe pour les tests.
/// draws[0] = le plus ancien, draws[n-1] = le plus récent (ordre chronologique).
pub fn make_test_draws(n: usize) -> Vec<Draw> {
    (0..n)
        .map(|i| {
            let base = (i % 12) as u8;
            Draw {
                date: NaiveDate::from_ymd_opt(2024, (i % 12 + 1) as u32, (i % 28 + 1) as u32)
                    .expect("date de test valide"),
                primary: [
                    (base * 5 + 1).clamp(1, 69),
                    (base * 5 + 2).clamp(1, 69),
                    (base * 5 + 3).clamp(1, 69),
                    (base * 5 + 4).clamp(1, 69),
                    (base * 5 + 5).clamp(1, 69),
                ],
                bonus: base % 26 + 1,
            }
        })
        .collect()
}
