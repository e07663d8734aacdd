use chrono::{Datelike, Duration, NaiveDate};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use lejackpot_core::models::Draw;

/// Génère un seed déterministe basé sur la date du jour (YYYYMMDD).
pub fn date_seed() -> u64 {
    let today = chrono::Local::now().date_naive();
    let y = today.year() as u64;
    let m = today.month() as u64;
    let d = today.day() as u64;
    y * 10_000 + m * 100 + d
}

/// Historique synthétique aléatoire : `n` tirages uniformes valides, un tous
/// les trois jours, le plus ancien en premier.
pub fn synthetic_history(n: usize, seed: u64) -> Vec<Draw> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).expect("date de départ valide");

    (0..n)
        .map(|i| {
            let mut primary = [0u8; 5];
            let mut k = 0;
            while k < 5 {
                let candidate = rng.random_range(1..=69u8);
                if !primary[..k].contains(&candidate) {
                    primary[k] = candidate;
                    k += 1;
                }
            }
            primary.sort();

            Draw {
                date: start + Duration::days(3 * i as i64),
                primary,
                bonus: rng.random_range(1..=26u8),
            }
        })
        .collect()
}
