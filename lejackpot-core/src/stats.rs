use rand::Rng;
use rand::rngs::StdRng;

/// Moyenne arithmétique. Entrée vide = responsabilité de l'appelant.
pub fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

/// Médiane : moyenne des deux éléments centraux si la longueur est paire.
pub fn median(data: &[f64]) -> f64 {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Écart-type de population (division par n, pas n-1).
pub fn std_dev(data: &[f64]) -> f64 {
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64;
    variance.sqrt()
}

/// Moyenne pondérée. Les poids n'ont pas besoin d'être normalisés.
pub fn weighted_mean(data: &[f64], weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    data.iter()
        .zip(weights.iter())
        .map(|(x, w)| x * w)
        .sum::<f64>()
        / total
}

/// Variance pondérée autour de la moyenne pondérée, normalisée par la somme
/// des poids.
pub fn weighted_variance(data: &[f64], weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    let wm = weighted_mean(data, weights);
    data.iter()
        .zip(weights.iter())
        .map(|(x, w)| w * (x - wm).powi(2))
        .sum::<f64>()
        / total
}

/// Valeur z pour les niveaux de confiance usuels. Tout niveau non reconnu
/// retombe sur la valeur 95 %.
pub fn z_score(confidence_level: f64) -> f64 {
    if (confidence_level - 0.90).abs() < 1e-9 {
        1.645
    } else if (confidence_level - 0.99).abs() < 1e-9 {
        2.576
    } else {
        1.960
    }
}

/// Rééchantillonnage avec remise : tire `data.len()` éléments uniformément
/// dans `data`. Le RNG est injecté pour rester déterministe en test.
pub fn resample(data: &[f64], rng: &mut StdRng) -> Vec<f64> {
    (0..data.len())
        .map(|_| data[rng.random_range(0..data.len())])
        .collect()
}
