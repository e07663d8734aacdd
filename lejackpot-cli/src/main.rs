mod display;
mod synthetic;

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand::rngs::StdRng;

use lejackpot_core::intervals::IntervalMethod;
use lejackpot_core::models::Draw;
use lejackpot_core::options::ValidationOptions;
use lejackpot_engine::ensemble::EnsembleCombiner;
use lejackpot_engine::methods::all_methods;
use lejackpot_engine::optimizer::{OptimizationResult, OptimizationTarget, ParameterOptimizer};
use lejackpot_engine::progress::CancelToken;
use lejackpot_engine::validator::WalkForwardValidator;

use crate::display::{
    display_history, display_optimization, display_predictions, display_validation_report,
};
use crate::synthetic::{date_seed, synthetic_history};

#[derive(Parser)]
#[command(name = "lejackpot", about = "Validation walk-forward et optimisation d'ensemble")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Valider les méthodes de prédiction par walk-forward
    Validate {
        /// Fichier JSON de tirages normalisés (sinon : historique synthétique)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Taille de l'historique synthétique
        #[arg(long, default_value = "300")]
        synthetic: usize,

        /// Taille minimale d'entraînement
        #[arg(long, default_value = "100")]
        min_training: usize,

        /// Taille du segment de test
        #[arg(long, default_value = "20")]
        test_window: usize,

        /// Avance du départ entre deux fenêtres
        #[arg(long, default_value = "10")]
        step: usize,

        /// Plafond de fenêtres
        #[arg(long, default_value = "50")]
        max_periods: usize,

        /// Itérations bootstrap
        #[arg(long, default_value = "1000")]
        iterations: usize,

        /// Niveau de confiance (0.90, 0.95 ou 0.99)
        #[arg(long, default_value = "0.95")]
        level: f64,

        /// Estimateur d'intervalle
        #[arg(short, long, default_value = "bootstrap")]
        method: IntervalMethod,

        /// Désactiver la prédiction d'ensemble
        #[arg(long)]
        no_ensemble: bool,

        /// Désactiver la mise à jour adaptative des poids
        #[arg(long)]
        no_adaptive: bool,

        /// Seed pour la reproductibilité (défaut : date du jour YYYYMMDD)
        #[arg(long)]
        seed: Option<u64>,

        /// Sauvegarder l'instantané des poids de l'ensemble
        #[arg(short, long)]
        weights: Option<PathBuf>,
    },

    /// Chercher de meilleurs paramètres par validation croisée chronologique
    Optimize {
        /// Fichier JSON de tirages normalisés (sinon : historique synthétique)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Taille de l'historique synthétique
        #[arg(long, default_value = "300")]
        synthetic: usize,

        /// Cible : frequency-offsets ou signature-weights
        #[arg(short, long, default_value = "frequency-offsets")]
        target: String,

        /// Nombre d'essais de la recherche aléatoire
        #[arg(short, long, default_value = "30")]
        iterations: usize,

        /// Nombre de plis chronologiques
        #[arg(long, default_value = "4")]
        folds: usize,

        /// Seed pour la reproductibilité (défaut : date du jour YYYYMMDD)
        #[arg(long)]
        seed: Option<u64>,

        /// Fichier de sortie JSON (écrasé seulement si le hit s'améliore)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Prédire le prochain tirage avec chaque méthode et l'ensemble
    Predict {
        /// Fichier JSON de tirages normalisés (sinon : historique synthétique)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Taille de l'historique synthétique
        #[arg(long, default_value = "300")]
        synthetic: usize,

        /// Instantané de poids issu d'une validation
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// Seed pour la reproductibilité (défaut : date du jour YYYYMMDD)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Afficher les derniers tirages de l'historique
    History {
        /// Fichier JSON de tirages normalisés (sinon : historique synthétique)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Taille de l'historique synthétique
        #[arg(long, default_value = "300")]
        synthetic: usize,

        /// Nombre de tirages à afficher
        #[arg(short, long, default_value = "10")]
        last: usize,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Validate {
            file,
            synthetic,
            min_training,
            test_window,
            step,
            max_periods,
            iterations,
            level,
            method,
            no_ensemble,
            no_adaptive,
            seed,
            weights,
        } => {
            let opts = ValidationOptions {
                min_training_size: min_training,
                test_window_size: test_window,
                step_size: step,
                max_validation_periods: max_periods,
                bootstrap_iterations: iterations,
                confidence_level: level,
                method,
                include_ensemble: !no_ensemble,
                adaptive_weighting: !no_adaptive,
                seed: Some(resolve_seed(seed)),
                ..Default::default()
            };
            cmd_validate(&file, synthetic, opts, &weights)
        }
        Command::Optimize { file, synthetic, target, iterations, folds, seed, output } => {
            cmd_optimize(&file, synthetic, &target, iterations, folds, resolve_seed(seed), &output)
        }
        Command::Predict { file, synthetic, weights, seed } => {
            cmd_predict(&file, synthetic, &weights, resolve_seed(seed))
        }
        Command::History { file, synthetic, last } => cmd_history(&file, synthetic, last),
    }
}

fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        let ds = date_seed();
        println!("(Seed du jour : {ds})");
        ds
    })
}

/// Charge l'export JSON normalisé, ou synthétise un historique à défaut.
fn load_draws(file: &Option<PathBuf>, synthetic: usize, seed: u64) -> Result<Vec<Draw>> {
    match file {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Lecture de {}", path.display()))?;
            let draws: Vec<Draw> = serde_json::from_str(&json)
                .with_context(|| format!("Format de tirages invalide dans {}", path.display()))?;
            if draws.is_empty() {
                bail!("Aucun tirage dans {}", path.display());
            }
            Ok(draws)
        }
        None => {
            println!("(Historique synthétique : {synthetic} tirages)");
            Ok(synthetic_history(synthetic, seed))
        }
    }
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("template de barre valide")
            .progress_chars("=> "),
    );
    pb
}

fn cmd_validate(
    file: &Option<PathBuf>,
    synthetic: usize,
    opts: ValidationOptions,
    weights_out: &Option<PathBuf>,
) -> Result<()> {
    let draws = load_draws(file, synthetic, opts.seed.unwrap_or(42))?;
    println!(
        "Validation de 4 méthodes sur {} tirages (train {}, test {}, pas {})...",
        draws.len(), opts.min_training_size, opts.test_window_size, opts.step_size
    );

    let (tx, rx) = mpsc::channel();
    let cancel = CancelToken::new();
    let worker_opts = opts.clone();
    let worker_draws = draws.clone();

    // Le moteur tourne hors du fil d'affichage ; seul le canal les relie
    let handle = thread::spawn(move || {
        let methods = all_methods(&worker_opts);
        let mut validator = WalkForwardValidator::new();
        validator.run(
            &worker_draws,
            &worker_opts,
            &methods,
            &mut |event| {
                let _ = tx.send(event);
            },
            &cancel,
        )
    });

    let pb = progress_bar();
    for event in rx {
        pb.set_position(event.progress as u64);
        pb.set_message(format!(
            "{} (fenêtre {}/{})",
            event.current_method,
            event.window_index + 1,
            event.total_windows
        ));
    }
    pb.finish_with_message("Validation terminée");

    let report = handle
        .join()
        .map_err(|_| anyhow::anyhow!("Le fil de validation a paniqué"))??;

    display_validation_report(&report);

    if let (Some(path), Some(states)) = (weights_out, &report.weights) {
        EnsembleCombiner::from_states(states.clone()).save(path)?;
        println!("\nPoids sauvegardés dans : {}", path.display());
    }

    Ok(())
}

fn cmd_optimize(
    file: &Option<PathBuf>,
    synthetic: usize,
    target: &str,
    iterations: usize,
    folds: usize,
    seed: u64,
    output: &Option<PathBuf>,
) -> Result<()> {
    let target: OptimizationTarget = target.parse()?;
    let draws = load_draws(file, synthetic, seed)?;
    println!(
        "Recherche aléatoire : {iterations} essais, {folds} plis sur {} tirages...",
        draws.len()
    );

    let (tx, rx) = mpsc::channel();
    let cancel = CancelToken::new();
    let worker_draws = draws.clone();

    let handle = thread::spawn(move || {
        let optimizer = ParameterOptimizer::new();
        optimizer.run(
            &worker_draws,
            target,
            iterations,
            folds,
            seed,
            &mut |event| {
                let _ = tx.send(event);
            },
            &cancel,
        )
    });

    let pb = progress_bar();
    for event in rx {
        pb.set_position(event.progress as u64);
        pb.set_message(format!(
            "{} (essai {}/{})",
            event.current_method,
            event.window_index + 1,
            event.total_windows
        ));
    }
    pb.finish_with_message("Optimisation terminée");

    let result = handle
        .join()
        .map_err(|_| anyhow::anyhow!("Le fil d'optimisation a paniqué"))??;

    display_optimization(&result);

    if let Some(path) = output {
        save_if_improved(&result, path)?;
    }

    Ok(())
}

/// N'écrase un résultat existant que si le nouveau meilleur hit le dépasse.
fn save_if_improved(result: &OptimizationResult, path: &PathBuf) -> Result<()> {
    let new_hit = match &result.best {
        Some(best) => best.performance.hit_rate,
        None => return Ok(()),
    };

    if path.exists() {
        let previous: OptimizationResult =
            serde_json::from_str(&std::fs::read_to_string(path)?)
                .with_context(|| format!("Résultat antérieur illisible : {}", path.display()))?;
        if let Some(prev_best) = &previous.best {
            if prev_best.performance.hit_rate >= new_hit {
                println!(
                    "\nRésultat conservé : hit antérieur {:.4} >= nouveau {:.4}",
                    prev_best.performance.hit_rate, new_hit
                );
                return Ok(());
            }
        }
    }

    std::fs::write(path, serde_json::to_string_pretty(result)?)?;
    println!("\nRésultat sauvegardé dans : {}", path.display());
    Ok(())
}

fn cmd_predict(
    file: &Option<PathBuf>,
    synthetic: usize,
    weights: &Option<PathBuf>,
    seed: u64,
) -> Result<()> {
    let draws = load_draws(file, synthetic, seed)?;
    let opts = ValidationOptions { seed: Some(seed), ..Default::default() };
    let methods = all_methods(&opts);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut predictions = Vec::with_capacity(methods.len() + 1);
    for method in &methods {
        let pred = method
            .predict(&draws, &mut rng)
            .with_context(|| format!("Échec de la méthode {}", method.name()))?;
        predictions.push((method.name().to_string(), pred));
    }

    let combiner = match weights {
        Some(path) if path.exists() => {
            println!("(Poids chargés depuis : {})", path.display());
            EnsembleCombiner::load(path)?
        }
        _ => {
            let names: Vec<String> = methods.iter().map(|m| m.name().to_string()).collect();
            EnsembleCombiner::new(&names)
        }
    };
    let combined = combiner.combine(&predictions);
    predictions.push(("Ensemble".to_string(), combined));

    display_predictions(&predictions);
    println!("\nAucune garantie de gain : exercice statistique uniquement.");
    Ok(())
}

fn cmd_history(file: &Option<PathBuf>, synthetic: usize, last: usize) -> Result<()> {
    let draws = load_draws(file, synthetic, date_seed())?;
    let start = draws.len().saturating_sub(last);
    display_history(&draws[start..]);
    Ok(())
}
