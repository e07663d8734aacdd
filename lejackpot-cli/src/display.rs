use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};

use lejackpot_core::models::Draw;
use lejackpot_engine::ensemble::MethodState;
use lejackpot_engine::methods::Prediction;
use lejackpot_engine::optimizer::OptimizationResult;
use lejackpot_engine::validator::{MethodReport, ValidationReport};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn numbers_str(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{:2}", n))
        .collect::<Vec<_>>()
        .join(" - ")
}

pub fn display_history(draws: &[Draw]) {
    if draws.is_empty() {
        println!("Aucun tirage à afficher.");
        return;
    }

    let mut table = new_table(vec!["Date", "Numéros", "Bonus"]);
    for draw in draws {
        table.add_row(vec![
            draw.date.to_string(),
            numbers_str(&draw.sorted_primary()),
            format!("{:2}", draw.bonus),
        ]);
    }
    println!("{table}");
}

fn summary_row(report: &MethodReport, best_composite: f64) -> Vec<Cell> {
    let s = &report.summary;
    let calibration = s
        .calibration
        .as_ref()
        .map(|c| format!("{:.1} % (écart {:.3})", c.observed_coverage * 100.0, c.calibration_error))
        .unwrap_or_else(|| "—".to_string());

    let composite = Cell::new(format!("{:.4}", s.composite_score));
    let composite = if (s.composite_score - best_composite).abs() < 1e-12 {
        composite.fg(Color::Green)
    } else {
        composite
    };

    vec![
        Cell::new(&report.name),
        Cell::new(s.predictions.to_string()),
        Cell::new(format!("{:.3}", s.avg_matches)),
        Cell::new(format!("{:.1} %", s.hit_rate * 100.0)),
        Cell::new(format!("{:.1} %", s.win_rate * 100.0)),
        Cell::new(format!("{:.3}", s.consistency)),
        composite,
        Cell::new(calibration),
        Cell::new(report.failures.to_string()),
    ]
}

pub fn display_validation_report(report: &ValidationReport) {
    if report.cancelled {
        println!(
            "\n⚠ Run annulé : {}/{} fenêtres complétées, résultats partiels\n",
            report.completed_windows, report.total_windows
        );
    } else {
        println!("\n📊 Validation walk-forward : {} fenêtres\n", report.total_windows);
    }

    let mut table = new_table(vec![
        "Méthode", "Prédictions", "Moy. matches", "Hit (≥3)", "Gain",
        "Régularité", "Score", "Calibration", "Échecs",
    ]);

    let best_composite = report
        .methods
        .iter()
        .chain(report.ensemble.iter())
        .map(|r| r.summary.composite_score)
        .fold(f64::NEG_INFINITY, f64::max);

    for method in &report.methods {
        table.add_row(summary_row(method, best_composite));
    }
    if let Some(ensemble) = &report.ensemble {
        table.add_row(summary_row(ensemble, best_composite));
    }
    println!("{table}");

    if let Some(weights) = &report.weights {
        display_weights(weights);
    }
}

pub fn display_weights(states: &[MethodState]) {
    println!("\n── Poids de l'ensemble ──");
    let mut table = new_table(vec!["Méthode", "Poids", "Score lissé"]);
    for state in states {
        table.add_row(vec![
            state.name.clone(),
            format!("{:.4}", state.weight),
            format!("{:.4}", state.rolling_score),
        ]);
    }
    println!("{table}");
}

pub fn display_optimization(result: &OptimizationResult) {
    if result.cancelled {
        println!("\n⚠ Optimisation annulée : {} essais complétés\n", result.trials.len());
    } else {
        println!("\n🔍 Optimisation : {} essais\n", result.trials.len());
    }

    let mut table = new_table(vec!["Essai", "Hit", "Moy. matches", "Régularité", "Stabilité (σ hit)"]);
    for trial in &result.trials {
        let p = &trial.performance;
        table.add_row(vec![
            trial.iteration.to_string(),
            format!("{:.4}", p.hit_rate),
            format!("{:.3}", p.avg_matches),
            format!("{:.3}", p.consistency),
            format!("{:.4}", p.hit_rate_std),
        ]);
    }
    println!("{table}");

    if let Some(best) = &result.best {
        println!("\n── Meilleur essai (n° {}) ──", best.iteration);
        let mut table = new_table(vec!["Paramètre", "Valeur"]);
        let mut params: Vec<_> = best.params.iter().collect();
        params.sort_by(|a, b| a.0.cmp(b.0));
        for (name, value) in params {
            table.add_row(vec![name.clone(), format!("{:.4}", value)]);
        }
        println!("{table}");

        println!(
            "\nAmélioration sur la référence : {:+.4} (hit {:.4})",
            result.improvement_over_baseline, best.performance.hit_rate
        );
    }

    if let Some(interval) = &result.hit_rate_interval {
        println!(
            "Taux de hit des essais, IC 95 % : [{:.4} ; {:.4}]",
            interval.lower, interval.upper
        );
    }
}

pub fn display_predictions(predictions: &[(String, Prediction)]) {
    println!("\n🎲 Prédictions par méthode\n");

    let mut table = new_table(vec!["Méthode", "Numéros", "Bonus", "Confiance"]);
    for (name, pred) in predictions {
        table.add_row(vec![
            name.clone(),
            numbers_str(&pred.primary),
            format!("{:2}", pred.bonus),
            format!("{:.3}", pred.confidence),
        ]);
    }
    println!("{table}");
}
