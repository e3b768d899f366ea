use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};

use sicbo_db::models::{Category, Prediction, Round};
use sicbo_db::stats::Statistics;

use crate::ensemble::VoteDetail;
use crate::ensemble::selection::StrategyRanking;

fn category_cell(category: Category) -> Cell {
    let color = match category {
        Category::High => Color::Red,
        Category::Low => Color::Blue,
        Category::Undetermined => Color::White,
    };
    Cell::new(category.label()).fg(color)
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn display_rounds(rounds: &[Round]) {
    if rounds.is_empty() {
        println!("Aucune phiên à afficher.");
        return;
    }

    let mut table = new_table();
    table.set_header(vec!["Phiên", "Dés", "Total", "Résultat", "Observée"]);

    for round in rounds {
        let dice = round
            .dice
            .map(|d| d.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" - "))
            .unwrap_or_else(|| "—".to_string());
        table.add_row(vec![
            Cell::new(round.display_id()),
            Cell::new(dice),
            Cell::new(round.score),
            category_cell(round.category),
            Cell::new(round.observed_at.format("%Y-%m-%d %H:%M:%S").to_string()),
        ]);
    }
    println!("{table}");
}

pub fn display_predictions(predictions: &[&Prediction]) {
    if predictions.is_empty() {
        println!("Aucune prédiction à afficher.");
        return;
    }

    let mut table = new_table();
    table.set_header(vec!["Cible", "Depuis", "Prédit", "Confiance", "Stratégie", "Sorti", "Verdict"]);

    for p in predictions {
        let (actual, verdict) = match &p.outcome {
            Some(o) => (
                format!("{} ({})", o.actual_category.label(), o.actual_score),
                if o.correct { Cell::new("đúng").fg(Color::Green) } else { Cell::new("sai").fg(Color::Red) },
            ),
            None => ("—".to_string(), Cell::new("en attente")),
        };
        table.add_row(vec![
            Cell::new(format!("#{}", p.target_round_id)),
            Cell::new(format!("#{}", p.made_at_round_id)),
            category_cell(p.category),
            Cell::new(format!("{:.2}%", p.confidence)),
            Cell::new(&p.strategy_id),
            Cell::new(actual),
            verdict,
        ]);
    }
    println!("{table}");
}

pub fn display_stats(stats: &Statistics) {
    println!("\n== Statistiques ==\n");
    println!("  Résolues          : {}", stats.total_resolved);
    println!("  Justes            : {}", stats.correct_count);
    println!("  Fausses           : {}", stats.wrong_count);
    println!("  Précision         : {}", stats.accuracy);
    println!("  Série en cours    : {}", stats.current_streak);
    println!("  Meilleure série   : {}", stats.max_streak);
    println!("  Erreurs d'affilée : {}", stats.wrong_streak);
}

pub fn display_rankings(rankings: &[StrategyRanking]) {
    println!("\n== Stratégies (taux lissé) ==\n");

    let mut table = new_table();
    table.set_header(vec!["Stratégie", "Testées", "Justes", "Taux lissé"]);
    for r in rankings {
        table.add_row(vec![
            r.strategy_id.clone(),
            r.tested.to_string(),
            r.correct.to_string(),
            format!("{:.3}", r.rate),
        ]);
    }
    println!("{table}");
}

pub fn display_vote_details(details: &[VoteDetail]) {
    let mut table = new_table();
    table.set_header(vec!["Stratégie", "Avis", "Confiance", "Poids", "Puissance"]);
    for d in details {
        let category = match d.category {
            Some(c) => category_cell(c),
            None => Cell::new("—"),
        };
        table.add_row(vec![
            Cell::new(&d.strategy_id),
            category,
            Cell::new(format!("{:.2}", d.confidence)),
            Cell::new(format!("{:.1}", d.weight)),
            Cell::new(format!("{:.3}", d.power)),
        ]);
    }
    println!("{table}");
}
