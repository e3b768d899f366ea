use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};

use sicbo_db::store::{Store, load_store, save_store};
use sicbo_ensemble::analysis::detect_pattern;
use sicbo_ensemble::display;
use sicbo_ensemble::engine::PredictionEngine;
use sicbo_ensemble::ensemble::selection::rank_strategies;
use sicbo_server::api::vote_details;
use sicbo_server::config::{Config, DEFAULT_SOURCE_URL};

#[derive(Parser)]
#[command(name = "sicbo", about = "Suivi des phiên Sicbo et prédictions Tài/Xỉu")]
struct Cli {
    /// Fichier d'état JSON
    #[arg(long, global = true, env = "SICBO_DATA_FILE", default_value = "data/sicbo.json")]
    data_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lancer la collecte et l'API HTTP
    Serve {
        #[arg(long, env = "SICBO_PORT", default_value = "3000")]
        port: u16,
        #[arg(long, env = "SICBO_SOURCE_URL", default_value = DEFAULT_SOURCE_URL)]
        source_url: String,
        /// Intervalle de collecte (ms)
        #[arg(long, env = "SICBO_INTERVAL_MS", default_value = "15000")]
        interval_ms: u64,
        /// Délai maximal d'une requête (ms)
        #[arg(long, env = "SICBO_TIMEOUT_MS", default_value = "10000")]
        timeout_ms: u64,
        #[arg(long, env = "SICBO_RETRIES", default_value = "2")]
        retries: u32,
        #[arg(long, env = "SICBO_BACKOFF_MS", default_value = "500")]
        backoff_ms: u64,
        #[arg(long, env = "SICBO_FLUSH_DELAY_MS", default_value = "1000")]
        flush_delay_ms: u64,
        /// Nombre maximal de phiên conservées
        #[arg(long, env = "SICBO_MAX_HISTORY", default_value = "50")]
        max_history: usize,
        /// Fenêtre lue par les stratégies
        #[arg(long, env = "SICBO_WINDOW", default_value = "50")]
        window: usize,
        /// Stratégie officielle, ou "best" pour la mieux classée
        #[arg(long, env = "SICBO_STRATEGY", default_value = "Ensemble")]
        strategy: String,
        /// Remise à zéro après N erreurs consécutives
        #[arg(long, env = "SICBO_AUTO_RESET_AFTER")]
        auto_reset_after: Option<u32>,
    },

    /// Afficher les dernières phiên
    History {
        #[arg(short, long, default_value = "10")]
        last: usize,
    },

    /// Afficher les dernières prédictions
    Predictions {
        #[arg(short, long, default_value = "10")]
        last: usize,
    },

    /// Afficher la dernière phiên, le cầu et le vote de l'ensemble
    Latest {
        /// Fenêtre lue par les stratégies
        #[arg(long, env = "SICBO_WINDOW", default_value = "50")]
        window: usize,
    },

    /// Afficher les statistiques et le classement des stratégies
    Stats,

    /// Effacer les prédictions et les statistiques
    Reset {
        #[arg(long)]
        yes: bool,
        /// Effacer aussi l'historique
        #[arg(long)]
        clear_history: bool,
    },
}

fn open_store(path: &Path) -> Result<Store> {
    if !path.exists() {
        bail!("Aucun état dans {:?}. Lancez d'abord `sicbo serve`.", path);
    }
    load_store(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            source_url,
            interval_ms,
            timeout_ms,
            retries,
            backoff_ms,
            flush_delay_ms,
            max_history,
            window,
            strategy,
            auto_reset_after,
        } => {
            let config = Config {
                port,
                source_url,
                data_file: cli.data_file,
                interval_ms,
                timeout_ms,
                retries,
                backoff_ms,
                flush_delay_ms,
                max_history,
                window,
                strategy,
                auto_reset_after,
            };
            sicbo_server::run(config).await
        }
        Command::History { last } => cmd_history(&cli.data_file, last),
        Command::Predictions { last } => cmd_predictions(&cli.data_file, last),
        Command::Latest { window } => cmd_latest(&cli.data_file, window),
        Command::Stats => cmd_stats(&cli.data_file),
        Command::Reset { yes, clear_history } => cmd_reset(&cli.data_file, yes, clear_history),
    }
}

fn cmd_history(path: &Path, last: usize) -> Result<()> {
    let store = open_store(path)?;
    display::display_rounds(store.history.window(last));
    Ok(())
}

fn cmd_predictions(path: &Path, last: usize) -> Result<()> {
    let store = open_store(path)?;
    let predictions = store.predictions.newest_first();
    display::display_predictions(&predictions[..last.min(predictions.len())]);
    Ok(())
}

fn cmd_latest(path: &Path, window: usize) -> Result<()> {
    let store = open_store(path)?;
    let Some(latest) = store.history.latest() else {
        bail!("Historique vide.");
    };
    display::display_rounds(std::slice::from_ref(latest));
    println!("\nLoại cầu : {}", detect_pattern(store.history.rounds()));

    match store.predictions.pending_for(latest.id + 1) {
        Some(p) => println!(
            "Dự đoán #{} : {} ({:.2}%, {})\n",
            p.target_round_id,
            p.category.label(),
            p.confidence,
            p.strategy_id
        ),
        None => println!("Pas de prédiction pour #{}\n", latest.id + 1),
    }

    display::display_vote_details(&vote_details(&store, window.max(1)));
    Ok(())
}

fn cmd_stats(path: &Path) -> Result<()> {
    let store = open_store(path)?;
    display::display_stats(&store.stats);
    let engine = PredictionEngine::default();
    display::display_rankings(&rank_strategies(&engine.strategy_names(), &store.stats));
    Ok(())
}

fn cmd_reset(path: &Path, yes: bool, clear_history: bool) -> Result<()> {
    if !yes {
        bail!("Remise à zéro non confirmée : relancez avec --yes");
    }
    let mut store = open_store(path)?;
    store.reset(clear_history);
    save_store(&store, path)?;
    println!(
        "Prédictions et statistiques effacées{}.",
        if clear_history { ", historique compris" } else { "" }
    );
    Ok(())
}
