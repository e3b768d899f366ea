pub mod api;
pub mod config;
pub mod error;
pub mod persist;
pub mod poller;
pub mod source;
pub mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use sicbo_db::store::load_or_default;

use crate::config::Config;
use crate::persist::run_flusher;
use crate::poller::run_poller;
use crate::source::{HttpSource, RoundSource};
use crate::state::AppState;

/// Tâches de fond du service : collecte et écriture différée.
pub struct Workers {
    stop_poller: watch::Sender<bool>,
    stop_flusher: watch::Sender<bool>,
    poller: JoinHandle<()>,
    flusher: JoinHandle<()>,
}

impl Workers {
    pub fn spawn(state: Arc<AppState>, source: Arc<dyn RoundSource>) -> Self {
        let (stop_poller, poller_rx) = watch::channel(false);
        let (stop_flusher, flusher_rx) = watch::channel(false);
        let poller = tokio::spawn(run_poller(state.clone(), source, poller_rx));
        let flusher = tokio::spawn(async move { run_flusher(&state, flusher_rx).await });
        Self {
            stop_poller,
            stop_flusher,
            poller,
            flusher,
        }
    }

    /// Récepteur suivant l'arrêt de la collecte, pour les autres tâches du service.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.stop_poller.subscribe()
    }

    /// Arrête la collecte, attend la fin du cycle en cours, puis seulement l'écriture finale.
    pub async fn stop(self) {
        let _ = self.stop_poller.send(true);
        if let Err(e) = self.poller.await {
            warn!("Tâche de collecte interrompue : {}", e);
        }
        let _ = self.stop_flusher.send(true);
        if let Err(e) = self.flusher.await {
            warn!("Tâche d'écriture interrompue : {}", e);
        }
    }
}

/// Lance la collecte, l'écriture différée et le serveur HTTP jusqu'à Ctrl-C.
pub async fn run(config: Config) -> Result<()> {
    config.validate()?;
    let store = load_or_default(&config.data_file, config.max_history);
    let source: Arc<dyn RoundSource> = Arc::new(HttpSource::new(&config.source_url, config.timeout())?);
    let state = Arc::new(AppState::new(config, store));
    info!(
        "Politique {}, fenêtre {}, arrêt auto après {} erreur(s)",
        state.tracker.engine().policy(),
        state.tracker.engine().window(),
        state
            .config
            .auto_reset_after
            .map_or_else(|| "∞".to_string(), |n| n.to_string())
    );

    let workers = Workers::spawn(state.clone(), source);
    let mut server = tokio::spawn(api::serve(state.clone(), workers.subscribe()));

    let mut finished = None;
    let signal_failed = tokio::select! {
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => {
                info!("Arrêt demandé");
                false
            }
            Err(e) => {
                warn!("Écoute de Ctrl-C impossible : {}", e);
                true
            }
        },
        served = &mut server => {
            finished = Some(served);
            false
        }
    };
    if signal_failed {
        finished = Some((&mut server).await);
    }

    workers.stop().await;
    let served = match finished {
        Some(served) => served,
        None => server.await,
    };
    served.context("Tâche serveur interrompue")??;
    info!("Arrêt terminé");
    Ok(())
}
