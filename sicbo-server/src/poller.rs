use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use sicbo_ensemble::tracker::CycleReport;

use crate::error::SourceError;
use crate::source::{RetryPolicy, RoundSource, fetch_with_retry};
use crate::state::AppState;

/// Un cycle complet : collecte hors verrou, puis toute la mutation sous le verrou d'écriture.
pub async fn poll_once(
    state: &AppState,
    source: &dyn RoundSource,
    retry: RetryPolicy,
) -> Result<CycleReport, SourceError> {
    let rounds = fetch_with_retry(source, retry).await?;
    let report = {
        let mut store = state.store.write().await;
        state.tracker.ingest(&mut store, &rounds)
    };
    if report.changed() {
        state.persister.mark_dirty();
    }
    Ok(report)
}

/// Boucle de collecte ; les cycles s'enchaînent dans une seule tâche, les ticks en retard sont sautés.
pub async fn run_poller(
    state: Arc<AppState>,
    source: Arc<dyn RoundSource>,
    mut shutdown: watch::Receiver<bool>,
) {
    let retry = RetryPolicy {
        retries: state.config.retries,
        backoff: state.config.backoff(),
    };
    let mut ticker = tokio::time::interval(state.config.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("Collecte toutes les {:?} depuis {}", state.config.interval(), state.config.source_url);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }

        match poll_once(&state, source.as_ref(), retry).await {
            Ok(report) if report.changed() => debug!(
                "Cycle : {} ajoutée(s), {} résolue(s), prédiction créée : {}",
                report.added.len(),
                report.resolved.len(),
                report.created.is_some()
            ),
            Ok(_) => debug!("Cycle sans nouveauté"),
            Err(SourceError::Empty) => debug!("Source vide, cycle ignoré"),
            Err(e) => warn!("Cycle ignoré : {}", e),
        }

        if *shutdown.borrow() {
            break;
        }
    }
    info!("Collecte arrêtée");
}
