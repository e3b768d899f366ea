use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, warn};
use tokio::sync::{Notify, watch};

use sicbo_db::store::save_store;

use crate::state::AppState;

/// Écriture différée de l'état : les écrivains signalent, une tâche unique écrit.
pub struct Persister {
    path: PathBuf,
    delay: Duration,
    dirty: AtomicBool,
    notify: Notify,
}

impl Persister {
    pub fn new(path: PathBuf, delay: Duration) -> Self {
        Self {
            path,
            delay,
            dirty: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    async fn dirty_signal(&self) {
        self.notify.notified().await
    }
}

/// Photographie l'état sous le verrou de lecture et l'écrit hors du runtime.
pub async fn flush(state: &AppState) -> Result<()> {
    let persister = &state.persister;
    persister.dirty.store(false, Ordering::SeqCst);
    let snapshot = state.snapshot().await;
    let path = persister.path.clone();
    let written = tokio::task::spawn_blocking(move || save_store(&snapshot, &path))
        .await
        .context("Tâche d'écriture interrompue")
        .and_then(|r| r);
    if written.is_err() {
        // Nouvel essai au prochain passage
        persister.dirty.store(true, Ordering::SeqCst);
    } else {
        debug!("État écrit dans {:?}", persister.path);
    }
    written
}

/// Boucle d'écriture différée, avec une dernière écriture à l'arrêt.
pub async fn run_flusher(state: &AppState, mut shutdown: watch::Receiver<bool>) {
    let persister = &state.persister;
    loop {
        tokio::select! {
            _ = persister.dirty_signal() => {}
            _ = shutdown.changed() => break,
        }
        tokio::select! {
            _ = tokio::time::sleep(persister.delay) => {}
            _ = shutdown.changed() => break,
        }
        if persister.is_dirty() {
            if let Err(e) = flush(state).await {
                warn!("Écriture de l'état impossible : {:#}", e);
            }
        }
    }

    if persister.is_dirty() {
        if let Err(e) = flush(state).await {
            error!("Écriture finale de l'état impossible : {:#}", e);
        }
    }
}
