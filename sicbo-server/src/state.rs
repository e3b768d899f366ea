use log::info;
use tokio::sync::RwLock;

use sicbo_db::store::Store;
use sicbo_ensemble::engine::PredictionEngine;
use sicbo_ensemble::tracker::Tracker;

use crate::config::Config;
use crate::persist::Persister;

/// État partagé du service : un seul verrou autour de tout le `Store`.
pub struct AppState {
    pub config: Config,
    pub store: RwLock<Store>,
    pub tracker: Tracker,
    pub persister: Persister,
}

impl AppState {
    pub fn new(config: Config, store: Store) -> Self {
        let engine = PredictionEngine::with_policy(config.policy(), config.window);
        let tracker = Tracker::new(engine, config.auto_reset_after);
        let persister = Persister::new(config.data_file.clone(), config.flush_delay());
        Self {
            config,
            store: RwLock::new(store),
            tracker,
            persister,
        }
    }

    /// Copie cohérente de l'état, prise sous le verrou de lecture.
    pub async fn snapshot(&self) -> Store {
        self.store.read().await.clone()
    }

    pub async fn reset(&self, clear_history: bool) {
        {
            let mut store = self.store.write().await;
            store.reset(clear_history);
        }
        self.persister.mark_dirty();
        info!(
            "Prédictions et statistiques remises à zéro{}",
            if clear_history { " (historique compris)" } else { "" }
        );
    }
}
