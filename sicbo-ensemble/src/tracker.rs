use log::{debug, info, warn};
use sicbo_db::models::{Prediction, Round};
use sicbo_db::store::Store;

use crate::engine::PredictionEngine;

/// Résultat d'un cycle d'ingestion.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Ids des phiên ajoutées, la plus récente en premier.
    pub added: Vec<u64>,
    /// Prédictions résolues pendant le cycle, dans l'ordre chronologique.
    pub resolved: Vec<Prediction>,
    pub created: Option<Prediction>,
    pub auto_reset: bool,
}

impl CycleReport {
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.resolved.is_empty() || self.created.is_some() || self.auto_reset
    }
}

/// Enchaîne fusion → résolution → statistiques → prédiction sur un `Store` possédé par l'appelant.
pub struct Tracker {
    engine: PredictionEngine,
    auto_reset_after: Option<u32>,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(PredictionEngine::default(), None)
    }
}

impl Tracker {
    /// `auto_reset_after` : remise à zéro du registre après N erreurs consécutives (désactivé si None).
    pub fn new(engine: PredictionEngine, auto_reset_after: Option<u32>) -> Self {
        Self {
            engine,
            auto_reset_after: auto_reset_after.filter(|&n| n > 0),
        }
    }

    pub fn engine(&self) -> &PredictionEngine {
        &self.engine
    }

    pub fn ingest(&self, store: &mut Store, candidates: &[Round]) -> CycleReport {
        let mut report = CycleReport::default();

        let added = store.history.merge(candidates);
        report.added = added.iter().map(|r| r.id).collect();
        if !added.is_empty() {
            info!("{} nouvelle(s) phiên, dernière : #{}", added.len(), added[0].id);
        }

        // Du plus ancien au plus récent, pour que les séries suivent la chronologie
        for round in added.iter().rev() {
            if let Some(prediction) = store.predictions.resolve(round) {
                store.stats.record(&prediction);
                info!(
                    "Phiên #{} : prédit {}, sorti {} ({}) → {}",
                    round.id,
                    prediction.category.label(),
                    round.category.label(),
                    round.score,
                    if prediction.is_correct() == Some(true) { "đúng" } else { "sai" }
                );
                report.resolved.push(prediction);
            }
        }

        if let Some(limit) = self.auto_reset_after {
            if store.stats.wrong_streak >= limit {
                warn!("{} erreurs consécutives, remise à zéro des prédictions", store.stats.wrong_streak);
                store.reset(false);
                report.auto_reset = true;
            }
        }

        report.created = self.predict_next(store);
        report
    }

    /// Crée la prédiction en attente pour la phiên suivant la plus récente, si elle n'existe pas.
    pub fn predict_next(&self, store: &mut Store) -> Option<Prediction> {
        let latest = store.history.latest()?.id;
        let target = latest + 1;
        if store.predictions.find(target).is_some() {
            return None;
        }

        let output = self.engine.predict(store.history.rounds(), &store.stats);
        let Some(draft) = output.chosen else {
            debug!("Pas de signal pour la phiên #{}", target);
            return None;
        };
        let created = store
            .predictions
            .create_if_absent(target, latest, &draft, output.votes)
            .cloned();
        if let Some(p) = &created {
            info!(
                "Prédiction #{} : {} ({:.2}%, {})",
                p.target_round_id,
                p.category.label(),
                p.confidence,
                p.strategy_id
            );
        }
        created
    }
}
