use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::models::{Draft, Outcome, Prediction, PredictionStatus, Round, Vote};

/// Registre des prédictions, dans l'ordre de création.
/// Invariant : au plus une prédiction par phiên cible (donc au plus une en attente).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    predictions: Vec<Prediction>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruit un registre persisté en écartant les doublons de cible (la première gagne).
    pub fn from_predictions(predictions: Vec<Prediction>) -> Self {
        let mut ledger = Self::new();
        for p in predictions {
            if ledger.find(p.target_round_id).is_some() {
                warn!("Prédiction en double pour la phiên {}, ignorée au chargement", p.target_round_id);
                continue;
            }
            ledger.predictions.push(p);
        }
        ledger
    }

    /// Crée une prédiction en attente pour `target`, sauf si la cible est déjà couverte.
    pub fn create_if_absent(
        &mut self,
        target: u64,
        made_at: u64,
        draft: &Draft,
        votes: Vec<Vote>,
    ) -> Option<&Prediction> {
        if target <= made_at {
            warn!("Cible {} non postérieure à la phiên {}, prédiction refusée", target, made_at);
            return None;
        }
        if !draft.category.is_determined() {
            warn!("Prédiction sans catégorie pour la phiên {}, refusée", target);
            return None;
        }
        if let Some(existing) = self.find(target) {
            debug!("Phiên {} déjà prédite ({:?}), rien à faire", target, existing.status);
            return None;
        }

        self.predictions.push(Prediction {
            target_round_id: target,
            made_at_round_id: made_at,
            category: draft.category,
            confidence: draft.confidence,
            strategy_id: draft.strategy_id.clone(),
            votes,
            status: PredictionStatus::Pending,
            outcome: None,
            created_at: Utc::now(),
            resolved_at: None,
        });
        self.predictions.last()
    }

    /// Résout la prédiction en attente dont la cible est `round.id`.
    /// Aucune prédiction correspondante n'est pas une erreur (démarrage, reset).
    pub fn resolve(&mut self, round: &Round) -> Option<Prediction> {
        let prediction = self
            .predictions
            .iter_mut()
            .find(|p| p.target_round_id == round.id && p.is_pending())?;

        prediction.status = PredictionStatus::Resolved;
        prediction.outcome = Some(Outcome {
            correct: prediction.category == round.category,
            actual_category: round.category,
            actual_score: round.score,
        });
        prediction.resolved_at = Some(Utc::now());
        Some(prediction.clone())
    }

    pub fn find(&self, target: u64) -> Option<&Prediction> {
        self.predictions.iter().find(|p| p.target_round_id == target)
    }

    pub fn pending_for(&self, target: u64) -> Option<&Prediction> {
        self.predictions
            .iter()
            .find(|p| p.target_round_id == target && p.is_pending())
    }

    pub fn pending(&self) -> impl Iterator<Item = &Prediction> {
        self.predictions.iter().filter(|p| p.is_pending())
    }

    /// Prédictions résolues, par cible croissante.
    pub fn resolved_chronological(&self) -> Vec<&Prediction> {
        let mut resolved: Vec<&Prediction> = self
            .predictions
            .iter()
            .filter(|p| p.status == PredictionStatus::Resolved)
            .collect();
        resolved.sort_by_key(|p| p.target_round_id);
        resolved
    }

    /// Toutes les prédictions, cible la plus récente en premier.
    pub fn newest_first(&self) -> Vec<&Prediction> {
        let mut all: Vec<&Prediction> = self.predictions.iter().collect();
        all.sort_by(|a, b| b.target_round_id.cmp(&a.target_round_id));
        all
    }

    pub fn iter(&self) -> impl Iterator<Item = &Prediction> {
        self.predictions.iter()
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    pub fn clear(&mut self) {
        self.predictions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, test_round};

    fn draft(category: Category) -> Draft {
        Draft::new(category, 60.0, "Test")
    }

    fn pending_count(ledger: &Ledger, target: u64) -> usize {
        ledger.iter().filter(|p| p.target_round_id == target && p.is_pending()).count()
    }

    #[test]
    fn test_create_if_absent_creates_pending() {
        let mut ledger = Ledger::new();
        let p = ledger.create_if_absent(104, 103, &draft(Category::High), vec![]).unwrap();
        assert_eq!(p.target_round_id, 104);
        assert_eq!(p.made_at_round_id, 103);
        assert!(p.is_pending());
        assert!(p.outcome.is_none());
    }

    #[test]
    fn test_create_if_absent_is_noop_when_pending_exists() {
        let mut ledger = Ledger::new();
        assert!(ledger.create_if_absent(104, 103, &draft(Category::High), vec![]).is_some());
        assert!(ledger.create_if_absent(104, 103, &draft(Category::Low), vec![]).is_none());
        assert_eq!(pending_count(&ledger, 104), 1);
        assert_eq!(ledger.pending_for(104).unwrap().category, Category::High);
    }

    #[test]
    fn test_create_refuses_stale_target() {
        let mut ledger = Ledger::new();
        assert!(ledger.create_if_absent(103, 103, &draft(Category::High), vec![]).is_none());
        assert!(ledger.create_if_absent(100, 103, &draft(Category::High), vec![]).is_none());
        assert!(ledger.create_if_absent(104, 103, &draft(Category::Undetermined), vec![]).is_none());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_resolve_correct_low() {
        let mut ledger = Ledger::new();
        ledger.create_if_absent(104, 103, &draft(Category::Low), vec![]);
        let resolved = ledger.resolve(&test_round(104, 5)).unwrap();
        assert_eq!(resolved.status, PredictionStatus::Resolved);
        assert_eq!(resolved.is_correct(), Some(true));
        assert_eq!(resolved.outcome.unwrap().actual_category, Category::Low);
    }

    #[test]
    fn test_resolve_wrong_when_high() {
        let mut ledger = Ledger::new();
        ledger.create_if_absent(104, 103, &draft(Category::Low), vec![]);
        let resolved = ledger.resolve(&test_round(104, 14)).unwrap();
        assert_eq!(resolved.is_correct(), Some(false));
        assert_eq!(resolved.outcome.unwrap().actual_score, 14);
    }

    #[test]
    fn test_resolve_happens_once() {
        let mut ledger = Ledger::new();
        ledger.create_if_absent(104, 103, &draft(Category::Low), vec![]);
        assert!(ledger.resolve(&test_round(104, 5)).is_some());
        assert!(ledger.resolve(&test_round(104, 14)).is_none());
        assert_eq!(ledger.find(104).unwrap().is_correct(), Some(true));
        // Une cible résolue ne peut pas être reprédite
        assert!(ledger.create_if_absent(104, 103, &draft(Category::High), vec![]).is_none());
    }

    #[test]
    fn test_resolve_without_prediction_is_none() {
        let mut ledger = Ledger::new();
        assert!(ledger.resolve(&test_round(104, 5)).is_none());
    }

    #[test]
    fn test_from_predictions_drops_duplicates() {
        let mut ledger = Ledger::new();
        ledger.create_if_absent(104, 103, &draft(Category::Low), vec![]);
        let mut raw: Vec<Prediction> = ledger.iter().cloned().collect();
        raw.push(raw[0].clone());
        let rebuilt = Ledger::from_predictions(raw);
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(pending_count(&rebuilt, 104), 1);
    }

    #[test]
    fn test_resolved_chronological_order() {
        let mut ledger = Ledger::new();
        ledger.create_if_absent(106, 105, &draft(Category::Low), vec![]);
        ledger.create_if_absent(104, 103, &draft(Category::Low), vec![]);
        ledger.resolve(&test_round(106, 5));
        ledger.resolve(&test_round(104, 5));
        let order: Vec<u64> = ledger.resolved_chronological().iter().map(|p| p.target_round_id).collect();
        assert_eq!(order, vec![104, 106]);
    }
}
