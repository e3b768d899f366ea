use log::warn;
use serde::{Deserialize, Serialize};

use crate::models::Round;

pub const DEFAULT_CAPACITY: usize = 50;

/// Historique des phiên résolues. rounds[0] = la plus récente, ids strictement décroissants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryLog {
    rounds: Vec<Round>,
    capacity: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            rounds: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Reconstruit un historique persisté : tri décroissant, doublons retirés, plafonné.
    pub fn from_rounds(mut rounds: Vec<Round>, capacity: usize) -> Self {
        rounds.sort_by(|a, b| b.id.cmp(&a.id));
        rounds.dedup_by_key(|r| r.id);
        let mut log = Self { rounds, capacity: capacity.max(1) };
        log.truncate();
        log
    }

    /// Fusionne un lot reçu (du plus récent au plus ancien).
    /// Retourne les phiên réellement ajoutées, du plus récent au plus ancien.
    pub fn merge(&mut self, candidates: &[Round]) -> Vec<Round> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let Some(newest_known) = self.latest().map(|r| r.id) else {
            // Chargement initial : on accepte tout le lot
            let mut added = candidates.to_vec();
            added.sort_by(|a, b| b.id.cmp(&a.id));
            added.dedup_by_key(|r| r.id);
            added.truncate(self.capacity);
            self.rounds = added.clone();
            return added;
        };

        let Some(idx) = candidates.iter().position(|r| r.id == newest_known) else {
            warn!(
                "Phiên {} introuvable dans le lot reçu ({} phiên), fusion ignorée",
                newest_known,
                candidates.len()
            );
            return Vec::new();
        };

        let mut added: Vec<Round> = Vec::with_capacity(idx);
        for round in &candidates[..idx] {
            let in_order = added.last().map_or(true, |prev: &Round| round.id < prev.id);
            if round.id > newest_known && in_order {
                added.push(round.clone());
            } else {
                warn!("Phiên {} hors séquence, ignorée", round.id);
            }
        }

        if added.is_empty() {
            return added;
        }

        let mut merged = added.clone();
        merged.append(&mut self.rounds);
        self.rounds = merged;
        self.truncate();
        added
    }

    fn truncate(&mut self) {
        if self.rounds.len() > self.capacity {
            self.rounds.truncate(self.capacity);
        }
    }

    pub fn window(&self, n: usize) -> &[Round] {
        &self.rounds[..n.min(self.rounds.len())]
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn latest(&self) -> Option<&Round> {
        self.rounds.first()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.truncate();
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn clear(&mut self) {
        self.rounds.clear();
    }
}
