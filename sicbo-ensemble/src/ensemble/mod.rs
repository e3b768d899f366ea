pub mod selection;

use std::collections::HashMap;

use serde::Serialize;
use sicbo_db::models::{Category, Draft, Round};
use crate::models::{Strategy, weighted_strategies};

/// Vote pondéré des stratégies de base : chaque avis pèse confiance/100 × poids.
pub struct EnsembleStrategy {
    pub members: Vec<Box<dyn Strategy>>,
    pub weights: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoteDetail {
    pub strategy_id: String,
    pub category: Option<Category>,
    pub confidence: f64,
    pub weight: f64,
    pub power: f64,
}

impl Default for EnsembleStrategy {
    fn default() -> Self {
        let (members, weights) = weighted_strategies().into_iter().unzip();
        Self { members, weights }
    }
}

impl EnsembleStrategy {
    pub fn with_weights(members: Vec<Box<dyn Strategy>>, weights: Vec<f64>) -> Self {
        Self { members, weights }
    }

    /// Détail du vote de chaque membre (catégorie absente = pas de signal).
    pub fn vote_details(&self, window: &[Round]) -> Vec<VoteDetail> {
        self.members
            .iter()
            .zip(self.weights.iter())
            .map(|(member, &weight)| match member.predict(window) {
                Some(draft) => {
                    let power = draft.confidence / 100.0 * weight;
                    VoteDetail {
                        strategy_id: member.name().to_string(),
                        category: Some(draft.category),
                        confidence: draft.confidence,
                        weight,
                        power: (power * 1000.0).round() / 1000.0,
                    }
                }
                None => VoteDetail {
                    strategy_id: member.name().to_string(),
                    category: None,
                    confidence: 0.0,
                    weight,
                    power: 0.0,
                },
            })
            .collect()
    }
}

impl Strategy for EnsembleStrategy {
    fn name(&self) -> &str {
        "Ensemble"
    }

    fn min_window(&self) -> usize {
        self.members.iter().map(|m| m.min_window()).min().unwrap_or(1)
    }

    fn predict(&self, window: &[Round]) -> Option<Draft> {
        let (mut high, mut low) = (0.0f64, 0.0f64);
        for (member, &weight) in self.members.iter().zip(self.weights.iter()) {
            let Some(draft) = member.predict(window) else {
                continue;
            };
            let power = draft.confidence / 100.0 * weight;
            match draft.category {
                Category::High => high += power,
                Category::Low => low += power,
                Category::Undetermined => {}
            }
        }

        let total = high + low;
        if total <= 0.0 || high == low {
            return None;
        }
        let category = if high > low { Category::High } else { Category::Low };
        let confidence = ((high - low).abs() / total * 100.0 + 40.0).min(99.0);
        Some(Draft::new(category, confidence, self.name()))
    }

    fn params(&self) -> HashMap<String, f64> {
        self.members
            .iter()
            .zip(self.weights.iter())
            .map(|(m, &w)| (m.name().to_string(), w))
            .collect()
    }
}
