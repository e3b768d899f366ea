use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ledger::Ledger;
use crate::models::Prediction;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyRecord {
    pub tested: u32,
    pub correct: u32,
}

impl StrategyRecord {
    /// Taux lissé de Laplace : (correct + 1) / (tested + 2).
    pub fn laplace_rate(&self) -> f64 {
        (self.correct as f64 + 1.0) / (self.tested as f64 + 2.0)
    }
}

/// Statistiques dérivées du registre, jamais modifiées à la main.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_resolved: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub accuracy: String,
    pub current_streak: u32,
    pub max_streak: u32,
    #[serde(default)]
    pub wrong_streak: u32,
    #[serde(default)]
    pub strategies: BTreeMap<String, StrategyRecord>,
}

impl Default for Statistics {
    fn default() -> Self {
        Self {
            total_resolved: 0,
            correct_count: 0,
            wrong_count: 0,
            accuracy: format_accuracy(0, 0),
            current_streak: 0,
            max_streak: 0,
            wrong_streak: 0,
            strategies: BTreeMap::new(),
        }
    }
}

pub fn format_accuracy(correct: u32, total: u32) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.2}%", correct as f64 / total as f64 * 100.0)
}

impl Statistics {
    /// Recalcul complet depuis le registre, par cible croissante.
    pub fn from_ledger(ledger: &Ledger) -> Self {
        let mut stats = Self::default();
        for prediction in ledger.resolved_chronological() {
            stats.record(prediction);
        }
        stats
    }

    /// Mise à jour incrémentale pour une prédiction qui vient d'être résolue.
    /// Les prédictions encore en attente sont ignorées.
    pub fn record(&mut self, prediction: &Prediction) {
        let Some(outcome) = &prediction.outcome else {
            return;
        };

        self.total_resolved += 1;
        if outcome.correct {
            self.correct_count += 1;
            self.current_streak += 1;
            self.wrong_streak = 0;
        } else {
            self.wrong_count += 1;
            self.current_streak = 0;
            self.wrong_streak += 1;
        }
        self.max_streak = self.max_streak.max(self.current_streak);
        self.accuracy = format_accuracy(self.correct_count, self.total_resolved);

        for vote in &prediction.votes {
            if !vote.category.is_determined() {
                continue;
            }
            let record = self.strategies.entry(vote.strategy_id.clone()).or_default();
            record.tested += 1;
            if vote.category == outcome.actual_category {
                record.correct += 1;
            }
        }
    }

    pub fn strategy(&self, strategy_id: &str) -> StrategyRecord {
        self.strategies.get(strategy_id).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Draft, Round, Vote, test_round};

    /// Crée puis résout une prédiction Low pour chaque cible : correct si le total est petit.
    fn ledger_from(results: &[bool]) -> Ledger {
        let mut ledger = Ledger::new();
        for (i, &correct) in results.iter().enumerate() {
            let target = 100 + i as u64 + 1;
            let votes = vec![
                Vote { strategy_id: "A".into(), category: Category::Low, confidence: 50.0 },
                Vote { strategy_id: "B".into(), category: Category::High, confidence: 50.0 },
            ];
            ledger.create_if_absent(target, target - 1, &Draft::new(Category::Low, 50.0, "A"), votes);
            let round: Round = test_round(target, if correct { 5 } else { 14 });
            ledger.resolve(&round);
        }
        ledger
    }

    #[test]
    fn test_accuracy_zero_resolved() {
        let stats = Statistics::from_ledger(&Ledger::new());
        assert_eq!(stats.total_resolved, 0);
        assert_eq!(stats.accuracy, "0%");
    }

    #[test]
    fn test_accuracy_two_of_three() {
        let stats = Statistics::from_ledger(&ledger_from(&[true, false, true]));
        assert_eq!(stats.total_resolved, 3);
        assert_eq!(stats.correct_count, 2);
        assert_eq!(stats.wrong_count, 1);
        assert_eq!(stats.accuracy, "66.67%");
    }

    #[test]
    fn test_accuracy_all_wrong() {
        let stats = Statistics::from_ledger(&ledger_from(&[false]));
        assert_eq!(stats.accuracy, "0.00%");
    }

    #[test]
    fn test_streak_reset() {
        let stats = Statistics::from_ledger(&ledger_from(&[true, true, false, true]));
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.max_streak, 2);
        assert_eq!(stats.wrong_streak, 0);
    }

    #[test]
    fn test_wrong_streak() {
        let stats = Statistics::from_ledger(&ledger_from(&[true, false, false]));
        assert_eq!(stats.wrong_streak, 2);
        assert_eq!(stats.current_streak, 0);
    }

    #[test]
    fn test_incremental_equals_full_recompute() {
        let results = [true, true, false, true, false, false, true, true, true];
        let mut ledger = Ledger::new();
        let mut incremental = Statistics::default();
        for (i, &correct) in results.iter().enumerate() {
            let target = 200 + i as u64;
            ledger.create_if_absent(target, target - 1, &Draft::new(Category::High, 70.0, "A"), vec![
                Vote { strategy_id: "A".into(), category: Category::High, confidence: 70.0 },
            ]);
            // Une prédiction jamais résolue ne doit rien changer
            ledger.create_if_absent(target + 1000, target, &Draft::new(Category::Low, 10.0, "A"), vec![]);
            let resolved = ledger.resolve(&test_round(target, if correct { 15 } else { 6 })).unwrap();
            incremental.record(&resolved);
        }
        let full = Statistics::from_ledger(&ledger);
        assert_eq!(incremental, full);
        assert_eq!(full.max_streak, 3);
        assert_eq!(full.strategy("A").tested, 9);
    }

    #[test]
    fn test_per_strategy_records() {
        let stats = Statistics::from_ledger(&ledger_from(&[true, false, true]));
        assert_eq!(stats.strategy("A"), StrategyRecord { tested: 3, correct: 2 });
        assert_eq!(stats.strategy("B"), StrategyRecord { tested: 3, correct: 1 });
        assert_eq!(stats.strategy("C"), StrategyRecord::default());
    }

    #[test]
    fn test_laplace_rate() {
        assert!((StrategyRecord::default().laplace_rate() - 0.5).abs() < 1e-12);
        let r = StrategyRecord { tested: 8, correct: 6 };
        assert!((r.laplace_rate() - 0.7).abs() < 1e-12);
    }
}
