pub mod frequency;
pub mod majority;
pub mod markov;
pub mod moving_average;
pub mod pattern;
pub mod streak;
pub mod weighted_recency;

use std::collections::HashMap;
use sicbo_db::models::{Category, Draft, Round};

pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;
    /// Nombre minimal de phiên sous lequel la stratégie ne se prononce pas.
    fn min_window(&self) -> usize;
    /// window[0] = phiên la plus récente. None = pas de signal.
    fn predict(&self, window: &[Round]) -> Option<Draft>;
    fn params(&self) -> HashMap<String, f64>;
}

/// Catégories de la fenêtre, dans le même ordre (plus récent en premier).
pub fn categories(window: &[Round]) -> Vec<Category> {
    window.iter().map(|r| r.category).collect()
}

/// Stratégies de base et leur poids de vote dans l'ensemble.
pub fn weighted_strategies() -> Vec<(Box<dyn Strategy>, f64)> {
    let strategies: Vec<Box<dyn Strategy>> = vec![
        Box::new(majority::SimpleMajority::new(5)),
        Box::new(weighted_recency::WeightedRecency::new(7)),
        Box::new(moving_average::MovingAverage::new(6)),
        Box::new(pattern::PatternMatch::new(3)),
        Box::new(markov::MarkovTransition::new()),
        Box::new(frequency::FrequencyTotals::new(15)),
        Box::new(streak::StreakDetector::new(3)),
    ];
    let weights = [1.0, 1.2, 0.9, 1.5, 1.3, 0.8, 1.4];
    strategies.into_iter().zip(weights).collect()
}

/// Toutes les stratégies enregistrées : les stratégies de base puis l'ensemble.
pub fn all_strategies() -> Vec<Box<dyn Strategy>> {
    let mut strategies: Vec<Box<dyn Strategy>> =
        weighted_strategies().into_iter().map(|(s, _)| s).collect();
    strategies.push(Box::new(crate::ensemble::EnsembleStrategy::default()));
    strategies
}

pub fn validate_draft(draft: &Draft) -> bool {
    draft.category.is_determined() && (0.0..=100.0).contains(&draft.confidence)
}

/// Phiên de test, la plus récente en premier, ids décroissants à partir de 1000.
pub fn make_test_rounds(scores: &[i32]) -> Vec<Round> {
    scores
        .iter()
        .enumerate()
        .map(|(i, &score)| {
            let id = 1000 - i as u64;
            let observed_at = chrono::DateTime::from_timestamp(1_700_000_000 + id as i64 * 15, 0)
                .unwrap_or_default();
            Round::new(id, score, None, observed_at)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_draft() {
        assert!(validate_draft(&Draft::new(Category::High, 50.0, "X")));
        assert!(!validate_draft(&Draft::new(Category::Undetermined, 50.0, "X")));
    }

    #[test]
    fn test_registered_names_unique() {
        let strategies = all_strategies();
        let mut names: Vec<&str> = strategies.iter().map(|s| s.name()).collect();
        let n = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), n);
        assert_eq!(n, 8);
    }

    #[test]
    fn test_all_strategies_respect_bounds() {
        let histories = [
            make_test_rounds(&[14, 8, 16, 12, 5, 11, 9, 15, 4, 13, 17, 6, 10, 12, 11, 7, 14, 3, 18, 9]),
            make_test_rounds(&[12, 13, 14, 15, 16, 11, 12, 13]),
            make_test_rounds(&[5, 6, 5, 6, 5, 6]),
            make_test_rounds(&[5, 14, 5, 14, 5, 14, 5, 14, 5, 14]),
        ];
        for strategy in all_strategies() {
            for history in &histories {
                if let Some(draft) = strategy.predict(history) {
                    assert!(validate_draft(&draft), "{} : {:?}", strategy.name(), draft);
                    assert_eq!(draft.strategy_id, strategy.name());
                }
            }
        }
    }

    #[test]
    fn test_all_strategies_silent_below_min_window() {
        for strategy in all_strategies() {
            let history = make_test_rounds(&vec![12; strategy.min_window().saturating_sub(1)]);
            assert!(strategy.predict(&history).is_none(), "{} devrait se taire", strategy.name());
        }
    }

    #[test]
    fn test_all_strategies_silent_on_empty() {
        for strategy in all_strategies() {
            assert!(strategy.predict(&[]).is_none());
        }
    }
}
