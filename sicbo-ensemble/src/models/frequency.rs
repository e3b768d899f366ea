use std::collections::HashMap;
use sicbo_db::models::{Draft, Round, classify};
use super::Strategy;

/// Total le plus fréquent de la fenêtre, classé par la règle commune.
pub struct FrequencyTotals {
    window: usize,
}

impl FrequencyTotals {
    pub fn new(window: usize) -> Self {
        Self { window: window.max(1) }
    }
}

impl Strategy for FrequencyTotals {
    fn name(&self) -> &str {
        "FreqTotals"
    }

    fn min_window(&self) -> usize {
        self.window.min(6)
    }

    fn predict(&self, window: &[Round]) -> Option<Draft> {
        if window.len() < self.min_window() {
            return None;
        }

        let slice = &window[..self.window.min(window.len())];
        let mut counts: HashMap<i32, u32> = HashMap::new();
        for r in slice {
            *counts.entry(r.score).or_insert(0) += 1;
        }

        // À égalité de fréquence, le total apparu le plus récemment l'emporte
        let mut top: Option<(i32, u32)> = None;
        for r in slice {
            let count = counts[&r.score];
            if top.map_or(true, |(_, best)| count > best) {
                top = Some((r.score, count));
            }
        }
        let (score, count) = top?;

        let category = classify(score);
        if !category.is_determined() {
            return None;
        }
        let confidence = (count as f64 / slice.len() as f64 * 100.0 + 30.0).min(90.0);
        Some(Draft::new(category, confidence, self.name()))
    }

    fn params(&self) -> HashMap<String, f64> {
        HashMap::from([("window".to_string(), self.window as f64)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::make_test_rounds;
    use sicbo_db::models::Category;

    #[test]
    fn test_most_frequent_total() {
        let rounds = make_test_rounds(&[11, 5, 11, 4, 11, 6]);
        let draft = FrequencyTotals::new(15).predict(&rounds).unwrap();
        assert_eq!(draft.category, Category::High);
        assert!((draft.confidence - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_tie_goes_to_most_recent() {
        let rounds = make_test_rounds(&[6, 12, 6, 12, 9, 13]);
        let draft = FrequencyTotals::new(15).predict(&rounds).unwrap();
        assert_eq!(draft.category, Category::Low);
    }

    #[test]
    fn test_window_limits_counting() {
        // Seules les 6 premières phiên comptent
        let rounds = make_test_rounds(&[4, 4, 15, 16, 17, 12, 13, 13, 13, 13]);
        let draft = FrequencyTotals::new(6).predict(&rounds).unwrap();
        assert_eq!(draft.category, Category::Low);
    }
}
