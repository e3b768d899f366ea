use std::collections::HashMap;
use sicbo_db::models::{Category, Draft, Round};
use super::Strategy;

/// Vote pondéré : la phiên la plus récente pèse N, la plus ancienne 1 (divisé par N).
pub struct WeightedRecency {
    n: usize,
}

impl WeightedRecency {
    pub fn new(n: usize) -> Self {
        Self { n: n.max(1) }
    }
}

impl Strategy for WeightedRecency {
    fn name(&self) -> &str {
        "WeightedRecency"
    }

    fn min_window(&self) -> usize {
        self.n.min(5)
    }

    fn predict(&self, window: &[Round]) -> Option<Draft> {
        if window.len() < self.min_window() {
            return None;
        }

        let n = self.n as f64;
        let score: f64 = window
            .iter()
            .take(self.n)
            .enumerate()
            .map(|(i, r)| {
                let weight = (n - i as f64) / n;
                match r.category {
                    Category::High => weight,
                    Category::Low => -weight,
                    Category::Undetermined => 0.0,
                }
            })
            .sum();

        let category = if score > 0.0 {
            Category::High
        } else if score < 0.0 {
            Category::Low
        } else {
            window[0].category
        };
        if !category.is_determined() {
            return None;
        }

        let confidence = (score.abs() / n * 120.0).min(95.0);
        Some(Draft::new(category, confidence, self.name()))
    }

    fn params(&self) -> HashMap<String, f64> {
        HashMap::from([("n".to_string(), self.n as f64)])
    }
}
