use std::collections::HashMap;
use sicbo_db::models::{Category, Draft, Round};
use super::{Strategy, categories};

/// Recherche des k dernières catégories plus tôt dans la fenêtre, et de ce qui les a suivies.
pub struct PatternMatch {
    k: usize,
}

impl PatternMatch {
    pub fn new(k: usize) -> Self {
        Self { k: k.max(1) }
    }
}

impl Strategy for PatternMatch {
    fn name(&self) -> &str {
        "PatternMatch"
    }

    fn min_window(&self) -> usize {
        self.k + 1
    }

    fn predict(&self, window: &[Round]) -> Option<Draft> {
        if window.len() < self.min_window() {
            return None;
        }

        let seq = categories(window);
        let last_k = &seq[..self.k];
        if last_k.iter().any(|c| !c.is_determined()) {
            return None;
        }

        // seq[i..i+k] plus ancien que seq[i-1] : seq[i-1] est la phiên qui a suivi le motif
        let (mut high, mut low) = (0u32, 0u32);
        for i in 1..=(seq.len() - self.k) {
            if &seq[i..i + self.k] == last_k {
                match seq[i - 1] {
                    Category::High => high += 1,
                    Category::Low => low += 1,
                    Category::Undetermined => {}
                }
            }
        }

        let total = high + low;
        if total == 0 || high == low {
            return None;
        }
        let category = if high > low { Category::High } else { Category::Low };
        let confidence = (high.abs_diff(low) as f64 / total as f64 * 100.0 + 50.0).min(98.0);
        Some(Draft::new(category, confidence, self.name()))
    }

    fn params(&self) -> HashMap<String, f64> {
        HashMap::from([("k".to_string(), self.k as f64)])
    }
}
