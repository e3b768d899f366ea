use std::collections::HashMap;
use sicbo_db::models::{Category, Draft, Round};
use super::Strategy;

/// Majorité simple sur les N dernières phiên.
pub struct SimpleMajority {
    n: usize,
}

impl SimpleMajority {
    pub fn new(n: usize) -> Self {
        Self { n: n.max(1) }
    }
}

impl Strategy for SimpleMajority {
    fn name(&self) -> &str {
        "SimpleMajority"
    }

    fn min_window(&self) -> usize {
        self.n
    }

    fn predict(&self, window: &[Round]) -> Option<Draft> {
        if window.len() < self.min_window() {
            return None;
        }

        let slice = &window[..self.n];
        let high = slice.iter().filter(|r| r.category == Category::High).count();
        let low = slice.iter().filter(|r| r.category == Category::Low).count();

        // À égalité, on suit la dernière phiên
        let category = if high > low {
            Category::High
        } else if low > high {
            Category::Low
        } else {
            window[0].category
        };
        if !category.is_determined() {
            return None;
        }

        let confidence = high.abs_diff(low) as f64 / self.n as f64 * 60.0 + 40.0;
        Some(Draft::new(category, confidence, self.name()))
    }

    fn params(&self) -> HashMap<String, f64> {
        HashMap::from([("n".to_string(), self.n as f64)])
    }
}
