use std::collections::HashMap;
use sicbo_db::models::{Draft, LOW_MAX, Round, classify};
use super::Strategy;

/// Moyenne mobile des totaux, classée par la règle commune.
pub struct MovingAverage {
    n: usize,
}

impl MovingAverage {
    pub fn new(n: usize) -> Self {
        Self { n: n.max(1) }
    }
}

impl Strategy for MovingAverage {
    fn name(&self) -> &str {
        "MovingAverage"
    }

    fn min_window(&self) -> usize {
        self.n.min(4)
    }

    fn predict(&self, window: &[Round]) -> Option<Draft> {
        if window.len() < self.min_window() {
            return None;
        }

        let slice = &window[..self.n.min(window.len())];
        let avg = slice.iter().map(|r| r.score as f64).sum::<f64>() / slice.len() as f64;
        let category = classify(avg.round() as i32);
        if !category.is_determined() {
            return None;
        }

        // Plus la moyenne s'éloigne du centre, plus la confiance monte
        let center = LOW_MAX as f64 + 0.5;
        let confidence = ((avg - center).abs() / 6.0 * 100.0).clamp(40.0, 95.0);
        Some(Draft::new(category, confidence, self.name()))
    }

    fn params(&self) -> HashMap<String, f64> {
        HashMap::from([("n".to_string(), self.n as f64)])
    }
}
