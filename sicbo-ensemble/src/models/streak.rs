use std::collections::HashMap;
use sicbo_db::models::{Draft, Round};
use super::{Strategy, categories};

/// Suit une série en cours dès qu'elle atteint `min_streak` phiên.
pub struct StreakDetector {
    min_streak: usize,
}

impl StreakDetector {
    pub fn new(min_streak: usize) -> Self {
        Self { min_streak: min_streak.max(2) }
    }
}

impl Strategy for StreakDetector {
    fn name(&self) -> &str {
        "Streak"
    }

    fn min_window(&self) -> usize {
        self.min_streak
    }

    fn predict(&self, window: &[Round]) -> Option<Draft> {
        if window.len() < self.min_window() {
            return None;
        }

        let seq = categories(window);
        let current = seq[0];
        if !current.is_determined() {
            return None;
        }
        let run = seq.iter().take_while(|&&c| c == current).count();
        if run < self.min_streak {
            return None;
        }

        // Plus la série est longue, plus la confiance monte
        let confidence = (50.0 + run as f64 * 12.0).min(99.0);
        Some(Draft::new(current, confidence, self.name()))
    }

    fn params(&self) -> HashMap<String, f64> {
        HashMap::from([("min_streak".to_string(), self.min_streak as f64)])
    }
}
