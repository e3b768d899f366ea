use std::collections::HashMap;
use sicbo_db::models::{Category, Draft, Round};
use super::{Strategy, categories};

/// Chaîne de Markov d'ordre 1 sur les catégories.
pub struct MarkovTransition;

impl MarkovTransition {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MarkovTransition {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for MarkovTransition {
    fn name(&self) -> &str {
        "Markov"
    }

    fn min_window(&self) -> usize {
        5
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

        // Transitions depuis l'état courant : seq[t + 1] (plus ancien) → seq[t]
        let (mut to_high, mut to_low) = (0u32, 0u32);
        for t in 0..seq.len() - 1 {
            if seq[t + 1] != current {
                continue;
            }
            match seq[t] {
                Category::High => to_high += 1,
                Category::Low => to_low += 1,
                Category::Undetermined => {}
            }
        }

        let total = to_high + to_low;
        if total == 0 || to_high == to_low {
            return None;
        }
        let category = if to_high > to_low { Category::High } else { Category::Low };
        let confidence = (to_high.abs_diff(to_low) as f64 / total as f64 * 100.0 + 40.0).min(95.0);
        Some(Draft::new(category, confidence, self.name()))
    }

    fn params(&self) -> HashMap<String, f64> {
        HashMap::new()
    }
}
