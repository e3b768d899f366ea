use sicbo_db::models::{Draft, Round, Vote};
use sicbo_db::stats::Statistics;

use crate::ensemble::selection::SelectionPolicy;
use crate::models::{Strategy, all_strategies, validate_draft};

pub const DEFAULT_WINDOW: usize = 50;

pub struct PredictionEngine {
    strategies: Vec<Box<dyn Strategy>>,
    policy: SelectionPolicy,
    window: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EngineOutput {
    /// Avis retenu par la politique de sélection, s'il y en a un.
    pub chosen: Option<Draft>,
    /// Avis de toutes les stratégies ayant un signal, dans l'ordre d'enregistrement.
    pub votes: Vec<Vote>,
}

impl Default for PredictionEngine {
    fn default() -> Self {
        Self::new(all_strategies(), SelectionPolicy::default(), DEFAULT_WINDOW)
    }
}

impl PredictionEngine {
    pub fn new(strategies: Vec<Box<dyn Strategy>>, policy: SelectionPolicy, window: usize) -> Self {
        Self {
            strategies,
            policy,
            window: window.max(1),
        }
    }

    pub fn with_policy(policy: SelectionPolicy, window: usize) -> Self {
        Self::new(all_strategies(), policy, window)
    }

    /// `history[0]` = phiên la plus récente ; seules les `window` premières sont lues.
    pub fn predict(&self, history: &[Round], stats: &Statistics) -> EngineOutput {
        let window = &history[..self.window.min(history.len())];
        let drafts: Vec<Draft> = self
            .strategies
            .iter()
            .filter_map(|s| s.predict(window))
            .filter(validate_draft)
            .collect();

        EngineOutput {
            chosen: self.policy.select(&drafts, stats).cloned(),
            votes: drafts.iter().map(Vote::from).collect(),
        }
    }

    pub fn strategies(&self) -> &[Box<dyn Strategy>] {
        &self.strategies
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    pub fn window(&self) -> usize {
        self.window
    }
}
