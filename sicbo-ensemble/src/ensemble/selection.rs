use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sicbo_db::models::Draft;
use sicbo_db::stats::{Statistics, StrategyRecord};

/// Choix de la stratégie dont l'avis devient la prédiction officielle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    Fixed(String),
    BestPerforming,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        SelectionPolicy::Fixed("Ensemble".to_string())
    }
}

impl FromStr for SelectionPolicy {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "best" | "best-performing" | "auto" => Ok(SelectionPolicy::BestPerforming),
            name => Ok(SelectionPolicy::Fixed(name.to_string())),
        }
    }
}

impl std::fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionPolicy::Fixed(name) => write!(f, "fixed:{}", name),
            SelectionPolicy::BestPerforming => write!(f, "best"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyRanking {
    pub strategy_id: String,
    pub tested: u32,
    pub correct: u32,
    pub rate: f64,
}

impl SelectionPolicy {
    /// `drafts` suit l'ordre d'enregistrement : à taux égal, la première l'emporte.
    pub fn select<'a>(&self, drafts: &'a [Draft], stats: &Statistics) -> Option<&'a Draft> {
        match self {
            SelectionPolicy::Fixed(name) => drafts.iter().find(|d| &d.strategy_id == name),
            SelectionPolicy::BestPerforming => {
                let mut best: Option<(&Draft, f64)> = None;
                for draft in drafts {
                    let rate = stats.strategy(&draft.strategy_id).laplace_rate();
                    if best.map_or(true, |(_, best_rate)| rate > best_rate) {
                        best = Some((draft, rate));
                    }
                }
                best.map(|(d, _)| d)
            }
        }
    }
}

/// Classement des stratégies par taux lissé décroissant (ordre d'enregistrement à égalité).
pub fn rank_strategies(names: &[&str], stats: &Statistics) -> Vec<StrategyRanking> {
    let mut ranking: Vec<StrategyRanking> = names
        .iter()
        .map(|&name| {
            let StrategyRecord { tested, correct } = stats.strategy(name);
            StrategyRanking {
                strategy_id: name.to_string(),
                tested,
                correct,
                rate: stats.strategy(name).laplace_rate(),
            }
        })
        .collect();
    ranking.sort_by(|a, b| b.rate.partial_cmp(&a.rate).unwrap_or(std::cmp::Ordering::Equal));
    ranking
}
