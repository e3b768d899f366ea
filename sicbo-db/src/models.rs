use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_SCORE: i32 = 3;
pub const MAX_SCORE: i32 = 18;
/// Dernier total classé Xỉu (petit). Au-delà : Tài (grand).
pub const LOW_MAX: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Low,
    High,
    Undetermined,
}

impl Category {
    /// Libellé utilisé par l'API d'origine.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Low => "Xỉu",
            Category::High => "Tài",
            Category::Undetermined => "N/A",
        }
    }

    pub fn is_determined(&self) -> bool {
        !matches!(self, Category::Undetermined)
    }

    pub fn opposite(&self) -> Category {
        match self {
            Category::Low => Category::High,
            Category::High => Category::Low,
            Category::Undetermined => Category::Undetermined,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Low => write!(f, "LOW"),
            Category::High => write!(f, "HIGH"),
            Category::Undetermined => write!(f, "-"),
        }
    }
}

/// Seule règle de classement du dépôt : 3..=10 → Low, 11..=18 → High, sinon Undetermined.
pub fn classify(score: i32) -> Category {
    match score {
        MIN_SCORE..=LOW_MAX => Category::Low,
        s if s > LOW_MAX && s <= MAX_SCORE => Category::High,
        _ => Category::Undetermined,
    }
}

pub fn format_round_id(id: u64) -> String {
    format!("#{}", id)
}

pub fn parse_round_id(raw: &str) -> Result<u64> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if digits.is_empty() {
        bail!("Identifiant de phiên vide : '{}'", raw);
    }
    digits
        .parse::<u64>()
        .with_context(|| format!("Identifiant de phiên invalide : '{}'", raw))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: u64,
    pub score: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dice: Option<[u8; 3]>,
    pub category: Category,
    pub observed_at: DateTime<Utc>,
}

impl Round {
    pub fn new(id: u64, score: i32, dice: Option<[u8; 3]>, observed_at: DateTime<Utc>) -> Self {
        Self {
            id,
            score,
            dice,
            category: classify(score),
            observed_at,
        }
    }

    pub fn display_id(&self) -> String {
        format_round_id(self.id)
    }
}

pub fn validate_dice(dice: &[u8], score: i32) -> Result<[u8; 3]> {
    if dice.len() != 3 {
        bail!("Attendu 3 dés, reçu {}", dice.len());
    }
    for &d in dice {
        if !(1..=6).contains(&d) {
            bail!("Dé {} hors limites (1-6)", d);
        }
    }
    let sum: i32 = dice.iter().map(|&d| d as i32).sum();
    if sum != score {
        bail!("Somme des dés {} différente du total {}", sum, score);
    }
    Ok([dice[0], dice[1], dice[2]])
}

/// Avis d'une stratégie pour la phiên suivante.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub category: Category,
    pub confidence: f64,
    pub strategy_id: String,
}

impl Draft {
    pub fn new(category: Category, confidence: f64, strategy_id: impl Into<String>) -> Self {
        let confidence = if confidence.is_finite() { confidence.clamp(0.0, 100.0) } else { 0.0 };
        Self {
            category,
            confidence: (confidence * 100.0).round() / 100.0,
            strategy_id: strategy_id.into(),
        }
    }
}

/// Sous-prédiction d'une stratégie, conservée pour l'attribution par stratégie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub strategy_id: String,
    pub category: Category,
    pub confidence: f64,
}

impl From<&Draft> for Vote {
    fn from(draft: &Draft) -> Self {
        Self {
            strategy_id: draft.strategy_id.clone(),
            category: draft.category,
            confidence: draft.confidence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Pending,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub correct: bool,
    pub actual_category: Category,
    pub actual_score: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub target_round_id: u64,
    pub made_at_round_id: u64,
    pub category: Category,
    pub confidence: f64,
    pub strategy_id: String,
    #[serde(default)]
    pub votes: Vec<Vote>,
    pub status: PredictionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Prediction {
    pub fn is_pending(&self) -> bool {
        self.status == PredictionStatus::Pending
    }

    pub fn is_correct(&self) -> Option<bool> {
        self.outcome.as_ref().map(|o| o.correct)
    }
}

#[cfg(test)]
pub(crate) fn test_round(id: u64, score: i32) -> Round {
    let observed_at = DateTime::from_timestamp(1_700_000_000 + id as i64, 0).unwrap();
    Round::new(id, score, None, observed_at)
}
