use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Deserialize;

use sicbo_db::models::{Round, parse_round_id, validate_dice};

use crate::error::SourceError;

/// Fournisseur des dernières phiên, la plus récente en premier.
#[async_trait]
pub trait RoundSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Round>, SourceError>;
}

#[derive(Debug, Deserialize)]
struct Payload {
    data: PayloadData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayloadData {
    #[serde(default)]
    result_list: Vec<RawRound>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GameNum {
    Number(u64),
    Text(String),
}

/// Enregistrement brut tel que publié par la source, validé avant toute fusion.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRound {
    pub game_num: GameNum,
    pub score: i64,
    #[serde(default)]
    pub faces_list: Option<Vec<i64>>,
}

impl RawRound {
    pub fn validate(&self, observed_at: DateTime<Utc>) -> Result<Round> {
        let id = match &self.game_num {
            GameNum::Number(n) => *n,
            GameNum::Text(s) => parse_round_id(s)?,
        };
        if self.score < 0 {
            anyhow::bail!("Total négatif pour la phiên #{} : {}", id, self.score);
        }
        let score = i32::try_from(self.score)
            .with_context(|| format!("Total hors limites pour la phiên #{}", id))?;

        let dice = match &self.faces_list {
            Some(faces) => {
                let faces: Vec<u8> = faces
                    .iter()
                    .map(|&f| u8::try_from(f).with_context(|| format!("Dé invalide : {}", f)))
                    .collect::<Result<_>>()?;
                Some(validate_dice(&faces, score).with_context(|| format!("Phiên #{}", id))?)
            }
            None => None,
        };

        Ok(Round::new(id, score, dice, observed_at))
    }
}

/// Décode et valide un lot complet : un seul enregistrement invalide rejette tout le lot.
pub fn parse_payload(body: &str, observed_at: DateTime<Utc>) -> Result<Vec<Round>, SourceError> {
    let payload: Payload =
        serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))?;
    let raw = payload.data.result_list;
    if raw.is_empty() {
        return Err(SourceError::Empty);
    }

    let rounds = raw
        .iter()
        .map(|r| r.validate(observed_at))
        .collect::<Result<Vec<_>>>()
        .map_err(|e| SourceError::Malformed(format!("{:#}", e)))?;

    if let Some(w) = rounds.windows(2).find(|w| w[0].id <= w[1].id) {
        return Err(SourceError::Malformed(format!(
            "Lot non strictement décroissant : #{} puis #{}",
            w[0].id, w[1].id
        )));
    }
    Ok(rounds)
}

pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Impossible de construire le client HTTP")?;
        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl RoundSource for HttpSource {
    async fn fetch(&self) -> Result<Vec<Round>, SourceError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        parse_payload(&body, Utc::now())
    }
}

/// Politique de nouvelles tentatives : `retries` essais supplémentaires, délai doublé à chaque fois.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

pub async fn fetch_with_retry(
    source: &dyn RoundSource,
    policy: RetryPolicy,
) -> Result<Vec<Round>, SourceError> {
    let mut attempt = 0;
    loop {
        match source.fetch().await {
            Ok(rounds) => return Ok(rounds),
            Err(e) if e.is_retryable() && attempt < policy.retries => {
                let delay = policy.delay(attempt);
                debug!("Tentative {} échouée ({}), nouvel essai dans {:?}", attempt + 1, e, delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if attempt > 0 {
                    warn!("Abandon après {} tentative(s)", attempt + 1);
                }
                return Err(e);
            }
        }
    }
}
