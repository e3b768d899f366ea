use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use sicbo_ensemble::ensemble::selection::SelectionPolicy;
use sicbo_ensemble::models::all_strategies;

pub const DEFAULT_SOURCE_URL: &str =
    "https://api.wsktnus8.net/v2/history/getLastResult?gameId=ktrng_3979&size=20&tableId=39791215743193&curPage=1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    pub source_url: String,
    pub data_file: PathBuf,
    pub interval_ms: u64,
    pub timeout_ms: u64,
    pub retries: u32,
    pub backoff_ms: u64,
    pub flush_delay_ms: u64,
    pub max_history: usize,
    pub window: usize,
    pub strategy: String,
    pub auto_reset_after: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            source_url: DEFAULT_SOURCE_URL.to_string(),
            data_file: PathBuf::from("data/sicbo.json"),
            interval_ms: 15_000,
            timeout_ms: 10_000,
            retries: 2,
            backoff_ms: 500,
            flush_delay_ms: 1_000,
            max_history: 50,
            window: 50,
            strategy: "Ensemble".to_string(),
            auto_reset_after: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            bail!("L'intervalle de collecte doit être positif");
        }
        if self.timeout_ms == 0 {
            bail!("Le délai de requête doit être positif");
        }
        if self.max_history == 0 {
            bail!("L'historique doit contenir au moins une phiên");
        }
        if self.window == 0 {
            bail!("La fenêtre d'analyse doit contenir au moins une phiên");
        }
        if self.source_url.trim().is_empty() {
            bail!("URL de la source vide");
        }
        if let SelectionPolicy::Fixed(name) = self.policy() {
            let known: Vec<String> = all_strategies().iter().map(|s| s.name().to_string()).collect();
            if !known.contains(&name) {
                bail!(
                    "Stratégie inconnue : '{}' (attendu : {} ou best)",
                    name,
                    known.join(", ")
                );
            }
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn flush_delay(&self) -> Duration {
        Duration::from_millis(self.flush_delay_ms)
    }

    pub fn policy(&self) -> SelectionPolicy {
        // FromStr est infaillible
        self.strategy.parse().unwrap_or_default()
    }
}
