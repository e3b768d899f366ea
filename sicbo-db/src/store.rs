use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::history::{DEFAULT_CAPACITY, HistoryLog};
use crate::ledger::Ledger;
use crate::models::{Prediction, Round};
use crate::stats::Statistics;

/// État complet du service : une seule valeur possédée, persistée en un document JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    pub history: HistoryLog,
    pub predictions: Ledger,
    pub stats: Statistics,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    history: Vec<Round>,
    #[serde(default)]
    predictions: Vec<Prediction>,
    #[serde(default)]
    stats: Statistics,
    #[serde(default = "default_capacity")]
    capacity: usize,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Default for Store {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Store {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: HistoryLog::new(capacity),
            predictions: Ledger::new(),
            stats: Statistics::default(),
        }
    }

    /// Efface le registre et les statistiques, et l'historique si demandé.
    pub fn reset(&mut self, clear_history: bool) {
        self.predictions.clear();
        self.stats = Statistics::default();
        if clear_history {
            self.history.clear();
        }
    }

    pub fn to_json(&self) -> Result<String> {
        let doc = StoreDocument {
            history: self.history.rounds().to_vec(),
            predictions: self.predictions.iter().cloned().collect(),
            stats: self.stats.clone(),
            capacity: self.history.capacity(),
        };
        serde_json::to_string_pretty(&doc).context("Échec de la sérialisation de l'état")
    }

    /// Les statistiques sont recalculées depuis le registre : elles n'en sont qu'une dérivée.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: StoreDocument = serde_json::from_str(json).context("Document d'état invalide")?;
        let predictions = Ledger::from_predictions(doc.predictions);
        let stats = Statistics::from_ledger(&predictions);
        if stats != doc.stats {
            warn!("Statistiques persistées incohérentes, recalculées depuis le registre");
        }
        Ok(Self {
            history: HistoryLog::from_rounds(doc.history, doc.capacity),
            predictions,
            stats,
        })
    }
}

pub fn default_data_path() -> PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("sicbo.json");
    path
}

pub fn save_store(store: &Store, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let json = store.to_json()?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).with_context(|| format!("Impossible d'écrire {:?}", tmp))?;
    std::fs::rename(&tmp, path).with_context(|| format!("Impossible de remplacer {:?}", path))?;
    Ok(())
}

pub fn load_store(path: &Path) -> Result<Store> {
    let json = std::fs::read_to_string(path).with_context(|| format!("Impossible de lire {:?}", path))?;
    Store::from_json(&json).with_context(|| format!("Impossible de charger {:?}", path))
}

/// Chargement au démarrage : un fichier absent ou illisible donne un état vide.
pub fn load_or_default(path: &Path, capacity: usize) -> Store {
    if !path.exists() {
        info!("Aucun état persisté dans {:?}, démarrage à vide", path);
        return Store::new(capacity);
    }
    match load_store(path) {
        Ok(mut store) => {
            store.history.set_capacity(capacity);
            info!(
                "État chargé : {} phiên, {} prédictions",
                store.history.len(),
                store.predictions.len()
            );
            store
        }
        Err(e) => {
            warn!("{:#}, démarrage à vide", e);
            Store::new(capacity)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Draft, Vote, test_round};

    fn sample_store() -> Store {
        let mut store = Store::new(10);
        store.history.merge(&[test_round(104, 9), test_round(103, 16), test_round(102, 8)]);
        let votes = vec![Vote { strategy_id: "A".into(), category: Category::High, confidence: 61.5 }];
        store.predictions.create_if_absent(104, 103, &Draft::new(Category::High, 61.5, "A"), votes);
        if let Some(p) = store.predictions.resolve(&test_round(104, 9)) {
            store.stats.record(&p);
        }
        store.predictions.create_if_absent(105, 104, &Draft::new(Category::Low, 55.0, "A"), vec![]);
        store
    }

    #[test]
    fn test_json_roundtrip() {
        let store = sample_store();
        let json = store.to_json().unwrap();
        let loaded = Store::from_json(&json).unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_empty_store_roundtrip() {
        let store = Store::new(7);
        let loaded = Store::from_json(&store.to_json().unwrap()).unwrap();
        assert_eq!(loaded, store);
        assert_eq!(loaded.history.capacity(), 7);
    }

    #[test]
    fn test_document_layout() {
        let json = sample_store().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["history"].is_array());
        assert!(value["predictions"].is_array());
        assert_eq!(value["stats"]["total_resolved"], 1);
        assert_eq!(value["stats"]["accuracy"], "0.00%");
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("sicbo.json");
        let store = sample_store();
        save_store(&store, &path).unwrap();
        assert_eq!(load_store(&path).unwrap(), store);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = load_or_default(&dir.path().join("absent.json"), 20);
        assert!(store.history.is_empty());
        assert_eq!(store.history.capacity(), 20);
    }

    #[test]
    fn test_load_or_default_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sicbo.json");
        std::fs::write(&path, "{ pas du json").unwrap();
        let store = load_or_default(&path, 20);
        assert!(store.predictions.is_empty());
    }

    #[test]
    fn test_stats_recomputed_on_load() {
        let mut store = sample_store();
        store.stats.correct_count = 42;
        let loaded = Store::from_json(&store.to_json().unwrap()).unwrap();
        assert_eq!(loaded.stats, Statistics::from_ledger(&loaded.predictions));
    }

    #[test]
    fn test_reset() {
        let mut store = sample_store();
        store.reset(false);
        assert!(store.predictions.is_empty());
        assert_eq!(store.stats, Statistics::default());
        assert_eq!(store.history.len(), 3);
        store.reset(true);
        assert!(store.history.is_empty());
    }
}
