// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for LeafLens

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides `plant_id.api_key`
pub const API_KEY_ENV: &str = "LEAFLENS_API_KEY";

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Identification service settings
    #[serde(default)]
    pub plant_id: PlantIdConfig,

    /// Supplementary fact sources
    #[serde(default)]
    pub facts: FactsConfig,

    /// Local storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Result presentation limits
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlantIdConfig {
    #[serde(default = "default_plant_id_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_details")]
    pub details: Vec<String>,
    #[serde(default = "default_true")]
    pub similar_images: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FactsConfig {
    /// Serve a fixed fact sheet instead of querying live sources
    #[serde(default)]
    pub use_mock: bool,
    #[serde(default = "default_true")]
    pub wikipedia: bool,
    #[serde(default = "default_wikipedia_url")]
    pub wikipedia_url: String,
    /// Perenual is only queried when a key is configured
    #[serde(default)]
    pub perenual_api_key: Option<String>,
    #[serde(default = "default_perenual_url")]
    pub perenual_url: String,
    #[serde(default = "default_facts_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DisplayConfig {
    #[serde(default = "default_max_alternatives")]
    pub max_alternatives: usize,
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    #[serde(default = "default_history_dedup_window")]
    pub history_dedup_window: usize,
}

// Default value functions
fn default_plant_id_url() -> String { "https://plant.id/api/v3".to_string() }
fn default_timeout() -> u64 { 120 }
fn default_language() -> String { "en".to_string() }
fn default_true() -> bool { true }
fn default_wikipedia_url() -> String { "https://en.wikipedia.org/api/rest_v1".to_string() }
fn default_perenual_url() -> String { "https://perenual.com/api".to_string() }
fn default_facts_timeout() -> u64 { 15 }
fn default_data_dir() -> String { "leaflens_data".to_string() }
fn default_max_alternatives() -> usize { crate::ranking::MAX_ALTERNATIVES }
fn default_history_cap() -> usize { crate::store::history::HISTORY_CAP }
fn default_history_dedup_window() -> usize { crate::store::history::DEDUP_WINDOW }

fn default_details() -> Vec<String> {
    vec![
        "common_names", "url", "wiki_description", "edible_parts", "watering", "toxicity",
    ].into_iter().map(String::from).collect()
}

impl Default for PlantIdConfig {
    fn default() -> Self {
        Self {
            url: default_plant_id_url(),
            api_key: None,
            timeout_secs: default_timeout(),
            language: default_language(),
            details: default_details(),
            similar_images: true,
        }
    }
}

impl Default for FactsConfig {
    fn default() -> Self {
        Self {
            use_mock: false,
            wikipedia: true,
            wikipedia_url: default_wikipedia_url(),
            perenual_api_key: None,
            perenual_url: default_perenual_url(),
            timeout_secs: default_facts_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_alternatives: default_max_alternatives(),
            history_cap: default_history_cap(),
            history_dedup_window: default_history_dedup_window(),
        }
    }
}

impl PlantIdConfig {
    /// API key from the environment, falling back to the config file
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::LeafLensError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings that would make a store or client unusable
    pub fn validate(&self) -> crate::Result<()> {
        if self.plant_id.url.trim().is_empty() {
            return Err(crate::LeafLensError::Config("plant_id.url must not be empty".to_string()));
        }
        if self.display.history_cap == 0 {
            return Err(crate::LeafLensError::Config("display.history_cap must be at least 1".to_string()));
        }
        if self.storage.data_dir.trim().is_empty() {
            return Err(crate::LeafLensError::Config("storage.data_dir must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"plant_id": {"api_key": "abc"}}"#).unwrap();
        assert_eq!(config.plant_id.api_key.as_deref(), Some("abc"));
        assert_eq!(config.plant_id.language, "en");
        assert_eq!(config.plant_id.details.len(), 6);
        assert_eq!(config.display.max_alternatives, 2);
        assert_eq!(config.display.history_cap, 60);
        assert_eq!(config.display.history_dedup_window, 10);
        assert!(config.facts.wikipedia);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.storage.data_dir = "elsewhere".to_string();
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.storage.data_dir, "elsewhere");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.plant_id.url, "https://plant.id/api/v3");
    }

    #[test]
    fn test_zero_history_cap_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"display": {"history_cap": 0}}"#).unwrap();
        assert!(matches!(AppConfig::load(&path), Err(crate::LeafLensError::Config(_))));
    }
}
