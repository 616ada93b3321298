// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Supplementary plant facts gathered from several optional sources

pub mod perenual;
pub mod wikipedia;

use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::FactsConfig;
use crate::Result;

/// Quick facts about a plant. Every field is always present, possibly null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactSheet {
    pub toxicity_humans: Option<String>,
    pub toxicity_pets: Option<String>,
    pub sun: Option<String>,
    pub temp_min_c: Option<String>,
    pub temp_max_c: Option<String>,
    pub water_frequency: Option<String>,
    pub distribution: Option<String>,
    pub weed_potential: Option<String>,
    pub plant_type: Option<String>,
    pub summary: Option<String>,
    pub reference_url: Option<String>,
}

impl FactSheet {
    /// A sheet with every field null
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::empty()
    }

    /// Fill each null field from `other` when it has a non-empty value
    pub fn fill_from(&mut self, other: &FactSheet) {
        fill(&mut self.toxicity_humans, &other.toxicity_humans);
        fill(&mut self.toxicity_pets, &other.toxicity_pets);
        fill(&mut self.sun, &other.sun);
        fill(&mut self.temp_min_c, &other.temp_min_c);
        fill(&mut self.temp_max_c, &other.temp_max_c);
        fill(&mut self.water_frequency, &other.water_frequency);
        fill(&mut self.distribution, &other.distribution);
        fill(&mut self.weed_potential, &other.weed_potential);
        fill(&mut self.plant_type, &other.plant_type);
        fill(&mut self.summary, &other.summary);
        fill(&mut self.reference_url, &other.reference_url);
    }

    /// Label/value pairs for the fields that are set, in display order
    pub fn rows(&self) -> Vec<(&'static str, &str)> {
        [
            ("Toxic to humans", &self.toxicity_humans),
            ("Toxic to pets", &self.toxicity_pets),
            ("Sun", &self.sun),
            ("Min temperature", &self.temp_min_c),
            ("Max temperature", &self.temp_max_c),
            ("Watering", &self.water_frequency),
            ("Distribution", &self.distribution),
            ("Weed potential", &self.weed_potential),
            ("Plant type", &self.plant_type),
            ("Summary", &self.summary),
            ("Reference", &self.reference_url),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.as_deref().map(|v| (label, v)))
        .collect()
    }
}

fn fill(slot: &mut Option<String>, candidate: &Option<String>) {
    if slot.is_some() {
        return;
    }
    if let Some(value) = candidate.as_deref().filter(|v| !v.is_empty()) {
        *slot = Some(value.to_string());
    }
}

/// Merge sheets in priority order, first non-empty value per field wins
pub fn merge_facts<'a, I>(sheets: I) -> FactSheet
where
    I: IntoIterator<Item = &'a FactSheet>,
{
    let mut merged = FactSheet::empty();
    for sheet in sheets {
        merged.fill_from(sheet);
    }
    merged
}

/// Something that knows facts about plants
#[async_trait]
pub trait FactSource: Send + Sync {
    /// Name of this source, for logs
    fn name(&self) -> &'static str;

    /// Partial facts for `query`; unknown fields stay null
    async fn lookup(&self, query: &str) -> Result<FactSheet>;
}

/// Always returns the same sheet
pub struct StaticFactSource {
    sheet: FactSheet,
}

impl StaticFactSource {
    pub fn new(sheet: FactSheet) -> Self {
        Self { sheet }
    }

    /// Demo facts used when live lookups are switched off
    pub fn sample() -> Self {
        Self::new(FactSheet {
            toxicity_humans: Some("Toxic in all parts if eaten".to_string()),
            toxicity_pets: Some("Toxic to dogs & cats".to_string()),
            sun: Some("Full sun".to_string()),
            temp_min_c: Some("5°C".to_string()),
            temp_max_c: Some("43°C".to_string()),
            water_frequency: Some("Every 12 days".to_string()),
            distribution: Some("Cultivated in Denmark".to_string()),
            weed_potential: Some("Not considered weeds".to_string()),
            plant_type: Some("Herb".to_string()),
            summary: Some("A creeping succulent with blue-green, button-like leaves.".to_string()),
            reference_url: Some("https://en.wikipedia.org/wiki/Curio_repens".to_string()),
        })
    }
}

#[async_trait]
impl FactSource for StaticFactSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn lookup(&self, _query: &str) -> Result<FactSheet> {
        Ok(self.sheet.clone())
    }
}

/// Queries every source at once and merges what comes back.
/// Never fails: a broken source just contributes nothing.
pub struct FactLookup {
    sources: Vec<Box<dyn FactSource>>,
}

impl FactLookup {
    /// Sources in priority order
    pub fn new(sources: Vec<Box<dyn FactSource>>) -> Self {
        Self { sources }
    }

    /// Build the configured source list
    pub fn from_config(config: &FactsConfig) -> Result<Self> {
        if config.use_mock {
            return Ok(Self::new(vec![Box::new(StaticFactSource::sample())]));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("leaflens/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut sources: Vec<Box<dyn FactSource>> = Vec::new();
        if let Some(key) = config.perenual_api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            sources.push(Box::new(perenual::PerenualSource::new(client.clone(), &config.perenual_url, key)));
        }
        if config.wikipedia {
            sources.push(Box::new(wikipedia::WikipediaSource::new(client, &config.wikipedia_url)));
        }
        Ok(Self::new(sources))
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub async fn lookup(&self, query: &str) -> FactSheet {
        let query = query.trim();
        if query.is_empty() {
            return FactSheet::empty();
        }

        debug!("Looking up facts for {:?} from {} source(s)", query, self.sources.len());
        let results = join_all(self.sources.iter().map(|s| s.lookup(query))).await;

        let sheets: Vec<FactSheet> = results
            .into_iter()
            .zip(&self.sources)
            .filter_map(|(result, source)| match result {
                Ok(sheet) => Some(sheet),
                Err(e) => {
                    warn!("Fact source {} failed for {:?}: {}", source.name(), query, e);
                    None
                }
            })
            .collect();

        merge_facts(&sheets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LeafLensError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSource {
        sheet: FactSheet,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl FactSource for CountingSource {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn lookup(&self, _query: &str) -> Result<FactSheet> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.sheet.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl FactSource for FailingSource {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn lookup(&self, _query: &str) -> Result<FactSheet> {
            Err(LeafLensError::MalformedResponse("boom".to_string()))
        }
    }

    fn counting(sheet: FactSheet, calls: &Arc<AtomicUsize>) -> Box<dyn FactSource> {
        Box::new(CountingSource { sheet, calls: calls.clone() })
    }

    #[tokio::test]
    async fn test_first_source_wins_per_field() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lookup = FactLookup::new(vec![
            counting(FactSheet { sun: Some("Full sun".into()), ..Default::default() }, &calls),
            counting(
                FactSheet {
                    sun: Some("Partial shade".into()),
                    water_frequency: Some("Weekly".into()),
                    ..Default::default()
                },
                &calls,
            ),
        ]);

        let facts = lookup.lookup("Curio repens").await;
        assert_eq!(facts.sun.as_deref(), Some("Full sun"));
        assert_eq!(facts.water_frequency.as_deref(), Some("Weekly"));
        assert!(facts.toxicity_pets.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_query_skips_sources() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lookup = FactLookup::new(vec![counting(StaticFactSource::sample().sheet, &calls)]);

        assert!(lookup.lookup("").await.is_empty());
        assert!(lookup.lookup("   ").await.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_source_contributes_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lookup = FactLookup::new(vec![
            Box::new(FailingSource),
            counting(FactSheet { plant_type: Some("Herb".into()), ..Default::default() }, &calls),
        ]);
        let facts = lookup.lookup("Aloe").await;
        assert_eq!(facts.plant_type.as_deref(), Some("Herb"));

        let only_failing = FactLookup::new(vec![Box::new(FailingSource)]);
        assert!(only_failing.lookup("Aloe").await.is_empty());
    }

    #[test]
    fn test_empty_values_do_not_win() {
        let merged = merge_facts(&[
            FactSheet { summary: Some(String::new()), sun: Some(" ".into()), ..Default::default() },
            FactSheet {
                summary: Some("A succulent.".into()),
                sun: Some("Full sun".into()),
                ..Default::default()
            },
        ]);
        assert_eq!(merged.summary.as_deref(), Some("A succulent."));
        // only the empty string is skipped
        assert_eq!(merged.sun.as_deref(), Some(" "));
    }

    #[test]
    fn test_mock_config_uses_static_source() {
        let config = FactsConfig { use_mock: true, ..Default::default() };
        let lookup = FactLookup::from_config(&config).unwrap();
        assert_eq!(lookup.source_names(), vec!["static"]);
    }

    #[test]
    fn test_rows_skip_nulls() {
        let sheet = FactSheet {
            sun: Some("Full sun".into()),
            plant_type: Some("Herb".into()),
            ..Default::default()
        };
        assert_eq!(sheet.rows(), vec![("Sun", "Full sun"), ("Plant type", "Herb")]);
    }
}
