// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Perenual plant database: species search followed by a details fetch

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{FactSheet, FactSource};
use crate::{LeafLensError, Result};

pub struct PerenualSource {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PerenualSource {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let response = self.client
            .get(url)
            .query(&[("key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LeafLensError::MalformedResponse(format!(
                "Perenual returned status {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}

/// Id of the first species in a search response
fn first_species_id(search: &Value) -> Option<u64> {
    search.get("data")?.as_array()?.first()?.get("id")?.as_u64()
}

/// Perenual flags are 0/1 in some records and booleans in others
fn flag(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    value?.as_str().map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

fn text_list(value: Option<&Value>) -> Option<String> {
    let items: Vec<&str> = value?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    (!items.is_empty()).then(|| items.join(", "))
}

fn capitalize(s: String) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => s,
    }
}

fn into_sheet(details: &Value) -> FactSheet {
    let toxicity = |key: &str, who: &str| {
        flag(details.get(key)).map(|toxic| {
            if toxic { format!("Toxic to {}", who) } else { format!("Not toxic to {}", who) }
        })
    };

    // "every 7-10 days" reads better than the coarse "Average" bucket
    let water_frequency = details.get("watering_general_benchmark")
        .and_then(|b| {
            let value = text(b.get("value"))?;
            let unit = text(b.get("unit")).unwrap_or_else(|| "days".to_string());
            Some(format!("Every {} {}", value.trim_matches('"'), unit))
        })
        .or_else(|| text(details.get("watering")));

    FactSheet {
        toxicity_humans: toxicity("poisonous_to_humans", "humans"),
        toxicity_pets: toxicity("poisonous_to_pets", "pets"),
        sun: text_list(details.get("sunlight")).map(capitalize),
        water_frequency,
        distribution: text_list(details.get("origin")).map(|o| format!("Native to {}", o)),
        weed_potential: flag(details.get("invasive")).map(|invasive| {
            let label = if invasive { "Considered invasive" } else { "Not considered invasive" };
            label.to_string()
        }),
        plant_type: text(details.get("type")).map(capitalize),
        summary: text(details.get("description")),
        ..Default::default()
    }
}

#[async_trait]
impl FactSource for PerenualSource {
    fn name(&self) -> &'static str {
        "perenual"
    }

    async fn lookup(&self, query: &str) -> Result<FactSheet> {
        let search = self
            .get_json(&format!("{}/species-list", self.base_url), &[("q", query)])
            .await?;

        let Some(id) = first_species_id(&search) else {
            debug!("Perenual has no species matching {:?}", query);
            return Ok(FactSheet::empty());
        };

        let details = self
            .get_json(&format!("{}/species/details/{}", self.base_url, id), &[])
            .await?;
        Ok(into_sheet(&details))
    }
}
