// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Wikipedia page summaries

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use super::{FactSheet, FactSource};
use crate::{LeafLensError, Result};

pub struct WikipediaSource {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct SummaryResponse {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    content_urls: Option<ContentUrls>,
}

#[derive(Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Deserialize)]
struct PageUrl {
    page: Option<String>,
}

impl WikipediaSource {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn summary_url(&self, query: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/page/summary", self.base_url))
            .map_err(|e| LeafLensError::Config(format!("Invalid Wikipedia URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| LeafLensError::Config(format!("Wikipedia URL cannot be a base: {}", self.base_url)))?
            .push(&page_title(query));
        Ok(url)
    }
}

/// Wikipedia titles use underscores for spaces
fn page_title(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join("_")
}

fn into_sheet(summary: SummaryResponse) -> FactSheet {
    // Disambiguation pages describe the word, not the plant
    if summary.kind.as_deref() == Some("disambiguation") {
        return FactSheet::empty();
    }

    FactSheet {
        summary: summary.extract,
        reference_url: summary.content_urls
            .and_then(|u| u.desktop)
            .and_then(|d| d.page),
        ..Default::default()
    }
}

#[async_trait]
impl FactSource for WikipediaSource {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    async fn lookup(&self, query: &str) -> Result<FactSheet> {
        let url = self.summary_url(query)?;
        debug!("Fetching Wikipedia summary: {}", url);

        let response = self.client.get(url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(FactSheet::empty());
        }
        if !response.status().is_success() {
            return Err(LeafLensError::MalformedResponse(format!(
                "Wikipedia returned status {}",
                response.status()
            )));
        }

        let summary: SummaryResponse = response.json().await?;
        Ok(into_sheet(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_title() {
        assert_eq!(page_title("  Curio   repens "), "Curio_repens");
    }

    #[test]
    fn test_summary_url_escapes_title() {
        let source = WikipediaSource::new(Client::new(), "https://en.wikipedia.org/api/rest_v1/");
        let url = source.summary_url("Curio repens/x").unwrap();
        assert_eq!(
            url.as_str(),
            "https://en.wikipedia.org/api/rest_v1/page/summary/Curio_repens%2Fx"
        );
    }

    #[test]
    fn test_summary_mapping() {
        let summary: SummaryResponse = serde_json::from_str(
            r#"{
                "type": "standard",
                "extract": "Curio repens is a succulent.",
                "content_urls": {"desktop": {"page": "https://en.wikipedia.org/wiki/Curio_repens"}}
            }"#,
        )
        .unwrap();
        let sheet = into_sheet(summary);
        assert_eq!(sheet.summary.as_deref(), Some("Curio repens is a succulent."));
        assert_eq!(sheet.reference_url.as_deref(), Some("https://en.wikipedia.org/wiki/Curio_repens"));
        assert!(sheet.sun.is_none());
    }

    #[test]
    fn test_disambiguation_ignored() {
        let summary: SummaryResponse =
            serde_json::from_str(r#"{"type": "disambiguation", "extract": "May refer to"}"#).unwrap();
        assert!(into_sheet(summary).is_empty());
    }
}
