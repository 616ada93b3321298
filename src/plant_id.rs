// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Plant.id API client: submit a photo, fetch the classification, and turn
//! the suggestions into ranked candidates.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::PlantIdConfig;
use crate::ranking::{rank, Candidate, CandidateDetails, UNKNOWN_LABEL};
use crate::{LeafLensError, Result};

/// Raw status and body returned by the identification service
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRequest {
    pub images: Vec<String>,
    pub similar_images: bool,
}

/// Transport for the two identification endpoints
#[async_trait]
pub trait IdentificationApi: Send + Sync {
    /// POST the creation request
    async fn create(&self, request: &CreateRequest) -> Result<ApiResponse>;

    /// GET the full result for an identification token
    async fn retrieve(&self, token: &str, details: &str, language: &str) -> Result<ApiResponse>;
}

/// reqwest-backed transport
pub struct HttpIdentificationApi {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpIdentificationApi {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        // Normalize URL
        let base_url = base_url
            .trim_end_matches('/')
            .trim_end_matches("/identification")
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    fn identification_url(&self, token: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/identification", self.base_url))
            .map_err(|e| LeafLensError::Config(format!("Invalid plant.id URL {}: {}", self.base_url, e)))?;
        if let Some(token) = token {
            url.path_segments_mut()
                .map_err(|_| LeafLensError::Config(format!("plant.id URL cannot be a base: {}", self.base_url)))?
                .push(token);
        }
        Ok(url)
    }
}

#[async_trait]
impl IdentificationApi for HttpIdentificationApi {
    async fn create(&self, request: &CreateRequest) -> Result<ApiResponse> {
        let url = self.identification_url(None)?;
        debug!("Submitting identification: {} image(s)", request.images.len());

        let response = self.client
            .post(url)
            .header("Api-Key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ApiResponse { status, body })
    }

    async fn retrieve(&self, token: &str, details: &str, language: &str) -> Result<ApiResponse> {
        let url = self.identification_url(Some(token))?;
        debug!("Retrieving identification {}", token);

        let response = self.client
            .get(url)
            .header("Api-Key", &self.api_key)
            .query(&[("details", details), ("language", language)])
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ApiResponse { status, body })
    }
}

/// Identification client
pub struct PlantIdClient<A = HttpIdentificationApi> {
    api: A,
    details: Vec<String>,
    language: String,
    similar_images: bool,
}

impl PlantIdClient<HttpIdentificationApi> {
    /// Create a client for the configured service
    pub fn from_config(config: &PlantIdConfig) -> Result<Self> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            LeafLensError::Config(format!(
                "No plant.id API key: set plant_id.api_key or {}",
                crate::config::API_KEY_ENV
            ))
        })?;
        let api = HttpIdentificationApi::new(
            &config.url,
            &api_key,
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self::with_api(api, config))
    }
}

impl<A: IdentificationApi> PlantIdClient<A> {
    pub fn with_api(api: A, config: &PlantIdConfig) -> Self {
        Self {
            api,
            details: config.details.clone(),
            language: config.language.clone(),
            similar_images: config.similar_images,
        }
    }

    /// Identify the plant in `image`, best match first.
    ///
    /// `photo` is the display reference of the submitted image; it seeds the
    /// top candidate's gallery when the service returns no similar images.
    /// An empty list means the service found nothing, which is not an error.
    pub async fn identify(&self, image: &[u8], photo: Option<&str>) -> Result<Vec<Candidate>> {
        if image.is_empty() {
            return Err(LeafLensError::InvalidInput("Image is empty".to_string()));
        }

        let created = self.submit(image).await?;

        let full = match identification_token(&created) {
            Some(token) => self.fetch(&token).await?,
            None => {
                debug!("Creation response carries no token, using it as the result");
                created
            }
        };

        let candidates = candidates_from_result(&full);
        info!("Identification returned {} suggestion(s)", candidates.len());
        Ok(rank(candidates, photo))
    }

    /// Create the identification, retrying once as a data URL if the bare
    /// base64 payload is rejected.
    async fn submit(&self, image: &[u8]) -> Result<Value> {
        let encoded = general_purpose::STANDARD.encode(image);

        match self.create(encoded.clone()).await {
            Err(e) if e.is_payload_rejection() => {
                warn!("Payload rejected ({}), retrying as data URL", e);
                self.create(format!("data:image/jpeg;base64,{}", encoded)).await
            }
            other => other,
        }
    }

    async fn create(&self, image: String) -> Result<Value> {
        let request = CreateRequest {
            images: vec![image],
            similar_images: self.similar_images,
        };

        let response = self.api.create(&request).await.map_err(|e| match e {
            // status 0: no HTTP response was received
            LeafLensError::Http(err) => LeafLensError::SubmissionRejected { status: 0, body: err.to_string() },
            other => other,
        })?;

        if !response.is_success() {
            return Err(LeafLensError::SubmissionRejected {
                status: response.status,
                body: response.body,
            });
        }

        parse_body(&response.body)
    }

    async fn fetch(&self, token: &str) -> Result<Value> {
        let details = self.details.join(",");

        let response = self.api
            .retrieve(token, &details, &self.language)
            .await
            .map_err(|e| match e {
                LeafLensError::Http(err) => LeafLensError::RetrievalFailed { status: 0, body: err.to_string() },
                other => other,
            })?;

        if !response.is_success() {
            return Err(LeafLensError::RetrievalFailed {
                status: response.status,
                body: response.body,
            });
        }

        parse_body(&response.body)
    }
}

fn parse_body(body: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| LeafLensError::MalformedResponse(format!("Invalid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(LeafLensError::MalformedResponse("Expected a JSON object".to_string()));
    }
    Ok(value)
}

/// `id` or `access_token` from a creation response
fn identification_token(created: &Value) -> Option<String> {
    ["id", "access_token"].iter().find_map(|key| match created.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Where a response may keep its suggestions
type SuggestionExtractor = fn(&Value) -> Option<&Vec<Value>>;

/// Tried in order; the first hit wins
const SUGGESTION_EXTRACTORS: &[SuggestionExtractor] = &[
    top_level_classification,
    is_plant_classification,
];

fn top_level_classification(full: &Value) -> Option<&Vec<Value>> {
    full.pointer("/result/classification/suggestions")?.as_array()
}

fn is_plant_classification(full: &Value) -> Option<&Vec<Value>> {
    full.pointer("/result/is_plant/classification/suggestions")?.as_array()
}

/// Suggestions from whichever response shape is present
pub fn extract_suggestions(full: &Value) -> &[Value] {
    SUGGESTION_EXTRACTORS.iter()
        .find_map(|extract| extract(full))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Map a retrieval result into unranked candidates
pub fn candidates_from_result(full: &Value) -> Vec<Candidate> {
    extract_suggestions(full).iter().map(candidate_from_suggestion).collect()
}

/// Parse a raw retrieval body into ranked candidates
pub fn parse_candidates(body: &str, photo: Option<&str>) -> Result<Vec<Candidate>> {
    let full = parse_body(body)?;
    Ok(rank(candidates_from_result(&full), photo))
}

fn candidate_from_suggestion(suggestion: &Value) -> Candidate {
    let name = suggestion.get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let label = name.unwrap_or(UNKNOWN_LABEL).to_string();

    let gallery = suggestion.get("similar_images")
        .and_then(Value::as_array)
        .map(|images| {
            images.iter()
                .filter_map(|img| img.get("url").and_then(Value::as_str))
                .filter(|url| !url.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Candidate {
        scientific_name: label.clone(),
        label,
        confidence: coerce_probability(suggestion.get("probability")),
        details: suggestion.get("details").and_then(CandidateDetails::from_value),
        gallery,
    }
}

/// Probability as a float in [0, 1]; anything unusable counts as 0
fn coerce_probability(value: Option<&Value>) -> f64 {
    let p = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if p.is_nan() {
        0.0
    } else {
        // + 0.0 folds -0.0 into 0.0 so equal scores stay in source order
        p.clamp(0.0, 1.0) + 0.0
    }
}
