// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! A single identification session: run a scan (or reopen a saved plant),
//! keep track of the chosen candidate, and fetch facts for it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::facts::{FactLookup, FactSheet};
use crate::photo::PhotoRef;
use crate::plant_id::{IdentificationApi, PlantIdClient};
use crate::ranking::{Candidate, CandidateDetails, Ranking};
use crate::store::{HistoryStore, NewHistoryEntry, NewPlant, PlantsStore, SavedPlant};
use crate::Result;

/// Result of running an identification
#[derive(Debug)]
pub enum IdentifyOutcome {
    Matches(ScanSession),
    /// The service answered but recognised nothing
    NoMatches,
}

/// Where the session's candidates came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Scan,
    Saved,
}

/// Set once the consumer of a session has gone away; results that arrive
/// afterwards are dropped instead of committed. The request itself is not
/// aborted.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct ScanSession {
    ranking: Ranking,
    photo: Option<String>,
    origin: Origin,
    facts: Option<FactSheet>,
}

impl ScanSession {
    /// Session over freshly ranked candidates
    pub fn from_candidates(candidates: Vec<Candidate>, photo: Option<&str>, max_alternatives: usize) -> Self {
        Self {
            ranking: Ranking::with_max_alternatives(candidates, max_alternatives),
            photo: photo.map(String::from),
            origin: Origin::Scan,
            facts: None,
        }
    }

    /// Reopen a saved plant without contacting the identification service.
    /// Facts saved with the plant are available immediately.
    pub fn from_saved(plant: &SavedPlant, max_alternatives: usize) -> Self {
        Self {
            ranking: Ranking::with_max_alternatives(vec![Candidate::from_saved(plant)], max_alternatives),
            photo: plant.image.clone(),
            origin: Origin::Saved,
            facts: plant.facts.clone(),
        }
    }

    pub fn ranking(&self) -> &Ranking {
        &self.ranking
    }

    pub fn current(&self) -> Option<&Candidate> {
        self.ranking.current()
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn is_from_saved(&self) -> bool {
        self.origin == Origin::Saved
    }

    pub fn photo(&self) -> Option<&str> {
        self.photo.as_deref()
    }

    pub fn facts(&self) -> Option<&FactSheet> {
        self.facts.as_ref()
    }

    /// Switch to another candidate by label. Facts for the old pick are
    /// discarded since they describe a different plant.
    pub fn promote(&mut self, label: &str) -> bool {
        let before = self.ranking.current_index();
        if !self.ranking.promote(label) {
            return false;
        }
        if self.ranking.current_index() != before {
            self.facts = None;
        }
        true
    }

    /// Back to the top match; false if it was already selected
    pub fn reset_to_top(&mut self) -> bool {
        let moved = self.ranking.reset_to_top();
        if moved {
            self.facts = None;
        }
        moved
    }

    /// Fetch facts for the current candidate and keep them unless the
    /// session was cancelled while the lookup ran. Returns whether the
    /// result was committed.
    pub async fn refresh_facts(&mut self, lookup: &FactLookup, cancel: &CancelFlag) -> bool {
        let Some(query) = self.current().map(|c| c.fact_query().to_string()) else {
            return false;
        };

        self.facts = None;
        let sheet = lookup.lookup(&query).await;

        if cancel.is_cancelled() {
            debug!("Fact lookup for {:?} finished after cancel, dropping", query);
            return false;
        }
        self.facts = Some(sheet);
        true
    }

    pub fn hero_image(&self) -> Option<&str> {
        self.current()?.hero_image(self.photo.as_deref())
    }

    /// Details page link: the service's URL, else the fact sheet's
    pub fn learn_more_url(&self) -> Option<&str> {
        self.current_details()
            .and_then(|d| d.url.as_deref())
            .or_else(|| self.facts.as_ref()?.reference_url.as_deref())
    }

    /// Description: the service's text, else the fact summary
    pub fn description(&self) -> Option<&str> {
        self.current_details()
            .and_then(|d| d.description.as_deref())
            .or_else(|| self.facts.as_ref()?.summary.as_deref())
    }

    fn current_details(&self) -> Option<&CandidateDetails> {
        self.current()?.details.as_ref()
    }

    /// What "add to my plants" stores for the current candidate
    pub fn to_new_plant(&self) -> Option<NewPlant> {
        let current = self.current()?;
        Some(NewPlant {
            name: current.display_name().to_string(),
            scientific_name: current.scientific_name.clone(),
            confidence: current.confidence,
            image: self.hero_image().map(String::from),
            details: current.details.clone(),
            facts: self.facts.clone(),
        })
    }
}

/// Identify a photo and log the top match to history.
pub async fn identify_photo<A: IdentificationApi>(
    client: &PlantIdClient<A>,
    history: &mut HistoryStore,
    photo: &PhotoRef,
    max_alternatives: usize,
) -> Result<IdentifyOutcome> {
    let bytes = photo.read().await?;
    let candidates = client.identify(&bytes, Some(photo.reference())).await?;

    let Some(top) = candidates.first() else {
        info!("No matches for {}", photo.reference());
        return Ok(IdentifyOutcome::NoMatches);
    };

    log_scan(history, top, Some(photo.reference())).await;

    Ok(IdentifyOutcome::Matches(ScanSession::from_candidates(
        candidates,
        Some(photo.reference()),
        max_alternatives,
    )))
}

/// Record a finished scan. History bookkeeping never fails the scan: the
/// store swallows and logs its own errors and this returns nothing.
pub async fn log_scan(history: &mut HistoryStore, top: &Candidate, photo: Option<&str>) {
    history
        .add(NewHistoryEntry {
            name: Some(top.display_name().to_string()),
            scientific_name: Some(top.scientific_name.clone()),
            confidence: Some(top.confidence),
            image: top.hero_image(photo).map(String::from),
        })
        .await;
}

/// Save the session's current candidate; false if nothing to save or
/// already saved
pub async fn save_current(plants: &mut PlantsStore, session: &ScanSession) -> bool {
    match session.to_new_plant() {
        Some(plant) => plants.add(plant).await,
        None => false,
    }
}

/// Care level from the watering range
pub fn care_badge(details: Option<&CandidateDetails>) -> &'static str {
    let Some(watering) = details.and_then(|d| d.watering) else {
        return "Moderate Care";
    };
    let avg = (watering.min.unwrap_or(0.5) + watering.max.unwrap_or(0.5)) / 2.0;
    if avg <= 0.25 {
        "Easy Care"
    } else if avg <= 0.55 {
        "Moderate Care"
    } else {
        "Thirsty"
    }
}

pub fn edible_badge(details: Option<&CandidateDetails>) -> &'static str {
    match details {
        Some(d) if !d.edible_parts.is_empty() => "Edible",
        _ => "Not edible",
    }
}

pub fn flowering_badge(details: Option<&CandidateDetails>) -> &'static str {
    let flowering = details
        .and_then(|d| d.description.as_deref())
        .is_some_and(|text| text.to_lowercase().contains("flower"));
    if flowering { "Flowering" } else { "Foliage" }
}

/// Confidence as a whole percentage, e.g. "87%"
pub fn percent(confidence: f64) -> String {
    let value = if confidence.is_finite() { confidence } else { 0.0 };
    format!("{}%", (value * 100.0).round() as i64)
}
