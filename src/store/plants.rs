// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! "My Plants": the user's saved identifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::{new_record_id, PersistedList, Storage};
use crate::facts::FactSheet;
use crate::ranking::CandidateDetails;

/// Storage key for saved plants
pub const PLANTS_KEY: &str = "MY_PLANTS_V1";

/// A plant the user chose to keep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPlant {
    pub id: String,
    pub name: String,
    pub scientific_name: String,
    pub confidence: f64,
    pub image: Option<String>,
    pub details: Option<CandidateDetails>,
    pub facts: Option<FactSheet>,
    pub saved_at: DateTime<Utc>,
}

/// Fields supplied when saving a plant
#[derive(Debug, Clone, Default)]
pub struct NewPlant {
    pub name: String,
    pub scientific_name: String,
    pub confidence: f64,
    pub image: Option<String>,
    pub details: Option<CandidateDetails>,
    pub facts: Option<FactSheet>,
}

/// Whether `plants` already holds this (scientific name, name) pair,
/// compared case-insensitively
pub fn is_duplicate_plant(plants: &[SavedPlant], scientific_name: &str, name: &str) -> bool {
    let sci = scientific_name.to_lowercase();
    let name = name.to_lowercase();
    plants.iter().any(|p| {
        p.scientific_name.to_lowercase() == sci && p.name.to_lowercase() == name
    })
}

/// Saved plants, newest first
pub struct PlantsStore {
    list: PersistedList<SavedPlant>,
}

impl PlantsStore {
    /// An empty store that will not write until [`PlantsStore::load`] runs
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            list: PersistedList::new(storage, PLANTS_KEY),
        }
    }

    /// Create and load in one step
    pub async fn open(storage: Arc<dyn Storage>) -> Self {
        let mut store = Self::new(storage);
        store.load().await;
        store
    }

    pub async fn load(&mut self) -> &[SavedPlant] {
        self.list.load().await;
        self.list.items()
    }

    pub fn is_loaded(&self) -> bool {
        self.list.is_loaded()
    }

    pub fn plants(&self) -> &[SavedPlant] {
        self.list.items()
    }

    pub fn get(&self, id: &str) -> Option<&SavedPlant> {
        self.plants().iter().find(|p| p.id == id)
    }

    /// Save a plant. Returns false, changing nothing, if it is already saved.
    pub async fn add(&mut self, plant: NewPlant) -> bool {
        if is_duplicate_plant(self.plants(), &plant.scientific_name, &plant.name) {
            warn!("Already saved: {} ({})", plant.name, plant.scientific_name);
            return false;
        }

        let record = SavedPlant {
            id: new_record_id(),
            name: plant.name,
            scientific_name: plant.scientific_name,
            confidence: plant.confidence,
            image: plant.image,
            details: plant.details,
            facts: plant.facts,
            saved_at: Utc::now(),
        };
        info!("Saved plant {} ({})", record.name, record.id);

        self.list.mutate(|plants| plants.insert(0, record)).await;
        true
    }

    /// Remove by id; unknown ids are ignored
    pub async fn remove(&mut self, id: &str) {
        self.list.mutate(|plants| plants.retain(|p| p.id != id)).await;
    }

    pub async fn clear(&mut self) {
        self.list.mutate(Vec::clear).await;
    }
}
