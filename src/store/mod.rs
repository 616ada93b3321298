// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Durable key/value storage and the two collections kept in it

pub mod history;
pub mod plants;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::{LeafLensError, Result};

pub use history::{HistoryEntry, HistoryStore, NewHistoryEntry};
pub use plants::{NewPlant, PlantsStore, SavedPlant};

/// String-keyed blob storage
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// One JSON file per key inside a data directory
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing a key
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c.to_ascii_lowercase() } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        // Write then rename so a crash never leaves half a file behind
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// In-process storage, shared between clones
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries.lock().map_err(|_| LeafLensError::Persistence("Storage lock poisoned".to_string()))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A list mirrored to one storage key.
///
/// Memory is authoritative. Writes are skipped until the first load has
/// finished so an empty start-up list never overwrites saved data, and write
/// failures are logged rather than returned.
pub(crate) struct PersistedList<T> {
    storage: Arc<dyn Storage>,
    key: &'static str,
    items: Vec<T>,
    loaded: bool,
}

impl<T> PersistedList<T>
where
    T: Serialize + DeserializeOwned,
{
    pub(crate) fn new(storage: Arc<dyn Storage>, key: &'static str) -> Self {
        Self {
            storage,
            key,
            items: Vec::new(),
            loaded: false,
        }
    }

    /// Read the stored list. Missing or unreadable data leaves it empty.
    pub(crate) async fn load(&mut self) {
        match self.storage.get(self.key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<T>>(&raw) {
                Ok(items) => {
                    debug!("Loaded {} item(s) from {}", items.len(), self.key);
                    self.items = items;
                }
                Err(e) => warn!("Failed to parse {}: {}", self.key, e),
            },
            Ok(None) => debug!("Nothing stored under {}", self.key),
            Err(e) => warn!("Failed to load {}: {}", self.key, e),
        }
        self.loaded = true;
    }

    pub(crate) fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub(crate) fn items(&self) -> &[T] {
        &self.items
    }

    /// Apply a change in memory, then mirror the whole list to storage
    pub(crate) async fn mutate<F>(&mut self, change: F)
    where
        F: FnOnce(&mut Vec<T>),
    {
        change(&mut self.items);
        self.persist().await;
    }

    async fn persist(&self) {
        if !self.loaded {
            debug!("Skipping save of {} before initial load", self.key);
            return;
        }

        let json = match serde_json::to_string(&self.items) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize {}: {}", self.key, e);
                return;
            }
        };

        if let Err(e) = self.storage.set(self.key, &json).await {
            warn!("Failed to save {}: {}", self.key, e);
        }
    }
}

/// Time-ordered unique identifier for stored records
pub fn new_record_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
