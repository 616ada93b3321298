// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Recent scans log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::{new_record_id, PersistedList, Storage};
use crate::ranking::UNKNOWN_LABEL;

/// Storage key for the scan log
pub const HISTORY_KEY: &str = "RECENT_SCANS_V1";

/// Most entries kept; older ones fall off the end
pub const HISTORY_CAP: usize = 60;

/// How many of the newest entries are checked for repeats
pub const DEDUP_WINDOW: usize = 10;

/// One identification the user ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub name: String,
    pub scientific_name: String,
    pub confidence: Option<f64>,
    pub image: Option<String>,
    pub identified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewHistoryEntry {
    pub name: Option<String>,
    pub scientific_name: Option<String>,
    pub confidence: Option<f64>,
    pub image: Option<String>,
}

/// True if one of the newest `window` entries has the same name
/// (ignoring case) and the same image
pub fn is_recent_duplicate(
    entries: &[HistoryEntry],
    name: &str,
    image: Option<&str>,
    window: usize,
) -> bool {
    let name = name.to_lowercase();
    let image = image.unwrap_or("");
    entries.iter().take(window).any(|e| {
        e.name.to_lowercase() == name && e.image.as_deref().unwrap_or("") == image
    })
}

/// Scan log, newest first
pub struct HistoryStore {
    list: PersistedList<HistoryEntry>,
    cap: usize,
    window: usize,
}

impl HistoryStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_limits(storage, HISTORY_CAP, DEDUP_WINDOW)
    }

    pub fn with_limits(storage: Arc<dyn Storage>, cap: usize, window: usize) -> Self {
        Self {
            list: PersistedList::new(storage, HISTORY_KEY),
            cap: cap.max(1),
            window,
        }
    }

    pub async fn open(storage: Arc<dyn Storage>) -> Self {
        let mut store = Self::new(storage);
        store.load().await;
        store
    }

    pub async fn load(&mut self) -> &[HistoryEntry] {
        self.list.load().await;
        self.list.items()
    }

    pub fn is_loaded(&self) -> bool {
        self.list.is_loaded()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        self.list.items()
    }

    /// Record a scan. Near-repeats of a recent entry are dropped silently.
    pub async fn add(&mut self, entry: NewHistoryEntry) {
        let name = entry.name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
        let scientific_name = entry.scientific_name
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| name.clone());
        let image = entry.image.filter(|i| !i.is_empty());

        if is_recent_duplicate(self.entries(), &name, image.as_deref(), self.window) {
            debug!("Skipping repeat history entry for {}", name);
            return;
        }

        let record = HistoryEntry {
            id: new_record_id(),
            name,
            scientific_name,
            confidence: entry.confidence,
            image,
            identified_at: Utc::now(),
        };

        let cap = self.cap;
        self.list.mutate(|entries| {
            entries.insert(0, record);
            entries.truncate(cap);
        }).await;
    }

    pub async fn remove(&mut self, id: &str) {
        self.list.mutate(|entries| entries.retain(|e| e.id != id)).await;
    }

    pub async fn clear(&mut self) {
        self.list.mutate(Vec::clear).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileStorage, MemoryStorage};
    use tempfile::tempdir;

    fn scan(name: &str, image: Option<&str>) -> NewHistoryEntry {
        NewHistoryEntry {
            name: Some(name.to_string()),
            scientific_name: None,
            confidence: Some(0.8),
            image: image.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_repeat_within_window_dropped() {
        let mut store = HistoryStore::open(Arc::new(MemoryStorage::new())).await;
        store.add(scan("Aloe", Some("a.jpg"))).await;
        store.add(scan("ALOE", Some("a.jpg"))).await;
        assert_eq!(store.entries().len(), 1);

        store.add(scan("Aloe", Some("b.jpg"))).await;
        assert_eq!(store.entries().len(), 2);
    }

    #[tokio::test]
    async fn test_repeat_outside_window_kept() {
        let mut store = HistoryStore::open(Arc::new(MemoryStorage::new())).await;
        store.add(scan("Aloe", Some("a.jpg"))).await;
        for i in 0..DEDUP_WINDOW {
            store.add(scan(&format!("plant-{}", i), None)).await;
        }
        store.add(scan("Aloe", Some("a.jpg"))).await;
        assert_eq!(store.entries().len(), DEDUP_WINDOW + 2);
        assert_eq!(store.entries()[0].name, "Aloe");
    }

    #[tokio::test]
    async fn test_capped_oldest_evicted() {
        let mut store = HistoryStore::open(Arc::new(MemoryStorage::new())).await;
        for i in 0..(HISTORY_CAP + 15) {
            store.add(scan(&format!("plant-{}", i), None)).await;
            assert!(store.entries().len() <= HISTORY_CAP);
        }
        assert_eq!(store.entries().len(), HISTORY_CAP);
        assert_eq!(store.entries()[0].name, format!("plant-{}", HISTORY_CAP + 14));
        assert_eq!(store.entries()[HISTORY_CAP - 1].name, "plant-15");
    }

    #[tokio::test]
    async fn test_defaults_for_missing_fields() {
        let mut store = HistoryStore::open(Arc::new(MemoryStorage::new())).await;
        store.add(NewHistoryEntry::default()).await;
        let entry = &store.entries()[0];
        assert_eq!(entry.name, "Unknown");
        assert_eq!(entry.scientific_name, "Unknown");
        assert!(entry.confidence.is_none());
        assert!(entry.image.is_none());
    }

    #[tokio::test]
    async fn test_missing_image_matches_missing_image() {
        let mut store = HistoryStore::open(Arc::new(MemoryStorage::new())).await;
        store.add(scan("Aloe", None)).await;
        store.add(scan("aloe", Some(""))).await;
        assert_eq!(store.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_clear_and_reload() {
        let dir = tempdir().unwrap();
        let mut store = HistoryStore::open(Arc::new(FileStorage::new(dir.path()))).await;
        store.add(scan("A", None)).await;
        store.add(scan("B", None)).await;
        store.add(scan("C", None)).await;

        let id = store.entries()[1].id.clone();
        store.remove(&id).await;
        let before = store.entries().to_vec();

        let reopened = HistoryStore::open(Arc::new(FileStorage::new(dir.path()))).await;
        assert_eq!(reopened.entries(), before.as_slice());

        let mut reopened = reopened;
        reopened.clear().await;
        let again = HistoryStore::open(Arc::new(FileStorage::new(dir.path()))).await;
        assert!(again.entries().is_empty());
    }

    #[test]
    fn test_recent_duplicate_is_pure() {
        let entries: Vec<HistoryEntry> = (0..3)
            .map(|i| HistoryEntry {
                id: i.to_string(),
                name: format!("n{}", i),
                scientific_name: String::new(),
                confidence: None,
                image: Some(format!("{}.jpg", i)),
                identified_at: Utc::now(),
            })
            .collect();
        assert!(is_recent_duplicate(&entries, "N2", Some("2.jpg"), 3));
        assert!(!is_recent_duplicate(&entries, "n2", Some("2.jpg"), 2));
        assert!(!is_recent_duplicate(&entries, "n0", None, 3));
    }
}
