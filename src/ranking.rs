// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Candidate model, confidence ranking and selection

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::plants::SavedPlant;

/// How many non-selected candidates are offered as alternatives
pub const MAX_ALTERNATIVES: usize = 2;

/// Label used when the service gives no name
pub const UNKNOWN_LABEL: &str = "Unknown";

/// A single identification match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub label: String,
    pub scientific_name: String,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f64,
    pub details: Option<CandidateDetails>,
    /// Image references, best first
    pub gallery: Vec<String>,
}

/// Supplementary details attached to a suggestion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateDetails {
    #[serde(default)]
    pub common_names: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub edible_parts: Vec<String>,
    #[serde(default)]
    pub watering: Option<Watering>,
    #[serde(default)]
    pub toxicity: Option<String>,
}

/// Watering need on the service's 0..1 scale
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Watering {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl CandidateDetails {
    /// Read details field by field; a malformed field only drops itself
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let common_names = obj.get("common_names")
            .and_then(Value::as_array)
            .map(|names| string_list(names))
            .unwrap_or_default();

        let url = obj.get("url").and_then(non_empty_str);

        // wiki_description is {"value": "..."}; accept a bare string too
        let description = obj.get("wiki_description")
            .and_then(|d| d.get("value").and_then(non_empty_str).or_else(|| non_empty_str(d)));

        let edible_parts = obj.get("edible_parts")
            .and_then(Value::as_array)
            .map(|parts| string_list(parts))
            .unwrap_or_default();

        let watering = obj.get("watering")
            .filter(|w| w.is_object())
            .map(|w| Watering {
                min: w.get("min").and_then(Value::as_f64),
                max: w.get("max").and_then(Value::as_f64),
            });

        let toxicity = obj.get("toxicity").and_then(non_empty_str);

        Some(Self {
            common_names,
            url,
            description,
            edible_parts,
            watering,
            toxicity,
        })
    }

    pub fn primary_common_name(&self) -> Option<&str> {
        self.common_names.first().map(String::as_str)
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value.as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn string_list(values: &[Value]) -> Vec<String> {
    values.iter().filter_map(non_empty_str).collect()
}

impl Candidate {
    /// Common name when known, otherwise the label
    pub fn display_name(&self) -> &str {
        self.details.as_ref()
            .and_then(|d| d.primary_common_name())
            .unwrap_or(&self.label)
    }

    /// First gallery image, or the photo the scan started from
    pub fn hero_image<'a>(&'a self, photo: Option<&'a str>) -> Option<&'a str> {
        self.gallery.first().map(String::as_str).or(photo)
    }

    /// Name used to look up supplementary facts
    pub fn fact_query(&self) -> &str {
        if !self.scientific_name.is_empty() {
            return &self.scientific_name;
        }
        self.details.as_ref()
            .and_then(|d| d.primary_common_name())
            .unwrap_or(&self.label)
    }

    /// Rebuild a single-candidate view of a plant the user saved earlier
    pub fn from_saved(plant: &SavedPlant) -> Self {
        let label = first_non_empty(&[plant.name.as_str(), plant.scientific_name.as_str()]);
        let scientific_name = first_non_empty(&[plant.scientific_name.as_str(), plant.name.as_str()]);

        Self {
            label,
            scientific_name,
            confidence: plant.confidence,
            details: plant.details.clone(),
            gallery: plant.image.iter().filter(|i| !i.is_empty()).cloned().collect(),
        }
    }
}

fn first_non_empty(options: &[&str]) -> String {
    options.iter()
        .find(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}

/// Sort by descending confidence, keeping source order for ties, and make
/// sure the top candidate has something to show.
pub fn rank(mut candidates: Vec<Candidate>, fallback_image: Option<&str>) -> Vec<Candidate> {
    // Vec::sort_by is stable
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    if let (Some(top), Some(image)) = (candidates.first_mut(), fallback_image) {
        if top.gallery.is_empty() && !image.is_empty() {
            top.gallery.push(image.to_string());
        }
    }

    candidates
}

/// Ranked candidates plus the user's current pick
#[derive(Debug, Clone)]
pub struct Ranking {
    candidates: Vec<Candidate>,
    current: usize,
    show_alternatives: bool,
    max_alternatives: usize,
}

impl Ranking {
    /// Wrap an already ranked list; selection starts at the top match
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self::with_max_alternatives(candidates, MAX_ALTERNATIVES)
    }

    pub fn with_max_alternatives(candidates: Vec<Candidate>, max_alternatives: usize) -> Self {
        Self {
            candidates,
            current: 0,
            show_alternatives: false,
            max_alternatives,
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn current(&self) -> Option<&Candidate> {
        self.candidates.get(self.current)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn showing_alternatives(&self) -> bool {
        self.show_alternatives
    }

    pub fn toggle_alternatives(&mut self) {
        self.show_alternatives = !self.show_alternatives;
    }

    /// Make the candidate with this label the current one.
    /// Returns false (and changes nothing) when no candidate matches.
    pub fn promote(&mut self, label: &str) -> bool {
        match self.candidates.iter().position(|c| c.label == label) {
            Some(idx) => {
                self.current = idx;
                self.show_alternatives = false;
                true
            }
            None => false,
        }
    }

    /// Go back to the top match. Returns false if it was already selected.
    pub fn reset_to_top(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current = 0;
        self.show_alternatives = false;
        true
    }

    /// Candidates other than the current one, in rank order, capped
    pub fn alternatives(&self) -> Vec<&Candidate> {
        self.candidates.iter()
            .enumerate()
            .filter(|(i, _)| *i != self.current)
            .map(|(_, c)| c)
            .take(self.max_alternatives)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(label: &str, confidence: f64) -> Candidate {
        Candidate {
            label: label.to_string(),
            scientific_name: label.to_string(),
            confidence,
            details: None,
            gallery: Vec::new(),
        }
    }

    #[test]
    fn test_rank_sorts_descending_and_stable() {
        let ranked = rank(
            vec![
                candidate("a", 0.2),
                candidate("b", 0.9),
                candidate("c", 0.5),
                candidate("d", 0.9),
                candidate("e", 0.5),
            ],
            None,
        );
        let labels: Vec<_> = ranked.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["b", "d", "c", "e", "a"]);
        assert!(ranked.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn test_rank_seeds_top_gallery_with_photo() {
        let mut second = candidate("b", 0.1);
        second.gallery.push("https://img/b.jpg".to_string());

        let ranked = rank(vec![candidate("a", 0.8), second], Some("file:///photo.jpg"));
        assert_eq!(ranked[0].gallery, vec!["file:///photo.jpg"]);
        assert_eq!(ranked[1].gallery, vec!["https://img/b.jpg"]);
    }

    #[test]
    fn test_rank_keeps_existing_top_gallery() {
        let mut top = candidate("a", 0.8);
        top.gallery.push("https://img/a.jpg".to_string());
        let ranked = rank(vec![top], Some("file:///photo.jpg"));
        assert_eq!(ranked[0].gallery, vec!["https://img/a.jpg"]);
    }

    #[test]
    fn test_rank_empty_list() {
        assert!(rank(Vec::new(), Some("file:///photo.jpg")).is_empty());
    }

    #[test]
    fn test_promote_and_alternatives() {
        let mut ranking = Ranking::new(vec![
            candidate("a", 0.9),
            candidate("b", 0.5),
            candidate("c", 0.3),
            candidate("d", 0.1),
        ]);

        let alts: Vec<_> = ranking.alternatives().iter().map(|c| c.label.clone()).collect();
        assert_eq!(alts, vec!["b", "c"]);

        ranking.toggle_alternatives();
        assert!(ranking.promote("c"));
        assert_eq!(ranking.current().unwrap().label, "c");
        assert!(!ranking.showing_alternatives());

        let alts: Vec<_> = ranking.alternatives().iter().map(|c| c.label.clone()).collect();
        assert_eq!(alts, vec!["a", "b"]);
    }

    #[test]
    fn test_promote_unknown_label_is_noop() {
        let mut ranking = Ranking::new(vec![candidate("a", 0.9), candidate("b", 0.5)]);
        ranking.toggle_alternatives();
        assert!(!ranking.promote("zzz"));
        assert_eq!(ranking.current_index(), 0);
        assert!(ranking.showing_alternatives());
    }

    #[test]
    fn test_reset_to_top() {
        let mut ranking = Ranking::new(vec![candidate("a", 0.9), candidate("b", 0.5)]);
        assert!(!ranking.reset_to_top());
        ranking.promote("b");
        assert!(ranking.reset_to_top());
        assert_eq!(ranking.current_index(), 0);
    }

    #[test]
    fn test_configurable_alternative_cap() {
        let ranking = Ranking::with_max_alternatives(
            vec![candidate("a", 0.9), candidate("b", 0.5), candidate("c", 0.3)],
            1,
        );
        assert_eq!(ranking.alternatives().len(), 1);
    }

    #[test]
    fn test_details_lenient_parse() {
        let details = CandidateDetails::from_value(&json!({
            "common_names": ["String of Buttons", null, ""],
            "url": "https://en.wikipedia.org/wiki/Curio_repens",
            "wiki_description": {"value": "A creeping succulent."},
            "edible_parts": "not-a-list",
            "watering": {"min": 1, "max": 2},
            "toxicity": 42
        }))
        .unwrap();

        assert_eq!(details.common_names, vec!["String of Buttons"]);
        assert_eq!(details.description.as_deref(), Some("A creeping succulent."));
        assert!(details.edible_parts.is_empty());
        assert_eq!(details.watering, Some(Watering { min: Some(1.0), max: Some(2.0) }));
        assert!(details.toxicity.is_none());
        assert!(CandidateDetails::from_value(&json!(null)).is_none());
    }

    #[test]
    fn test_display_name_and_fact_query() {
        let mut c = candidate("Curio repens", 0.9);
        assert_eq!(c.display_name(), "Curio repens");

        c.details = Some(CandidateDetails {
            common_names: vec!["String of Buttons".to_string()],
            ..Default::default()
        });
        assert_eq!(c.display_name(), "String of Buttons");
        assert_eq!(c.fact_query(), "Curio repens");

        c.scientific_name.clear();
        assert_eq!(c.fact_query(), "String of Buttons");
    }
}
