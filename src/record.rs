// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Stored project records and their store keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key namespace for individual project records.
pub const RECORD_PREFIX: &str = "project:";

/// Key of the single published-feed entry.
pub const FEED_CACHE_KEY: &str = "cache:projects.geojson";

/// Title used when the payload carries none.
pub const DEFAULT_TITLE: &str = "Project";

/// One field-service project, replaced wholesale on every accepted webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub missing_coords: bool,
}

impl ProjectRecord {
    /// Store key for a project id.
    pub fn key_for(id: &str) -> String {
        format!("{RECORD_PREFIX}{id}")
    }

    /// Store key for this record.
    pub fn key(&self) -> String {
        Self::key_for(&self.id)
    }

    /// Both coordinates, if present and finite.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some((lat, lng)),
            _ => None,
        }
    }

    /// Whether the record belongs in the published feed.
    pub fn is_publishable(&self) -> bool {
        self.published && !self.missing_coords && self.coordinates().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ProjectRecord {
        ProjectRecord {
            id: "42".to_string(),
            title: DEFAULT_TITLE.to_string(),
            category: None,
            labels: vec![],
            published: true,
            lat: Some(30.1),
            lng: Some(-87.2),
            thumb_url: None,
            url: None,
            updated_at: Utc::now(),
            missing_coords: false,
        }
    }

    #[test]
    fn test_key_namespace() {
        assert_eq!(record().key(), "project:42");
        assert!(!FEED_CACHE_KEY.starts_with(RECORD_PREFIX));
    }

    #[test]
    fn test_publishable() {
        assert!(record().is_publishable());

        let mut unpublished = record();
        unpublished.published = false;
        assert!(!unpublished.is_publishable());

        let mut no_coords = record();
        no_coords.lng = None;
        no_coords.missing_coords = true;
        assert!(!no_coords.is_publishable());

        let mut infinite = record();
        infinite.lat = Some(f64::INFINITY);
        assert!(!infinite.is_publishable());
    }

    #[test]
    fn test_serialized_form_round_trips() {
        let original = record();
        let json = serde_json::to_string(&original).unwrap();
        let parsed: ProjectRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
        assert!(!json.contains("category"));
    }
}
