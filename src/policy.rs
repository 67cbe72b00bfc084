// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Publication policy: label gating and coordinate privacy.

use crate::config::PublishConfig;
use crate::jitter::jitter;
use crate::normalizer::ProjectCandidate;
use crate::record::ProjectRecord;
use chrono::{DateTime, Utc};

/// Turns normalized candidates into stored records.
#[derive(Debug, Clone)]
pub struct PublishPolicy {
    required_label: Option<String>,
    jitter_radius_meters: f64,
    jitter_salt: String,
}

impl PublishPolicy {
    pub fn new(config: &PublishConfig) -> Self {
        Self {
            required_label: config
                .required_label
                .as_deref()
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .map(str::to_string),
            jitter_radius_meters: config.jitter_radius_meters,
            jitter_salt: config.jitter_salt.clone(),
        }
    }

    /// Whether a label set passes the publication gate.
    pub fn is_published(&self, labels: &[String]) -> bool {
        match &self.required_label {
            None => true,
            Some(required) => labels.iter().any(|label| label == required),
        }
    }

    /// Build the record to store. Raw coordinates never leave this function.
    pub fn apply(&self, candidate: ProjectCandidate, now: DateTime<Utc>) -> ProjectRecord {
        let published = self.is_published(&candidate.labels);
        let coordinates = candidate.coordinates.map(|(lat, lng)| {
            let seed = format!("{}{}", self.jitter_salt, candidate.id);
            jitter(lat, lng, self.jitter_radius_meters, &seed)
        });

        ProjectRecord {
            id: candidate.id,
            title: candidate.title,
            category: candidate.category,
            labels: candidate.labels,
            published,
            lat: coordinates.map(|c| c.0),
            lng: coordinates.map(|c| c.1),
            thumb_url: candidate.thumb_url,
            url: candidate.url,
            updated_at: now,
            missing_coords: coordinates.is_none(),
        }
    }
}
