// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Webhook payload normalization.
//!
//! Different webhook event types nest the project object differently. The
//! project is located by an ordered list of [`ExtractionRule`]s; the first
//! rule whose object carries a non-empty id wins, and every other field is
//! read from that same object.
//!
//! - Id: `id`, then `project_id`, then `uuid` (strings or numbers)
//! - Title: `title`, then `name`; defaults to `Project`
//! - Labels: `labels` or `tags`, as strings or `{ "name": ... }` objects
//! - Coordinates: `lat`/`latitude` with `lng`/`longitude`/`lon`, on the
//!   project itself or inside its `location` object

use crate::record::DEFAULT_TITLE;
use serde_json::{Map, Value};
use tracing::debug;

/// Keys accepted as the project id, in priority order.
const ID_KEYS: &[&str] = &["id", "project_id", "uuid"];
const TITLE_KEYS: &[&str] = &["title", "name"];
const LABEL_KEYS: &[&str] = &["labels", "tags"];
const LAT_KEYS: &[&str] = &["lat", "latitude"];
const LNG_KEYS: &[&str] = &["lng", "longitude", "lon"];
const THUMB_KEYS: &[&str] = &["thumb_url", "thumbnail_url", "thumbnail"];
const URL_KEYS: &[&str] = &["url", "project_url", "link"];

/// Locates the project object at a fixed path inside the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionRule {
    /// Name used in logs
    pub name: &'static str,
    /// Object keys walked from the payload root
    pub path: &'static [&'static str],
}

/// Project locations, evaluated in order.
pub const PROJECT_RULES: &[ExtractionRule] = &[
    ExtractionRule {
        name: "project",
        path: &["project"],
    },
    ExtractionRule {
        name: "data.project",
        path: &["data", "project"],
    },
    ExtractionRule {
        name: "data",
        path: &["data"],
    },
    ExtractionRule {
        name: "root",
        path: &[],
    },
];

/// Located project object together with its resolved id.
#[derive(Debug)]
pub struct RuleMatch<'a> {
    pub rule: &'static str,
    pub id: String,
    pub object: &'a Map<String, Value>,
}

impl ExtractionRule {
    /// Apply the rule; `None` means the rule is not applicable to this payload.
    pub fn apply<'a>(&self, payload: &'a Value) -> Option<RuleMatch<'a>> {
        let mut node = payload;
        for key in self.path {
            node = node.as_object()?.get(*key)?;
        }
        let object = node.as_object()?;
        let id = ID_KEYS.iter().find_map(|key| object.get(*key).and_then(id_value))?;

        Some(RuleMatch {
            rule: self.name,
            id,
            object,
        })
    }
}

/// Canonical project fields extracted from a payload, before publication policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectCandidate {
    pub id: String,
    pub title: String,
    pub category: Option<String>,
    pub labels: Vec<String>,
    /// `(lat, lng)` when both resolve to finite, in-range numbers
    pub coordinates: Option<(f64, f64)>,
    pub thumb_url: Option<String>,
    pub url: Option<String>,
}

/// Extracts [`ProjectCandidate`]s from arbitrary JSON payloads.
#[derive(Debug, Clone)]
pub struct PayloadNormalizer {
    rules: &'static [ExtractionRule],
}

impl Default for PayloadNormalizer {
    fn default() -> Self {
        Self::new(PROJECT_RULES)
    }
}

impl PayloadNormalizer {
    /// Create a normalizer with an explicit rule list.
    pub fn new(rules: &'static [ExtractionRule]) -> Self {
        Self { rules }
    }

    /// Extract a candidate record; `None` when no id can be resolved.
    pub fn extract(&self, payload: &Value) -> Option<ProjectCandidate> {
        let Some(found) = self.rules.iter().find_map(|rule| rule.apply(payload)) else {
            debug!("No extraction rule matched payload");
            return None;
        };
        debug!(rule = found.rule, project_id = %found.id, "Project located");

        let object = found.object;
        Some(ProjectCandidate {
            title: first_string(object, TITLE_KEYS).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            category: first_string(object, &["category"]),
            labels: LABEL_KEYS
                .iter()
                .find_map(|key| object.get(*key))
                .map(normalize_labels)
                .unwrap_or_default(),
            coordinates: coordinates(object).or_else(|| {
                object
                    .get("location")
                    .and_then(Value::as_object)
                    .and_then(coordinates)
            }),
            thumb_url: first_string(object, THUMB_KEYS),
            url: first_string(object, URL_KEYS),
            id: found.id,
        })
    }
}

/// Normalize a label list.
///
/// Accepts strings and `{ "name": string }` objects; anything else is
/// dropped. Entries are trimmed and empty results discarded.
pub fn normalize_labels(value: &Value) -> Vec<String> {
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("name").and_then(Value::as_str),
            _ => None,
        })
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Coerce a JSON value to a finite float.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn coordinates(object: &Map<String, Value>) -> Option<(f64, f64)> {
    let lat = LAT_KEYS.iter().find_map(|key| object.get(*key).and_then(coerce_number))?;
    let lng = LNG_KEYS.iter().find_map(|key| object.get(*key).and_then(coerce_number))?;

    if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng) {
        Some((lat, lng))
    } else {
        debug!(lat, lng, "Coordinates out of range");
        None
    }
}

fn id_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_string(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let s = object.get(*key)?.as_str()?.trim();
        (!s.is_empty()).then(|| s.to_string())
    })
}
