// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Webhook payload generators.

use serde_json::{json, Value};

/// Where a sender nests the project object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `{ "project": { ... } }`
    Project,
    /// `{ "data": { "project": { ... } } }`
    DataProject,
    /// `{ "data": { ... } }`
    Data,
    /// `{ ... }`
    Root,
}

pub const ALL_SHAPES: [Shape; 4] = [Shape::Project, Shape::DataProject, Shape::Data, Shape::Root];

/// Wrap a project object in the given envelope shape.
pub fn wrap(shape: Shape, project: Value) -> Value {
    match shape {
        Shape::Project => json!({ "event": "project.updated", "project": project }),
        Shape::DataProject => json!({ "event": "project.updated", "data": { "project": project } }),
        Shape::Data => json!({ "event": "project.updated", "data": project }),
        Shape::Root => project,
    }
}

/// A geolocated project object with string labels.
pub fn project(id: &str, lat: f64, lng: f64, labels: &[&str]) -> Value {
    json!({
        "id": id,
        "title": format!("Project {id}"),
        "category": "Roofing",
        "lat": lat,
        "lng": lng,
        "labels": labels,
        "thumb_url": format!("https://cdn.example.com/{id}.jpg"),
        "url": format!("https://example.com/projects/{id}")
    })
}

/// Generate `count` geolocated projects spread over a small area.
pub fn projects(count: usize, labels: &[&str]) -> Vec<Value> {
    (0..count)
        .map(|i| {
            let offset = i as f64 * 0.01;
            project(&format!("p{i:04}"), 30.0 + offset, -87.0 - offset, labels)
        })
        .collect()
}
