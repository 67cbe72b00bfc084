// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! The published feed: a GeoJSON feature collection materialized from the
//! record store.
//!
//! [`FeedCache`] is the read-optimized view, always rebuilt wholesale from
//! every stored record and never patched. [`FeedRegenerator`] performs the
//! rebuild and writes the single cache entry; readers only ever load that
//! entry through [`load_published`].
//!
//! ## Consistency
//!
//! Regenerations may overlap. Each one takes a generation ticket when it
//! starts, and cache writes are serialized: a rebuild whose ticket is older
//! than the last written one is discarded instead of overwriting a fresher
//! feed. That ordering holds within one process only. Several processes
//! sharing a store still resolve last-write-wins, so the published feed is
//! eventually consistent and may briefly lag the records.

use crate::metrics::Metrics;
use crate::record::{ProjectRecord, FEED_CACHE_KEY, RECORD_PREFIX};
use crate::store::{RecordStore, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Body served before the first regeneration has completed.
pub const EMPTY_FEED: &str = r#"{"type":"FeatureCollection","features":[]}"#;

/// GeoJSON feature collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

/// A single published project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: PointGeometry,
    pub properties: FeatureProperties,
}

/// Point geometry; coordinates are `[lng, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

/// Public-safe subset of a project record. Coordinates live in the geometry only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Feature {
    /// Project a record into a feature; `None` unless it is publishable.
    pub fn from_record(record: &ProjectRecord) -> Option<Self> {
        if !record.is_publishable() {
            return None;
        }
        let (lat, lng) = record.coordinates()?;

        Some(Self {
            kind: "Feature".to_string(),
            geometry: PointGeometry {
                kind: "Point".to_string(),
                coordinates: [lng, lat],
            },
            properties: FeatureProperties {
                id: record.id.clone(),
                title: record.title.clone(),
                category: record.category.clone(),
                labels: record.labels.clone(),
                thumb_url: record.thumb_url.clone(),
                url: record.url.clone(),
            },
        })
    }
}

/// Materialized view of all publishable records.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedCache {
    collection: FeatureCollection,
}

impl Default for FeedCache {
    fn default() -> Self {
        Self::empty()
    }
}

impl FeedCache {
    /// A well-formed collection with no features.
    pub fn empty() -> Self {
        Self {
            collection: FeatureCollection {
                kind: "FeatureCollection".to_string(),
                features: Vec::new(),
            },
        }
    }

    /// Rebuild the view from a full set of records, sorted by id.
    pub fn rebuild<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ProjectRecord>,
    {
        let mut features: Vec<Feature> = records.into_iter().filter_map(Feature::from_record).collect();
        features.sort_by(|a, b| a.properties.id.cmp(&b.properties.id));

        let mut cache = Self::empty();
        cache.collection.features = features;
        cache
    }

    pub fn collection(&self) -> &FeatureCollection {
        &self.collection
    }

    pub fn len(&self) -> usize {
        self.collection.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.features.is_empty()
    }

    /// Serialized form written to the cache entry.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.collection)
    }
}

/// Read the published feed, falling back to an empty collection.
pub async fn load_published(store: &dyn RecordStore) -> Result<String, StoreError> {
    Ok(store
        .get(FEED_CACHE_KEY)
        .await?
        .unwrap_or_else(|| EMPTY_FEED.to_string()))
}

/// Outcome of one regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegenerationReport {
    pub generation: u64,
    /// Features in the rebuilt feed
    pub features: usize,
    /// Stored records that could not be read back
    pub skipped: usize,
    /// False when a newer regeneration had already written the cache
    pub written: bool,
}

/// Summary of the last successful cache write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegenerationStatus {
    pub generation: u64,
    pub features: usize,
    pub completed_at: DateTime<Utc>,
}

/// Rebuilds the feed cache entry from every stored record.
pub struct FeedRegenerator {
    store: Arc<dyn RecordStore>,
    metrics: Arc<Metrics>,
    next_generation: AtomicU64,
    last_written: Mutex<u64>,
    status: StdRwLock<Option<RegenerationStatus>>,
}

impl FeedRegenerator {
    pub fn new(store: Arc<dyn RecordStore>, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            metrics,
            next_generation: AtomicU64::new(0),
            last_written: Mutex::new(0),
            status: StdRwLock::new(None),
        }
    }

    /// Rebuild and write the feed.
    ///
    /// Corrupt records are skipped; only store failures abort the rebuild.
    pub async fn regenerate(&self) -> Result<RegenerationReport, StoreError> {
        let started = Instant::now();
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let result = self.rebuild_and_write(generation).await;

        let seconds = started.elapsed().as_secs_f64();
        match &result {
            Ok(report) if report.written => {
                self.metrics.record_regeneration("written", seconds);
                self.metrics.set_published_features(report.features);
            }
            Ok(_) => self.metrics.record_regeneration("stale", seconds),
            Err(_) => self.metrics.record_regeneration("failed", seconds),
        }
        result
    }

    /// Regenerate in a detached task. Failures are logged, never returned.
    pub fn trigger(self: &Arc<Self>) -> JoinHandle<()> {
        let regenerator = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = regenerator.regenerate().await {
                error!(error = %err, "Feed regeneration failed");
            }
        })
    }

    /// Summary of the most recent cache write by this process.
    pub fn last_status(&self) -> Option<RegenerationStatus> {
        self.status.read().ok().and_then(|status| *status)
    }

    /// Load every record under the record prefix, following listing cursors.
    pub async fn load_records(&self) -> Result<(Vec<ProjectRecord>, usize), StoreError> {
        let mut records = Vec::new();
        let mut skipped = 0;
        let mut cursor: Option<String> = None;

        loop {
            let page = self.store.list(RECORD_PREFIX, cursor.as_deref()).await?;
            for key in &page.keys {
                let Some(raw) = self.store.get(key).await? else {
                    // Listed but gone; nothing deletes records, so treat as a race
                    skipped += 1;
                    continue;
                };
                match serde_json::from_str::<ProjectRecord>(&raw) {
                    Ok(record) => records.push(record),
                    Err(err) => {
                        warn!(key = %key, error = %err, "Skipping unreadable record");
                        skipped += 1;
                    }
                }
            }

            match page.cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok((records, skipped))
    }

    async fn rebuild_and_write(&self, generation: u64) -> Result<RegenerationReport, StoreError> {
        let (records, skipped) = self.load_records().await?;
        let cache = FeedCache::rebuild(&records);
        let body = cache
            .to_json()
            .map_err(|e| StoreError::Backend(format!("feed serialization failed: {e}")))?;

        let mut last_written = self.last_written.lock().await;
        if *last_written > generation {
            debug!(generation, newer = *last_written, "Discarding stale feed rebuild");
            return Ok(RegenerationReport {
                generation,
                features: cache.len(),
                skipped,
                written: false,
            });
        }

        self.store.put(FEED_CACHE_KEY, body).await?;
        *last_written = generation;

        if let Ok(mut status) = self.status.write() {
            *status = Some(RegenerationStatus {
                generation,
                features: cache.len(),
                completed_at: Utc::now(),
            });
        }

        info!(
            generation,
            records = records.len(),
            features = cache.len(),
            skipped,
            "Feed regenerated"
        );

        Ok(RegenerationReport {
            generation,
            features: cache.len(),
            skipped,
            written: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DEFAULT_TITLE;
    use crate::store::MemoryStore;

    fn record(id: &str, published: bool, coords: Option<(f64, f64)>) -> ProjectRecord {
        ProjectRecord {
            id: id.to_string(),
            title: DEFAULT_TITLE.to_string(),
            category: Some("Roofing".to_string()),
            labels: vec!["Website Map".to_string()],
            published,
            lat: coords.map(|c| c.0),
            lng: coords.map(|c| c.1),
            thumb_url: None,
            url: Some(format!("https://example.com/{id}")),
            updated_at: Utc::now(),
            missing_coords: coords.is_none(),
        }
    }

    async fn put(store: &MemoryStore, record: &ProjectRecord) {
        store
            .put(&record.key(), serde_json::to_string(record).unwrap())
            .await
            .unwrap();
    }

    fn regenerator(store: &MemoryStore) -> FeedRegenerator {
        FeedRegenerator::new(Arc::new(store.clone()), Arc::new(Metrics::new().unwrap()))
    }

    #[test]
    fn test_feature_shape() {
        let feature = Feature::from_record(&record("42", true, Some((30.1, -87.2)))).unwrap();
        let json = serde_json::to_value(&feature).unwrap();

        assert_eq!(json["type"], "Feature");
        assert_eq!(json["geometry"]["type"], "Point");
        assert_eq!(json["geometry"]["coordinates"], serde_json::json!([-87.2, 30.1]));
        assert_eq!(json["properties"]["id"], "42");
        assert!(json["properties"].get("lat").is_none());
        assert!(json["properties"].get("thumb_url").is_none());
    }

    #[test]
    fn test_rebuild_filters_and_sorts() {
        let records = vec![
            record("b", true, Some((1.0, 2.0))),
            record("a", true, Some((3.0, 4.0))),
            record("hidden", false, Some((5.0, 6.0))),
            record("nowhere", true, None),
        ];
        let cache = FeedCache::rebuild(&records);
        let ids: Vec<&str> = cache
            .collection()
            .features
            .iter()
            .map(|f| f.properties.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_cache_serialization() {
        assert_eq!(FeedCache::empty().to_json().unwrap(), EMPTY_FEED);
    }

    #[tokio::test]
    async fn test_load_published_defaults_to_empty() {
        let store = MemoryStore::new(10);
        assert_eq!(load_published(&store).await.unwrap(), EMPTY_FEED);
    }

    #[tokio::test]
    async fn test_regenerate_empty_store() {
        let store = MemoryStore::new(10);
        let report = regenerator(&store).regenerate().await.unwrap();
        assert!(report.written);
        assert_eq!(report.features, 0);
        assert_eq!(store.get(FEED_CACHE_KEY).await.unwrap().as_deref(), Some(EMPTY_FEED));
    }

    #[tokio::test]
    async fn test_regenerate_skips_corrupt_records() {
        let store = MemoryStore::new(2);
        put(&store, &record("1", true, Some((1.0, 1.0)))).await;
        store.put("project:2", "{not json".to_string()).await.unwrap();
        store.put("project:3", "{\"id\":\"3\"}".to_string()).await.unwrap();
        put(&store, &record("4", true, Some((4.0, 4.0)))).await;
        put(&store, &record("5", true, Some((5.0, 5.0)))).await;

        let report = regenerator(&store).regenerate().await.unwrap();
        assert_eq!(report.features, 3);
        assert_eq!(report.skipped, 2);
    }

    #[tokio::test]
    async fn test_regenerate_is_idempotent() {
        let store = MemoryStore::new(3);
        for i in 0..10 {
            put(&store, &record(&format!("p{i}"), i % 3 != 0, Some((i as f64, -(i as f64))))).await;
        }
        let regenerator = regenerator(&store);

        regenerator.regenerate().await.unwrap();
        let first = store.get(FEED_CACHE_KEY).await.unwrap();
        regenerator.regenerate().await.unwrap();
        let second = store.get(FEED_CACHE_KEY).await.unwrap();

        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unpublishing_removes_feature() {
        let store = MemoryStore::new(10);
        let regenerator = regenerator(&store);
        let mut project = record("42", true, Some((30.1, -87.2)));

        put(&store, &project).await;
        assert_eq!(regenerator.regenerate().await.unwrap().features, 1);

        project.published = false;
        put(&store, &project).await;
        assert_eq!(regenerator.regenerate().await.unwrap().features, 0);
        assert_eq!(load_published(&store).await.unwrap(), EMPTY_FEED);
    }

    #[tokio::test]
    async fn test_generations_increase_and_status_tracks_last_write() {
        let store = MemoryStore::new(10);
        let regenerator = regenerator(&store);
        assert!(regenerator.last_status().is_none());

        let first = regenerator.regenerate().await.unwrap();
        let second = regenerator.regenerate().await.unwrap();
        assert!(second.generation > first.generation);

        let status = regenerator.last_status().unwrap();
        assert_eq!(status.generation, second.generation);
    }

    #[tokio::test]
    async fn test_stale_rebuild_is_discarded() {
        let store = MemoryStore::new(10);
        let regenerator = regenerator(&store);

        // A rebuild that started before the latest written one
        let stale = regenerator.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        regenerator.regenerate().await.unwrap();

        let report = regenerator.rebuild_and_write(stale).await.unwrap();
        assert!(!report.written);
        assert_eq!(regenerator.metrics.regeneration_count("written"), 1);
    }

    #[tokio::test]
    async fn test_trigger_runs_in_background() {
        let store = MemoryStore::new(10);
        put(&store, &record("42", true, Some((30.1, -87.2)))).await;
        let regenerator = Arc::new(regenerator(&store));

        regenerator.trigger().await.unwrap();
        let feed = load_published(&store).await.unwrap();
        assert!(feed.contains("\"42\""));
    }
}
