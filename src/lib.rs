// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Project Feed
//!
//! This crate ingests third-party webhook events describing field-service
//! projects and republishes a filtered, cached GeoJSON feed for map
//! front ends:
//!
//! - HMAC signature verification over the raw body (SHA-1/SHA-256, base64/hex)
//! - Prioritized extraction rules for heterogeneous payload shapes
//! - Label-gated publication
//! - Deterministic per-project coordinate jitter
//! - One stored record per project id, last write wins
//! - A single feed cache entry rebuilt wholesale in the background

pub mod config;
pub mod error;
pub mod feed;
pub mod handlers;
pub mod ingest;
pub mod jitter;
pub mod metrics;
pub mod normalizer;
pub mod policy;
pub mod record;
pub mod signature;
pub mod store;

pub use config::Config;
pub use error::AppError;
pub use feed::{FeedCache, FeedRegenerator};
pub use handlers::{router, AppState};
pub use ingest::{IngestOutcome, Ingestor};
pub use normalizer::{PayloadNormalizer, ProjectCandidate};
pub use record::ProjectRecord;
pub use signature::SignatureVerifier;
pub use store::{MemoryStore, RecordStore, SurrealStore};
