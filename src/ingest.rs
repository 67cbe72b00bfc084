// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Webhook ingestion pipeline.
//!
//! Each request runs to exactly one terminal outcome:
//!
//! 1. Signature present: verify, or reject as unauthorized
//! 2. Parse the body as JSON, or reject as malformed
//! 3. No resolvable project id: acknowledge and drop
//! 4. Apply publication policy and jitter, then store the record
//! 5. Trigger a detached feed regeneration and acknowledge
//!
//! Retries belong to the sender; nothing here retries.

use crate::config::Config;
use crate::error::AppError;
use crate::feed::FeedRegenerator;
use crate::metrics::Metrics;
use crate::normalizer::PayloadNormalizer;
use crate::policy::PublishPolicy;
use crate::signature::SignatureVerifier;
use crate::store::RecordStore;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Terminal outcome of an accepted webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Record stored with usable coordinates
    Stored { id: String, published: bool },
    /// Record stored for diagnostics; never published
    MissingCoords { id: String, published: bool },
    /// No project id could be resolved; nothing stored
    Ignored,
}

impl IngestOutcome {
    /// Label used in metrics and acknowledgments.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stored { .. } => "stored",
            Self::MissingCoords { .. } => "missing_coords",
            Self::Ignored => "ignored",
        }
    }
}

/// Orchestrates verification, normalization, policy and storage.
pub struct Ingestor {
    verifier: SignatureVerifier,
    require_signature: bool,
    normalizer: PayloadNormalizer,
    policy: PublishPolicy,
    store: Arc<dyn RecordStore>,
    regenerator: Arc<FeedRegenerator>,
    metrics: Arc<Metrics>,
}

impl Ingestor {
    pub fn new(
        config: &Config,
        store: Arc<dyn RecordStore>,
        regenerator: Arc<FeedRegenerator>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            verifier: SignatureVerifier::new(&config.signature),
            require_signature: config.signature.required,
            normalizer: PayloadNormalizer::default(),
            policy: PublishPolicy::new(&config.publish),
            store,
            regenerator,
            metrics,
        }
    }

    /// Process one webhook delivery.
    ///
    /// `signature` is the raw signature header value, if the request had one.
    pub async fn ingest(&self, signature: Option<&str>, body: &[u8]) -> Result<IngestOutcome, AppError> {
        let result = self.process(signature, body).await;
        match &result {
            Ok(outcome) => self.metrics.record_webhook(outcome.label()),
            Err(err) => self.metrics.record_webhook(err.outcome()),
        }
        result
    }

    async fn process(&self, signature: Option<&str>, body: &[u8]) -> Result<IngestOutcome, AppError> {
        match signature {
            Some(header) => {
                if let Err(err) = self.verifier.check(header, body) {
                    warn!(reason = %err, "Webhook signature rejected");
                    return Err(AppError::Unauthorized(err));
                }
            }
            None if self.require_signature => {
                warn!("Webhook without signature rejected");
                return Err(AppError::MissingSignature);
            }
            None => debug!("No signature header; verification skipped"),
        }

        let payload: Value = serde_json::from_slice(body).map_err(|err| {
            info!(error = %err, bytes = body.len(), "Malformed webhook payload");
            AppError::MalformedPayload(err)
        })?;

        let Some(candidate) = self.normalizer.extract(&payload) else {
            info!("Webhook acknowledged without a project id");
            return Ok(IngestOutcome::Ignored);
        };

        let record = self.policy.apply(candidate, Utc::now());
        let value = serde_json::to_string(&record).map_err(AppError::Encode)?;

        if let Err(err) = self.store.put(&record.key(), value).await {
            error!(project_id = %record.id, error = %err, "Failed to store project record");
            return Err(err.into());
        }

        // Detached; the acknowledgment never waits on the rebuild
        self.regenerator.trigger();

        let outcome = if record.missing_coords {
            IngestOutcome::MissingCoords {
                id: record.id,
                published: record.published,
            }
        } else {
            IngestOutcome::Stored {
                id: record.id,
                published: record.published,
            }
        };
        info!(outcome = outcome.label(), "Webhook ingested");
        Ok(outcome)
    }
}
