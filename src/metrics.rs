// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for ingestion and feed regeneration.
//!
//! Metrics are registered on a service-owned [`Registry`] rather than the
//! process-global default, so tests can build independent instances.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Service metrics.
///
/// - `project_feed_webhooks_total{outcome}`: webhook requests by terminal outcome
/// - `project_feed_regenerations_total{result}`: `written`, `stale` or `failed`
/// - `project_feed_published_features`: features in the last written feed
/// - `project_feed_regeneration_seconds`: wall time per regeneration
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    webhooks_total: IntCounterVec,
    regenerations_total: IntCounterVec,
    published_features: IntGauge,
    regeneration_seconds: Histogram,
}

impl Metrics {
    /// Create and register all metrics on a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let webhooks_total = IntCounterVec::new(
            Opts::new("project_feed_webhooks_total", "Webhook requests by outcome"),
            &["outcome"],
        )?;
        let regenerations_total = IntCounterVec::new(
            Opts::new(
                "project_feed_regenerations_total",
                "Feed regenerations by result",
            ),
            &["result"],
        )?;
        let published_features = IntGauge::new(
            "project_feed_published_features",
            "Features in the most recently written feed",
        )?;
        let regeneration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "project_feed_regeneration_seconds",
                "Time spent rebuilding the feed",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
        )?;

        registry.register(Box::new(webhooks_total.clone()))?;
        registry.register(Box::new(regenerations_total.clone()))?;
        registry.register(Box::new(published_features.clone()))?;
        registry.register(Box::new(regeneration_seconds.clone()))?;

        Ok(Self {
            registry,
            webhooks_total,
            regenerations_total,
            published_features,
            regeneration_seconds,
        })
    }

    pub fn record_webhook(&self, outcome: &str) {
        self.webhooks_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_regeneration(&self, result: &str, seconds: f64) {
        self.regenerations_total.with_label_values(&[result]).inc();
        self.regeneration_seconds.observe(seconds);
    }

    pub fn set_published_features(&self, count: usize) {
        self.published_features
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Count recorded for a webhook outcome.
    pub fn webhook_count(&self, outcome: &str) -> u64 {
        self.webhooks_total.with_label_values(&[outcome]).get()
    }

    /// Count recorded for a regeneration result.
    pub fn regeneration_count(&self, result: &str) -> u64 {
        self.regenerations_total.with_label_values(&[result]).get()
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
