// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the project feed service.
//!
//! All values come from the process environment (optionally seeded from a
//! `.env` file). Invalid values fail startup; absent values fall back to
//! the defaults below.

use axum::http::HeaderName;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Configuration errors, reported once at startup.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Jitter radius must be a finite, non-negative number of meters, got {0}")]
    InvalidJitterRadius(f64),

    #[error("Store page size must be at least 1")]
    ZeroPageSize,

    #[error("Store page size {0} exceeds the maximum of 10000")]
    PageSizeTooLarge(usize),
}

/// Upper bound on keys fetched per listing page.
pub const MAX_PAGE_SIZE: usize = 10_000;

/// Configuration for the project feed service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Maximum accepted webhook body size in bytes (default: 1 MiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Webhook signature verification
    #[serde(default)]
    pub signature: SignatureConfig,

    /// Publication policy applied to every ingested record
    #[serde(default)]
    pub publish: PublishConfig,

    /// Published feed settings
    #[serde(default)]
    pub feed: FeedConfig,

    /// Record store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Keyed-hash algorithm used for webhook signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    Sha1,
    Sha256,
}

/// Text encoding of the digest carried in the signature header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureEncoding {
    Base64,
    Hex,
}

/// Signature verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureConfig {
    /// Shared secret; empty means every presented signature fails
    #[serde(default)]
    pub secret: String,

    /// Header carrying the signature (default: x-signature)
    #[serde(default = "default_signature_header")]
    pub header: String,

    /// HMAC hash function (default: sha1)
    #[serde(default = "default_algorithm")]
    pub algorithm: SignatureAlgorithm,

    /// Digest encoding (default: base64)
    #[serde(default = "default_encoding")]
    pub encoding: SignatureEncoding,

    /// Reject requests without a signature header (default: false)
    #[serde(default)]
    pub required: bool,
}

/// Publication policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Label a record must carry to be published; `None` publishes everything
    #[serde(default)]
    pub required_label: Option<String>,

    /// Privacy jitter radius in meters; 0 disables jitter
    #[serde(default)]
    pub jitter_radius_meters: f64,

    /// Prepended to the project id when seeding jitter
    #[serde(default)]
    pub jitter_salt: String,
}

/// Published feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// `max-age` advertised to downstream caches (default: 30)
    #[serde(default = "default_feed_max_age")]
    pub max_age_secs: u32,
}

/// Which store implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local map, lost on restart
    Memory,
    /// SurrealDB, in-memory or RocksDB depending on `path`
    Surreal,
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,

    /// `memory` or a RocksDB directory (requires the `rocksdb` feature)
    #[serde(default = "default_store_path")]
    pub path: String,

    /// Maximum keys returned per listing page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_signature_header() -> String {
    "x-signature".to_string()
}

fn default_algorithm() -> SignatureAlgorithm {
    SignatureAlgorithm::Sha1
}

fn default_encoding() -> SignatureEncoding {
    SignatureEncoding::Base64
}

fn default_feed_max_age() -> u32 {
    30
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Surreal
}

fn default_store_path() -> String {
    "memory".to_string()
}

fn default_page_size() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_body_bytes: default_max_body_bytes(),
            signature: SignatureConfig::default(),
            publish: PublishConfig::default(),
            feed: FeedConfig::default(),
            store: StoreConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            header: default_signature_header(),
            algorithm: default_algorithm(),
            encoding: default_encoding(),
            required: false,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_feed_max_age(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
            page_size: default_page_size(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            _ => Err("expected sha1 or sha256"),
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => write!(f, "sha1"),
            Self::Sha256 => write!(f, "sha256"),
        }
    }
}

impl FromStr for SignatureEncoding {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base64" => Ok(Self::Base64),
            "hex" => Ok(Self::Hex),
            _ => Err("expected base64 or hex"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "surreal" | "surrealdb" => Ok(Self::Surreal),
            _ => Err("expected memory or surreal"),
        }
    }
}

impl SignatureConfig {
    /// The configured signature header as a parsed header name.
    pub fn header_name(&self) -> Result<HeaderName, ConfigError> {
        HeaderName::from_bytes(self.header.as_bytes()).map_err(|_| ConfigError::InvalidValue {
            var: "SIGNATURE_HEADER",
            value: self.header.clone(),
            reason: "expected an HTTP header name",
        })
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(v) = lookup("BIND_ADDR") {
            config.bind_addr = v;
        }
        if let Some(v) = parsed(&lookup, "MAX_BODY_BYTES", "expected a byte count")? {
            config.max_body_bytes = v;
        }

        if let Some(v) = lookup("WEBHOOK_SECRET") {
            config.signature.secret = v;
        }
        if let Some(v) = lookup("SIGNATURE_HEADER").filter(|v| !v.trim().is_empty()) {
            config.signature.header = v.trim().to_ascii_lowercase();
        }
        if let Some(v) = enum_value(&lookup, "SIGNATURE_ALGORITHM")? {
            config.signature.algorithm = v;
        }
        if let Some(v) = enum_value(&lookup, "SIGNATURE_ENCODING")? {
            config.signature.encoding = v;
        }
        if let Some(v) = flag(&lookup, "REQUIRE_SIGNATURE")? {
            config.signature.required = v;
        }

        config.publish.required_label = lookup("REQUIRED_LABEL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        if let Some(v) = parsed(&lookup, "JITTER_RADIUS_METERS", "expected meters")? {
            config.publish.jitter_radius_meters = v;
        }
        if let Some(v) = lookup("JITTER_SALT") {
            config.publish.jitter_salt = v;
        }

        if let Some(v) = parsed(&lookup, "FEED_MAX_AGE_SECS", "expected seconds")? {
            config.feed.max_age_secs = v;
        }

        if let Some(v) = enum_value(&lookup, "STORE_BACKEND")? {
            config.store.backend = v;
        }
        if let Some(v) = lookup("STORE_PATH").filter(|v| !v.trim().is_empty()) {
            config.store.path = v;
        }
        if let Some(v) = parsed(&lookup, "STORE_PAGE_SIZE", "expected a positive integer")? {
            config.store.page_size = v;
        }

        if let Some(v) = flag(&lookup, "METRICS_ENABLED")? {
            config.metrics.enabled = v;
        }
        if let Some(v) = lookup("METRICS_PATH").filter(|v| v.starts_with('/')) {
            config.metrics.path = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let radius = self.publish.jitter_radius_meters;
        if !radius.is_finite() || radius < 0.0 {
            return Err(ConfigError::InvalidJitterRadius(radius));
        }
        if self.store.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.store.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::PageSizeTooLarge(self.store.page_size));
        }
        self.signature.header_name()?;
        Ok(())
    }
}

fn parsed<F, T>(lookup: &F, var: &'static str, reason: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value, reason }),
    }
}

fn enum_value<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr<Err = &'static str>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => match value.parse() {
            Ok(v) => Ok(Some(v)),
            Err(reason) => Err(ConfigError::InvalidValue { var, value, reason }),
        },
    }
}

fn flag<F>(lookup: &F, var: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" | "" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue {
                var,
                value,
                reason: "expected a boolean",
            }),
        },
    }
}
