// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Durable key/value storage for project records and the feed cache.
//!
//! Values are opaque serialized strings replaced wholesale on every write.
//! Listing is prefix-scoped and paginated: each page carries an opaque
//! cursor that the caller passes back explicitly for the next page.

mod memory;
mod surreal;

pub use memory::MemoryStore;
pub use surreal::SurrealStore;

use crate::config::{StoreBackend, StoreConfig};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Storage errors. These surface to webhook senders as retryable failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Invalid listing cursor: {0}")]
    InvalidCursor(#[from] CursorError),
}

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Keys in ascending order
    pub keys: Vec<String>,
    /// Cursor for the next page; `None` once the listing is complete
    pub cursor: Option<String>,
}

/// Key/value store holding one entry per project plus the feed cache entry.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read a value verbatim, or `None` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value at `key`.
    async fn put(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// List keys starting with `prefix`, resuming after `cursor` if given.
    async fn list(&self, prefix: &str, cursor: Option<&str>) -> Result<ListPage, StoreError>;
}

/// Open the store selected by configuration.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn RecordStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new(config.page_size))),
        StoreBackend::Surreal => Ok(Arc::new(
            SurrealStore::connect(&config.path, config.page_size).await?,
        )),
    }
}

/// Position within a listing: the last key already returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCursor {
    pub after: String,
}

impl ListCursor {
    /// Decode an optional cursor string.
    pub fn decode(cursor: Option<&str>) -> Result<Option<Self>, StoreError> {
        cursor.map(str::parse::<ListCursor>).transpose().map_err(StoreError::from)
    }
}

impl FromStr for ListCursor {
    type Err = CursorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = URL_SAFE_NO_PAD.decode(s.as_bytes())?;
        let cursor: ListCursor = serde_json::from_slice(&decoded)?;
        Ok(cursor)
    }
}

impl fmt::Display for ListCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::json!({ "after": self.after }).to_string();
        write!(f, "{}", URL_SAFE_NO_PAD.encode(json.as_bytes()))
    }
}

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
