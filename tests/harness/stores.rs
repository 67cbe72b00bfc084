// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Store doubles.

use async_trait::async_trait;
use project_feed::store::{ListPage, RecordStore, StoreError};

/// A store whose backend is always down.
pub struct FailingStore;

fn unavailable() -> StoreError {
    StoreError::Backend("connection refused: kv.internal:8000".to_string())
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(unavailable())
    }

    async fn put(&self, _key: &str, _value: String) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn list(&self, _prefix: &str, _cursor: Option<&str>) -> Result<ListPage, StoreError> {
        Err(unavailable())
    }
}
