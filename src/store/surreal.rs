// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! SurrealDB-backed store.
//!
//! Entries live in a single `kv` table keyed by record id, with the key
//! duplicated into a uniquely indexed `key` field. Prefix listings filter
//! with `string::starts_with` and order by `key`, which scans the table;
//! the record volume here is one row per project.

use super::{ListCursor, ListPage, RecordStore, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use surrealdb::{
    engine::local::{Db, Mem},
    Surreal,
};
use tracing::info;

const TABLE: &str = "kv";

#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    key: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct KeyRow {
    key: String,
}

/// SurrealDB connection wrapper
#[derive(Clone)]
pub struct SurrealStore {
    db: Surreal<Db>,
    page_size: usize,
}

impl SurrealStore {
    /// Connect to SurrealDB; `path == "memory"` selects the in-memory engine.
    pub async fn connect(path: &str, page_size: usize) -> Result<Self, StoreError> {
        let db = if path == "memory" {
            Surreal::new::<Mem>(()).await?
        } else {
            Self::open_persistent(path).await?
        };

        db.use_ns("project_feed").use_db("feed").await?;
        Self::init_schema(&db).await?;
        info!(path, "Connected to SurrealDB");

        Ok(Self {
            db,
            page_size: page_size.max(1),
        })
    }

    #[cfg(feature = "rocksdb")]
    async fn open_persistent(path: &str) -> Result<Surreal<Db>, StoreError> {
        Ok(Surreal::new::<surrealdb::engine::local::RocksDb>(path).await?)
    }

    #[cfg(not(feature = "rocksdb"))]
    async fn open_persistent(path: &str) -> Result<Surreal<Db>, StoreError> {
        Err(StoreError::Backend(format!(
            "store path {path:?} needs the `rocksdb` feature; use \"memory\" otherwise"
        )))
    }

    async fn init_schema(db: &Surreal<Db>) -> Result<(), StoreError> {
        db.query(
            r#"
            DEFINE TABLE IF NOT EXISTS kv SCHEMAFULL;
            DEFINE FIELD IF NOT EXISTS key ON kv TYPE string;
            DEFINE FIELD IF NOT EXISTS value ON kv TYPE string;

            DEFINE INDEX IF NOT EXISTS key_idx ON kv COLUMNS key UNIQUE;
        "#,
        )
        .await?
        .check()?;

        Ok(())
    }
}

#[async_trait]
impl RecordStore for SurrealStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entry: Option<Entry> = self.db.select((TABLE, key)).await?;
        Ok(entry.map(|e| e.value))
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        // UPDATE on a record id creates the record when absent
        let _: Option<Entry> = self
            .db
            .update((TABLE, key))
            .content(Entry {
                key: key.to_string(),
                value,
            })
            .await?;
        Ok(())
    }

    async fn list(&self, prefix: &str, cursor: Option<&str>) -> Result<ListPage, StoreError> {
        let after = ListCursor::decode(cursor)?
            .map(|c| c.after)
            .unwrap_or_default();

        let query = format!(
            "SELECT key FROM kv WHERE string::starts_with(key, $prefix) AND key > $after \
             ORDER BY key ASC LIMIT {}",
            self.page_size.saturating_add(1)
        );
        let mut result = self
            .db
            .query(query)
            .bind(("prefix", prefix.to_string()))
            .bind(("after", after))
            .await?;
        let rows: Vec<KeyRow> = result.take(0)?;

        let mut keys: Vec<String> = rows.into_iter().map(|row| row.key).collect();
        let cursor = if keys.len() > self.page_size {
            keys.truncate(self.page_size);
            keys.last().map(|last| {
                ListCursor {
                    after: last.clone(),
                }
                .to_string()
            })
        } else {
            None
        };

        Ok(ListPage { keys, cursor })
    }
}
