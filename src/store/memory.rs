// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Process-local store backed by an ordered map.

use super::{ListCursor, ListPage, RecordStore, StoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory [`RecordStore`]; contents are lost on restart.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<RwLock<BTreeMap<String, String>>>,
    page_size: usize,
}

impl MemoryStore {
    /// Create an empty store returning at most `page_size` keys per listing page.
    pub fn new(page_size: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
            page_size: page_size.max(1),
        }
    }

    /// Number of stored entries, across all namespaces.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn list(&self, prefix: &str, cursor: Option<&str>) -> Result<ListPage, StoreError> {
        let start = match ListCursor::decode(cursor)? {
            Some(cursor) => Bound::Excluded(cursor.after),
            None => Bound::Included(prefix.to_string()),
        };

        let entries = self.entries.read().await;
        // One extra key tells us whether another page exists
        let mut keys: Vec<String> = entries
            .range((start, Bound::Unbounded))
            .map(|(key, _)| key)
            .skip_while(|key| key.as_str() < prefix)
            .take_while(|key| key.starts_with(prefix))
            .take(self.page_size.saturating_add(1))
            .cloned()
            .collect();

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

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded(page_size: usize, count: usize) -> MemoryStore {
        let store = MemoryStore::new(page_size);
        for i in 0..count {
            store
                .put(&format!("project:{i:03}"), format!("{{\"n\":{i}}}"))
                .await
                .unwrap();
        }
        store.put("cache:feed", "{}".to_string()).await.unwrap();
        store.put("zzz:other", "{}".to_string()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_get_put_replace() {
        let store = MemoryStore::new(10);
        assert_eq!(store.get("project:1").await.unwrap(), None);

        store.put("project:1", "a".to_string()).await.unwrap();
        store.put("project:1", "b".to_string()).await.unwrap();
        assert_eq!(store.get("project:1").await.unwrap().as_deref(), Some("b"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_list_paginates_within_prefix() {
        let store = seeded(4, 10).await;

        let mut all = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;
        loop {
            let page = store.list("project:", cursor.as_deref()).await.unwrap();
            assert!(page.keys.len() <= 4);
            all.extend(page.keys);
            pages += 1;
            match page.cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(pages, 3);
        assert_eq!(all.len(), 10);
        assert_eq!(all.first().map(String::as_str), Some("project:000"));
        assert_eq!(all.last().map(String::as_str), Some("project:009"));
    }

    #[tokio::test]
    async fn test_exact_page_boundary_has_no_trailing_cursor() {
        let store = seeded(5, 10).await;
        let first = store.list("project:", None).await.unwrap();
        let second = store.list("project:", first.cursor.as_deref()).await.unwrap();
        assert_eq!(second.keys.len(), 5);
        assert_eq!(second.cursor, None);
    }

    #[tokio::test]
    async fn test_list_empty_prefix() {
        let store = seeded(4, 0).await;
        let page = store.list("project:", None).await.unwrap();
        assert!(page.keys.is_empty());
        assert_eq!(page.cursor, None);
    }

    #[tokio::test]
    async fn test_unbounded_page_size_lists_everything() {
        let store = seeded(usize::MAX, 10).await;
        let page = store.list("project:", None).await.unwrap();
        assert_eq!(page.keys.len(), 10);
        assert_eq!(page.cursor, None);
    }

    #[tokio::test]
    async fn test_invalid_cursor_rejected() {
        let store = seeded(4, 3).await;
        let result = store.list("project:", Some("garbage!")).await;
        assert!(matches!(result, Err(StoreError::InvalidCursor(_))));
    }
}
