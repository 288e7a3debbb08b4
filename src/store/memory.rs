//! メモリ上のインデックス（テスト・ローカル開発用）

use super::{SearchIndex, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

#[derive(Default)]
pub struct MemoryIndex {
    indices: RwLock<HashMap<String, Vec<(String, Value)>>>,
    next_id: AtomicU64,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_count(&self, index: &str) -> usize {
        self.indices
            .read()
            .map(|indices| indices.get(index).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn poisoned() -> StoreError {
        StoreError::Unavailable("memory index lock poisoned".into())
    }
}

fn sort_key(document: &Value, field: &str) -> Option<DateTime<Utc>> {
    document
        .get(field)
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
        let indices = self.indices.read().map_err(|_| Self::poisoned())?;
        Ok(indices.contains_key(index))
    }

    async fn create_index(&self, index: &str, _schema: &Value) -> Result<(), StoreError> {
        let mut indices = self.indices.write().map_err(|_| Self::poisoned())?;
        if indices.contains_key(index) {
            return Err(StoreError::IndexAlreadyExists(index.to_string()));
        }
        indices.insert(index.to_string(), Vec::new());
        Ok(())
    }

    async fn index_document(&self, index: &str, document: &Value) -> Result<String, StoreError> {
        let mut indices = self.indices.write().map_err(|_| Self::poisoned())?;
        let docs = indices
            .get_mut(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;

        let id = format!("mem-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        docs.push((id.clone(), document.clone()));
        Ok(id)
    }

    async fn search_latest(&self, index: &str, sort_field: &str) -> Result<Option<Value>, StoreError> {
        let indices = self.indices.read().map_err(|_| Self::poisoned())?;
        let docs = indices
            .get(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;

        // 同時刻なら後から追加された文書（max_by_key は最後の最大要素を返す）
        Ok(docs
            .iter()
            .max_by_key(|(_, doc)| sort_key(doc, sort_field))
            .map(|(_, doc)| doc.clone()))
    }
}
