//! 分類結果の保存（検索インデックス）
//!
//! すべての操作はベストエフォート:
//! - 接続不可・認証情報なしの場合は無効モード（全操作が「利用不可」を返すだけ）
//! - save / get_latest は失敗しても Err を返さず None とログのみ
//!
//! バックエンドは SearchIndex トレイトで差し替え可能（Elasticsearch / メモリ）

mod elastic;
mod memory;

pub use elastic::ElasticIndex;
pub use memory::MemoryIndex;

use crate::config::Config;
use async_trait::async_trait;
use beauty_recycle_common::ClassificationComponent;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const INDEX_NAME: &str = "bin_classifications";
pub const CREATED_AT_FIELD: &str = "created_at";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store is disabled")]
    Disabled,

    #[error("index already exists: {0}")]
    IndexAlreadyExists(String),

    #[error("index not found: {0}")]
    IndexNotFound(String),

    #[error("insufficient permissions: {0}")]
    Unauthorized(String),

    #[error("store unreachable: {0}")]
    Unavailable(String),

    #[error("unexpected store response: {0}")]
    Response(String),
}

/// 検索インデックスへの最小限の操作
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn index_exists(&self, index: &str) -> Result<bool, StoreError>;

    /// 既存の場合は `StoreError::IndexAlreadyExists`
    async fn create_index(&self, index: &str, schema: &Value) -> Result<(), StoreError>;

    /// 文書を追加し、生成されたIDを返す（書き込み後すぐ検索可能であること）
    async fn index_document(&self, index: &str, document: &Value) -> Result<String, StoreError>;

    /// `sort_field` の降順で先頭1件の `_source`
    async fn search_latest(&self, index: &str, sort_field: &str) -> Result<Option<Value>, StoreError>;
}

/// 保存済みの分類結果1件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub product_description: String,
    /// ClassificationComponent 配列のJSON文字列
    pub classification_result: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// RFC 3339 に加え、タイムゾーンなしのISO-8601（UTCとみなす）も受け付ける
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

impl StoredRecord {
    pub fn new(description: &str, components: &[ClassificationComponent]) -> serde_json::Result<Self> {
        Ok(Self {
            product_description: description.to_string(),
            classification_result: serde_json::to_string(components)?,
            created_at: Utc::now(),
        })
    }

    /// 保存されている部品リストを復元
    pub fn components(&self) -> serde_json::Result<Vec<ClassificationComponent>> {
        serde_json::from_str(&self.classification_result)
    }
}

/// インデックス定義（説明文: 全文検索、結果: 非インデックス、作成日時: date）
pub fn index_schema() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 0
        },
        "mappings": {
            "properties": {
                "product_description": {"type": "text"},
                "classification_result": {"type": "text", "index": false},
                "created_at": {"type": "date"}
            }
        }
    })
}

#[derive(Clone)]
pub struct ResultStore {
    index: Option<Arc<dyn SearchIndex>>,
}

impl ResultStore {
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self { index: Some(index) }
    }

    pub fn disabled() -> Self {
        Self { index: None }
    }

    /// 設定から接続し、疎通確認に失敗したら無効モード
    pub async fn connect(config: &Config) -> Self {
        let Some((url, api_key)) = config.elasticsearch_credentials() else {
            warn!("missing Elasticsearch credentials; persistence is disabled");
            return Self::disabled();
        };

        let index = match ElasticIndex::new(url, api_key, config.accept_invalid_certs) {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, "failed to build Elasticsearch client; persistence is disabled");
                return Self::disabled();
            }
        };

        Self::connect_with(Arc::new(index)).await
    }

    /// 任意のインデックスに疎通確認して接続
    pub async fn connect_with(index: Arc<dyn SearchIndex>) -> Self {
        match index.ping().await {
            Ok(()) => {
                info!("connected to search index");
                Self::new(index)
            }
            Err(e) => {
                warn!(error = %e, "failed to connect to search index; persistence is disabled");
                Self::disabled()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.index.is_some()
    }

    /// インデックスがなければ作成（既存は成功扱い）
    pub async fn ensure_index(&self) -> Result<(), StoreError> {
        let index = self.index.as_ref().ok_or(StoreError::Disabled)?;

        if index.index_exists(INDEX_NAME).await? {
            debug!(index = INDEX_NAME, "index already exists");
            return Ok(());
        }

        match index.create_index(INDEX_NAME, &index_schema()).await {
            Ok(()) => {
                info!(index = INDEX_NAME, "created index");
                Ok(())
            }
            Err(StoreError::IndexAlreadyExists(_)) => {
                debug!(index = INDEX_NAME, "index already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// 分類結果を保存し、文書IDを返す（失敗時は None）
    pub async fn save(&self, description: &str, components: &[ClassificationComponent]) -> Option<String> {
        let Some(index) = self.index.as_ref() else {
            warn!("store is not available, skipping save");
            return None;
        };

        let record = match StoredRecord::new(description, components) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "failed to serialize classification result");
                return None;
            }
        };

        let document = match serde_json::to_value(&record) {
            Ok(document) => document,
            Err(e) => {
                warn!(error = %e, "failed to serialize stored record");
                return None;
            }
        };

        if let Err(e) = self.ensure_index().await {
            log_store_failure("save", &e);
            return None;
        }

        match index.index_document(INDEX_NAME, &document).await {
            Ok(id) => {
                info!(id = %id, components = components.len(), "saved classification result");
                Some(id)
            }
            Err(e) => {
                log_store_failure("save", &e);
                None
            }
        }
    }

    /// 最新の保存結果を1件取得（なし・接続不可は None）
    pub async fn get_latest(&self) -> Option<StoredRecord> {
        let Some(index) = self.index.as_ref() else {
            warn!("store is not available");
            return None;
        };

        let source = match index.search_latest(INDEX_NAME, CREATED_AT_FIELD).await {
            Ok(Some(source)) => source,
            Ok(None) => {
                debug!("no classification results stored");
                return None;
            }
            Err(e) => {
                log_store_failure("get_latest", &e);
                return None;
            }
        };

        match serde_json::from_value::<StoredRecord>(source) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "stored record has unexpected shape");
                None
            }
        }
    }
}

fn log_store_failure(operation: &str, error: &StoreError) {
    match error {
        StoreError::IndexNotFound(_) => warn!(operation, "no classification results found"),
        StoreError::Unauthorized(_) => warn!(operation, error = %error, "insufficient permissions for search index"),
        _ => warn!(operation, error = %error, "search index operation failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beauty_recycle_common::DisposalCategory;

    fn component(name: &str) -> ClassificationComponent {
        ClassificationComponent {
            component_name: name.to_string(),
            material: "PP #5".to_string(),
            disposal_category: DisposalCategory::Pact,
            classification_explanation: "Caps go to PACT".to_string(),
        }
    }

    #[test]
    fn test_index_schema() {
        let schema = index_schema();
        let props = &schema["mappings"]["properties"];
        assert_eq!(props["product_description"]["type"], "text");
        assert_eq!(props["classification_result"]["index"], false);
        assert_eq!(props["created_at"]["type"], "date");
        assert_eq!(schema["settings"]["number_of_replicas"], 0);
    }

    #[test]
    fn test_stored_record_round_trips_components() {
        let components = vec![component("Cap"), component("Pump")];
        let record = StoredRecord::new("Serum", &components).unwrap();

        assert_eq!(record.product_description, "Serum");
        assert_eq!(record.components().unwrap(), components);

        let doc = serde_json::to_value(&record).unwrap();
        assert!(doc["classification_result"].is_string());
        assert!(doc["created_at"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_naive_timestamp_is_utc() {
        let record: StoredRecord = serde_json::from_value(json!({
            "product_description": "Serum",
            "classification_result": "[]",
            "created_at": "2024-05-01T12:30:00.250000"
        }))
        .unwrap();
        assert_eq!(record.created_at.to_rfc3339(), "2024-05-01T12:30:00.250+00:00");
    }

    #[tokio::test]
    async fn test_disabled_store() {
        let store = ResultStore::disabled();
        assert!(!store.is_available());
        assert_eq!(store.ensure_index().await, Err(StoreError::Disabled));
        assert!(store.save("Serum", &[component("Cap")]).await.is_none());
        assert!(store.get_latest().await.is_none());
    }

    #[tokio::test]
    async fn test_ensure_index_is_idempotent() {
        let index = Arc::new(MemoryIndex::new());
        let store = ResultStore::new(index.clone());

        store.ensure_index().await.unwrap();
        store.ensure_index().await.unwrap();
        assert!(index.index_exists(INDEX_NAME).await.unwrap());
    }

    #[tokio::test]
    async fn test_get_latest_without_index() {
        let store = ResultStore::new(Arc::new(MemoryIndex::new()));
        assert!(store.get_latest().await.is_none());
    }

    #[tokio::test]
    async fn test_save_creates_index() {
        let index = Arc::new(MemoryIndex::new());
        let store = ResultStore::new(index.clone());

        let id = store.save("Serum", &[component("Cap")]).await;
        assert!(id.is_some());
        assert_eq!(index.document_count(INDEX_NAME), 1);
    }
}
