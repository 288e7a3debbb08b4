//! テスト用のモック実装
//!
//! 実際のAPI呼び出しや検索インデックスなしで分類・保存・出力を検証するためのもの

use crate::classifier::{ChatRequest, CompletionBackend};
use crate::error::{RecycleError, Result};
use crate::store::{SearchIndex, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

const EMPTY_RESPONSE: &str = r#"{"components": [], "overall_explanation": ""}"#;

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Fail(String),
}

/// 固定応答を返す CompletionBackend（受け取ったリクエストを記録）
pub struct MockBackend {
    reply: MockReply,
    requests: Mutex<Vec<ChatRequest>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// 部品0件の応答を返す
    pub fn new() -> Self {
        Self::with_response(EMPTY_RESPONSE)
    }

    pub fn with_response(text: impl Into<String>) -> Self {
        Self {
            reply: MockReply::Text(text.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 常に `RecycleError::Upstream` を返す
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: MockReply::Fail(message.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests().pop()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        match &self.reply {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::Fail(message) => Err(RecycleError::Upstream(message.clone())),
        }
    }
}

/// 全操作が失敗する SearchIndex（接続不可・権限不足の再現）
pub struct FailingIndex {
    error: StoreError,
    ping_ok: bool,
}

impl FailingIndex {
    pub fn unreachable() -> Self {
        Self {
            error: StoreError::Unavailable("connection refused".into()),
            ping_ok: false,
        }
    }

    /// 疎通確認は通るが、読み書きは権限エラー
    pub fn unauthorized() -> Self {
        Self {
            error: StoreError::Unauthorized("security_exception".into()),
            ping_ok: true,
        }
    }
}

#[async_trait]
impl SearchIndex for FailingIndex {
    async fn ping(&self) -> std::result::Result<(), StoreError> {
        if self.ping_ok {
            Ok(())
        } else {
            Err(self.error.clone())
        }
    }

    async fn index_exists(&self, _index: &str) -> std::result::Result<bool, StoreError> {
        Err(self.error.clone())
    }

    async fn create_index(&self, _index: &str, _schema: &Value) -> std::result::Result<(), StoreError> {
        Err(self.error.clone())
    }

    async fn index_document(&self, _index: &str, _document: &Value) -> std::result::Result<String, StoreError> {
        Err(self.error.clone())
    }

    async fn search_latest(&self, _index: &str, _sort_field: &str) -> std::result::Result<Option<Value>, StoreError> {
        Err(self.error.clone())
    }
}
