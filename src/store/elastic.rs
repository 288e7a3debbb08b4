//! Elasticsearch REST API クライアント
//!
//! 使用するAPIのみ実装:
//! - GET /                     疎通確認
//! - HEAD /{index}             存在確認
//! - PUT /{index}              スキーマ付き作成
//! - POST /{index}/_doc        文書追加（refresh=wait_for）
//! - POST /{index}/_search     最新1件

use super::{SearchIndex, StoreError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;

#[derive(Clone)]
pub struct ElasticIndex {
    http_client: Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
}

impl ElasticIndex {
    pub fn new(url: &str, api_key: &str, accept_invalid_certs: bool) -> Result<Self, StoreError> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            max_retries: MAX_RETRIES,
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("Authorization", format!("ApiKey {}", self.api_key))
    }

    /// タイムアウト・接続失敗のみ再送（待ち時間なし）
    async fn send<F>(&self, build: F) -> Result<Response, StoreError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            match self.authorized(build()).send().await {
                Ok(response) => return Ok(response),
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.max_retries => {
                    attempt += 1;
                    debug!(attempt, error = %e, "retrying Elasticsearch request");
                }
                Err(e) => return Err(StoreError::Unavailable(e.to_string())),
            }
        }
    }
}

/// エラーレスポンスを StoreError に変換
async fn error_from_response(index: &str, response: Response) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized(body),
        StatusCode::NOT_FOUND => StoreError::IndexNotFound(index.to_string()),
        _ if body.contains("resource_already_exists_exception") => {
            StoreError::IndexAlreadyExists(index.to_string())
        }
        _ if body.contains("index_not_found_exception") => StoreError::IndexNotFound(index.to_string()),
        _ => StoreError::Response(format!("status {}: {}", status, body)),
    }
}

async fn read_json(response: Response) -> Result<Value, StoreError> {
    response
        .json()
        .await
        .map_err(|e| StoreError::Response(format!("invalid JSON body: {}", e)))
}

#[async_trait]
impl SearchIndex for ElasticIndex {
    async fn ping(&self) -> Result<(), StoreError> {
        let response = self.send(|| self.http_client.get(self.url("/"))).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response("", response).await)
        }
    }

    async fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
        let response = self.send(|| self.http_client.head(self.url(index))).await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(error_from_response(index, response).await),
        }
    }

    async fn create_index(&self, index: &str, schema: &Value) -> Result<(), StoreError> {
        let response = self
            .send(|| self.http_client.put(self.url(index)).json(schema))
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(index, response).await)
        }
    }

    async fn index_document(&self, index: &str, document: &Value) -> Result<String, StoreError> {
        let url = self.url(&format!("{}/_doc", index));
        let response = self
            .send(|| {
                self.http_client
                    .post(&url)
                    .query(&[("refresh", "wait_for")])
                    .json(document)
            })
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(index, response).await);
        }

        let body = read_json(response).await?;
        body.get("_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StoreError::Response("missing _id in index response".into()))
    }

    async fn search_latest(&self, index: &str, sort_field: &str) -> Result<Option<Value>, StoreError> {
        let url = self.url(&format!("{}/_search", index));
        let query = json!({
            "query": {"match_all": {}},
            "sort": [{sort_field: {"order": "desc"}}],
            "size": 1
        });

        let response = self.send(|| self.http_client.post(&url).json(&query)).await?;
        if !response.status().is_success() {
            return Err(error_from_response(index, response).await);
        }

        let body = read_json(response).await?;
        Ok(body.pointer("/hits/hits/0/_source").cloned())
    }
}
