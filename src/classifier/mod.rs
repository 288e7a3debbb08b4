//! 製品説明（＋写真）の廃棄区分分類
//!
//! 処理の流れ:
//! 1. 入力検証（説明文が空ならエラー、外部呼び出しなし）
//! 2. システムプロンプト + ユーザメッセージ（画像はdata URLで添付）を構築
//! 3. CompletionBackend へ送信（temperature 0、出力トークン上限あり）
//! 4. 応答JSONを検証し ClassificationComponent に正規化
//!
//! プロンプトと応答パーサーは beauty_recycle_common を使用

pub mod image;
mod openai;
pub mod request;

pub use openai::OpenAiBackend;
pub use request::{ChatRequest, ContentPart, ImageUrl, Message, MessageContent, Role};

use crate::config::Config;
use crate::error::{RecycleError, Result};
use async_trait::async_trait;
use beauty_recycle_common::{
    build_system_prompt, build_user_prompt, parse_classification_response, CategoryPolicy,
    ClassificationResult,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 補完エンドポイントへの送信口
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// リクエストを送り、応答テキスト（choices[0].message.content）を返す
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

pub struct Classifier {
    backend: Option<Arc<dyn CompletionBackend>>,
    model: String,
    max_tokens: u32,
    policy: CategoryPolicy,
}

impl Classifier {
    pub fn new(backend: Arc<dyn CompletionBackend>, model: impl Into<String>) -> Self {
        Self {
            backend: Some(backend),
            model: model.into(),
            max_tokens: 1000,
            policy: CategoryPolicy::default(),
        }
    }

    /// APIキー未設定時の分類器（classifyは常に MissingApiKey）
    pub fn unconfigured() -> Self {
        Self {
            backend: None,
            model: String::new(),
            max_tokens: 1000,
            policy: CategoryPolicy::default(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let Some(api_key) = config.api_key.as_deref() else {
            warn!("OPENAI_API_KEY is not set; classification is disabled");
            return Ok(Self::unconfigured().with_policy(config.category_policy));
        };

        let backend = OpenAiBackend::new(
            api_key,
            config.openai_base_url.as_str(),
            Duration::from_secs(config.timeout_seconds),
        )?;

        Ok(Self::new(Arc::new(backend), config.model.as_str())
            .with_max_tokens(config.max_tokens)
            .with_policy(config.category_policy))
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_policy(mut self, policy: CategoryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    /// 送信リクエストを構築
    pub fn build_request(&self, description: &str, image: Option<&[u8]>) -> ChatRequest {
        let user_text = build_user_prompt(description);

        let user_message = match image {
            Some(bytes) => Message::user_with_image(user_text, image::to_data_url(bytes)),
            None => Message::user(user_text),
        };

        ChatRequest {
            model: self.model.clone(),
            messages: vec![Message::system(build_system_prompt()), user_message],
            max_tokens: self.max_tokens,
            temperature: 0.0,
        }
    }

    /// 製品を分類
    ///
    /// # Errors
    /// * `Validation` - 説明文が空
    /// * `MissingApiKey` - バックエンド未設定
    /// * `Upstream` - API呼び出し自体の失敗（リトライなし）
    /// * `UpstreamFormat` - 応答が期待するJSON形式でない
    pub async fn classify(&self, description: &str, image: Option<&[u8]>) -> Result<ClassificationResult> {
        if description.trim().is_empty() {
            return Err(RecycleError::Validation("product description is required".into()));
        }

        let backend = self.backend.as_ref().ok_or(RecycleError::MissingApiKey)?;

        info!(
            description_len = description.len(),
            has_image = image.is_some(),
            "classifying product"
        );

        let request = self.build_request(description, image);
        let response = backend.complete(&request).await?;
        debug!(response = %response, "raw completion");

        let components = parse_classification_response(&response, self.policy)
            .map_err(|e| RecycleError::UpstreamFormat(e.to_string()))?;

        info!(components = components.len(), "classification complete");
        Ok(components)
    }
}
