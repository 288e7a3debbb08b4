use crate::error::{RecycleError, Result};
use beauty_recycle_common::CategoryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OpenAI APIキー（未設定なら分類機能は無効）
    pub api_key: Option<String>,
    pub openai_base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_seconds: u64,

    /// Elasticsearch（URLとAPIキーの両方が揃わなければ保存機能は無効）
    pub elasticsearch_url: Option<String>,
    pub elasticsearch_api_key: Option<String>,
    pub accept_invalid_certs: bool,

    pub category_policy: CategoryPolicy,
    pub export_dir: PathBuf,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.into(),
            model: "gpt-4o".into(),
            max_tokens: 1000,
            timeout_seconds: 120,
            elasticsearch_url: None,
            elasticsearch_api_key: None,
            accept_invalid_certs: false,
            category_policy: CategoryPolicy::Strict,
            export_dir: PathBuf::from("exports"),
            port: 5000,
        }
    }
}

impl Config {
    /// 設定ファイル → 環境変数（.env含む）の順に読み込み
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Self::load_file()?;
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        Self::load_file_at(&Self::config_path()?)
    }

    fn load_file_at(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// 環境変数で上書き（空文字は未設定扱い）
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.openai_base_url = url;
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.model = model;
        }
        if let Some(tokens) = get("OPENAI_MAX_TOKENS") {
            self.max_tokens = tokens
                .parse()
                .map_err(|_| RecycleError::Config(format!("OPENAI_MAX_TOKENS must be a number: {}", tokens)))?;
        }
        if let Some(timeout) = get("OPENAI_TIMEOUT_SECONDS") {
            self.timeout_seconds = timeout
                .parse()
                .map_err(|_| RecycleError::Config(format!("OPENAI_TIMEOUT_SECONDS must be a number: {}", timeout)))?;
        }
        if let Some(url) = get("ELASTICSEARCH_URL") {
            self.elasticsearch_url = Some(url);
        }
        if let Some(key) = get("ELASTICSEARCH_API_KEY") {
            self.elasticsearch_api_key = Some(key);
        }
        if let Some(flag) = get("ELASTICSEARCH_ACCEPT_INVALID_CERTS") {
            self.accept_invalid_certs = matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(policy) = get("CATEGORY_POLICY") {
            self.category_policy = policy.parse().map_err(RecycleError::Config)?;
        }
        if let Some(dir) = get("EXPORT_DIR") {
            self.export_dir = PathBuf::from(dir);
        }
        if let Some(port) = get("PORT") {
            self.port = port
                .parse()
                .map_err(|_| RecycleError::Config(format!("PORT must be a valid number: {}", port)))?;
        }

        Ok(())
    }

    fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| RecycleError::Config("home directory not found".into()))?;
        Ok(home.join(".config").join("beauty-recycle").join("config.json"))
    }

    /// APIキーを設定ファイルに保存
    ///
    /// ファイルの内容だけを読み直して書き戻す（環境変数・.env の値は書き込まない）。
    pub fn set_api_key(key: String) -> Result<()> {
        Self::set_api_key_at(&Self::config_path()?, key)
    }

    fn set_api_key_at(config_path: &Path, key: String) -> Result<()> {
        let mut file_config = Self::load_file_at(config_path)?;
        file_config.api_key = Some(key);
        file_config.save_to(config_path)
    }

    /// コマンドライン指定があれば区分ポリシーを上書き
    pub fn with_category_policy(mut self, policy: Option<CategoryPolicy>) -> Self {
        if let Some(policy) = policy {
            self.category_policy = policy;
        }
        self
    }

    /// Elasticsearch接続情報（URLとAPIキーが両方ある場合のみ）
    pub fn elasticsearch_credentials(&self) -> Option<(&str, &str)> {
        match (&self.elasticsearch_url, &self.elasticsearch_api_key) {
            (Some(url), Some(key)) => Some((url.as_str(), key.as_str())),
            _ => None,
        }
    }
}
