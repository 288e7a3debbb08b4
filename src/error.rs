use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecycleError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("OpenAI API key is not set. Set OPENAI_API_KEY or run `beauty-recycle config --set-api-key YOUR_KEY`")]
    MissingApiKey,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Image load error: {0}")]
    ImageLoad(String),

    #[error("Upstream API error: {0}")]
    Upstream(String),

    #[error("Invalid upstream response format: {0}")]
    UpstreamFormat(String),

    #[error("JSON error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Common(#[from] beauty_recycle_common::Error),
}

pub type Result<T> = std::result::Result<T, RecycleError>;
