//! Beauty Recycle Common Library
//!
//! CLIとHTTPサーバで共有される型・プロンプト・レスポンスパーサー

pub mod error;
pub mod parser;
pub mod prompts;
pub mod types;

pub use error::{Error, Result};
pub use parser::{extract_json, normalize_component, parse_classification_response};
pub use prompts::{build_system_prompt, build_user_prompt};
pub use types::{CategoryPolicy, ClassificationComponent, ClassificationResult, DisposalCategory};
