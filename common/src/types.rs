//! 分類結果の型定義
//!
//! CLI・HTTPサーバ・ストアで共有される型:
//! - DisposalCategory: 廃棄区分（PACT / CURBSIDE RECYCLING / TRASH）
//! - ClassificationComponent: 製品の構成部品ごとの分類
//! - CategoryPolicy: 未知の廃棄区分の扱い

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 廃棄区分
///
/// ワイヤ表現は `"PACT"`, `"CURBSIDE RECYCLING"`, `"TRASH"`。
/// `Unrecognized` は `CategoryPolicy::PassThrough` の場合のみ生成される。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DisposalCategory {
    Pact,
    CurbsideRecycling,
    #[default]
    Trash,
    Unrecognized(String),
}

impl DisposalCategory {
    /// 既知の3区分
    pub const KNOWN: [DisposalCategory; 3] = [
        DisposalCategory::Pact,
        DisposalCategory::CurbsideRecycling,
        DisposalCategory::Trash,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            DisposalCategory::Pact => "PACT",
            DisposalCategory::CurbsideRecycling => "CURBSIDE RECYCLING",
            DisposalCategory::Trash => "TRASH",
            DisposalCategory::Unrecognized(raw) => raw.as_str(),
        }
    }

    /// 既知区分として解釈できるか（大文字小文字・区切り文字は問わない）
    pub fn parse_known(raw: &str) -> Option<Self> {
        let normalized = raw
            .trim()
            .to_ascii_uppercase()
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        match normalized.as_str() {
            "PACT" => Some(DisposalCategory::Pact),
            "CURBSIDE RECYCLING" => Some(DisposalCategory::CurbsideRecycling),
            "TRASH" => Some(DisposalCategory::Trash),
            _ => None,
        }
    }
}

impl From<String> for DisposalCategory {
    fn from(raw: String) -> Self {
        DisposalCategory::parse_known(&raw).unwrap_or(DisposalCategory::Unrecognized(raw))
    }
}

impl From<DisposalCategory> for String {
    fn from(category: DisposalCategory) -> Self {
        match category {
            DisposalCategory::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for DisposalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 構成部品ごとの分類結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationComponent {
    pub component_name: String,
    pub material: String,
    pub disposal_category: DisposalCategory,
    pub classification_explanation: String,
}

/// 1製品分の分類結果（部品順を保持）
pub type ClassificationResult = Vec<ClassificationComponent>;

/// 未知の廃棄区分の扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryPolicy {
    /// 未知の値は TRASH に寄せる
    #[default]
    Strict,
    /// 未知の値をそのまま保持する
    #[serde(rename = "passthrough")]
    PassThrough,
}

impl CategoryPolicy {
    /// モデルが返した区分値を正規化（欠落時は TRASH）
    pub fn apply(&self, raw: Option<&str>) -> DisposalCategory {
        let Some(raw) = raw else {
            return DisposalCategory::Trash;
        };

        match (DisposalCategory::parse_known(raw), self) {
            (Some(known), _) => known,
            (None, CategoryPolicy::Strict) => DisposalCategory::Trash,
            (None, CategoryPolicy::PassThrough) => DisposalCategory::Unrecognized(raw.to_string()),
        }
    }
}

impl FromStr for CategoryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(CategoryPolicy::Strict),
            "passthrough" | "pass-through" | "pass_through" => Ok(CategoryPolicy::PassThrough),
            other => Err(format!("unknown category policy: {}", other)),
        }
    }
}

impl fmt::Display for CategoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryPolicy::Strict => f.write_str("strict"),
            CategoryPolicy::PassThrough => f.write_str("passthrough"),
        }
    }
}
