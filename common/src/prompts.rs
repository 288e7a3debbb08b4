//! プロンプト生成モジュール
//!
//! CLIとHTTPサーバで共有されるプロンプト:
//! - PACT_ITEMS / CURBSIDE_ITEMS / TRASH_ITEMS: 廃棄区分ごとの対象品目
//! - build_system_prompt: 分類ルールと応答JSON形式を定義するシステムプロンプト
//! - build_user_prompt: 製品説明を含むユーザメッセージ

use crate::types::DisposalCategory;

/// PACT（回収プログラム）の対象品目
pub const PACT_ITEMS: &[&str] = &[
    "Plastic bottles & jars (6 fl oz or smaller)",
    "Plastic + aluminum squeezable tubes",
    "Ceramic + porcelain containers",
    "Colored glass bottles + jars",
    "Caps + closures",
    "Pumps + dispensers",
    "Droppers + applicators",
    "Compacts + palettes",
    "Lipstick/lip gloss tubes + applicators",
    "Mascara tubes + wands",
    "Plastic pencil components for eye/brow/lip liner",
    "Toothpaste tubes",
    "Dental floss containers",
    "Silicone containers",
];

/// 資源ごみ（路上回収）の対象品目
pub const CURBSIDE_ITEMS: &[&str] = &[
    "Plastic containers #1, 2 & 5 (larger than 6 fl oz)",
    "Stainless steel",
    "Aluminum",
    "Cardboard",
    "Paper",
    "Glass bottles + jars",
];

/// 一般ごみの対象品目
pub const TRASH_ITEMS: &[&str] = &[
    "Plastic containers #3, #4, #6, and #7 (when larger than 2\"x2\" or 6 fl oz)",
    "Broken glass",
    "Dental floss",
    "Aerosol cans",
    "Sponges + brushes",
    "Single-use wipes",
    "Plastic + foil safety seals",
    "Plastic bag + wrappers",
    "Plastic with foil/metal inlay",
    "Nail polish + remover",
    "Toothbrushes",
];

fn items_for(category: &DisposalCategory) -> &'static [&'static str] {
    match category {
        DisposalCategory::Pact => PACT_ITEMS,
        DisposalCategory::CurbsideRecycling => CURBSIDE_ITEMS,
        DisposalCategory::Trash => TRASH_ITEMS,
        DisposalCategory::Unrecognized(_) => &[],
    }
}

/// システムプロンプト生成
///
/// 区分ごとの品目リストと、応答として要求するJSON形式を含む。
/// 応答形式は `parse_classification_response` が受け付ける形と一致させること。
pub fn build_system_prompt() -> String {
    let mapping = DisposalCategory::KNOWN
        .iter()
        .map(|category| {
            let items = items_for(category)
                .iter()
                .map(|item| format!("- {}", item))
                .collect::<Vec<_>>()
                .join("\n");
            format!("{}:\n{}", category.as_str(), items)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let categories = DisposalCategory::KNOWN
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are an expert in beauty product recycling classification.
Analyze the product and respond ONLY with a valid JSON object (no additional text or markdown).

## Disposal categories
Classify each component based on the following mapping:

{mapping}

## Output format (respond with exactly this JSON shape)
{{
  "components": [
    {{
      "component_name": "name of the product component",
      "component_material": "material type (include plastic grade if applicable)",
      "disposal_category": "one of [{categories}]",
      "disposal_category_explanation": "detailed explanation including size considerations and material composition"
    }}
  ],
  "overall_explanation": "comprehensive explanation of the entire product's recycling classification"
}}

## Notes
- List every physical component separately (container, cap, pump, seal, packaging)
- disposal_category must be exactly one of: {categories}
- Output the JSON object only"#
    )
}

/// ユーザメッセージ本文
pub fn build_user_prompt(description: &str) -> String {
    format!("Analyze this beauty product: {}", description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_lists_all_categories() {
        let prompt = build_system_prompt();
        assert!(prompt.contains("PACT:\n- Plastic bottles & jars"));
        assert!(prompt.contains("CURBSIDE RECYCLING:\n- Plastic containers #1, 2 & 5"));
        assert!(prompt.contains("TRASH:\n- Plastic containers #3"));
        assert!(prompt.contains("- Toothbrushes"));
    }

    #[test]
    fn test_system_prompt_defines_response_shape() {
        let prompt = build_system_prompt();
        assert!(prompt.contains("\"components\""));
        assert!(prompt.contains("\"component_material\""));
        assert!(prompt.contains("\"disposal_category_explanation\""));
        assert!(prompt.contains("\"overall_explanation\""));
        assert!(prompt.contains("one of [PACT, CURBSIDE RECYCLING, TRASH]"));
    }

    #[test]
    fn test_system_prompt_is_stable() {
        assert_eq!(build_system_prompt(), build_system_prompt());
    }

    #[test]
    fn test_user_prompt() {
        assert_eq!(
            build_user_prompt("30ml serum in amber glass dropper bottle"),
            "Analyze this beauty product: 30ml serum in amber glass dropper bottle"
        );
    }
}
