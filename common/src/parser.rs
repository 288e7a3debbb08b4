//! APIレスポンスパーサー
//!
//! モデルの応答テキストからJSONオブジェクトを抽出し、
//! `components` 配列を ClassificationComponent に正規化する

use crate::error::{Error, Result};
use crate::types::{CategoryPolicy, ClassificationComponent};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// APIレスポンスからJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の {...} オブジェクト
/// 3. エラー
///
/// # Examples
/// ```
/// use beauty_recycle_common::extract_json;
///
/// let response = "Result: {\"components\": []}";
/// let json = extract_json(response).unwrap();
/// assert_eq!(json, "{\"components\": []}");
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    // ```json ... ``` ブロックを探す
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    // 生の {...} を探す
    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end >= start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Format("no JSON object found in response".into()))
}

/// モデルが返す部品1件分（正規化前）
#[derive(Debug, Deserialize)]
struct RawComponent {
    component_name: String,
    component_material: String,
    #[serde(default)]
    disposal_category: Option<String>,
    #[serde(default)]
    disposal_category_explanation: Option<String>,
}

/// 部品1件を正規化
///
/// 必須フィールド（component_name, component_material）の欠落や型不一致は `None`。
pub fn normalize_component(entry: &Value, policy: CategoryPolicy) -> Option<ClassificationComponent> {
    let raw = RawComponent::deserialize(entry).ok()?;

    Some(ClassificationComponent {
        component_name: raw.component_name,
        material: raw.component_material,
        disposal_category: policy.apply(raw.disposal_category.as_deref()),
        classification_explanation: raw.disposal_category_explanation.unwrap_or_default(),
    })
}

/// 分類レスポンスをパース
///
/// # Returns
/// * `Ok(Vec<ClassificationComponent>)` - 正規化済み部品（不正な部品は除外、空もあり得る）
/// * `Err(Error::Format)` - JSONでない、`components` がない、配列でない
pub fn parse_classification_response(
    response: &str,
    policy: CategoryPolicy,
) -> Result<Vec<ClassificationComponent>> {
    let json_str = extract_json(response)?;
    let value: Value = serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Format(format!("invalid JSON response: {}", e)))?;

    let Value::Object(mut top) = value else {
        return Err(Error::Format("response is not a JSON object".into()));
    };

    let components = match top.remove("components") {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(Error::Format("'components' is not an array".into())),
        None => return Err(Error::Format("missing 'components' array".into())),
    };

    let total = components.len();
    let normalized: Vec<ClassificationComponent> = components
        .iter()
        .enumerate()
        .filter_map(|(idx, entry)| {
            let component = normalize_component(entry, policy);
            if component.is_none() {
                debug!(index = idx, "skipping malformed component");
            }
            component
        })
        .collect();

    if normalized.len() < total {
        debug!(kept = normalized.len(), total, "dropped malformed components");
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DisposalCategory;
    use serde_json::json;

    // =============================================
    // extract_json テスト
    // =============================================

    #[test]
    fn test_extract_json_with_block() {
        let response = r#"Here is the analysis:
```json
{"components": [{"component_name": "Cap"}]}
```
Some additional text."#;

        let json = extract_json(response).unwrap();
        assert_eq!(json, r#"{"components": [{"component_name": "Cap"}]}"#);
    }

    #[test]
    fn test_extract_json_raw() {
        let response = r#"{"components": []}"#;
        assert_eq!(extract_json(response).unwrap(), response);
    }

    #[test]
    fn test_extract_json_with_surrounding_text() {
        let response = r#"Sure! {"components": []} Hope this helps."#;
        assert_eq!(extract_json(response).unwrap(), r#"{"components": []}"#);
    }

    #[test]
    fn test_extract_json_error() {
        let result = extract_json("No JSON here, just plain text.");
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[test]
    fn test_extract_json_empty_response() {
        assert!(extract_json("").is_err());
    }

    // =============================================
    // normalize_component テスト
    // =============================================

    #[test]
    fn test_normalize_component_maps_fields() {
        let entry = json!({
            "component_name": "Pump",
            "component_material": "PP #5 with steel spring",
            "disposal_category": "PACT",
            "disposal_category_explanation": "Pumps go to PACT"
        });

        let component = normalize_component(&entry, CategoryPolicy::Strict).unwrap();
        assert_eq!(component.component_name, "Pump");
        assert_eq!(component.material, "PP #5 with steel spring");
        assert_eq!(component.disposal_category, DisposalCategory::Pact);
        assert_eq!(component.classification_explanation, "Pumps go to PACT");
    }

    #[test]
    fn test_normalize_component_defaults() {
        let entry = json!({"component_name": "Box", "component_material": "Cardboard"});

        let component = normalize_component(&entry, CategoryPolicy::Strict).unwrap();
        assert_eq!(component.disposal_category, DisposalCategory::Trash);
        assert_eq!(component.classification_explanation, "");
    }

    #[test]
    fn test_normalize_component_null_category() {
        let entry = json!({
            "component_name": "Box",
            "component_material": "Cardboard",
            "disposal_category": null
        });

        let component = normalize_component(&entry, CategoryPolicy::PassThrough).unwrap();
        assert_eq!(component.disposal_category, DisposalCategory::Trash);
    }

    #[test]
    fn test_normalize_component_rejects_bad_types() {
        assert!(normalize_component(&json!({"component_name": 3, "component_material": "Glass"}), CategoryPolicy::Strict).is_none());
        assert!(normalize_component(&json!({"component_name": "Jar"}), CategoryPolicy::Strict).is_none());
        assert!(normalize_component(&json!("Jar"), CategoryPolicy::Strict).is_none());
        assert!(normalize_component(&json!(null), CategoryPolicy::Strict).is_none());
    }

    // =============================================
    // parse_classification_response テスト
    // =============================================

    #[test]
    fn test_parse_drops_component_missing_material() {
        let response = r#"{
  "components": [
    {"component_name": "Bottle", "component_material": "Amber glass", "disposal_category": "CURBSIDE RECYCLING", "disposal_category_explanation": "Glass bottles are curbside"},
    {"component_name": "Dropper", "component_material": "Rubber + glass pipette"},
    {"component_name": "Seal", "disposal_category": "TRASH"}
  ],
  "overall_explanation": "Mostly recyclable"
}"#;

        let result = parse_classification_response(response, CategoryPolicy::Strict).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].component_name, "Bottle");
        assert_eq!(result[0].disposal_category, DisposalCategory::CurbsideRecycling);
        assert_eq!(result[1].component_name, "Dropper");
        assert_eq!(result[1].disposal_category, DisposalCategory::Trash);
    }

    #[test]
    fn test_parse_empty_components() {
        let result = parse_classification_response(r#"{"components": []}"#, CategoryPolicy::Strict).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_parse_non_json() {
        let result = parse_classification_response("I cannot classify this product.", CategoryPolicy::Strict);
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[test]
    fn test_parse_broken_json() {
        let result = parse_classification_response(r#"{"components": [ {"component_name": }"#, CategoryPolicy::Strict);
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[test]
    fn test_parse_missing_components() {
        let result = parse_classification_response(r#"{"overall_explanation": "n/a"}"#, CategoryPolicy::Strict);
        match result {
            Err(Error::Format(msg)) => assert!(msg.contains("components")),
            other => panic!("Expected Format error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_components_not_array() {
        let result = parse_classification_response(r#"{"components": {"component_name": "Cap"}}"#, CategoryPolicy::Strict);
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[test]
    fn test_parse_with_json_block() {
        let response = "```json\n{\"components\": [{\"component_name\": \"Cap\", \"component_material\": \"PP\", \"disposal_category\": \"PACT\"}]}\n```";
        let result = parse_classification_response(response, CategoryPolicy::Strict).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].disposal_category, DisposalCategory::Pact);
    }

    #[test]
    fn test_parse_unrecognized_category_by_policy() {
        let response = r#"{"components": [{"component_name": "Can", "component_material": "Aluminum", "disposal_category": "HAZARDOUS WASTE"}]}"#;

        let strict = parse_classification_response(response, CategoryPolicy::Strict).unwrap();
        assert_eq!(strict[0].disposal_category, DisposalCategory::Trash);

        let passthrough = parse_classification_response(response, CategoryPolicy::PassThrough).unwrap();
        assert_eq!(
            passthrough[0].disposal_category,
            DisposalCategory::Unrecognized("HAZARDOUS WASTE".to_string())
        );
    }

    #[test]
    fn test_parse_preserves_order() {
        let response = r#"{"components": [
            {"component_name": "A", "component_material": "x"},
            {"component_name": "B", "component_material": "y"},
            {"component_name": "C", "component_material": "z"}
        ]}"#;
        let result = parse_classification_response(response, CategoryPolicy::Strict).unwrap();
        let names: Vec<&str> = result.iter().map(|c| c.component_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }
}
