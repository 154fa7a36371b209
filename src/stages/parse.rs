//! Lenient readers for structured generation output.

use serde_json::{Map, Value};

use super::{FallbackReason, StageOutcome};
use crate::meeting::{ActionItem, DEFAULT_QUALITY_SCORE};
use crate::normalizer::{JsonPayloadNormalizer, ResponseNormalizer};

pub fn parse_json(raw: &str) -> StageOutcome<Value> {
    let payload = JsonPayloadNormalizer::new().normalize(raw);
    match serde_json::from_str::<Value>(&payload) {
        Ok(value) => StageOutcome::Parsed(value),
        Err(e) => StageOutcome::Fallback(FallbackReason::Unparsable {
            error: e.to_string(),
        }),
    }
}

pub fn parse_object(raw: &str) -> StageOutcome<Map<String, Value>> {
    parse_json(raw).and_then(|value| match value {
        Value::Object(map) => StageOutcome::Parsed(map),
        _ => StageOutcome::Fallback(FallbackReason::WrongShape {
            expected: "a JSON object".to_string(),
        }),
    })
}

pub fn parse_array(raw: &str) -> StageOutcome<Vec<Value>> {
    parse_json(raw).and_then(|value| match value {
        Value::Array(items) => StageOutcome::Parsed(items),
        _ => StageOutcome::Fallback(FallbackReason::WrongShape {
            expected: "a JSON array".to_string(),
        }),
    })
}

/// Strings under the first present key. A lone string counts as a one-item
/// list; numbers are stringified; everything else is dropped.
pub fn string_list(map: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    let Some(value) = keys.iter().find_map(|key| map.get(*key)) else {
        return Vec::new();
    };

    let scalar = |v: &Value| match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };

    let items: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(scalar).collect(),
        other => scalar(other).into_iter().collect(),
    };

    items.into_iter().filter(|s| !s.is_empty()).collect()
}

pub fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Score in [0, 100]. Floats are rounded, out-of-range values clamped,
/// anything non-numeric gives the default.
pub fn quality_score(value: Option<&Value>) -> u8 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() => n.round().clamp(0.0, 100.0) as u8,
        _ => DEFAULT_QUALITY_SCORE,
    }
}

/// Decode every usable element; unusable ones are skipped.
pub fn action_list(values: &[Value]) -> Vec<ActionItem> {
    values.iter().filter_map(ActionItem::from_value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_object_shapes() {
        assert!(parse_object(r#"{"a": 1}"#).is_parsed());
        assert_eq!(
            parse_object("[1]"),
            StageOutcome::Fallback(FallbackReason::WrongShape {
                expected: "a JSON object".to_string()
            })
        );
        assert!(matches!(
            parse_object("not json"),
            StageOutcome::Fallback(FallbackReason::Unparsable { .. })
        ));
    }

    #[test]
    fn test_parse_array_rejects_object() {
        assert!(parse_array("[]").is_parsed());
        assert!(matches!(
            parse_array("{}"),
            StageOutcome::Fallback(FallbackReason::WrongShape { .. })
        ));
    }

    #[test]
    fn test_prose_mentioning_json_is_unparsable() {
        assert!(matches!(
            parse_array(r#"Owners: ["Ann"]"#),
            StageOutcome::Fallback(FallbackReason::Unparsable { .. })
        ));
        assert!(matches!(
            parse_object(r#"Config now reads {"retries": 3}"#),
            StageOutcome::Fallback(FallbackReason::Unparsable { .. })
        ));
    }

    #[test]
    fn test_string_list_variants() {
        let map = json!({
            "topics": ["Budget", "  ", 3, {"nested": true}, " Hiring "],
            "single": "Only one",
            "nothing": null
        });
        let map = map.as_object().unwrap();

        assert_eq!(string_list(map, &["topics"]), vec!["Budget", "3", "Hiring"]);
        assert_eq!(string_list(map, &["single"]), vec!["Only one"]);
        assert!(string_list(map, &["nothing"]).is_empty());
        assert!(string_list(map, &["missing"]).is_empty());
        assert_eq!(string_list(map, &["missing", "single"]), vec!["Only one"]);
    }

    #[test]
    fn test_quality_score_normalization() {
        assert_eq!(quality_score(Some(&json!(87))), 87);
        assert_eq!(quality_score(Some(&json!(84.6))), 85);
        assert_eq!(quality_score(Some(&json!(140))), 100);
        assert_eq!(quality_score(Some(&json!(-3))), 0);
        assert_eq!(quality_score(Some(&json!("72"))), 72);
        assert_eq!(quality_score(Some(&json!("90%"))), 90);
        assert_eq!(quality_score(Some(&json!("great"))), DEFAULT_QUALITY_SCORE);
        assert_eq!(quality_score(Some(&json!(null))), DEFAULT_QUALITY_SCORE);
        assert_eq!(quality_score(None), DEFAULT_QUALITY_SCORE);
    }

    #[test]
    fn test_action_list_skips_garbage() {
        let values = vec![json!({"description": "A"}), json!(7), json!("B")];
        let actions = action_list(&values);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[1].description, "B");
    }
}
