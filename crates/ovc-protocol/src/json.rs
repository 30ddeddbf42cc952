//! Tolerant navigation over OVC JSON payloads.
//!
//! The services wrap their data in operation-specific result objects and
//! switch between a single object and an array depending on the match count,
//! so lookups search by key rather than by fixed path.

use serde_json::Value;

/// First value stored under `key`, depth first.
pub fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map
            .get(key)
            .or_else(|| map.values().find_map(|v| find_key(v, key))),
        Value::Array(items) => items.iter().find_map(|v| find_key(v, key)),
        _ => None,
    }
}

/// An array's items, a lone object as one item, nothing for null.
pub fn one_or_many(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Text of a string or number.
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Text under a direct child key.
pub fn field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(scalar_string)
}

/// Text under a path of direct child keys.
pub fn path(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .try_fold(value, |v, k| v.get(*k))
        .and_then(scalar_string)
}

/// Decimal with either separator (`"12,5"` or `"12.5"`).
pub fn decimal(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_find_key_nested() {
        let v = json!({"outer": {"list": [{"a": 1}, {"target": "x"}]}});
        assert_eq!(find_key(&v, "target"), Some(&json!("x")));
        assert_eq!(find_key(&v, "missing"), None);
    }

    #[test]
    fn test_one_or_many() {
        assert_eq!(one_or_many(&json!([1, 2])).len(), 2);
        assert_eq!(one_or_many(&json!({"a": 1})).len(), 1);
        assert!(one_or_many(&Value::Null).is_empty());
    }

    #[test]
    fn test_scalars() {
        assert_eq!(scalar_string(&json!(" 28 ")), Some("28".to_string()));
        assert_eq!(scalar_string(&json!(79)), Some("79".to_string()));
        assert_eq!(scalar_string(&json!({})), None);
        assert_eq!(path(&json!({"a": {"b": "c"}}), &["a", "b"]), Some("c".to_string()));
        assert_eq!(decimal(&json!("12,500000")), Some(12.5));
    }
}
