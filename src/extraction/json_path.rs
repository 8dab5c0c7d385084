//! JSON path resolution.
//!
//! Resolves dot-delimited paths like "data.user.id" against a parsed body.

use serde_json::Value;

/// Resolve a dot-delimited path to a value in JSON.
///
/// Numeric segments index into arrays, so `"items.0.sku"` reads the first
/// item. Any missing segment yields `None`.
///
/// # Examples
/// ```
/// use recsys_tracker_core::extraction::resolve_json_path;
/// use serde_json::json;
/// let body = json!({"username": "john_doe", "userId": "12345"});
/// assert_eq!(resolve_json_path(&body, "userId"), Some(&json!("12345")));
/// ```
pub fn resolve_json_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return Some(data);
    }

    let mut current = data;
    for part in path.split('.') {
        match current {
            Value::Object(obj) => {
                current = obj.get(part)?;
            }
            Value::Array(arr) => {
                let index: usize = part.parse().ok()?;
                current = arr.get(index)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Convert a JSON scalar to its payload string. `null` has no payload value.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        _ => Some(value.to_string()), // Arrays and objects as JSON strings
    }
}

/// Parse a rating-like payload string into a float.
pub fn parse_float(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_path() {
        let data = json!({"userId": "12345"});
        assert_eq!(resolve_json_path(&data, "userId"), Some(&json!("12345")));
    }

    #[test]
    fn test_nested_path() {
        let data = json!({
            "data": {
                "user": {"id": 42}
            }
        });
        assert_eq!(resolve_json_path(&data, "data.user.id"), Some(&json!(42)));
    }

    #[test]
    fn test_array_index() {
        let data = json!({
            "items": [
                {"sku": "A-1"},
                {"sku": "B-2"}
            ]
        });
        assert_eq!(resolve_json_path(&data, "items.1.sku"), Some(&json!("B-2")));
        assert_eq!(resolve_json_path(&data, "items.2.sku"), None);
    }

    #[test]
    fn test_missing_path() {
        let data = json!({"username": "john_doe"});
        assert_eq!(resolve_json_path(&data, "userId"), None);
        assert_eq!(resolve_json_path(&data, "username.first"), None);
    }

    #[test]
    fn test_empty_path() {
        let data = json!({"name": "test"});
        assert_eq!(resolve_json_path(&data, ""), Some(&data));
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&json!("abc")), Some("abc".to_string()));
        assert_eq!(value_to_string(&json!(12345)), Some("12345".to_string()));
        assert_eq!(value_to_string(&json!(true)), Some("true".to_string()));
        assert_eq!(value_to_string(&json!(null)), None);
        assert_eq!(value_to_string(&json!([1, 2])), Some("[1,2]".to_string()));
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float(" 4.5 "), Some(4.5));
        assert_eq!(parse_float("five"), None);
        assert_eq!(parse_float("NaN"), None);
    }
}
