//! The JSON-with-binary-buffers parser collaborator (`spec.md` §1, §6):
//! ordinary JSON except object literals of the exact shape
//! `{"__buffer__": "<base64>"}` are restored to raw bytes.

use crate::value::Value;

#[derive(Debug)]
pub struct JsonBufError(pub String);

impl std::fmt::Display for JsonBufError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for JsonBufError {}

pub fn parse(bytes: &[u8]) -> Result<Value, JsonBufError> {
    let json: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| JsonBufError(e.to_string()))?;
    Ok(Value::from_json(&json))
}

pub fn parse_str(text: &str) -> Result<Value, JsonBufError> {
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|e| JsonBufError(e.to_string()))?;
    Ok(Value::from_json(&json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json_parses_without_buffer_coercion() {
        let v = parse_str(r#"{"a": [1, 2, "x"]}"#).unwrap();
        let Value::Object(map) = v else { panic!("expected object") };
        assert_eq!(
            map.get("a"),
            Some(&Value::Array(vec![
                Value::Number(1.0),
                Value::Number(2.0),
                Value::String("x".to_string())
            ]))
        );
    }

    #[test]
    fn buffer_token_is_restored_to_bytes() {
        use base64::Engine;
        let b64 = base64::engine::general_purpose::STANDARD.encode([1, 2, 3]);
        let text = format!(r#"{{"__buffer__": "{}"}}"#, b64);
        let v = parse_str(&text).unwrap();
        assert_eq!(v, Value::Buffer(vec![1, 2, 3]));
    }

    #[test]
    fn an_object_with_extra_keys_is_not_mistaken_for_a_buffer() {
        use base64::Engine;
        let b64 = base64::engine::general_purpose::STANDARD.encode([1, 2, 3]);
        let text = format!(r#"{{"__buffer__": "{}", "other": 1}}"#, b64);
        let v = parse_str(&text).unwrap();
        assert!(matches!(v, Value::Object(_)));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_str("{not json").is_err());
    }
}
