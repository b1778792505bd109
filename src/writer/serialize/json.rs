//! JSON serialize writer (`spec.md` §4.6). Round-trips through the same
//! JSON-with-buffers encoding used elsewhere in the compiler (`spec.md` §6).

use crate::value::Value;

pub fn to_string(value: &Value, pretty: bool) -> String {
    let json = value.to_json();
    if pretty {
        serde_json::to_string_pretty(&json).unwrap_or_default()
    } else {
        serde_json::to_string(&json).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn compact_output_has_no_extra_whitespace() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Value::Number(1.0));
        let out = to_string(&Value::Object(map), false);
        assert_eq!(out, "{\"a\":1}");
    }

    #[test]
    fn pretty_output_is_multiline() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Value::Number(1.0));
        let out = to_string(&Value::Object(map), true);
        assert!(out.contains('\n'));
    }

    #[test]
    fn output_round_trips_through_parse_str() {
        let mut map = BTreeMap::new();
        map.insert("name".to_string(), Value::String("poml".to_string()));
        map.insert("count".to_string(), Value::Number(3.0));
        let out = to_string(&Value::Object(map.clone()), false);
        let parsed = crate::jsonbuf::parse_str(&out).unwrap();
        assert_eq!(parsed, Value::Object(map));
    }
}
