//! YAML serialize writer (`spec.md` §4.6).

use crate::value::Value;

pub fn to_string(value: &Value) -> String {
    serde_yaml::to_string(&value.to_json()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn scalar_round_trips_through_serde_yaml() {
        let out = to_string(&Value::String("hi".to_string()));
        let back: serde_json::Value = serde_yaml::from_str(&out).unwrap();
        assert_eq!(back, serde_json::Value::String("hi".to_string()));
    }

    #[test]
    fn object_keys_appear_in_the_output() {
        let mut map = BTreeMap::new();
        map.insert("name".to_string(), Value::String("poml".to_string()));
        map.insert("count".to_string(), Value::Number(3.0));
        let out = to_string(&Value::Object(map));
        assert!(out.contains("name:"));
        assert!(out.contains("count:"));
    }
}
