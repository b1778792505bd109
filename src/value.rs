//! The dynamic value type shared by the context, the expression evaluator,
//! and IR attributes (`spec.md` §3: "Context: a mapping from string to
//! value (scalar, array, object, binary buffer, or arbitrary evaluator
//! value)").

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    /// A binary buffer restored from a `{"__buffer__": "<base64>"}` token by
    /// the JSON-with-buffers parser (`spec.md` §6).
    Buffer(Vec<u8>),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
            Value::Buffer(b) => !b.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Stringify for interpolation into text/attribute output. Scalars print
    /// plainly; containers print as compact JSON (matches the reader's "if
    /// every piece collapses to strings/numbers, join" rule in `spec.md`
    /// §4.3 — containers never silently collapse).
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => {
                serde_json::to_string(&self.to_json()).unwrap_or_default()
            }
            Value::Buffer(b) => format!("<buffer {} bytes>", b.len()),
        }
    }

    /// True for the scalar kinds that may collapse into a joined string
    /// during interpolation.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_))
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Array(a) => JsonValue::Array(a.iter().map(Value::to_json).collect()),
            Value::Object(o) => {
                JsonValue::Object(o.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
            Value::Buffer(b) => {
                use base64::Engine;
                let mut map = serde_json::Map::new();
                map.insert(
                    "__buffer__".to_string(),
                    JsonValue::String(base64::engine::general_purpose::STANDARD.encode(b)),
                );
                JsonValue::Object(map)
            }
        }
    }

    pub fn from_json(json: &JsonValue) -> Value {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(a) => Value::Array(a.iter().map(Value::from_json).collect()),
            JsonValue::Object(map) => {
                if map.len() == 1 {
                    if let Some(JsonValue::String(b64)) = map.get("__buffer__") {
                        use base64::Engine;
                        if let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(b64) {
                            return Value::Buffer(bytes);
                        }
                    }
                }
                Value::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), Value::from_json(v)))
                        .collect(),
                )
            }
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// A mapping from name to value with global mutation (`<let>`) and local
/// shadowing (`for`-loop bindings), per `spec.md` §3.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Stack of scopes; index 0 is the global scope mutated by `<let>`.
    scopes: Vec<BTreeMap<String, Value>>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            scopes: vec![BTreeMap::new()],
        }
    }

    pub fn from_object(globals: BTreeMap<String, Value>) -> Self {
        Self {
            scopes: vec![globals],
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(v) = scope.get(name) {
                return Some(v);
            }
        }
        None
    }

    /// `<let>` always binds in the global (bottom) scope.
    pub fn set_global(&mut self, name: impl Into<String>, value: Value) {
        self.scopes[0].insert(name.into(), value);
    }

    /// Push a new local scope (entered for a `for`-loop iteration body).
    pub fn push_scope(&mut self) {
        self.scopes.push(BTreeMap::new());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Bind in the innermost (current) scope, shadowing any outer binding.
    pub fn bind_local(&mut self, name: impl Into<String>, value: Value) {
        let last = self.scopes.len() - 1;
        self.scopes[last].insert(name.into(), value);
    }

    pub fn merge_object_into_globals(&mut self, object: BTreeMap<String, Value>) {
        self.scopes[0].extend(object);
    }

    /// Flatten every scope into one map, innermost wins. Used by the trace
    /// writer to serialize the context a compile ran with (`spec.md` §6).
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        let mut flat = BTreeMap::new();
        for scope in &self.scopes {
            flat.extend(scope.clone());
        }
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_display_drops_trailing_zero_for_whole_numbers() {
        assert_eq!(Value::Number(3.0).to_display_string(), "3");
        assert_eq!(Value::Number(3.5).to_display_string(), "3.5");
    }

    #[test]
    fn containers_stringify_as_compact_json() {
        let arr = Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(arr.to_display_string(), "[1,2]");
    }

    #[test]
    fn buffer_round_trips_through_json_as_base64() {
        let buf = Value::Buffer(vec![1, 2, 3, 255]);
        let json = buf.to_json();
        assert!(!json["__buffer__"].as_str().unwrap().is_empty());
        let back = Value::from_json(&json);
        assert_eq!(back, buf);
    }

    #[test]
    fn is_truthy_matches_common_falsy_values() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(!Value::Array(vec![]).is_truthy());
        assert!(Value::Number(-1.0).is_truthy());
        assert!(Value::String("0".to_string()).is_truthy());
    }

    #[test]
    fn context_get_checks_inner_scopes_before_outer() {
        let mut ctx = Context::new();
        ctx.set_global("x", Value::Number(1.0));
        ctx.push_scope();
        ctx.bind_local("x", Value::Number(2.0));
        assert_eq!(ctx.get("x"), Some(&Value::Number(2.0)));
        ctx.pop_scope();
        assert_eq!(ctx.get("x"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn pop_scope_never_removes_the_global_scope() {
        let mut ctx = Context::new();
        ctx.pop_scope();
        ctx.set_global("x", Value::Bool(true));
        assert_eq!(ctx.get("x"), Some(&Value::Bool(true)));
    }

    #[test]
    fn snapshot_flattens_scopes_with_inner_taking_precedence() {
        let mut ctx = Context::new();
        ctx.set_global("a", Value::Number(1.0));
        ctx.push_scope();
        ctx.bind_local("a", Value::Number(2.0));
        ctx.bind_local("b", Value::Number(3.0));
        let snap = ctx.snapshot();
        assert_eq!(snap.get("a"), Some(&Value::Number(2.0)));
        assert_eq!(snap.get("b"), Some(&Value::Number(3.0)));
    }
}
