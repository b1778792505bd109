//! `<meta type="responseSchema|tool|runtime">` parsing (`spec.md` §2 item
//! 10, §6 Preview RPC `responseSchema`/`tools`/`runtime` fields).
//!
//! The distilled spec names the three meta kinds but not their exact child
//! syntax; this module resolves that ambiguity the same way the reader
//! resolves other open questions — documented in `DESIGN.md` §Open
//! Questions rather than guessed silently. Each kind carries a `name` and
//! optional `description` attribute plus a JSON-valued attribute
//! (`schema` / `parameters`) holding the OpenAPI-shaped payload, parsed with
//! the JSON-with-buffers parser so binary defaults can round-trip.

use serde::{Deserialize, Serialize};

use crate::value::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSchema {
    pub name: Option<String>,
    pub description: Option<String>,
    pub schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: Option<String>,
    pub parameters: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeParams(pub std::collections::BTreeMap<String, Value>);

/// Accumulates everything discovered across a compile's `<meta>` blocks.
#[derive(Debug, Clone, Default)]
pub struct SchemaInfo {
    pub response_schema: Option<ResponseSchema>,
    pub tools: Vec<ToolDefinition>,
    pub runtime: RuntimeParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_info_defaults_to_empty() {
        let info = SchemaInfo::default();
        assert!(info.response_schema.is_none());
        assert!(info.tools.is_empty());
        assert!(info.runtime.0.is_empty());
    }

    #[test]
    fn tool_definition_round_trips_through_json() {
        let tool = ToolDefinition {
            name: "search".to_string(),
            description: Some("looks things up".to_string()),
            parameters: Value::Object(Default::default()),
        };
        let json = serde_json::to_string(&tool).unwrap();
        let back: ToolDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "search");
        assert_eq!(back.description.as_deref(), Some("looks things up"));
    }

    #[test]
    fn runtime_params_keeps_attributes_by_key() {
        let mut runtime = RuntimeParams::default();
        runtime.0.insert("model".to_string(), Value::String("gpt".to_string()));
        assert_eq!(runtime.0.get("model"), Some(&Value::String("gpt".to_string())));
    }
}
