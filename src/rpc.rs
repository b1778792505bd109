//! Preview RPC data shapes (`spec.md` §6). Types only — no transport; an
//! editor collaborator is expected to speak these shapes over whatever
//! channel it already has (LSP, a custom socket, ...).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayFormat {
    Rendered,
    Plain,
    Ir,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnTokenCounts {
    pub model: String,
}

/// `poml/preview` request params.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewParams {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub speaker_mode: bool,
    pub display_format: DisplayFormat,
    #[serde(default)]
    pub contexts: Vec<PathBuf>,
    #[serde(default)]
    pub stylesheets: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_context: Option<JsonValue>,
    #[serde(default)]
    pub return_all_errors: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_token_counts: Option<ReturnTokenCounts>,
}

/// `poml/preview` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ir: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_map: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
