//! Trace file format (`spec.md` §6: "when `--trace-dir` is set, each compile
//! writes `{id}.trace.json`"). Written next to the rendered pretty output.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::value::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceFile {
    pub input: String,
    pub context: JsonValue,
    pub stylesheet: JsonValue,
    pub source_path: Option<PathBuf>,
    pub result: JsonValue,
    pub pretty_output: String,
}

impl TraceFile {
    pub fn new(
        input: impl Into<String>,
        context: &Value,
        stylesheet: &Value,
        source_path: Option<PathBuf>,
        result: &Value,
        pretty_output: impl Into<String>,
    ) -> Self {
        Self {
            input: input.into(),
            context: context.to_json(),
            stylesheet: stylesheet.to_json(),
            source_path,
            result: result.to_json(),
            pretty_output: pretty_output.into(),
        }
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// File name for this trace, `{id}.trace.json` under `dir`.
    pub fn path_for(dir: &Path, id: &str) -> PathBuf {
        dir.join(format!("{}.trace.json", id))
    }
}
