//! `markup` presentation: Markdown (default), HTML, CSV, TSV (`spec.md`
//! §4.6). Shares a box model between Markdown and HTML rendering and a
//! table-extraction helper between the two table-only writers.

pub mod csv;
pub mod html;
pub mod markdown;
pub mod table;

use crate::error::CompileError;
use crate::ir::IrElement;

use super::{WriteOptions, WriteResult};

/// The markdown writer's rendering unit (`spec.md` GLOSSARY: "Box"). Every
/// visited element returns one; concatenation rules live in `markdown`.
#[derive(Debug, Clone)]
pub struct ElementBox {
    pub text: String,
    pub before_ws: String,
    pub after_ws: String,
    pub mappings: Vec<super::MappingNode>,
    pub multimedia: Vec<super::PositionalContentMultiMedia>,
    pub priority: Option<f64>,
    pub layout: Layout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Block,
    Newline,
    Inline,
}

impl ElementBox {
    pub fn inline(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            before_ws: String::new(),
            after_ws: String::new(),
            mappings: Vec::new(),
            multimedia: Vec::new(),
            priority: None,
            layout: Layout::Inline,
        }
    }

    pub fn block(text: impl Into<String>) -> Self {
        Self {
            layout: Layout::Block,
            ..Self::inline(text)
        }
    }

    pub fn into_result(self) -> WriteResult {
        WriteResult {
            output: self.text,
            mappings: self.mappings,
            multimedia: self.multimedia,
        }
    }
}

pub fn write(env: &IrElement, opts: &WriteOptions, errors: &mut Vec<CompileError>) -> WriteResult {
    match env.attrs.get_str("markup-lang").unwrap_or("markdown") {
        "html" => html::write(env, opts, errors),
        "csv" => csv::write(env, opts, errors, ','),
        "tsv" => csv::write(env, opts, errors, '\t'),
        _ => markdown::write(env, opts, errors),
    }
}
