//! Phase 6: Writer Dispatcher and Writers (`spec.md` §4.6). The largest
//! phase in the pipeline (~35% of the source per `spec.md` §2).

pub mod free;
pub mod markup;
pub mod multimedia;
pub mod serialize;
pub mod truncate;

use crate::error::CompileError;
use crate::ir::{IrElement, IrNode};

pub use multimedia::{MediaPayload, Position, PositionalContentMultiMedia};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// `spec.md` §9 Open Question: no BOM, `\n` line endings by default, but
/// configurable (see `SPEC_FULL.md` §11.1).
#[derive(Debug, Clone, Copy)]
pub struct CsvDialect {
    pub bom: bool,
    pub line_ending: LineEnding,
}

impl Default for CsvDialect {
    fn default() -> Self {
        Self {
            bom: false,
            line_ending: LineEnding::Lf,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncateFrom {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub trim: bool,
    pub pretty_print: bool,
    pub html_indent: usize,
    pub csv_dialect: CsvDialect,
    pub tokenizer_model: String,
    pub truncate_marker: String,
    pub truncate_from: TruncateFrom,
    pub markdown_table_collapse: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            trim: false,
            pretty_print: false,
            html_indent: 2,
            csv_dialect: CsvDialect::default(),
            tokenizer_model: crate::tokenizer::DEFAULT_MODEL.to_string(),
            truncate_marker: " (...truncated)".to_string(),
            truncate_from: TruncateFrom::End,
            markdown_table_collapse: false,
        }
    }
}

/// {originalStart?, originalEnd?, irStart, irEnd, outStart, outEnd}
/// (`spec.md` §3). `ir_start`/`ir_end` reuse the element's source-span
/// back-reference: the IR carries no separate addressing scheme of its own,
/// so the tightest-covering-mapping rule in §4.8 operates on the same
/// coordinate space as `original_start`/`original_end` (see `DESIGN.md`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingNode {
    pub original_start: Option<usize>,
    pub original_end: Option<usize>,
    pub ir_start: usize,
    pub ir_end: usize,
    pub out_start: usize,
    pub out_end: usize,
}

impl MappingNode {
    pub fn from_element(el: &IrElement, out_start: usize, out_end: usize) -> Self {
        let ir_start = el.original_start_index.unwrap_or(out_start);
        let ir_end = el.original_end_index.unwrap_or(out_end);
        Self {
            original_start: el.original_start_index,
            original_end: el.original_end_index,
            ir_start,
            ir_end,
            out_start,
            out_end,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WriteResult {
    pub output: String,
    pub mappings: Vec<MappingNode>,
    pub multimedia: Vec<PositionalContentMultiMedia>,
}

impl WriteResult {
    pub fn text(s: impl Into<String>) -> Self {
        Self {
            output: s.into(),
            mappings: Vec::new(),
            multimedia: Vec::new(),
        }
    }

    pub fn append(&mut self, mut other: WriteResult) {
        let offset = self.output.len();
        self.output.push_str(&other.output);
        for m in &mut other.mappings {
            m.out_start += offset;
            m.out_end += offset;
        }
        for m in &mut other.multimedia {
            m.index += offset;
        }
        self.mappings.extend(other.mappings);
        self.multimedia.extend(other.multimedia);
    }
}

/// Common interface every writer implements (`spec.md` §4.6:
/// `writeElementTree(element) -> { output, mappings, multimedia }`).
pub trait Writer {
    fn write_element_tree(
        &self,
        element: &IrElement,
        opts: &WriteOptions,
        errors: &mut Vec<CompileError>,
    ) -> WriteResult;
}

/// Root dispatcher: examine an `env` node's `presentation` attribute and
/// pick a writer. Nested environments with a differing language are
/// rendered through the dispatcher and then treated as opaque text by the
/// parent (`spec.md` §4.6).
pub fn write_env(env: &IrElement, opts: &WriteOptions, errors: &mut Vec<CompileError>) -> WriteResult {
    let mut reduced = IrNode::Element(env.clone());
    truncate::reduce_tree(&mut reduced, opts);
    let IrNode::Element(reduced_env) = &reduced else {
        unreachable!("reduce_tree preserves the Element variant")
    };

    let presentation = reduced_env.attrs.get_str("presentation").unwrap_or("markup");
    let result = match presentation {
        "markup" => markup::write(reduced_env, opts, errors),
        "serialize" => serialize::write(reduced_env, opts, errors),
        "free" => free::write(reduced_env, opts, errors),
        "multimedia" => multimedia::write(reduced_env, opts, errors),
        other => {
            errors.push(CompileError::write(
                format!("unknown env presentation '{}'", other),
                None,
            ));
            WriteResult::default()
        }
    };
    truncate::apply_limits(reduced_env, result, opts, errors)
}

/// Render any IR node through the dispatcher, used by writers that embed a
/// nested `env` (e.g. `<toolresponse>` children, `<obj>` fields written as
/// rich content).
pub fn write_node(node: &IrNode, opts: &WriteOptions, errors: &mut Vec<CompileError>) -> WriteResult {
    match node {
        IrNode::Element(el) if el.tag == crate::ir::IrTag::Env => write_env(el, opts, errors),
        IrNode::Element(el) => markup::markdown::write_generic_as_markdown(el, opts, errors),
        IrNode::Text(t) => WriteResult::text(t.text.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IrTag, IrText};
    use crate::span::Span;
    use crate::value::Value;

    fn text(s: &str) -> IrNode {
        IrNode::Text(IrText { text: s.to_string(), span: Span::empty_at(0) })
    }

    #[test]
    fn write_env_dispatches_on_the_presentation_attribute() {
        let mut env = IrElement::new(IrTag::Env);
        env.attrs.set("presentation", Value::String("free".to_string()));
        env.children.push(text("verbatim"));
        let mut errors = Vec::new();
        let result = write_env(&env, &WriteOptions::default(), &mut errors);
        assert_eq!(result.output, "verbatim");
        assert!(errors.is_empty());
    }

    #[test]
    fn write_env_defaults_to_markup_presentation() {
        let mut p = IrElement::new(IrTag::P);
        p.children.push(text("hi"));
        let mut env = IrElement::new(IrTag::Env);
        env.children.push(IrNode::Element(p));
        let mut errors = Vec::new();
        let result = write_env(&env, &WriteOptions::default(), &mut errors);
        assert_eq!(result.output, "hi");
    }

    #[test]
    fn write_env_rejects_an_unknown_presentation() {
        let mut env = IrElement::new(IrTag::Env);
        env.attrs.set("presentation", Value::String("bogus".to_string()));
        let mut errors = Vec::new();
        write_env(&env, &WriteOptions::default(), &mut errors);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn mapping_node_from_element_falls_back_to_output_offsets_without_a_source_span() {
        let el = IrElement::new(IrTag::P);
        let m = MappingNode::from_element(&el, 3, 7);
        assert_eq!(m.original_start, None);
        assert_eq!(m.ir_start, 3);
        assert_eq!(m.ir_end, 7);
    }

    #[test]
    fn write_result_append_shifts_the_appended_mappings_and_multimedia() {
        let mut first = WriteResult::text("AB");
        let mut second = WriteResult::text("CD");
        second.mappings.push(MappingNode {
            original_start: Some(0),
            original_end: Some(2),
            ir_start: 0,
            ir_end: 2,
            out_start: 0,
            out_end: 2,
        });
        first.append(second);
        assert_eq!(first.output, "ABCD");
        assert_eq!(first.mappings[0].out_start, 2);
        assert_eq!(first.mappings[0].out_end, 4);
    }
}
