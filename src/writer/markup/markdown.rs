//! Markdown writer — the central writer (`spec.md` §4.6). Implements the
//! box model: concatenation consolidates adjacent whitespace by eliminating
//! the longest common overlap, and drops whitespace-only boxes sandwiched
//! between block elements.

use crate::error::CompileError;
use crate::ir::{IrElement, IrNode, IrTag};

use super::table::extract_table;
use super::{ElementBox, Layout};
use crate::writer::{MappingNode, WriteOptions, WriteResult};

pub fn write(env: &IrElement, opts: &WriteOptions, errors: &mut Vec<CompileError>) -> WriteResult {
    let boxes: Vec<ElementBox> = env
        .children
        .iter()
        .map(|c| render_node(c, 1, opts, errors))
        .collect();
    concat_boxes(boxes).into_result()
}

/// Used by the top-level writer dispatcher when a nested `env` differs in
/// language from its parent and must be treated as opaque markdown text
/// (`spec.md` §4.6), and by the JSON/YAML/serialize writers when they embed
/// rich content that still needs markdown rendering (tool responses).
pub fn write_generic_as_markdown(
    el: &IrElement,
    opts: &WriteOptions,
    errors: &mut Vec<CompileError>,
) -> WriteResult {
    render_node(&IrNode::Element(el.clone()), 1, opts, errors).into_result()
}

fn render_node(node: &IrNode, heading_base: u32, opts: &WriteOptions, errors: &mut Vec<CompileError>) -> ElementBox {
    match node {
        IrNode::Text(t) => {
            let mut b = ElementBox::inline(t.text.clone());
            b.mappings.push(MappingNode {
                original_start: Some(t.span.start),
                original_end: Some(t.span.end),
                ir_start: t.span.start,
                ir_end: t.span.end,
                out_start: 0,
                out_end: t.text.len(),
            });
            b
        }
        IrNode::Element(el) => render_element(el, heading_base, opts, errors),
    }
}

fn render_children_inline(el: &IrElement, heading_base: u32, opts: &WriteOptions, errors: &mut Vec<CompileError>) -> ElementBox {
    let boxes: Vec<ElementBox> = el
        .children
        .iter()
        .map(|c| render_node(c, heading_base, opts, errors))
        .collect();
    let mut merged = concat_boxes(boxes);
    merged.priority = el.priority();
    merged
}

fn render_element(el: &IrElement, heading_base: u32, opts: &WriteOptions, errors: &mut Vec<CompileError>) -> ElementBox {
    match el.tag {
        IrTag::Env => {
            let lang = el.attrs.get_str("markup-lang").unwrap_or("markdown");
            if lang != "markdown" {
                return ElementBox::block(super::write(el, opts, errors).output);
            }
            let mut b = render_children_inline(el, heading_base, opts, errors);
            b.layout = Layout::Block;
            b
        }
        IrTag::P => {
            let mut b = render_children_inline(el, heading_base, opts, errors);
            b.layout = Layout::Block;
            with_span(b, el, opts)
        }
        IrTag::H => {
            let level = el.attrs.get_number("level").unwrap_or(1.0) as u32 + heading_base - 1;
            let hashes = "#".repeat(level.clamp(1, 6) as usize);
            let inner = render_children_inline(el, heading_base, opts, errors);
            let b = ElementBox::block(format!("{} {}", hashes, inner.text));
            with_span(b.clone_with_mappings(&inner), el, opts)
        }
        IrTag::Span => with_span(render_children_inline(el, heading_base, opts, errors), el, opts),
        IrTag::Nl => {
            let mut b = ElementBox::inline("");
            b.layout = Layout::Newline;
            b
        }
        IrTag::B => wrap_inline(el, heading_base, opts, errors, "**", "**"),
        IrTag::I => wrap_inline(el, heading_base, opts, errors, "*", "*"),
        IrTag::S => wrap_inline(el, heading_base, opts, errors, "~~", "~~"),
        IrTag::U => wrap_inline(el, heading_base, opts, errors, "__", "__"),
        IrTag::Code => render_code(el, heading_base, opts, errors),
        IrTag::List => render_list(el, heading_base, opts, errors),
        IrTag::Table | IrTag::Thead | IrTag::Tbody | IrTag::Trow | IrTag::Tcell => {
            render_table(el, opts, errors)
        }
        IrTag::Item => with_span(render_children_inline(el, heading_base, opts, errors), el, opts),
        IrTag::Img | IrTag::Audio | IrTag::ToolRequest | IrTag::ToolResponse => {
            let result = crate::writer::multimedia::write(
                &IrElement::new(IrTag::Env).with_children(vec![IrNode::Element(el.clone())]),
                opts,
                errors,
            );
            let mut b = ElementBox::inline(result.output);
            b.multimedia = result.multimedia;
            b
        }
        IrTag::Any | IrTag::Obj => with_span(render_children_inline(el, heading_base, opts, errors), el, opts),
        IrTag::Text => render_children_inline(el, heading_base, opts, errors),
    }
}

impl ElementBox {
    fn clone_with_mappings(&self, other: &ElementBox) -> ElementBox {
        let mut b = self.clone();
        b.mappings = other.mappings.clone();
        b.multimedia = other.multimedia.clone();
        b
    }
}

fn with_span(mut b: ElementBox, el: &IrElement, opts: &WriteOptions) -> ElementBox {
    b.text = crate::writer::truncate::apply_element_limits(el, b.text, opts);
    if let (Some(start), Some(end)) = (el.original_start_index, el.original_end_index) {
        b.mappings.push(MappingNode {
            original_start: Some(start),
            original_end: Some(end),
            ir_start: start,
            ir_end: end,
            out_start: 0,
            out_end: b.text.len(),
        });
    }
    b.priority = el.priority();
    b
}

fn wrap_inline(
    el: &IrElement,
    heading_base: u32,
    opts: &WriteOptions,
    errors: &mut Vec<CompileError>,
    open: &str,
    close: &str,
) -> ElementBox {
    let inner = render_children_inline(el, heading_base, opts, errors);
    let mut b = ElementBox::inline(format!("{}{}{}", open, inner.text, close));
    b.mappings = inner.mappings;
    b.multimedia = inner.multimedia;
    with_span(b, el, opts)
}

fn render_code(el: &IrElement, heading_base: u32, opts: &WriteOptions, errors: &mut Vec<CompileError>) -> ElementBox {
    let inner = render_children_inline(el, heading_base, opts, errors);
    let inline = el.attrs.get("inline").map(|v| v.is_truthy()).unwrap_or(true);
    if inline {
        with_span(ElementBox::inline(format!("`{}`", inner.text)), el, opts)
    } else {
        let lang = el.attrs.get_str("lang").unwrap_or("");
        with_span(ElementBox::block(format!("```{}\n{}\n```", lang, inner.text)), el, opts)
    }
}

const BULLET_STYLES: &[(&str, &str)] = &[
    ("star", "* "),
    ("dash", "- "),
    ("plus", "+ "),
    ("decimal", ""),
    ("latin", ""),
];

fn render_list(el: &IrElement, heading_base: u32, opts: &WriteOptions, errors: &mut Vec<CompileError>) -> ElementBox {
    let style = el.attrs.get_str("style").unwrap_or("dash");
    let mut lines = Vec::new();
    let mut index = 1usize;
    for child in &el.children {
        let IrNode::Element(item) = child else { continue };
        if item.tag != IrTag::Item {
            continue;
        }
        let inner = render_children_inline(item, heading_base, opts, errors);
        let bullet = match style {
            "decimal" => format!("{}. ", index),
            "latin" => format!("{}. ", latin_label(index)),
            _ => BULLET_STYLES
                .iter()
                .find(|(name, _)| *name == style)
                .map(|(_, b)| b.to_string())
                .unwrap_or_else(|| "- ".to_string()),
        };
        let indent = " ".repeat(bullet.len());
        let continuation = inner.text.replace('\n', &format!("\n{}", indent));
        lines.push(format!("{}{}", bullet, continuation));
        index += 1;
    }
    with_span(ElementBox::block(lines.join("\n")), el, opts)
}

fn latin_label(index: usize) -> String {
    let n = (index.saturating_sub(1)) % 26;
    ((b'a' + n as u8) as char).to_string()
}

fn render_table(el: &IrElement, opts: &WriteOptions, errors: &mut Vec<CompileError>) -> ElementBox {
    let table_el = if el.tag == IrTag::Table {
        el
    } else {
        errors.push(CompileError::write(
            format!("'{}' rendered outside a <table>", el.tag.as_str()),
            None,
        ));
        return ElementBox::block(String::new());
    };
    let Some(table) = extract_table(table_el) else {
        errors.push(CompileError::write("malformed <table> structure", None));
        return ElementBox::block(String::new());
    };

    let columns = table.header.len().max(table.rows.iter().map(|r| r.len()).max().unwrap_or(0));
    let mut widths = vec![1usize; columns];
    for (i, cell) in table.header.iter().enumerate() {
        widths[i] = widths[i].max(cell.chars().count());
    }
    if !opts.markdown_table_collapse {
        for row in &table.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let pad = |s: &str, w: usize| -> String {
        if opts.markdown_table_collapse {
            s.to_string()
        } else {
            format!("{:<width$}", s, width = w)
        }
    };

    let mut lines = Vec::new();
    let header_cells: Vec<String> = (0..columns)
        .map(|i| pad(table.header.get(i).map(String::as_str).unwrap_or(""), widths[i]))
        .collect();
    lines.push(format!("| {} |", header_cells.join(" | ")));
    let rule_cells: Vec<String> = widths.iter().map(|w| "-".repeat((*w).max(1))).collect();
    lines.push(format!("| {} |", rule_cells.join(" | ")));
    for row in &table.rows {
        let cells: Vec<String> = (0..columns)
            .map(|i| pad(row.get(i).map(String::as_str).unwrap_or(""), widths[i]))
            .collect();
        lines.push(format!("| {} |", cells.join(" | ")));
    }

    with_span(ElementBox::block(lines.join("\n")), table_el, opts)
}

/// `spec.md` §4.6: "Adjacent before/after are consolidated by eliminating
/// the longest common overlap"; whitespace-only boxes sandwiched between
/// block elements are dropped.
pub fn concat_boxes(boxes: Vec<ElementBox>) -> ElementBox {
    let boxes = drop_sandwiched_whitespace(boxes);
    let mut out = String::new();
    let mut mappings = Vec::new();
    let mut multimedia = Vec::new();
    let mut prev_layout: Option<Layout> = None;

    for b in boxes {
        if let Some(prev) = prev_layout {
            let sep = layout_separator(prev, b.layout);
            append_overlap(&mut out, sep);
        }
        append_overlap(&mut out, &b.before_ws);
        let text_start = out.len();
        out.push_str(&b.text);
        for mut m in b.mappings {
            m.out_start += text_start;
            m.out_end += text_start;
            mappings.push(m);
        }
        for mut m in b.multimedia {
            m.index += text_start;
            multimedia.push(m);
        }
        out.push_str(&b.after_ws);
        prev_layout = Some(b.layout);
    }

    ElementBox {
        text: out,
        before_ws: String::new(),
        after_ws: String::new(),
        mappings,
        multimedia,
        priority: None,
        layout: Layout::Block,
    }
}

fn layout_separator(a: Layout, b: Layout) -> &'static str {
    use Layout::*;
    match (a, b) {
        (Block, _) | (_, Block) => "\n\n",
        (Newline, _) | (_, Newline) => "\n",
        _ => "",
    }
}

fn append_overlap(out: &mut String, addition: &str) {
    if addition.is_empty() {
        return;
    }
    let max_overlap = addition.len().min(out.len());
    let mut overlap = 0;
    for k in (1..=max_overlap).rev() {
        if out.ends_with(&addition[..k]) {
            overlap = k;
            break;
        }
    }
    out.push_str(&addition[overlap..]);
}

fn drop_sandwiched_whitespace(boxes: Vec<ElementBox>) -> Vec<ElementBox> {
    let mut out = Vec::with_capacity(boxes.len());
    for (i, b) in boxes.iter().enumerate() {
        let is_blank = b.text.trim().is_empty() && b.before_ws.is_empty() && b.after_ws.is_empty();
        if is_blank {
            let prev_block = i > 0 && boxes[i - 1].layout == Layout::Block;
            let next_block = i + 1 < boxes.len() && boxes[i + 1].layout == Layout::Block;
            if prev_block || next_block {
                continue;
            }
        }
        out.push(b.clone());
    }
    out
}
