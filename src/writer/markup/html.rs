//! HTML writer: builds a DOM-shaped string with `h1..h6`, `pre/code`,
//! `ul/ol/li`, `table/thead/tbody/tr/th/td`, `br`, and verbatim tag names
//! for generic elements; pretty-prints with a configurable indent
//! (`spec.md` §4.6).

use crate::error::CompileError;
use crate::ir::{IrElement, IrNode, IrTag};

use super::table::extract_table;
use crate::writer::{MappingNode, WriteOptions, WriteResult};

pub fn write(env: &IrElement, opts: &WriteOptions, errors: &mut Vec<CompileError>) -> WriteResult {
    let mut out = String::new();
    let mut mappings = Vec::new();
    let mut multimedia = Vec::new();
    for child in &env.children {
        render_node(child, 0, opts, errors, &mut out, &mut mappings, &mut multimedia);
    }
    WriteResult { output: out, mappings, multimedia }
}

fn indent(depth: usize, opts: &WriteOptions) -> String {
    if opts.pretty_print {
        " ".repeat(depth * opts.html_indent)
    } else {
        String::new()
    }
}

fn newline(opts: &WriteOptions) -> &'static str {
    if opts.pretty_print { "\n" } else { "" }
}

fn render_node(
    node: &IrNode,
    depth: usize,
    opts: &WriteOptions,
    errors: &mut Vec<CompileError>,
    out: &mut String,
    mappings: &mut Vec<MappingNode>,
    multimedia: &mut Vec<crate::writer::PositionalContentMultiMedia>,
) {
    match node {
        IrNode::Text(t) => out.push_str(&escape(&t.text)),
        IrNode::Element(el) => render_element(el, depth, opts, errors, out, mappings, multimedia),
    }
}

fn render_children(
    el: &IrElement,
    depth: usize,
    opts: &WriteOptions,
    errors: &mut Vec<CompileError>,
    out: &mut String,
    mappings: &mut Vec<MappingNode>,
    multimedia: &mut Vec<crate::writer::PositionalContentMultiMedia>,
) {
    for child in &el.children {
        render_node(child, depth, opts, errors, out, mappings, multimedia);
    }
}

fn wrap(
    tag: &str,
    el: &IrElement,
    depth: usize,
    opts: &WriteOptions,
    errors: &mut Vec<CompileError>,
    out: &mut String,
    mappings: &mut Vec<MappingNode>,
    multimedia: &mut Vec<crate::writer::PositionalContentMultiMedia>,
) {
    let start = out.len();
    out.push_str(&format!("<{}>", tag));
    render_children(el, depth, opts, errors, out, mappings, multimedia);
    out.push_str(&format!("</{}>", tag));
    if let (Some(os), Some(oe)) = (el.original_start_index, el.original_end_index) {
        mappings.push(MappingNode {
            original_start: Some(os),
            original_end: Some(oe),
            ir_start: os,
            ir_end: oe,
            out_start: start,
            out_end: out.len(),
        });
    }
}

fn render_element(
    el: &IrElement,
    depth: usize,
    opts: &WriteOptions,
    errors: &mut Vec<CompileError>,
    out: &mut String,
    mappings: &mut Vec<MappingNode>,
    multimedia: &mut Vec<crate::writer::PositionalContentMultiMedia>,
) {
    match el.tag {
        IrTag::Env => render_children(el, depth, opts, errors, out, mappings, multimedia),
        IrTag::P => wrap("p", el, depth, opts, errors, out, mappings, multimedia),
        IrTag::H => {
            let level = (el.attrs.get_number("level").unwrap_or(1.0) as u32).clamp(1, 6);
            wrap(&format!("h{}", level), el, depth, opts, errors, out, mappings, multimedia);
        }
        IrTag::Span => wrap("span", el, depth, opts, errors, out, mappings, multimedia),
        IrTag::Nl => out.push_str("<br/>"),
        IrTag::B => wrap("strong", el, depth, opts, errors, out, mappings, multimedia),
        IrTag::I => wrap("em", el, depth, opts, errors, out, mappings, multimedia),
        IrTag::S => wrap("s", el, depth, opts, errors, out, mappings, multimedia),
        IrTag::U => wrap("u", el, depth, opts, errors, out, mappings, multimedia),
        IrTag::Code => {
            let inline = el.attrs.get("inline").map(|v| v.is_truthy()).unwrap_or(true);
            if inline {
                wrap("code", el, depth, opts, errors, out, mappings, multimedia);
            } else {
                out.push_str("<pre><code>");
                render_children(el, depth, opts, errors, out, mappings, multimedia);
                out.push_str("</code></pre>");
            }
        }
        IrTag::List => {
            let ordered = el.attrs.get_str("style") == Some("decimal");
            let tag = if ordered { "ol" } else { "ul" };
            out.push_str(&format!("<{}>{}", tag, newline(opts)));
            for child in &el.children {
                if let IrNode::Element(item) = child {
                    if item.tag == IrTag::Item {
                        out.push_str(&indent(depth + 1, opts));
                        wrap("li", item, depth + 1, opts, errors, out, mappings, multimedia);
                        out.push_str(newline(opts));
                    }
                }
            }
            out.push_str(&indent(depth, opts));
            out.push_str(&format!("</{}>", tag));
        }
        IrTag::Item => render_children(el, depth, opts, errors, out, mappings, multimedia),
        IrTag::Table => render_table(el, depth, opts, errors, out, mappings, multimedia),
        IrTag::Thead | IrTag::Tbody | IrTag::Trow | IrTag::Tcell => {
            errors.push(CompileError::write(
                format!("'{}' rendered outside a <table>", el.tag.as_str()),
                None,
            ));
        }
        IrTag::Any | IrTag::Obj => render_children(el, depth, opts, errors, out, mappings, multimedia),
        IrTag::Img | IrTag::Audio | IrTag::ToolRequest | IrTag::ToolResponse => {
            let env = IrElement::new(IrTag::Env).with_children(vec![IrNode::Element(el.clone())]);
            let result = crate::writer::multimedia::write(&env, opts, errors);
            out.push_str(&result.output);
            multimedia.extend(result.multimedia);
        }
        IrTag::Text => render_children(el, depth, opts, errors, out, mappings, multimedia),
    }
}

fn render_table(
    el: &IrElement,
    _depth: usize,
    _opts: &WriteOptions,
    errors: &mut Vec<CompileError>,
    out: &mut String,
    _mappings: &mut Vec<MappingNode>,
    _multimedia: &mut Vec<crate::writer::PositionalContentMultiMedia>,
) {
    let Some(table) = extract_table(el) else {
        errors.push(CompileError::write("malformed <table> structure", None));
        return;
    };
    out.push_str("<table>");
    if !table.header.is_empty() {
        out.push_str("<thead><tr>");
        for cell in &table.header {
            out.push_str(&format!("<th>{}</th>", escape(cell)));
        }
        out.push_str("</tr></thead>");
    }
    out.push_str("<tbody>");
    for row in &table.rows {
        out.push_str("<tr>");
        for cell in row {
            out.push_str(&format!("<td>{}</td>", escape(cell)));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;
    use crate::value::Value;

    fn text(s: &str) -> IrNode {
        IrNode::Text(crate::ir::IrText { text: s.to_string(), span: Span::empty_at(0) })
    }

    fn env(children: Vec<IrNode>) -> IrElement {
        let mut el = IrElement::new(IrTag::Env);
        el.children = children;
        el
    }

    #[test]
    fn paragraph_wraps_in_p_tags() {
        let mut p = IrElement::new(IrTag::P);
        p.children.push(text("Hello"));
        let root = env(vec![IrNode::Element(p)]);
        let mut errors = Vec::new();
        let result = write(&root, &WriteOptions::default(), &mut errors);
        assert_eq!(result.output, "<p>Hello</p>");
    }

    #[test]
    fn heading_level_picks_the_matching_hn_tag() {
        let mut h = IrElement::new(IrTag::H);
        h.attrs.set("level", Value::Number(2.0));
        h.children.push(text("Title"));
        let root = env(vec![IrNode::Element(h)]);
        let mut errors = Vec::new();
        let result = write(&root, &WriteOptions::default(), &mut errors);
        assert_eq!(result.output, "<h2>Title</h2>");
    }

    #[test]
    fn ordered_list_style_picks_ol() {
        let mut item = IrElement::new(IrTag::Item);
        item.children.push(text("one"));
        let mut list = IrElement::new(IrTag::List);
        list.attrs.set("style", Value::String("decimal".to_string()));
        list.children.push(IrNode::Element(item));
        let root = env(vec![IrNode::Element(list)]);
        let mut errors = Vec::new();
        let result = write(&root, &WriteOptions::default(), &mut errors);
        assert_eq!(result.output, "<ol><li>one</li></ol>");
    }

    #[test]
    fn text_content_is_escaped() {
        let mut p = IrElement::new(IrTag::P);
        p.children.push(text("<script>&"));
        let root = env(vec![IrNode::Element(p)]);
        let mut errors = Vec::new();
        let result = write(&root, &WriteOptions::default(), &mut errors);
        assert_eq!(result.output, "<p>&lt;script&gt;&amp;</p>");
    }

    #[test]
    fn table_cell_outside_a_table_is_an_error() {
        let root = env(vec![IrNode::Element(IrElement::new(IrTag::Tcell))]);
        let mut errors = Vec::new();
        write(&root, &WriteOptions::default(), &mut errors);
        assert_eq!(errors.len(), 1);
    }
}
