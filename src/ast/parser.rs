//! Recursive-descent-over-tokens parser building the AST, with unbalanced
//! tag recovery and the synthetic `<poml>` wrap from `spec.md` §4.1.

use crate::ast::lexer::{Lexer, Token};
use crate::ast::{Attribute, CommentNode, Element, Node, TextNode};
use crate::error::CompileError;
use crate::span::Span;

pub struct ParseResult {
    pub root: Node,
    pub errors: Vec<CompileError>,
    /// Whether the parser had to synthesize a `<poml>` wrapper around the
    /// document (`spec.md` §4.1).
    pub wrapped: bool,
}

struct OpenFrame {
    tag: String,
    raw_tag: String,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
    open_name_span: Span,
    tag_start: usize,
    self_closing: bool,
}

/// Parse `src` into an AST, applying the free-text tolerance rules.
pub fn parse(src: &str) -> ParseResult {
    let normalized = normalize_crlf(src);
    let (mut top_level, mut errors) = parse_raw(&normalized);

    let starts_with_poml = normalized
        .trim_start()
        .to_lowercase()
        .starts_with("<poml");

    if starts_with_poml {
        let root = single_root_or_fragment(top_level, &normalized);
        return ParseResult {
            root,
            errors,
            wrapped: false,
        };
    }

    let non_trivial_count = top_level.iter().filter(|n| !n.is_trivial()).count();
    let single_valid_root = non_trivial_count == 1
        && errors.is_empty()
        && top_level.iter().find(|n| !n.is_trivial()).unwrap().as_element().is_some();

    if single_valid_root {
        let root = single_root_or_fragment(top_level, &normalized);
        return ParseResult {
            root,
            errors,
            wrapped: false,
        };
    }

    // Needs a synthetic wrapper: "invalid XML" if lexing/parsing produced
    // errors, otherwise "mixed root" (multiple valid top-level nodes).
    let invalid_xml_case = !errors.is_empty();
    let syntax = if invalid_xml_case { "text" } else { "markdown" };
    errors.push(CompileError::warning(
        format!(
            "document does not have a single <poml> root; wrapped as syntax=\"{}\"",
            syntax
        ),
        None,
        None,
    ));

    let mut attributes = vec![attr("syntax", syntax)];
    if invalid_xml_case {
        attributes.push(attr("whiteSpace", "pre"));
    }

    let span = Span::new(0, normalized.len());
    let wrapper = Element {
        tag: "poml".to_string(),
        raw_tag: "poml".to_string(),
        attributes,
        children: std::mem::take(&mut top_level),
        open_name_span: Span::empty_at(0),
        close_name_span: None,
        self_closing: false,
        span,
    };

    ParseResult {
        root: Node::Element(wrapper),
        errors,
        wrapped: true,
    }
}

fn attr(name: &str, value: &str) -> Attribute {
    Attribute {
        name: name.to_string(),
        value: value.to_string(),
        name_span: Span::empty_at(0),
        value_span: Span::empty_at(0),
    }
}

fn normalize_crlf(src: &str) -> String {
    if src.contains('\r') {
        src.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        src.to_string()
    }
}

/// If there is exactly one top-level element, return it directly (becomes
/// the document root); otherwise synthesize a minimal container so callers
/// always get a single `Node` back. This only runs when no wrap was needed,
/// so it only fires for the single-non-trivial-element / single-node cases.
fn single_root_or_fragment(mut nodes: Vec<Node>, src: &str) -> Node {
    if nodes.len() == 1 {
        return nodes.pop().unwrap();
    }
    let non_trivial: Vec<&Node> = nodes.iter().filter(|n| !n.is_trivial()).collect();
    if non_trivial.len() == 1 {
        if let Some(idx) = nodes.iter().position(|n| !n.is_trivial()) {
            return nodes.swap_remove(idx);
        }
    }
    Node::Element(Element {
        tag: "poml".to_string(),
        raw_tag: "poml".to_string(),
        attributes: Vec::new(),
        children: nodes,
        open_name_span: Span::empty_at(0),
        close_name_span: None,
        self_closing: false,
        span: Span::new(0, src.len()),
    })
}

/// Tokenize and build a flat forest of top-level nodes, recovering from
/// unbalanced tags by popping/ignoring mismatched frames.
fn parse_raw(src: &str) -> (Vec<Node>, Vec<CompileError>) {
    let mut lexer = Lexer::new(src);
    let mut stack: Vec<OpenFrame> = Vec::new();
    let mut top_level: Vec<Node> = Vec::new();
    let mut errors: Vec<CompileError> = Vec::new();

    // State used while scanning an opening tag's attribute list.
    let mut pending: Option<(String, String, Vec<Attribute>, Span, usize)> = None;

    loop {
        let tok = lexer.next_token();
        match tok {
            Token::Eof { pos } => {
                if pending.is_some() {
                    // Tag never closed with `>` or `/>`; drop it as an error.
                    errors.push(CompileError::warning(
                        "unterminated tag at end of document",
                        Some(Span::new(pos, pos)),
                        None,
                    ));
                }
                break;
            }
            Token::Text { raw, span } => {
                let node = Node::Text(TextNode { raw, span });
                push_child(&mut stack, &mut top_level, node);
            }
            Token::Comment { raw, span } => {
                let node = Node::Comment(CommentNode { raw, span });
                push_child(&mut stack, &mut top_level, node);
            }
            Token::TagOpenStart { name, span } => {
                pending = Some((name.clone(), name, Vec::new(), span, span.start));
            }
            Token::Attr {
                name,
                value,
                name_span,
                value_span,
            } => {
                if let Some((_, _, attrs, _, _)) = pending.as_mut() {
                    attrs.push(Attribute {
                        name,
                        value,
                        name_span,
                        value_span,
                    });
                }
            }
            Token::TagOpenEnd { .. } => {
                if let Some((tag, raw_tag, attrs, open_span, tag_start)) = pending.take() {
                    stack.push(OpenFrame {
                        tag,
                        raw_tag,
                        attributes: attrs,
                        children: Vec::new(),
                        open_name_span: open_span,
                        tag_start,
                        self_closing: false,
                    });
                }
            }
            Token::TagSelfClose { span } => {
                if let Some((tag, raw_tag, attrs, open_span, tag_start)) = pending.take() {
                    let element = Element {
                        tag,
                        raw_tag,
                        attributes: attrs,
                        children: Vec::new(),
                        open_name_span: open_span,
                        close_name_span: None,
                        self_closing: true,
                        span: Span::new(tag_start, span.end),
                    };
                    push_child(&mut stack, &mut top_level, Node::Element(element));
                }
            }
            Token::TagClose { name, span } => {
                close_tag(&mut stack, &mut top_level, &name, span, &mut errors);
            }
        }
    }

    // Close any frames still open at EOF.
    while let Some(frame) = stack.pop() {
        errors.push(CompileError::read(
            format!("unclosed tag <{}>", frame.raw_tag),
            Some(frame.open_name_span),
            None,
        ));
        let end = src.len();
        let element = Element {
            tag: frame.tag,
            raw_tag: frame.raw_tag,
            attributes: frame.attributes,
            children: frame.children,
            open_name_span: frame.open_name_span,
            close_name_span: None,
            self_closing: frame.self_closing,
            span: Span::new(frame.tag_start, end),
        };
        push_child(&mut stack, &mut top_level, Node::Element(element));
    }

    (top_level, errors)
}

fn push_child(stack: &mut [OpenFrame], top_level: &mut Vec<Node>, node: Node) {
    if let Some(top) = stack.last_mut() {
        top.children.push(node);
    } else {
        top_level.push(node);
    }
}

fn close_tag(
    stack: &mut Vec<OpenFrame>,
    top_level: &mut Vec<Node>,
    name: &str,
    close_span: Span,
    errors: &mut Vec<CompileError>,
) {
    if let Some(pos) = stack.iter().rposition(|f| f.tag == name) {
        // Pop and error on any frames above the match: they were never
        // closed, so their implicit end is where the mismatch was found.
        while stack.len() > pos + 1 {
            let frame = stack.pop().unwrap();
            errors.push(CompileError::read(
                format!(
                    "tag <{}> closed by mismatched </{}>",
                    frame.raw_tag, name
                ),
                Some(frame.open_name_span),
                None,
            ));
            let element = Element {
                tag: frame.tag,
                raw_tag: frame.raw_tag,
                attributes: frame.attributes,
                children: frame.children,
                open_name_span: frame.open_name_span,
                close_name_span: None,
                self_closing: frame.self_closing,
                span: Span::new(frame.tag_start, close_span.start),
            };
            push_child(stack, top_level, Node::Element(element));
        }
        let frame = stack.pop().unwrap();
        let element = Element {
            tag: frame.tag,
            raw_tag: frame.raw_tag,
            attributes: frame.attributes,
            children: frame.children,
            open_name_span: frame.open_name_span,
            close_name_span: Some(close_span),
            self_closing: frame.self_closing,
            span: Span::new(frame.tag_start, close_span.end),
        };
        push_child(stack, top_level, Node::Element(element));
    } else {
        errors.push(CompileError::warning(
            format!("stray closing tag </{}> with no matching open tag", name),
            Some(close_span),
            None,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_poml_root_is_returned_without_synthetic_wrapping() {
        let result = parse("<poml><p>hi</p></poml>");
        assert!(!result.wrapped);
        assert!(result.errors.is_empty());
        let root = result.root.as_element().unwrap();
        assert_eq!(root.tag, "poml");
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn a_single_non_poml_element_becomes_the_root_unwrapped() {
        let result = parse("<p>hi</p>");
        assert!(!result.wrapped);
        let root = result.root.as_element().unwrap();
        assert_eq!(root.tag, "p");
    }

    #[test]
    fn plain_text_with_no_tags_is_wrapped_as_markdown_syntax() {
        let result = parse("just some prose");
        assert!(result.wrapped);
        let root = result.root.as_element().unwrap();
        assert_eq!(root.attr("syntax"), Some("markdown"));
    }

    #[test]
    fn multiple_top_level_elements_are_wrapped_as_markdown_syntax() {
        let result = parse("<p>one</p><p>two</p>");
        assert!(result.wrapped);
        let root = result.root.as_element().unwrap();
        assert_eq!(root.attr("syntax"), Some("markdown"));
        assert_eq!(root.children.len(), 2);
    }

    #[test]
    fn unclosed_tags_are_recovered_with_a_read_error_and_wrapped_as_text() {
        let result = parse("<p>oops");
        assert!(!result.errors.is_empty());
        assert!(result.wrapped);
        let root = result.root.as_element().unwrap();
        assert_eq!(root.attr("syntax"), Some("text"));
        assert_eq!(root.attr("whiteSpace"), Some("pre"));
    }

    #[test]
    fn mismatched_close_tags_recover_by_popping_the_nearer_frame() {
        let result = parse("<a><b>x</a></b>");
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn attributes_preserve_declaration_order() {
        let result = parse(r#"<p b="2" a="1" />"#);
        let root = result.root.as_element().unwrap();
        let names: Vec<&str> = root.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn crlf_line_endings_are_normalized_to_lf() {
        let result = parse("<poml>line1\r\nline2</poml>");
        let root = result.root.as_element().unwrap();
        let text = root.children[0].as_text().unwrap();
        assert_eq!(text, "line1\nline2");
    }
}
