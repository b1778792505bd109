//! Phase 1a: XML AST
//!
//! A tolerant XML-like AST for POML source documents. Closed-enum approach
//! to element kinds rather than a class hierarchy: every node is one of
//! `Element`, `Text`, or `Comment`, carried as a tagged variant.

pub mod lexer;
pub mod parser;

use serde::{Deserialize, Serialize};

use crate::span::Span;

pub use parser::{parse, ParseResult};

/// One `name="value"` pair on an element, preserving declaration order and
/// the byte spans of both the key and the value (used by the reader to
/// report interpolation errors at a precise location).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub name_span: Span,
    pub value_span: Span,
}

/// A tagged element, text run, or comment. No inheritance: callers match on
/// the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Element(Element),
    Text(TextNode),
    Comment(CommentNode),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Element(e) => e.span,
            Node::Text(t) => t.span,
            Node::Comment(c) => c.span,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(t) => Some(t.raw.as_str()),
            _ => None,
        }
    }

    /// Whitespace-only text or a comment; used by the synthetic-wrap
    /// heuristic in `parser` to find the "real" root among top-level nodes.
    pub fn is_trivial(&self) -> bool {
        match self {
            Node::Comment(_) => true,
            Node::Text(t) => t.raw.trim().is_empty(),
            Node::Element(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Canonical lowercase tag name used for matching.
    pub tag: String,
    /// Tag spelling exactly as written, for diagnostics.
    pub raw_tag: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    pub open_name_span: Span,
    pub close_name_span: Option<Span>,
    pub self_closing: bool,
    pub span: Span,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }

    pub fn attr_entry(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Whitespace-separated `class` attribute values.
    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|v| v.split_whitespace().collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub raw: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentNode {
    pub raw: String,
    pub span: Span,
}
