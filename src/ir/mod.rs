//! The intermediate representation: a closed vocabulary of presentation and
//! multimedia elements, each carrying back-references to the source
//! document (`spec.md` §3: "IR element").

use serde::{Deserialize, Serialize};

use crate::span::Span;
use crate::value::Value;

/// The closed set of IR tags from `spec.md` §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IrTag {
    Env,
    P,
    H,
    Span,
    Nl,
    B,
    I,
    S,
    U,
    Code,
    List,
    Item,
    Table,
    Thead,
    Tbody,
    Trow,
    Tcell,
    Any,
    Obj,
    Img,
    Audio,
    #[serde(rename = "toolrequest")]
    ToolRequest,
    #[serde(rename = "toolresponse")]
    ToolResponse,
    Text,
}

impl IrTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            IrTag::Env => "env",
            IrTag::P => "p",
            IrTag::H => "h",
            IrTag::Span => "span",
            IrTag::Nl => "nl",
            IrTag::B => "b",
            IrTag::I => "i",
            IrTag::S => "s",
            IrTag::U => "u",
            IrTag::Code => "code",
            IrTag::List => "list",
            IrTag::Item => "item",
            IrTag::Table => "table",
            IrTag::Thead => "thead",
            IrTag::Tbody => "tbody",
            IrTag::Trow => "trow",
            IrTag::Tcell => "tcell",
            IrTag::Any => "any",
            IrTag::Obj => "obj",
            IrTag::Img => "img",
            IrTag::Audio => "audio",
            IrTag::ToolRequest => "toolrequest",
            IrTag::ToolResponse => "toolresponse",
            IrTag::Text => "text",
        }
    }

    pub fn is_multimedia(&self) -> bool {
        matches!(
            self,
            IrTag::Img | IrTag::Audio | IrTag::ToolRequest | IrTag::ToolResponse
        )
    }
}

/// Order-preserving attribute bag. A plain `Vec` rather than a hash map:
/// attribute count per element is small and declaration order matters for
/// stable output (serialize writers, stylesheet diagnostics).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attrs(pub Vec<(String, Value)>);

impl Attrs {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_number)
    }

    /// Set, overwriting an existing key if present — used by the reader when
    /// it owns the attribute, and by the element-wins half of the stylesheet
    /// merge.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    /// Set only if absent — the style-wins half of the stylesheet merge
    /// (`spec.md` §4.5: "override attributes already set on the element
    /// only if the element does not already define them").
    pub fn set_if_absent(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if !self.0.iter().any(|(k, _)| *k == key) {
            self.0.push((key, value));
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrElement {
    pub tag: IrTag,
    pub attrs: Attrs,
    pub children: Vec<IrNode>,
    pub original_start_index: Option<usize>,
    pub original_end_index: Option<usize>,
}

impl IrElement {
    pub fn new(tag: IrTag) -> Self {
        Self {
            tag,
            attrs: Attrs::default(),
            children: Vec::new(),
            original_start_index: None,
            original_end_index: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.original_start_index = Some(span.start);
        self.original_end_index = Some(span.end);
        self
    }

    pub fn with_children(mut self, children: Vec<IrNode>) -> Self {
        self.children = children;
        self
    }

    pub fn speaker(&self) -> Option<&str> {
        self.attrs.get_str("speaker")
    }

    pub fn priority(&self) -> Option<f64> {
        self.attrs.get_number("priority")
    }

    pub fn class_list(&self) -> Vec<&str> {
        self.attrs
            .get_str("class")
            .map(|v| v.split_whitespace().collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IrNode {
    Element(IrElement),
    Text(IrText),
}

impl IrNode {
    pub fn original_span(&self) -> Option<Span> {
        match self {
            IrNode::Element(e) => match (e.original_start_index, e.original_end_index) {
                (Some(s), Some(en)) => Some(Span::new(s, en)),
                _ => None,
            },
            IrNode::Text(t) => Some(t.span),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrText {
    pub text: String,
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites_existing_key_in_place() {
        let mut attrs = Attrs::default();
        attrs.set("a", Value::Number(1.0));
        attrs.set("b", Value::Number(2.0));
        attrs.set("a", Value::Number(3.0));
        assert_eq!(attrs.0, vec![
            ("a".to_string(), Value::Number(3.0)),
            ("b".to_string(), Value::Number(2.0)),
        ]);
    }

    #[test]
    fn set_if_absent_does_not_override_an_existing_value() {
        let mut attrs = Attrs::default();
        attrs.set("a", Value::Number(1.0));
        attrs.set_if_absent("a", Value::Number(99.0));
        assert_eq!(attrs.get_number("a"), Some(1.0));
    }

    #[test]
    fn set_if_absent_inserts_a_new_key() {
        let mut attrs = Attrs::default();
        attrs.set_if_absent("a", Value::Number(1.0));
        assert_eq!(attrs.get_number("a"), Some(1.0));
    }

    #[test]
    fn contains_and_get_str_reflect_current_state() {
        let mut attrs = Attrs::default();
        assert!(!attrs.contains("name"));
        attrs.set("name", Value::String("poml".to_string()));
        assert!(attrs.contains("name"));
        assert_eq!(attrs.get_str("name"), Some("poml"));
    }

    #[test]
    fn class_list_splits_on_whitespace() {
        let mut el = IrElement::new(IrTag::P);
        el.attrs.set("class", Value::String("warn  urgent".to_string()));
        assert_eq!(el.class_list(), vec!["warn", "urgent"]);
    }

    #[test]
    fn original_span_prefers_both_indices_present() {
        let el = IrElement::new(IrTag::P).with_span(Span::new(3, 9));
        let node = IrNode::Element(el);
        assert_eq!(node.original_span(), Some(Span::new(3, 9)));
    }

    #[test]
    fn original_span_is_none_without_a_recorded_span() {
        let node = IrNode::Element(IrElement::new(IrTag::P));
        assert_eq!(node.original_span(), None);
    }

    #[test]
    fn is_multimedia_identifies_only_media_tags() {
        assert!(IrTag::Img.is_multimedia());
        assert!(IrTag::Audio.is_multimedia());
        assert!(IrTag::ToolRequest.is_multimedia());
        assert!(!IrTag::P.is_multimedia());
    }
}
