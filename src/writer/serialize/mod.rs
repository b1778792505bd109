//! `serialize` presentation: JSON, YAML, XML (`spec.md` §4.6). Shares a
//! value-tree builder that walks `any`/`obj`/`env` IR nodes into a typed
//! `Value`, then each format serializes that tree independently.

pub mod json;
pub mod xml;
pub mod yaml;

use std::collections::BTreeMap;

use crate::error::CompileError;
use crate::ir::{IrElement, IrNode, IrTag};
use crate::value::Value;

use super::{WriteOptions, WriteResult};

pub fn write(env: &IrElement, opts: &WriteOptions, errors: &mut Vec<CompileError>) -> WriteResult {
    let value = build_value(env);
    let out_end;
    let output = match env.attrs.get_str("serializer").unwrap_or("json") {
        "yaml" => yaml::to_string(&value),
        "xml" => xml::to_string(&value, "root"),
        _ => json::to_string(&value, opts.pretty_print),
    };
    out_end = output.len();
    WriteResult {
        mappings: vec![super::MappingNode::from_element(env, 0, out_end)],
        output,
        multimedia: Vec::new(),
    }
}

/// Coerce an `<any type="…">` leaf's single text child per `spec.md` §4.6.
fn coerce_scalar(text: &str, type_name: &str) -> Value {
    match type_name {
        "integer" => text.trim().parse::<i64>().map(|n| Value::Number(n as f64)).unwrap_or(Value::Null),
        "float" => text.trim().parse::<f64>().map(Value::Number).unwrap_or(Value::Null),
        "boolean" => match text.trim() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::Null,
        },
        "null" => Value::Null,
        "array" => crate::jsonbuf::parse_str(text).unwrap_or(Value::Array(Vec::new())),
        _ => Value::String(text.to_string()),
    }
}

/// Build the typed value tree from an IR subtree: `<any>`/`<obj>` elements
/// become objects/arrays/scalars, everything else is rendered to markdown
/// text and treated as a string leaf.
pub fn build_value(node: &IrElement) -> Value {
    if matches!(node.tag, IrTag::Any | IrTag::Obj | IrTag::Env) {
        let text_children: Vec<&str> = node
            .children
            .iter()
            .filter_map(|c| match c {
                IrNode::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect();
        let element_children: Vec<&IrElement> = node
            .children
            .iter()
            .filter_map(|c| match c {
                IrNode::Element(e) => Some(e),
                _ => None,
            })
            .collect();

        if element_children.is_empty() {
            if text_children.len() == 1 {
                let type_name = node.attrs.get_str("type").unwrap_or("string");
                return coerce_scalar(text_children[0], type_name);
            }
            if !text_children.is_empty() {
                return Value::String(text_children.join(" "));
            }
            if let Some(raw) = node.attrs.get("data") {
                return raw.clone();
            }
            return Value::Null;
        }

        let named: Vec<(&str, &IrElement)> = element_children
            .iter()
            .filter_map(|e| e.attrs.get_str("name").map(|n| (n, *e)))
            .collect();

        if named.len() == element_children.len() && !named.is_empty() {
            let mut map = BTreeMap::new();
            for (name, child) in named {
                map.insert(name.to_string(), build_value(child));
            }
            return Value::Object(map);
        }

        return Value::Array(element_children.into_iter().map(build_value).collect());
    }

    Value::String(super::markup::markdown::write_generic_as_markdown(node, &WriteOptions::default(), &mut Vec::new()).output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    fn text(s: &str) -> IrNode {
        IrNode::Text(crate::ir::IrText { text: s.to_string(), span: Span::empty_at(0) })
    }

    fn typed_any(name: Option<&str>, type_name: &str, value_text: &str) -> IrElement {
        let mut el = IrElement::new(IrTag::Any);
        if let Some(n) = name {
            el.attrs.set("name", Value::String(n.to_string()));
        }
        el.attrs.set("type", Value::String(type_name.to_string()));
        el.children.push(text(value_text));
        el
    }

    #[test]
    fn scalar_any_node_coerces_by_declared_type() {
        let el = typed_any(None, "integer", "42");
        assert_eq!(build_value(&el), Value::Number(42.0));
    }

    #[test]
    fn named_children_become_an_object() {
        let mut obj = IrElement::new(IrTag::Obj);
        obj.children.push(IrNode::Element(typed_any(Some("a"), "integer", "1")));
        obj.children.push(IrNode::Element(typed_any(Some("b"), "string", "x")));
        let value = build_value(&obj);
        let Value::Object(map) = value else { panic!("expected object") };
        assert_eq!(map.get("a"), Some(&Value::Number(1.0)));
        assert_eq!(map.get("b"), Some(&Value::String("x".to_string())));
    }

    #[test]
    fn unnamed_children_become_an_array() {
        let mut obj = IrElement::new(IrTag::Obj);
        obj.children.push(IrNode::Element(typed_any(None, "integer", "1")));
        obj.children.push(IrNode::Element(typed_any(None, "integer", "2")));
        let value = build_value(&obj);
        assert_eq!(
            value,
            Value::Array(vec![Value::Number(1.0), Value::Number(2.0)])
        );
    }

    #[test]
    fn boolean_and_null_coercion() {
        assert_eq!(build_value(&typed_any(None, "boolean", "true")), Value::Bool(true));
        assert_eq!(build_value(&typed_any(None, "null", "anything")), Value::Null);
    }

    #[test]
    fn unrecognized_type_falls_back_to_string() {
        let el = typed_any(None, "string", "plain text");
        assert_eq!(build_value(&el), Value::String("plain text".to_string()));
    }

    #[test]
    fn json_output_uses_the_default_serializer() {
        let mut env = IrElement::new(IrTag::Env);
        env.children.push(IrNode::Element(typed_any(Some("a"), "integer", "1")));
        let mut errors = Vec::new();
        let result = write(&env, &WriteOptions::default(), &mut errors);
        assert!(errors.is_empty());
        assert_eq!(result.output, "{\"a\":1}");
    }
}
