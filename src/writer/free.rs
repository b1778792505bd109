//! `free` presentation: preserves text verbatim (`spec.md` §4.6).

use crate::error::CompileError;
use crate::ir::{IrElement, IrNode};

use super::{MappingNode, WriteResult};
use crate::writer::WriteOptions;

pub fn write(env: &IrElement, _opts: &WriteOptions, _errors: &mut Vec<CompileError>) -> WriteResult {
    let mut out = String::new();
    collect_text(env, &mut out);
    let out_end = out.len();
    WriteResult {
        mappings: vec![MappingNode::from_element(env, 0, out_end)],
        output: out,
        multimedia: Vec::new(),
    }
}

fn collect_text(el: &IrElement, out: &mut String) {
    for child in &el.children {
        match child {
            IrNode::Text(t) => out.push_str(&t.text),
            IrNode::Element(e) => collect_text(e, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::IrTag;
    use crate::span::Span;

    fn text(s: &str) -> IrNode {
        IrNode::Text(crate::ir::IrText { text: s.to_string(), span: Span::empty_at(0) })
    }

    #[test]
    fn preserves_text_verbatim_across_nested_elements() {
        let mut inner = IrElement::new(IrTag::Span);
        inner.children.push(text("  raw   text  "));
        let mut env = IrElement::new(IrTag::Env);
        env.children.push(text("before "));
        env.children.push(IrNode::Element(inner));
        env.children.push(text(" after"));

        let mut errors = Vec::new();
        let result = write(&env, &WriteOptions::default(), &mut errors);
        assert_eq!(result.output, "before   raw   text   after");
        assert!(errors.is_empty());
    }

    #[test]
    fn emits_a_single_mapping_for_the_whole_env() {
        let env = IrElement::new(IrTag::Env).with_span(Span::new(0, 10));
        let mut errors = Vec::new();
        let result = write(&env, &WriteOptions::default(), &mut errors);
        assert_eq!(result.mappings.len(), 1);
        assert_eq!(result.mappings[0].original_start, Some(0));
    }
}
