//! Phase 5: Style-sheet Applier (`spec.md` §4.5). Deliberately minimal
//! selector language: tag name or `.class` (§9 design notes — "a richer
//! selector language is a future extension and should not leak into the
//! core").

use std::collections::BTreeMap;

use crate::ir::{IrNode, IrTag};
use crate::value::Value;

/// `selector -> attribute overrides`. A selector is either a bare tag name
/// (`"p"`) or a class selector (`".warn"`).
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    rules: Vec<(String, BTreeMap<String, Value>)>,
}

impl Stylesheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: BTreeMap<String, BTreeMap<String, Value>>) -> Self {
        Self {
            rules: map.into_iter().collect(),
        }
    }

    pub fn add_rule(&mut self, selector: impl Into<String>, attrs: BTreeMap<String, Value>) {
        self.rules.push((selector.into(), attrs));
    }

    /// The rule list in declaration order, for serialization (trace files,
    /// `spec.md` §6) and inspection.
    pub fn rules(&self) -> &[(String, BTreeMap<String, Value>)] {
        &self.rules
    }

    fn matches(&self, tag: IrTag, classes: &[&str]) -> Vec<&BTreeMap<String, Value>> {
        self.rules
            .iter()
            .filter(|(selector, _)| {
                if let Some(class) = selector.strip_prefix('.') {
                    classes.iter().any(|c| *c == class)
                } else {
                    selector == tag.as_str()
                }
            })
            .map(|(_, attrs)| attrs)
            .collect()
    }

    /// Apply in declaration order, element-wins for attributes already
    /// present, style-wins otherwise (`spec.md` §4.5).
    pub fn apply(&self, node: &mut IrNode) {
        if self.rules.is_empty() {
            return;
        }
        self.apply_node(node);
    }

    fn apply_node(&self, node: &mut IrNode) {
        if let IrNode::Element(el) = node {
            let classes: Vec<String> = el.class_list().iter().map(|s| s.to_string()).collect();
            let classes_ref: Vec<&str> = classes.iter().map(String::as_str).collect();
            for attrs in self.matches(el.tag, &classes_ref) {
                for (k, v) in attrs {
                    el.attrs.set_if_absent(k.clone(), v.clone());
                }
            }
            for child in &mut el.children {
                self.apply_node(child);
            }
        }
    }
}
