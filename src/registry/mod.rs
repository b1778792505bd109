//! Process-wide component registry (`spec.md` §4.2).
//!
//! Populated once at process start (`init()` is idempotent) and read-only
//! thereafter — the only process-wide singleton besides the tokenizer
//! encoder cache (`spec.md` §5, §9 design notes: "no process-wide
//! singletons other than the component registry").

pub mod builtins;

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::error::CompileError;
use crate::ir::{IrElement, IrNode};
use crate::span::Span;
use crate::value::Value;

/// One formal parameter of a component, used by the editor collaborator for
/// completion/hover. The core only reads `name`/`required`/`default`.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: &'static str,
    pub type_name: &'static str,
    pub choices: &'static [&'static str],
    pub required: bool,
    pub default: Option<Value>,
    pub description: &'static str,
}

/// Everything a renderer needs: the element's already-interpolated
/// attributes, its rendered children, and its source span.
pub struct RenderCtx<'a> {
    pub attrs: &'a [(String, Value)],
    pub children: Vec<IrNode>,
    pub span: Span,
}

impl<'a> RenderCtx<'a> {
    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(Value::as_str)
    }
}

pub type RenderFn = fn(&RenderCtx) -> Result<IrElement, CompileError>;

#[derive(Clone)]
pub struct ComponentDescriptor {
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
    pub params: &'static [Param],
    pub is_public: bool,
    pub is_async: bool,
    pub render: RenderFn,
}

pub struct ComponentRegistry {
    by_canonical: HashMap<String, ComponentDescriptor>,
    alias_to_canonical: HashMap<String, String>,
}

impl ComponentRegistry {
    fn new() -> Self {
        let mut registry = Self {
            by_canonical: HashMap::new(),
            alias_to_canonical: HashMap::new(),
        };
        for descriptor in builtins::all() {
            registry.register(descriptor);
        }
        registry
    }

    fn register(&mut self, descriptor: ComponentDescriptor) {
        let key = normalize(descriptor.canonical);
        self.alias_to_canonical.insert(key.clone(), descriptor.canonical.to_string());
        for alias in descriptor.aliases {
            self.alias_to_canonical
                .insert(normalize(alias), descriptor.canonical.to_string());
        }
        self.by_canonical.insert(descriptor.canonical.to_string(), descriptor);
    }

    /// Case-insensitive, hyphen/camelCase-tolerant alias lookup, filtered by
    /// the component-disable set from `<meta components="-TagA +TagB">`.
    pub fn find_by_alias<'a>(
        &'a self,
        name: &str,
        disabled: &HashSet<String>,
    ) -> Result<&'a ComponentDescriptor, String> {
        let key = normalize(name);
        let canonical = self
            .alias_to_canonical
            .get(&key)
            .ok_or_else(|| format!("unknown component '{}'", name))?;
        if disabled.contains(canonical) {
            return Err(format!("component '{}' is disabled for this document", canonical));
        }
        Ok(self.by_canonical.get(canonical).expect("registered canonical"))
    }

    pub fn get(&self, canonical: &str) -> Option<&ComponentDescriptor> {
        self.by_canonical.get(canonical)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.by_canonical.values()
    }
}

/// Lowercase, hyphen-delimited normal form: `"contextFile"` and
/// `"context-file"` both normalize to `"context-file"` (`spec.md` §4.2).
pub fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() && i != 0 {
            out.push('-');
        }
        for lower in c.to_lowercase() {
            out.push(lower);
        }
    }
    out
}

static REGISTRY: OnceLock<ComponentRegistry> = OnceLock::new();

/// Idempotent process-wide initialization.
pub fn registry() -> &'static ComponentRegistry {
    REGISTRY.get_or_init(ComponentRegistry::new)
}

/// Parse a `<meta components="-TagA +TagB">` directive into the disabled
/// set. `+Tag` re-enables (removes from the set); order matters, later
/// entries win.
pub fn parse_components_directive(spec: &str) -> HashSet<String> {
    let mut disabled = HashSet::new();
    for token in spec.split_whitespace() {
        if let Some(tag) = token.strip_prefix('-') {
            disabled.insert(normalize(tag));
        } else if let Some(tag) = token.strip_prefix('+') {
            disabled.remove(&normalize(tag));
        }
    }
    disabled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_converts_camel_case_to_hyphenated_lowercase() {
        assert_eq!(normalize("contextFile"), "context-file");
        assert_eq!(normalize("context-file"), "context-file");
        assert_eq!(normalize("P"), "p");
    }

    #[test]
    fn registry_resolves_builtin_aliases_case_insensitively() {
        let reg = registry();
        let disabled = HashSet::new();
        let p = reg.find_by_alias("p", &disabled).unwrap();
        assert_eq!(p.canonical, "p");
        let p2 = reg.find_by_alias("P", &disabled).unwrap();
        assert_eq!(p2.canonical, "p");
    }

    #[test]
    fn unknown_component_name_is_an_error() {
        let reg = registry();
        let err = reg.find_by_alias("not-a-real-tag", &HashSet::new()).unwrap_err();
        assert!(err.contains("unknown component"));
    }

    #[test]
    fn disabled_components_are_rejected() {
        let reg = registry();
        let mut disabled = HashSet::new();
        disabled.insert("p".to_string());
        let err = reg.find_by_alias("p", &disabled).unwrap_err();
        assert!(err.contains("disabled"));
    }

    #[test]
    fn components_directive_disables_then_reenables_in_order() {
        let disabled = parse_components_directive("-p -h +p");
        assert!(!disabled.contains("p"));
        assert!(disabled.contains("h"));
    }
}
