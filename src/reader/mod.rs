//! Phase 4: Reader — walks the AST applying templating directives and
//! component renderers, producing the IR (`spec.md` §4.3). The largest
//! single phase in the pipeline (~20% of the source per `spec.md` §2).

pub mod fanin;
pub mod include;
pub mod interpolate;
pub mod let_stmt;
pub mod meta;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::ast::{self, Node};
use crate::error::{CompileError, ErrorCollection};
use crate::eval;
use crate::ir::{IrElement, IrNode, IrTag, IrText};
use crate::registry::{registry, RenderCtx};
use crate::resolver::{FileBufferCache, SourceResolver};
use crate::schema::SchemaInfo;
use crate::value::{Context, Value};

#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// `--trim`: collapse interpolation whitespace exactly, per the
    /// "Interpolation identity" testable property (`spec.md` §8).
    pub trim: bool,
    pub cwd: PathBuf,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            trim: false,
            cwd: PathBuf::from("."),
        }
    }
}

pub struct Reader<'a> {
    pub(crate) options: &'a ReadOptions,
    pub(crate) resolver: &'a dyn SourceResolver,
    pub(crate) buffer_cache: &'a mut FileBufferCache,
    pub(crate) errors: ErrorCollection,
    pub(crate) disabled_components: HashSet<String>,
    pub(crate) schema: SchemaInfo,
    pub(crate) source_path: Option<PathBuf>,
}

pub struct ReadOutcome {
    pub ir: IrNode,
    pub errors: ErrorCollection,
    pub schema: SchemaInfo,
}

/// Top-level entry point: `read(source, options, context, stylesheet)` from
/// `spec.md` §1. The stylesheet is applied after the IR is produced (§4.5)
/// by the caller (see `crate::compile`).
pub fn read(
    source: &str,
    source_path: Option<&Path>,
    options: &ReadOptions,
    ctx: &mut Context,
    resolver: &dyn SourceResolver,
) -> ReadOutcome {
    let mut buffer_cache = FileBufferCache::new();
    let mut reader = Reader {
        options,
        resolver,
        buffer_cache: &mut buffer_cache,
        errors: ErrorCollection::new(),
        disabled_components: HashSet::new(),
        schema: SchemaInfo::default(),
        source_path: source_path.map(Path::to_path_buf),
    };

    let parsed = ast::parse(source);
    for err in parsed.errors {
        reader.errors.push(err);
    }

    let nodes = match &parsed.root {
        Node::Element(e) if e.tag == "poml" => {
            let mut nodes = Vec::new();
            for child in &e.children {
                nodes.extend(reader.read_node(child, ctx));
            }
            nodes
        }
        other => reader.read_node(other, ctx),
    };

    let env_attrs = match &parsed.root {
        Node::Element(e) if e.tag == "poml" => e.attributes.clone(),
        _ => Vec::new(),
    };

    let mut env = IrElement::new(IrTag::Env).with_span(parsed.root.span());
    let presentation = env_attrs
        .iter()
        .find(|a| a.name == "syntax")
        .map(|a| surface_to_presentation(&a.value))
        .unwrap_or("markup");
    env.attrs.set("presentation", Value::String(presentation.to_string()));
    if presentation == "markup" {
        let lang = env_attrs
            .iter()
            .find(|a| a.name == "syntax")
            .map(|a| a.value.clone())
            .unwrap_or_else(|| "markdown".to_string());
        env.attrs.set("markup-lang", Value::String(lang));
    }
    if presentation == "serialize" {
        let lang = env_attrs
            .iter()
            .find(|a| a.name == "syntax")
            .map(|a| a.value.clone())
            .unwrap_or_else(|| "json".to_string());
        env.attrs.set("serializer", Value::String(lang));
    }
    for attr in &env_attrs {
        if let Some((key, value)) =
            crate::registry::builtins::normalize_generic_attr(&attr.name, &Value::String(attr.value.clone()))
        {
            env.attrs.set(key, value);
        }
    }
    env.children = nodes;

    ReadOutcome {
        ir: IrNode::Element(env),
        errors: reader.errors,
        schema: reader.schema,
    }
}

fn surface_to_presentation(syntax: &str) -> &'static str {
    match syntax {
        "markdown" | "html" | "csv" | "tsv" => "markup",
        "json" | "yaml" | "xml" => "serialize",
        "text" => "free",
        "multimedia" => "multimedia",
        _ => "markup",
    }
}

impl<'a> Reader<'a> {
    pub(crate) fn resolve_path(&self, src: &str) -> PathBuf {
        let candidate = Path::new(src);
        if candidate.is_absolute() {
            return candidate.to_path_buf();
        }
        let base = self
            .source_path
            .as_ref()
            .and_then(|p| p.parent())
            .unwrap_or(&self.options.cwd);
        base.join(candidate)
    }

    pub(crate) fn read_node(&mut self, node: &Node, ctx: &mut Context) -> Vec<IrNode> {
        match node {
            Node::Comment(_) => Vec::new(),
            Node::Text(t) => {
                let mut errs = Vec::new();
                let value = interpolate::interpolate(&t.raw, t.span.start, ctx, &mut errs);
                for e in errs {
                    self.errors.push(e);
                }
                let text = if self.options.trim {
                    value.to_display_string().trim().to_string()
                } else {
                    value.to_display_string()
                };
                vec![IrNode::Text(IrText { text, span: t.span })]
            }
            Node::Element(el) => self.read_element(el, ctx),
        }
    }

    fn read_element(&mut self, el: &ast::Element, ctx: &mut Context) -> Vec<IrNode> {
        match el.tag.as_str() {
            "let" => {
                self.handle_let(el, ctx);
                Vec::new()
            }
            "meta" => {
                self.handle_meta(el);
                Vec::new()
            }
            "include" => self.handle_include(el, ctx),
            _ => {
                if let Some(for_attr) = el.attr("for") {
                    let for_attr = for_attr.to_string();
                    self.read_for(el, &for_attr, ctx)
                } else {
                    self.read_element_once(el, ctx)
                }
            }
        }
    }

    fn read_for(&mut self, el: &ast::Element, for_attr: &str, ctx: &mut Context) -> Vec<IrNode> {
        let Some((item_name, list_expr)) = for_attr.split_once(" in ") else {
            self.errors.push(CompileError::read(
                format!("malformed for=\"{}\"; expected \"item in expr\"", for_attr),
                Some(el.span),
                self.source_path.clone(),
            ));
            return Vec::new();
        };
        let item_name = item_name.trim().to_string();
        let list_value = match eval::eval_str(list_expr.trim(), ctx) {
            Ok(v) => v,
            Err(e) => {
                self.errors.push(CompileError::read(
                    format!("for-loop expression error: {}", e),
                    Some(el.span),
                    self.source_path.clone(),
                ));
                return Vec::new();
            }
        };
        let items: Vec<Value> = match list_value {
            Value::Array(items) => items,
            other => {
                self.errors.push(CompileError::read(
                    format!("for-loop expression must evaluate to an array, found {:?}", other),
                    Some(el.span),
                    self.source_path.clone(),
                ));
                return Vec::new();
            }
        };

        let len = items.len();
        let mut out = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            ctx.push_scope();
            ctx.bind_local(item_name.clone(), item);
            ctx.bind_local("loop", loop_binding(index, len));
            out.extend(self.read_element_once(el, ctx));
            ctx.pop_scope();
        }
        out
    }

    fn read_element_once(&mut self, el: &ast::Element, ctx: &mut Context) -> Vec<IrNode> {
        if let Some(if_attr) = el.attr("if") {
            match eval::eval_str(if_attr, ctx) {
                Ok(v) if !v.is_truthy() => return Vec::new(),
                Ok(_) => {}
                Err(e) => {
                    self.errors.push(CompileError::read(
                        format!("if-condition expression error: {}", e),
                        Some(el.span),
                        self.source_path.clone(),
                    ));
                    return Vec::new();
                }
            }
        }

        let descriptor = match registry().find_by_alias(&el.tag, &self.disabled_components) {
            Ok(d) => d,
            Err(msg) => {
                self.errors.push(CompileError::read(
                    msg,
                    Some(el.open_name_span),
                    self.source_path.clone(),
                ));
                return Vec::new();
            }
        };

        let mut resolved_attrs: Vec<(String, Value)> = Vec::with_capacity(el.attributes.len());
        for attr in &el.attributes {
            if attr.name == "for" || attr.name == "if" {
                continue;
            }
            let mut errs = Vec::new();
            let value = interpolate::interpolate(&attr.value, attr.value_span.start, ctx, &mut errs);
            for e in errs {
                self.errors.push(e);
            }
            resolved_attrs.push((attr.name.clone(), value));
        }

        let mut children = Vec::new();
        for child in &el.children {
            children.extend(self.read_node(child, ctx));
        }

        let render_ctx = RenderCtx {
            attrs: &resolved_attrs,
            children,
            span: el.span,
        };

        match (descriptor.render)(&render_ctx) {
            Ok(ir_el) => vec![IrNode::Element(ir_el)],
            Err(e) => {
                self.errors.push(e);
                Vec::new()
            }
        }
    }
}

fn loop_binding(index: usize, length: usize) -> Value {
    let mut map = std::collections::BTreeMap::new();
    map.insert("index".to_string(), Value::Number(index as f64));
    map.insert("length".to_string(), Value::Number(length as f64));
    map.insert("first".to_string(), Value::Bool(index == 0));
    map.insert("last".to_string(), Value::Bool(index + 1 == length));
    Value::Object(map)
}
