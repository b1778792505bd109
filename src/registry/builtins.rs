//! Built-in component descriptors: one per IR tag in the closed vocabulary,
//! plus the common aliases an author would reach for.

use crate::error::CompileError;
use crate::ir::{IrElement, IrTag};
use crate::registry::{ComponentDescriptor, Param, RenderCtx};
use crate::value::Value;

/// Attributes every presentation element understands regardless of tag,
/// copied verbatim from the resolved attribute list onto the IR element
/// (`spec.md` §3: "speaker, class, priority, char-limit, token-limit,
/// whitespace where applicable").
const GENERIC_ATTRS: &[&str] = &[
    "speaker",
    "class",
    "priority",
    "char-limit",
    "token-limit",
    "whitespace",
];

/// Generic attrs the truncator reads as numbers (`crate::writer::truncate`).
/// Plain attribute text never becomes `Value::Number` on its own — the
/// reader's interpolation step only produces a number when the whole value
/// is a single `{{ expr }}` — so a literal `tokenLimit="3"` still needs a
/// text-to-number pass here.
const NUMERIC_GENERIC_ATTRS: &[&str] = &["priority", "char-limit", "token-limit"];

/// Recognize a generic attr regardless of hyphen/camelCase spelling
/// (`spec.md` §4.2 gives that equivalence to component/tag names; limit and
/// priority attributes need the same tolerance), and coerce the numeric ones
/// to `Value::Number` when they arrived as plain text. Returns `None` for any
/// attribute outside the generic set.
pub fn normalize_generic_attr(key: &str, value: &Value) -> Option<(String, Value)> {
    let normalized = crate::registry::normalize(key);
    if !GENERIC_ATTRS.contains(&normalized.as_str()) {
        return None;
    }
    let value = if NUMERIC_GENERIC_ATTRS.contains(&normalized.as_str()) {
        match value {
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Number)
                .unwrap_or_else(|_| value.clone()),
            other => other.clone(),
        }
    } else {
        value.clone()
    };
    Some((normalized, value))
}

fn base(ctx: &RenderCtx, tag: IrTag) -> IrElement {
    let mut el = IrElement::new(tag).with_span(ctx.span);
    for (k, v) in ctx.attrs {
        if let Some((key, value)) = normalize_generic_attr(k, v) {
            el.attrs.set(key, value);
        }
    }
    el
}

fn simple(ctx: &RenderCtx, tag: IrTag) -> Result<IrElement, CompileError> {
    let mut el = base(ctx, tag);
    el.children = ctx.children.clone();
    Ok(el)
}

fn render_env(ctx: &RenderCtx) -> Result<IrElement, CompileError> {
    let mut el = base(ctx, IrTag::Env);
    let presentation = ctx.attr_str("presentation").unwrap_or("markup").to_string();
    el.attrs.set("presentation", Value::String(presentation));
    if let Some(v) = ctx.attr("markup-lang") {
        el.attrs.set("markup-lang", v.clone());
    }
    if let Some(v) = ctx.attr("serializer") {
        el.attrs.set("serializer", v.clone());
    }
    el.children = ctx.children.clone();
    Ok(el)
}

fn render_h(ctx: &RenderCtx) -> Result<IrElement, CompileError> {
    let mut el = base(ctx, IrTag::H);
    if let Some(level) = ctx.attr("level") {
        el.attrs.set("level", level.clone());
    }
    el.children = ctx.children.clone();
    Ok(el)
}

fn render_code(ctx: &RenderCtx) -> Result<IrElement, CompileError> {
    let mut el = base(ctx, IrTag::Code);
    let inline = ctx
        .attr("inline")
        .map(Value::is_truthy)
        .unwrap_or(true);
    el.attrs.set("inline", Value::Bool(inline));
    if let Some(lang) = ctx.attr("lang") {
        el.attrs.set("lang", lang.clone());
    }
    el.children = ctx.children.clone();
    Ok(el)
}

fn render_list(ctx: &RenderCtx) -> Result<IrElement, CompileError> {
    let mut el = base(ctx, IrTag::List);
    if let Some(style) = ctx.attr("style") {
        el.attrs.set("style", style.clone());
    }
    if let Some(start) = ctx.attr("start") {
        el.attrs.set("start", start.clone());
    }
    el.children = ctx.children.clone();
    Ok(el)
}

fn render_img(ctx: &RenderCtx) -> Result<IrElement, CompileError> {
    let mut el = base(ctx, IrTag::Img);
    for key in ["src", "alt", "width", "height", "position", "type"] {
        if let Some(v) = ctx.attr(key) {
            el.attrs.set(key, v.clone());
        }
    }
    el.attrs
        .set_if_absent("position", Value::String("here".to_string()));
    Ok(el)
}

fn render_audio(ctx: &RenderCtx) -> Result<IrElement, CompileError> {
    let mut el = base(ctx, IrTag::Audio);
    for key in ["src", "alt", "position", "type"] {
        if let Some(v) = ctx.attr(key) {
            el.attrs.set(key, v.clone());
        }
    }
    el.attrs
        .set_if_absent("position", Value::String("here".to_string()));
    Ok(el)
}

fn render_obj(ctx: &RenderCtx) -> Result<IrElement, CompileError> {
    let mut el = base(ctx, IrTag::Obj);
    if let Some(data) = ctx.attr("data") {
        el.attrs.set("data", data.clone());
    }
    if let Some(ty) = ctx.attr("type") {
        el.attrs.set("type", ty.clone());
    }
    el.children = ctx.children.clone();
    Ok(el)
}

fn render_any(ctx: &RenderCtx) -> Result<IrElement, CompileError> {
    let mut el = base(ctx, IrTag::Any);
    if let Some(name) = ctx.attr("name") {
        el.attrs.set("name", name.clone());
    }
    if let Some(ty) = ctx.attr("type") {
        el.attrs.set("type", ty.clone());
    }
    el.children = ctx.children.clone();
    Ok(el)
}

fn render_tool_request(ctx: &RenderCtx) -> Result<IrElement, CompileError> {
    let mut el = base(ctx, IrTag::ToolRequest);
    for key in ["id", "name", "arguments", "position"] {
        if let Some(v) = ctx.attr(key) {
            el.attrs.set(key, v.clone());
        }
    }
    el.attrs
        .set_if_absent("position", Value::String("here".to_string()));
    Ok(el)
}

fn render_tool_response(ctx: &RenderCtx) -> Result<IrElement, CompileError> {
    let mut el = base(ctx, IrTag::ToolResponse);
    for key in ["id", "name", "position"] {
        if let Some(v) = ctx.attr(key) {
            el.attrs.set(key, v.clone());
        }
    }
    el.attrs
        .set_if_absent("position", Value::String("here".to_string()));
    el.children = ctx.children.clone();
    Ok(el)
}

/// `<system>`/`<human>`/`<ai>`/`<tool>` speaker shorthand: renders as a
/// generic paragraph-like span with `speaker` forced unless the author
/// already declared one explicitly.
fn render_speaker_shorthand(ctx: &RenderCtx, speaker: &str) -> Result<IrElement, CompileError> {
    let mut el = base(ctx, IrTag::P);
    el.children = ctx.children.clone();
    el.attrs.set_if_absent("speaker", Value::String(speaker.to_string()));
    Ok(el)
}

fn render_system(ctx: &RenderCtx) -> Result<IrElement, CompileError> {
    render_speaker_shorthand(ctx, "system")
}
fn render_human(ctx: &RenderCtx) -> Result<IrElement, CompileError> {
    render_speaker_shorthand(ctx, "human")
}
fn render_ai(ctx: &RenderCtx) -> Result<IrElement, CompileError> {
    render_speaker_shorthand(ctx, "ai")
}
fn render_tool_speaker(ctx: &RenderCtx) -> Result<IrElement, CompileError> {
    render_speaker_shorthand(ctx, "tool")
}

macro_rules! simple_component {
    ($fn_name:ident, $tag:expr) => {
        fn $fn_name(ctx: &RenderCtx) -> Result<IrElement, CompileError> {
            simple(ctx, $tag)
        }
    };
}

simple_component!(render_p, IrTag::P);
simple_component!(render_span, IrTag::Span);
simple_component!(render_nl, IrTag::Nl);
simple_component!(render_b, IrTag::B);
simple_component!(render_i, IrTag::I);
simple_component!(render_s, IrTag::S);
simple_component!(render_u, IrTag::U);
simple_component!(render_item, IrTag::Item);
simple_component!(render_table, IrTag::Table);
simple_component!(render_thead, IrTag::Thead);
simple_component!(render_tbody, IrTag::Tbody);
simple_component!(render_trow, IrTag::Trow);
simple_component!(render_tcell, IrTag::Tcell);
simple_component!(render_text, IrTag::Text);

const NO_PARAMS: &[Param] = &[];

macro_rules! descriptor {
    ($canonical:literal, $aliases:expr, $render:expr) => {
        ComponentDescriptor {
            canonical: $canonical,
            aliases: $aliases,
            params: NO_PARAMS,
            is_public: true,
            is_async: false,
            render: $render,
        }
    };
}

pub fn all() -> Vec<ComponentDescriptor> {
    vec![
        descriptor!("env", &[], render_env),
        descriptor!("p", &["paragraph", "text-block"], render_p),
        descriptor!("h", &["header", "heading"], render_h),
        descriptor!("span", &["inline"], render_span),
        descriptor!("nl", &["break", "newline"], render_nl),
        descriptor!("b", &["bold", "strong"], render_b),
        descriptor!("i", &["italic", "emphasis"], render_i),
        descriptor!("s", &["strike", "strikethrough"], render_s),
        descriptor!("u", &["underline"], render_u),
        descriptor!("code", &[], render_code),
        descriptor!("list", &[], render_list),
        descriptor!("item", &["list-item"], render_item),
        descriptor!("table", &[], render_table),
        descriptor!("thead", &["table-head"], render_thead),
        descriptor!("tbody", &["table-body"], render_tbody),
        descriptor!("trow", &["table-row", "tr"], render_trow),
        descriptor!("tcell", &["table-cell", "td"], render_tcell),
        descriptor!("any", &[], render_any),
        descriptor!("obj", &["object"], render_obj),
        descriptor!("img", &["image"], render_img),
        descriptor!("audio", &[], render_audio),
        descriptor!("toolrequest", &["tool-request"], render_tool_request),
        descriptor!("toolresponse", &["tool-response"], render_tool_response),
        descriptor!("text", &[], render_text),
        descriptor!("system", &[], render_system),
        descriptor!("human", &[], render_human),
        descriptor!("ai", &["assistant"], render_ai),
        descriptor!("tool", &[], render_tool_speaker),
    ]
}
