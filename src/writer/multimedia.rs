//! Multimedia writer (`spec.md` §4.6): each media element emits a single
//! placeholder character `À` (U+00C0) at its output position plus a
//! `PositionalContentMultiMedia` entry.

use crate::error::CompileError;
use crate::ir::{IrElement, IrTag};
use crate::value::Value;

use super::{WriteOptions, WriteResult};

pub const PLACEHOLDER: char = '\u{00C0}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Top,
    Here,
    Bottom,
}

impl Position {
    fn from_attr(v: Option<&str>) -> Self {
        match v {
            Some("top") => Position::Top,
            Some("bottom") => Position::Bottom,
            _ => Position::Here,
        }
    }
}

#[derive(Debug, Clone)]
pub enum MediaPayload {
    Image {
        data: Vec<u8>,
        alt: String,
        width: Option<u32>,
        height: Option<u32>,
    },
    Audio {
        data: Vec<u8>,
        alt: String,
    },
    ToolRequest(Value),
    ToolResponse(String),
}

#[derive(Debug, Clone)]
pub struct PositionalContentMultiMedia {
    pub media_type: String,
    pub position: Position,
    pub index: usize,
    pub payload: MediaPayload,
}

pub fn write(env: &IrElement, opts: &WriteOptions, errors: &mut Vec<CompileError>) -> WriteResult {
    let mut result = WriteResult::default();
    for child in &env.children {
        if let crate::ir::IrNode::Element(el) = child {
            result.append(write_media_element(el, opts, errors));
        }
    }
    result
}

fn write_media_element(el: &IrElement, opts: &WriteOptions, errors: &mut Vec<CompileError>) -> WriteResult {
    let position = Position::from_attr(el.attrs.get_str("position"));
    let media_type = el
        .attrs
        .get_str("type")
        .map(str::to_string)
        .unwrap_or_else(|| default_media_type(el.tag).to_string());

    let payload = match el.tag {
        IrTag::Img => MediaPayload::Image {
            data: read_buffer(el),
            alt: el.attrs.get_str("alt").unwrap_or_default().to_string(),
            width: el.attrs.get_number("width").map(|n| n as u32),
            height: el.attrs.get_number("height").map(|n| n as u32),
        },
        IrTag::Audio => MediaPayload::Audio {
            data: read_buffer(el),
            alt: el.attrs.get_str("alt").unwrap_or_default().to_string(),
        },
        IrTag::ToolRequest => MediaPayload::ToolRequest(
            el.attrs.get("data").cloned().unwrap_or(Value::Null),
        ),
        IrTag::ToolResponse => {
            let mut inner = WriteResult::default();
            for child in &el.children {
                inner.append(super::write_node(child, opts, errors));
            }
            MediaPayload::ToolResponse(inner.output)
        }
        other => {
            errors.push(CompileError::write(
                format!("unsupported multimedia tag '{}'", other.as_str()),
                None,
            ));
            return WriteResult::default();
        }
    };

    let mut result = WriteResult::text(PLACEHOLDER.to_string());
    result.multimedia.push(PositionalContentMultiMedia {
        media_type,
        position,
        index: 0,
        payload,
    });
    result
}

fn default_media_type(tag: IrTag) -> &'static str {
    match tag {
        IrTag::Img => "image/*",
        IrTag::Audio => "audio/*",
        IrTag::ToolRequest => "application/vnd.poml.tool-request+json",
        IrTag::ToolResponse => "application/vnd.poml.tool-response+json",
        _ => "application/octet-stream",
    }
}

fn read_buffer(el: &IrElement) -> Vec<u8> {
    match el.attrs.get("src") {
        Some(Value::Buffer(b)) => b.clone(),
        Some(Value::String(s)) => s.as_bytes().to_vec(),
        _ => Vec::new(),
    }
}
