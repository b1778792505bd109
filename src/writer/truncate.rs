//! Phase 8: Truncator/Tokenizer Interface (`spec.md` §4.6, §8). Operates in
//! two steps: priority-based reduction drops whole child subtrees before
//! writing, then a final text-level pass truncates whatever is still over
//! budget after rendering.
//!
//! Child-subtree size is approximated by its flattened text length (and,
//! for token limits, the tokenizer count of that flattened text) rather
//! than its fully rendered box text — the rendered form isn't available
//! until after reduction runs. This is a deliberate approximation; see
//! `DESIGN.md`.

use crate::error::CompileError;
use crate::ir::{IrElement, IrNode};
use crate::tokenizer;

use super::{TruncateFrom, WriteOptions, WriteResult};

/// Recursively apply priority-based reduction to every container that
/// declares a `char-limit` or `token-limit` attribute (`spec.md` §4.6:
/// "repeatedly drop the subset of child boxes with the globally-minimum
/// priority until totals fit or all remaining boxes share the minimum
/// priority").
pub fn reduce_tree(node: &mut IrNode, opts: &WriteOptions) {
    if let IrNode::Element(el) = node {
        for child in el.children.iter_mut() {
            reduce_tree(child, opts);
        }
        reduce_children(el, opts);
    }
}

fn reduce_children(el: &mut IrElement, opts: &WriteOptions) {
    let char_limit = el.attrs.get_number("char-limit").map(|n| n as usize);
    let token_limit = el.attrs.get_number("token-limit").map(|n| n as usize);
    if char_limit.is_none() && token_limit.is_none() {
        return;
    }

    loop {
        if fits(el, char_limit, token_limit, opts) || el.children.is_empty() {
            break;
        }
        let min_priority = el
            .children
            .iter()
            .filter_map(node_priority)
            .fold(f64::INFINITY, f64::min);
        if !min_priority.is_finite() {
            break;
        }
        let droppable = el
            .children
            .iter()
            .any(|c| node_priority(c).map(|p| p > min_priority).unwrap_or(false));
        if !droppable {
            break;
        }
        el.children.retain(|c| node_priority(c) != Some(min_priority));
    }
}

fn fits(el: &IrElement, char_limit: Option<usize>, token_limit: Option<usize>, opts: &WriteOptions) -> bool {
    let text = flatten_text(el);
    if let Some(cl) = char_limit {
        if text.chars().count() > cl {
            return false;
        }
    }
    if let Some(tl) = token_limit {
        let count = tokenizer::shared().count_within(&text, &opts.tokenizer_model, tl);
        if count > tl {
            return false;
        }
    }
    true
}

fn node_priority(node: &IrNode) -> Option<f64> {
    match node {
        IrNode::Element(el) => el.priority(),
        IrNode::Text(_) => None,
    }
}

fn flatten_text(el: &IrElement) -> String {
    let mut out = String::new();
    collect(el, &mut out);
    out
}

fn collect(el: &IrElement, out: &mut String) {
    for child in &el.children {
        match child {
            IrNode::Text(t) => out.push_str(&t.text),
            IrNode::Element(e) => collect(e, out),
        }
    }
}

/// Final text-level pass: truncate `text` once char-limit/token-limit are
/// known, in whichever order they were supplied (`spec.md` §4.6: "for any
/// element with char-limit or token-limit, the box's text is truncated").
fn truncate_limited_text(
    mut text: String,
    char_limit: Option<usize>,
    token_limit: Option<usize>,
    opts: &WriteOptions,
) -> String {
    if let Some(cl) = char_limit {
        if text.chars().count() > cl {
            text = truncate_text(&text, cl, &opts.truncate_marker, opts.truncate_from);
        }
    }
    if let Some(tl) = token_limit {
        let count = tokenizer::shared().count_within(&text, &opts.tokenizer_model, tl);
        if count > tl {
            text = truncate_text(&text, tl, &opts.truncate_marker, opts.truncate_from);
        }
    }
    text
}

/// Final text-level pass: truncate the rendered output if the env's own
/// limits are still exceeded after reduction (`spec.md` §4.6, §8 scenario
/// 5). A byte-count fast path skips tokenization when `bytes <= token-limit`.
pub fn apply_limits(
    env: &IrElement,
    mut result: WriteResult,
    opts: &WriteOptions,
    _errors: &mut Vec<CompileError>,
) -> WriteResult {
    let char_limit = env.attrs.get_number("char-limit").map(|n| n as usize);
    let token_limit = env.attrs.get_number("token-limit").map(|n| n as usize);
    if char_limit.is_none() && token_limit.is_none() {
        return result;
    }
    result.output = truncate_limited_text(result.output, char_limit, token_limit, opts);
    result
}

/// Same text-level pass as [`apply_limits`], but for a single element's own
/// rendered text — any presentation element can carry `char-limit`/
/// `token-limit`, not only the root `env` (`spec.md` §4.6).
pub fn apply_element_limits(el: &IrElement, text: String, opts: &WriteOptions) -> String {
    let char_limit = el.attrs.get_number("char-limit").map(|n| n as usize);
    let token_limit = el.attrs.get_number("token-limit").map(|n| n as usize);
    if char_limit.is_none() && token_limit.is_none() {
        return text;
    }
    truncate_limited_text(text, char_limit, token_limit, opts)
}

fn truncate_text(text: &str, limit: usize, marker: &str, from: TruncateFrom) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= limit {
        return text.to_string();
    }
    let budget = limit.saturating_sub(marker.chars().count());
    match from {
        TruncateFrom::End => {
            let kept: String = chars[..budget.min(chars.len())].iter().collect();
            format!("{}{}", kept, marker)
        }
        TruncateFrom::Start => {
            let start = chars.len().saturating_sub(budget);
            let kept: String = chars[start..].iter().collect();
            format!("{}{}", marker, kept)
        }
        TruncateFrom::Middle => {
            let half = budget / 2;
            let head: String = chars[..half.min(chars.len())].iter().collect();
            let tail_start = chars.len().saturating_sub(budget - half);
            let tail: String = chars[tail_start..].iter().collect();
            format!("{}{}{}", head, marker, tail)
        }
    }
}
