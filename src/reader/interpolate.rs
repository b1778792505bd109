//! Text interpolation: `{{ expr }}` substitution plus entity decoding
//! (`spec.md` §4.1, §4.3).

use crate::error::CompileError;
use crate::eval;
use crate::span::Span;
use crate::value::{Context, Value};

/// Decode the standard five XML entities plus the POML-specific
/// `#`-prefixed numeric-style escapes. Only called during interpolation,
/// never during lexing (`spec.md` §4.1).
pub fn decode_entities(text: &str) -> String {
    const TABLE: &[(&str, char)] = &[
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&amp;", '&'),
        ("&quot;", '"'),
        ("&apos;", '\''),
        ("#lt;", '<'),
        ("#gt;", '>'),
        ("#amp;", '&'),
        ("#quot;", '"'),
        ("#apos;", '\''),
        ("#hash;", '#'),
        ("#lbrace;", '{'),
        ("#rbrace;", '}'),
    ];
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    'outer: while i < bytes.len() {
        for (pattern, ch) in TABLE {
            if text[i..].starts_with(pattern) {
                out.push(*ch);
                i += pattern.len();
                continue 'outer;
            }
        }
        let c = text[i..].chars().next().unwrap();
        out.push(c);
        i += c.len_utf8();
    }
    out
}

/// One piece of an interpolated string: either decoded literal text or the
/// value produced by an evaluated `{{ expr }}`.
#[derive(Debug, Clone)]
enum Piece {
    Literal(String),
    Expr(Value),
}

/// Split `raw` on `{{ expr }}` runs (non-greedy, not immediately followed by
/// a further `}`), evaluate each expression against `ctx`, and decode
/// entities in the literal runs. If every piece is a scalar the result
/// collapses to a single joined `Value::String`; otherwise the pieces are
/// preserved as a `Value::Array` (`spec.md` §4.3).
pub fn interpolate(
    raw: &str,
    span_base: usize,
    ctx: &Context,
    errors: &mut Vec<CompileError>,
) -> Value {
    let pieces = split_pieces(raw, span_base, ctx, errors);
    if pieces.len() == 1 {
        if let Piece::Expr(v) = &pieces[0] {
            return v.clone();
        }
    }
    if pieces.iter().all(|p| match p {
        Piece::Literal(_) => true,
        Piece::Expr(v) => v.is_scalar(),
    }) {
        let mut joined = String::new();
        for piece in &pieces {
            match piece {
                Piece::Literal(s) => joined.push_str(s),
                Piece::Expr(v) => joined.push_str(&v.to_display_string()),
            }
        }
        Value::String(joined)
    } else {
        Value::Array(
            pieces
                .into_iter()
                .map(|p| match p {
                    Piece::Literal(s) => Value::String(s),
                    Piece::Expr(v) => v,
                })
                .collect(),
        )
    }
}

fn split_pieces(
    raw: &str,
    span_base: usize,
    ctx: &Context,
    errors: &mut Vec<CompileError>,
) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut literal_start = 0usize;
    let mut i = 0usize;
    let bytes = raw.as_bytes();
    while i + 1 < bytes.len() {
        if &raw[i..i + 2] == "{{" {
            if let Some(close) = find_close(raw, i + 2) {
                if literal_start < i {
                    pieces.push(Piece::Literal(decode_entities(&raw[literal_start..i])));
                }
                let expr_src = raw[i + 2..close].trim();
                match eval::eval_str(expr_src, ctx) {
                    Ok(value) => pieces.push(Piece::Expr(value)),
                    Err(e) => {
                        errors.push(CompileError::read(
                            format!("expression error: {}", e),
                            Some(Span::new(span_base + i, span_base + close + 2)),
                            None,
                        ));
                        pieces.push(Piece::Expr(Value::Null));
                    }
                }
                i = close + 2;
                literal_start = i;
                continue;
            }
        }
        i += 1;
    }
    if literal_start < raw.len() {
        pieces.push(Piece::Literal(decode_entities(&raw[literal_start..])));
    }
    if pieces.is_empty() {
        pieces.push(Piece::Literal(String::new()));
    }
    pieces
}

/// Find the end of the next `}}` starting at or after `from`, skipping any
/// that is immediately followed by a further `}` (the "not followed by `}`"
/// non-greedy rule).
fn find_close(raw: &str, from: usize) -> Option<usize> {
    let bytes = raw.as_bytes();
    let mut j = from;
    while j + 1 < bytes.len() {
        if &raw[j..j + 2] == "}}" && raw.as_bytes().get(j + 2) != Some(&b'}') {
            return Some(j);
        }
        j += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_entities_handles_the_standard_five_and_hash_escapes() {
        assert_eq!(decode_entities("a &lt;b&gt; &amp; c"), "a <b> & c");
        assert_eq!(decode_entities("#lbrace;x#rbrace;"), "{x}");
    }

    #[test]
    fn plain_text_with_no_expressions_is_literal() {
        let mut errors = Vec::new();
        let v = interpolate("just text", 0, &Context::new(), &mut errors);
        assert_eq!(v, Value::String("just text".to_string()));
        assert!(errors.is_empty());
    }

    #[test]
    fn single_expression_collapses_to_its_own_value_type() {
        let mut ctx = Context::new();
        ctx.set_global("xs", Value::Array(vec![Value::Number(1.0)]));
        let mut errors = Vec::new();
        let v = interpolate("{{ xs }}", 0, &ctx, &mut errors);
        assert_eq!(v, Value::Array(vec![Value::Number(1.0)]));
    }

    #[test]
    fn mixed_literal_and_scalar_expr_joins_to_a_string() {
        let mut ctx = Context::new();
        ctx.set_global("name", Value::String("world".to_string()));
        let mut errors = Vec::new();
        let v = interpolate("hello {{ name }}!", 0, &ctx, &mut errors);
        assert_eq!(v, Value::String("hello world!".to_string()));
    }

    #[test]
    fn mixed_literal_and_container_expr_preserves_pieces() {
        let mut ctx = Context::new();
        ctx.set_global("xs", Value::Array(vec![Value::Number(1.0)]));
        let mut errors = Vec::new();
        let v = interpolate("before {{ xs }} after", 0, &ctx, &mut errors);
        assert_eq!(
            v,
            Value::Array(vec![
                Value::String("before ".to_string()),
                Value::Array(vec![Value::Number(1.0)]),
                Value::String(" after".to_string()),
            ])
        );
    }

    #[test]
    fn invalid_expression_records_an_error_and_yields_null() {
        let mut errors = Vec::new();
        let v = interpolate("{{ 1 ~ 2 }}", 0, &Context::new(), &mut errors);
        assert_eq!(v, Value::Null);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("expression error"));
    }

    #[test]
    fn triple_closing_brace_is_not_treated_as_the_delimiter() {
        assert_eq!(find_close("{{ a }}}", 2), None);
    }
}
