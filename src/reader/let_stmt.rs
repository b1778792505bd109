//! `<let>` handling (`spec.md` §4.4). Always binds globally; `for`/`if`
//! bindings in the surrounding scope shadow it.

use std::collections::BTreeMap;

use crate::ast::Element;
use crate::error::CompileError;
use crate::eval;
use crate::jsonbuf;
use crate::reader::Reader;
use crate::value::{Context, Value};

/// Parse a typed scalar/container from raw text per the `type` attribute:
/// `string|integer|float|boolean|null|array|object|auto`.
pub fn parse_typed(raw: &str, type_name: &str) -> Result<Value, String> {
    match type_name {
        "string" => Ok(Value::String(raw.to_string())),
        "integer" => raw
            .trim()
            .parse::<i64>()
            .map(|n| Value::Number(n as f64))
            .map_err(|e| format!("invalid integer '{}': {}", raw, e)),
        "float" => raw
            .trim()
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|e| format!("invalid float '{}': {}", raw, e)),
        "boolean" => match raw.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            other => Err(format!("invalid boolean '{}'", other)),
        },
        "null" => Ok(Value::Null),
        "array" | "object" | "auto" => {
            jsonbuf::parse_str(raw).map_err(|e| format!("invalid {} literal: {}", type_name, e))
        }
        other => Err(format!("unknown <let> type '{}'", other)),
    }
}

impl Reader<'_> {
    pub(crate) fn handle_let(&mut self, el: &Element, ctx: &mut Context) {
        let name = el.attr("name").map(str::to_string);
        let type_name = el.attr("type").unwrap_or("auto").to_string();

        if let Some(src) = el.attr("src") {
            self.handle_let_src(el, src, name, &type_name, ctx);
            return;
        }

        if let Some(expr_src) = el.attr("value") {
            let value = match eval::eval_str(expr_src, ctx) {
                Ok(v) => v,
                Err(e) => {
                    self.errors.push(CompileError::read(
                        format!("<let value> expression error: {}", e),
                        Some(el.span),
                        self.source_path.clone(),
                    ));
                    Value::Null
                }
            };
            self.bind_let(name, value, el, ctx);
            return;
        }

        // Third form: typed inline child text/JSON.
        let text = el
            .children
            .iter()
            .filter_map(|c| c.as_text())
            .collect::<Vec<_>>()
            .join("");
        match parse_typed(&text, &type_name) {
            Ok(value) => self.bind_let(name, value, el, ctx),
            Err(msg) => self.errors.push(CompileError::read(
                msg,
                Some(el.span),
                self.source_path.clone(),
            )),
        }
    }

    fn handle_let_src(
        &mut self,
        el: &Element,
        src: &str,
        name: Option<String>,
        type_name: &str,
        ctx: &mut Context,
    ) {
        let path = self.resolve_path(src);
        let bytes = match self.buffer_cache.load(self.resolver, &path) {
            Ok(b) => b,
            Err(e) => {
                self.errors.push(CompileError::read(
                    format!("failed to read <let src=\"{}\">: {}", src, e),
                    Some(el.span),
                    self.source_path.clone(),
                ));
                return;
            }
        };
        let text = String::from_utf8_lossy(&bytes).to_string();
        match parse_typed(&text, type_name) {
            Ok(value) => self.bind_let(name, value, el, ctx),
            Err(msg) => self.errors.push(CompileError::read(
                msg,
                Some(el.span),
                self.source_path.clone(),
            )),
        }
    }

    fn bind_let(&mut self, name: Option<String>, value: Value, el: &Element, ctx: &mut Context) {
        match (name, &value) {
            (Some(name), _) => ctx.set_global(name, value),
            (None, Value::Object(map)) => {
                let mut merged: BTreeMap<String, Value> = BTreeMap::new();
                merged.extend(map.clone());
                ctx.merge_object_into_globals(merged);
            }
            (None, _) => self.errors.push(CompileError::read(
                "<let> without a name requires an object value to merge",
                Some(el.span),
                self.source_path.clone(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ReadOptions;
    use crate::resolver::FsResolver;

    #[test]
    fn parse_typed_covers_each_scalar_kind() {
        assert_eq!(parse_typed("hi", "string").unwrap(), Value::String("hi".to_string()));
        assert_eq!(parse_typed("42", "integer").unwrap(), Value::Number(42.0));
        assert_eq!(parse_typed("1.5", "float").unwrap(), Value::Number(1.5));
        assert_eq!(parse_typed("true", "boolean").unwrap(), Value::Bool(true));
        assert_eq!(parse_typed("anything", "null").unwrap(), Value::Null);
    }

    #[test]
    fn parse_typed_rejects_malformed_numbers_and_booleans() {
        assert!(parse_typed("nope", "integer").is_err());
        assert!(parse_typed("nope", "float").is_err());
        assert!(parse_typed("nope", "boolean").is_err());
        assert!(parse_typed("x", "not-a-type").is_err());
    }

    #[test]
    fn parse_typed_auto_parses_json_containers() {
        let v = parse_typed(r#"{"a": 1}"#, "auto").unwrap();
        match v {
            Value::Object(map) => assert_eq!(map.get("a"), Some(&Value::Number(1.0))),
            other => panic!("expected object, got {:?}", other),
        }
    }

    fn read_with_global(poml_source: &str, global_name: &str) -> Value {
        let mut ctx = Context::new();
        let outcome = crate::reader::read(
            poml_source,
            None,
            &ReadOptions::default(),
            &mut ctx,
            &FsResolver,
        );
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors.iter().collect::<Vec<_>>());
        ctx.get(global_name).cloned().unwrap_or(Value::Null)
    }

    #[test]
    fn let_value_binds_an_evaluated_expression_globally() {
        let v = read_with_global(r#"<poml><let name="x" value="1 + 2" /></poml>"#, "x");
        assert_eq!(v, Value::Number(3.0));
    }

    #[test]
    fn let_inline_text_is_parsed_per_type_attribute() {
        let v = read_with_global(r#"<poml><let name="n" type="integer">7</let></poml>"#, "n");
        assert_eq!(v, Value::Number(7.0));
    }

    #[test]
    fn let_without_a_name_merges_an_object_value_into_globals() {
        let mut ctx = Context::new();
        let outcome = crate::reader::read(
            r#"<poml><let type="object">{"a": 1, "b": 2}</let></poml>"#,
            None,
            &ReadOptions::default(),
            &mut ctx,
            &FsResolver,
        );
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors.iter().collect::<Vec<_>>());
        assert_eq!(ctx.get("a"), Some(&Value::Number(1.0)));
        assert_eq!(ctx.get("b"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn let_without_a_name_and_a_scalar_value_is_an_error() {
        let mut ctx = Context::new();
        let outcome = crate::reader::read(
            r#"<poml><let value="1" /></poml>"#,
            None,
            &ReadOptions::default(),
            &mut ctx,
            &FsResolver,
        );
        assert_eq!(outcome.errors.iter().count(), 1);
    }

    #[test]
    fn let_src_reads_a_typed_value_from_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, "99").unwrap();
        let source = format!(r#"<poml><let name="n" type="integer" src="{}" /></poml>"#, path.display());
        let v = read_with_global(&source, "n");
        assert_eq!(v, Value::Number(99.0));
    }
}
