//! `<meta>` handling (`spec.md` §4.3 item 4): version constraints,
//! component enable/disable, and schema/tool/runtime accumulation. Emits no
//! IR; mutates compile-time state only.

use crate::ast::Element;
use crate::error::CompileError;
use crate::jsonbuf;
use crate::reader::Reader;
use crate::registry::parse_components_directive;
use crate::schema::{ResponseSchema, ToolDefinition};
use crate::value::Value;

const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

impl Reader<'_> {
    pub(crate) fn handle_meta(&mut self, el: &Element) {
        if let Some(components) = el.attr("components") {
            let disabled = parse_components_directive(components);
            self.disabled_components.extend(disabled);
        }

        if let Some(min) = el.attr("minVersion") {
            self.check_version_bound(el, min, true);
        }
        if let Some(max) = el.attr("maxVersion") {
            self.check_version_bound(el, max, false);
        }

        match el.attr("type") {
            Some("responseSchema") => self.handle_response_schema(el),
            Some("tool") => self.handle_tool(el),
            Some("runtime") => self.handle_runtime(el),
            Some(other) => {
                log::debug!("ignoring unrecognized <meta type=\"{}\">", other);
            }
            None => {}
        }
    }

    /// `spec.md` §9 Open Question: treated as a warning, never a hard
    /// failure ("match observed behavior").
    fn check_version_bound(&mut self, el: &Element, bound: &str, is_min: bool) {
        let ok = match (parse_version(CURRENT_VERSION), parse_version(bound)) {
            (Some(current), Some(bound_v)) => {
                if is_min {
                    current >= bound_v
                } else {
                    current <= bound_v
                }
            }
            _ => true,
        };
        if !ok {
            self.errors.push(CompileError::warning(
                format!(
                    "document requires {} {} but compiler is {}",
                    if is_min { "minVersion" } else { "maxVersion" },
                    bound,
                    CURRENT_VERSION
                ),
                Some(el.span),
                self.source_path.clone(),
            ));
        }
    }

    fn handle_response_schema(&mut self, el: &Element) {
        let schema = match el.attr("schema") {
            Some(raw) => jsonbuf::parse_str(raw).unwrap_or(Value::Null),
            None => Value::Null,
        };
        self.schema.response_schema = Some(ResponseSchema {
            name: el.attr("name").map(str::to_string),
            description: el.attr("description").map(str::to_string),
            schema,
        });
    }

    fn handle_tool(&mut self, el: &Element) {
        let Some(name) = el.attr("name") else {
            self.errors.push(CompileError::read(
                "<meta type=\"tool\"> requires a name attribute",
                Some(el.span),
                self.source_path.clone(),
            ));
            return;
        };
        let parameters = match el.attr("parameters") {
            Some(raw) => jsonbuf::parse_str(raw).unwrap_or(Value::Null),
            None => Value::Null,
        };
        self.schema.tools.push(ToolDefinition {
            name: name.to_string(),
            description: el.attr("description").map(str::to_string),
            parameters,
        });
    }

    fn handle_runtime(&mut self, el: &Element) {
        for attr in &el.attributes {
            if attr.name == "type" {
                continue;
            }
            self.schema
                .runtime
                .0
                .insert(attr.name.clone(), Value::String(attr.value.clone()));
        }
    }
}

/// Minimal `major.minor.patch` comparator; unparsable versions are treated
/// as compatible (never block the compile).
fn parse_version(text: &str) -> Option<(u32, u32, u32)> {
    let mut parts = text.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().unwrap_or("0").parse().unwrap_or(0);
    let patch = parts.next().unwrap_or("0").parse().unwrap_or(0);
    Some((major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{self, ReadOptions};
    use crate::resolver::FsResolver;
    use crate::value::Context;

    fn read_doc(source: &str) -> reader::ReadOutcome {
        let mut ctx = Context::new();
        reader::read(source, None, &ReadOptions::default(), &mut ctx, &FsResolver)
    }

    #[test]
    fn parse_version_accepts_a_short_form_and_defaults_missing_parts() {
        assert_eq!(parse_version("1.2.3"), Some((1, 2, 3)));
        assert_eq!(parse_version("2"), Some((2, 0, 0)));
        assert_eq!(parse_version("not-a-version"), None);
    }

    #[test]
    fn components_directive_disables_a_tag_for_the_rest_of_the_document() {
        let outcome = read_doc(r#"<poml><meta components="-p" /><p>hi</p></poml>"#);
        assert_eq!(outcome.errors.iter().count(), 1);
        assert!(outcome.errors.iter().next().unwrap().message.contains("disabled"));
    }

    #[test]
    fn an_unsatisfiable_min_version_is_recorded_as_a_warning_not_a_hard_error() {
        let outcome = read_doc(r#"<poml><meta minVersion="999.0.0" /></poml>"#);
        assert!(!outcome.errors.is_empty());
        assert!(!outcome.errors.has_hard_errors());
    }

    #[test]
    fn response_schema_meta_is_captured_on_the_schema_accumulator() {
        let outcome = read_doc(
            r#"<poml><meta type="responseSchema" name="Answer" schema='{"type": "string"}' /></poml>"#,
        );
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors.iter().collect::<Vec<_>>());
        let schema = outcome.schema.response_schema.expect("schema recorded");
        assert_eq!(schema.name.as_deref(), Some("Answer"));
    }

    #[test]
    fn tool_meta_without_a_name_is_a_read_error() {
        let outcome = read_doc(r#"<poml><meta type="tool" /></poml>"#);
        assert_eq!(outcome.errors.iter().count(), 1);
    }

    #[test]
    fn tool_meta_appends_to_the_tool_list() {
        let outcome = read_doc(r#"<poml><meta type="tool" name="search" /></poml>"#);
        assert_eq!(outcome.schema.tools.len(), 1);
        assert_eq!(outcome.schema.tools[0].name, "search");
    }

    #[test]
    fn runtime_meta_captures_every_attribute_except_type() {
        let outcome = read_doc(r#"<poml><meta type="runtime" model="gpt" temperature="0.2" /></poml>"#);
        assert!(outcome.schema.runtime.0.contains_key("model"));
        assert!(outcome.schema.runtime.0.contains_key("temperature"));
        assert!(!outcome.schema.runtime.0.contains_key("type"));
    }
}
