//! XML serialize writer (`spec.md` §4.6). Slugifies tag names: any
//! character outside `[A-Za-z0-9_.-]` becomes `-`, and a name starting with
//! a digit or the reserved `xml` prefix is given a `_` prefix.

use crate::value::Value;

pub fn to_string(value: &Value, root_name: &str) -> String {
    let mut out = String::new();
    write_node(&mut out, &slugify(root_name), value, 0);
    out
}

fn write_node(out: &mut String, tag: &str, value: &Value, depth: usize) {
    let pad = "  ".repeat(depth);
    match value {
        Value::Object(map) => {
            out.push_str(&format!("{}<{}>\n", pad, tag));
            for (k, v) in map {
                write_node(out, &slugify(k), v, depth + 1);
            }
            out.push_str(&format!("{}</{}>\n", pad, tag));
        }
        Value::Array(items) => {
            for item in items {
                write_node(out, tag, item, depth);
            }
        }
        Value::Null => out.push_str(&format!("{}<{}/>\n", pad, tag)),
        scalar => out.push_str(&format!(
            "{}<{}>{}</{}>\n",
            pad,
            tag,
            escape(&scalar.to_display_string()),
            tag
        )),
    }
}

fn slugify(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '-' })
        .collect();
    if out.is_empty() {
        return "field".to_string();
    }
    let starts_with_digit = out.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false);
    let starts_with_xml = out.to_ascii_lowercase().starts_with("xml");
    if starts_with_digit || starts_with_xml {
        out = format!("_{}", out);
    }
    out
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
