//! `<include src="...">` (`spec.md` §4.3 item 5).

use crate::ast::{self, Node};
use crate::error::CompileError;
use crate::ir::IrNode;
use crate::reader::Reader;
use crate::value::Context;

impl Reader<'_> {
    pub(crate) fn handle_include(&mut self, el: &ast::Element, ctx: &mut Context) -> Vec<IrNode> {
        let Some(src) = el.attr("src") else {
            self.errors.push(CompileError::read(
                "<include> requires a src attribute",
                Some(el.span),
                self.source_path.clone(),
            ));
            return Vec::new();
        };
        let path = self.resolve_path(src);
        let bytes = match self.buffer_cache.load(self.resolver, &path) {
            Ok(b) => b,
            Err(e) => {
                self.errors.push(CompileError::read(
                    format!("failed to read <include src=\"{}\">: {}", src, e),
                    Some(el.span),
                    self.source_path.clone(),
                ));
                return Vec::new();
            }
        };
        let text = String::from_utf8_lossy(&bytes).to_string();
        let parsed = ast::parse(&text);
        for err in parsed.errors {
            self.errors.push(err);
        }

        // A nested reader shares the current global context, disabled-set,
        // and schema accumulator, but tracks its own source path for
        // diagnostics (`spec.md` §4.3: "construct a nested reader with same
        // options and the included file's path").
        let previous_path = self.source_path.clone();
        self.source_path = Some(path);

        let out = match &parsed.root {
            Node::Element(e) if e.tag == "poml" => {
                let mut nodes = Vec::new();
                for child in &e.children {
                    nodes.extend(self.read_node(child, ctx));
                }
                nodes
            }
            other => self.read_node(other, ctx),
        };

        self.source_path = previous_path;
        out
    }
}
