//! CSV/TSV writers: specialization of the table rendering that emits only
//! the first table in the subtree (`spec.md` §4.6).

use crate::error::CompileError;
use crate::ir::{IrElement, IrNode};

use super::table::{extract_table, find_first_table};
use crate::writer::{MappingNode, WriteOptions, WriteResult};

pub fn write(env: &IrElement, opts: &WriteOptions, errors: &mut Vec<CompileError>, sep: char) -> WriteResult {
    let root = IrNode::Element(env.clone());
    let Some(table_el) = find_first_table(&root) else {
        errors.push(CompileError::write("no <table> found for CSV/TSV output", None));
        return WriteResult::default();
    };
    let Some(table) = extract_table(table_el) else {
        errors.push(CompileError::write("malformed <table> structure", None));
        return WriteResult::default();
    };

    let dialect = opts.csv_dialect;
    let mut out = String::new();
    if dialect.bom {
        out.push('\u{FEFF}');
    }

    let mut lines = Vec::new();
    if !table.header.is_empty() {
        lines.push(encode_row(&table.header, sep));
    }
    for row in &table.rows {
        lines.push(encode_row(row, sep));
    }
    out.push_str(&lines.join(dialect.line_ending.as_str()));

    let out_end = out.len();
    WriteResult {
        mappings: vec![MappingNode::from_element(table_el, 0, out_end)],
        output: out,
        multimedia: Vec::new(),
    }
}

fn encode_row(cells: &[String], sep: char) -> String {
    cells.iter().map(|c| encode_cell(c, sep)).collect::<Vec<_>>().join(&sep.to_string())
}

fn encode_cell(cell: &str, sep: char) -> String {
    if cell.contains(sep) || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
