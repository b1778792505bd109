//! Shared table-structure extraction used by the Markdown/HTML box-model
//! writers and the CSV/TSV specialized writers (`spec.md` §4.6).

use crate::ir::{IrElement, IrNode, IrTag};

pub struct TableData {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Walk a `<table>` subtree and flatten it into a header row plus body
/// rows of plain cell text (concatenation of each `<tcell>`'s text
/// descendants). Returns `None` if no `<table>` is found.
pub fn extract_table(table_el: &IrElement) -> Option<TableData> {
    if table_el.tag != IrTag::Table {
        return None;
    }
    let mut header = Vec::new();
    let mut rows = Vec::new();
    for child in &table_el.children {
        let IrNode::Element(section) = child else { continue };
        match section.tag {
            IrTag::Thead => {
                if let Some(row) = section.children.iter().find_map(as_row) {
                    header = row_cells(row);
                }
            }
            IrTag::Tbody => {
                for child in &section.children {
                    if let IrNode::Element(row) = child {
                        if row.tag == IrTag::Trow {
                            rows.push(row_cells(row));
                        }
                    }
                }
            }
            IrTag::Trow => rows.push(row_cells(section)),
            _ => {}
        }
    }
    Some(TableData { header, rows })
}

/// Find the first `<table>` in a subtree (CSV/TSV writers render only the
/// first table, per `spec.md` §4.6).
pub fn find_first_table(node: &IrNode) -> Option<&IrElement> {
    match node {
        IrNode::Element(el) if el.tag == IrTag::Table => Some(el),
        IrNode::Element(el) => el.children.iter().find_map(find_first_table),
        IrNode::Text(_) => None,
    }
}

fn as_row(node: &IrNode) -> Option<&IrElement> {
    match node {
        IrNode::Element(el) if el.tag == IrTag::Trow => Some(el),
        _ => None,
    }
}

fn row_cells(row: &IrElement) -> Vec<String> {
    row.children
        .iter()
        .filter_map(|c| match c {
            IrNode::Element(cell) if cell.tag == IrTag::Tcell => Some(cell_text(cell)),
            _ => None,
        })
        .collect()
}

fn cell_text(cell: &IrElement) -> String {
    let mut out = String::new();
    for child in &cell.children {
        match child {
            IrNode::Text(t) => out.push_str(&t.text),
            IrNode::Element(e) => out.push_str(&cell_text(e)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    fn text(s: &str) -> IrNode {
        IrNode::Text(crate::ir::IrText { text: s.to_string(), span: Span::empty_at(0) })
    }

    fn cell(s: &str) -> IrNode {
        let mut el = IrElement::new(IrTag::Tcell);
        el.children.push(text(s));
        IrNode::Element(el)
    }

    fn row(cells: Vec<&str>) -> IrNode {
        let mut el = IrElement::new(IrTag::Trow);
        el.children = cells.into_iter().map(cell).collect();
        IrNode::Element(el)
    }

    #[test]
    fn extracts_header_and_body_rows() {
        let mut thead = IrElement::new(IrTag::Thead);
        thead.children.push(row(vec!["A", "B"]));
        let mut tbody = IrElement::new(IrTag::Tbody);
        tbody.children.push(row(vec!["1", "2"]));
        tbody.children.push(row(vec!["3", "4"]));

        let mut table = IrElement::new(IrTag::Table);
        table.children.push(IrNode::Element(thead));
        table.children.push(IrNode::Element(tbody));

        let data = extract_table(&table).unwrap();
        assert_eq!(data.header, vec!["A", "B"]);
        assert_eq!(data.rows, vec![vec!["1", "2"], vec!["3", "4"]]);
    }

    #[test]
    fn non_table_element_yields_none() {
        let el = IrElement::new(IrTag::P);
        assert!(extract_table(&el).is_none());
    }

    #[test]
    fn find_first_table_recurses_into_children() {
        let table = IrElement::new(IrTag::Table);
        let mut wrapper = IrElement::new(IrTag::Env);
        wrapper.children.push(IrNode::Element(table));
        let node = IrNode::Element(wrapper);
        assert!(find_first_table(&node).is_some());
    }

    #[test]
    fn cell_text_concatenates_nested_text() {
        let mut inner = IrElement::new(IrTag::B);
        inner.children.push(text("bold"));
        let mut tcell = IrElement::new(IrTag::Tcell);
        tcell.children.push(text("plain "));
        tcell.children.push(IrNode::Element(inner));
        assert_eq!(cell_text(&tcell), "plain bold");
    }
}
