//! Table fixtures in a compact notation.
//!
//! A table is a list of rows, a row a list of cells. A cell is written as its text followed by
//! optional `|rN` (rowspan) and `|cN` (colspan) parts: `"a"`, `"a|c2"`, `"a|r2|c3"`. Rendering
//! uses the same notation with the rowspan before the colspan.

#![allow(dead_code)]

use gpui_plate_table::table::{COLSPAN, HEADING_COLUMNS, HEADING_ROWS, ROWSPAN, colspan, rowspan};
use gpui_plate_table::{
    Attrs, Document, Editor, EditorConfig, ElementKind, ElementNode, Node, Path, Point, Selection,
    Writer,
};
use serde_json::json;

pub fn cell(spec: &str) -> Node {
    let mut parts = spec.split('|');
    let text = parts.next().unwrap_or_default();
    let mut attrs = Attrs::new();
    for part in parts {
        let (key, value) = part.split_at(1);
        let span: usize = value.parse().expect("span must be a number");
        let key = match key {
            "c" => COLSPAN,
            "r" => ROWSPAN,
            other => panic!("unknown cell part {other:?}"),
        };
        attrs.insert(key.to_string(), json!(span));
    }
    Node::element(ElementKind::TableCell, attrs, vec![Node::paragraph(text)])
}

pub fn row(cells: &[&str]) -> Node {
    Node::element(
        ElementKind::TableRow,
        Attrs::new(),
        cells.iter().map(|spec| cell(spec)).collect(),
    )
}

pub fn table(rows: &[&[&str]]) -> Node {
    table_with_headings(rows, 0, 0)
}

pub fn table_with_headings(rows: &[&[&str]], heading_rows: usize, heading_columns: usize) -> Node {
    let mut attrs = Attrs::new();
    if heading_rows > 0 {
        attrs.insert(HEADING_ROWS.to_string(), json!(heading_rows));
    }
    if heading_columns > 0 {
        attrs.insert(HEADING_COLUMNS.to_string(), json!(heading_columns));
    }
    Node::element(
        ElementKind::Table,
        attrs,
        rows.iter().map(|cells| row(cells)).collect(),
    )
}

/// A document holding `table` at `[0]` followed by an empty paragraph.
pub fn doc_with(table: Node) -> Document {
    Document {
        children: vec![table, Node::paragraph("")],
    }
}

/// An editor with the table plugin over [`doc_with`], caret in the first cell.
pub fn editor_with(table: Node) -> Editor {
    editor_with_config(table, EditorConfig::default())
}

pub fn editor_with_config(table: Node, config: EditorConfig) -> Editor {
    let selection = Selection::collapsed(Point::new(vec![0, 0, 0, 0], 0));
    Editor::with_config(doc_with(table), selection, config)
}

pub fn table_of(doc: &Document) -> &ElementNode {
    table_at(doc, &[0])
}

pub fn table_at<'a>(doc: &'a Document, path: &[usize]) -> &'a ElementNode {
    let (first, rest) = path.split_first().expect("table path");
    let mut node = &doc.children[*first];
    for ix in rest {
        node = &node.as_element().expect("element").children[*ix];
    }
    node.element_of(ElementKind::Table).expect("table")
}

/// Path of a cell in the table at `[0]`.
pub fn cell_path(row: usize, cell: usize) -> Path {
    vec![0, row, cell]
}

pub fn caret_in(editor: &mut Editor, row: usize, cell: usize) {
    editor.set_selection(Selection::collapsed(Point::new(vec![0, row, cell, 0], 0)));
}

pub fn select_cells(editor: &mut Editor, cells: &[(usize, usize)]) {
    let paths: Vec<Path> = cells.iter().map(|&(row, cell)| cell_path(row, cell)).collect();
    editor.set_selection(Selection::on_elements(&paths));
}

/// Runs `f` on a writer over `doc`. Mutations land in `doc` directly; no fixers run.
pub fn mutate<T>(doc: &mut Document, f: impl FnOnce(&mut Writer<'_>) -> T) -> T {
    let mut writer = Writer::new(doc);
    f(&mut writer)
}

pub fn render_cell(cell: &ElementNode) -> String {
    let mut out = cell.text_content();
    if rowspan(cell) > 1 {
        out.push_str(&format!("|r{}", rowspan(cell)));
    }
    if colspan(cell) > 1 {
        out.push_str(&format!("|c{}", colspan(cell)));
    }
    out
}

/// The table's rows in fixture notation. Non-row children are left out.
pub fn render(table: &ElementNode) -> Vec<Vec<String>> {
    table
        .children
        .iter()
        .filter_map(|row| row.element_of(ElementKind::TableRow))
        .map(|row| {
            row.children
                .iter()
                .filter_map(Node::as_element)
                .map(render_cell)
                .collect()
        })
        .collect()
}

pub fn heading_counts(table: &ElementNode) -> (usize, usize) {
    (
        gpui_plate_table::table::heading_rows(table),
        gpui_plate_table::table::heading_columns(table),
    )
}
