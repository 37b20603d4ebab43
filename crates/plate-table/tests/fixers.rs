mod support;

use gpui_plate_table::{AttrPatch, Attrs, EditorConfig, ElementKind, Node, Op, Transaction};
use serde_json::json;
use support::{
    caret_in, cell, editor_with, editor_with_config, render, table, table_of, table_with_headings,
};

#[test]
fn short_rows_are_padded_with_blank_cells() {
    let editor = editor_with(table(&[&["a", "b"], &["c"]]));
    assert_eq!(
        render(table_of(editor.doc())),
        vec![vec!["a", "b"], vec!["c", ""]]
    );
}

#[test]
fn rowspan_past_the_last_row_is_trimmed() {
    let editor = editor_with(table(&[&["a|r3", "b"], &["c"]]));
    assert_eq!(
        render(table_of(editor.doc())),
        vec![vec!["a|r2", "b"], vec!["c"]]
    );
}

#[test]
fn rowspan_does_not_leave_the_heading_section() {
    let editor = editor_with(table_with_headings(&[&["a|r2", "b"], &["c"]], 1, 0));
    assert_eq!(
        render(table_of(editor.doc())),
        vec![vec!["a", "b"], vec!["c", ""]]
    );
}

#[test]
fn colspan_is_split_at_the_heading_column_boundary() {
    let editor = editor_with(table_with_headings(&[&["a|c2"], &["b", "c"]], 0, 1));
    assert_eq!(
        render(table_of(editor.doc())),
        vec![vec!["a", ""], vec!["b", "c"]]
    );
}

#[test]
fn rows_without_slots_are_removed() {
    let editor = editor_with(table(&[&["a"], &[], &["b"]]));
    assert_eq!(render(table_of(editor.doc())), vec![vec!["a"], vec!["b"]]);
}

#[test]
fn table_without_rows_gets_a_single_cell() {
    let editor = editor_with(Node::element(ElementKind::Table, Attrs::new(), Vec::new()));
    assert_eq!(render(table_of(editor.doc())), vec![vec![""]]);
}

#[test]
fn cells_get_block_content() {
    let cells = vec![
        Node::element(ElementKind::TableCell, Attrs::new(), Vec::new()),
        Node::element(
            ElementKind::TableCell,
            Attrs::new(),
            vec![Node::text("x"), Node::text("y"), Node::paragraph("z")],
        ),
    ];
    let table = Node::element(
        ElementKind::Table,
        Attrs::new(),
        vec![Node::element(ElementKind::TableRow, Attrs::new(), cells)],
    );
    let editor = editor_with(table);

    let row = table_of(editor.doc()).children[0].as_element().unwrap();
    let empty = row.children[0].as_element().unwrap();
    assert_eq!(empty.children, vec![Node::paragraph("")]);

    let wrapped = row.children[1].as_element().unwrap();
    assert_eq!(wrapped.children.len(), 2);
    let first = wrapped.children[0].element_of(ElementKind::Paragraph).unwrap();
    assert_eq!(first.text_content(), "xy");
    assert_eq!(wrapped.children[1], Node::paragraph("z"));
}

#[test]
fn broken_table_is_repaired_after_a_change() {
    let mut editor = editor_with(table(&[&["a", "b"], &["c", "d"]]));
    editor.change(|writer| writer.remove(vec![0, 1, 1])).unwrap();

    assert_eq!(
        render(table_of(editor.doc())),
        vec![vec!["a", "b"], vec!["c", ""]]
    );
}

#[test]
fn default_cell_properties_apply_to_new_cells_only() {
    let mut config = EditorConfig::default();
    config
        .table
        .default_cell_properties
        .insert("border_style".to_string(), json!("solid"));
    config
        .table
        .default_cell_properties
        .insert("colspan".to_string(), json!(3));
    let mut editor = editor_with_config(table(&[&["a"]]), config);
    caret_in(&mut editor, 0, 0);
    editor.run_command("table.insert_row_below", None).unwrap();

    let table = table_of(editor.doc());
    assert_eq!(render(table), vec![vec!["a"], vec![""]]);
    let old = table.children[0].as_element().unwrap().children[0].as_element().unwrap();
    let new = table.children[1].as_element().unwrap().children[0].as_element().unwrap();
    assert!(old.attrs.is_empty());
    assert_eq!(new.attrs.get("border_style"), Some(&json!("solid")));
    assert!(!new.attrs.contains_key("colspan"));
}

#[test]
fn default_cell_properties_follow_cells_moved_by_the_layout_fix() {
    let mut config = EditorConfig::default();
    config
        .table
        .default_cell_properties
        .insert("style".to_string(), json!("x"));
    let mut editor = editor_with_config(table(&[&["a|c2"], &["b", "c"]]), config);
    editor
        .apply(Transaction::new(vec![
            Op::SetNodeAttrs {
                path: vec![0],
                patch: AttrPatch::set("heading_columns", 1),
            },
            Op::InsertNode {
                path: vec![0, 0, 1],
                node: cell("n1"),
            },
            Op::InsertNode {
                path: vec![0, 1, 2],
                node: cell("n2"),
            },
        ]))
        .unwrap();

    let table = table_of(editor.doc());
    assert_eq!(render(table), vec![vec!["a", "", "n1"], vec!["b", "c", "n2"]]);
    let attrs = |row: usize, ix: usize| {
        table.children[row].as_element().unwrap().children[ix]
            .as_element()
            .unwrap()
            .attrs
            .clone()
    };
    assert_eq!(attrs(0, 2).get("style"), Some(&json!("x")));
    assert_eq!(attrs(1, 2).get("style"), Some(&json!("x")));
    assert!(attrs(0, 0).get("style").is_none());
    assert!(attrs(1, 0).get("style").is_none());
    assert!(attrs(1, 1).get("style").is_none());
}
