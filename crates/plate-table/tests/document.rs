mod support;

use gpui_plate_table::{
    ApplyError, Attrs, ChangeSet, Document, Editor, ElementKind, EditorConfig, Node, NormalizePass,
    Op, PlatePlugin, PlateValue, PluginRegistry, Point, Selection, Transaction, ValueError, Writer,
};
use serde_json::json;
use support::{doc_with, render, table, table_at};

#[test]
fn nodes_serialize_as_tagged_json() {
    let value = serde_json::to_value(Node::paragraph("a")).unwrap();
    assert_eq!(
        value,
        json!({
            "node": "element",
            "kind": "paragraph",
            "attrs": {},
            "children": [{ "node": "text", "text": "a" }]
        })
    );

    let row: Node = serde_json::from_value(json!({
        "node": "element",
        "kind": "table_row",
        "children": [{ "node": "element", "kind": "table_cell" }]
    }))
    .unwrap();
    assert!(row.element_of(ElementKind::TableRow).is_some());
}

#[test]
fn plate_value_keeps_the_document() {
    let doc = doc_with(table(&[&["a|c2"], &["b", "c"]]));
    let json = PlateValue::from_document(doc.clone()).to_json_pretty().unwrap();
    let value = PlateValue::from_json_str(&json).unwrap();

    assert_eq!(value.version, 1);
    assert_eq!(value.into_document(), doc);
}

#[test]
fn plate_value_rejects_foreign_envelopes() {
    let err = PlateValue::from_json_str(r#"{ "schema": "other", "document": {} }"#).unwrap_err();
    assert!(matches!(err, ValueError::Schema { .. }));

    let err = PlateValue::from_json_str(r#"{ "version": 9, "document": {} }"#).unwrap_err();
    assert!(matches!(err, ValueError::Version { found: 9 }));

    let err = PlateValue::from_json_str("{").unwrap_err();
    assert!(matches!(err, ValueError::Json(_)));

    let value = PlateValue::from_json_str(r#"{ "document": { "children": [] } }"#).unwrap();
    assert!(value.document.children.is_empty());
}

#[test]
fn empty_document_gets_a_paragraph() {
    let mut editor = Editor::with_core_plugins();
    editor
        .apply(Transaction::new(vec![Op::RemoveNode { path: vec![0] }]).source("test"))
        .unwrap();

    assert_eq!(editor.doc().children, vec![Node::paragraph("")]);
    assert_eq!(editor.selection().focus().unwrap().path, vec![0]);
}

#[test]
fn failed_transaction_changes_nothing() {
    let mut editor = Editor::with_table_plugins();
    let before = editor.doc().clone();
    let err = editor
        .apply(Transaction::new(vec![
            Op::InsertNode {
                path: vec![1],
                node: Node::paragraph("x"),
            },
            Op::RemoveNode { path: vec![7] },
        ]))
        .unwrap_err();

    assert!(matches!(err, ApplyError::InvalidPath(_)));
    assert_eq!(editor.doc(), &before);
}

#[test]
fn selection_follows_inserted_blocks() {
    let mut editor = Editor::with_table_plugins();
    assert!(editor.selection().is_collapsed());
    editor
        .apply(Transaction::new(vec![Op::InsertNode {
            path: vec![0],
            node: Node::paragraph("first"),
        }]))
        .unwrap();
    assert_eq!(editor.selection().focus().unwrap().path, vec![1]);

    let caret = Selection::collapsed(Point::new(vec![0, 0], 2));
    editor
        .apply(Transaction::new(Vec::new()).selection_after(caret.clone()))
        .unwrap();
    assert_eq!(editor.selection(), &caret);
}

#[test]
fn raw_table_insert_is_repaired() {
    let mut editor = Editor::with_table_plugins();
    editor
        .change(|writer| writer.insert_element(ElementKind::Table, Attrs::new(), vec![1]))
        .unwrap();

    assert_eq!(render(table_at(editor.doc(), &[1])), vec![vec![""]]);
}

struct Grow;

impl NormalizePass for Grow {
    fn id(&self) -> &'static str {
        "test.grow"
    }

    fn run(&self, writer: &mut Writer<'_>, _changes: &ChangeSet) -> Result<bool, ApplyError> {
        writer.insert(vec![0], Node::paragraph(""))?;
        Ok(true)
    }
}

struct GrowPlugin;

impl PlatePlugin for GrowPlugin {
    fn id(&self) -> &'static str {
        "test.grow"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(Grow)]
    }
}

#[test]
fn fixers_that_never_settle_abort_the_batch() {
    let registry = PluginRegistry::new([Box::new(GrowPlugin) as Box<dyn PlatePlugin>]).unwrap();
    let doc = Document {
        children: vec![Node::paragraph("")],
    };
    let selection = Selection::collapsed(Point::new(vec![0], 0));
    let mut editor = Editor::new(doc.clone(), selection, registry);
    assert_eq!(editor.doc(), &doc);

    let err = editor
        .apply(Transaction::new(vec![Op::InsertNode {
            path: vec![1],
            node: Node::paragraph("x"),
        }]))
        .unwrap_err();
    assert_eq!(err, ApplyError::NormalizeDidNotConverge);
    assert_eq!(editor.doc(), &doc);
}

#[test]
fn duplicate_plugins_are_rejected() {
    let plugins: Vec<Box<dyn PlatePlugin>> = vec![Box::new(GrowPlugin), Box::new(GrowPlugin)];
    assert!(PluginRegistry::new(plugins).is_err());
}

#[test]
fn table_commands_are_registered_with_metadata() {
    let editor = Editor::with_table_plugins();
    let registry = editor.registry();

    assert_eq!(registry.commands().len(), 14);
    assert_eq!(registry.queries().len(), 8);
    let insert = registry.command("table.insert").unwrap();
    assert_eq!(insert.label, "Insert table");
    assert!(insert.description.is_some());
    assert!(insert.keywords.iter().any(|k| k == "table"));
    assert!(insert.args_example.is_some());
    assert_eq!(editor.config().max_normalize_iterations, 100);
}

#[test]
fn config_supplies_default_headings() {
    let config = EditorConfig::from_json_str(
        r#"{ "table": { "default_headings": { "rows": 1, "columns": 1 } } }"#,
    )
    .unwrap();
    let doc = Document {
        children: vec![Node::paragraph("")],
    };
    let mut editor = Editor::with_config(doc, Selection::collapsed(Point::new(vec![0], 0)), config);
    editor.run_command("table.insert", None).unwrap();

    assert_eq!(editor.run_query::<usize>("table.heading_rows", None).unwrap(), 1);
    assert_eq!(editor.run_query::<usize>("table.heading_columns", None).unwrap(), 1);
}
