use serde_json::{Value, json};

use crate::config::{DefaultHeadings, TableConfig};
use crate::core::{Document, Editor, ElementKind, Node, Point, Selection, node_ref};
use crate::ops::Path;
use crate::plugin::{CommandError, CommandSpec, QueryError, QuerySpec};

use super::clipboard::{can_paste, paste_table};
use super::selection::{
    get_selected_table_cells, get_selection_affected_table_cells, is_selection_rectangular,
};
use super::utils::{
    CreateTableOptions, InsertColumnsOptions, InsertRowsOptions, RemoveColumnsOptions,
    RemoveRowsOptions, cell_at_slot, create_table, get_cell_location, get_column_indexes,
    get_columns, get_row_indexes, get_rows, insert_columns, insert_rows, merge_cells,
    remove_columns, remove_rows, set_heading_columns, set_heading_rows, split_cell_horizontally,
    split_cell_vertically,
};
use super::{
    find_ancestor, heading_columns, heading_rows, split_cell_path, table_at, table_snapshot,
};

const MAX_INSERT_SIZE: u64 = 32;

fn arg_u64(args: &Option<Value>, key: &str) -> Option<u64> {
    args.as_ref().and_then(|v| v.get(key)).and_then(Value::as_u64)
}

fn arg_bool(args: &Option<Value>, key: &str) -> Option<bool> {
    args.as_ref().and_then(|v| v.get(key)).and_then(Value::as_bool)
}

fn focus_path(editor: &Editor) -> Path {
    editor
        .selection()
        .focus()
        .map(|point| point.path.clone())
        .unwrap_or_default()
}

fn caret_in_cell(cell: &[usize]) -> Selection {
    let mut path = cell.to_vec();
    path.push(0);
    Selection::collapsed(Point::new(path, 0))
}

/// Cells the selection affects, with the path of their table.
fn affected_cells(editor: &Editor) -> Result<(Vec<Path>, Path), CommandError> {
    let cells = get_selection_affected_table_cells(editor.doc(), editor.selection());
    let Some(first) = cells.first() else {
        return Err(CommandError::new("Not in a table"));
    };
    let (table_path, _, _) = split_cell_path(first)?;
    let table_path = table_path.to_vec();
    Ok((cells, table_path))
}

fn focused_table(editor: &Editor) -> Option<Path> {
    let cells = get_selection_affected_table_cells(editor.doc(), editor.selection());
    if let Some(cell) = cells.first() {
        return split_cell_path(cell).ok().map(|(table, _, _)| table.to_vec());
    }
    find_ancestor(editor.doc(), &focus_path(editor), ElementKind::Table)
}

/// Closest text block at or above `path`.
fn focused_block(doc: &Document, path: &[usize]) -> Option<Path> {
    (1..=path.len()).rev().find_map(|len| {
        let candidate = &path[..len];
        node_ref(doc, candidate)
            .and_then(Node::as_element)
            .filter(|el| el.kind.is_text_block())
            .map(|_| candidate.to_vec())
    })
}

fn insert_table(editor: &mut Editor, options: CreateTableOptions) -> Result<(), CommandError> {
    let (parent, at) = match focused_block(editor.doc(), &focus_path(editor)) {
        Some(block) => match block.split_last() {
            Some((ix, parent)) => (parent.to_vec(), ix + 1),
            None => (Vec::new(), editor.doc().children.len()),
        },
        None => (Vec::new(), editor.doc().children.len()),
    };
    let mut table_path = parent.clone();
    table_path.push(at);
    let mut paragraph_path = parent;
    paragraph_path.push(at + 1);

    editor.change(|writer| {
        writer.insert(table_path.clone(), create_table(&options))?;
        writer.insert(paragraph_path, Node::paragraph(""))?;
        let mut first_cell = table_path;
        first_cell.extend([0, 0]);
        writer.set_selection(caret_in_cell(&first_cell));
        Ok::<_, CommandError>(())
    })
}

fn insert_row(editor: &mut Editor, above: bool) -> Result<(), CommandError> {
    let (cells, table_path) = affected_cells(editor)?;
    let Some(rows) = get_row_indexes(editor.doc(), &cells) else {
        return Ok(());
    };
    let options = InsertRowsOptions {
        at: if above { rows.first } else { rows.last + 1 },
        rows: 1,
        copy_structure_from_above: Some(!above),
    };
    editor.change(|writer| insert_rows(writer, &table_path, options).map_err(CommandError::from))
}

fn insert_column(editor: &mut Editor, left: bool) -> Result<(), CommandError> {
    let (cells, table_path) = affected_cells(editor)?;
    let Some(columns) = get_column_indexes(editor.doc(), &cells) else {
        return Ok(());
    };
    let options = InsertColumnsOptions {
        at: if left { columns.first } else { columns.last + 1 },
        columns: 1,
    };
    editor.change(|writer| insert_columns(writer, &table_path, options).map_err(CommandError::from))
}

fn remove_row(editor: &mut Editor) -> Result<(), CommandError> {
    let (cells, table_path) = affected_cells(editor)?;
    let table = table_at(editor.doc(), &table_path)?;
    let row_count = get_rows(table);
    let Some(rows) = get_row_indexes(editor.doc(), &cells) else {
        return Ok(());
    };
    if rows.first == 0 && rows.last + 1 >= row_count {
        return Err(CommandError::new("Cannot remove every row of a table"));
    }
    let focus_column = get_cell_location(editor.doc(), &cells[0])?.column;

    editor.change(|writer| {
        remove_rows(
            writer,
            &table_path,
            RemoveRowsOptions {
                at: rows.first,
                rows: rows.last - rows.first + 1,
            },
        )?;
        let table = table_snapshot(writer, &table_path)?;
        let row = rows.first.min(get_rows(&table).saturating_sub(1));
        if let Some(cell) = cell_at_slot(&table, &table_path, row, focus_column) {
            writer.set_selection(caret_in_cell(&cell));
        }
        Ok::<_, CommandError>(())
    })
}

fn remove_column(editor: &mut Editor) -> Result<(), CommandError> {
    let (cells, table_path) = affected_cells(editor)?;
    let table = table_at(editor.doc(), &table_path)?;
    let column_count = get_columns(table);
    let Some(columns) = get_column_indexes(editor.doc(), &cells) else {
        return Ok(());
    };
    if columns.last - columns.first + 1 >= column_count {
        return Err(CommandError::new("Cannot remove every column of a table"));
    }
    let focus_row = get_cell_location(editor.doc(), &cells[0])?.row;

    editor.change(|writer| {
        remove_columns(
            writer,
            &table_path,
            RemoveColumnsOptions {
                at: columns.first,
                columns: columns.last - columns.first + 1,
            },
        )?;
        let table = table_snapshot(writer, &table_path)?;
        let row = focus_row.min(get_rows(&table).saturating_sub(1));
        let column = columns.first.min(get_columns(&table).saturating_sub(1));
        if let Some(cell) = cell_at_slot(&table, &table_path, row, column) {
            writer.set_selection(caret_in_cell(&cell));
        }
        Ok::<_, CommandError>(())
    })
}

fn merge(editor: &mut Editor) -> Result<(), CommandError> {
    let cells = get_selected_table_cells(editor.doc(), editor.selection());
    if !is_selection_rectangular(editor.doc(), &cells) {
        tracing::warn!(cells = cells.len(), "merge refused: selection is not rectangular");
        return Ok(());
    }
    editor.change(|writer| {
        let first = merge_cells(writer, &cells)?;
        writer.set_selection(caret_in_cell(&first));
        Ok::<_, CommandError>(())
    })
}

fn split(editor: &mut Editor, args: &Option<Value>, vertically: bool) -> Result<(), CommandError> {
    let (cells, _) = affected_cells(editor)?;
    let cell = cells[0].clone();
    let count = arg_u64(args, "cells").unwrap_or(2) as usize;
    editor.change(|writer| {
        let result = if vertically {
            split_cell_vertically(writer, &cell, count)
        } else {
            split_cell_horizontally(writer, &cell, count)
        };
        result.map_err(CommandError::from)
    })
}

fn set_heading(editor: &mut Editor, args: &Option<Value>, rows: bool) -> Result<(), CommandError> {
    let (cells, table_path) = affected_cells(editor)?;
    let table = table_at(editor.doc(), &table_path)?;
    let (range, current) = if rows {
        (get_row_indexes(editor.doc(), &cells), heading_rows(table))
    } else {
        (get_column_indexes(editor.doc(), &cells), heading_columns(table))
    };
    let Some(range) = range else {
        return Ok(());
    };
    let mut in_heading = current > 0;
    for cell in &cells {
        let location = get_cell_location(editor.doc(), cell)?;
        let index = if rows { location.row } else { location.column };
        in_heading &= index < current;
    }
    if arg_bool(args, "value") == Some(in_heading) {
        return Ok(());
    }
    let count = if in_heading { range.first } else { range.last + 1 };

    editor.change(|writer| {
        let result = if rows {
            set_heading_rows(writer, &table_path, count)
        } else {
            set_heading_columns(writer, &table_path, count)
        };
        result.map_err(CommandError::from)
    })
}

fn delete_table(editor: &mut Editor) -> Result<(), CommandError> {
    let Some(table_path) = focused_table(editor) else {
        return Err(CommandError::new("Not in a table"));
    };
    editor.change(|writer| {
        writer.remove(table_path.clone())?;
        writer.insert(table_path.clone(), Node::paragraph(""))?;
        writer.set_selection(Selection::collapsed(Point::new(table_path, 0)));
        Ok::<_, CommandError>(())
    })
}

fn pasted_table(args: &Option<Value>) -> Result<crate::core::ElementNode, String> {
    let value = args
        .as_ref()
        .and_then(|v| v.get("table"))
        .cloned()
        .ok_or("Missing table argument")?;
    let node: Node = serde_json::from_value(value).map_err(|err| format!("Invalid table: {err}"))?;
    match node {
        Node::Element(table) if table.is(ElementKind::Table) => Ok(table),
        _ => Err("Pasted content is not a table".into()),
    }
}

fn paste(editor: &mut Editor, args: &Option<Value>) -> Result<(), CommandError> {
    let table = pasted_table(args).map_err(CommandError::new)?;
    let selection = editor.selection().clone();
    editor.change(|writer| {
        paste_table(writer, &selection, &table)?;
        Ok::<_, CommandError>(())
    })
}

pub(super) fn commands(config: &TableConfig) -> Vec<CommandSpec> {
    let DefaultHeadings {
        rows: default_heading_rows,
        columns: default_heading_columns,
    } = config.default_headings;

    vec![
        CommandSpec::new("table.insert", "Insert table", move |editor, args| {
            let options = CreateTableOptions {
                rows: arg_u64(&args, "rows").unwrap_or(2).clamp(1, MAX_INSERT_SIZE) as usize,
                columns: arg_u64(&args, "columns")
                    .or_else(|| arg_u64(&args, "cols"))
                    .unwrap_or(2)
                    .clamp(1, MAX_INSERT_SIZE) as usize,
                heading_rows: arg_u64(&args, "heading_rows")
                    .map_or(default_heading_rows, |n| n as usize),
                heading_columns: arg_u64(&args, "heading_columns")
                    .map_or(default_heading_columns, |n| n as usize),
            };
            insert_table(editor, options)
        })
        .description("Insert a table after the current block.")
        .keywords(["table", "grid"])
        .args_example(json!({ "rows": 2, "columns": 3, "heading_rows": 1 })),
        CommandSpec::new("table.insert_row_above", "Insert row above", |editor, _args| {
            insert_row(editor, true)
        })
        .description("Insert a new row above the selected rows.")
        .keywords(["table", "row", "insert"]),
        CommandSpec::new("table.insert_row_below", "Insert row below", |editor, _args| {
            insert_row(editor, false)
        })
        .description("Insert a new row below the selected rows.")
        .keywords(["table", "row", "insert"]),
        CommandSpec::new(
            "table.insert_column_left",
            "Insert column left",
            |editor, _args| insert_column(editor, true),
        )
        .description("Insert a new column left of the selected columns.")
        .keywords(["table", "column", "insert"]),
        CommandSpec::new(
            "table.insert_column_right",
            "Insert column right",
            |editor, _args| insert_column(editor, false),
        )
        .description("Insert a new column right of the selected columns.")
        .keywords(["table", "column", "insert"]),
        CommandSpec::new("table.remove_row", "Delete row", |editor, _args| {
            remove_row(editor)
        })
        .description("Delete the selected rows.")
        .keywords(["table", "row", "delete", "remove"]),
        CommandSpec::new("table.remove_column", "Delete column", |editor, _args| {
            remove_column(editor)
        })
        .description("Delete the selected columns.")
        .keywords(["table", "column", "delete", "remove"]),
        CommandSpec::new("table.merge_cells", "Merge cells", |editor, _args| merge(editor))
            .description("Merge the selected cells into one.")
            .keywords(["table", "merge", "cells"]),
        CommandSpec::new(
            "table.split_cell_vertically",
            "Split cell vertically",
            |editor, args| split(editor, &args, true),
        )
        .description("Split the current cell into side-by-side cells.")
        .keywords(["table", "split", "cell", "column"])
        .args_example(json!({ "cells": 2 })),
        CommandSpec::new(
            "table.split_cell_horizontally",
            "Split cell horizontally",
            |editor, args| split(editor, &args, false),
        )
        .description("Split the current cell into stacked cells.")
        .keywords(["table", "split", "cell", "row"])
        .args_example(json!({ "cells": 2 })),
        CommandSpec::new(
            "table.set_heading_rows",
            "Header row",
            |editor, args| set_heading(editor, &args, true),
        )
        .description("Toggle the heading row section at the selected rows.")
        .keywords(["table", "heading", "header", "row"])
        .args_example(json!({ "value": true })),
        CommandSpec::new(
            "table.set_heading_columns",
            "Header column",
            |editor, args| set_heading(editor, &args, false),
        )
        .description("Toggle the heading column section at the selected columns.")
        .keywords(["table", "heading", "header", "column"])
        .args_example(json!({ "value": true })),
        CommandSpec::new("table.delete_table", "Delete table", |editor, _args| {
            delete_table(editor)
        })
        .description("Delete the current table and replace it with a paragraph.")
        .keywords(["table", "delete", "remove"]),
        CommandSpec::new("table.paste", "Paste table", |editor, args| paste(editor, &args))
            .description("Paste a table over the selected cells.")
            .keywords(["table", "paste", "clipboard"]),
    ]
}

fn with_table<T>(editor: &Editor, f: impl FnOnce(&crate::core::ElementNode) -> T) -> Option<T> {
    let path = focused_table(editor)?;
    table_at(editor.doc(), &path).ok().map(f)
}

pub(super) fn queries() -> Vec<QuerySpec> {
    vec![
        QuerySpec::new("table.is_active", |editor, _args| {
            Ok(Value::Bool(focused_table(editor).is_some()))
        }),
        QuerySpec::new("table.cell_location", |editor, _args| {
            let cells = get_selection_affected_table_cells(editor.doc(), editor.selection());
            let Some(cell) = cells.first() else {
                return Ok(Value::Null);
            };
            let location = get_cell_location(editor.doc(), cell)
                .map_err(|err| QueryError::new(err.to_string()))?;
            serde_json::to_value(location).map_err(|err| QueryError::new(err.to_string()))
        }),
        QuerySpec::new("table.dimensions", |editor, _args| {
            Ok(with_table(editor, |table| {
                json!({ "rows": get_rows(table), "columns": get_columns(table) })
            })
            .unwrap_or(Value::Null))
        }),
        QuerySpec::new("table.selected_cells", |editor, _args| {
            let cells = get_selected_table_cells(editor.doc(), editor.selection());
            Ok(json!(cells))
        }),
        QuerySpec::new("table.can_merge", |editor, _args| {
            let cells = get_selected_table_cells(editor.doc(), editor.selection());
            Ok(Value::Bool(is_selection_rectangular(editor.doc(), &cells)))
        }),
        QuerySpec::new("table.can_paste", |editor, args| {
            let table = pasted_table(&args).map_err(QueryError::new)?;
            Ok(Value::Bool(can_paste(editor.doc(), editor.selection(), &table)))
        }),
        QuerySpec::new("table.heading_rows", |editor, _args| {
            Ok(with_table(editor, |table| json!(heading_rows(table))).unwrap_or(Value::Null))
        }),
        QuerySpec::new("table.heading_columns", |editor, _args| {
            Ok(with_table(editor, |table| json!(heading_columns(table))).unwrap_or(Value::Null))
        }),
    ]
}
