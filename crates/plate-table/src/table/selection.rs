use std::collections::HashSet;

use crate::core::{Document, ElementKind, Selection};
use crate::ops::Path;

use super::structure::TableRect;
use super::utils::{IndexRange, get_column_indexes, get_row_indexes};
use super::walker::TableWalker;
use super::{find_ancestor, heading_columns, heading_rows, split_cell_path, table_at};

/// Cells wrapped whole by the selection's ranges, in document order.
pub fn get_selected_table_cells(doc: &Document, selection: &Selection) -> Vec<Path> {
    let mut cells: Vec<Path> = selection
        .ranges()
        .iter()
        .filter_map(|range| range.contained_element(doc))
        .filter(|path| {
            crate::core::node_ref(doc, path)
                .and_then(|node| node.element_of(ElementKind::TableCell))
                .is_some()
        })
        .collect();
    cells.sort();
    cells.dedup();
    cells
}

/// Cells holding the start of each selection range, in document order.
pub fn get_table_cells_containing_selection(doc: &Document, selection: &Selection) -> Vec<Path> {
    let mut cells: Vec<Path> = selection
        .ranges()
        .iter()
        .filter_map(|range| find_ancestor(doc, &range.start().path, ElementKind::TableCell))
        .collect();
    cells.sort();
    cells.dedup();
    cells
}

/// The cells a table command acts on: the selected cells, or else the cell around the caret.
pub fn get_selection_affected_table_cells(doc: &Document, selection: &Selection) -> Vec<Path> {
    let selected = get_selected_table_cells(doc, selection);
    if !selected.is_empty() {
        return selected;
    }
    get_table_cells_containing_selection(doc, selection)
}

fn same_table(cells: &[Path]) -> Option<&[usize]> {
    let (table_path, _, _) = split_cell_path(cells.first()?).ok()?;
    cells
        .iter()
        .all(|cell| split_cell_path(cell).is_ok_and(|(table, _, _)| table == table_path))
        .then_some(table_path)
}

/// Whether every index of `range` lies on the same side of a heading boundary at `limit`.
fn in_one_section(range: IndexRange, limit: usize) -> bool {
    (range.first < limit) == (range.last < limit)
}

/// Whether `cells` cover a gapless rectangle lying inside one heading section on both axes.
///
/// Fewer than two distinct cells, or cells from different tables, never form a rectangle.
pub fn is_selection_rectangular(doc: &Document, cells: &[Path]) -> bool {
    let selected: HashSet<&Path> = cells.iter().collect();
    if selected.len() < 2 {
        return false;
    }
    let Some(table_path) = same_table(cells) else {
        return false;
    };
    let Ok(table) = table_at(doc, table_path) else {
        return false;
    };
    let (Some(rows), Some(columns)) = (get_row_indexes(doc, cells), get_column_indexes(doc, cells))
    else {
        return false;
    };
    if !in_one_section(rows, heading_rows(table))
        || !in_one_section(columns, heading_columns(table))
    {
        return false;
    }

    let mut area = 0;
    let mut last_row = rows.last;
    let mut last_column = columns.last;
    let mut found = 0;
    for slot in TableWalker::new(table) {
        if !selected.contains(&slot.cell_path(table_path)) {
            continue;
        }
        found += 1;
        area += slot.cell_width * slot.cell_height;
        last_row = last_row.max(slot.last_row());
        last_column = last_column.max(slot.last_column());
    }
    if found != selected.len() {
        return false;
    }
    let bounding = (last_row - rows.first + 1) * (last_column - columns.first + 1);
    area == bounding
}

/// Bounding rectangle of `cells`, far edges included. `None` unless all cells share one table.
pub fn selection_extents(doc: &Document, cells: &[Path]) -> Option<TableRect> {
    let table_path = same_table(cells)?;
    let table = table_at(doc, table_path).ok()?;
    let selected: HashSet<&Path> = cells.iter().collect();
    let mut rect: Option<TableRect> = None;
    for slot in TableWalker::new(table) {
        if !selected.contains(&slot.cell_path(table_path)) {
            continue;
        }
        let (last_row, last_column) = (slot.last_row(), slot.last_column());
        rect = Some(match rect {
            None => TableRect {
                start_row: slot.row,
                start_column: slot.column,
                end_row: last_row,
                end_column: last_column,
            },
            Some(rect) => TableRect {
                start_row: rect.start_row.min(slot.row),
                start_column: rect.start_column.min(slot.column),
                end_row: rect.end_row.max(last_row),
                end_column: rect.end_column.max(last_column),
            },
        });
    }
    rect
}
