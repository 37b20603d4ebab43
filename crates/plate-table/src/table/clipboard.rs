//! Pasting a table over a cell selection.

use crate::core::{Document, ElementNode, Node, Selection};
use crate::error::TableError;
use crate::ops::Path;
use crate::writer::Writer;

use super::selection::{
    get_selection_affected_table_cells, is_selection_rectangular, selection_extents,
};
use super::structure::{
    TableRect, crop_table_to_dimensions, do_horizontal_split, do_vertical_split,
    split_cells_to_rectangle,
};
use super::utils::{
    InsertColumnsOptions, InsertRowsOptions, get_cell_location, get_columns, get_rows,
    insert_columns, insert_rows,
};
use super::walker::{TableWalker, WalkerOptions};
use super::{heading_columns, heading_rows, split_cell_path, table_snapshot};

/// The rectangle a paste of `pasted` over `cells` would replace, or `None` when it is refused.
///
/// A single cell pastes from its anchor and the rectangle takes the pasted size. A larger
/// selection must be rectangular and no bigger than the pasted table on either axis; it grows to
/// the pasted size.
fn paste_target(doc: &Document, cells: &[Path], pasted: &ElementNode) -> Option<(Path, TableRect)> {
    let (width, height) = (get_columns(pasted), get_rows(pasted));
    if width == 0 || height == 0 {
        return None;
    }
    let first = cells.first()?;
    let (table_path, _, _) = split_cell_path(first).ok()?;

    let origin = if cells.len() == 1 {
        let location = get_cell_location(doc, first).ok()?;
        (location.row, location.column)
    } else {
        if !is_selection_rectangular(doc, cells) {
            return None;
        }
        let extents = selection_extents(doc, cells)?;
        if height < extents.height() || width < extents.width() {
            return None;
        }
        (extents.start_row, extents.start_column)
    };

    let rect = TableRect {
        start_row: origin.0,
        start_column: origin.1,
        end_row: origin.0 + height - 1,
        end_column: origin.1 + width - 1,
    };
    Some((table_path.to_vec(), rect))
}

/// Whether `pasted` can be pasted over the cells the selection affects.
pub fn can_paste(doc: &Document, selection: &Selection, pasted: &ElementNode) -> bool {
    let cells = get_selection_affected_table_cells(doc, selection);
    paste_target(doc, &cells, pasted).is_some()
}

fn grow_table(
    writer: &mut Writer<'_>,
    table_path: &[usize],
    rect: &TableRect,
) -> Result<(), TableError> {
    let table = table_snapshot(writer, table_path)?;
    let columns = get_columns(&table);
    if rect.end_column >= columns {
        insert_columns(
            writer,
            table_path,
            InsertColumnsOptions {
                at: columns,
                columns: rect.end_column + 1 - columns,
            },
        )?;
    }
    let rows = get_rows(&table);
    if rect.end_row >= rows {
        insert_rows(
            writer,
            table_path,
            InsertRowsOptions {
                at: rows,
                rows: rect.end_row + 1 - rows,
                copy_structure_from_above: None,
            },
        )?;
    }
    Ok(())
}

/// Replaces the cells of `rect`, already split to its edges, with the rows of `pasted`.
fn replace_rect(
    writer: &mut Writer<'_>,
    table_path: &[usize],
    rect: &TableRect,
    pasted: &ElementNode,
) -> Result<(), TableError> {
    let table = table_snapshot(writer, table_path)?;
    let mut rows: Vec<(Path, Vec<Path>)> = Vec::with_capacity(rect.height());
    let walker = TableWalker::with_options(
        &table,
        WalkerOptions::new()
            .start_row(rect.start_row)
            .end_row(rect.end_row)
            .start_column(rect.start_column)
            .end_column(rect.end_column)
            .include_all_slots(),
    );
    for slot in walker {
        if slot.column == rect.start_column {
            rows.push((slot.position_before(table_path), Vec::new()));
        }
        if slot.is_anchor() {
            if let Some((_, anchors)) = rows.last_mut() {
                anchors.push(slot.cell_path(table_path));
            }
        }
    }

    let pasted_rows = pasted.children.iter().filter_map(Node::as_element);
    for ((insert_at, anchors), pasted_row) in rows.into_iter().zip(pasted_rows) {
        for anchor in anchors.into_iter().rev() {
            writer.remove(anchor)?;
        }
        let mut position = insert_at;
        for cell in pasted_row.children.iter().cloned() {
            writer.insert(position.clone(), cell)?;
            if let Some(last) = position.last_mut() {
                *last += 1;
            }
        }
    }
    Ok(())
}

/// Pastes `pasted` over the cells the selection affects.
///
/// Returns `false` without touching the document when the paste is refused. Otherwise the
/// table grows as needed, cells crossing the target edges are split, the target cells are
/// replaced and the pasted cells become the new selection.
pub fn paste_table(
    writer: &mut Writer<'_>,
    selection: &Selection,
    pasted: &ElementNode,
) -> Result<bool, TableError> {
    let cells = get_selection_affected_table_cells(writer.doc(), selection);
    let Some((table_path, rect)) = paste_target(writer.doc(), &cells, pasted) else {
        tracing::warn!(cells = cells.len(), "table paste refused");
        return Ok(false);
    };

    grow_table(writer, &table_path, &rect)?;
    split_cells_to_rectangle(writer, &table_path, &rect)?;
    let cropped = crop_table_to_dimensions(
        pasted,
        &TableRect {
            start_row: 0,
            start_column: 0,
            end_row: rect.height() - 1,
            end_column: rect.width() - 1,
        },
    );
    replace_rect(writer, &table_path, &rect, &cropped)?;

    let table = table_snapshot(writer, &table_path)?;
    let headings = heading_rows(&table);
    if rect.start_row < headings && headings <= rect.end_row {
        do_horizontal_split(writer, &table_path, headings, rect.columns(), rect.start_row)?;
    }
    let headings = heading_columns(&table);
    if rect.start_column < headings && headings <= rect.end_column {
        do_vertical_split(writer, &table_path, headings, rect.rows())?;
    }

    let table = table_snapshot(writer, &table_path)?;
    let pasted_cells: Vec<Path> = TableWalker::with_options(
        &table,
        WalkerOptions::new()
            .start_row(rect.start_row)
            .end_row(rect.end_row)
            .start_column(rect.start_column)
            .end_column(rect.end_column),
    )
    .map(|slot| slot.cell_path(&table_path))
    .collect();
    writer.set_selection(Selection::on_elements(&pasted_cells));
    Ok(true)
}
