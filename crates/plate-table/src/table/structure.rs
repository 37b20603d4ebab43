use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::{Attrs, ElementKind, ElementNode, Node};
use crate::error::{ApplyError, TableError};
use crate::ops::Path;
use crate::writer::Writer;

use super::utils::{
    IndexRange, RemoveColumnsOptions, RemoveRowsOptions, get_columns, locate_cell, remove_columns,
    remove_rows,
};
use super::walker::{TableSlot, TableWalker, WalkerOptions};
use super::{
    COLSPAN, HEADING_COLUMNS, HEADING_ROWS, ROWSPAN, cell_at, colspan, empty_cell, heading_columns,
    heading_rows, logical_row, rowspan, split_cell_path, table_rows, table_snapshot,
};

/// An inclusive rectangle of grid slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRect {
    pub start_row: usize,
    pub start_column: usize,
    pub end_row: usize,
    pub end_column: usize,
}

impl TableRect {
    pub fn height(&self) -> usize {
        self.end_row + 1 - self.start_row
    }

    pub fn width(&self) -> usize {
        self.end_column + 1 - self.start_column
    }

    pub fn rows(&self) -> IndexRange {
        IndexRange {
            first: self.start_row,
            last: self.end_row,
        }
    }

    pub fn columns(&self) -> IndexRange {
        IndexRange {
            first: self.start_column,
            last: self.end_column,
        }
    }
}

/// Stores `value` under `key` when it exceeds `default`, otherwise drops the attribute.
pub fn update_numeric_attribute(
    writer: &mut Writer<'_>,
    path: &[usize],
    key: &str,
    value: usize,
    default: usize,
) -> Result<(), ApplyError> {
    if value > default {
        writer.set_attribute(path.to_vec(), key, value)
    } else {
        writer.remove_attribute(path.to_vec(), key)
    }
}

fn set_numeric_attr(attrs: &mut Attrs, key: &str, value: usize, default: usize) {
    if value > default {
        attrs.insert(key.to_string(), json!(value));
    } else {
        attrs.remove(key);
    }
}

/// Span attributes for a new cell; spans of 1 are left out.
pub fn span_attrs(colspan: usize, rowspan: usize) -> Attrs {
    let mut attrs = Attrs::new();
    set_numeric_attr(&mut attrs, COLSPAN, colspan, 1);
    set_numeric_attr(&mut attrs, ROWSPAN, rowspan, 1);
    attrs
}

pub fn create_empty_table_cell(
    writer: &mut Writer<'_>,
    position: Path,
    attrs: Attrs,
) -> Result<(), ApplyError> {
    writer.insert(position, empty_cell(attrs))
}

/// Inserts `count` blank cells at `position`, in order.
pub(crate) fn create_cells(
    writer: &mut Writer<'_>,
    count: usize,
    position: Path,
    attrs: &Attrs,
) -> Result<(), ApplyError> {
    for _ in 0..count {
        create_empty_table_cell(writer, position.clone(), attrs.clone())?;
    }
    Ok(())
}

/// A row of `cells` blank cells sharing `attrs`.
pub(crate) fn empty_row(cells: usize, attrs: &Attrs) -> Node {
    Node::element(
        ElementKind::TableRow,
        Attrs::new(),
        (0..cells).map(|_| empty_cell(attrs.clone())).collect(),
    )
}

/// Cells anchored at or after `start_row` whose rows cross the boundary above `overlap_row`.
pub fn get_vertically_overlapping_cells(
    table: &ElementNode,
    overlap_row: usize,
    start_row: usize,
) -> Vec<TableSlot<'_>> {
    if overlap_row == 0 {
        return Vec::new();
    }
    TableWalker::with_options(
        table,
        WalkerOptions::new()
            .start_row(start_row)
            .end_row(overlap_row - 1),
    )
    .filter(|slot| slot.row < overlap_row && overlap_row <= slot.last_row())
    .collect()
}

/// Cells whose columns cross the boundary left of `overlap_column`.
pub fn get_horizontally_overlapping_cells(
    table: &ElementNode,
    overlap_column: usize,
) -> Vec<TableSlot<'_>> {
    TableWalker::new(table)
        .filter(|slot| slot.column < overlap_column && overlap_column <= slot.last_column())
        .collect()
}

/// Cuts the cell at `cell_path` so that it ends right above `split_row`; a blank cell takes
/// over the rows from `split_row` on. Returns the path of the new cell.
pub fn split_horizontally(
    writer: &mut Writer<'_>,
    cell_path: &[usize],
    split_row: usize,
) -> Result<Option<Path>, TableError> {
    let (table_path, row_index, _) = split_cell_path(cell_path)?;
    let cell = cell_at(writer.doc(), cell_path)?;
    let (width, height) = (colspan(cell), rowspan(cell));
    let table = table_snapshot(writer, table_path)?;
    let anchor_row = logical_row(&table, row_index);
    if split_row <= anchor_row || split_row >= anchor_row + height {
        return Ok(None);
    }

    let new_rowspan = split_row - anchor_row;
    let Some(location) = locate_cell(&table, table_path, cell_path) else {
        return Err(TableError::NotATableCell {
            path: cell_path.to_vec(),
        });
    };
    let position = TableWalker::with_options(
        &table,
        WalkerOptions::new()
            .row(split_row)
            .column(location.column)
            .include_all_slots(),
    )
    .next()
    .map(|slot| slot.position_before(table_path));
    let Some(position) = position else {
        return Ok(None);
    };

    create_empty_table_cell(
        writer,
        position.clone(),
        span_attrs(width, height - new_rowspan),
    )?;
    update_numeric_attribute(writer, cell_path, ROWSPAN, new_rowspan, 1)?;
    Ok(Some(position))
}

/// Cuts the cell at `cell_path`, anchored at `column`, so that it ends right before
/// `split_column`; a blank cell inserted after it takes over the remaining columns.
pub fn split_vertically(
    writer: &mut Writer<'_>,
    cell_path: &[usize],
    column: usize,
    split_column: usize,
) -> Result<Option<Path>, TableError> {
    let cell = cell_at(writer.doc(), cell_path)?;
    let (width, height) = (colspan(cell), rowspan(cell));
    if split_column <= column || split_column >= column + width {
        return Ok(None);
    }

    let new_colspan = split_column - column;
    let mut position = cell_path.to_vec();
    if let Some(last) = position.last_mut() {
        *last += 1;
    }
    create_empty_table_cell(
        writer,
        position.clone(),
        span_attrs(width - new_colspan, height),
    )?;
    update_numeric_attribute(writer, cell_path, COLSPAN, new_colspan, 1)?;
    Ok(Some(position))
}

/// Reduces the spans of `cell`, anchored at `cell_row`/`cell_column`, so that it ends no later
/// than `limit_row`/`limit_column`.
pub fn trim_table_cell_if_needed(
    cell: &mut ElementNode,
    cell_row: usize,
    cell_column: usize,
    limit_row: usize,
    limit_column: usize,
) {
    if cell_column + colspan(cell) - 1 > limit_column {
        set_numeric_attr(&mut cell.attrs, COLSPAN, limit_column + 1 - cell_column, 1);
    }
    if cell_row + rowspan(cell) - 1 > limit_row {
        set_numeric_attr(&mut cell.attrs, ROWSPAN, limit_row + 1 - cell_row, 1);
    }
}

/// Copies the slots of `rect` into a new standalone table.
///
/// Slots covered by a cell anchored outside the rectangle, or by no cell at all, become blank
/// cells. Cells reaching past the far edges are trimmed, and the heading sections are re-counted
/// from the crop origin.
pub fn crop_table_to_dimensions(table: &ElementNode, rect: &TableRect) -> ElementNode {
    let mut rows: Vec<Vec<(usize, Node)>> = vec![Vec::new(); rect.height()];
    let mut covered = vec![vec![false; rect.width()]; rect.height()];
    let walker = TableWalker::with_options(
        table,
        WalkerOptions::new()
            .start_row(rect.start_row)
            .end_row(rect.end_row)
            .start_column(rect.start_column)
            .end_column(rect.end_column)
            .include_all_slots(),
    );
    for slot in walker {
        let Some(row) = rows.get_mut(slot.row - rect.start_row) else {
            continue;
        };
        let column = slot.column - rect.start_column;
        if let Some(slot_covered) = covered[slot.row - rect.start_row].get_mut(column) {
            *slot_covered = true;
        }
        if slot.is_anchor() {
            let mut copy = slot.cell.clone();
            trim_table_cell_if_needed(
                &mut copy,
                slot.row,
                slot.column,
                rect.end_row,
                rect.end_column,
            );
            row.push((column, Node::Element(copy)));
        } else if slot.cell_anchor_row < rect.start_row
            || slot.cell_anchor_column < rect.start_column
        {
            row.push((column, empty_cell(Attrs::new())));
        }
    }
    for (row, covered) in rows.iter_mut().zip(&covered) {
        for (column, _) in covered.iter().enumerate().filter(|(_, slot)| !**slot) {
            row.push((column, empty_cell(Attrs::new())));
        }
        row.sort_by_key(|(column, _)| *column);
    }

    let mut attrs = Attrs::new();
    let rows_in_crop = heading_rows(table)
        .saturating_sub(rect.start_row)
        .min(rect.height());
    set_numeric_attr(&mut attrs, HEADING_ROWS, rows_in_crop, 0);
    let columns_in_crop = heading_columns(table)
        .saturating_sub(rect.start_column)
        .min(rect.width());
    set_numeric_attr(&mut attrs, HEADING_COLUMNS, columns_in_crop, 0);

    ElementNode {
        kind: ElementKind::Table,
        attrs,
        children: rows
            .into_iter()
            .map(|cells| {
                let cells = cells.into_iter().map(|(_, cell)| cell).collect();
                Node::element(ElementKind::TableRow, Attrs::new(), cells)
            })
            .collect(),
    }
}

/// Removes the last column that has no anchored cell. Returns whether one was found.
pub fn remove_empty_columns(
    writer: &mut Writer<'_>,
    table_path: &[usize],
) -> Result<bool, TableError> {
    let table = table_snapshot(writer, table_path)?;
    let mut anchors = vec![0usize; get_columns(&table)];
    for slot in TableWalker::new(&table) {
        if let Some(count) = anchors.get_mut(slot.column) {
            *count += 1;
        }
    }
    let Some(column) = anchors.iter().rposition(|count| *count == 0) else {
        return Ok(false);
    };
    tracing::trace!(?table_path, column, "removing empty column");
    remove_columns(
        writer,
        table_path,
        RemoveColumnsOptions {
            at: column,
            columns: 1,
        },
    )?;
    Ok(true)
}

/// Removes the last row without cells. Returns whether one was found.
pub fn remove_empty_rows(
    writer: &mut Writer<'_>,
    table_path: &[usize],
) -> Result<bool, TableError> {
    let table = table_snapshot(writer, table_path)?;
    let empty = table_rows(&table)
        .enumerate()
        .filter(|(_, (_, row))| row.children.is_empty())
        .map(|(row, _)| row)
        .last();
    let Some(row) = empty else {
        return Ok(false);
    };
    tracing::trace!(?table_path, row, "removing empty row");
    remove_rows(writer, table_path, RemoveRowsOptions { at: row, rows: 1 })?;
    Ok(true)
}

/// Removing a column can empty a row and the other way round; each removal re-checks the other
/// axis, so one entry point is enough.
pub fn remove_empty_rows_columns(
    writer: &mut Writer<'_>,
    table_path: &[usize],
) -> Result<(), TableError> {
    if !remove_empty_columns(writer, table_path)? {
        remove_empty_rows(writer, table_path)?;
    }
    Ok(())
}

fn is_affected_by_selection(index: usize, span: usize, limit: IndexRange) -> bool {
    let end = index + span - 1;
    let inside = index >= limit.first && index <= limit.last;
    let overlaps_from_outside = index < limit.first && end >= limit.first;
    inside || overlaps_from_outside
}

/// Splits, at `split_row`, the cells anchored from `start_row` on that reach into the columns
/// of `limit`.
pub(crate) fn do_horizontal_split(
    writer: &mut Writer<'_>,
    table_path: &[usize],
    split_row: usize,
    limit: IndexRange,
    start_row: usize,
) -> Result<(), TableError> {
    if split_row < 1 {
        return Ok(());
    }
    let table = table_snapshot(writer, table_path)?;
    let cells: Vec<Path> = get_vertically_overlapping_cells(&table, split_row, start_row)
        .into_iter()
        .filter(|slot| is_affected_by_selection(slot.column, slot.cell_width, limit))
        .map(|slot| slot.cell_path(table_path))
        .collect();
    for cell in cells {
        split_horizontally(writer, &cell, split_row)?;
    }
    Ok(())
}

/// Splits, at `split_column`, the cells that reach into the rows of `limit`.
pub(crate) fn do_vertical_split(
    writer: &mut Writer<'_>,
    table_path: &[usize],
    split_column: usize,
    limit: IndexRange,
) -> Result<(), TableError> {
    if split_column < 1 {
        return Ok(());
    }
    let table = table_snapshot(writer, table_path)?;
    let cells: Vec<(Path, usize)> = get_horizontally_overlapping_cells(&table, split_column)
        .into_iter()
        .filter(|slot| is_affected_by_selection(slot.row, slot.cell_height, limit))
        .map(|slot| (slot.cell_path(table_path), slot.column))
        .collect();
    for (cell, column) in cells {
        split_vertically(writer, &cell, column, split_column)?;
    }
    Ok(())
}

/// Splits every cell crossing an edge of `rect`, so the rectangle is covered exactly by cells
/// anchored inside it.
pub fn split_cells_to_rectangle(
    writer: &mut Writer<'_>,
    table_path: &[usize],
    rect: &TableRect,
) -> Result<(), TableError> {
    do_vertical_split(writer, table_path, rect.start_column, rect.rows())?;
    do_vertical_split(writer, table_path, rect.end_column + 1, rect.rows())?;
    do_horizontal_split(writer, table_path, rect.start_row, rect.columns(), 0)?;
    do_horizontal_split(
        writer,
        table_path,
        rect.end_row + 1,
        rect.columns(),
        rect.start_row,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_attrs_omit_defaults() {
        assert!(span_attrs(1, 1).is_empty());
        let attrs = span_attrs(3, 1);
        assert_eq!(attrs.get(COLSPAN), Some(&json!(3)));
        assert!(!attrs.contains_key(ROWSPAN));
    }

    #[test]
    fn trim_reduces_spans_to_limits() {
        let mut cell = ElementNode {
            kind: ElementKind::TableCell,
            attrs: span_attrs(4, 3),
            children: Vec::new(),
        };
        trim_table_cell_if_needed(&mut cell, 1, 1, 2, 2);
        assert_eq!(colspan(&cell), 2);
        assert_eq!(rowspan(&cell), 2);

        trim_table_cell_if_needed(&mut cell, 1, 1, 1, 1);
        assert!(cell.attrs.is_empty());
    }

    #[test]
    fn affected_by_selection_covers_inside_and_overlap() {
        let limit = IndexRange { first: 2, last: 4 };
        assert!(is_affected_by_selection(3, 1, limit));
        assert!(is_affected_by_selection(1, 2, limit));
        assert!(!is_affected_by_selection(0, 2, limit));
        assert!(!is_affected_by_selection(5, 1, limit));
    }
}
