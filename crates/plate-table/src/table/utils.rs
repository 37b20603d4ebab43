use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::core::{Attrs, Document, ElementKind, ElementNode, Node};
use crate::error::TableError;
use crate::ops::Path;
use crate::writer::Writer;

use super::structure::{
    create_cells, create_empty_table_cell, empty_row, get_horizontally_overlapping_cells,
    get_vertically_overlapping_cells, remove_empty_columns, remove_empty_rows,
    remove_empty_rows_columns, span_attrs, split_horizontally, split_vertically,
    update_numeric_attribute,
};
use super::walker::{TableWalker, WalkerOptions};
use super::{
    COLSPAN, HEADING_COLUMNS, HEADING_ROWS, ROWSPAN, cell_at, colspan, heading_columns,
    heading_rows, logical_row, row_child_index, row_insert_index, rowspan, split_cell_path,
    table_at, table_rows, table_snapshot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellLocation {
    pub row: usize,
    pub column: usize,
}

/// Smallest and largest index of a set, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRange {
    pub first: usize,
    pub last: usize,
}

impl IndexRange {
    fn from_indexes(indexes: impl IntoIterator<Item = usize>) -> Option<Self> {
        indexes.into_iter().fold(None, |range, ix| {
            Some(match range {
                None => IndexRange { first: ix, last: ix },
                Some(IndexRange { first, last }) => IndexRange {
                    first: first.min(ix),
                    last: last.max(ix),
                },
            })
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreateTableOptions {
    #[serde(default)]
    pub rows: usize,
    #[serde(default)]
    pub columns: usize,
    #[serde(default)]
    pub heading_rows: usize,
    #[serde(default)]
    pub heading_columns: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertRowsOptions {
    pub at: usize,
    pub rows: usize,
    /// `Some(true)` copies the column layout of the row above `at`, `Some(false)` the layout of
    /// the row currently at `at`. `None` inserts plain rows.
    pub copy_structure_from_above: Option<bool>,
}

impl Default for InsertRowsOptions {
    fn default() -> Self {
        Self {
            at: 0,
            rows: 1,
            copy_structure_from_above: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertColumnsOptions {
    pub at: usize,
    pub columns: usize,
}

impl Default for InsertColumnsOptions {
    fn default() -> Self {
        Self { at: 0, columns: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveRowsOptions {
    pub at: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveColumnsOptions {
    pub at: usize,
    pub columns: usize,
}

/// Builds a `rows` x `columns` table of blank cells. Zero dimensions fall back to 2; heading
/// counts are clamped to the table size.
pub fn create_table(options: &CreateTableOptions) -> Node {
    let rows = if options.rows == 0 { 2 } else { options.rows };
    let columns = if options.columns == 0 { 2 } else { options.columns };

    let mut attrs = Attrs::new();
    let heading_rows = options.heading_rows.min(rows);
    if heading_rows > 0 {
        attrs.insert(HEADING_ROWS.to_string(), heading_rows.into());
    }
    let heading_columns = options.heading_columns.min(columns);
    if heading_columns > 0 {
        attrs.insert(HEADING_COLUMNS.to_string(), heading_columns.into());
    }

    Node::element(
        ElementKind::Table,
        attrs,
        (0..rows).map(|_| empty_row(columns, &Attrs::new())).collect(),
    )
}

/// Width of the table, read from its first row only.
pub fn get_columns(table: &ElementNode) -> usize {
    table_rows(table)
        .next()
        .map(|(_, row)| {
            row.children
                .iter()
                .filter_map(Node::as_element)
                .map(colspan)
                .sum()
        })
        .unwrap_or(0)
}

/// Number of row elements. Rows implied only by a trailing rowspan are not counted.
pub fn get_rows(table: &ElementNode) -> usize {
    table_rows(table).count()
}

pub(crate) fn locate_cell(
    table: &ElementNode,
    table_path: &[usize],
    cell_path: &[usize],
) -> Option<CellLocation> {
    let (row_index, cell_index) = match cell_path.strip_prefix(table_path)? {
        [row_index, cell_index] => (*row_index, *cell_index),
        _ => return None,
    };
    let row = logical_row(table, row_index);
    TableWalker::with_options(table, WalkerOptions::new().row(row))
        .find(|slot| slot.row_index == row_index && slot.cell_index == cell_index)
        .map(|slot| CellLocation {
            row: slot.row,
            column: slot.column,
        })
}

/// Grid position of the cell at `cell_path`, found by walking the cell's own row.
pub fn get_cell_location(doc: &Document, cell_path: &[usize]) -> Result<CellLocation, TableError> {
    let (table_path, _, _) = split_cell_path(cell_path)?;
    let table = table_at(doc, table_path)?;
    cell_at(doc, cell_path)?;
    locate_cell(table, table_path, cell_path).ok_or_else(|| TableError::NotATableCell {
        path: cell_path.to_vec(),
    })
}

/// First and last row of the given cells, read from their row positions. The cells must belong
/// to the same table.
pub fn get_row_indexes(doc: &Document, cells: &[Path]) -> Option<IndexRange> {
    let (table_path, _, _) = split_cell_path(cells.first()?).ok()?;
    let table = table_at(doc, table_path).ok()?;
    IndexRange::from_indexes(cells.iter().filter_map(|cell| {
        let (_, row_index, _) = split_cell_path(cell).ok()?;
        Some(logical_row(table, row_index))
    }))
}

/// First and last anchor column of the given cells. The cells must belong to the same table.
pub fn get_column_indexes(doc: &Document, cells: &[Path]) -> Option<IndexRange> {
    let (table_path, _, _) = split_cell_path(cells.first()?).ok()?;
    let table = table_at(doc, table_path).ok()?;
    IndexRange::from_indexes(
        TableWalker::new(table)
            .filter(|slot| cells.iter().any(|cell| *cell == slot.cell_path(table_path)))
            .map(|slot| slot.column),
    )
}

/// Path of the cell covering the slot at `row`/`column`.
pub fn cell_at_slot(
    table: &ElementNode,
    table_path: &[usize],
    row: usize,
    column: usize,
) -> Option<Path> {
    TableWalker::with_options(
        table,
        WalkerOptions::new().row(row).column(column).include_all_slots(),
    )
    .next()
    .map(|slot| slot.cell_path(table_path))
}

#[derive(Debug, Clone, Copy)]
enum ColumnLayout {
    Cell(usize),
    Covered(usize),
}

/// Inserts blank rows before row `at` (`at == rows` appends).
///
/// Cells from above whose rows reach past the insertion point grow by the inserted count, and
/// the new rows leave their columns free. Inserting inside the heading section grows it.
pub fn insert_rows(
    writer: &mut Writer<'_>,
    table_path: &[usize],
    options: InsertRowsOptions,
) -> Result<(), TableError> {
    let table = table_snapshot(writer, table_path)?;
    let at = options.at;
    let rows_to_insert = options.rows.max(1);
    let row_count = get_rows(&table);
    let columns = get_columns(&table);
    if at > row_count {
        return Err(TableError::InsertRowsOutOfRange {
            table: table_path.to_vec(),
            at,
            rows: rows_to_insert,
            row_count,
        });
    }

    let headings = heading_rows(&table);
    if headings > at {
        update_numeric_attribute(writer, table_path, HEADING_ROWS, headings + rows_to_insert, 0)?;
    }

    let mut insert_path = table_path.to_vec();
    insert_path.push(row_insert_index(&table, at));

    let Some(copy_above) = options.copy_structure_from_above else {
        if at == 0 || at == row_count {
            for _ in 0..rows_to_insert {
                writer.insert(insert_path.clone(), empty_row(columns, &Attrs::new()))?;
            }
            return Ok(());
        }
        return insert_rows_with_layout(
            writer,
            table_path,
            &table,
            at,
            rows_to_insert,
            None,
            insert_path,
        );
    };
    let reference = if copy_above { at.checked_sub(1) } else { Some(at) };
    insert_rows_with_layout(writer, table_path, &table, at, rows_to_insert, reference, insert_path)
}

fn insert_rows_with_layout(
    writer: &mut Writer<'_>,
    table_path: &[usize],
    table: &ElementNode,
    at: usize,
    rows_to_insert: usize,
    reference: Option<usize>,
    insert_path: Path,
) -> Result<(), TableError> {
    let columns = get_columns(table);
    let end_row = reference.map_or(at, |reference| reference.max(at));
    let mut layout = vec![ColumnLayout::Cell(1); columns];
    let mut grow = Vec::new();

    for slot in TableWalker::with_options(table, WalkerOptions::new().end_row(end_row)) {
        let last_row = slot.last_row();
        let Some(entry) = layout.get_mut(slot.column) else {
            continue;
        };
        if slot.row < at && at <= last_row {
            grow.push((slot.cell_path(table_path), slot.cell_height + rows_to_insert));
            *entry = ColumnLayout::Covered(slot.cell_width);
        } else if reference
            .is_some_and(|reference| slot.row <= reference && reference <= last_row)
        {
            *entry = ColumnLayout::Cell(slot.cell_width);
        }
    }

    for (path, height) in grow {
        writer.set_attribute(path, ROWSPAN, height)?;
    }

    let mut cells = Vec::new();
    let mut column = 0;
    while let Some(entry) = layout.get(column) {
        match *entry {
            ColumnLayout::Cell(width) => {
                cells.push(span_attrs(width, 1));
                column += width;
            }
            ColumnLayout::Covered(width) => column += width,
        }
    }
    for _ in 0..rows_to_insert {
        let row = Node::element(
            ElementKind::TableRow,
            Attrs::new(),
            cells.iter().cloned().map(super::empty_cell).collect(),
        );
        writer.insert(insert_path.clone(), row)?;
    }
    Ok(())
}

/// Inserts blank columns before column `at` (`at == columns` appends).
///
/// Cells spanning across the insertion point grow instead of getting a new neighbour.
/// Inserting inside the heading section grows it.
pub fn insert_columns(
    writer: &mut Writer<'_>,
    table_path: &[usize],
    options: InsertColumnsOptions,
) -> Result<(), TableError> {
    let table = table_snapshot(writer, table_path)?;
    let at = options.at;
    let columns_to_insert = options.columns.max(1);
    let column_count = get_columns(&table);
    if at > column_count {
        return Err(TableError::InsertColumnsOutOfRange {
            table: table_path.to_vec(),
            at,
            columns: columns_to_insert,
            column_count,
        });
    }

    let headings = heading_columns(&table);
    if at < headings {
        update_numeric_attribute(
            writer,
            table_path,
            HEADING_COLUMNS,
            headings + columns_to_insert,
            0,
        )?;
    }

    if at == 0 || at == column_count {
        for (row_index, row) in table_rows(&table) {
            let mut position = table_path.to_vec();
            position.extend([row_index, if at == 0 { 0 } else { row.children.len() }]);
            create_cells(writer, columns_to_insert, position, &Attrs::new())?;
        }
        return Ok(());
    }

    let mut walker = TableWalker::with_options(
        &table,
        WalkerOptions::new().column(at).include_all_slots(),
    );
    while let Some(slot) = walker.next() {
        if slot.cell_anchor_column < at {
            writer.set_attribute(
                slot.cell_path(table_path),
                COLSPAN,
                slot.cell_width + columns_to_insert,
            )?;
            for row in slot.row..=slot.last_row() {
                walker.skip_row(row);
            }
        } else {
            create_cells(
                writer,
                columns_to_insert,
                slot.position_before(table_path),
                &Attrs::new(),
            )?;
        }
    }
    Ok(())
}

/// Removes `rows` rows starting at `at`.
///
/// Cells reaching below the removed range move down to the first remaining row with their
/// rowspan cut to the surviving part; cells from above lose the removed rows. Emptied rows and
/// columns are cleaned up afterwards.
pub fn remove_rows(
    writer: &mut Writer<'_>,
    table_path: &[usize],
    options: RemoveRowsOptions,
) -> Result<(), TableError> {
    let table = table_snapshot(writer, table_path)?;
    let rows_to_remove = options.rows.max(1);
    let row_count = get_rows(&table);
    let first = options.at;
    let last = match first.checked_add(rows_to_remove - 1) {
        Some(last) if last < row_count => last,
        _ => {
            return Err(TableError::RemoveRowsOutOfRange {
                table: table_path.to_vec(),
                at: first,
                rows: rows_to_remove,
                row_count,
            });
        }
    };

    // Everything is computed on the snapshot before the first row goes away.
    let mut cells_to_move: BTreeMap<usize, (Path, usize)> = BTreeMap::new();
    let mut cells_to_trim: Vec<(Path, usize)> = Vec::new();
    for slot in TableWalker::with_options(&table, WalkerOptions::new().end_row(last)) {
        let last_row_of_cell = slot.last_row();
        if slot.row >= first && slot.row <= last && last_row_of_cell > last {
            let removed_part = last - slot.row + 1;
            cells_to_move.insert(
                slot.column,
                (slot.cell_path(table_path), slot.cell_height - removed_part),
            );
        }
        if slot.row < first && last_row_of_cell >= first {
            let removed_part = if last_row_of_cell >= last {
                last - first + 1
            } else {
                last_row_of_cell - first + 1
            };
            cells_to_trim.push((slot.cell_path(table_path), slot.cell_height - removed_part));
        }
    }

    if !cells_to_move.is_empty() {
        move_cells_to_row(writer, table_path, &table, last + 1, &cells_to_move)?;
    }

    for row in (first..=last).rev() {
        if let Some(index) = row_child_index(&table, row) {
            let mut path = table_path.to_vec();
            path.push(index);
            writer.remove(path)?;
        }
    }

    for (path, height) in cells_to_trim {
        update_numeric_attribute(writer, &path, ROWSPAN, height, 1)?;
    }

    let headings = heading_rows(&table);
    if first < headings {
        let remaining = if last < headings {
            headings - rows_to_remove
        } else {
            first
        };
        update_numeric_attribute(writer, table_path, HEADING_ROWS, remaining, 0)?;
    }

    if !remove_empty_columns(writer, table_path)? {
        remove_empty_rows(writer, table_path)?;
    }
    Ok(())
}

/// Moves cells, keyed by anchor column, into `target_row` so they keep their column there.
fn move_cells_to_row(
    writer: &mut Writer<'_>,
    table_path: &[usize],
    table: &ElementNode,
    target_row: usize,
    cells_to_move: &BTreeMap<usize, (Path, usize)>,
) -> Result<(), TableError> {
    let Some(target_index) = row_child_index(table, target_row) else {
        return Ok(());
    };
    let slots: Vec<(usize, bool, usize)> = TableWalker::with_options(
        table,
        WalkerOptions::new().row(target_row).include_all_slots(),
    )
    .map(|slot| (slot.column, slot.is_anchor(), slot.cell_index))
    .collect();

    let mut moved_out: HashMap<usize, usize> = HashMap::new();
    let mut moved_in = 0;
    let mut insert_at = 0;
    for (column, is_anchor, cell_index) in slots {
        if let Some((source, height)) = cells_to_move.get(&column) {
            let (_, source_row, source_cell) = split_cell_path(source)?;
            let already_moved = moved_out.entry(source_row).or_insert(0);
            let mut from = table_path.to_vec();
            from.extend([source_row, source_cell - *already_moved]);
            *already_moved += 1;

            let mut to = table_path.to_vec();
            to.extend([target_index, insert_at]);
            writer.move_node(from, to.clone())?;
            update_numeric_attribute(writer, &to, ROWSPAN, *height, 1)?;
            moved_in += 1;
            insert_at += 1;
        } else if is_anchor {
            insert_at = cell_index + moved_in + 1;
        }
    }
    Ok(())
}

/// Removes `columns` columns starting at `at`.
///
/// Cells spanning over a removed column shrink; cells anchored in it are deleted. Emptied rows
/// and columns are cleaned up afterwards.
pub fn remove_columns(
    writer: &mut Writer<'_>,
    table_path: &[usize],
    options: RemoveColumnsOptions,
) -> Result<(), TableError> {
    let table = table_snapshot(writer, table_path)?;
    let columns_to_remove = options.columns.max(1);
    let column_count = get_columns(&table);
    let first = options.at;
    let last = match first.checked_add(columns_to_remove - 1) {
        Some(last) if last < column_count => last,
        _ => {
            return Err(TableError::RemoveColumnsOutOfRange {
                table: table_path.to_vec(),
                at: first,
                columns: columns_to_remove,
                column_count,
            });
        }
    };

    let headings = heading_columns(&table);
    if headings > 0 && first < headings {
        let removed_headings = (headings - 1).min(last) - first + 1;
        update_numeric_attribute(
            writer,
            table_path,
            HEADING_COLUMNS,
            headings - removed_headings,
            0,
        )?;
    }

    for removed_column in (first..=last).rev() {
        let table = table_snapshot(writer, table_path)?;
        let mut removals = Vec::new();
        for slot in TableWalker::new(&table) {
            if slot.column <= removed_column
                && slot.cell_width > 1
                && slot.column + slot.cell_width > removed_column
            {
                update_numeric_attribute(
                    writer,
                    &slot.cell_path(table_path),
                    COLSPAN,
                    slot.cell_width - 1,
                    1,
                )?;
            } else if slot.column == removed_column {
                removals.push(slot.cell_path(table_path));
            }
        }
        for path in removals.into_iter().rev() {
            writer.remove(path)?;
        }
    }

    if !remove_empty_rows(writer, table_path)? {
        remove_empty_columns(writer, table_path)?;
    }
    Ok(())
}

/// Spans for `cells` new cells carved out of a span, with the remainder kept by the original.
fn break_span_evenly(span: usize, cells: usize) -> (usize, usize) {
    if span < cells {
        return (1, 1);
    }
    let new_cells_span = span / cells;
    let updated_span = span - new_cells_span * cells + new_cells_span;
    (new_cells_span, updated_span)
}

fn check_split_count(cell_path: &[usize], cells: usize) -> Result<(), TableError> {
    if cells < 2 {
        return Err(TableError::InvalidSplitCount {
            cell: cell_path.to_vec(),
            cells,
        });
    }
    Ok(())
}

/// Splits the cell into `cells` side-by-side cells.
///
/// An existing colspan is shared out first; when it is too narrow, the column is widened for
/// every other cell crossing it and the missing cells are appended after the original.
pub fn split_cell_vertically(
    writer: &mut Writer<'_>,
    cell_path: &[usize],
    cells: usize,
) -> Result<(), TableError> {
    check_split_count(cell_path, cells)?;
    let (table_path, _, _) = split_cell_path(cell_path)?;
    let cell = cell_at(writer.doc(), cell_path)?;
    let (width, height) = (colspan(cell), rowspan(cell));
    let mut after = cell_path.to_vec();
    if let Some(last) = after.last_mut() {
        *last += 1;
    }

    if width > 1 {
        let (new_cells_span, updated_span) = break_span_evenly(width, cells);
        update_numeric_attribute(writer, cell_path, COLSPAN, updated_span, 1)?;
        let to_insert = if width > cells { cells - 1 } else { width - 1 };
        create_cells(writer, to_insert, after.clone(), &span_attrs(new_cells_span, height))?;
    }

    if width < cells {
        let to_insert = cells - width;
        let table = table_snapshot(writer, table_path)?;
        let location = locate_cell(&table, table_path, cell_path).ok_or_else(|| {
            TableError::NotATableCell {
                path: cell_path.to_vec(),
            }
        })?;
        let split_column = location.column;
        let widen: Vec<(Path, usize)> = TableWalker::new(&table)
            .filter(|slot| {
                let same_column =
                    slot.column == split_column && slot.cell_path(table_path) != cell_path;
                let spans_over =
                    slot.column < split_column && slot.column + slot.cell_width > split_column;
                same_column || spans_over
            })
            .map(|slot| (slot.cell_path(table_path), slot.cell_width))
            .collect();
        for (path, width) in widen {
            writer.set_attribute(path, COLSPAN, width + to_insert)?;
        }
        create_cells(writer, to_insert, after, &span_attrs(1, height))?;

        let headings = heading_columns(&table);
        if headings > split_column {
            update_numeric_attribute(writer, table_path, HEADING_COLUMNS, headings + to_insert, 0)?;
        }
    }
    Ok(())
}

/// Splits the cell into `cells` stacked cells.
///
/// An existing rowspan is shared out first; when it is too short, new rows are added below
/// the cell and every other cell crossing its row grows over them.
pub fn split_cell_horizontally(
    writer: &mut Writer<'_>,
    cell_path: &[usize],
    cells: usize,
) -> Result<(), TableError> {
    check_split_count(cell_path, cells)?;
    let (table_path, row_index, _) = split_cell_path(cell_path)?;
    let cell = cell_at(writer.doc(), cell_path)?;
    let (width, height) = (colspan(cell), rowspan(cell));
    let table = table_snapshot(writer, table_path)?;
    let split_row = logical_row(&table, row_index);

    if height > 1 {
        let (new_cells_span, updated_span) = break_span_evenly(height, cells);
        let location = locate_cell(&table, table_path, cell_path).ok_or_else(|| {
            TableError::NotATableCell {
                path: cell_path.to_vec(),
            }
        })?;
        let first_new_row = split_row + updated_span;
        let positions: Vec<Path> = TableWalker::with_options(
            &table,
            WalkerOptions::new()
                .start_row(split_row)
                .end_row(split_row + height - 1)
                .include_all_slots(),
        )
        .filter(|slot| {
            slot.column == location.column
                && slot.row >= first_new_row
                && (slot.row - first_new_row) % new_cells_span == 0
        })
        .map(|slot| slot.position_before(table_path))
        .collect();

        update_numeric_attribute(writer, cell_path, ROWSPAN, updated_span, 1)?;
        for position in positions {
            create_empty_table_cell(writer, position, span_attrs(width, new_cells_span))?;
        }
    }

    if height < cells {
        let to_insert = cells - height;
        let table = table_snapshot(writer, table_path)?;
        let grow: Vec<(Path, usize)> =
            TableWalker::with_options(&table, WalkerOptions::new().end_row(split_row))
                .filter(|slot| {
                    !(slot.row_index == row_index && slot.cell_path(table_path) == cell_path)
                        && slot.row + slot.cell_height > split_row
                })
                .map(|slot| (slot.cell_path(table_path), slot.cell_height))
                .collect();
        for (path, height) in grow {
            writer.set_attribute(path, ROWSPAN, height + to_insert)?;
        }

        let mut row_path = table_path.to_vec();
        row_path.push(row_index + 1);
        for _ in 0..to_insert {
            writer.insert(row_path.clone(), empty_row(1, &span_attrs(width, 1)))?;
        }

        let headings = heading_rows(&table);
        if headings > split_row {
            update_numeric_attribute(writer, table_path, HEADING_ROWS, headings + to_insert, 0)?;
        }
    }
    Ok(())
}

fn is_empty_cell(cell: &ElementNode) -> bool {
    match cell.children.as_slice() {
        [Node::Element(block)] => {
            block.is(ElementKind::Paragraph)
                && block
                    .children
                    .iter()
                    .all(|child| matches!(child, Node::Text(text) if text.text.is_empty()))
        }
        _ => false,
    }
}

/// Width and height of the cell that covers all of `cells`, anchored at the first one.
fn get_merge_dimensions(
    table: &ElementNode,
    table_path: &[usize],
    first: &[usize],
    cells: &[Path],
) -> Option<(usize, usize)> {
    let origin = locate_cell(table, table_path, first)?;
    let mut right = 0;
    let mut bottom = 0;
    for slot in TableWalker::new(table) {
        if cells.iter().any(|cell| *cell == slot.cell_path(table_path)) {
            right = right.max(slot.column + slot.cell_width);
            bottom = bottom.max(slot.row + slot.cell_height);
        }
    }
    Some((
        right.saturating_sub(origin.column),
        bottom.saturating_sub(origin.row),
    ))
}

fn move_cell_content(
    writer: &mut Writer<'_>,
    from: &[usize],
    into: &[usize],
) -> Result<(), TableError> {
    let source = cell_at(writer.doc(), from)?;
    if is_empty_cell(source) {
        return Ok(());
    }
    let moving = source.children.len();

    let target = cell_at(writer.doc(), into)?;
    if is_empty_cell(target) {
        for _ in 0..target.children.len() {
            let mut path = into.to_vec();
            path.push(0);
            writer.remove(path)?;
        }
    }
    for _ in 0..moving {
        let end = cell_at(writer.doc(), into)?.children.len();
        let mut source_child = from.to_vec();
        source_child.push(0);
        let mut target_child = into.to_vec();
        target_child.push(end);
        writer.move_node(source_child, target_child)?;
    }
    Ok(())
}

/// Merges `cells` into the first of them (in document order) and returns its path.
///
/// The content of non-empty cells is appended to the first cell, replacing it when it was
/// empty. Rows and columns left without anchored cells are removed.
pub fn merge_cells(writer: &mut Writer<'_>, cells: &[Path]) -> Result<Path, TableError> {
    let mut cells = cells.to_vec();
    cells.sort();
    cells.dedup();
    let Some(first) = cells.first().cloned() else {
        return Err(TableError::NotATableCell { path: Vec::new() });
    };
    let (table_path, _, _) = split_cell_path(&first)?;
    let table_path = table_path.to_vec();
    let table = table_snapshot(writer, &table_path)?;
    let (width, height) = get_merge_dimensions(&table, &table_path, &first, &cells).ok_or_else(|| {
        TableError::NotATableCell {
            path: first.clone(),
        }
    })?;

    update_numeric_attribute(writer, &first, COLSPAN, width, 1)?;
    update_numeric_attribute(writer, &first, ROWSPAN, height, 1)?;
    for cell in &cells[1..] {
        move_cell_content(writer, cell, &first)?;
    }
    for cell in cells[1..].iter().rev() {
        writer.remove(cell.clone())?;
    }

    remove_empty_rows_columns(writer, &table_path)?;
    Ok(first)
}

/// Sets the number of heading rows, splitting cells that would straddle the new boundary.
pub fn set_heading_rows(
    writer: &mut Writer<'_>,
    table_path: &[usize],
    rows: usize,
) -> Result<(), TableError> {
    let table = table_snapshot(writer, table_path)?;
    let rows = rows.min(get_rows(&table));
    let current = heading_rows(&table);
    if rows > 0 {
        let start_row = if rows > current { current } else { 0 };
        let overlapping: Vec<Path> = get_vertically_overlapping_cells(&table, rows, start_row)
            .iter()
            .map(|slot| slot.cell_path(table_path))
            .collect();
        for cell in overlapping {
            split_horizontally(writer, &cell, rows)?;
        }
    }
    update_numeric_attribute(writer, table_path, HEADING_ROWS, rows, 0)?;
    Ok(())
}

/// Sets the number of heading columns, splitting cells that would straddle the new boundary.
pub fn set_heading_columns(
    writer: &mut Writer<'_>,
    table_path: &[usize],
    columns: usize,
) -> Result<(), TableError> {
    let table = table_snapshot(writer, table_path)?;
    let columns = columns.min(get_columns(&table));
    if columns > 0 {
        let overlapping: Vec<(Path, usize)> = get_horizontally_overlapping_cells(&table, columns)
            .iter()
            .map(|slot| (slot.cell_path(table_path), slot.column))
            .collect();
        for (cell, column) in overlapping {
            split_vertically(writer, &cell, column, columns)?;
        }
    }
    update_numeric_attribute(writer, table_path, HEADING_COLUMNS, columns, 0)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_remainder_stays_on_original_cell() {
        assert_eq!(break_span_evenly(7, 3), (2, 3));
        assert_eq!(break_span_evenly(4, 2), (2, 2));
        assert_eq!(break_span_evenly(2, 3), (1, 1));
    }

    #[test]
    fn index_range_spans_all_values() {
        assert_eq!(
            IndexRange::from_indexes([3, 1, 2]),
            Some(IndexRange { first: 1, last: 3 })
        );
        assert_eq!(IndexRange::from_indexes([]), None);
    }
}
