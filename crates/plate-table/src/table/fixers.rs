//! Normalize passes that keep tables well formed after every change batch.

use std::collections::{BTreeMap, HashSet};

use crate::core::{Attrs, Document, ElementKind, Node};
use crate::error::{ApplyError, TableError};
use crate::ops::{ChangeSet, Path, rebase};
use crate::plugin::NormalizePass;
use crate::writer::Writer;

use super::structure::{create_cells, empty_row, split_vertically, update_numeric_attribute};
use super::utils::get_rows;
use super::walker::{TableWalker, WalkerOptions};
use super::{
    COLSPAN, ROWSPAN, heading_columns, heading_rows, table_paths, table_rows, table_snapshot,
};

fn apply_error(err: TableError) -> ApplyError {
    match err {
        TableError::Apply(err) => err,
        other => ApplyError::InvalidPath(other.to_string()),
    }
}

/// Tables touched by `changes`, innermost and last first so that fixing one never moves the
/// next.
pub(crate) fn touched_tables(doc: &Document, changes: &ChangeSet) -> Vec<Path> {
    let mut tables = table_paths(doc);
    tables.retain(|path| changes.touches(path));
    tables.reverse();
    tables
}

/// Keeps every table a full rectangle: rowspans end at their section boundary, cells do not
/// straddle the heading columns, rows without slots are dropped and short rows are padded.
pub struct TableLayoutFixer;

impl TableLayoutFixer {
    fn fix_table(writer: &mut Writer<'_>, table_path: &[usize]) -> Result<(), TableError> {
        Self::trim_rowspans(writer, table_path)?;
        Self::split_heading_columns(writer, table_path)?;
        Self::remove_rows_without_slots(writer, table_path)?;
        Self::pad_short_rows(writer, table_path)?;

        let table = table_snapshot(writer, table_path)?;
        if get_rows(&table) == 0 {
            let mut path = table_path.to_vec();
            path.push(table.children.len());
            writer.insert(path, empty_row(1, &Attrs::new()))?;
        }
        Ok(())
    }

    fn trim_rowspans(writer: &mut Writer<'_>, table_path: &[usize]) -> Result<(), TableError> {
        let table = table_snapshot(writer, table_path)?;
        let headings = heading_rows(&table);
        let row_count = get_rows(&table);
        let trims: Vec<(Path, usize)> = TableWalker::new(&table)
            .filter(|slot| slot.cell_height > 1)
            .filter_map(|slot| {
                let limit = if slot.row < headings { headings } else { row_count };
                (slot.row + slot.cell_height > limit)
                    .then(|| (slot.cell_path(table_path), limit - slot.row))
            })
            .collect();
        for (path, rowspan) in trims {
            update_numeric_attribute(writer, &path, ROWSPAN, rowspan, 1)?;
        }
        Ok(())
    }

    fn split_heading_columns(
        writer: &mut Writer<'_>,
        table_path: &[usize],
    ) -> Result<(), TableError> {
        let table = table_snapshot(writer, table_path)?;
        let headings = heading_columns(&table);
        if headings == 0 {
            return Ok(());
        }
        let crossing: Vec<(Path, usize)> = TableWalker::new(&table)
            .filter(|slot| slot.column < headings && headings <= slot.last_column())
            .map(|slot| (slot.cell_path(table_path), slot.column))
            .collect();
        for (cell, column) in crossing {
            split_vertically(writer, &cell, column, headings)?;
        }
        Ok(())
    }

    fn slot_counts(table: &crate::core::ElementNode) -> BTreeMap<usize, usize> {
        let mut counts: BTreeMap<usize, usize> =
            table_rows(table).map(|(ix, _)| (ix, 0)).collect();
        for slot in TableWalker::with_options(table, WalkerOptions::new().include_all_slots()) {
            *counts.entry(slot.row_index).or_insert(0) += 1;
        }
        counts
    }

    fn remove_rows_without_slots(
        writer: &mut Writer<'_>,
        table_path: &[usize],
    ) -> Result<(), TableError> {
        let table = table_snapshot(writer, table_path)?;
        let empty: Vec<usize> = Self::slot_counts(&table)
            .into_iter()
            .filter(|(_, count)| *count == 0)
            .map(|(ix, _)| ix)
            .collect();
        for ix in empty.into_iter().rev() {
            let mut path = table_path.to_vec();
            path.push(ix);
            writer.remove(path)?;
        }
        Ok(())
    }

    fn pad_short_rows(writer: &mut Writer<'_>, table_path: &[usize]) -> Result<(), TableError> {
        let table = table_snapshot(writer, table_path)?;
        let counts = Self::slot_counts(&table);
        let widest = counts.values().copied().max().unwrap_or(0);
        for (ix, count) in counts {
            if count >= widest {
                continue;
            }
            let Some(row) = table.children.get(ix).and_then(Node::as_element) else {
                continue;
            };
            let mut position = table_path.to_vec();
            position.extend([ix, row.children.len()]);
            create_cells(writer, widest - count, position, &Attrs::new())?;
        }
        Ok(())
    }
}

impl NormalizePass for TableLayoutFixer {
    fn id(&self) -> &'static str {
        "table.layout"
    }

    fn run(&self, writer: &mut Writer<'_>, changes: &ChangeSet) -> Result<bool, ApplyError> {
        let before = writer.ops().len();
        for table_path in touched_tables(writer.doc(), changes) {
            Self::fix_table(writer, &table_path).map_err(apply_error)?;
        }
        Ok(writer.ops().len() > before)
    }
}

/// Gives every cell a block child and wraps text sitting directly in a cell into paragraphs.
pub struct CellContentFixer;

impl CellContentFixer {
    fn cell_paths(doc: &Document, table_path: &[usize]) -> Vec<Path> {
        let Ok(table) = super::table_at(doc, table_path) else {
            return Vec::new();
        };
        let mut cells = Vec::new();
        for (row_index, row) in table_rows(table) {
            for (cell_index, cell) in row.children.iter().enumerate() {
                if cell.element_of(ElementKind::TableCell).is_some() {
                    let mut path = table_path.to_vec();
                    path.extend([row_index, cell_index]);
                    cells.push(path);
                }
            }
        }
        cells
    }

    fn fix_cell(writer: &mut Writer<'_>, cell_path: &[usize]) -> Result<(), ApplyError> {
        let Some(cell) = writer.element(cell_path) else {
            return Ok(());
        };
        if cell.children.is_empty() {
            let mut path = cell_path.to_vec();
            path.push(0);
            return writer.insert(path, Node::paragraph(""));
        }

        // Runs of text children as (start, end) half-open index ranges.
        let mut runs: Vec<(usize, usize)> = Vec::new();
        for (ix, child) in cell.children.iter().enumerate() {
            if !matches!(child, Node::Text(_)) {
                continue;
            }
            match runs.last_mut() {
                Some((_, end)) if *end == ix => *end += 1,
                _ => runs.push((ix, ix + 1)),
            }
        }
        for (start, end) in runs.into_iter().rev() {
            let mut texts = Vec::with_capacity(end - start);
            for ix in (start..end).rev() {
                let mut path = cell_path.to_vec();
                path.push(ix);
                texts.push(writer.remove(path)?);
            }
            texts.reverse();
            let mut path = cell_path.to_vec();
            path.push(start);
            writer.insert(
                path,
                Node::element(ElementKind::Paragraph, Attrs::new(), texts),
            )?;
        }
        Ok(())
    }
}

impl NormalizePass for CellContentFixer {
    fn id(&self) -> &'static str {
        "table.cell_content"
    }

    fn run(&self, writer: &mut Writer<'_>, changes: &ChangeSet) -> Result<bool, ApplyError> {
        let before = writer.ops().len();
        for table_path in touched_tables(writer.doc(), changes) {
            for cell_path in Self::cell_paths(writer.doc(), &table_path).into_iter().rev() {
                Self::fix_cell(writer, &cell_path)?;
            }
        }
        Ok(writer.ops().len() > before)
    }
}

/// Applies the configured default attributes to cells created by a batch.
///
/// A cell counts as new when it was inserted by the batch and carries no attributes besides its
/// spans.
pub struct DefaultCellPropertiesFixer {
    defaults: Attrs,
}

impl DefaultCellPropertiesFixer {
    pub fn new(defaults: Attrs) -> Self {
        Self { defaults }
    }

    fn new_cells(doc: &Document, root: &[usize], out: &mut Vec<Path>) {
        let Some(element) = crate::core::node_ref(doc, root).and_then(Node::as_element) else {
            return;
        };
        if element.is(ElementKind::TableCell)
            && element
                .attrs
                .keys()
                .all(|key| key == COLSPAN || key == ROWSPAN)
        {
            out.push(root.to_vec());
        }
        for ix in 0..element.children.len() {
            let mut child = root.to_vec();
            child.push(ix);
            Self::new_cells(doc, &child, out);
        }
    }
}

impl NormalizePass for DefaultCellPropertiesFixer {
    fn id(&self) -> &'static str {
        "table.default_cell_properties"
    }

    fn run(&self, writer: &mut Writer<'_>, changes: &ChangeSet) -> Result<bool, ApplyError> {
        if self.defaults.is_empty() {
            return Ok(false);
        }
        // Earlier passes of this round may have moved the inserted subtrees.
        let mut cells = Vec::new();
        for root in changes.inserted() {
            if let Some(root) = rebase(root, writer.ops()) {
                Self::new_cells(writer.doc(), &root, &mut cells);
            }
        }
        let mut seen = HashSet::new();
        let before = writer.ops().len();
        for cell in cells {
            if !seen.insert(cell.clone()) {
                continue;
            }
            for (key, value) in &self.defaults {
                if key == COLSPAN || key == ROWSPAN {
                    continue;
                }
                writer.set_attribute(cell.clone(), key, value.clone())?;
            }
        }
        Ok(writer.ops().len() > before)
    }
}
