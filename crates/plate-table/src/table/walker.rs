use std::collections::{HashMap, HashSet};

use crate::core::{ElementKind, ElementNode};
use crate::ops::Path;

use super::{colspan, rowspan};

/// Region filter for a [`TableWalker`]. All bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkerOptions {
    pub start_row: Option<usize>,
    pub end_row: Option<usize>,
    pub start_column: Option<usize>,
    pub end_column: Option<usize>,
    pub include_all_slots: bool,
}

impl WalkerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the walk to a single row.
    pub fn row(mut self, row: usize) -> Self {
        self.start_row = Some(row);
        self.end_row = Some(row);
        self
    }

    /// Restricts the walk to a single column.
    pub fn column(mut self, column: usize) -> Self {
        self.start_column = Some(column);
        self.end_column = Some(column);
        self
    }

    pub fn start_row(mut self, row: usize) -> Self {
        self.start_row = Some(row);
        self
    }

    pub fn end_row(mut self, row: usize) -> Self {
        self.end_row = Some(row);
        self
    }

    pub fn start_column(mut self, column: usize) -> Self {
        self.start_column = Some(column);
        self
    }

    pub fn end_column(mut self, column: usize) -> Self {
        self.end_column = Some(column);
        self
    }

    /// Also yield slots covered by a cell anchored elsewhere.
    pub fn include_all_slots(mut self) -> Self {
        self.include_all_slots = true;
        self
    }
}

/// One position of the span-resolved grid.
///
/// `row`/`column` is the visited slot; `cell_anchor_row`/`cell_anchor_column` is where `cell` is
/// stored. The two differ only for slots covered by a span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableSlot<'a> {
    pub cell: &'a ElementNode,
    pub row: usize,
    pub column: usize,
    pub cell_anchor_row: usize,
    pub cell_anchor_column: usize,
    pub cell_width: usize,
    pub cell_height: usize,
    /// Child index of the visited row inside the table element.
    pub row_index: usize,
    /// Child index inside the visited row where a cell placed at this slot belongs. For anchor
    /// slots this is the index of `cell` itself.
    pub cell_index: usize,
    anchor_row_index: usize,
    anchor_cell_index: usize,
}

impl TableSlot<'_> {
    pub fn is_anchor(&self) -> bool {
        self.row == self.cell_anchor_row && self.column == self.cell_anchor_column
    }

    /// Path of the anchor cell, given the path of the walked table.
    pub fn cell_path(&self, table_path: &[usize]) -> Path {
        let mut path = table_path.to_vec();
        path.extend([self.anchor_row_index, self.anchor_cell_index]);
        path
    }

    /// Insertion path for a new cell placed at this slot.
    pub fn position_before(&self, table_path: &[usize]) -> Path {
        let mut path = table_path.to_vec();
        path.extend([self.row_index, self.cell_index]);
        path
    }

    pub fn last_row(&self) -> usize {
        self.cell_anchor_row + self.cell_height - 1
    }

    pub fn last_column(&self) -> usize {
        self.cell_anchor_column + self.cell_width - 1
    }
}

#[derive(Debug, Clone, Copy)]
struct SpanAnchor<'a> {
    cell: &'a ElementNode,
    row: usize,
    column: usize,
    row_index: usize,
    cell_index: usize,
}

/// Lazy row-major iterator over the logical grid of a table.
///
/// By default only anchor slots are yielded. Non-row children of the table are skipped without
/// advancing the row counter.
pub struct TableWalker<'a> {
    table: &'a ElementNode,
    start_row: usize,
    end_row: Option<usize>,
    start_column: usize,
    end_column: Option<usize>,
    include_all_slots: bool,
    skip_rows: HashSet<usize>,
    row: usize,
    row_index: usize,
    column: usize,
    cell_index: usize,
    next_cell_at_column: Option<usize>,
    spanned: HashMap<(usize, usize), SpanAnchor<'a>>,
    jumped_to_start_row: bool,
}

impl<'a> TableWalker<'a> {
    pub fn new(table: &'a ElementNode) -> Self {
        Self::with_options(table, WalkerOptions::default())
    }

    pub fn with_options(table: &'a ElementNode, options: WalkerOptions) -> Self {
        Self {
            table,
            start_row: options.start_row.unwrap_or(0),
            end_row: options.end_row,
            start_column: options.start_column.unwrap_or(0),
            end_column: options.end_column,
            include_all_slots: options.include_all_slots,
            skip_rows: HashSet::new(),
            row: 0,
            row_index: 0,
            column: 0,
            cell_index: 0,
            next_cell_at_column: None,
            spanned: HashMap::new(),
            jumped_to_start_row: false,
        }
    }

    /// Suppresses every slot of `row` that has not been yielded yet.
    pub fn skip_row(&mut self, row: usize) {
        self.skip_rows.insert(row);
    }

    fn advance_to_next_row(&mut self) {
        self.row += 1;
        self.row_index += 1;
        self.column = 0;
        self.cell_index = 0;
        self.next_cell_at_column = None;
    }

    fn should_skip_slot(&self) -> bool {
        self.skip_rows.contains(&self.row)
            || self.row < self.start_row
            || self.column < self.start_column
            || self.end_column.is_some_and(|end| self.column > end)
    }

    fn record_spans(&mut self, anchor: SpanAnchor<'a>, height: usize, width: usize) {
        for row in anchor.row..anchor.row + height {
            for column in anchor.column..anchor.column + width {
                if row != anchor.row || column != anchor.column {
                    self.spanned.insert((row, column), anchor);
                }
            }
        }
    }

    fn slot(&self, anchor: SpanAnchor<'a>) -> TableSlot<'a> {
        TableSlot {
            cell: anchor.cell,
            row: self.row,
            column: self.column,
            cell_anchor_row: anchor.row,
            cell_anchor_column: anchor.column,
            cell_width: colspan(anchor.cell),
            cell_height: rowspan(anchor.cell),
            row_index: self.row_index,
            cell_index: self.cell_index,
            anchor_row_index: anchor.row_index,
            anchor_cell_index: anchor.cell_index,
        }
    }

    /// Starts at the closest row at or above `start_row` that no span from above enters: in a
    /// well-formed table those are the rows whose own cells are as wide as the first row.
    fn jump_to_start_row(&mut self) {
        self.jumped_to_start_row = true;
        let rows: Vec<(usize, &ElementNode)> = self
            .table
            .children
            .iter()
            .enumerate()
            .filter_map(|(ix, child)| child.element_of(ElementKind::TableRow).map(|row| (ix, row)))
            .collect();
        let Some((_, first)) = rows.first() else {
            return;
        };
        let first_len = own_width(first);
        let mut candidate = self.start_row.min(rows.len().saturating_sub(1));
        while candidate > 0 && own_width(rows[candidate].1) != first_len {
            candidate -= 1;
        }
        self.row = candidate;
        self.row_index = rows[candidate].0;
    }
}

fn own_width(row: &ElementNode) -> usize {
    row.children
        .iter()
        .filter_map(|cell| cell.as_element())
        .map(colspan)
        .sum()
}

impl<'a> Iterator for TableWalker<'a> {
    type Item = TableSlot<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.start_row > 0 && !self.jumped_to_start_row {
                self.jump_to_start_row();
            }

            let row_node = self.table.children.get(self.row_index)?;
            if self.end_row.is_some_and(|end| self.row > end) {
                return None;
            }
            let Some(row) = row_node.element_of(ElementKind::TableRow) else {
                self.row_index += 1;
                continue;
            };
            if self.end_column.is_some_and(|end| self.column > end) {
                self.advance_to_next_row();
                continue;
            }

            let mut out = None;
            if let Some(anchor) = self.spanned.get(&(self.row, self.column)).copied() {
                if self.include_all_slots && !self.should_skip_slot() {
                    out = Some(self.slot(anchor));
                }
            } else {
                let Some(child) = row.children.get(self.cell_index) else {
                    self.advance_to_next_row();
                    continue;
                };
                let Some(cell) = child.as_element() else {
                    self.cell_index += 1;
                    continue;
                };
                let anchor = SpanAnchor {
                    cell,
                    row: self.row,
                    column: self.column,
                    row_index: self.row_index,
                    cell_index: self.cell_index,
                };
                let (width, height) = (colspan(cell), rowspan(cell));
                if width > 1 || height > 1 {
                    self.record_spans(anchor, height, width);
                }
                if !self.should_skip_slot() {
                    out = Some(self.slot(anchor));
                }
                self.next_cell_at_column = Some(self.column + width);
            }

            self.column += 1;
            if Some(self.column) == self.next_cell_at_column {
                self.cell_index += 1;
            }
            if out.is_some() {
                return out;
            }
        }
    }
}
