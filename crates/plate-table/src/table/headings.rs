use std::collections::HashMap;
use std::ops::Range;

use crate::core::{Document, ElementNode};
use crate::ops::{Op, Path, rebase};
use crate::plugin::ChangeObserver;

use super::walker::TableWalker;
use super::{heading_columns, heading_rows, table_at, table_paths};

/// Rows (or columns) whose heading role flips when the counter goes from `old` to `new`.
pub fn heading_affected_range(old: usize, new: usize) -> Range<usize> {
    old.min(new)..old.max(new)
}

/// Whether the slot at `row`/`column` belongs to a heading section.
pub fn is_heading_cell(table: &ElementNode, row: usize, column: usize) -> bool {
    row < heading_rows(table) || column < heading_columns(table)
}

/// Reports the cells that must be rendered again because their heading/body role changed.
///
/// Roles are derived from the table-level counters, so a counter change or a structural edit
/// that moves a cell across a boundary changes the rendered tag without touching the cell.
pub struct HeadingObserver;

impl HeadingObserver {
    fn table_invalidated(
        before: &ElementNode,
        before_path: &[usize],
        after: &ElementNode,
        after_path: &[usize],
        ops: &[Op],
    ) -> Vec<Path> {
        let old_roles: HashMap<Path, bool> = TableWalker::new(before)
            .filter_map(|slot| {
                let path = rebase(&slot.cell_path(before_path), ops)?;
                Some((path, is_heading_cell(before, slot.row, slot.column)))
            })
            .collect();
        let rows = heading_affected_range(heading_rows(before), heading_rows(after));
        let columns = heading_affected_range(heading_columns(before), heading_columns(after));

        TableWalker::new(after)
            .filter(|slot| {
                let Some(was_heading) = old_roles.get(&slot.cell_path(after_path)) else {
                    return false;
                };
                let in_changed_section = rows.contains(&slot.row) || columns.contains(&slot.column);
                in_changed_section || *was_heading != is_heading_cell(after, slot.row, slot.column)
            })
            .map(|slot| slot.cell_path(after_path))
            .collect()
    }
}

impl ChangeObserver for HeadingObserver {
    fn id(&self) -> &'static str {
        "table.headings"
    }

    fn invalidated(&self, before: &Document, after: &Document, ops: &[Op]) -> Vec<Path> {
        let mut invalidated = Vec::new();
        for before_path in table_paths(before) {
            let Ok(before_table) = table_at(before, &before_path) else {
                continue;
            };
            let Some(after_path) = rebase(&before_path, ops) else {
                continue;
            };
            let Ok(after_table) = table_at(after, &after_path) else {
                continue;
            };
            let paths =
                Self::table_invalidated(before_table, &before_path, after_table, &after_path, ops);
            for path in paths {
                if !invalidated.contains(&path) {
                    invalidated.push(path);
                }
            }
        }
        if !invalidated.is_empty() {
            tracing::trace!(cells = invalidated.len(), "heading roles changed");
        }
        invalidated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affected_range_is_half_open_between_counters() {
        assert_eq!(heading_affected_range(0, 2), 0..2);
        assert_eq!(heading_affected_range(3, 1), 1..3);
        assert!(heading_affected_range(2, 2).is_empty());
    }
}
