//! Table geometry: grid walking, structural edits, repair passes and clipboard support.
//!
//! A table is an element of kind [`ElementKind::Table`] whose row children hold cells. Cells are
//! addressed by path (`table + [row child index, cell index]`); nothing here caches positions
//! across mutations.

mod clipboard;
mod commands;
mod fixers;
mod headings;
mod selection;
mod structure;
mod utils;
mod walker;

pub use clipboard::*;
pub use fixers::{CellContentFixer, DefaultCellPropertiesFixer, TableLayoutFixer};
pub use headings::*;
pub use selection::*;
pub use structure::*;
pub use utils::*;
pub use walker::*;

use crate::config::TableConfig;
use crate::core::{Document, ElementKind, ElementNode, Node, node_ref};
use crate::error::TableError;
use crate::ops::Path;
use crate::plugin::{ChangeObserver, CommandSpec, NormalizePass, PlatePlugin, QuerySpec};
use crate::writer::Writer;

pub const COLSPAN: &str = "colspan";
pub const ROWSPAN: &str = "rowspan";
pub const HEADING_ROWS: &str = "heading_rows";
pub const HEADING_COLUMNS: &str = "heading_columns";

pub fn colspan(cell: &ElementNode) -> usize {
    cell.numeric_attr(COLSPAN).unwrap_or(1).max(1)
}

pub fn rowspan(cell: &ElementNode) -> usize {
    cell.numeric_attr(ROWSPAN).unwrap_or(1).max(1)
}

pub fn heading_rows(table: &ElementNode) -> usize {
    table.numeric_attr(HEADING_ROWS).unwrap_or(0)
}

pub fn heading_columns(table: &ElementNode) -> usize {
    table.numeric_attr(HEADING_COLUMNS).unwrap_or(0)
}

/// Row elements of a table with their child index.
pub(crate) fn table_rows(table: &ElementNode) -> impl Iterator<Item = (usize, &ElementNode)> {
    table
        .children
        .iter()
        .enumerate()
        .filter_map(|(ix, child)| child.element_of(ElementKind::TableRow).map(|row| (ix, row)))
}

/// Child index of the `row`-th row element.
pub(crate) fn row_child_index(table: &ElementNode, row: usize) -> Option<usize> {
    table_rows(table).nth(row).map(|(ix, _)| ix)
}

/// Child index where a row inserted as the `row`-th row belongs.
pub(crate) fn row_insert_index(table: &ElementNode, row: usize) -> usize {
    row_child_index(table, row).unwrap_or_else(|| {
        table_rows(table)
            .last()
            .map(|(ix, _)| ix + 1)
            .unwrap_or(0)
    })
}

/// Logical row number of the row stored at `child_index`.
pub(crate) fn logical_row(table: &ElementNode, child_index: usize) -> usize {
    table_rows(table)
        .take_while(|(ix, _)| *ix < child_index)
        .count()
}

pub(crate) fn table_at<'a>(
    doc: &'a Document,
    path: &[usize],
) -> Result<&'a ElementNode, TableError> {
    node_ref(doc, path)
        .and_then(|node| node.element_of(ElementKind::Table))
        .ok_or_else(|| TableError::NotATable {
            path: path.to_vec(),
        })
}

/// Owned copy of the table at `path` as the writer currently sees it.
pub(crate) fn table_snapshot(
    writer: &Writer<'_>,
    path: &[usize],
) -> Result<ElementNode, TableError> {
    table_at(writer.doc(), path).cloned()
}

pub(crate) fn cell_at<'a>(
    doc: &'a Document,
    path: &[usize],
) -> Result<&'a ElementNode, TableError> {
    node_ref(doc, path)
        .and_then(|node| node.element_of(ElementKind::TableCell))
        .ok_or_else(|| TableError::NotATableCell {
            path: path.to_vec(),
        })
}

/// Splits a cell path into the table path, the row child index and the cell index.
pub(crate) fn split_cell_path(path: &[usize]) -> Result<(&[usize], usize, usize), TableError> {
    match path {
        [table @ .., row, cell] if !table.is_empty() => Ok((table, *row, *cell)),
        _ => Err(TableError::NotATableCell {
            path: path.to_vec(),
        }),
    }
}

fn collect_tables(children: &[Node], prefix: &mut Path, out: &mut Vec<Path>) {
    for (ix, child) in children.iter().enumerate() {
        let Node::Element(element) = child else {
            continue;
        };
        prefix.push(ix);
        if element.is(ElementKind::Table) {
            out.push(prefix.clone());
        }
        collect_tables(&element.children, prefix, out);
        prefix.pop();
    }
}

/// Paths of every table in the document, nested ones included, in document order.
pub(crate) fn table_paths(doc: &Document) -> Vec<Path> {
    let mut tables = Vec::new();
    collect_tables(&doc.children, &mut Vec::new(), &mut tables);
    tables
}

/// Closest element of `kind` at `path` or above it.
pub fn find_ancestor(doc: &Document, path: &[usize], kind: ElementKind) -> Option<Path> {
    (1..=path.len()).rev().find_map(|len| {
        let candidate = &path[..len];
        node_ref(doc, candidate)
            .and_then(|node| node.element_of(kind))
            .map(|_| candidate.to_vec())
    })
}

/// A blank cell holding one empty paragraph.
pub fn empty_cell(attrs: crate::core::Attrs) -> Node {
    Node::element(ElementKind::TableCell, attrs, vec![Node::paragraph("")])
}

/// Registers the table repair passes, the heading re-render observer and the `table.*`
/// commands and queries.
pub struct TablePlugin {
    config: TableConfig,
}

impl TablePlugin {
    pub fn new(config: TableConfig) -> Self {
        Self { config }
    }
}

impl PlatePlugin for TablePlugin {
    fn id(&self) -> &'static str {
        "table"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![
            Box::new(TableLayoutFixer),
            Box::new(CellContentFixer),
            Box::new(DefaultCellPropertiesFixer::new(
                self.config.default_cell_properties.clone(),
            )),
        ]
    }

    fn change_observers(&self) -> Vec<Box<dyn ChangeObserver>> {
        vec![Box::new(HeadingObserver)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        commands::commands(&self.config)
    }

    fn queries(&self) -> Vec<QuerySpec> {
        commands::queries()
    }
}
