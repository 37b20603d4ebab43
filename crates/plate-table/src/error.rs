use thiserror::Error;

use crate::ops::Path;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("normalization did not converge")]
    NormalizeDidNotConverge,
}

impl From<PathError> for ApplyError {
    fn from(value: PathError) -> Self {
        ApplyError::InvalidPath(value.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PathError(pub String);

/// Precondition failures raised by the table utilities.
///
/// Every variant carries the path of the table it was raised for and the options that were
/// rejected, so hosts can log them without re-deriving context. Validation always happens before
/// the first mutation of a batch is issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("cannot insert {rows} row(s) at {at}: the table has {row_count} rows")]
    InsertRowsOutOfRange {
        table: Path,
        at: usize,
        rows: usize,
        row_count: usize,
    },
    #[error("cannot insert {columns} column(s) at {at}: the table has {column_count} columns")]
    InsertColumnsOutOfRange {
        table: Path,
        at: usize,
        columns: usize,
        column_count: usize,
    },
    #[error("cannot remove {rows} row(s) at {at}: the table has {row_count} rows")]
    RemoveRowsOutOfRange {
        table: Path,
        at: usize,
        rows: usize,
        row_count: usize,
    },
    #[error("cannot remove {columns} column(s) at {at}: the table has {column_count} columns")]
    RemoveColumnsOutOfRange {
        table: Path,
        at: usize,
        columns: usize,
        column_count: usize,
    },
    #[error("cannot split a cell into {cells} cells")]
    InvalidSplitCount { cell: Path, cells: usize },
    #[error("no table at {path:?}")]
    NotATable { path: Path },
    #[error("no table cell at {path:?}")]
    NotATableCell { path: Path },
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

impl TableError {
    /// Stable identifier for host-side logging.
    pub fn code(&self) -> &'static str {
        match self {
            TableError::InsertRowsOutOfRange { .. } => "tableutils-insertrows-insert-out-of-range",
            TableError::InsertColumnsOutOfRange { .. } => {
                "tableutils-insertcolumns-insert-out-of-range"
            }
            TableError::RemoveRowsOutOfRange { .. } => {
                "tableutils-removerows-row-index-out-of-range"
            }
            TableError::RemoveColumnsOutOfRange { .. } => {
                "tableutils-removecolumns-column-index-out-of-range"
            }
            TableError::InvalidSplitCount { .. } => "tableutils-splitcell-invalid-count",
            TableError::NotATable { .. } => "tableutils-not-a-table",
            TableError::NotATableCell { .. } => "tableutils-not-a-table-cell",
            TableError::Apply(_) => "tableutils-apply-failed",
        }
    }

    pub fn table(&self) -> Option<&[usize]> {
        match self {
            TableError::InsertRowsOutOfRange { table, .. }
            | TableError::InsertColumnsOutOfRange { table, .. }
            | TableError::RemoveRowsOutOfRange { table, .. }
            | TableError::RemoveColumnsOutOfRange { table, .. } => Some(table),
            TableError::NotATable { path } => Some(path),
            TableError::InvalidSplitCount { .. }
            | TableError::NotATableCell { .. }
            | TableError::Apply(_) => None,
        }
    }
}
