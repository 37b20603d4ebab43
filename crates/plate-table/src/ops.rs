use serde::{Deserialize, Serialize};

use crate::core::{AttrPatch, Node, Selection};

pub type Path = Vec<usize>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    InsertNode {
        #[serde(default)]
        path: Path,
        node: Node,
    },
    RemoveNode {
        #[serde(default)]
        path: Path,
    },
    /// Removes the node at `from`, then inserts it at `to`. `to` is resolved against the
    /// document after the removal.
    MoveNode { from: Path, to: Path },
    SetNodeAttrs {
        #[serde(default)]
        path: Path,
        patch: AttrPatch,
    },
}

impl Op {
    /// The path whose subtree this op changed, expressed in the document right after the op.
    fn touched_path(&self) -> Vec<Path> {
        match self {
            Op::InsertNode { path, .. } | Op::SetNodeAttrs { path, .. } => vec![path.clone()],
            Op::RemoveNode { path } => vec![parent_path(path).to_vec()],
            Op::MoveNode { from, to } => {
                // The source parent is expressed before the insert; rebase it across it.
                let source = shift_after_insert(parent_path(from), to);
                vec![source, to.clone()]
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub ops: Vec<Op>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_after: Option<Selection>,
    #[serde(default)]
    pub meta: TransactionMeta,
}

impl Transaction {
    pub fn new(ops: Vec<Op>) -> Self {
        Self {
            ops,
            selection_after: None,
            meta: TransactionMeta::default(),
        }
    }

    pub fn selection_after(mut self, selection_after: Selection) -> Self {
        self.selection_after = Some(selection_after);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.meta.source = Some(source.into());
        self
    }
}

pub(crate) fn parent_path(path: &[usize]) -> &[usize] {
    path.split_last().map(|(_, parent)| parent).unwrap_or(&[])
}

fn shift_after_insert(path: &[usize], at: &[usize]) -> Path {
    let mut path = path.to_vec();
    let Some((&index, parent)) = at.split_last() else {
        return path;
    };
    let depth = parent.len();
    if path.len() > depth && path.starts_with(parent) && path[depth] >= index {
        path[depth] += 1;
    }
    path
}

fn shift_after_remove(path: &[usize], at: &[usize]) -> Option<Path> {
    let mut path = path.to_vec();
    let Some((&index, parent)) = at.split_last() else {
        return None;
    };
    let depth = parent.len();
    if path.len() > depth && path.starts_with(parent) {
        if path[depth] == index {
            return None;
        }
        if path[depth] > index {
            path[depth] -= 1;
        }
    }
    Some(path)
}

/// Maps `path` from the document before `op` to the document after it.
///
/// Returns `None` when the node at `path` (or one of its ancestors) was removed by the op.
pub fn transform_path(path: &[usize], op: &Op) -> Option<Path> {
    match op {
        Op::InsertNode { path: at, .. } => Some(shift_after_insert(path, at)),
        Op::RemoveNode { path: at } => shift_after_remove(path, at),
        Op::SetNodeAttrs { .. } => Some(path.to_vec()),
        Op::MoveNode { from, to } => {
            if !from.is_empty() && path.starts_with(from) {
                let mut moved = to.clone();
                moved.extend_from_slice(&path[from.len()..]);
                return Some(moved);
            }
            shift_after_remove(path, from).map(|path| shift_after_insert(&path, to))
        }
    }
}

/// Rebases `path` across `ops`. A removed path collapses onto the parent of the removed node
/// and keeps being rebased from there.
fn rebase_or_ancestor(path: &[usize], ops: &[Op]) -> Path {
    let mut path = path.to_vec();
    for op in ops {
        path = match transform_path(&path, op) {
            Some(next) => next,
            None => match op {
                Op::RemoveNode { path: removed } | Op::MoveNode { from: removed, .. } => {
                    parent_path(removed).to_vec()
                }
                Op::InsertNode { .. } | Op::SetNodeAttrs { .. } => path,
            },
        };
    }
    path
}

/// Rebases `path` across `ops`, or `None` once the node is removed.
pub(crate) fn rebase(path: &[usize], ops: &[Op]) -> Option<Path> {
    let mut path = path.to_vec();
    for op in ops {
        path = transform_path(&path, op)?;
    }
    Some(path)
}

/// What a batch of ops changed, expressed in the coordinates of the document after the batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    touched: Vec<Path>,
    inserted: Vec<Path>,
}

impl ChangeSet {
    pub fn from_ops(ops: &[Op]) -> Self {
        let mut touched: Vec<Path> = Vec::new();
        let mut inserted: Vec<Path> = Vec::new();

        for (ix, op) in ops.iter().enumerate() {
            let later = &ops[ix + 1..];
            for path in op.touched_path() {
                let path = rebase_or_ancestor(&path, later);
                if !touched.contains(&path) {
                    touched.push(path);
                }
            }
            if let Op::InsertNode { path, .. } = op {
                if let Some(path) = rebase(path, later) {
                    if !inserted.contains(&path) {
                        inserted.push(path);
                    }
                }
            }
        }

        Self { touched, inserted }
    }

    /// A change set that touches every node, used when normalizing a freshly loaded document.
    pub fn whole_document() -> Self {
        Self {
            touched: vec![Vec::new()],
            inserted: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.touched.is_empty()
    }

    /// Whether the subtree rooted at `path` was changed, or was itself inserted or replaced.
    pub fn touches(&self, path: &[usize]) -> bool {
        self.touched
            .iter()
            .any(|touched| touched.starts_with(path) || path.starts_with(touched))
    }

    /// Roots of the subtrees inserted by the batch that still exist after it.
    pub fn inserted(&self) -> &[Path] {
        &self.inserted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_shifts_following_siblings_only() {
        let op = Op::InsertNode {
            path: vec![0, 1],
            node: Node::paragraph(""),
        };
        assert_eq!(transform_path(&[0, 0, 3], &op), Some(vec![0, 0, 3]));
        assert_eq!(transform_path(&[0, 1, 3], &op), Some(vec![0, 2, 3]));
        assert_eq!(transform_path(&[1, 1], &op), Some(vec![1, 1]));
        assert_eq!(transform_path(&[0], &op), Some(vec![0]));
    }

    #[test]
    fn remove_drops_descendants() {
        let op = Op::RemoveNode { path: vec![2, 1] };
        assert_eq!(transform_path(&[2, 1, 0], &op), None);
        assert_eq!(transform_path(&[2, 3], &op), Some(vec![2, 2]));
        assert_eq!(transform_path(&[2], &op), Some(vec![2]));
    }

    #[test]
    fn move_carries_subtree() {
        let op = Op::MoveNode {
            from: vec![0, 0, 1],
            to: vec![0, 2, 0],
        };
        assert_eq!(transform_path(&[0, 0, 1, 0], &op), Some(vec![0, 2, 0, 0]));
        assert_eq!(transform_path(&[0, 0, 2], &op), Some(vec![0, 0, 1]));
        assert_eq!(transform_path(&[0, 2, 0], &op), Some(vec![0, 2, 1]));
    }

    #[test]
    fn change_set_rebases_inserted_paths() {
        let ops = vec![
            Op::InsertNode {
                path: vec![0, 1],
                node: Node::paragraph(""),
            },
            Op::InsertNode {
                path: vec![0, 0],
                node: Node::paragraph(""),
            },
            Op::RemoveNode { path: vec![0, 5] },
        ];
        let changes = ChangeSet::from_ops(&ops);
        assert_eq!(changes.inserted(), &[vec![0, 2], vec![0, 0]]);
        assert!(changes.touches(&[0]));
        assert!(changes.touches(&[0, 2, 0]));
        assert!(changes.touches(&[]));
        assert!(!changes.touches(&[1]));
    }
}
