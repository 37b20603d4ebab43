use serde_json::Value;

use crate::core::{
    AttrPatch, Attrs, Document, ElementKind, ElementNode, Node, Selection, apply_op_to, node_ref,
};
use crate::error::ApplyError;
use crate::ops::{Op, Path};

/// Mutation handle for one change batch.
///
/// Every call is applied to the working document immediately and recorded, so reads made after
/// a mutation observe it. Paths always refer to the current state of the working document.
pub struct Writer<'a> {
    doc: &'a mut Document,
    ops: Vec<Op>,
    selection_after: Option<Selection>,
}

impl<'a> Writer<'a> {
    pub fn new(doc: &'a mut Document) -> Self {
        Self {
            doc,
            ops: Vec::new(),
            selection_after: None,
        }
    }

    pub fn doc(&self) -> &Document {
        self.doc
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        node_ref(self.doc, path)
    }

    pub fn element(&self, path: &[usize]) -> Option<&ElementNode> {
        self.node(path)?.as_element()
    }

    pub fn apply(&mut self, op: Op) -> Result<(), ApplyError> {
        apply_op_to(self.doc, &op)?;
        self.ops.push(op);
        Ok(())
    }

    pub fn insert(&mut self, path: Path, node: Node) -> Result<(), ApplyError> {
        self.apply(Op::InsertNode { path, node })
    }

    /// Inserts an element of `kind` with no children.
    pub fn insert_element(
        &mut self,
        kind: ElementKind,
        attrs: Attrs,
        path: Path,
    ) -> Result<(), ApplyError> {
        self.insert(path, Node::element(kind, attrs, Vec::new()))
    }

    /// Removes the node at `path` and returns a copy of it.
    pub fn remove(&mut self, path: Path) -> Result<Node, ApplyError> {
        let removed = self
            .node(&path)
            .cloned()
            .ok_or_else(|| ApplyError::InvalidPath(format!("Nothing to remove at {path:?}")))?;
        self.apply(Op::RemoveNode { path })?;
        Ok(removed)
    }

    pub fn move_node(&mut self, from: Path, to: Path) -> Result<(), ApplyError> {
        self.apply(Op::MoveNode { from, to })
    }

    pub fn set_attribute(
        &mut self,
        path: Path,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<(), ApplyError> {
        let value = value.into();
        if self
            .element(&path)
            .is_some_and(|el| el.attrs.get(key) == Some(&value))
        {
            return Ok(());
        }
        self.apply(Op::SetNodeAttrs {
            path,
            patch: AttrPatch::set(key, value),
        })
    }

    pub fn remove_attribute(&mut self, path: Path, key: &str) -> Result<(), ApplyError> {
        if self
            .element(&path)
            .is_some_and(|el| !el.attrs.contains_key(key))
        {
            return Ok(());
        }
        self.apply(Op::SetNodeAttrs {
            path,
            patch: AttrPatch::remove(key),
        })
    }

    /// Selection to install once the batch commits, expressed in the document as it is when the
    /// batch's own ops are done.
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection_after = Some(selection);
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn has_changes(&self) -> bool {
        !self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<Op> {
        self.ops
    }

    pub fn into_parts(self) -> (Vec<Op>, Option<Selection>) {
        (self.ops, self.selection_after)
    }
}
