use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EditorConfig;
use crate::error::{ApplyError, PathError};
use crate::ops::{ChangeSet, Op, Path, Transaction, transform_path};
use crate::plugin::{CommandError, PluginRegistry, QueryError};
use crate::writer::Writer;

pub type Attrs = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

/// Element kinds known to the table engine. The set is closed: a node's kind is decided once,
/// when the document is built or deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Table,
    TableRow,
    TableCell,
    Paragraph,
    Heading,
    Caption,
}

impl ElementKind {
    /// Blocks that hold inline content directly.
    pub fn is_text_block(self) -> bool {
        matches!(
            self,
            ElementKind::Paragraph | ElementKind::Heading | ElementKind::Caption
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
}

impl Node {
    pub fn paragraph(text: impl Into<String>) -> Self {
        let text = text.into();
        let children = if text.is_empty() {
            Vec::new()
        } else {
            vec![Node::text(text)]
        };
        Node::Element(ElementNode {
            kind: ElementKind::Paragraph,
            attrs: Attrs::default(),
            children,
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode { text: text.into() })
    }

    pub fn element(kind: ElementKind, attrs: Attrs, children: Vec<Node>) -> Self {
        Node::Element(ElementNode {
            kind,
            attrs,
            children,
        })
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    /// The element, if this node is an element of `kind`.
    pub fn element_of(&self, kind: ElementKind) -> Option<&ElementNode> {
        self.as_element().filter(|el| el.kind == kind)
    }

    pub fn text_content(&self) -> String {
        match self {
            Node::Text(t) => t.text.clone(),
            Node::Element(el) => el.text_content(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl ElementNode {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            attrs: Attrs::default(),
            children: Vec::new(),
        }
    }

    pub fn is(&self, kind: ElementKind) -> bool {
        self.kind == kind
    }

    /// Reads a non-negative integer attribute. Anything else counts as absent.
    pub fn numeric_attr(&self, key: &str) -> Option<usize> {
        self.attrs
            .get(key)
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
    }

    /// Inline text of text blocks; block children are joined with newlines.
    pub fn text_content(&self) -> String {
        let parts: Vec<String> = self.children.iter().map(Node::text_content).collect();
        if self.kind.is_text_block() {
            parts.concat()
        } else {
            parts.join("\n")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

/// A range between two points. When a point's path names an element, its offset is a child
/// index, so a range can wrap exactly one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRange {
    pub anchor: Point,
    pub focus: Point,
}

impl SelectionRange {
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    /// A range wrapping the node at `path`.
    pub fn on(path: &[usize]) -> Self {
        let Some((&index, parent)) = path.split_last() else {
            return Self::collapsed(Point::new(Vec::new(), 0));
        };
        Self {
            anchor: Point::new(parent.to_vec(), index),
            focus: Point::new(parent.to_vec(), index + 1),
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn start(&self) -> &Point {
        if self.anchor <= self.focus {
            &self.anchor
        } else {
            &self.focus
        }
    }

    pub fn end(&self) -> &Point {
        if self.anchor <= self.focus {
            &self.focus
        } else {
            &self.anchor
        }
    }

    /// The single element this range wraps, if it wraps exactly one.
    pub fn contained_element(&self, doc: &Document) -> Option<Path> {
        let (start, end) = (self.start(), self.end());
        if start.path != end.path || end.offset != start.offset + 1 {
            return None;
        }
        if !start.path.is_empty() && node_ref(doc, &start.path)?.as_element().is_none() {
            return None;
        }
        let mut path = start.path.clone();
        path.push(start.offset);
        node_ref(doc, &path)?.as_element()?;
        Some(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub ranges: Vec<SelectionRange>,
}

impl Selection {
    pub fn collapsed(point: Point) -> Self {
        Self {
            ranges: vec![SelectionRange::collapsed(point)],
        }
    }

    /// One range per element, e.g. a multi-cell table selection.
    pub fn on_elements<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Self {
        Self {
            ranges: paths.into_iter().map(|p| SelectionRange::on(p)).collect(),
        }
    }

    pub fn ranges(&self) -> &[SelectionRange] {
        &self.ranges
    }

    pub fn is_collapsed(&self) -> bool {
        self.ranges.iter().all(SelectionRange::is_collapsed)
    }

    pub fn focus(&self) -> Option<&Point> {
        self.ranges.last().map(|r| &r.focus)
    }
}

pub struct Editor {
    doc: Document,
    selection: Selection,
    registry: PluginRegistry,
    config: EditorConfig,
    invalidated: Vec<Path>,
}

impl Editor {
    pub fn new(doc: Document, selection: Selection, registry: PluginRegistry) -> Self {
        Self::with_registry_and_config(doc, selection, registry, EditorConfig::default())
    }

    pub fn with_config(doc: Document, selection: Selection, config: EditorConfig) -> Self {
        let config = config.with_defaults();
        let registry = PluginRegistry::tables(&config.table);
        Self::with_registry_and_config(doc, selection, registry, config)
    }

    fn with_registry_and_config(
        doc: Document,
        selection: Selection,
        registry: PluginRegistry,
        config: EditorConfig,
    ) -> Self {
        let mut editor = Self {
            doc,
            selection,
            registry,
            config: config.with_defaults(),
            invalidated: Vec::new(),
        };
        editor.normalize_in_place();
        editor
    }

    pub fn with_core_plugins() -> Self {
        let doc = Document {
            children: vec![Node::paragraph("")],
        };
        let selection = Selection::collapsed(Point::new(vec![0], 0));
        Self::new(doc, selection, PluginRegistry::core())
    }

    pub fn with_table_plugins() -> Self {
        let doc = Document {
            children: vec![Node::paragraph("")],
        };
        let selection = Selection::collapsed(Point::new(vec![0], 0));
        Self::with_config(doc, selection, EditorConfig::default())
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
        self.normalize_selection_in_place();
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Paths of nodes whose rendered form went stale during the batches since the last call.
    pub fn take_invalidated(&mut self) -> Vec<Path> {
        std::mem::take(&mut self.invalidated)
    }

    /// Runs `f` as one atomic batch.
    ///
    /// `f` works on a copy of the document. If it fails, nothing is applied. Otherwise the
    /// registered normalize passes run to a fixed point and the result is committed.
    pub fn change<T, E>(&mut self, f: impl FnOnce(&mut Writer<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<ApplyError>,
    {
        let mut doc = self.doc.clone();
        let mut writer = Writer::new(&mut doc);
        let value = f(&mut writer)?;
        let (ops, selection_after) = writer.into_parts();
        self.commit(doc, ops, selection_after)?;
        Ok(value)
    }

    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        let Transaction {
            ops,
            selection_after,
            ..
        } = tx;
        self.change(|writer| {
            for op in ops {
                writer.apply(op)?;
            }
            if let Some(selection) = selection_after {
                writer.set_selection(selection);
            }
            Ok::<_, ApplyError>(())
        })
    }

    fn commit(
        &mut self,
        mut doc: Document,
        mut ops: Vec<Op>,
        selection_after: Option<Selection>,
    ) -> Result<(), ApplyError> {
        let batch_len = ops.len();
        let mut selection = match selection_after {
            Some(selection) => selection,
            None => rebase_selection(&self.selection, &ops),
        };

        let fix_ops = self.registry.normalize(
            &mut doc,
            ChangeSet::from_ops(&ops),
            self.config.max_normalize_iterations,
        )?;
        selection = rebase_selection(&selection, &fix_ops);
        ops.extend(fix_ops);

        for observer in self.registry.change_observers() {
            for path in observer.invalidated(&self.doc, &doc, &ops) {
                if !self.invalidated.contains(&path) {
                    self.invalidated.push(path);
                }
            }
        }

        tracing::debug!(
            ops = batch_len,
            fix_ops = ops.len() - batch_len,
            "committed change batch"
        );

        self.doc = doc;
        self.selection = selection;
        self.normalize_selection_in_place();
        Ok(())
    }

    pub fn run_command(
        &mut self,
        id: &str,
        args: Option<serde_json::Value>,
    ) -> Result<(), CommandError> {
        let Some(command) = self.registry.command(id) else {
            return Err(CommandError::new(format!("Unknown command: {id}")));
        };
        (command.handler)(self, args)
    }

    pub fn run_query_json(&self, id: &str, args: Option<Value>) -> Result<Value, QueryError> {
        let Some(query) = self.registry.query(id) else {
            return Err(QueryError::new(format!("Unknown query: {id}")));
        };
        (query.handler)(self, args)
    }

    pub fn run_query<T>(&self, id: &str, args: Option<Value>) -> Result<T, QueryError>
    where
        T: DeserializeOwned,
    {
        let value = self.run_query_json(id, args)?;
        serde_json::from_value(value)
            .map_err(|err| QueryError::new(format!("Failed to decode query result: {err}")))
    }

    /// Normalizes the whole document. On failure the document is kept as loaded.
    fn normalize_in_place(&mut self) {
        let mut doc = self.doc.clone();
        let result = self.registry.normalize(
            &mut doc,
            ChangeSet::whole_document(),
            self.config.max_normalize_iterations,
        );
        match result {
            Ok(ops) => {
                self.doc = doc;
                self.selection = rebase_selection(&self.selection, &ops);
            }
            Err(err) => tracing::warn!(%err, "initial normalization failed"),
        }
        self.normalize_selection_in_place();
    }

    fn normalize_selection_in_place(&mut self) {
        self.selection = normalize_selection(&self.doc, &self.selection);
    }
}

fn rebase_point(point: &Point, ops: &[Op]) -> Option<Point> {
    let mut path = point.path.clone();
    for op in ops {
        path = transform_path(&path, op)?;
    }
    Some(Point::new(path, point.offset))
}

fn rebase_selection(selection: &Selection, ops: &[Op]) -> Selection {
    let ranges = selection
        .ranges
        .iter()
        .filter_map(|range| {
            Some(SelectionRange {
                anchor: rebase_point(&range.anchor, ops)?,
                focus: rebase_point(&range.focus, ops)?,
            })
        })
        .collect();
    Selection { ranges }
}

fn point_exists(doc: &Document, point: &Point) -> bool {
    if point.path.is_empty() {
        return point.offset <= doc.children.len();
    }
    match node_ref(doc, &point.path) {
        Some(Node::Text(t)) => point.offset <= t.text.len(),
        Some(Node::Element(el)) => point.offset <= el.children.len(),
        None => false,
    }
}

fn first_caret_point(doc: &Document) -> Option<Point> {
    fn walk(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
        for (ix, node) in children.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };
            path.push(ix);
            if el.kind.is_text_block() {
                return Some(Point::new(path.clone(), 0));
            }
            if let Some(point) = walk(&el.children, path) {
                return Some(point);
            }
            path.pop();
        }
        None
    }
    walk(&doc.children, &mut Vec::new())
}

fn normalize_selection(doc: &Document, selection: &Selection) -> Selection {
    let ranges: Vec<SelectionRange> = selection
        .ranges
        .iter()
        .filter(|range| point_exists(doc, &range.anchor) && point_exists(doc, &range.focus))
        .cloned()
        .collect();
    if !ranges.is_empty() {
        return Selection { ranges };
    }
    let fallback = first_caret_point(doc).unwrap_or(Point::new(Vec::new(), 0));
    Selection::collapsed(fallback)
}

pub(crate) fn node_ref<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    let (&first, rest) = path.split_first()?;
    let mut node = doc.children.get(first)?;
    for &ix in rest {
        node = match node {
            Node::Element(el) => el.children.get(ix)?,
            Node::Text(_) => return None,
        };
    }
    Some(node)
}

pub(crate) fn node_mut<'a>(
    doc: &'a mut Document,
    path: &[usize],
) -> Result<&'a mut Node, PathError> {
    let Some((&first, rest)) = path.split_first() else {
        return Err(PathError("Empty path".into()));
    };
    let len = doc.children.len();
    let node = doc
        .children
        .get_mut(first)
        .ok_or_else(|| PathError(format!("Path out of bounds at depth 0: {first} >= {len}")))?;
    descend_mut(node, rest, 1)
}

fn descend_mut<'a>(
    node: &'a mut Node,
    rest: &[usize],
    depth: usize,
) -> Result<&'a mut Node, PathError> {
    let Some((&ix, rest)) = rest.split_first() else {
        return Ok(node);
    };
    match node {
        Node::Element(el) => {
            let len = el.children.len();
            let child = el.children.get_mut(ix).ok_or_else(|| {
                PathError(format!("Path out of bounds at depth {depth}: {ix} >= {len}"))
            })?;
            descend_mut(child, rest, depth + 1)
        }
        Node::Text(_) => Err(PathError(format!("Non-container node at depth {}", depth - 1))),
    }
}

fn children_mut<'a>(
    doc: &'a mut Document,
    parent_path: &[usize],
) -> Result<&'a mut Vec<Node>, PathError> {
    if parent_path.is_empty() {
        return Ok(&mut doc.children);
    }
    match node_mut(doc, parent_path)? {
        Node::Element(el) => Ok(&mut el.children),
        Node::Text(_) => Err(PathError("Parent is not a container".into())),
    }
}

fn insert_node(doc: &mut Document, path: &[usize], node: Node) -> Result<(), PathError> {
    let Some((&index, parent_path)) = path.split_last() else {
        return Err(PathError("Empty insert path".into()));
    };
    let children = children_mut(doc, parent_path)?;
    if index > children.len() {
        return Err(PathError(format!(
            "Insert index out of bounds: {index} > {}",
            children.len()
        )));
    }
    children.insert(index, node);
    Ok(())
}

fn remove_node(doc: &mut Document, path: &[usize]) -> Result<Node, PathError> {
    let Some((&index, parent_path)) = path.split_last() else {
        return Err(PathError("Empty remove path".into()));
    };
    let children = children_mut(doc, parent_path)?;
    if index >= children.len() {
        return Err(PathError(format!(
            "Remove index out of bounds: {index} >= {}",
            children.len()
        )));
    }
    Ok(children.remove(index))
}

pub(crate) fn apply_op_to(doc: &mut Document, op: &Op) -> Result<(), ApplyError> {
    match op {
        Op::InsertNode { path, node } => {
            insert_node(doc, path, node.clone())?;
            Ok(())
        }
        Op::RemoveNode { path } => {
            remove_node(doc, path)?;
            Ok(())
        }
        Op::MoveNode { from, to } => {
            if to.starts_with(from) {
                return Err(ApplyError::InvalidPath(
                    "Cannot move a node into itself".into(),
                ));
            }
            let node = remove_node(doc, from)?;
            insert_node(doc, to, node)?;
            Ok(())
        }
        Op::SetNodeAttrs { path, patch } => match node_mut(doc, path)? {
            Node::Element(el) => {
                patch_apply(&mut el.attrs, patch);
                Ok(())
            }
            Node::Text(_) => Err(ApplyError::InvalidPath("Text has no attrs".into())),
        },
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrPatch {
    #[serde(default)]
    pub set: Attrs,
    #[serde(default)]
    pub remove: Vec<String>,
}

impl AttrPatch {
    pub fn set(key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut set = Attrs::new();
        set.insert(key.into(), value.into());
        Self {
            set,
            remove: Vec::new(),
        }
    }

    pub fn remove(key: impl Into<String>) -> Self {
        Self {
            set: Attrs::new(),
            remove: vec![key.into()],
        }
    }
}

fn patch_apply(attrs: &mut Attrs, patch: &AttrPatch) {
    for (k, v) in &patch.set {
        attrs.insert(k.clone(), v.clone());
    }
    for key in &patch.remove {
        attrs.remove(key);
    }
}
