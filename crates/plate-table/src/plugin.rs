use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::config::TableConfig;
use crate::core::{Document, Editor, Node};
use crate::error::{ApplyError, TableError};
use crate::ops::{ChangeSet, Op, Path};
use crate::table::TablePlugin;
use crate::writer::Writer;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
    code: Option<&'static str>,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<&'static str> {
        self.code
    }
}

impl From<TableError> for CommandError {
    fn from(err: TableError) -> Self {
        Self {
            message: err.to_string(),
            code: Some(err.code()),
        }
    }
}

impl From<ApplyError> for CommandError {
    fn from(err: ApplyError) -> Self {
        Self::new(err.to_string())
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct QueryError {
    message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

type CommandHandler =
    Arc<dyn Fn(&mut Editor, Option<serde_json::Value>) -> Result<(), CommandError> + Send + Sync>;

type QueryHandler = Arc<
    dyn Fn(&Editor, Option<serde_json::Value>) -> Result<serde_json::Value, QueryError>
        + Send
        + Sync,
>;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub args_example: Option<serde_json::Value>,
    pub handler: CommandHandler,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(&mut Editor, Option<serde_json::Value>) -> Result<(), CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            keywords: Vec::new(),
            args_example: None,
            handler: Arc::new(handler),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn args_example(mut self, args_example: serde_json::Value) -> Self {
        self.args_example = Some(args_example);
        self
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: QueryHandler,
}

impl QuerySpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(
            &Editor,
            Option<serde_json::Value>,
        ) -> Result<serde_json::Value, QueryError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

/// A repair pass run after every change batch.
///
/// A pass inspects the parts of the document named by `changes`, issues corrective mutations
/// through `writer` and reports whether it changed anything. Passes must be idempotent and must
/// only move the document towards the invariant they enforce.
pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, writer: &mut Writer<'_>, changes: &ChangeSet) -> Result<bool, ApplyError>;
}

/// Notified after a batch commits, with the document before and after it.
pub trait ChangeObserver: Send + Sync {
    fn id(&self) -> &'static str;
    /// Paths (in `after`) of nodes whose rendered form must be rebuilt.
    fn invalidated(&self, before: &Document, after: &Document, ops: &[Op]) -> Vec<Path>;
}

pub trait PlatePlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        Vec::new()
    }
    fn change_observers(&self) -> Vec<Box<dyn ChangeObserver>> {
        Vec::new()
    }
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    plugin_ids: Vec<&'static str>,
    normalize_passes: Vec<Box<dyn NormalizePass>>,
    change_observers: Vec<Box<dyn ChangeObserver>>,
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
}

impl PluginRegistry {
    pub fn new(plugins: impl IntoIterator<Item = Box<dyn PlatePlugin>>) -> Result<Self, String> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    pub fn core() -> Self {
        let mut registry = Self::default();
        registry.register_core();
        registry
    }

    pub fn tables(config: &TableConfig) -> Self {
        let mut registry = Self::core();
        registry.register_table(config);
        registry
    }

    fn register_core(&mut self) {
        if let Err(err) = self.register_plugin(Box::new(CoreNormalizePlugin)) {
            tracing::error!(%err, "core plugin failed to register");
        }
    }

    fn register_table(&mut self, config: &TableConfig) {
        if let Err(err) = self.register_plugin(Box::new(TablePlugin::new(config.clone()))) {
            tracing::error!(%err, "table plugin failed to register");
        }
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn PlatePlugin>) -> Result<(), String> {
        if self.plugin_ids.contains(&plugin.id()) {
            return Err(format!("Duplicate plugin id: {}", plugin.id()));
        }

        let commands = plugin.commands();
        for cmd in &commands {
            if self.commands.contains_key(&cmd.id) {
                return Err(format!("Duplicate command id: {}", cmd.id));
            }
        }
        let queries = plugin.queries();
        for query in &queries {
            if self.queries.contains_key(&query.id) {
                return Err(format!("Duplicate query id: {}", query.id));
            }
        }

        self.plugin_ids.push(plugin.id());
        self.normalize_passes.extend(plugin.normalize_passes());
        self.change_observers.extend(plugin.change_observers());
        self.commands
            .extend(commands.into_iter().map(|cmd| (cmd.id.clone(), cmd)));
        self.queries
            .extend(queries.into_iter().map(|query| (query.id.clone(), query)));
        Ok(())
    }

    pub fn normalize_passes(&self) -> &[Box<dyn NormalizePass>] {
        &self.normalize_passes
    }

    pub fn change_observers(&self) -> &[Box<dyn ChangeObserver>] {
        &self.change_observers
    }

    pub fn commands(&self) -> &HashMap<String, CommandSpec> {
        &self.commands
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(id).cloned()
    }

    pub fn queries(&self) -> &HashMap<String, QuerySpec> {
        &self.queries
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(id).cloned()
    }

    /// Runs every pass until a full round changes nothing, and returns the ops they issued.
    ///
    /// Each round sees the ops of the previous round as its change set. Fails after
    /// `max_iterations` rounds that all changed something.
    pub fn normalize(
        &self,
        doc: &mut Document,
        changes: ChangeSet,
        max_iterations: usize,
    ) -> Result<Vec<Op>, ApplyError> {
        let mut changes = changes;
        let mut all_ops: Vec<Op> = Vec::new();

        for round in 0..max_iterations {
            if changes.is_empty() {
                return Ok(all_ops);
            }
            let mut writer = Writer::new(doc);
            let mut changed = false;
            for pass in &self.normalize_passes {
                if pass.run(&mut writer, &changes)? {
                    tracing::trace!(pass = pass.id(), round, "normalize pass changed the document");
                    changed = true;
                }
            }
            let ops = writer.into_ops();
            if !changed {
                return Ok(all_ops);
            }
            changes = ChangeSet::from_ops(&ops);
            all_ops.extend(ops);
        }

        tracing::warn!(max_iterations, "normalization did not converge");
        Err(ApplyError::NormalizeDidNotConverge)
    }
}

struct CoreNormalizePlugin;

impl PlatePlugin for CoreNormalizePlugin {
    fn id(&self) -> &'static str {
        "core.normalize"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(EnsureNonEmptyDocument)]
    }
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(&self, writer: &mut Writer<'_>, _changes: &ChangeSet) -> Result<bool, ApplyError> {
        if !writer.doc().children.is_empty() {
            return Ok(false);
        }
        writer.insert(vec![0], Node::paragraph(""))?;
        Ok(true)
    }
}
