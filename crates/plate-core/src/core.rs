use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::conversion::{insert_by_priority, ConversionPipeline, Priority};
use crate::html::{parse_fragment, DataOutputs};
use crate::model::{
    patch_apply, Document, ElementNode, ModelRange, Node, PathError, Position, Selection,
};
use crate::ops::{BatchHandle, BatchId, BatchKind, BatchSummary, ChangesDone, Op};
use crate::plugin::{
    ChangesDoneListener, CommandError, CommandSpec, CommandState, Listeners, PlatePlugin,
    PluginRegistry, RegistryError,
};
use crate::schema::{Schema, ROOT, TEXT};
use crate::writer::{QueuedChange, Writer};

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
    #[error("invalid range: {0}")]
    InvalidRange(String),
    #[error("expected an element at {0:?}")]
    NotAnElement(Position),
    #[error("changes did not settle within {0} nested rounds")]
    SettleDidNotConverge(usize),
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("root `{root}` uses unregistered kind `{kind}`")]
    UnknownRootKind { root: String, kind: String },
    #[error("duplicate root name `{0}`")]
    DuplicateRoot(String),
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

fn default_root_kind() -> String {
    ROOT.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootConfig {
    pub name: String,
    #[serde(default = "default_root_kind")]
    pub kind: String,
}

impl RootConfig {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub max_undo: usize,
    #[serde(default)]
    pub max_settle_depth: usize,
    #[serde(default)]
    pub roots: Vec<RootConfig>,
}

impl EditorConfig {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    fn with_defaults(mut self) -> Self {
        if self.max_undo == 0 {
            self.max_undo = 200;
        }
        if self.max_settle_depth == 0 {
            self.max_settle_depth = 32;
        }
        if self.roots.is_empty() {
            self.roots
                .push(RootConfig::new(crate::model::MAIN_ROOT, ROOT));
        }
        self
    }
}

#[derive(Debug, Clone)]
struct UndoRecord {
    batch: BatchId,
    inverse_ops: Vec<Op>,
    selection_before: Selection,
    selection_after: Selection,
}

pub type CommandObserver = Box<dyn Fn(&str, &CommandState) + Send + Sync>;

struct CommandEntry {
    spec: CommandSpec,
    state: CommandState,
    observers: Vec<CommandObserver>,
}

pub struct Editor {
    doc: Document,
    selection: Selection,
    schema: Schema,
    conversion: ConversionPipeline,
    outputs: DataOutputs,
    listeners: Listeners,
    commands: HashMap<String, CommandEntry>,
    config: EditorConfig,
    undo_stack: Vec<UndoRecord>,
    redo_stack: Vec<UndoRecord>,
    next_batch: u64,
    settle_depth: usize,
}

impl Editor {
    pub fn new(registry: PluginRegistry, config: EditorConfig) -> Result<Self, EditorError> {
        let config = config.with_defaults();
        let parts = registry.into_parts();

        let mut doc = Document::default();
        for root in &config.roots {
            if !parts.schema.is_registered(&root.kind) {
                return Err(EditorError::UnknownRootKind {
                    root: root.name.clone(),
                    kind: root.kind.clone(),
                });
            }
            if doc.roots.contains_key(&root.name) {
                return Err(EditorError::DuplicateRoot(root.name.clone()));
            }
            doc.roots
                .insert(root.name.clone(), ElementNode::new(root.kind.clone(), Vec::new()));
        }
        let first_root = config.roots[0].name.clone();

        let commands = parts
            .commands
            .into_iter()
            .map(|(id, spec)| {
                let entry = CommandEntry {
                    spec,
                    state: CommandState {
                        value: Value::Null,
                        is_enabled: false,
                    },
                    observers: Vec::new(),
                };
                (id, entry)
            })
            .collect();

        let mut editor = Self {
            doc,
            selection: Selection::collapsed(Position::new(first_root, vec![0])),
            schema: parts.schema,
            conversion: parts.conversion,
            outputs: parts.outputs,
            listeners: parts.listeners,
            commands,
            config,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            next_batch: 0,
            settle_depth: 0,
        };
        editor.settle(ChangesDone::initial())?;
        editor.clear_history();
        Ok(editor)
    }

    pub fn with_plugins(
        plugins: impl IntoIterator<Item = Box<dyn PlatePlugin>>,
    ) -> Result<Self, EditorError> {
        Self::new(PluginRegistry::new(plugins)?, EditorConfig::default())
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn root(&self, name: &str) -> Option<&ElementNode> {
        self.doc.root(name)
    }

    pub fn main_root_name(&self) -> &str {
        &self.config.roots[0].name
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
        self.normalize_selection_in_place();
        self.refresh_commands();
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    pub fn conversion_mut(&mut self) -> &mut ConversionPipeline {
        &mut self.conversion
    }

    pub fn outputs_mut(&mut self) -> &mut DataOutputs {
        &mut self.outputs
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn on_changes_done(&mut self, priority: Priority, listener: impl ChangesDoneListener + 'static) {
        let listener: Arc<dyn ChangesDoneListener> = Arc::new(listener);
        insert_by_priority(&mut self.listeners, priority, listener);
    }

    pub fn create_batch(&mut self, kind: BatchKind) -> BatchHandle {
        self.next_batch += 1;
        BatchHandle {
            id: BatchId(self.next_batch),
            kind,
        }
    }

    pub fn change<R>(
        &mut self,
        f: impl FnOnce(&mut Writer<'_>) -> Result<R, ApplyError>,
    ) -> Result<R, ApplyError> {
        let batch = self.create_batch(BatchKind::Default);
        self.change_in(&batch, f)
    }

    pub fn enqueue_change<R>(
        &mut self,
        kind: BatchKind,
        f: impl FnOnce(&mut Writer<'_>) -> Result<R, ApplyError>,
    ) -> Result<R, ApplyError> {
        let batch = self.create_batch(kind);
        self.change_in(&batch, f)
    }

    // Runs `f` in `batch`, which may already hold earlier changes, then the
    // changes it queued, each in its own batch, and finally settles once.
    pub fn change_in<R>(
        &mut self,
        batch: &BatchHandle,
        f: impl FnOnce(&mut Writer<'_>) -> Result<R, ApplyError>,
    ) -> Result<R, ApplyError> {
        let mut queue: VecDeque<QueuedChange> = VecDeque::new();
        let mut summaries = Vec::new();

        let selection_before = self.selection.clone();
        let (result, summary, inverse) = self.run_batch(batch.clone(), None, f, &mut queue);
        self.record_undo(batch, inverse, selection_before);
        summaries.push(summary);

        let mut queued_error = None;
        while let Some(queued) = queue.pop_front() {
            let handle = self.create_batch(queued.kind);
            let selection_before = self.selection.clone();
            let (res, summary, inverse) = self.run_batch(handle.clone(), None, queued.f, &mut queue);
            self.record_undo(&handle, inverse, selection_before);
            summaries.push(summary);
            if let Err(err) = res {
                queued_error.get_or_insert(err);
            }
        }

        self.settle(ChangesDone {
            batches: summaries,
            initial: false,
        })?;

        if let Some(err) = queued_error {
            return Err(err);
        }
        result
    }

    fn run_batch<R>(
        &mut self,
        batch: BatchHandle,
        source: Option<String>,
        f: impl FnOnce(&mut Writer<'_>) -> Result<R, ApplyError>,
        queue: &mut VecDeque<QueuedChange>,
    ) -> (Result<R, ApplyError>, BatchSummary, Vec<Op>) {
        let mut ops = Vec::new();
        let mut inverse = Vec::new();
        let root_sizes = self
            .doc
            .roots
            .iter()
            .map(|(name, root)| (name.clone(), root.children.len()))
            .collect();
        let result = {
            let Editor {
                doc,
                selection,
                schema,
                ..
            } = self;
            let mut writer = Writer::new(doc, selection, schema, batch.clone(), &mut ops, &mut inverse, queue);
            f(&mut writer)
        };
        (result, BatchSummary::new(batch, source, ops, root_sizes), inverse)
    }

    fn apply_ops(&mut self, batch: BatchHandle, source: String, ops: Vec<Op>) -> Result<BatchSummary, ApplyError> {
        let mut queue = VecDeque::new();
        let selection_before = self.selection.clone();
        let (result, summary, inverse) = self.run_batch(
            batch.clone(),
            Some(source),
            |writer| {
                for op in ops {
                    writer.apply(op)?;
                }
                Ok(())
            },
            &mut queue,
        );
        self.record_undo(&batch, inverse, selection_before);
        result?;
        Ok(summary)
    }

    fn record_undo(&mut self, batch: &BatchHandle, mut inverse: Vec<Op>, selection_before: Selection) {
        if batch.is_transparent() || inverse.is_empty() {
            return;
        }
        inverse.reverse();

        if let Some(record) = self.undo_stack.iter_mut().find(|r| r.batch == batch.id) {
            inverse.append(&mut record.inverse_ops);
            record.inverse_ops = inverse;
            record.selection_after = self.selection.clone();
            return;
        }

        self.undo_stack.push(UndoRecord {
            batch: batch.id,
            inverse_ops: inverse,
            selection_before,
            selection_after: self.selection.clone(),
        });
        self.redo_stack.clear();
        if self.undo_stack.len() > self.config.max_undo {
            self.undo_stack.remove(0);
        }
    }

    fn settle(&mut self, event: ChangesDone) -> Result<(), ApplyError> {
        if self.settle_depth >= self.config.max_settle_depth {
            tracing::warn!(depth = self.settle_depth, "listeners keep changing the document, giving up");
            return Err(ApplyError::SettleDidNotConverge(self.settle_depth));
        }
        self.settle_depth += 1;
        let result = self.run_listeners(&event);
        self.settle_depth -= 1;
        result?;

        self.normalize_selection_in_place();
        self.refresh_commands();
        Ok(())
    }

    fn run_listeners(&mut self, event: &ChangesDone) -> Result<(), ApplyError> {
        let listeners: Vec<Arc<dyn ChangesDoneListener>> =
            self.listeners.iter().map(|(_, l)| Arc::clone(l)).collect();

        for listener in listeners {
            let ops = listener.changes_done(self, event);
            if ops.is_empty() {
                continue;
            }
            tracing::debug!(
                listener = listener.id(),
                ops = ops.len(),
                depth = self.settle_depth,
                "listener requested follow-up changes"
            );
            let batch = self.create_batch(BatchKind::Default);
            let summary = self.apply_ops(batch, format!("listener:{}", listener.id()), ops)?;
            self.settle(ChangesDone {
                batches: vec![summary],
                initial: false,
            })?;
        }
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn undo(&mut self) -> Result<bool, ApplyError> {
        let Some(record) = self.undo_stack.pop() else {
            return Ok(false);
        };
        let inverse = self.replay(record.inverse_ops.clone(), "undo", &record.selection_before)?;
        self.redo_stack.push(UndoRecord {
            inverse_ops: inverse,
            ..record
        });
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, ApplyError> {
        let Some(record) = self.redo_stack.pop() else {
            return Ok(false);
        };
        let inverse = self.replay(record.inverse_ops.clone(), "redo", &record.selection_after)?;
        self.undo_stack.push(UndoRecord {
            inverse_ops: inverse,
            ..record
        });
        Ok(true)
    }

    fn replay(&mut self, ops: Vec<Op>, source: &str, selection: &Selection) -> Result<Vec<Op>, ApplyError> {
        let batch = self.create_batch(BatchKind::Transparent);
        let mut queue = VecDeque::new();
        let (result, summary, mut inverse) = self.run_batch(
            batch,
            Some(source.to_string()),
            |writer| {
                for op in ops {
                    writer.apply(op)?;
                }
                Ok(())
            },
            &mut queue,
        );
        self.selection = selection.clone();
        self.settle(ChangesDone {
            batches: vec![summary],
            initial: false,
        })?;
        result?;
        inverse.reverse();
        Ok(inverse)
    }

    pub fn parse(&self, html: &str, context: &str) -> Vec<Node> {
        let source = parse_fragment(html);
        self.conversion.convert(&self.schema, &source, context)
    }

    pub fn set_data(&mut self, html: &str) -> Result<(), ApplyError> {
        let root = self.main_root_name().to_string();
        self.set_root_data(&root, html)
    }

    pub fn set_root_data(&mut self, root: &str, html: &str) -> Result<(), ApplyError> {
        let kind = self
            .doc
            .root(root)
            .ok_or_else(|| PathError::UnknownRoot(root.to_string()))?
            .kind
            .clone();
        let nodes = self.parse(html, &kind);
        let root_position = Position::root(root);

        self.change(|writer| {
            if let Some(range) = ModelRange::inside(writer.doc(), &root_position) {
                writer.remove_range(&range)?;
            }
            for (ix, node) in nodes.into_iter().enumerate() {
                writer.insert(node, &root_position.child(ix))?;
            }
            writer.set_selection(Selection::collapsed(root_position.child(0)));
            Ok(())
        })?;
        self.clear_history();
        Ok(())
    }

    pub fn get_data(&self) -> String {
        self.get_root_data(self.main_root_name())
    }

    pub fn get_root_data(&self, root: &str) -> String {
        self.doc
            .root(root)
            .map(|el| self.outputs.write(&el.children))
            .unwrap_or_default()
    }

    pub fn selected_blocks(&self, selection: &Selection) -> Vec<Position> {
        let (start, end) = selection.ordered();
        let end = if end.root == start.root { end } else { start };

        let mut out = Vec::new();
        if let Some(block) = self.parent_block(start) {
            out.push(block);
        }
        for position in self.doc.element_positions(&start.root) {
            if position.path < start.path || position.path >= end.path {
                continue;
            }
            let is_block = self
                .doc
                .node(&position)
                .is_some_and(|node| self.schema.is_block(node.kind()));
            if is_block && !out.contains(&position) {
                out.push(position);
            }
        }
        if let Some(block) = self.parent_block(end) {
            if !out.contains(&block) {
                out.push(block);
            }
        }
        out
    }

    pub fn first_selected_block(&self) -> Option<Position> {
        self.selected_blocks(&self.selection).into_iter().next()
    }

    pub fn parent_block(&self, position: &Position) -> Option<Position> {
        let mut path = position.parent_path().to_vec();
        while !path.is_empty() {
            let el = self.doc.element_at(&position.root, &path)?;
            if self.schema.is_block(&el.kind) {
                return Some(Position::new(position.root.clone(), path));
            }
            path.pop();
        }
        None
    }

    fn normalize_selection_in_place(&mut self) {
        self.selection = Selection {
            anchor: self.normalize_position(&self.selection.anchor),
            focus: self.normalize_position(&self.selection.focus),
        };
    }

    fn normalize_position(&self, position: &Position) -> Position {
        let root = if self.doc.roots.contains_key(&position.root) {
            position.root.clone()
        } else {
            match self.doc.root_names().next() {
                Some(name) => name.to_string(),
                None => return position.clone(),
            }
        };
        let Some(mut el) = self.doc.root(&root) else {
            return position.clone();
        };

        let mut path = Vec::new();
        for (depth, &ix) in position.path.iter().enumerate() {
            let is_last = depth + 1 == position.path.len();
            match el.children.get(ix) {
                Some(Node::Element(child)) if !is_last => {
                    path.push(ix);
                    el = child;
                }
                _ => {
                    path.push(ix.min(el.children.len()));
                    break;
                }
            }
        }
        if path.is_empty() {
            path.push(0);
        }
        let clamped = Position::new(root, path);

        let accepts_text = self
            .doc
            .parent_element(&clamped)
            .is_some_and(|parent| self.schema.check(TEXT, &parent.kind));
        if accepts_text {
            return clamped;
        }

        let text_blocks: Vec<Position> = self
            .doc
            .element_positions(&clamped.root)
            .into_iter()
            .filter(|p| {
                self.doc
                    .node(p)
                    .is_some_and(|node| self.schema.check(TEXT, node.kind()))
            })
            .collect();
        let target = text_blocks
            .iter()
            .find(|p| p.path >= clamped.path)
            .or_else(|| text_blocks.last());
        match target {
            Some(block) => block.child(0),
            None => clamped,
        }
    }

    pub fn run_command(&mut self, id: &str, args: Option<Value>) -> Result<(), CommandError> {
        let Some(entry) = self.commands.get(id) else {
            return Err(CommandError::Unknown(id.to_string()));
        };
        if !entry.state.is_enabled {
            tracing::debug!(command = id, "skipping disabled command");
            return Ok(());
        }
        let handler = Arc::clone(&entry.spec.handler);
        handler(self, args)
    }

    pub fn command_state(&self, id: &str) -> Option<&CommandState> {
        self.commands.get(id).map(|entry| &entry.state)
    }

    pub fn command_spec(&self, id: &str) -> Option<&CommandSpec> {
        self.commands.get(id).map(|entry| &entry.spec)
    }

    pub fn observe_command(
        &mut self,
        id: &str,
        observer: impl Fn(&str, &CommandState) + Send + Sync + 'static,
    ) -> Result<(), CommandError> {
        let entry = self
            .commands
            .get_mut(id)
            .ok_or_else(|| CommandError::Unknown(id.to_string()))?;
        entry.observers.push(Box::new(observer));
        Ok(())
    }

    fn refresh_commands(&mut self) {
        let refreshes: Vec<(String, _)> = self
            .commands
            .iter()
            .map(|(id, entry)| (id.clone(), Arc::clone(&entry.spec.refresh)))
            .collect();

        for (id, refresh) in refreshes {
            let state = refresh(&*self);
            let Some(entry) = self.commands.get_mut(&id) else {
                continue;
            };
            if entry.state == state {
                continue;
            }
            entry.state = state;
            for observer in &entry.observers {
                observer(&id, &entry.state);
            }
        }
    }
}

pub(crate) fn apply_op_to(
    doc: &mut Document,
    selection: &mut Selection,
    op: Op,
) -> Result<Op, ApplyError> {
    match op {
        Op::InsertNode { at, node } => {
            doc.insert_node(&at, node)?;
            transform_selection_insert_node(selection, &at);
            Ok(Op::RemoveNode { at })
        }
        Op::RemoveNode { at } => {
            let removed = doc.remove_node(&at)?;
            transform_selection_remove_node(selection, &at);
            Ok(Op::InsertNode { at, node: removed })
        }
        Op::RenameNode { at, kind } => match doc.node_mut(&at)? {
            Node::Element(el) => {
                let old = std::mem::replace(&mut el.kind, kind);
                Ok(Op::RenameNode { at, kind: old })
            }
            Node::Text(_) => Err(ApplyError::NotAnElement(at)),
        },
        Op::SetNodeAttrs { at, patch } => {
            let attrs = if at.path.is_empty() {
                &mut doc.element_at_mut(&at.root, &[])?.attrs
            } else {
                match doc.node_mut(&at)? {
                    Node::Element(el) => &mut el.attrs,
                    Node::Text(t) => &mut t.attrs,
                }
            };
            let old = patch_apply(attrs, &patch);
            Ok(Op::SetNodeAttrs { at, patch: old })
        }
    }
}

fn transform_selection_insert_node(selection: &mut Selection, at: &Position) {
    let Some((&index, parent_path)) = at.path.split_last() else {
        return;
    };

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.root != at.root
            || point.path.len() <= parent_path.len()
            || !point.path.starts_with(parent_path)
        {
            continue;
        }
        let depth = parent_path.len();
        if point.path[depth] >= index {
            point.path[depth] += 1;
        }
    }
}

fn transform_selection_remove_node(selection: &mut Selection, at: &Position) {
    let Some((&index, parent_path)) = at.path.split_last() else {
        return;
    };

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.root != at.root
            || point.path.len() <= parent_path.len()
            || !point.path.starts_with(parent_path)
        {
            continue;
        }
        let depth = parent_path.len();
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] = ix - 1;
        } else if ix == index && point.path.len() > depth + 1 {
            // Point was inside the removed subtree.
            point.path.truncate(depth + 1);
        }
    }
}
