use std::collections::VecDeque;

use serde_json::Value;

use crate::core::{apply_op_to, ApplyError};
use crate::model::{AttrPatch, Attrs, Document, ModelRange, Node, Position, Selection};
use crate::ops::{BatchHandle, BatchKind, Op};
use crate::schema::Schema;

pub type ChangeFn = Box<dyn FnOnce(&mut Writer<'_>) -> Result<(), ApplyError>>;

pub(crate) struct QueuedChange {
    pub kind: BatchKind,
    pub f: ChangeFn,
}

pub struct Writer<'a> {
    doc: &'a mut Document,
    selection: &'a mut Selection,
    schema: &'a Schema,
    batch: BatchHandle,
    ops: &'a mut Vec<Op>,
    inverse: &'a mut Vec<Op>,
    queue: &'a mut VecDeque<QueuedChange>,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(
        doc: &'a mut Document,
        selection: &'a mut Selection,
        schema: &'a Schema,
        batch: BatchHandle,
        ops: &'a mut Vec<Op>,
        inverse: &'a mut Vec<Op>,
        queue: &'a mut VecDeque<QueuedChange>,
    ) -> Self {
        Self {
            doc,
            selection,
            schema,
            batch,
            ops,
            inverse,
            queue,
        }
    }

    pub fn batch(&self) -> &BatchHandle {
        &self.batch
    }

    pub fn doc(&self) -> &Document {
        self.doc
    }

    pub fn schema(&self) -> &Schema {
        self.schema
    }

    pub fn selection(&self) -> &Selection {
        self.selection
    }

    pub fn apply(&mut self, op: Op) -> Result<(), ApplyError> {
        let inverse = apply_op_to(self.doc, self.selection, op.clone())?;
        self.ops.push(op);
        self.inverse.push(inverse);
        Ok(())
    }

    pub fn insert(&mut self, node: Node, at: &Position) -> Result<(), ApplyError> {
        self.apply(Op::InsertNode {
            at: at.clone(),
            node,
        })
    }

    pub fn insert_element(&mut self, kind: &str, at: &Position) -> Result<(), ApplyError> {
        self.insert(Node::element(kind, Vec::new()), at)
    }

    pub fn remove(&mut self, at: &Position) -> Result<(), ApplyError> {
        self.apply(Op::RemoveNode { at: at.clone() })
    }

    pub fn remove_range(&mut self, range: &ModelRange) -> Result<(), ApplyError> {
        if !range.is_flat() {
            return Err(ApplyError::InvalidRange(format!(
                "{:?}..{:?} do not share a parent",
                range.start, range.end
            )));
        }
        let (Some(start), Some(end)) = (range.start.index(), range.end.index()) else {
            return Err(ApplyError::InvalidRange("range addresses a root".into()));
        };
        let parent = range.start.parent_path().to_vec();
        for ix in (start..end).rev() {
            let mut path = parent.clone();
            path.push(ix);
            self.remove(&Position::new(range.start.root.clone(), path))?;
        }
        Ok(())
    }

    pub fn rename(&mut self, at: &Position, kind: &str) -> Result<(), ApplyError> {
        match self.doc.node(at) {
            Some(Node::Element(el)) if el.kind == kind => Ok(()),
            Some(Node::Element(_)) => self.apply(Op::RenameNode {
                at: at.clone(),
                kind: kind.to_string(),
            }),
            _ => Err(ApplyError::NotAnElement(at.clone())),
        }
    }

    pub fn set_attribute(&mut self, at: &Position, key: &str, value: Value) -> Result<(), ApplyError> {
        let mut set = Attrs::new();
        set.insert(key.to_string(), value);
        self.apply(Op::SetNodeAttrs {
            at: at.clone(),
            patch: AttrPatch {
                set,
                remove: Vec::new(),
            },
        })
    }

    pub fn remove_attribute(&mut self, at: &Position, key: &str) -> Result<(), ApplyError> {
        self.apply(Op::SetNodeAttrs {
            at: at.clone(),
            patch: AttrPatch {
                set: Attrs::new(),
                remove: vec![key.to_string()],
            },
        })
    }

    pub fn set_selection(&mut self, selection: Selection) {
        *self.selection = selection;
    }

    // Queues `f` to run in its own batch once this one is committed. Both
    // batches are reported in the same settle event.
    pub fn enqueue_change(
        &mut self,
        kind: BatchKind,
        f: impl FnOnce(&mut Writer<'_>) -> Result<(), ApplyError> + 'static,
    ) {
        self.queue.push_back(QueuedChange {
            kind,
            f: Box::new(f),
        });
    }
}
