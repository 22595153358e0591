use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::{AttrPatch, Node, Position};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    InsertNode {
        at: Position,
        node: Node,
    },
    RemoveNode {
        at: Position,
    },
    RenameNode {
        at: Position,
        kind: String,
    },
    SetNodeAttrs {
        at: Position,
        patch: AttrPatch,
    },
}

impl Op {
    pub fn root(&self) -> &str {
        match self {
            Op::InsertNode { at, .. }
            | Op::RemoveNode { at }
            | Op::RenameNode { at, .. }
            | Op::SetNodeAttrs { at, .. } => &at.root,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchKind {
    #[default]
    Default,
    Transparent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchHandle {
    pub id: BatchId,
    #[serde(default)]
    pub kind: BatchKind,
}

impl BatchHandle {
    pub fn is_transparent(&self) -> bool {
        self.kind == BatchKind::Transparent
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub handle: BatchHandle,
    pub source: Option<String>,
    pub ops: Vec<Op>,
    pub touched_roots: BTreeSet<String>,
    // Roots whose last child was removed by one of `ops`.
    pub emptied_roots: BTreeSet<String>,
}

impl BatchSummary {
    pub(crate) fn new(
        handle: BatchHandle,
        source: Option<String>,
        ops: Vec<Op>,
        mut root_sizes: BTreeMap<String, usize>,
    ) -> Self {
        let touched_roots = ops.iter().map(|op| op.root().to_string()).collect();
        let mut emptied_roots = BTreeSet::new();
        for op in &ops {
            match op {
                Op::InsertNode { at, .. } if at.path.len() == 1 => {
                    *root_sizes.entry(at.root.clone()).or_default() += 1;
                }
                Op::RemoveNode { at } if at.path.len() == 1 => {
                    let size = root_sizes.entry(at.root.clone()).or_default();
                    *size = size.saturating_sub(1);
                    if *size == 0 {
                        emptied_roots.insert(at.root.clone());
                    }
                }
                _ => {}
            }
        }
        Self {
            handle,
            source,
            ops,
            touched_roots,
            emptied_roots,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.handle.is_transparent()
    }

    pub fn touches(&self, root: &str) -> bool {
        self.touched_roots.contains(root)
    }

    pub fn empties(&self, root: &str) -> bool {
        self.emptied_roots.contains(root)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChangesDone {
    pub batches: Vec<BatchSummary>,
    pub initial: bool,
}

impl ChangesDone {
    pub fn initial() -> Self {
        Self {
            batches: Vec::new(),
            initial: true,
        }
    }

    pub fn last_batch_emptying(&self, root: &str) -> Option<&BatchSummary> {
        self.batches.iter().rev().find(|b| b.empties(root))
    }
}
