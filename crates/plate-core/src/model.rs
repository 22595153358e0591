use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Attrs = BTreeMap<String, serde_json::Value>;
pub type ElementKind = String;
pub type Path = Vec<usize>;

pub const MAIN_ROOT: &str = "main";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
}

impl Node {
    pub fn element(kind: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Element(ElementNode::new(kind, children))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            attrs: Attrs::default(),
        })
    }

    pub fn kind(&self) -> &str {
        match self {
            Node::Element(el) => &el.kind,
            Node::Text(_) => crate::schema::TEXT,
        }
    }

    pub fn is(&self, kind: &str) -> bool {
        matches!(self, Node::Element(el) if el.kind == kind)
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn attrs(&self) -> &Attrs {
        match self {
            Node::Element(el) => &el.attrs,
            Node::Text(t) => &t.attrs,
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
    pub fn new(kind: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            kind: kind.into(),
            attrs: Attrs::default(),
            children,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(&t.text),
                Node::Element(el) => out.push_str(&el.text_content()),
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default)]
    pub attrs: Attrs,
}

pub fn merge_adjacent_text(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Text(t) if t.text.is_empty() => {}
            Node::Text(t) => match out.last_mut() {
                Some(Node::Text(prev)) if prev.attrs == t.attrs => prev.text.push_str(&t.text),
                _ => out.push(Node::Text(t)),
            },
            other => out.push(other),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub root: String,
    #[serde(default)]
    pub path: Path,
}

impl Position {
    pub fn new(root: impl Into<String>, path: Path) -> Self {
        Self {
            root: root.into(),
            path,
        }
    }

    pub fn root(root: impl Into<String>) -> Self {
        Self::new(root, Vec::new())
    }

    pub fn parent_path(&self) -> &[usize] {
        self.path.split_last().map(|(_, p)| p).unwrap_or(&[])
    }

    pub fn index(&self) -> Option<usize> {
        self.path.last().copied()
    }

    pub fn child(&self, index: usize) -> Self {
        let mut path = self.path.clone();
        path.push(index);
        Self::new(self.root.clone(), path)
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.root
            .cmp(&other.root)
            .then_with(|| self.path.cmp(&other.path))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
}

impl Selection {
    pub fn collapsed(position: Position) -> Self {
        Self {
            anchor: position.clone(),
            focus: position,
        }
    }

    pub fn new(anchor: Position, focus: Position) -> Self {
        Self { anchor, focus }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn ordered(&self) -> (&Position, &Position) {
        if self.anchor <= self.focus {
            (&self.anchor, &self.focus)
        } else {
            (&self.focus, &self.anchor)
        }
    }
}

// Sibling range `[start, end)`; both ends share a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRange {
    pub start: Position,
    pub end: Position,
}

impl ModelRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn inside(doc: &Document, position: &Position) -> Option<Self> {
        let el = doc.element_at(&position.root, &position.path)?;
        Some(Self::new(position.child(0), position.child(el.children.len())))
    }

    pub fn is_flat(&self) -> bool {
        self.start.root == self.end.root && self.start.parent_path() == self.end.parent_path()
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("unknown root `{0}`")]
    UnknownRoot(String),
    #[error("empty path")]
    Empty,
    #[error("path out of bounds at depth {depth}: {index} >= {len}")]
    OutOfBounds {
        depth: usize,
        index: usize,
        len: usize,
    },
    #[error("non-container node at depth {0}")]
    NotContainer(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub roots: BTreeMap<String, ElementNode>,
}

impl Document {
    pub fn root(&self, name: &str) -> Option<&ElementNode> {
        self.roots.get(name)
    }

    pub fn root_names(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }

    pub fn node(&self, position: &Position) -> Option<&Node> {
        let (&last, parent) = position.path.split_last()?;
        self.element_at(&position.root, parent)?.children.get(last)
    }

    pub fn parent_element(&self, position: &Position) -> Option<&ElementNode> {
        self.element_at(&position.root, position.parent_path())
    }

    pub fn element_at(&self, root: &str, path: &[usize]) -> Option<&ElementNode> {
        let mut el = self.roots.get(root)?;
        for &ix in path {
            el = match el.children.get(ix)? {
                Node::Element(child) => child,
                Node::Text(_) => return None,
            };
        }
        Some(el)
    }

    pub(crate) fn element_at_mut(
        &mut self,
        root: &str,
        path: &[usize],
    ) -> Result<&mut ElementNode, PathError> {
        let mut el = self
            .roots
            .get_mut(root)
            .ok_or_else(|| PathError::UnknownRoot(root.to_string()))?;
        for (depth, &ix) in path.iter().enumerate() {
            let len = el.children.len();
            el = match el.children.get_mut(ix) {
                Some(Node::Element(child)) => child,
                Some(Node::Text(_)) => return Err(PathError::NotContainer(depth)),
                None => {
                    return Err(PathError::OutOfBounds {
                        depth,
                        index: ix,
                        len,
                    });
                }
            };
        }
        Ok(el)
    }

    pub(crate) fn node_mut(&mut self, position: &Position) -> Result<&mut Node, PathError> {
        let (&last, parent) = position.path.split_last().ok_or(PathError::Empty)?;
        let el = self.element_at_mut(&position.root, parent)?;
        let len = el.children.len();
        el.children.get_mut(last).ok_or(PathError::OutOfBounds {
            depth: parent.len(),
            index: last,
            len,
        })
    }

    pub(crate) fn insert_node(&mut self, position: &Position, node: Node) -> Result<(), PathError> {
        let (&index, parent) = position.path.split_last().ok_or(PathError::Empty)?;
        let el = self.element_at_mut(&position.root, parent)?;
        if index > el.children.len() {
            return Err(PathError::OutOfBounds {
                depth: parent.len(),
                index,
                len: el.children.len(),
            });
        }
        el.children.insert(index, node);
        Ok(())
    }

    pub(crate) fn remove_node(&mut self, position: &Position) -> Result<Node, PathError> {
        let (&index, parent) = position.path.split_last().ok_or(PathError::Empty)?;
        let el = self.element_at_mut(&position.root, parent)?;
        if index >= el.children.len() {
            return Err(PathError::OutOfBounds {
                depth: parent.len(),
                index,
                len: el.children.len(),
            });
        }
        Ok(el.children.remove(index))
    }

    pub fn element_positions(&self, root: &str) -> Vec<Position> {
        fn walk(children: &[Node], root: &str, path: &mut Path, out: &mut Vec<Position>) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                out.push(Position::new(root, path.clone()));
                walk(&el.children, root, path, out);
                path.pop();
            }
        }

        let mut out = Vec::new();
        if let Some(el) = self.roots.get(root) {
            walk(&el.children, root, &mut Vec::new(), &mut out);
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrPatch {
    #[serde(default)]
    pub set: Attrs,
    #[serde(default)]
    pub remove: Vec<String>,
}

pub(crate) fn patch_apply(attrs: &mut Attrs, patch: &AttrPatch) -> AttrPatch {
    let mut old_set: Attrs = Attrs::new();
    let mut old_remove: Vec<String> = Vec::new();

    for (k, v) in &patch.set {
        if let Some(prev) = attrs.insert(k.clone(), v.clone()) {
            old_set.insert(k.clone(), prev);
        } else {
            old_remove.push(k.clone());
        }
    }

    for key in &patch.remove {
        if let Some(prev) = attrs.remove(key) {
            old_set.insert(key.clone(), prev);
        }
    }

    AttrPatch {
        set: old_set,
        remove: old_remove,
    }
}
