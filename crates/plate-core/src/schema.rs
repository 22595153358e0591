use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ROOT: &str = "$root";
pub const BLOCK: &str = "$block";
pub const TEXT: &str = "$text";
pub const CLIPBOARD_HOLDER: &str = "$clipboardHolder";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Block,
    Inline,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRule {
    #[serde(default)]
    pub allow_in: Vec<String>,
    #[serde(default)]
    pub allow_where: Vec<String>,
    #[serde(default)]
    pub allow_content_of: Vec<String>,
    #[serde(default)]
    pub allow_attributes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit_all_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<NodeRole>,
}

impl NodeRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_in<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_in.extend(parents.into_iter().map(Into::into));
        self
    }

    pub fn allow_where(mut self, kind: impl Into<String>) -> Self {
        self.allow_where.push(kind.into());
        self
    }

    pub fn allow_content_of(mut self, kind: impl Into<String>) -> Self {
        self.allow_content_of.push(kind.into());
        self
    }

    pub fn allow_attributes<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_attributes
            .extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn inherit_all_from(mut self, kind: impl Into<String>) -> Self {
        self.inherit_all_from = Some(kind.into());
        self
    }

    pub fn role(mut self, role: NodeRole) -> Self {
        self.role = Some(role);
        self
    }

    fn merge(&mut self, delta: NodeRule) {
        self.allow_in.extend(delta.allow_in);
        self.allow_where.extend(delta.allow_where);
        self.allow_content_of.extend(delta.allow_content_of);
        self.allow_attributes.extend(delta.allow_attributes);
        if delta.inherit_all_from.is_some() {
            self.inherit_all_from = delta.inherit_all_from;
        }
        if delta.role.is_some() {
            self.role = delta.role;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("kind `{0}` is already registered")]
    AlreadyRegistered(String),
    #[error("kind `{0}` is not registered")]
    NotRegistered(String),
}

#[derive(Debug, Clone)]
pub struct Schema {
    rules: HashMap<String, NodeRule>,
    disallowed: HashSet<(String, String)>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl Schema {
    pub fn new() -> Self {
        let mut rules = HashMap::new();
        rules.insert(ROOT.to_string(), NodeRule::new());
        rules.insert(
            BLOCK.to_string(),
            NodeRule::new().allow_in([ROOT]).role(NodeRole::Block),
        );
        rules.insert(
            TEXT.to_string(),
            NodeRule::new()
                .allow_in([BLOCK, CLIPBOARD_HOLDER])
                .role(NodeRole::Inline),
        );
        rules.insert(
            CLIPBOARD_HOLDER.to_string(),
            NodeRule::new().allow_content_of(ROOT),
        );
        Self {
            rules,
            disallowed: HashSet::new(),
        }
    }

    pub fn register(&mut self, kind: impl Into<String>, rule: NodeRule) -> Result<(), SchemaError> {
        let kind = kind.into();
        if self.rules.contains_key(&kind) {
            return Err(SchemaError::AlreadyRegistered(kind));
        }
        tracing::trace!(kind = %kind, "registering schema item");
        self.rules.insert(kind, rule);
        Ok(())
    }

    pub fn is_registered(&self, kind: &str) -> bool {
        self.rules.contains_key(kind)
    }

    // Adds `delta` to an existing rule. Parents named in `delta.allow_in`
    // lift an earlier `Schema::disallow` for the same pair.
    pub fn extend(&mut self, kind: &str, delta: NodeRule) -> Result<(), SchemaError> {
        let rule = self
            .rules
            .get_mut(kind)
            .ok_or_else(|| SchemaError::NotRegistered(kind.to_string()))?;
        for parent in &delta.allow_in {
            self.disallowed.remove(&(kind.to_string(), parent.clone()));
        }
        rule.merge(delta);
        Ok(())
    }

    pub fn disallow<I, S>(&mut self, kind: &str, inside: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for parent in inside {
            self.disallowed.insert((kind.to_string(), parent.into()));
        }
    }

    pub fn check(&self, kind: &str, parent: &str) -> bool {
        if !self.is_registered(kind) || !self.is_registered(parent) {
            return false;
        }
        if self
            .disallowed
            .contains(&(kind.to_string(), parent.to_string()))
        {
            return false;
        }
        let parents = self.allowed_parents(kind);
        self.content_sources(parent)
            .iter()
            .any(|source| parents.contains(source))
    }

    pub fn check_attribute(&self, kind: &str, key: &str) -> bool {
        let mut seen = HashSet::new();
        self.attribute_allowed(kind, key, &mut seen)
    }

    pub fn is_block(&self, kind: &str) -> bool {
        self.resolved_role(kind) == Some(NodeRole::Block)
    }

    pub fn is_inline(&self, kind: &str) -> bool {
        let mut seen = HashSet::new();
        self.inline_via(kind, &mut seen)
    }

    fn resolved_role(&self, kind: &str) -> Option<NodeRole> {
        let mut current = kind;
        let mut seen = HashSet::new();
        while seen.insert(current) {
            let rule = self.rules.get(current)?;
            if let Some(role) = rule.role {
                return Some(role);
            }
            current = rule.inherit_all_from.as_deref()?;
        }
        None
    }

    fn inline_via<'a>(&'a self, kind: &'a str, seen: &mut HashSet<&'a str>) -> bool {
        if !seen.insert(kind) {
            return false;
        }
        let Some(rule) = self.rules.get(kind) else {
            return false;
        };
        if rule.role == Some(NodeRole::Inline) {
            return true;
        }
        if rule.role == Some(NodeRole::Block) {
            return false;
        }
        rule.allow_where
            .iter()
            .chain(rule.inherit_all_from.iter())
            .any(|source| self.inline_via(source, seen))
    }

    fn allowed_parents(&self, kind: &str) -> HashSet<&str> {
        fn walk<'a>(schema: &'a Schema, kind: &str, seen: &mut HashSet<String>, out: &mut HashSet<&'a str>) {
            if !seen.insert(kind.to_string()) {
                return;
            }
            let Some(rule) = schema.rules.get(kind) else {
                return;
            };
            out.extend(rule.allow_in.iter().map(String::as_str));
            for source in rule.allow_where.iter().chain(rule.inherit_all_from.iter()) {
                walk(schema, source, seen, out);
            }
        }

        let mut out = HashSet::new();
        walk(self, kind, &mut HashSet::new(), &mut out);
        out
    }

    fn content_sources<'a>(&'a self, parent: &'a str) -> HashSet<&'a str> {
        fn walk<'a>(schema: &'a Schema, kind: &'a str, out: &mut HashSet<&'a str>) {
            if !out.insert(kind) {
                return;
            }
            let Some(rule) = schema.rules.get(kind) else {
                return;
            };
            for source in rule
                .allow_content_of
                .iter()
                .chain(rule.inherit_all_from.iter())
            {
                walk(schema, source, out);
            }
        }

        let mut out = HashSet::new();
        walk(self, parent, &mut out);
        out
    }

    fn attribute_allowed<'a>(&'a self, kind: &'a str, key: &str, seen: &mut HashSet<&'a str>) -> bool {
        if !seen.insert(kind) {
            return false;
        }
        let Some(rule) = self.rules.get(kind) else {
            return false;
        };
        if rule.allow_attributes.iter().any(|k| k == key) {
            return true;
        }
        match &rule.inherit_all_from {
            Some(source) => self.attribute_allowed(source, key, seen),
            None => false,
        }
    }
}
