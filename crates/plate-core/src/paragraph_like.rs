use std::collections::HashSet;

use thiserror::Error;

const STANDARD: &[&str] = &["h1", "h2", "h3", "h4", "li", "td", "th"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParagraphLikeError {
    #[error("invalid paragraph-like element name {0:?}")]
    InvalidName(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParagraphLikeElements {
    names: HashSet<String>,
}

impl ParagraphLikeElements {
    pub fn standard() -> Self {
        Self {
            names: STANDARD.iter().map(|n| n.to_string()).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn insert(&mut self, name: &str) -> Result<bool, ParagraphLikeError> {
        let invalid = name.is_empty()
            || name.starts_with('$')
            || name
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '<' | '>' | '/' | '"' | '\'' | '='));
        if invalid {
            return Err(ParagraphLikeError::InvalidName(name.to_string()));
        }
        Ok(self.names.insert(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
