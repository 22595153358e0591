use std::collections::{BTreeMap, HashMap};

use crate::model::Node;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceNode {
    Element(SourceElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceElement {
    pub name: String,
    pub attrs: BTreeMap<String, String>,
    pub children: Vec<SourceNode>,
}

impl SourceElement {
    pub fn new(name: impl Into<String>, children: Vec<SourceNode>) -> Self {
        Self {
            name: name.into(),
            attrs: BTreeMap::new(),
            children,
        }
    }
}

impl SourceNode {
    pub fn element(name: impl Into<String>, children: Vec<SourceNode>) -> Self {
        SourceNode::Element(SourceElement::new(name, children))
    }

    pub fn text(text: impl Into<String>) -> Self {
        SourceNode::Text(text.into())
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '$' | '_' | '-' | ':')
}

struct TreeBuilder {
    open: Vec<SourceElement>,
    top: Vec<SourceNode>,
}

impl TreeBuilder {
    fn append(&mut self, node: SourceNode) {
        let children = match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.top,
        };
        if let (SourceNode::Text(text), Some(SourceNode::Text(prev))) = (&node, children.last_mut())
        {
            prev.push_str(text);
            return;
        }
        children.push(node);
    }

    fn close_top(&mut self) {
        if let Some(el) = self.open.pop() {
            self.append(SourceNode::Element(el));
        }
    }

    fn close(&mut self, name: &str) {
        let Some(depth) = self.open.iter().rposition(|el| el.name == name) else {
            tracing::trace!(name, "ignoring unmatched closing tag");
            return;
        };
        while self.open.len() > depth {
            self.close_top();
        }
    }

    fn finish(mut self) -> Vec<SourceNode> {
        while !self.open.is_empty() {
            self.close_top();
        }
        self.top
    }
}

pub fn parse_fragment(input: &str) -> Vec<SourceNode> {
    let mut builder = TreeBuilder {
        open: Vec::new(),
        top: Vec::new(),
    };
    let mut rest = input;

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            push_text(&mut builder, rest);
            break;
        };
        push_text(&mut builder, &rest[..lt]);
        rest = &rest[lt..];

        if let Some(comment) = rest.strip_prefix("<!--") {
            rest = match comment.find("-->") {
                Some(end) => &comment[end + 3..],
                None => "",
            };
            continue;
        }

        if let Some(closing) = rest.strip_prefix("</") {
            let name_len = closing
                .find(|c: char| !is_name_char(c))
                .unwrap_or(closing.len());
            let name = &closing[..name_len];
            builder.close(name);
            rest = match closing.find('>') {
                Some(end) => &closing[end + 1..],
                None => "",
            };
            continue;
        }

        match parse_start_tag(rest) {
            Some((tag, consumed)) => {
                rest = &rest[consumed..];
                let is_void = tag.self_closing || VOID_ELEMENTS.contains(&tag.element.name.as_str());
                if is_void {
                    builder.append(SourceNode::Element(tag.element));
                } else {
                    builder.open.push(tag.element);
                }
            }
            None => {
                push_text(&mut builder, "<");
                rest = &rest[1..];
            }
        }
    }

    builder.finish()
}

fn push_text(builder: &mut TreeBuilder, raw: &str) {
    if raw.is_empty() {
        return;
    }
    let decoded = html_escape::decode_html_entities(raw);
    builder.append(SourceNode::Text(decoded.into_owned()));
}

struct StartTag {
    element: SourceElement,
    self_closing: bool,
}

fn parse_start_tag(input: &str) -> Option<(StartTag, usize)> {
    let body = input.strip_prefix('<')?;
    let name_len = body.find(|c: char| !is_name_char(c)).unwrap_or(body.len());
    if name_len == 0 {
        return None;
    }
    let mut element = SourceElement::new(&body[..name_len], Vec::new());
    let mut pos = 1 + name_len;

    loop {
        let tail = &input[pos..];
        let trimmed = tail.trim_start();
        pos += tail.len() - trimmed.len();

        if let Some(after) = trimmed.strip_prefix("/>") {
            let consumed = input.len() - after.len();
            return Some((
                StartTag {
                    element,
                    self_closing: true,
                },
                consumed,
            ));
        }
        if trimmed.starts_with('>') {
            return Some((
                StartTag {
                    element,
                    self_closing: false,
                },
                pos + 1,
            ));
        }
        if trimmed.is_empty() {
            return None;
        }

        let attr_len = trimmed
            .find(|c: char| c.is_whitespace() || matches!(c, '=' | '>' | '/'))
            .unwrap_or(trimmed.len());
        if attr_len == 0 {
            // Stray `/` or `=`: skip it.
            pos += 1;
            continue;
        }
        let name = trimmed[..attr_len].to_string();
        pos += attr_len;

        let tail = &input[pos..];
        let trimmed = tail.trim_start();
        let Some(value_part) = trimmed.strip_prefix('=') else {
            element.attrs.insert(name, String::new());
            continue;
        };
        pos += tail.len() - value_part.len();

        let value_tail = value_part.trim_start();
        pos += value_part.len() - value_tail.len();
        let (raw, consumed) = match value_tail.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let inner = &value_tail[1..];
                let end = inner.find(quote)?;
                (&inner[..end], end + 2)
            }
            _ => {
                let end = value_tail
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(value_tail.len());
                (&value_tail[..end], end)
            }
        };
        pos += consumed;
        element
            .attrs
            .insert(name, html_escape::decode_html_entities(raw).into_owned());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataOutput {
    Element { model: String, view: String },
    Attribute { key: String, view: String },
}

#[derive(Debug, Clone, Default)]
pub struct DataOutputs {
    elements: HashMap<String, String>,
    attributes: BTreeMap<String, String>,
}

impl DataOutputs {
    pub fn add(&mut self, output: DataOutput) {
        match output {
            DataOutput::Element { model, view } => {
                self.elements.insert(model, view);
            }
            DataOutput::Attribute { key, view } => {
                self.attributes.insert(key, view);
            }
        }
    }

    pub fn write(&self, nodes: &[Node]) -> String {
        let mut out = String::new();
        for node in nodes {
            self.write_node(node, &mut out);
        }
        out
    }

    fn write_node(&self, node: &Node, out: &mut String) {
        match node {
            Node::Text(t) => {
                let wrappers: Vec<&str> = self
                    .attributes
                    .iter()
                    .filter(|(key, _)| t.attrs.get(*key).is_some_and(is_truthy))
                    .map(|(_, view)| view.as_str())
                    .collect();
                for view in &wrappers {
                    out.push('<');
                    out.push_str(view);
                    out.push('>');
                }
                out.push_str(&html_escape::encode_text(&t.text));
                for view in wrappers.iter().rev() {
                    out.push_str("</");
                    out.push_str(view);
                    out.push('>');
                }
            }
            Node::Element(el) => match self.elements.get(&el.kind) {
                Some(view) => {
                    out.push('<');
                    out.push_str(view);
                    out.push('>');
                    for child in &el.children {
                        self.write_node(child, out);
                    }
                    out.push_str("</");
                    out.push_str(view);
                    out.push('>');
                }
                None => {
                    tracing::trace!(kind = %el.kind, "no data output for element, writing children");
                    for child in &el.children {
                        self.write_node(child, out);
                    }
                }
            },
        }
    }
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        _ => true,
    }
}
