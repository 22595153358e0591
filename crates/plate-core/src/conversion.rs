use serde_json::Value;

use crate::html::{SourceElement, SourceNode};
use crate::model::{merge_adjacent_text, ElementNode, Node, TextNode};
use crate::paragraph_like::ParagraphLikeElements;
use crate::schema::{Schema, TEXT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Highest,
    High,
    Normal,
    Low,
    Lowest,
}

// Inserts after every entry of the same or higher priority.
pub(crate) fn insert_by_priority<T>(entries: &mut Vec<(Priority, T)>, priority: Priority, item: T) {
    let at = entries
        .iter()
        .position(|(p, _)| *p > priority)
        .unwrap_or(entries.len());
    entries.insert(at, (priority, item));
}

pub trait ElementConverter: Send + Sync {
    fn convert(&self, element: &SourceElement, api: &mut ConversionApi<'_>) -> Option<Vec<Node>>;
}

pub trait TextConverter: Send + Sync {
    fn convert(&self, text: &str, api: &mut ConversionApi<'_>) -> Option<Vec<Node>>;
}

pub trait AttributeConverter: Send + Sync {
    fn attribute(&self, element: &SourceElement, api: &ConversionApi<'_>) -> Option<(String, Value)>;
}

pub trait ChildrenConverter: Send + Sync {
    fn convert_children(
        &self,
        children: &[SourceNode],
        api: &mut ConversionApi<'_>,
    ) -> Option<Vec<Node>>;
}

pub enum Converter {
    Element(Box<dyn ElementConverter>),
    Text(Box<dyn TextConverter>),
    Attribute(Box<dyn AttributeConverter>),
    Children(Box<dyn ChildrenConverter>),
}

impl Converter {
    pub fn on_element<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&SourceElement, &mut ConversionApi<'_>) -> Option<Vec<Node>> + Send + Sync + 'static,
    {
        Converter::Element(Box::new(NamedElementFn {
            name: name.into(),
            f,
        }))
    }
}

struct NamedElementFn<F> {
    name: String,
    f: F,
}

impl<F> ElementConverter for NamedElementFn<F>
where
    F: Fn(&SourceElement, &mut ConversionApi<'_>) -> Option<Vec<Node>> + Send + Sync,
{
    fn convert(&self, element: &SourceElement, api: &mut ConversionApi<'_>) -> Option<Vec<Node>> {
        if element.name != self.name {
            return None;
        }
        (self.f)(element, api)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Nodes(Vec<Node>),
    Attribute(String, Value),
    Unclaimed,
}

#[derive(Default)]
pub struct ConversionPipeline {
    entries: Vec<(Priority, Converter)>,
    paragraph_like: ParagraphLikeElements,
}

impl ConversionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, priority: Priority, converter: Converter) {
        insert_by_priority(&mut self.entries, priority, converter);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn paragraph_like_mut(&mut self) -> &mut ParagraphLikeElements {
        &mut self.paragraph_like
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn convert(&self, schema: &Schema, source: &[SourceNode], context: &str) -> Vec<Node> {
        let mut api = ConversionApi {
            pipeline: self,
            schema,
            context: vec![context.to_string()],
            attributes: Vec::new(),
        };
        api.convert_children(source)
    }
}

pub struct ConversionApi<'a> {
    pipeline: &'a ConversionPipeline,
    schema: &'a Schema,
    context: Vec<String>,
    attributes: Vec<(String, Value)>,
}

impl<'a> ConversionApi<'a> {
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn paragraph_like(&self) -> &'a ParagraphLikeElements {
        &self.pipeline.paragraph_like
    }

    pub fn context(&self) -> &str {
        self.context.last().map(String::as_str).unwrap_or_default()
    }

    pub fn in_context<R>(&mut self, kind: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        self.context.push(kind.to_string());
        let out = f(self);
        self.context.pop();
        out
    }

    pub fn with_attribute<R>(&mut self, key: String, value: Value, f: impl FnOnce(&mut Self) -> R) -> R {
        self.attributes.push((key, value));
        let out = f(self);
        self.attributes.pop();
        out
    }

    pub fn is_allowed(&self, node: &Node) -> bool {
        self.schema.check(node.kind(), self.context())
    }

    pub fn text(&self, text: &str) -> Node {
        let mut node = TextNode {
            text: text.to_string(),
            attrs: Default::default(),
        };
        for (key, value) in &self.attributes {
            if self.schema.check_attribute(TEXT, key) {
                node.attrs.insert(key.clone(), value.clone());
            }
        }
        Node::Text(node)
    }

    pub fn dispatch(&mut self, node: &SourceNode) -> Dispatch {
        let pipeline = self.pipeline;
        match node {
            SourceNode::Text(text) => {
                for (_, converter) in &pipeline.entries {
                    if let Converter::Text(c) = converter {
                        if let Some(nodes) = c.convert(text, self) {
                            return Dispatch::Nodes(nodes);
                        }
                    }
                }
            }
            SourceNode::Element(element) => {
                for (_, converter) in &pipeline.entries {
                    match converter {
                        Converter::Element(c) => {
                            if let Some(nodes) = c.convert(element, self) {
                                return Dispatch::Nodes(nodes);
                            }
                        }
                        Converter::Attribute(c) => {
                            if let Some((key, value)) = c.attribute(element, self) {
                                return Dispatch::Attribute(key, value);
                            }
                        }
                        Converter::Text(_) | Converter::Children(_) => {}
                    }
                }
            }
        }
        Dispatch::Unclaimed
    }

    pub fn convert_children(&mut self, children: &[SourceNode]) -> Vec<Node> {
        let pipeline = self.pipeline;
        for (_, converter) in &pipeline.entries {
            if let Converter::Children(c) = converter {
                if let Some(nodes) = c.convert_children(children, self) {
                    return merge_adjacent_text(nodes);
                }
            }
        }
        let mut out = Vec::new();
        self.walk_children(children, &mut out);
        merge_adjacent_text(out)
    }

    pub fn convert_children_into(&mut self, kind: &str, children: &[SourceNode]) -> Vec<Node> {
        self.in_context(kind, |api| api.convert_children(children))
    }

    fn walk_children(&mut self, children: &[SourceNode], out: &mut Vec<Node>) {
        for child in children {
            match (self.dispatch(child), child) {
                (Dispatch::Nodes(nodes), _) => {
                    for node in nodes {
                        if self.is_allowed(&node) {
                            out.push(node);
                        } else {
                            tracing::debug!(
                                kind = node.kind(),
                                context = self.context(),
                                "dropping converted node not allowed in context"
                            );
                        }
                    }
                }
                (Dispatch::Attribute(key, value), SourceNode::Element(el)) => {
                    self.with_attribute(key, value, |api| api.walk_children(&el.children, out));
                }
                (_, SourceNode::Element(el)) => self.walk_children(&el.children, out),
                (_, SourceNode::Text(_)) => {
                    tracing::trace!(context = self.context(), "dropping unclaimed text");
                }
            }
        }
    }
}

pub struct ConvertText;

impl TextConverter for ConvertText {
    fn convert(&self, text: &str, api: &mut ConversionApi<'_>) -> Option<Vec<Node>> {
        if !api.schema().check(TEXT, api.context()) {
            return None;
        }
        Some(vec![api.text(text)])
    }
}

pub struct ElementToElement {
    view: String,
    model: String,
}

impl ElementToElement {
    pub fn new(view: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            model: model.into(),
        }
    }
}

impl ElementConverter for ElementToElement {
    fn convert(&self, element: &SourceElement, api: &mut ConversionApi<'_>) -> Option<Vec<Node>> {
        if element.name != self.view || !api.schema().check(&self.model, api.context()) {
            return None;
        }
        let children = api.convert_children_into(&self.model, &element.children);
        Some(vec![Node::Element(ElementNode::new(self.model.clone(), children))])
    }
}

pub struct ElementToAttribute {
    view: String,
    key: String,
    value: Value,
}

impl ElementToAttribute {
    pub fn new(view: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Self {
            view: view.into(),
            key: key.into(),
            value,
        }
    }
}

impl AttributeConverter for ElementToAttribute {
    fn attribute(&self, element: &SourceElement, _api: &ConversionApi<'_>) -> Option<(String, Value)> {
        (element.name == self.view).then(|| (self.key.clone(), self.value.clone()))
    }
}
