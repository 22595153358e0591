use plate_core::{
    merge_adjacent_text, ChildrenConverter, ConversionApi, Dispatch, ElementNode, Node,
    SourceElement, SourceNode,
};

use crate::PARAGRAPH;

/// Assembles the children of every container that accepts paragraphs,
/// collecting loose inline content into paragraphs.
///
/// Registered last, so specific converters always see a source node first.
/// In contexts where `paragraph` is not allowed it declines and the plain
/// walk applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct Autoparagraph;

impl ChildrenConverter for Autoparagraph {
    fn convert_children(
        &self,
        children: &[SourceNode],
        api: &mut ConversionApi<'_>,
    ) -> Option<Vec<Node>> {
        if !api.schema().check(PARAGRAPH, api.context()) {
            return None;
        }
        let mut walker = Walker {
            buffer: Vec::new(),
            output: Vec::new(),
            forced: false,
        };
        walker.walk(api, children);
        walker.flush(api);
        Some(walker.output)
    }
}

struct Walker {
    buffer: Vec<Node>,
    output: Vec<Node>,
    /// Set while inside a paragraph-like element.
    forced: bool,
}

impl Walker {
    fn walk(&mut self, api: &mut ConversionApi<'_>, children: &[SourceNode]) {
        for child in children {
            match api.dispatch(child) {
                Dispatch::Nodes(nodes) => self.push_converted(api, nodes),
                Dispatch::Attribute(key, value) => {
                    if let SourceNode::Element(el) = child {
                        api.with_attribute(key, value, |api| self.walk(api, &el.children));
                    }
                }
                Dispatch::Unclaimed => match child {
                    SourceNode::Text(_) => self.unclaimed_text(api, child),
                    SourceNode::Element(el) => self.unclaimed_element(api, el, child),
                },
            }
        }
    }

    fn push_converted(&mut self, api: &mut ConversionApi<'_>, nodes: Vec<Node>) {
        for node in nodes {
            let inline = match &node {
                Node::Text(_) => true,
                Node::Element(el) => api.schema().is_inline(&el.kind),
            };
            if inline {
                self.buffer.push(node);
                continue;
            }
            self.flush(api);
            if api.is_allowed(&node) {
                self.output.push(node);
            } else {
                tracing::debug!(
                    kind = node.kind(),
                    context = api.context(),
                    "dropping converted block not allowed in context"
                );
            }
        }
    }

    fn unclaimed_text(&mut self, api: &mut ConversionApi<'_>, child: &SourceNode) {
        match api.in_context(PARAGRAPH, |api| api.dispatch(child)) {
            Dispatch::Nodes(nodes) => self.buffer.extend(nodes),
            _ => tracing::trace!(context = api.context(), "dropping text allowed nowhere"),
        }
    }

    fn unclaimed_element(&mut self, api: &mut ConversionApi<'_>, el: &SourceElement, child: &SourceNode) {
        // Inline elements that only fit inside a paragraph.
        match api.in_context(PARAGRAPH, |api| api.dispatch(child)) {
            Dispatch::Nodes(nodes) => {
                self.buffer.extend(nodes);
                return;
            }
            Dispatch::Attribute(key, value) => {
                api.with_attribute(key, value, |api| self.walk(api, &el.children));
                return;
            }
            Dispatch::Unclaimed => {}
        }

        if api.paragraph_like().contains(&el.name) {
            self.flush(api);
            let forced = std::mem::replace(&mut self.forced, true);
            self.walk(api, &el.children);
            self.flush(api);
            self.forced = forced;
            return;
        }

        self.walk(api, &el.children);
    }

    fn flush(&mut self, api: &mut ConversionApi<'_>) {
        if self.buffer.is_empty() {
            return;
        }
        let buffer = merge_adjacent_text(std::mem::take(&mut self.buffer));
        let wrap = self.forced || buffer.iter().any(|node| !api.is_allowed(node));

        if !wrap {
            self.output.extend(buffer);
            return;
        }

        let schema = api.schema();
        let (kept, dropped): (Vec<Node>, Vec<Node>) = buffer
            .into_iter()
            .partition(|node| schema.check(node.kind(), PARAGRAPH));
        if !dropped.is_empty() {
            tracing::debug!(
                count = dropped.len(),
                "dropping buffered nodes not allowed in a paragraph"
            );
        }
        if kept.is_empty() {
            return;
        }
        self.output
            .push(Node::Element(ElementNode::new(PARAGRAPH, kept)));
    }
}
