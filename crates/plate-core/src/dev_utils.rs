use serde_json::Value;

use crate::core::Editor;
use crate::html::{parse_fragment, SourceNode};
use crate::model::{Attrs, ElementNode, Node, TextNode};
use crate::schema::TEXT;

pub fn stringify(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(t) if t.attrs.is_empty() => out.push_str(&html_escape::encode_text(&t.text)),
        Node::Text(t) => {
            open_tag(TEXT, &t.attrs, out);
            out.push_str(&html_escape::encode_text(&t.text));
            close_tag(TEXT, out);
        }
        Node::Element(el) => {
            open_tag(&el.kind, &el.attrs, out);
            for child in &el.children {
                write_node(child, out);
            }
            close_tag(&el.kind, out);
        }
    }
}

fn open_tag(name: &str, attrs: &Attrs, out: &mut String) {
    out.push('<');
    out.push_str(name);
    for (key, value) in attrs {
        let raw = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&html_escape::encode_double_quoted_attribute(&raw));
        out.push('"');
    }
    out.push('>');
}

fn close_tag(name: &str, out: &mut String) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

pub fn parse_model(input: &str) -> Vec<Node> {
    parse_fragment(input).iter().map(to_model).collect()
}

fn to_model(node: &SourceNode) -> Node {
    match node {
        SourceNode::Text(text) => Node::text(text.clone()),
        SourceNode::Element(el) => {
            let attrs: Attrs = el
                .attrs
                .iter()
                .map(|(k, v)| {
                    let value = serde_json::from_str(v).unwrap_or_else(|_| Value::String(v.clone()));
                    (k.clone(), value)
                })
                .collect();
            if el.name == TEXT {
                let text = el
                    .children
                    .iter()
                    .filter_map(|c| match c {
                        SourceNode::Text(t) => Some(t.as_str()),
                        SourceNode::Element(_) => None,
                    })
                    .collect();
                return Node::Text(TextNode { text, attrs });
            }
            Node::Element(ElementNode {
                kind: el.name.clone(),
                attrs,
                children: el.children.iter().map(to_model).collect(),
            })
        }
    }
}

pub fn get_model_data(editor: &Editor, root: &str) -> String {
    editor
        .doc()
        .root(root)
        .map(|el| stringify(&el.children))
        .unwrap_or_default()
}
