use plate_core::html::{parse_fragment, DataOutput, DataOutputs, SourceNode};
use plate_core::Node;
use pretty_assertions::assert_eq;

#[test]
fn parses_nested_elements_and_text() {
    let nodes = parse_fragment("<ul><li>a</li><li>b &amp; c</li></ul>tail");
    assert_eq!(
        nodes,
        vec![
            SourceNode::element(
                "ul",
                vec![
                    SourceNode::element("li", vec![SourceNode::text("a")]),
                    SourceNode::element("li", vec![SourceNode::text("b & c")]),
                ]
            ),
            SourceNode::text("tail"),
        ]
    );
}

#[test]
fn closes_open_elements_at_end_of_input() {
    let nodes = parse_fragment("<h1><span>foo</span><span>bar</span>");
    assert_eq!(
        nodes,
        vec![SourceNode::element(
            "h1",
            vec![
                SourceNode::element("span", vec![SourceNode::text("foo")]),
                SourceNode::element("span", vec![SourceNode::text("bar")]),
            ]
        )]
    );
}

#[test]
fn reads_attributes_and_void_elements() {
    let nodes = parse_fragment(r#"<p class="x" data-a='1' hidden>a<br>b</p>"#);
    let SourceNode::Element(p) = &nodes[0] else {
        panic!("expected element");
    };
    assert_eq!(p.attrs.get("class").map(String::as_str), Some("x"));
    assert_eq!(p.attrs.get("data-a").map(String::as_str), Some("1"));
    assert_eq!(p.attrs.get("hidden").map(String::as_str), Some(""));
    assert_eq!(p.children.len(), 3);
}

#[test]
fn ignores_comments_and_stray_closing_tags() {
    let nodes = parse_fragment("a<!-- x --></div>b");
    assert_eq!(nodes, vec![SourceNode::text("ab")]);
}

#[test]
fn writes_mapped_elements_and_attributes() {
    let mut outputs = DataOutputs::default();
    outputs.add(DataOutput::Element {
        model: "paragraph".into(),
        view: "p".into(),
    });
    outputs.add(DataOutput::Attribute {
        key: "bold".into(),
        view: "strong".into(),
    });
    let mut bold = Node::text("b<");
    if let Node::Text(t) = &mut bold {
        t.attrs.insert("bold".into(), serde_json::json!(true));
    }
    let html = outputs.write(&[Node::element("paragraph", vec![Node::text("a"), bold])]);
    assert_eq!(html, "<p>a<strong>b&lt;</strong></p>");
}
