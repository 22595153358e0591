use plate_core::dev_utils::stringify;
use plate_core::{
    parse_fragment, ConversionPipeline, ConvertText, Converter, ElementToAttribute,
    ElementToElement, Node, NodeRule, Priority, Schema, BLOCK, ROOT, TEXT,
};
use pretty_assertions::assert_eq;
use serde_json::Value;

fn schema() -> Schema {
    let mut schema = Schema::new();
    schema
        .register("block", NodeRule::new().inherit_all_from(BLOCK))
        .unwrap();
    schema
}

fn pipeline() -> ConversionPipeline {
    let mut pipeline = ConversionPipeline::new();
    pipeline.add(Priority::Normal, Converter::Text(Box::new(ConvertText)));
    pipeline.add(
        Priority::Normal,
        Converter::Element(Box::new(ElementToElement::new("p", "block"))),
    );
    pipeline
}

#[test]
fn plain_walk_keeps_allowed_nodes_only() {
    let out = pipeline().convert(&schema(), &parse_fragment("a<p>b</p><i>c<p>d</p></i>"), ROOT);
    assert_eq!(stringify(&out), "<block>b</block><block>d</block>");
}

#[test]
fn higher_priority_claims_first() {
    let mut pipeline = pipeline();
    pipeline.add(
        Priority::High,
        Converter::on_element("p", |_, _| Some(Vec::new())),
    );
    let out = pipeline.convert(&schema(), &parse_fragment("<p>b</p>"), ROOT);
    assert!(out.is_empty());
}

#[test]
fn same_priority_keeps_registration_order() {
    let mut pipeline = ConversionPipeline::new();
    pipeline.add(
        Priority::Normal,
        Converter::on_element("p", |_, _| Some(vec![Node::element("block", Vec::new())])),
    );
    pipeline.add(
        Priority::Normal,
        Converter::on_element("p", |_, _| Some(vec![Node::element("other", Vec::new())])),
    );
    let out = pipeline.convert(&schema(), &parse_fragment("<p></p>"), ROOT);
    assert_eq!(stringify(&out), "<block></block>");
}

#[test]
fn attribute_converter_marks_text_when_allowed() {
    let mut schema = schema();
    let mut pipeline = pipeline();
    pipeline.add(
        Priority::Normal,
        Converter::Attribute(Box::new(ElementToAttribute::new("b", "bold", Value::Bool(true)))),
    );
    let source = parse_fragment("<p>a<b>b</b></p>");
    assert_eq!(
        stringify(&pipeline.convert(&schema, &source, ROOT)),
        "<block>ab</block>"
    );
    schema
        .extend(TEXT, NodeRule::new().allow_attributes(["bold"]))
        .unwrap();
    assert_eq!(
        stringify(&pipeline.convert(&schema, &source, ROOT)),
        r#"<block>a<$text bold="true">b</$text></block>"#
    );
}
