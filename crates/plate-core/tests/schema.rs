use plate_core::{NodeRule, Schema, SchemaError, BLOCK, CLIPBOARD_HOLDER, ROOT, TEXT};
use pretty_assertions::assert_eq;

#[test]
fn generic_items_are_registered() {
    let schema = Schema::new();
    for kind in [ROOT, BLOCK, TEXT, CLIPBOARD_HOLDER] {
        assert!(schema.is_registered(kind), "{kind}");
    }
    assert!(schema.check(BLOCK, ROOT));
    assert!(schema.check(TEXT, BLOCK));
    assert!(schema.check(TEXT, CLIPBOARD_HOLDER));
    assert!(schema.check(BLOCK, CLIPBOARD_HOLDER));
    assert!(!schema.check(TEXT, ROOT));
}

#[test]
fn inherit_all_from_copies_parents_content_and_role() {
    let mut schema = Schema::new();
    schema
        .register("heading1", NodeRule::new().inherit_all_from(BLOCK))
        .unwrap();
    assert!(schema.check("heading1", ROOT));
    assert!(schema.check(TEXT, "heading1"));
    assert!(schema.is_block("heading1"));
    assert!(!schema.is_inline("heading1"));
}

#[test]
fn allow_where_text_makes_inline() {
    let mut schema = Schema::new();
    schema
        .register("span", NodeRule::new().allow_where(TEXT))
        .unwrap();
    schema
        .extend(TEXT, NodeRule::new().allow_in(["span"]))
        .unwrap();
    assert!(schema.is_inline("span"));
    assert!(schema.check("span", BLOCK));
    assert!(!schema.check("span", ROOT));
    assert!(schema.check(TEXT, "span"));
}

#[test]
fn extending_a_generic_item_reaches_inheritors() {
    let mut schema = Schema::new();
    schema
        .register("para", NodeRule::new().inherit_all_from(BLOCK))
        .unwrap();
    schema
        .register("quote", NodeRule::new().allow_in([ROOT]))
        .unwrap();
    assert!(!schema.check("para", "quote"));
    schema
        .extend(BLOCK, NodeRule::new().allow_in(["quote"]))
        .unwrap();
    assert!(schema.check("para", "quote"));
}

#[test]
fn disallow_wins_until_extended_again() {
    let mut schema = Schema::new();
    schema.disallow(TEXT, [BLOCK]);
    assert!(!schema.check(TEXT, BLOCK));
    schema
        .extend(TEXT, NodeRule::new().allow_in([BLOCK]))
        .unwrap();
    assert!(schema.check(TEXT, BLOCK));
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut schema = Schema::new();
    schema.register("x", NodeRule::new()).unwrap();
    assert_eq!(
        schema.register("x", NodeRule::new()),
        Err(SchemaError::AlreadyRegistered("x".into()))
    );
    assert_eq!(
        schema.extend("y", NodeRule::new()),
        Err(SchemaError::NotRegistered("y".into()))
    );
}

#[test]
fn attributes_follow_inheritance() {
    let mut schema = Schema::new();
    schema
        .extend(BLOCK, NodeRule::new().allow_attributes(["align"]))
        .unwrap();
    schema
        .register("para", NodeRule::new().inherit_all_from(BLOCK))
        .unwrap();
    assert!(schema.check_attribute("para", "align"));
    assert!(!schema.check_attribute(TEXT, "bold"));
    schema
        .extend(TEXT, NodeRule::new().allow_attributes(["bold"]))
        .unwrap();
    assert!(schema.check_attribute(TEXT, "bold"));
}

#[test]
fn unknown_kinds_never_check() {
    let schema = Schema::new();
    assert!(!schema.check("nope", ROOT));
    assert!(!schema.check(TEXT, "nope"));
}
