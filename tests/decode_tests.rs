use serde_json::json;
use trellis::{
    decode_template, AttrValue, DecodeErrorKind, ElementNode, KeyRef, Node, PartialRegistry,
    Template, Value,
};

#[test]
#[ntest::timeout(100)]
fn test_decode_full_document() {
    let document = json!([
        "Hello, ",
        { "t": 2, "r": "name" },
        { "t": 4, "r": "items", "f": [{ "t": 3, "r": "html" }] },
        { "t": 4, "n": 51, "r": "off", "f": ["none"] },
        {
            "t": 7,
            "e": "div",
            "a": { "class": "row", "title": [{ "t": 2, "r": "id" }] },
            "m": [{ "t": 2, "r": "attrs" }],
            "f": ["x"]
        },
        { "t": 8, "r": "footer" },
        { "t": 9, "c": "note" }
    ]);

    let mut div = ElementNode {
        tag: "div".to_string(),
        ..Default::default()
    };
    div.attributes
        .insert("class".to_string(), AttrValue::Static("row".to_string()));
    div.attributes.insert(
        "title".to_string(),
        AttrValue::Templated(vec![Node::Interpolator(KeyRef::literal("id"))]),
    );
    div.dynamic_attributes = vec![Node::Interpolator(KeyRef::literal("attrs"))];
    div.children = vec![Node::Text("x".to_string())];

    let expected = Node::Fragment(vec![
        Node::Text("Hello, ".to_string()),
        Node::Interpolator(KeyRef::literal("name")),
        Node::Section {
            key: KeyRef::literal("items"),
            inverted: false,
            body: vec![Node::RawInterpolator(KeyRef::literal("html"))],
        },
        Node::Section {
            key: KeyRef::literal("off"),
            inverted: true,
            body: vec![Node::Text("none".to_string())],
        },
        Node::Element(div),
        Node::Partial(KeyRef::literal("footer")),
        Node::Comment(vec![Node::Text("note".to_string())]),
    ]);

    assert_eq!(decode_template(&document).expect("valid document"), expected);
}

#[test]
#[ntest::timeout(100)]
fn test_decode_expression_key() {
    let document = json!({ "t": 2, "x": { "r": ["user"], "s": "_0.name" } });

    let node = decode_template(&document).expect("valid document");
    let Node::Interpolator(key) = node else {
        panic!("expected an interpolator, got {:?}", node);
    };
    assert_eq!(key.resolve(), "user.name");
}

#[test]
#[ntest::timeout(100)]
fn test_decode_unknown_node_type() {
    let err = decode_template(&json!({ "t": 42 })).expect_err("unknown type");
    assert_eq!(err.path, "$");
    assert_eq!(err.kind, DecodeErrorKind::UnknownNodeType { t: 42 });
}

#[test]
#[ntest::timeout(100)]
fn test_decode_errors_carry_paths() {
    let err = decode_template(&json!([{ "e": "div" }])).expect_err("missing discriminator");
    assert_eq!(err.path, "$[0]");
    assert_eq!(err.kind, DecodeErrorKind::MissingField { field: "t" });
    assert_eq!(err.to_string(), "Decode error at $[0]: Missing field 't'");

    let err = decode_template(&json!([{ "t": 7 }])).expect_err("element without tag");
    assert_eq!(err.path, "$[0]");
    assert_eq!(err.kind, DecodeErrorKind::MissingField { field: "e" });
}

#[test]
#[ntest::timeout(100)]
fn test_from_compiled_source_rejects_invalid_json() {
    let err = Template::from_compiled_source("not json").expect_err("invalid JSON");
    assert!(
        matches!(err.kind, DecodeErrorKind::Message(_)),
        "got {:?}",
        err.kind
    );
}

#[test]
#[ntest::timeout(100)]
fn test_decode_then_render() {
    let registry = PartialRegistry::new();
    let template = Template::from_compiled(&json!([
        "Hello, ",
        { "t": 2, "r": "name" },
        "!",
        { "t": 4, "r": "tags", "f": [" #", { "t": 2, "r": "." }] }
    ]))
    .expect("valid document");

    let ctx = Value::from(json!({ "name": "Ann", "tags": ["a", "b"] }));
    assert_eq!(template.to_html(&ctx, &registry), "Hello, Ann! #a #b");
}
