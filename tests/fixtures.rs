//! Shared helpers for the integration tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use trellis::{
    AttrValue, DomElement, ElementNode, HostObject, KeyRef, Node, Value, View,
};

pub fn text<S: Into<String>>(content: S) -> Node {
    Node::Text(content.into())
}

pub fn interp(name: &str) -> Node {
    Node::Interpolator(KeyRef::literal(name))
}

pub fn raw_interp(name: &str) -> Node {
    Node::RawInterpolator(KeyRef::literal(name))
}

pub fn partial(name: &str) -> Node {
    Node::Partial(KeyRef::literal(name))
}

pub fn section(name: &str, body: Vec<Node>) -> Node {
    Node::Section {
        key: KeyRef::literal(name),
        inverted: false,
        body,
    }
}

pub fn unless(name: &str, body: Vec<Node>) -> Node {
    Node::Section {
        key: KeyRef::literal(name),
        inverted: true,
        body,
    }
}

pub fn element(tag: &str, attrs: &[(&str, &str)], children: Vec<Node>) -> Node {
    let mut node = ElementNode {
        tag: tag.to_string(),
        ..Default::default()
    };
    for (name, value) in attrs {
        node.attributes
            .insert((*name).to_string(), AttrValue::Static((*value).to_string()));
    }
    node.children = children;
    Node::Element(node)
}

pub fn data(json: serde_json::Value) -> Value {
    Value::from(json)
}

/// A host object built from explicit (name, value) pairs, for values the
/// JSON adaptor can't express (lambdas, nested host objects).
pub struct MapModel {
    pub fields: Vec<(String, Value)>,
}

impl HostObject for MapModel {
    fn field(&self, key: &str) -> Option<Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.clone())
    }
}

pub fn object(fields: Vec<(&str, Value)>) -> Value {
    Value::Object(Rc::new(MapModel {
        fields: fields
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect(),
    }))
}

/// A host object that counts how many times field resolution runs.
pub struct CountingModel {
    pub fields: serde_json::Map<String, serde_json::Value>,
    pub hits: Rc<Cell<usize>>,
}

impl HostObject for CountingModel {
    fn field(&self, key: &str) -> Option<Value> {
        self.hits.set(self.hits.get() + 1);
        self.fields.get(key).map(Value::from)
    }
}

/// A minimal view implementation for attachment tests.
pub struct TestView {
    pub tag: String,
    pub parent: bool,
    pub children: Vec<(String, Rc<dyn View>)>,
    pub mount: Option<Rc<RefCell<DomElement>>>,
}

impl TestView {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            parent: false,
            children: Vec::new(),
            mount: None,
        }
    }

    /// A view nested under another view: no root wrapper is synthesized
    /// when attaching to it.
    pub fn nested(tag: &str) -> Self {
        Self {
            parent: true,
            ..Self::new(tag)
        }
    }
}

impl View for TestView {
    fn tag_name(&self) -> &str {
        &self.tag
    }

    fn has_parent(&self) -> bool {
        self.parent
    }

    fn child_views(&self) -> Vec<(String, Rc<dyn View>)> {
        self.children.clone()
    }

    fn mount(&self) -> Option<Rc<RefCell<DomElement>>> {
        self.mount.clone()
    }
}
