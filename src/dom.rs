//! A small document-object model used as the materialization target for
//! [`Template::to_dom`](crate::Template::to_dom) and as the live mount
//! element views hand to the attachment pass.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::registry::PartialRegistry;
use crate::vtree::{self, PropertyValue, VNode};

#[derive(Clone, Debug, PartialEq)]
pub enum DomNode {
    /// Shared handle so views can hold onto their mount element while the
    /// attachment pass reconciles its children.
    Element(Rc<RefCell<DomElement>>),
    Text(String),
    Comment(String),
}

#[derive(Debug, PartialEq, Default)]
pub struct DomElement {
    pub tag: String,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<DomNode>,
    /// Set when the focus hook fired during materialization.
    pub focused: bool,
}

impl DomElement {
    pub fn new<T: Into<String>>(tag: T) -> Self {
        Self {
            tag: tag.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
            focused: false,
        }
    }

    pub fn shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }
}

/// Materializes a virtual tree into DOM nodes. Bound widgets render their
/// captured subtree through the child view's cycle first.
pub fn from_vnodes(nodes: &[VNode], registry: &PartialRegistry) -> Vec<DomNode> {
    nodes
        .iter()
        .flat_map(|node| from_vnode(node, registry))
        .collect()
}

fn from_vnode(node: &VNode, registry: &PartialRegistry) -> Vec<DomNode> {
    match node {
        VNode::Text(text) => vec![DomNode::Text(text.clone())],
        VNode::Comment(text) => vec![DomNode::Comment(text.clone())],
        VNode::Widget(widget) => {
            // The captured subtree is the matched element itself; rendering
            // it through the child view's cycle yields the widget's DOM.
            let subtree = widget.to_vnodes(registry);
            from_vnodes(&subtree, registry)
        }
        VNode::Element(velement) => {
            let mut element = DomElement::new(velement.tag.clone());
            for (prop, value) in &velement.properties.props {
                match value {
                    PropertyValue::Text(text) => {
                        element
                            .attributes
                            .insert(vtree::attribute_name(prop).to_string(), text.clone());
                    }
                    PropertyValue::CssText(css) => {
                        element.attributes.insert("style".to_string(), css.clone());
                    }
                    PropertyValue::FocusHook => {
                        // The node is joining the tree right now, so the
                        // post-mount focus side effect fires here.
                        element.focused = true;
                        element
                            .attributes
                            .insert("autofocus".to_string(), String::new());
                    }
                }
            }
            for (attr, value) in &velement.properties.attributes {
                element.attributes.insert(attr.clone(), value.clone());
            }
            element.children = from_vnodes(&velement.children, registry);
            vec![DomNode::Element(element.shared())]
        }
    }
}

/// Serializes DOM nodes back to an HTML string.
pub fn to_html(nodes: &[DomNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

fn write_node(out: &mut String, node: &DomNode) {
    match node {
        DomNode::Text(text) => crate::markup::escape_into(out, text),
        DomNode::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        DomNode::Element(element) => {
            let element = element.borrow();
            out.push('<');
            out.push_str(&element.tag);
            for (name, value) in &element.attributes {
                out.push(' ');
                out.push_str(name);
                if !value.is_empty() || name != "autofocus" {
                    out.push_str("=\"");
                    crate::markup::escape_into(out, value);
                    out.push('"');
                }
            }
            out.push('>');
            if crate::markup::is_void_element(&element.tag) {
                return;
            }
            for child in &element.children {
                write_node(out, child);
            }
            out.push_str("</");
            out.push_str(&element.tag);
            out.push('>');
        }
    }
}
