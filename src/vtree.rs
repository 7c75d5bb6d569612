use indexmap::IndexMap;

use crate::markup;
use crate::registry::PartialRegistry;
use crate::view::BoundWidget;

/// A node in the virtual tree the interpreter materializes into.
#[derive(Clone, Debug, PartialEq)]
pub enum VNode {
    Element(VElement),
    Text(String),
    Comment(String),
    /// A child view bound over a subtree; present only in trees rendered
    /// with an owning view.
    Widget(BoundWidget),
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct VElement {
    pub tag: String,
    pub properties: Properties,
    pub children: Vec<VNode>,
}

/// Resolved element attributes, split the way the tree layer consumes them:
/// most attributes become named properties, while `data-*` attributes stay
/// in a literal attribute map so consumers addressing them by that name
/// keep working.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Properties {
    pub props: IndexMap<String, PropertyValue>,
    pub attributes: IndexMap<String, String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Text(String),
    /// A string-valued `style` attribute, kept as literal CSS text instead
    /// of a structured style object.
    CssText(String),
    /// Focus applied once the node is mounted; focus means nothing before
    /// the node joins a tree.
    FocusHook,
}

impl Properties {
    /// Routes one resolved attribute to its destination: the literal
    /// attribute map, the focus hook, or a (possibly renamed) property.
    pub fn set_attribute(&mut self, name: &str, value: String) {
        match property_name(name) {
            None => {
                self.attributes.insert(name.to_string(), value);
            }
            Some("autofocus") => {
                self.props
                    .insert("autofocus".to_string(), PropertyValue::FocusHook);
            }
            Some("style") => {
                self.props
                    .insert("style".to_string(), PropertyValue::CssText(value));
            }
            Some(prop) => {
                self.props.insert(prop.to_string(), PropertyValue::Text(value));
            }
        }
    }
}

/// Maps an attribute name to its property equivalent, or `None` for names
/// that must stay literal attributes.
fn property_name(attribute: &str) -> Option<&str> {
    match attribute {
        "class" => Some("className"),
        "for" => Some("htmlFor"),
        _ if attribute.starts_with("data-") => None,
        _ => Some(attribute),
    }
}

/// Maps a property name back to its attribute form for serialization.
pub(crate) fn attribute_name(property: &str) -> &str {
    match property {
        "className" => "class",
        "htmlFor" => "for",
        _ => property,
    }
}

/// Serializes a virtual tree to an HTML string. Bound widgets serialize
/// their captured subtree; the registry resolves any partials inside it.
pub fn to_html(nodes: &[VNode], registry: &PartialRegistry) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node, registry);
    }
    out
}

fn write_node(out: &mut String, node: &VNode, registry: &PartialRegistry) {
    match node {
        VNode::Text(text) => markup::escape_into(out, text),
        VNode::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        VNode::Widget(widget) => {
            for child in widget.to_vnodes(registry) {
                write_node(out, &child, registry);
            }
        }
        VNode::Element(element) => {
            out.push('<');
            out.push_str(&element.tag);
            for (prop, value) in &element.properties.props {
                match value {
                    PropertyValue::Text(text) => {
                        write_attribute(out, attribute_name(prop), text);
                    }
                    PropertyValue::CssText(css) => write_attribute(out, "style", css),
                    PropertyValue::FocusHook => {
                        out.push(' ');
                        out.push_str("autofocus");
                    }
                }
            }
            for (attr, value) in &element.properties.attributes {
                write_attribute(out, attr, value);
            }
            out.push('>');
            if markup::is_void_element(&element.tag) {
                return;
            }
            for child in &element.children {
                write_node(out, child, registry);
            }
            out.push_str("</");
            out.push_str(&element.tag);
            out.push('>');
        }
    }
}

fn write_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    markup::escape_into(out, value);
    out.push('"');
}
