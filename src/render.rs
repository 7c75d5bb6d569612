use std::rc::Rc;

use crate::ast::{AttrValue, ElementNode, KeyRef, Node, DYNAMIC_PREFIX};
use crate::context::{parse_value, Scope};
use crate::markup;
use crate::registry::{PartialMap, PartialRegistry};
use crate::template::Template;
use crate::value::Value;
use crate::view::{BoundWidget, View};
use crate::vtree::{Properties, VElement, VNode};

/// What one node renders to. Sequences stay structured until the caller
/// materializes them, so the array rules can flatten and merge results
/// from sections and partials.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Rendered {
    /// A falsy or skipped subtree; filtered out of sequences.
    Nothing,
    Text(String),
    Node(VNode),
    Fragment(Vec<Rendered>),
}

impl Rendered {
    /// Final materialization into virtual-tree children.
    pub(crate) fn into_vnodes(self) -> Vec<VNode> {
        match self {
            Self::Nothing => Vec::new(),
            Self::Text(text) => vec![VNode::Text(text)],
            Self::Node(node) => vec![node],
            Self::Fragment(items) => items.into_iter().flat_map(Self::into_vnodes).collect(),
        }
    }

    /// Appends the text content of this result, ignoring any non-text
    /// nodes. Used for comment bodies and attribute assembly.
    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Nothing | Self::Node(_) => {}
            Self::Text(text) => out.push_str(text),
            Self::Fragment(items) => {
                for item in items {
                    item.collect_text(out);
                }
            }
        }
    }
}

/// The recursive interpreter: one template node against one scope.
pub(crate) fn render_node(
    node: &Node,
    scope: &Rc<Scope>,
    partials: Option<&Rc<PartialMap>>,
    registry: &PartialRegistry,
    owner: Option<&Rc<dyn View>>,
    first_render: bool,
) -> Rendered {
    match node {
        Node::Text(text) => Rendered::Text(text.clone()),

        Node::Fragment(children) => {
            render_fragment(children, scope, partials, registry, owner, first_render)
        }

        Node::Widget(binding) => {
            if owner.is_some() {
                // Inside a view tree: bind the child view over the subtree
                // so it renders and attaches through its own cycle.
                Rendered::Node(VNode::Widget(BoundWidget::new(
                    Rc::clone(&binding.child),
                    binding.template.clone(),
                    Rc::clone(scope),
                    first_render,
                )))
            } else {
                // Rendering a detached template: no component to attach,
                // so the subtree renders directly.
                render_node(
                    binding.template.node(),
                    scope,
                    binding.template.partials_ref(),
                    registry,
                    None,
                    first_render,
                )
            }
        }

        Node::Comment(children) => {
            let mut text = String::new();
            for child in children {
                render_node(child, scope, partials, registry, owner, first_render)
                    .collect_text(&mut text);
            }
            Rendered::Node(VNode::Comment(text))
        }

        Node::Interpolator(key) => interpolate(key, scope, false),
        Node::RawInterpolator(key) => interpolate(key, scope, true),

        Node::Partial(key) => {
            render_partial_reference(key, scope, partials, registry, owner, first_render)
        }

        Node::Section {
            key,
            inverted,
            body,
        } => {
            let parsed = parse_value(scope.lookup(&key.resolve()));
            if *inverted {
                // "Unless": the body renders in the same scope when the
                // value is falsy or empty.
                if parsed.is_truthy {
                    Rendered::Nothing
                } else {
                    render_fragment(body, scope, partials, registry, owner, first_render)
                }
            } else if !parsed.is_truthy {
                Rendered::Nothing
            } else if parsed.is_list {
                // Sections become loops over sequences, one pushed scope
                // per element, in element order.
                let Value::List(items) = &parsed.value else {
                    return Rendered::Nothing;
                };
                Rendered::Fragment(
                    items
                        .iter()
                        .map(|item| {
                            render_fragment(
                                body,
                                &scope.push(item.clone()),
                                partials,
                                registry,
                                owner,
                                first_render,
                            )
                        })
                        .collect(),
                )
            } else if matches!(parsed.value, Value::Object(_) | Value::Str(_)) {
                // Composite values become the new scope for the body.
                render_fragment(
                    body,
                    &scope.push(parsed.value),
                    partials,
                    registry,
                    owner,
                    first_render,
                )
            } else {
                // A bare truthy primitive guards the body without becoming
                // a renderable context.
                render_fragment(body, scope, partials, registry, owner, first_render)
            }
        }

        Node::Element(element) => Rendered::Node(VNode::Element(render_element(
            element,
            scope,
            partials,
            registry,
            owner,
            first_render,
        ))),
    }
}

/// The sequence rules: render every child, splice nested sequences flat,
/// merge adjacent text runs (adjacent text nodes would throw off
/// the tree library's index-based diffing), and drop empty results. On a
/// first render, a lone empty string means the node has no children at
/// all: some environments hand templates whitespace the DOM won't keep.
fn render_fragment(
    children: &[Node],
    scope: &Rc<Scope>,
    partials: Option<&Rc<PartialMap>>,
    registry: &PartialRegistry,
    owner: Option<&Rc<dyn View>>,
    first_render: bool,
) -> Rendered {
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        flatten_into(
            render_node(child, scope, partials, registry, owner, first_render),
            &mut flat,
        );
    }

    let mut merged: Vec<Rendered> = Vec::with_capacity(flat.len());
    let mut open_text: Option<usize> = None;
    for item in flat {
        match item {
            Rendered::Nothing => {}
            Rendered::Text(text) => match open_text {
                Some(at) => {
                    if let Some(Rendered::Text(run)) = merged.get_mut(at) {
                        run.push_str(&text);
                    }
                }
                None => {
                    open_text = Some(merged.len());
                    merged.push(Rendered::Text(text));
                }
            },
            other => {
                open_text = None;
                merged.push(other);
            }
        }
    }

    if first_render
        && merged.len() == 1
        && matches!(merged.first(), Some(Rendered::Text(text)) if text.is_empty())
    {
        merged.clear();
    }

    Rendered::Fragment(merged)
}

/// Splices nested sequences flat. A section over a list yields one
/// sequence per element; those must not stay nested, or text runs on
/// either side of the section would never merge.
fn flatten_into(item: Rendered, flat: &mut Vec<Rendered>) {
    match item {
        Rendered::Fragment(items) => {
            for item in items {
                flatten_into(item, flat);
            }
        }
        other => flat.push(other),
    }
}

fn interpolate(key: &KeyRef, scope: &Rc<Scope>, raw: bool) -> Rendered {
    let name = key.resolve();
    let Some(value) = scope.lookup(&name) else {
        return Rendered::Text(String::new());
    };
    // Callables run bound to the scope's own value.
    let value = if let Value::Lambda(call) = &value {
        call(scope.view())
    } else {
        value
    };
    let text = value.display();
    if raw && (text.contains('<') || text.contains('&')) {
        // Unescaped content gets parsed back into the tree. Top-level text
        // collapses to plain strings so adjacent-run merging still applies.
        let parsed = markup::parse_fragment(&text);
        Rendered::Fragment(
            parsed
                .into_iter()
                .map(|node| match node {
                    VNode::Text(text) => Rendered::Text(text),
                    other => Rendered::Node(other),
                })
                .collect(),
        )
    } else {
        Rendered::Text(text)
    }
}

fn render_partial_reference(
    key: &KeyRef,
    scope: &Rc<Scope>,
    partials: Option<&Rc<PartialMap>>,
    registry: &PartialRegistry,
    owner: Option<&Rc<dyn View>>,
    first_render: bool,
) -> Rendered {
    let name = key.resolve();

    if let Some(target_key) = name.strip_prefix(DYNAMIC_PREFIX) {
        let Some(target) = scope.lookup(&format!("dynamic_partials.{}", target_key)) else {
            log::warn!(
                "dynamic partial template referenced, but not defined: {}",
                target_key
            );
            return Rendered::Nothing;
        };
        let target_name = target.display();
        let mut resolved = registry.resolve_dynamic(&target_name);
        if let (Some(partial), Some(view)) = (&resolved, owner) {
            if partial.view().is_none() {
                // First use inside a view tree: attach on the fly and keep
                // the attached version for subsequent renders.
                let attached = partial.attach_view_dynamic(Rc::clone(view), registry);
                registry.replace(&target_name, attached.clone());
                resolved = Some(attached);
            }
        }
        return match resolved {
            Some(partial) => {
                render_partial(&partial, scope, partials, registry, owner, first_render)
            }
            None => {
                log::warn!("no partial registered with the name {}", target_name);
                Rendered::Nothing
            }
        };
    }

    let resolved = match partials {
        Some(map) => map.get(name.as_ref()).cloned(),
        None => registry.get(&name),
    };
    match resolved {
        Some(partial) => render_partial(&partial, scope, partials, registry, owner, first_render),
        None => {
            log::warn!("no partial registered with the name {}", name);
            Rendered::Nothing
        }
    }
}

/// Renders a resolved partial with its own partial namespace, falling back
/// to the caller's.
fn render_partial(
    partial: &Template,
    scope: &Rc<Scope>,
    caller_partials: Option<&Rc<PartialMap>>,
    registry: &PartialRegistry,
    owner: Option<&Rc<dyn View>>,
    first_render: bool,
) -> Rendered {
    let next_partials = partial.partials_ref().or(caller_partials);
    render_node(
        partial.node(),
        scope,
        next_partials,
        registry,
        owner,
        first_render,
    )
}

fn render_element(
    element: &ElementNode,
    scope: &Rc<Scope>,
    partials: Option<&Rc<PartialMap>>,
    registry: &PartialRegistry,
    owner: Option<&Rc<dyn View>>,
    first_render: bool,
) -> VElement {
    let mut properties = Properties::default();

    for (name, value) in &element.attributes {
        let text = match value {
            AttrValue::Static(text) => text.clone(),
            // Interpolated values concatenate their rendered fragments.
            AttrValue::Templated(fragments) => {
                let mut buffer = String::new();
                for fragment in fragments {
                    render_node(fragment, scope, partials, registry, owner, first_render)
                        .collect_text(&mut buffer);
                }
                buffer
            }
        };
        properties.set_attribute(name, text);
    }

    if !element.dynamic_attributes.is_empty() {
        // Loose interpolators inside the open tag only become attributes
        // once every token has resolved; render them to text and read the
        // pairs back through the attribute grammar.
        let mut loose = String::new();
        for template in &element.dynamic_attributes {
            loose.push(' ');
            render_node(template, scope, partials, registry, owner, first_render)
                .collect_text(&mut loose);
        }
        for (name, value) in markup::parse_attribute_pairs(&loose) {
            properties.set_attribute(&name, value);
        }
    }

    let children = render_fragment(
        &element.children,
        scope,
        partials,
        registry,
        owner,
        first_render,
    )
    .into_vnodes();

    VElement {
        tag: element.tag.clone(),
        properties,
        children,
    }
}
