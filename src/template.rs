use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{AttrValue, ElementNode, Node, WidgetBinding, DYNAMIC_PREFIX};
use crate::context::Scope;
use crate::decode;
use crate::dom::{self, DomElement, DomNode};
use crate::error::{DecodeError, DecodeErrorKind, TemplateResult};
use crate::registry::{PartialMap, PartialRegistry};
use crate::render::{render_node, Rendered};
use crate::value::Value;
use crate::view::View;
use crate::vtree::{self, VNode};

/// A compiled template, ready to render.
///
/// Wraps the compiled node tree together with an optional private partial
/// namespace and, once [`attach_view`](Self::attach_view) has run, the view
/// it is bound to. Cloning is cheap; the tree itself is shared.
///
/// # Example
///
/// ```
/// use trellis::{KeyRef, Node, PartialRegistry, Template, Value};
///
/// let template = Template::new(Node::Fragment(vec![
///     Node::Text("Hello, ".to_string()),
///     Node::Interpolator(KeyRef::literal("name")),
///     Node::Text("!".to_string()),
/// ]));
///
/// let registry = PartialRegistry::new();
/// let data = Value::from(serde_json::json!({ "name": "World" }));
/// assert_eq!(template.to_html(&data, &registry), "Hello, World!");
/// ```
#[derive(Clone)]
pub struct Template {
    node: Rc<Node>,
    partials: Option<Rc<PartialMap>>,
    view: Option<Rc<dyn View>>,
}

impl Template {
    pub fn new(node: Node) -> Self {
        Self {
            node: Rc::new(node),
            partials: None,
            view: None,
        }
    }

    /// Creates a template carrying its own partial namespace. While this
    /// template renders, partial references resolve here instead of in the
    /// registry.
    pub fn with_partials(node: Node, partials: PartialMap) -> Self {
        Self {
            node: Rc::new(node),
            partials: Some(Rc::new(partials)),
            view: None,
        }
    }

    /// Decodes a template from the compiler's JSON wire format.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] naming the offending node's path if the
    /// document doesn't follow the wire format.
    pub fn from_compiled(json: &serde_json::Value) -> TemplateResult<Self> {
        decode::template(json).map(Self::new)
    }

    /// Parses and decodes a compiled template from JSON text.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the text is not valid JSON or doesn't
    /// follow the wire format.
    pub fn from_compiled_source(source: &str) -> TemplateResult<Self> {
        let json: serde_json::Value = serde_json::from_str(source)
            .map_err(|err| DecodeError::new("$", DecodeErrorKind::Message(err.to_string())))?;
        decode::template(&json).map(Self::new)
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn partials(&self) -> Option<&PartialMap> {
        self.partials.as_deref()
    }

    pub(crate) fn partials_ref(&self) -> Option<&Rc<PartialMap>> {
        self.partials.as_ref()
    }

    /// The view this template was attached to, if any.
    pub fn view(&self) -> Option<&Rc<dyn View>> {
        self.view.as_ref()
    }

    pub fn set_partials(&mut self, partials: PartialMap) {
        self.partials = Some(Rc::new(partials));
    }

    /// Registers this template as a named partial in the given registry.
    pub fn register<N: Into<String>>(&self, name: N, registry: &PartialRegistry) {
        registry.register(name, self.clone());
    }

    /// Renders to a virtual tree. When the template has an attached view,
    /// nested widgets bind to their child views in the output.
    pub fn to_vtree(&self, data: &Value, registry: &PartialRegistry, first_render: bool) -> Vec<VNode> {
        let scope = Scope::new(data.clone());
        render_node(
            &self.node,
            &scope,
            self.partials_ref(),
            registry,
            self.view.as_ref(),
            first_render,
        )
        .into_vnodes()
    }

    /// Renders to an HTML string. Widgets render their subtree in place,
    /// without attaching child views.
    pub fn to_html(&self, data: &Value, registry: &PartialRegistry) -> String {
        let scope = Scope::new(data.clone());
        let nodes = render_node(&self.node, &scope, self.partials_ref(), registry, None, false)
            .into_vnodes();
        vtree::to_html(&nodes, registry)
    }

    /// Renders to DOM nodes. For the outermost attached view the synthetic
    /// root wrapper is unwrapped again, leaving the template's own nodes.
    pub fn to_dom(&self, data: &Value, registry: &PartialRegistry) -> Vec<DomNode> {
        let scope = Scope::new(data.clone());
        let vnodes = render_node(&self.node, &scope, self.partials_ref(), registry, None, false)
            .into_vnodes();
        let nodes = dom::from_vnodes(&vnodes, registry);

        if self.view.as_ref().is_some_and(|view| !view.has_parent()) {
            let mut unwrapped = Vec::new();
            let mut rest = nodes.into_iter();
            if let Some(first) = rest.next() {
                match first {
                    DomNode::Element(wrapper) => {
                        unwrapped.append(&mut wrapper.borrow_mut().children);
                    }
                    other => unwrapped.push(other),
                }
            }
            unwrapped.extend(rest);
            return unwrapped;
        }
        nodes
    }

    /// Renders within an existing scope chain, as widgets do.
    pub(crate) fn render_in_scope(
        &self,
        scope: &Rc<Scope>,
        registry: &PartialRegistry,
        owner: Option<&Rc<dyn View>>,
        first_render: bool,
    ) -> Rendered {
        render_node(
            &self.node,
            scope,
            self.partials_ref(),
            registry,
            owner,
            first_render,
        )
    }

    /// Binds a view over this template, producing a new template whose
    /// tree has [`Node::Widget`] placeholders wherever an element's class
    /// list names one of the view's declared child views.
    ///
    /// The pass never mutates this template's tree: attaching any number
    /// of times leaves the original structurally identical.
    pub fn attach_view(&self, view: Rc<dyn View>, registry: &PartialRegistry) -> Self {
        self.attach(view, registry, false)
    }

    /// Attachment for dynamically resolved partials: no root wrapper is
    /// synthesized.
    pub(crate) fn attach_view_dynamic(&self, view: Rc<dyn View>, registry: &PartialRegistry) -> Self {
        self.attach(view, registry, true)
    }

    fn attach(&self, view: Rc<dyn View>, registry: &PartialRegistry, is_dynamic: bool) -> Self {
        let mut root = (*self.node).clone();

        // The outermost view gets a synthetic wrapper matching its mount
        // element, giving the pass and later lifecycle logic one stable
        // top-level node.
        if !is_dynamic && !view.has_parent() {
            let children = match root {
                Node::Fragment(items) => items,
                other => vec![other],
            };
            if let Some(mount) = view.mount() {
                reconcile_mount(&children, &mount);
            }
            root = Node::Element(ElementNode {
                tag: view.tag_name().to_string(),
                attributes: IndexMap::new(),
                dynamic_attributes: Vec::new(),
                children,
            });
        }

        let index = ChildClassIndex::build(view.as_ref());
        let attached = attach_node(&root, registry, self.partials_ref(), index.as_ref(), true);

        Self {
            node: Rc::new(attached),
            partials: self.partials.clone(),
            view: Some(view),
        }
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("node", &self.node)
            .field("view", &self.view.as_ref().map(|view| view.tag_name().to_string()))
            .finish_non_exhaustive()
    }
}

/// The view's declared child views, indexed once per attachment pass.
struct ChildClassIndex {
    entries: Vec<ChildClass>,
}

struct ChildClass {
    /// `" name "` - padded for whitespace-delimited token matching.
    padded: String,
    view: Rc<dyn View>,
}

impl ChildClassIndex {
    fn build(view: &dyn View) -> Option<Self> {
        let declared = view.child_views();
        if declared.is_empty() {
            return None;
        }
        let entries = declared
            .into_iter()
            .map(|(name, child)| ChildClass {
                padded: format!(" {} ", name),
                view: child,
            })
            .collect();
        Some(Self { entries })
    }
}

/// The recursive rewrite. Always returns a fresh node; the input tree is
/// shared and never touched.
fn attach_node(
    node: &Node,
    registry: &PartialRegistry,
    partials: Option<&Rc<PartialMap>>,
    classes: Option<&ChildClassIndex>,
    is_root: bool,
) -> Node {
    match node {
        Node::Text(_)
        | Node::Interpolator(_)
        | Node::RawInterpolator(_)
        | Node::Comment(_)
        | Node::Widget(_) => node.clone(),

        Node::Fragment(items) => Node::Fragment(
            items
                .iter()
                .map(|child| attach_node(child, registry, partials, classes, false))
                .collect(),
        ),

        Node::Section {
            key,
            inverted,
            body,
        } => Node::Section {
            key: key.clone(),
            inverted: *inverted,
            body: attach_children(body, registry, partials, classes),
        },

        Node::Element(element) => {
            if !is_root {
                if let (Some(index), Some(class_attr)) =
                    (classes, element.attributes.get("class"))
                {
                    let padded = format!(" {} ", static_class_text(class_attr));
                    for entry in &index.entries {
                        if padded.contains(&entry.padded) {
                            // The child view renders exactly the markup found
                            // here, so the original subtree is captured as its
                            // template. First declared match wins.
                            return Node::Widget(WidgetBinding {
                                child: Rc::clone(&entry.view),
                                template: Template {
                                    node: Rc::new(Node::Element(element.clone())),
                                    partials: partials.cloned(),
                                    view: None,
                                },
                            });
                        }
                    }
                }
            }
            Node::Element(ElementNode {
                tag: element.tag.clone(),
                attributes: element.attributes.clone(),
                dynamic_attributes: element.dynamic_attributes.clone(),
                children: attach_children(&element.children, registry, partials, classes),
            })
        }

        Node::Partial(key) => {
            let name = key.resolve();
            if name.starts_with(DYNAMIC_PREFIX) {
                // Resolution happens at render time; nothing to attach yet.
                return node.clone();
            }
            let resolved = match partials {
                Some(map) => map.get(name.as_ref()).cloned(),
                None => registry.get(&name),
            };
            match resolved {
                Some(partial) => {
                    let next_partials = partial.partials_ref().or(partials);
                    // Recursing rebuilds a copy of the resolved tree, so
                    // the shared partial template used elsewhere stays as
                    // it was.
                    attach_node(partial.node(), registry, next_partials, classes, false)
                }
                None => {
                    log::warn!("no partial registered with the name {}", name);
                    Node::Fragment(Vec::new())
                }
            }
        }
    }
}

fn attach_children(
    children: &[Node],
    registry: &PartialRegistry,
    partials: Option<&Rc<PartialMap>>,
    classes: Option<&ChildClassIndex>,
) -> Vec<Node> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        let attached = attach_node(child, registry, partials, classes, false);
        match (child, attached) {
            // An expanded partial may bring several siblings; splice them
            // so the child list stays flat.
            (Node::Partial(_), Node::Fragment(items)) => out.extend(items),
            (_, attached) => out.push(attached),
        }
    }
    out
}

/// Only the static fragments of a class attribute can be matched against
/// the compile-time child registry; dynamic tokens are skipped.
fn static_class_text(attr: &AttrValue) -> String {
    match attr {
        AttrValue::Static(text) => text.clone(),
        AttrValue::Templated(fragments) => {
            let parts: Vec<&str> = fragments
                .iter()
                .filter_map(|node| match node {
                    Node::Text(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect();
            parts.join(" ")
        }
    }
}

/// Whitespace around the template commonly comes from the surrounding
/// markup rather than the template itself; trim a single leading and/or
/// trailing whitespace-only text node off the live element when the counts
/// disagree.
fn reconcile_mount(template_children: &[Node], mount: &Rc<RefCell<DomElement>>) {
    let mut element = mount.borrow_mut();
    if template_children.len() == element.children.len() {
        return;
    }

    let leading_is_ws = matches!(
        element.children.first(),
        Some(DomNode::Text(text)) if text.trim().is_empty()
    );
    if leading_is_ws && !matches!(template_children.first(), Some(Node::Text(_))) {
        element.children.remove(0);
    }

    let trailing_is_ws = matches!(
        element.children.last(),
        Some(DomNode::Text(text)) if text.trim().is_empty()
    );
    if trailing_is_ws && !matches!(template_children.last(), Some(Node::Text(_))) {
        element.children.pop();
    }

    if template_children.len() != element.children.len() {
        log::info!("mounted DOM does not match the attached template; the tree may be inconsistent until the next full render");
    }
}
