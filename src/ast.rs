use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::template::Template;
use crate::view::View;

/// Prefix on a partial name marking it for resolution at render time.
pub(crate) const DYNAMIC_PREFIX: &str = "dyn_";

/// One compiled template node.
///
/// Trees of these are produced by an external compiler (see the `decode`
/// module for the wire format) and interpreted by the renderer. The enum is
/// closed: every renderable construct has exactly one variant, and a node
/// carries only the fields its variant needs.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// A raw run of text. Terminal.
    Text(String),
    /// A DOM element with attributes and children.
    Element(ElementNode),
    /// `{{name}}` - an escaped interpolation.
    Interpolator(KeyRef),
    /// `{{{name}}}` - an unescaped interpolation whose value may contain
    /// markup to be parsed back into the tree.
    RawInterpolator(KeyRef),
    /// `{{#name}}...{{/name}}` or, inverted, `{{^name}}...{{/name}}`.
    Section {
        key: KeyRef,
        inverted: bool,
        body: Vec<Node>,
    },
    /// `{{> name}}` - a named template fragment. Names starting with `dyn_`
    /// are resolved through the dynamic resolver at render time.
    Partial(KeyRef),
    /// `<!-- ... -->` with interpolatable content.
    Comment(Vec<Node>),
    /// An ordered sequence of sibling nodes.
    Fragment(Vec<Node>),
    /// Synthesized by the view-attachment pass, never by the compiler:
    /// binds a child view to the subtree found at this position.
    Widget(WidgetBinding),
}

/// An element node: tag, static attributes, loose attribute templates that
/// only resolve to `name="value"` text at render time, and children.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ElementNode {
    pub tag: String,
    pub attributes: IndexMap<String, AttrValue>,
    pub dynamic_attributes: Vec<Node>,
    pub children: Vec<Node>,
}

/// An attribute value, either fully static or a sequence of fragments to
/// render and concatenate.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Static(String),
    Templated(Vec<Node>),
}

/// A key expression for interpolators, sections and partials.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyRef {
    /// A literal dotted or plain name.
    Literal(String),
    /// A name with `_0`, `_1`, ... placeholders substituted from `refs`.
    Expression { source: String, refs: Vec<String> },
}

impl KeyRef {
    pub fn literal<S: Into<String>>(name: S) -> Self {
        Self::Literal(name.into())
    }

    /// The key to look up in the context chain. Placeholders are replaced
    /// highest-index first so `_10` is never clobbered by `_1`.
    pub fn resolve(&self) -> Cow<'_, str> {
        match self {
            Self::Literal(name) => Cow::Borrowed(name),
            Self::Expression { source, refs } => {
                let mut key = source.clone();
                for (i, reference) in refs.iter().enumerate().rev() {
                    key = key.replace(&format!("_{}", i), reference);
                }
                Cow::Owned(key)
            }
        }
    }
}

/// The payload of a [`Node::Widget`]: which child view renders, and the
/// subtree template it renders with.
#[derive(Clone)]
pub struct WidgetBinding {
    pub child: Rc<dyn View>,
    pub template: Template,
}

impl fmt::Debug for WidgetBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetBinding")
            .field("child", &self.child.tag_name())
            .field("template", self.template.node())
            .finish()
    }
}

impl PartialEq for WidgetBinding {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.child), Rc::as_ptr(&other.child))
            && self.template.node() == other.template.node()
    }
}
