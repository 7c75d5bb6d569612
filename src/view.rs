use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::context::Scope;
use crate::dom::DomElement;
use crate::registry::PartialRegistry;
use crate::template::Template;
use crate::vtree::VNode;

/// The seam to the component layer.
///
/// The renderer never instantiates views; it only needs to know where a
/// view is mounted, whether it nests inside another view, and which nested
/// views it declares. Everything else about the component lifecycle stays
/// on the other side of this trait.
pub trait View {
    /// Tag name of the element this view is mounted on.
    fn tag_name(&self) -> &str;

    /// Whether this view nests inside another view. Only the outermost
    /// view gets a synthetic root wrapper during attachment.
    fn has_parent(&self) -> bool {
        false
    }

    /// Declared nested views, keyed by the class-name marker that locates
    /// them in the template. Order decides match precedence.
    fn child_views(&self) -> Vec<(String, Rc<dyn View>)> {
        Vec::new()
    }

    /// The live element this view is mounted on, when one exists. Used to
    /// reconcile stray whitespace nodes during attachment.
    fn mount(&self) -> Option<Rc<RefCell<DomElement>>> {
        None
    }
}

/// A widget bound into a rendered virtual tree: the designated child view,
/// the subtree template it renders, and the scope it was bound under.
///
/// Binding happens only when rendering inside an owning view; materializing
/// the widget hands the subtree to the child view's own render cycle.
#[derive(Clone)]
pub struct BoundWidget {
    child: Rc<dyn View>,
    template: Template,
    scope: Rc<Scope>,
    first_render: bool,
}

impl BoundWidget {
    pub(crate) fn new(
        child: Rc<dyn View>,
        template: Template,
        scope: Rc<Scope>,
        first_render: bool,
    ) -> Self {
        Self {
            child,
            template,
            scope,
            first_render,
        }
    }

    pub fn child(&self) -> &Rc<dyn View> {
        &self.child
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn scope(&self) -> &Rc<Scope> {
        &self.scope
    }

    /// Renders the captured subtree with the child view as owner, so
    /// widgets nested further down bind to it in turn.
    pub fn to_vnodes(&self, registry: &PartialRegistry) -> Vec<VNode> {
        self.template
            .render_in_scope(
                &self.scope,
                registry,
                Some(&self.child),
                self.first_render,
            )
            .into_vnodes()
    }
}

impl fmt::Debug for BoundWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundWidget")
            .field("child", &self.child.tag_name())
            .field("first_render", &self.first_render)
            .finish()
    }
}

impl PartialEq for BoundWidget {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.child), Rc::as_ptr(&other.child))
            && self.template.node() == other.template.node()
            && Rc::ptr_eq(&self.scope, &other.scope)
    }
}
