mod ast;
mod context;
mod decode;
mod dom;
mod error;
mod markup;
mod registry;
mod render;
mod template;
mod value;
mod view;
mod vtree;

// Public exports.
pub use ast::{AttrValue, ElementNode, KeyRef, Node, WidgetBinding};
pub use context::{is_list, parse_value, ParsedValue, Scope};
pub use decode::template as decode_template;
pub use dom::{from_vnodes as vtree_to_dom, to_html as dom_to_html, DomElement, DomNode};
pub use error::{DecodeError, DecodeErrorKind, TemplateResult};
pub use registry::{DynamicResolver, PartialMap, PartialRegistry};
pub use template::Template;
pub use value::{HostObject, JsonModel, Value};
pub use view::{BoundWidget, View};
pub use vtree::{to_html as vtree_to_html, Properties, PropertyValue, VElement, VNode};
