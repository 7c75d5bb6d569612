use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

/// A node in the scope chain used for variable resolution while rendering.
///
/// Each scope wraps one host value and an optional parent scope. Lookups
/// search the chain outward and memoize their result (hit or miss) on the
/// scope instance that ran them, so repeated lookups of the same name within
/// one render pass resolve the host object at most once per scope.
pub struct Scope {
    view: Value,
    parent: Option<Rc<Scope>>,
    cache: RefCell<HashMap<String, Option<Value>>>,
    last_model: Option<Value>,
}

impl Scope {
    /// Builds a root scope around a host value. If the value's host object
    /// knows its surroundings, the enclosing chain is synthesized first.
    pub fn new(view: Value) -> Rc<Self> {
        Self::with_parent(view, None)
    }

    fn with_parent(view: Value, parent: Option<Rc<Self>>) -> Rc<Self> {
        let parent = parent.or_else(|| match &view {
            Value::Object(host) => host.enclosing().map(Self::new),
            Value::Null
            | Value::Bool(_)
            | Value::Number(_)
            | Value::Str(_)
            | Value::List(_)
            | Value::Lambda(_) => None,
        });

        // Track the nearest model up the chain for the debug helpers.
        let last_model = match &view {
            Value::Object(host) if host.is_model() => Some(view.clone()),
            _ => parent.as_ref().and_then(|p| p.last_model.clone()),
        };

        let mut cache = HashMap::new();
        // The implicit iterator always resolves to the scope's own value.
        cache.insert(".".to_string(), Some(view.clone()));

        Rc::new(Self {
            view,
            parent,
            cache: RefCell::new(cache),
            last_model,
        })
    }

    /// Allocates a child scope with this one as its parent. Used once per
    /// section iteration and once per composite section value.
    pub fn push(self: &Rc<Self>, view: Value) -> Rc<Self> {
        Self::with_parent(view, Some(Rc::clone(self)))
    }

    pub fn view(&self) -> &Value {
        &self.view
    }

    pub fn parent(&self) -> Option<&Rc<Self>> {
        self.parent.as_ref()
    }

    /// The nearest scope value (this one included) that is a model.
    pub fn last_model(&self) -> Option<&Value> {
        self.last_model.as_ref()
    }

    /// Resolves `name` against this scope chain.
    ///
    /// Dotted names walk fields from this scope's view only; a missing
    /// intermediate resolves the whole expression to `None`. Undotted names
    /// search the chain outward until something non-null turns up. Either
    /// way the outcome is memoized here.
    ///
    /// Names starting with `!` are comment markers; they never resolve and
    /// never touch the cache, but `!w/...` names trigger the debug helpers
    /// in debug builds.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(rest) = name.strip_prefix('!') {
            if cfg!(debug_assertions) {
                self.debug_helper(rest);
            }
            return None;
        }

        if let Some(cached) = self.cache.borrow().get(name) {
            return cached.clone();
        }

        // A dot anywhere past the first character makes this a field walk.
        let dotted = name.find('.').is_some_and(|at| at > 0);
        let resolved = if dotted {
            let mut value = Some(self.view.clone());
            for part in name.split('.') {
                value = match value {
                    Some(current) => field_of(&current, part),
                    None => break,
                };
            }
            value
        } else {
            let mut scope = Some(self);
            let mut found = None;
            while let Some(current) = scope {
                // A null field is a miss here: the search keeps going up.
                found = field_of(&current.view, name)
                    .filter(|value| !matches!(value, Value::Null));
                if found.is_some() {
                    break;
                }
                scope = current.parent.as_deref();
            }
            found
        };

        // Null is indistinguishable from absent once rendered; collapse it
        // so the cache holds a single kind of miss.
        let resolved = resolved.filter(|value| !matches!(value, Value::Null));
        self.cache
            .borrow_mut()
            .insert(name.to_string(), resolved.clone());
        resolved
    }

    /// `!w/context`, `!w/lastModel` and `!w/debug/<names...>` log resolution
    /// state while templates are being debugged.
    fn debug_helper(&self, rest: &str) {
        let mut parts = rest.split('/');
        if parts.next() != Some("w") {
            return;
        }
        match parts.next() {
            Some("context") => log::debug!("context: {:?}", self.view),
            Some("lastModel") => log::debug!("last model: {:?}", self.last_model),
            Some("debug") => {
                for name in parts {
                    log::debug!("{} => {:?}", name, self.lookup(name));
                }
            }
            Some(_) | None => {}
        }
    }
}

/// Resolves one field of a host value. Only objects and lists have fields;
/// lists are indexed numerically.
fn field_of(value: &Value, key: &str) -> Option<Value> {
    match value {
        Value::Object(host) => host.field(key),
        Value::List(items) => key.parse::<usize>().ok().and_then(|i| items.get(i).cloned()),
        Value::Null
        | Value::Bool(_)
        | Value::Number(_)
        | Value::Str(_)
        | Value::Lambda(_) => None,
    }
}

/// True for native lists and for host objects with the collection marker.
pub fn is_list(value: &Value) -> bool {
    match value {
        Value::List(_) => true,
        Value::Object(host) => host.is_collection(),
        Value::Null
        | Value::Bool(_)
        | Value::Number(_)
        | Value::Str(_)
        | Value::Lambda(_) => false,
    }
}

/// A section value normalized for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedValue {
    pub value: Value,
    pub is_list: bool,
    pub is_truthy: bool,
}

/// Normalizes a lookup result for section dispatch. Collection objects are
/// substituted by their explicit items list; truthiness for sequences is
/// "non-empty".
pub fn parse_value(value: Option<Value>) -> ParsedValue {
    let value = value.unwrap_or(Value::Null);
    let items = match &value {
        Value::Object(host) if host.is_collection() => {
            Some(Value::from(host.items().unwrap_or_default()))
        }
        _ => None,
    };
    let value = items.unwrap_or(value);
    let is_list = is_list(&value);
    let is_truthy = value.is_truthy();
    ParsedValue {
        value,
        is_list,
        is_truthy,
    }
}
