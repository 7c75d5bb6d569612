use std::fmt;
use std::rc::Rc;

/// Capability interface implemented by host data objects.
///
/// The rendering core is agnostic to the shape of the model layer; anything
/// that can answer field lookups can sit behind a [`Value::Object`]. Model
/// libraries implement this trait once and their objects flow through the
/// context chain untouched.
pub trait HostObject {
    /// Resolves a single field of this object. `None` means absent.
    fn field(&self, key: &str) -> Option<Value>;

    /// Marks this object as a model for last-model tracking (debug tooling).
    fn is_model(&self) -> bool {
        false
    }

    /// Marks this object as an ordered collection, making sections over it
    /// behave as loops.
    fn is_collection(&self) -> bool {
        false
    }

    /// The explicit items list of a collection. Substituted as the section
    /// value when present, so wrappers that aren't directly iterable can
    /// still drive loops.
    fn items(&self) -> Option<Vec<Value>> {
        None
    }

    /// An implicit enclosing scope for this object, used when a context
    /// chain is built from a detached value. Model libraries that track
    /// ownership (a model knowing its collection) hook in here.
    fn enclosing(&self) -> Option<Value> {
        None
    }

    /// String form used when this object is interpolated directly.
    fn display(&self) -> String {
        String::new()
    }
}

/// A single host data value, cheap to clone.
///
/// Composite variants are reference counted so pushing values onto scopes
/// and memoizing lookups never copies the underlying data.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    List(Rc<Vec<Value>>),
    Object(Rc<dyn HostObject>),
    Lambda(Rc<dyn Fn(&Value) -> Value>),
}

impl Value {
    /// General truthiness: empty strings and lists, zero, NaN and `Null`
    /// are falsy; objects and lambdas are always truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Object(_) | Self::Lambda(_) => true,
        }
    }

    /// String coercion used by interpolators and attribute assembly.
    pub fn display(&self) -> String {
        match self {
            Self::Null | Self::Lambda(_) => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::Str(s) => s.to_string(),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(Self::display).collect();
                parts.join(",")
            }
            Self::Object(host) => host.display(),
        }
    }
}

/// Integral numbers render without a trailing `.0`.
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "fract() == 0 and magnitude checked above"
        )]
        return format!("{}", n as i64);
    }
    n.to_string()
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Self::List(items) => f.debug_list().entries(items.iter()).finish(),
            Self::Object(host) => write!(f, "Object({})", host.display()),
            Self::Lambda(_) => f.write_str("Lambda"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            // Reference identity; host objects carry no general equality.
            (Self::Object(a), Self::Object(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            (Self::Lambda(a), Self::Lambda(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(Rc::from(value.as_str()))
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(Rc::new(value))
    }
}

/// Host adaptor over plain JSON data.
///
/// JSON objects become [`HostObject`]s, arrays become lists, and everything
/// else maps onto the matching scalar variant. This is the adaptor used when
/// no richer model library is wired in.
pub struct JsonModel {
    fields: serde_json::Map<String, serde_json::Value>,
}

impl JsonModel {
    pub fn new(fields: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { fields }
    }
}

impl HostObject for JsonModel {
    fn field(&self, key: &str) -> Option<Value> {
        self.fields.get(key).map(Value::from)
    }

    fn display(&self) -> String {
        serde_json::Value::Object(self.fields.clone()).to_string()
    }
}

impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::Str(Rc::from(s.as_str())),
            serde_json::Value::Array(items) => {
                Self::List(Rc::new(items.iter().map(Self::from).collect()))
            }
            serde_json::Value::Object(map) => Self::Object(Rc::new(JsonModel::new(map.clone()))),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Self::from(&value)
    }
}
