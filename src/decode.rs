//! Decoding of the compiled template wire format.
//!
//! The external compiler emits template trees as JSON: plain strings are
//! text nodes, arrays are fragments, and objects carry a numeric `t`
//! discriminator plus the fields their node kind needs (`r`/`x` key
//! expressions, `f` children, `e` tag, `a` attributes, `m` loose attribute
//! templates, `n` section polarity, `c` comment content).

use indexmap::IndexMap;
use serde_json::Value as Json;

use crate::ast::{AttrValue, ElementNode, KeyRef, Node};
use crate::error::{DecodeError, DecodeErrorKind, TemplateResult};

/// Node type discriminators used on the wire.
mod wire {
    pub const INTERPOLATOR: u64 = 2;
    pub const TRIPLE: u64 = 3;
    pub const SECTION: u64 = 4;
    pub const ELEMENT: u64 = 7;
    pub const PARTIAL: u64 = 8;
    pub const COMMENT: u64 = 9;
    /// Value of the `n` field marking an inverted section.
    pub const SECTION_UNLESS: u64 = 51;
}

/// Decodes a whole compiled template document.
pub fn template(json: &Json) -> TemplateResult<Node> {
    decode_node(json, "$")
}

fn decode_node(json: &Json, path: &str) -> TemplateResult<Node> {
    match json {
        Json::String(text) => Ok(Node::Text(text.clone())),
        Json::Array(items) => {
            let mut children = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                children.push(decode_node(item, &format!("{}[{}]", path, i))?);
            }
            Ok(Node::Fragment(children))
        }
        Json::Object(map) => decode_tagged(map, path),
        Json::Null | Json::Bool(_) | Json::Number(_) => Err(DecodeError::new(
            path,
            DecodeErrorKind::UnexpectedType {
                field: "node",
                expected: "a string, array or object",
            },
        )),
    }
}

fn decode_tagged(map: &serde_json::Map<String, Json>, path: &str) -> TemplateResult<Node> {
    let t = map
        .get("t")
        .ok_or_else(|| DecodeError::new(path, DecodeErrorKind::MissingField { field: "t" }))?
        .as_u64()
        .ok_or_else(|| {
            DecodeError::new(
                path,
                DecodeErrorKind::UnexpectedType {
                    field: "t",
                    expected: "an integer",
                },
            )
        })?;

    match t {
        wire::INTERPOLATOR => Ok(Node::Interpolator(decode_key(map, path)?)),
        wire::TRIPLE => Ok(Node::RawInterpolator(decode_key(map, path)?)),
        wire::PARTIAL => Ok(Node::Partial(decode_key(map, path)?)),
        wire::SECTION => {
            let inverted = map.get("n").and_then(Json::as_u64) == Some(wire::SECTION_UNLESS);
            Ok(Node::Section {
                key: decode_key(map, path)?,
                inverted,
                body: decode_children(map.get("f"), &format!("{}.f", path))?,
            })
        }
        wire::COMMENT => Ok(Node::Comment(decode_children(
            map.get("c"),
            &format!("{}.c", path),
        )?)),
        wire::ELEMENT => decode_element(map, path),
        other => Err(DecodeError::new(
            path,
            DecodeErrorKind::UnknownNodeType { t: other },
        )),
    }
}

fn decode_element(map: &serde_json::Map<String, Json>, path: &str) -> TemplateResult<Node> {
    let tag = map
        .get("e")
        .ok_or_else(|| DecodeError::new(path, DecodeErrorKind::MissingField { field: "e" }))?
        .as_str()
        .ok_or_else(|| {
            DecodeError::new(
                path,
                DecodeErrorKind::UnexpectedType {
                    field: "e",
                    expected: "a string",
                },
            )
        })?;

    let mut attributes = IndexMap::new();
    if let Some(attrs) = map.get("a") {
        let attrs = attrs.as_object().ok_or_else(|| {
            DecodeError::new(
                path,
                DecodeErrorKind::UnexpectedType {
                    field: "a",
                    expected: "an object",
                },
            )
        })?;
        for (name, value) in attrs {
            let attr_path = format!("{}.a.{}", path, name);
            let decoded = match value {
                Json::String(text) => AttrValue::Static(text.clone()),
                Json::Null => AttrValue::Static(String::new()),
                // Scalar non-string values appear for boolean-ish attrs.
                Json::Bool(flag) => AttrValue::Static(flag.to_string()),
                Json::Number(number) => AttrValue::Static(number.to_string()),
                Json::Array(_) => {
                    AttrValue::Templated(decode_children(Some(value), &attr_path)?)
                }
                Json::Object(_) => {
                    AttrValue::Templated(vec![decode_node(value, &attr_path)?])
                }
            };
            attributes.insert(name.clone(), decoded);
        }
    }

    Ok(Node::Element(ElementNode {
        tag: tag.to_string(),
        attributes,
        dynamic_attributes: decode_children(map.get("m"), &format!("{}.m", path))?,
        children: decode_children(map.get("f"), &format!("{}.f", path))?,
    }))
}

/// `f`, `m` and `c` may be absent, a single node, or an array of nodes.
fn decode_children(field: Option<&Json>, path: &str) -> TemplateResult<Vec<Node>> {
    match field {
        None | Some(Json::Null) => Ok(Vec::new()),
        Some(json) => match decode_node(json, path)? {
            Node::Fragment(items) => Ok(items),
            single => Ok(vec![single]),
        },
    }
}

/// A key is either a literal reference `r` or an expression `x` whose `s`
/// source names its `r` references through `_0`, `_1`, ... placeholders.
fn decode_key(map: &serde_json::Map<String, Json>, path: &str) -> TemplateResult<KeyRef> {
    if let Some(x) = map.get("x") {
        let x = x.as_object().ok_or_else(|| {
            DecodeError::new(
                path,
                DecodeErrorKind::UnexpectedType {
                    field: "x",
                    expected: "an object",
                },
            )
        })?;
        let source = x.get("s").and_then(Json::as_str).ok_or_else(|| {
            DecodeError::new(
                path,
                DecodeErrorKind::UnexpectedType {
                    field: "x.s",
                    expected: "a string",
                },
            )
        })?;
        let mut refs = Vec::new();
        if let Some(items) = x.get("r").and_then(Json::as_array) {
            for (i, item) in items.iter().enumerate() {
                let reference = item.as_str().ok_or_else(|| {
                    DecodeError::new(
                        format!("{}.x.r[{}]", path, i),
                        DecodeErrorKind::UnexpectedType {
                            field: "x.r",
                            expected: "a string",
                        },
                    )
                })?;
                refs.push(reference.to_string());
            }
        }
        return Ok(KeyRef::Expression {
            source: source.to_string(),
            refs,
        });
    }

    match map.get("r") {
        Some(Json::String(name)) => Ok(KeyRef::Literal(name.clone())),
        Some(_) => Err(DecodeError::new(
            path,
            DecodeErrorKind::UnexpectedType {
                field: "r",
                expected: "a string",
            },
        )),
        None => Err(DecodeError::new(
            path,
            DecodeErrorKind::MissingField { field: "r" },
        )),
    }
}
