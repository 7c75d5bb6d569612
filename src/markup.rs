//! A small, lenient HTML reader and writer.
//!
//! Unescaped interpolations can resolve to markup text; this module turns
//! that text back into tree nodes the way `innerHTML` would, without being
//! a validating parser. It also supplies the attribute-pair grammar used to
//! reassemble loose attribute templates, entity decoding, and the escaping
//! used by the serializers.

use crate::vtree::{Properties, VElement, VNode};

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub(crate) fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS
        .iter()
        .any(|void| tag.eq_ignore_ascii_case(void))
}

/// Escapes text for both element content and double-quoted attributes.
pub(crate) fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

/// Decodes the common named entities and numeric character references.
/// Anything unrecognized stays literal.
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(at) = rest.find('&') {
        out.push_str(&rest[..at]);
        rest = &rest[at..];
        let semicolon = rest[1..].find(';').map(|i| i + 1);
        if let Some(end) = semicolon {
            if let Some(decoded) = decode_entity(&rest[1..end]) {
                out.push(decoded);
                rest = &rest[end + 1..];
                continue;
            }
        }
        out.push('&');
        rest = &rest[1..];
    }
    out.push_str(rest);
    out
}

fn decode_entity(body: &str) -> Option<char> {
    match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = body.strip_prefix('#')?;
            let code = if let Some(hex) = number.strip_prefix(['x', 'X']) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                number.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

/// Parses markup text into tree nodes, `innerHTML`-style: unknown
/// constructs fall back to literal text, stray close tags are dropped, and
/// unclosed elements run to the end of input.
pub(crate) fn parse_fragment(input: &str) -> Vec<VNode> {
    let mut parser = Parser { input, pos: 0 };
    parser.parse_nodes(None)
}

/// Parses loose `name="value"` pairs produced by rendering dynamic
/// attribute templates. Bare names become empty-valued attributes.
pub(crate) fn parse_attribute_pairs(input: &str) -> Vec<(String, String)> {
    let mut parser = Parser { input, pos: 0 };
    parser.parse_attributes(false)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn consume(&mut self, s: &str) -> bool {
        if self.peek(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    /// Advances past one char, whatever it is.
    fn bump(&mut self) {
        if let Some(ch) = self.rest().chars().next() {
            self.pos += ch.len_utf8();
        }
    }

    fn take_while<F: Fn(char) -> bool>(&mut self, pred: F) -> &'a str {
        let start = self.pos;
        while let Some(ch) = self.rest().chars().next() {
            if !pred(ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }
        &self.input[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    /// Consumes up to (not including) `stop`, or the rest of the input.
    fn take_until(&mut self, stop: &str) -> &'a str {
        let start = self.pos;
        match self.rest().find(stop) {
            Some(at) => {
                self.pos += at;
                &self.input[start..self.pos]
            }
            None => {
                self.pos = self.input.len();
                &self.input[start..]
            }
        }
    }

    fn parse_nodes(&mut self, parent: Option<&str>) -> Vec<VNode> {
        let mut nodes = Vec::new();
        while !self.eof() {
            if self.consume("<!--") {
                let text = self.take_until("-->").to_string();
                self.consume("-->");
                nodes.push(VNode::Comment(text));
            } else if self.peek("</") {
                self.pos += 2;
                let name = self.take_while(is_name_char);
                self.take_until(">");
                self.consume(">");
                if parent.is_some_and(|open| name.eq_ignore_ascii_case(open)) {
                    return nodes;
                }
                // Stray close tag, dropped.
            } else if self.at_open_tag() {
                self.bump();
                let tag = self.take_while(is_name_char).to_string();
                let attrs = self.parse_attributes(true);
                let self_closing = self.consume("/>");
                if !self_closing {
                    self.consume(">");
                }
                let mut properties = Properties::default();
                for (name, value) in attrs {
                    properties.set_attribute(&name, value);
                }
                let children = if self_closing || is_void_element(&tag) {
                    Vec::new()
                } else {
                    self.parse_nodes(Some(&tag))
                };
                nodes.push(VNode::Element(VElement {
                    tag,
                    properties,
                    children,
                }));
            } else {
                let start = self.pos;
                // A lone '<' that opens nothing is literal text.
                self.bump();
                while !self.eof() && !self.peek("<") {
                    self.bump();
                }
                nodes.push(VNode::Text(decode_entities(&self.input[start..self.pos])));
            }
        }
        nodes
    }

    fn at_open_tag(&self) -> bool {
        let mut chars = self.rest().chars();
        chars.next() == Some('<') && chars.next().is_some_and(|ch| ch.is_ascii_alphabetic())
    }

    /// The attribute grammar shared by open tags and loose attribute text.
    /// When `in_tag` is set, `>` and `/>` terminate the scan.
    fn parse_attributes(&mut self, in_tag: bool) -> Vec<(String, String)> {
        let mut attrs = Vec::new();
        loop {
            self.skip_whitespace();
            if self.eof() || (in_tag && (self.peek(">") || self.peek("/>"))) {
                break;
            }
            let name = self.take_while(|ch| {
                !ch.is_whitespace() && !matches!(ch, '=' | '>' | '/' | '"' | '\'')
            });
            if name.is_empty() {
                // Garbage char; skip it rather than stalling.
                self.bump();
                continue;
            }
            let name = name.to_string();
            self.skip_whitespace();
            let value = if self.consume("=") {
                self.skip_whitespace();
                if self.consume("\"") {
                    let raw = self.take_until("\"");
                    let value = decode_entities(raw);
                    self.consume("\"");
                    value
                } else if self.consume("'") {
                    let raw = self.take_until("'");
                    let value = decode_entities(raw);
                    self.consume("'");
                    value
                } else {
                    let raw = self.take_while(|ch| !ch.is_whitespace() && ch != '>');
                    decode_entities(raw)
                }
            } else {
                String::new()
            };
            attrs.push((name, value));
        }
        attrs
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ':')
}
