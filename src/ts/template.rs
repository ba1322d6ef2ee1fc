//! Segmentation of TypeScript string and template literals.
//!
//! Part values and scope queries arrive as `string` or `template_string`
//! nodes. This module splits them into literal text and `${name}` references,
//! decoding escape sequences so downstream consumers see runtime string
//! values, and re-escapes values for emission.

use ast_grep_core::tree_sitter::StrDoc;
use ast_grep_core::Node;
use ast_grep_language::SupportLang;

pub(crate) type TsNode<'r> = Node<'r, StrDoc<SupportLang>>;

/// One piece of a string or template literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text with escape sequences decoded
    Literal(String),
    /// A `${name}` interpolation referencing a declared fragment
    Reference(String),
}

/// Split a `string` or `template_string` node into segments.
///
/// Returns None for any other node kind. Plain strings produce at most one
/// literal segment; templates alternate literals and references.
pub(crate) fn literal_segments(node: &TsNode<'_>, source: &str) -> Option<Vec<Segment>> {
    let kind = node.kind();
    match &*kind {
        "string" | "template_string" => Some(collect_segments(node, source)),
        _ => None,
    }
}

fn collect_segments(node: &TsNode<'_>, source: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut buffer = String::new();

    let mut children = node.children().filter(|child| child.is_named()).peekable();
    while let Some(child) = children.next() {
        let range = child.range();
        let text = &source[range.start..range.end];
        let kind = child.kind();
        match &*kind {
            "string_fragment" => buffer.push_str(text),
            "escape_sequence" => match paired_surrogate(text, children.peek(), source) {
                Some(c) => {
                    buffer.push(c);
                    children.next();
                }
                None => buffer.push_str(&decode_escape(text)),
            },
            "template_substitution" => {
                if !buffer.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut buffer)));
                }
                segments.push(Segment::Reference(substitution_name(&child, source)));
            }
            _ => {}
        }
    }

    if !buffer.is_empty() {
        segments.push(Segment::Literal(buffer));
    }

    segments
}

/// Two adjacent unicode escapes forming a surrogate pair denote one
/// supplementary character in JavaScript; decode them together. Anything
/// else, including a genuinely lone surrogate, is left to `decode_escape`.
fn paired_surrogate(text: &str, next: Option<&TsNode<'_>>, source: &str) -> Option<char> {
    let high = unicode_escape_unit(text).filter(|unit| (0xD800..0xDC00).contains(unit))?;
    let next = next?;
    if next.kind() != "escape_sequence" {
        return None;
    }
    let range = next.range();
    let low = unicode_escape_unit(&source[range.start..range.end])
        .filter(|unit| (0xDC00..0xE000).contains(unit))?;
    char::from_u32(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00))
}

/// Parse a `\uXXXX` or `\u{...}` escape to its code unit value.
fn unicode_escape_unit(escape: &str) -> Option<u32> {
    let rest = escape.strip_prefix("\\u")?;
    let hex = match rest.strip_prefix('{') {
        Some(braced) => braced.strip_suffix('}')?,
        None => rest,
    };
    u32::from_str_radix(hex, 16).ok()
}

/// The referenced name inside `${...}`.
///
/// Non-identifier expressions keep their source text; lookup will fail on
/// them with the text as the reported name.
fn substitution_name(node: &TsNode<'_>, source: &str) -> String {
    node.children()
        .find(|child| child.is_named())
        .map(|expr| {
            let range = expr.range();
            source[range.start..range.end].trim().to_string()
        })
        .unwrap_or_default()
}

/// Decode one JavaScript escape sequence to its runtime value.
///
/// Unknown or malformed sequences are kept verbatim; the host parser already
/// rejected anything truly invalid.
fn decode_escape(escape: &str) -> String {
    let mut chars = escape.chars();
    if chars.next() != Some('\\') {
        return escape.to_string();
    }
    let Some(marker) = chars.next() else {
        return String::new();
    };

    match marker {
        'n' => "\n".to_string(),
        't' => "\t".to_string(),
        'r' => "\r".to_string(),
        'b' => "\u{0008}".to_string(),
        'f' => "\u{000C}".to_string(),
        'v' => "\u{000B}".to_string(),
        '0' => "\0".to_string(),
        // Line continuation: backslash before a line terminator
        '\n' | '\r' | '\u{2028}' | '\u{2029}' => String::new(),
        'x' | 'u' => {
            let rest: String = chars.collect();
            let hex = rest.strip_prefix('{').and_then(|r| r.strip_suffix('}')).unwrap_or(&rest);
            u32::from_str_radix(hex, 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| escape.to_string())
        }
        other => other.to_string(),
    }
}

/// Render a value as a double-quoted TypeScript string literal.
pub fn quote_ts_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
