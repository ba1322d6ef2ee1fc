//! Declaration scanning over the TypeScript syntax tree.
//!
//! A depth-first walk visits every `const` declaration; an explicit state
//! machine classifies each declarator's children in order and dispatches
//! recognized parts and scopes. Everything else is left untouched and the
//! walk descends into children, so nested declarations are still found.

use crate::edit::SpanEdit;
use crate::sign::{Signer, SigningMode};
use crate::transform::errors::TransformError;
use crate::transform::resolver;
use crate::transform::rewriter;
use crate::transform::session::{Session, SymbolTable};
use crate::ts::template::{literal_segments, TsNode};
use crate::ts::{Dialect, Segment};
use ast_grep_core::tree_sitter::StrDoc;
use ast_grep_core::AstGrep;
use ast_grep_language::SupportLang;
use std::ops::Range;

/// Type annotation names that make a declarator ours.
const PART_TYPE: &str = "QueryScopePart";
const SCOPE_TYPE: &str = "QueryScope";

/// Declarator classification from the type annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclTag {
    Part,
    Scope,
}

/// Recognition state while walking one declarator's named children in order.
///
/// Any child that doesn't fit the expected shape abandons the walk and the
/// declarator stays untouched.
#[derive(Debug)]
enum DeclState {
    /// Nothing seen yet
    Start,
    /// The bound identifier is known
    Named { pending: String },
    /// The type annotation named one of ours
    Matched { pending: String, tag: DeclTag },
}

/// A declarator the pass acts on.
#[derive(Debug)]
enum Recognized {
    Part { name: String, segments: Vec<Segment> },
    Scope { name: String, object: ObjectShape },
}

/// Owned view of a scope object literal.
#[derive(Debug)]
pub(crate) struct ObjectShape {
    pub(crate) span: Range<usize>,
    pub(crate) query: Option<QueryValue>,
}

/// The `query` pair's value as found in the source.
#[derive(Debug)]
pub(crate) enum QueryValue {
    Segments(Vec<Segment>),
    NotLiteral { kind: String },
}

/// Scan counters, reported per compilation unit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub parts_removed: usize,
    pub scopes_signed: usize,
}

pub(crate) struct ScanReport {
    pub(crate) edits: Vec<SpanEdit>,
    pub(crate) stats: ScanStats,
}

impl ScanReport {
    fn empty() -> Self {
        Self {
            edits: Vec::new(),
            stats: ScanStats::default(),
        }
    }
}

/// Walk the tree, resolving parts and rewriting scopes.
///
/// The signing gate is checked once here; a disabled session produces no
/// edits and records no fragments.
pub(crate) fn scan(
    source: &str,
    dialect: Dialect,
    session: &mut Session,
) -> Result<ScanReport, TransformError> {
    let Session { symbols, mode } = session;
    let signer = match mode {
        SigningMode::Enabled(signer) => signer,
        SigningMode::Disabled => return Ok(ScanReport::empty()),
    };

    let sg: AstGrep<StrDoc<SupportLang>> = AstGrep::new(source, dialect.lang());
    let root = sg.root();

    let mut edits = Vec::new();
    let mut stats = ScanStats::default();
    let mut claimed: Vec<Range<usize>> = Vec::new();

    for node in root.dfs() {
        if node.kind() != "lexical_declaration" {
            continue;
        }
        // A declaration inside a span an earlier edit covers was already
        // consumed by that rewrite
        let range = node.range();
        if claimed
            .iter()
            .any(|span| span.start <= range.start && range.end <= span.end)
        {
            continue;
        }

        let before = edits.len();
        process_statement(&node, source, signer, symbols, &mut edits, &mut stats)?;
        claimed.extend(
            edits[before..]
                .iter()
                .map(|edit| edit.byte_start..edit.byte_end),
        );
    }

    Ok(ScanReport { edits, stats })
}

fn process_statement(
    statement: &TsNode<'_>,
    source: &str,
    signer: &Signer,
    symbols: &mut SymbolTable,
    edits: &mut Vec<SpanEdit>,
    stats: &mut ScanStats,
) -> Result<(), TransformError> {
    // Only immutable bindings participate; let and var never do
    if !is_const(statement, source) {
        return Ok(());
    }

    let declarators: Vec<TsNode<'_>> = statement
        .children()
        .filter(|child| child.kind() == "variable_declarator")
        .collect();
    let declarator_count = declarators.len();
    let mut part_spans: Vec<Range<usize>> = Vec::new();

    for declarator in declarators {
        match recognize(&declarator, source) {
            None => {}
            Some(Recognized::Part { name, segments }) => {
                resolver::resolve_part(&name, &segments, symbols)?;
                part_spans.push(declarator.range());
                stats.parts_removed += 1;
            }
            Some(Recognized::Scope { name, object }) => {
                edits.push(rewriter::rewrite_scope(&name, &object, signer, symbols, source)?);
                stats.scopes_signed += 1;
            }
        }
    }

    if part_spans.is_empty() {
        return Ok(());
    }

    if part_spans.len() == declarator_count {
        // The whole statement was parts; remove its line
        let span = statement_deletion_span(source, statement.range());
        edits.push(SpanEdit::delete(span.start, span.end, &source[span.start..span.end]));
    } else {
        // Mixed statement: remove only the part declarators
        for span in part_spans {
            let span = declarator_deletion_span(source, span);
            edits.push(SpanEdit::delete(span.start, span.end, &source[span.start..span.end]));
        }
    }

    Ok(())
}

fn is_const(statement: &TsNode<'_>, source: &str) -> bool {
    statement
        .field("kind")
        .map(|kind| node_text(&kind, source) == "const")
        .unwrap_or(false)
}

/// Run the recognition state machine over one declarator.
///
/// Returns None whenever the declarator is not a part or scope of ours; the
/// caller leaves such declarators untouched.
fn recognize(declarator: &TsNode<'_>, source: &str) -> Option<Recognized> {
    let mut state = DeclState::Start;

    for child in declarator.children() {
        if !child.is_named() {
            continue;
        }
        let kind = child.kind();
        // Comments are named extras and can sit between any two children;
        // they carry no structure
        if &*kind == "comment" {
            continue;
        }
        state = match (state, &*kind) {
            (DeclState::Start, "identifier") => DeclState::Named {
                pending: node_text(&child, source).to_string(),
            },
            (DeclState::Named { pending }, "type_annotation") => {
                match annotation_tag(&child, source) {
                    Some(tag) => DeclState::Matched { pending, tag },
                    None => return None,
                }
            }
            (
                DeclState::Matched {
                    pending,
                    tag: DeclTag::Part,
                },
                _,
            ) => {
                // Part initializers must be string or template literals
                let segments = literal_segments(&child, source)?;
                return Some(Recognized::Part {
                    name: pending,
                    segments,
                });
            }
            (
                DeclState::Matched {
                    pending,
                    tag: DeclTag::Scope,
                },
                "object",
            ) => {
                return Some(Recognized::Scope {
                    name: pending,
                    object: object_shape(&child, source),
                });
            }
            _ => return None,
        };
    }

    None
}

/// Classify a type annotation; anything but a bare recognized type
/// identifier resets recognition.
fn annotation_tag(annotation: &TsNode<'_>, source: &str) -> Option<DeclTag> {
    let inner = annotation
        .children()
        .find(|child| child.is_named() && child.kind() != "comment")?;
    if inner.kind() != "type_identifier" {
        return None;
    }
    match node_text(&inner, source) {
        PART_TYPE => Some(DeclTag::Part),
        SCOPE_TYPE => Some(DeclTag::Scope),
        _ => None,
    }
}

/// Extract the pairs the rewriter cares about from a scope object literal.
///
/// Only a plain `query:` key counts; a shorthand `{ query }` has no literal
/// value to expand and is reported as such. Duplicate keys keep the last
/// occurrence, matching runtime object semantics.
fn object_shape(object: &TsNode<'_>, source: &str) -> ObjectShape {
    let mut query = None;

    for child in object.children() {
        let kind = child.kind();
        match &*kind {
            "pair" => {
                let Some(key) = child.field("key") else {
                    continue;
                };
                if key.kind() != "property_identifier" || node_text(&key, source) != "query" {
                    continue;
                }
                query = Some(match child.field("value") {
                    Some(value) => match literal_segments(&value, source) {
                        Some(segments) => QueryValue::Segments(segments),
                        None => QueryValue::NotLiteral {
                            kind: value.kind().to_string(),
                        },
                    },
                    None => QueryValue::NotLiteral {
                        kind: "missing value".to_string(),
                    },
                });
            }
            "shorthand_property_identifier" => {
                if node_text(&child, source) == "query" {
                    query = Some(QueryValue::NotLiteral {
                        kind: kind.to_string(),
                    });
                }
            }
            _ => {}
        }
    }

    ObjectShape {
        span: object.range(),
        query,
    }
}

fn node_text<'s>(node: &TsNode<'_>, source: &'s str) -> &'s str {
    let range = node.range();
    &source[range.start..range.end]
}

/// Deletion span for a statement that vanishes entirely: eat the line's
/// leading indentation and the trailing newline when the statement owns its
/// line, so no blank line is left behind.
fn statement_deletion_span(source: &str, range: Range<usize>) -> Range<usize> {
    let bytes = source.as_bytes();

    let mut start = range.start;
    while start > 0 && matches!(bytes[start - 1], b' ' | b'\t') {
        start -= 1;
    }
    if start > 0 && bytes[start - 1] != b'\n' {
        // Something else shares the line; delete the statement alone
        return range;
    }

    let mut end = range.end;
    if bytes.get(end) == Some(&b'\r') && bytes.get(end + 1) == Some(&b'\n') {
        end += 2;
    } else if bytes.get(end) == Some(&b'\n') {
        end += 1;
    }

    start..end
}

/// Deletion span for one declarator in a statement that keeps others: eat
/// the following comma and one space when present, otherwise the preceding
/// comma.
fn declarator_deletion_span(source: &str, range: Range<usize>) -> Range<usize> {
    let bytes = source.as_bytes();

    let mut cursor = range.end;
    while cursor < bytes.len() && matches!(bytes[cursor], b' ' | b'\t') {
        cursor += 1;
    }
    if bytes.get(cursor) == Some(&b',') {
        let mut end = cursor + 1;
        if bytes.get(end) == Some(&b' ') {
            end += 1;
        }
        return range.start..end;
    }

    let mut start = range.start;
    while start > 0 && matches!(bytes[start - 1], b' ' | b'\t') {
        start -= 1;
    }
    if start > 0 && bytes[start - 1] == b',' {
        start -= 1;
    } else {
        start = range.start;
    }

    start..range.end
}
