//! Scope normalization.
//!
//! A recognized scope compiles to one replacement edit: the object literal
//! becomes `{ query: "...", token: "..." }` with the expanded query and a
//! freshly signed token, in that fixed order. Whatever the source object
//! carried, including a token pair in any position, never survives.

use crate::edit::SpanEdit;
use crate::sign::Signer;
use crate::transform::errors::TransformError;
use crate::transform::resolver;
use crate::transform::scanner::{ObjectShape, QueryValue};
use crate::transform::session::SymbolTable;
use crate::ts::quote_ts_string;

pub(crate) fn rewrite_scope(
    scope_name: &str,
    object: &ObjectShape,
    signer: &Signer,
    symbols: &SymbolTable,
    source: &str,
) -> Result<SpanEdit, TransformError> {
    let segments = match &object.query {
        Some(QueryValue::Segments(segments)) => segments,
        Some(QueryValue::NotLiteral { kind }) => {
            return Err(TransformError::QueryNotLiteral {
                scope: scope_name.to_string(),
                found: kind.clone(),
            })
        }
        None => {
            return Err(TransformError::MissingQueryField {
                scope: scope_name.to_string(),
            })
        }
    };

    let query = resolver::resolve_segments(segments, symbols)?;
    let token = signer.sign(&query)?;
    let replacement = format!(
        "{{ query: {}, token: {} }}",
        quote_ts_string(&query),
        quote_ts_string(&token)
    );

    Ok(SpanEdit::replace(
        object.span.start,
        object.span.end,
        replacement,
        &source[object.span.start..object.span.end],
    ))
}
