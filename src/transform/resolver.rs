//! Fragment expansion in declaration order.

use crate::transform::errors::TransformError;
use crate::transform::session::SymbolTable;
use crate::ts::Segment;

/// Expand segments against already-defined fragments.
///
/// References resolve strictly against earlier declarations. A miss reports
/// the closest defined name when one is plausible; forward references are
/// misses like any other.
pub fn resolve_segments(
    segments: &[Segment],
    symbols: &SymbolTable,
) -> Result<String, TransformError> {
    let mut buffer = String::new();
    for segment in segments {
        match segment {
            Segment::Literal(text) => buffer.push_str(text),
            Segment::Reference(name) => match symbols.lookup(name) {
                Some(fragment) => buffer.push_str(&fragment.value),
                None => {
                    return Err(TransformError::UnresolvedReference {
                        name: name.clone(),
                        suggestion: symbols.closest(name),
                    })
                }
            },
        }
    }
    Ok(buffer)
}

/// Resolve a part declaration and record it.
///
/// The duplicate check runs before resolution, so a re-declared name reports
/// as a duplicate even when its body would also fail to resolve. A part
/// referencing itself fails the lookup: its name is not defined yet.
pub fn resolve_part(
    name: &str,
    segments: &[Segment],
    symbols: &mut SymbolTable,
) -> Result<(), TransformError> {
    if symbols.contains(name) {
        return Err(TransformError::DuplicatePart {
            name: name.to_string(),
        });
    }
    let value = resolve_segments(segments, symbols)?;
    symbols.define(name, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(text: &str) -> Segment {
        Segment::Literal(text.to_string())
    }

    fn reference(name: &str) -> Segment {
        Segment::Reference(name.to_string())
    }

    #[test]
    fn literals_concatenate() {
        let symbols = SymbolTable::default();
        let value = resolve_segments(&[literal("a"), literal("b")], &symbols).unwrap();
        assert_eq!(value, "ab");
    }

    #[test]
    fn references_expand_to_recorded_values() {
        let mut symbols = SymbolTable::default();
        symbols.define("two", "  2".to_string()).unwrap();

        let value =
            resolve_segments(&[reference("two"), literal("\n  3")], &symbols).unwrap();
        assert_eq!(value, "  2\n  3");
    }

    #[test]
    fn unresolved_reference_fails_with_suggestion() {
        let mut symbols = SymbolTable::default();
        symbols.define("querypart2", "2".to_string()).unwrap();

        let result = resolve_segments(&[reference("querypart")], &symbols);
        match result {
            Err(TransformError::UnresolvedReference { name, suggestion }) => {
                assert_eq!(name, "querypart");
                assert_eq!(suggestion.as_deref(), Some("querypart2"));
            }
            other => panic!("expected unresolved reference, got {other:?}"),
        }
    }

    #[test]
    fn part_records_resolved_value() {
        let mut symbols = SymbolTable::default();
        symbols.define("two", "  2".to_string()).unwrap();

        resolve_part("three", &[reference("two"), literal("\n  3")], &mut symbols).unwrap();
        assert_eq!(symbols.lookup("three").unwrap().value, "  2\n  3");
    }

    #[test]
    fn duplicate_beats_unresolved() {
        let mut symbols = SymbolTable::default();
        symbols.define("dup", "first".to_string()).unwrap();

        // Body would also fail to resolve; the duplicate check comes first
        let result = resolve_part("dup", &[reference("missing")], &mut symbols);
        assert!(matches!(
            result,
            Err(TransformError::DuplicatePart { name }) if name == "dup"
        ));
    }

    #[test]
    fn self_reference_fails_as_unresolved() {
        let mut symbols = SymbolTable::default();
        let result = resolve_part("loop", &[reference("loop")], &mut symbols);
        assert!(matches!(
            result,
            Err(TransformError::UnresolvedReference { name, .. }) if name == "loop"
        ));
        // Nothing was recorded
        assert!(symbols.is_empty());
    }
}
