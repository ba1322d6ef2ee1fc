//! The transform pass: scan, resolve, sign, rewrite.
//!
//! `transform_source` is the single entry point per compilation unit. The
//! session carries fragment definitions and the signing decision; callers
//! share one session across units to share parts between files, or build
//! one per unit for isolation.

pub mod errors;
pub mod resolver;
pub mod session;

mod rewriter;
mod scanner;

pub use errors::TransformError;
pub use scanner::ScanStats;
pub use session::{Fragment, Session, SymbolTable};

use crate::edit;
use crate::ts::{validate_rewrite, validate_syntax, Dialect};

/// Result of transforming one compilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutcome {
    /// The rewritten source; equal to the input when nothing matched
    pub output: String,
    pub stats: ScanStats,
}

impl TransformOutcome {
    /// True when the pass acted on the unit.
    pub fn changed(&self) -> bool {
        self.stats.parts_removed > 0 || self.stats.scopes_signed > 0
    }
}

/// Transform one compilation unit.
///
/// With signing disabled the source comes back byte-for-byte, without even
/// being parsed. Otherwise the unit is validated, scanned, edited bottom-to-
/// top and re-validated. The first error aborts the unit; partial output
/// never escapes.
pub fn transform_source(
    source: &str,
    dialect: Dialect,
    session: &mut Session,
) -> Result<TransformOutcome, TransformError> {
    if !session.signing_enabled() {
        return Ok(TransformOutcome {
            output: source.to_string(),
            stats: ScanStats::default(),
        });
    }

    validate_syntax(source, dialect)?;

    let report = scanner::scan(source, dialect, session)?;
    if report.edits.is_empty() {
        return Ok(TransformOutcome {
            output: source.to_string(),
            stats: report.stats,
        });
    }

    let output = edit::apply_edits(source, report.edits)?;
    validate_rewrite(source, &output, dialect).map_err(TransformError::PostValidation)?;

    Ok(TransformOutcome {
        output,
        stats: report.stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign::Signer;

    const TEST_PRIVATE_KEY: &str = include_str!("../../tests/keys/test_rsa.pem");

    fn signing_session() -> Session {
        Session::with_signer(Signer::new("client-a", TEST_PRIVATE_KEY, "tests").unwrap())
    }

    #[test]
    fn passthrough_returns_input_verbatim() {
        let source = "const s: QueryScope = { token: 'dev', query: `${never_declared}` }\n";
        let mut session = Session::passthrough();

        let outcome = transform_source(source, Dialect::Ts, &mut session).unwrap();
        assert_eq!(outcome.output, source);
        assert!(!outcome.changed());
    }

    #[test]
    fn parts_removed_and_scope_signed() {
        let source = "\
const greeting: QueryScopePart = 'hello'
const scope: QueryScope = { query: `${greeting} world` }
export default scope
";
        let mut session = signing_session();
        let outcome = transform_source(source, Dialect::Ts, &mut session).unwrap();

        assert!(outcome.changed());
        assert_eq!(outcome.stats.parts_removed, 1);
        assert_eq!(outcome.stats.scopes_signed, 1);
        assert!(!outcome.output.contains("QueryScopePart"));
        assert!(outcome.output.contains("{ query: \"hello world\", token: \""));
        assert!(outcome.output.contains("export default scope"));
    }

    #[test]
    fn broken_source_rejected_before_scanning() {
        let mut session = signing_session();
        let result = transform_source("const s: QueryScope = {", Dialect::Ts, &mut session);
        assert!(matches!(result, Err(TransformError::Parse(_))));
    }

    #[test]
    fn session_shares_parts_across_units() {
        let mut session = signing_session();

        let first = "const shared: QueryScopePart = 'base'\n";
        transform_source(first, Dialect::Ts, &mut session).unwrap();

        let second = "const s: QueryScope = { query: `${shared}!` }\n";
        let outcome = transform_source(second, Dialect::Ts, &mut session).unwrap();
        assert!(outcome.output.contains("{ query: \"base!\", token: \""));
    }

    #[test]
    fn duplicate_across_units_rejected() {
        let mut session = signing_session();

        transform_source("const dup: QueryScopePart = 'a'\n", Dialect::Ts, &mut session).unwrap();
        let result = transform_source("const dup: QueryScopePart = 'b'\n", Dialect::Ts, &mut session);
        assert!(matches!(
            result,
            Err(TransformError::DuplicatePart { name }) if name == "dup"
        ));
    }

    #[test]
    fn unit_without_matches_unchanged() {
        let source = "export const plain = { query: 'untyped' }\n";
        let mut session = signing_session();

        let outcome = transform_source(source, Dialect::Ts, &mut session).unwrap();
        assert_eq!(outcome.output, source);
        assert!(!outcome.changed());
    }
}
