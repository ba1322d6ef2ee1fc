use crate::pool;
use crate::ts::errors::ParseError;
use crate::ts::parser::{Dialect, ErrorNode};

/// Validate that TypeScript source code has no syntax errors.
///
/// Returns Ok(()) if the code parses without ERROR nodes.
pub fn validate_syntax(source: &str, dialect: Dialect) -> Result<(), ParseError> {
    let errors = pool::with_parser(dialect, |parser| {
        parser
            .parse_with_source(source)
            .map(|parsed| parsed.error_nodes())
    })??;

    match errors.len() {
        0 => Ok(()),
        1 => Err(ParseError::SyntaxError {
            byte_start: errors[0].byte_start,
            byte_end: errors[0].byte_end,
        }),
        n => Err(ParseError::MultipleSyntaxErrors { count: n }),
    }
}

/// Validate that a rewrite didn't introduce syntax errors.
///
/// Parses both texts and fails on ERROR nodes present in the rewritten
/// source but not in the original.
pub fn validate_rewrite(
    original: &str,
    rewritten: &str,
    dialect: Dialect,
) -> Result<(), ParseError> {
    let original_errors = pool::with_parser(dialect, |parser| {
        parser
            .parse_with_source(original)
            .map(|parsed| parsed.error_nodes())
    })??;

    let rewritten_errors = pool::with_parser(dialect, |parser| {
        parser
            .parse_with_source(rewritten)
            .map(|parsed| parsed.error_nodes())
    })??;

    // An error is "new" if no original error sits at the same span
    // (comparing by position is imperfect but reasonable)
    let introduced: Vec<&ErrorNode> = rewritten_errors
        .iter()
        .filter(|e| {
            !original_errors
                .iter()
                .any(|o| o.byte_start == e.byte_start && o.byte_end == e.byte_end)
        })
        .collect();

    match introduced.len() {
        0 => Ok(()),
        1 => Err(ParseError::SyntaxError {
            byte_start: introduced[0].byte_start,
            byte_end: introduced[0].byte_end,
        }),
        n => Err(ParseError::MultipleSyntaxErrors { count: n }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_valid_syntax() {
        let source = r#"
const name: string = 'ada'
export const greet = () => `hi ${name}`
"#;
        assert!(validate_syntax(source, Dialect::Ts).is_ok());
    }

    #[test]
    fn validate_invalid_syntax() {
        let source = "const broken: = {";
        assert!(validate_syntax(source, Dialect::Ts).is_err());
    }

    #[test]
    fn rewrite_introduces_error() {
        let original = "const x: number = 1\n";
        let rewritten = "const x: number = \n";
        assert!(validate_rewrite(original, rewritten, Dialect::Ts).is_err());
    }

    #[test]
    fn rewrite_without_new_errors() {
        let original = "const x: number = 1\n";
        let rewritten = "const y: number = 2\n";
        assert!(validate_rewrite(original, rewritten, Dialect::Ts).is_ok());
    }

    #[test]
    fn rewrite_on_already_broken_code() {
        // Existing errors are tolerated as long as the rewrite adds none
        let original = "const broken: = { const x = 1\n";
        assert!(validate_rewrite(original, original, Dialect::Ts).is_ok());
    }
}
