use crate::edit::EditError;
use crate::sign::SignError;
use crate::ts::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("part '{name}' is declared more than once")]
    DuplicatePart { name: String },

    #[error("unresolved reference '{name}'{}", suggestion_suffix(.suggestion))]
    UnresolvedReference {
        name: String,
        suggestion: Option<String>,
    },

    #[error("scope '{scope}' has no query field")]
    MissingQueryField { scope: String },

    #[error("scope '{scope}' query must be a string or template literal, found {found}")]
    QueryNotLiteral { scope: String, found: String },

    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("rewritten source failed syntax validation: {0}")]
    PostValidation(#[source] ParseError),

    #[error("signing failed: {0}")]
    Sign(#[from] SignError),

    #[error("edit application failed: {0}")]
    Edit(#[from] EditError),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean '{name}'?)"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_reference_mentions_suggestion() {
        let err = TransformError::UnresolvedReference {
            name: "querypart".to_string(),
            suggestion: Some("querypart2".to_string()),
        };
        let message = err.to_string();
        assert!(message.contains("querypart"));
        assert!(message.contains("did you mean 'querypart2'?"));
    }

    #[test]
    fn unresolved_reference_without_suggestion() {
        let err = TransformError::UnresolvedReference {
            name: "unknown".to_string(),
            suggestion: None,
        };
        assert!(!err.to_string().contains("did you mean"));
    }
}
