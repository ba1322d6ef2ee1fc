//! Tree-sitter integration for TypeScript sources.
//!
//! This module provides CST-based parsing and literal handling, enabling
//! precise byte-span extraction for TypeScript constructs without losing
//! comments or formatting.

pub mod errors;
pub mod parser;
pub mod template;
pub mod validator;

pub use errors::ParseError;
pub use parser::{Dialect, ErrorNode, ParsedSource, TsParser};
pub use template::{quote_ts_string, Segment};
pub use validator::{validate_rewrite, validate_syntax};
