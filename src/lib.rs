//! QueryScope: build-time query signing for TypeScript sources
//!
//! A source transformer built on byte-span replacement primitives with
//! tree-sitter and ast-grep integration for structural queries. Constants
//! annotated `QueryScopePart` are inlined into their referencing queries and
//! removed; constants annotated `QueryScope` are rewritten to carry their
//! final query text and an RS256 token binding that query to the issuing
//! client.
//!
//! # Architecture
//!
//! All rewrites compile down to a single primitive: [`SpanEdit`], which
//! represents a verified byte-span replacement. Intelligence lives in span
//! acquisition (via tree-sitter and ast-grep), not in the application logic.
//!
//! # Safety
//!
//! - All edits verify expected before-text before applying
//! - Atomic file writes (tempfile + fsync + rename)
//! - Project boundary enforcement
//! - Rewritten sources are re-parsed before they are accepted
//!
//! # Example
//!
//! ```no_run
//! use queryscope::{transform_source, Credentials, Dialect, Session};
//!
//! let creds = Credentials::from_env();
//! let mut session = Session::new(&creds)?;
//!
//! let source = std::fs::read_to_string("src/queries.ts")?;
//! let outcome = transform_source(&source, Dialect::Ts, &mut session)?;
//! if outcome.changed() {
//!     std::fs::write("src/queries.ts", &outcome.output)?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod edit;
pub mod pool;
pub mod safety;
pub mod sign;
pub mod transform;
pub mod ts;

// Re-exports
pub use config::{load_or_default, ConfigError, Credentials, ProjectManifest};
pub use edit::{apply_edits, atomic_write, EditError, EditVerification, SpanEdit};
pub use safety::{ProjectGuard, SafetyError};
pub use sign::{query_digest, SignError, Signer, SigningMode, TokenClaims};
pub use transform::{
    transform_source, ScanStats, Session, SymbolTable, TransformError, TransformOutcome,
};
pub use ts::{validate_syntax, Dialect, ParseError, TsParser};
