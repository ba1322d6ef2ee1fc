//! Per-invocation transform state.
//!
//! One `Session` lives for exactly one pass invocation and is threaded
//! `&mut` through the traversal: the fragment table and the signing decision
//! have no existence outside it. Callers that want fragment sharing across
//! several files reuse one session; callers that want isolation build one
//! per file.

use crate::config::Credentials;
use crate::sign::{SignError, Signer, SigningMode};
use crate::transform::errors::TransformError;
use std::collections::HashMap;

/// A named fragment with its fully resolved value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub name: String,
    pub value: String,
}

/// Fragment definitions, insert-once.
///
/// A name can be defined at most once per session, and lookups before the
/// defining declaration fail. Scope names are never registered here; only
/// parts can collide.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    fragments: HashMap<String, Fragment>,
}

impl SymbolTable {
    /// Record a resolved fragment. Fails if the name is already defined.
    pub fn define(&mut self, name: &str, value: String) -> Result<(), TransformError> {
        if self.fragments.contains_key(name) {
            return Err(TransformError::DuplicatePart {
                name: name.to_string(),
            });
        }
        self.fragments.insert(
            name.to_string(),
            Fragment {
                name: name.to_string(),
                value,
            },
        );
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Fragment> {
        self.fragments.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fragments.contains_key(name)
    }

    /// Closest defined name, for diagnostics on failed lookups.
    pub fn closest(&self, name: &str) -> Option<String> {
        self.fragments
            .keys()
            .map(|candidate| (strsim::jaro_winkler(name, candidate), candidate))
            .filter(|(score, _)| *score >= 0.8)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, candidate)| candidate.clone())
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Everything one pass invocation carries: fragment definitions plus the
/// signing decision, which is made exactly once at construction.
pub struct Session {
    pub(crate) symbols: SymbolTable,
    pub(crate) mode: SigningMode,
}

impl Session {
    /// Build a session from credentials.
    ///
    /// Complete credentials turn signing on; a malformed private key is
    /// fatal here, before any source is read. Incomplete credentials mean
    /// pass-through, not an error.
    pub fn new(credentials: &Credentials) -> Result<Self, SignError> {
        let mode = match credentials.signing_pair() {
            Some((client_id, private_key)) => {
                SigningMode::Enabled(Signer::new(client_id, private_key, credentials.issuer())?)
            }
            None => SigningMode::Disabled,
        };
        Ok(Self {
            symbols: SymbolTable::default(),
            mode,
        })
    }

    /// A session that never signs; every source passes through untouched.
    pub fn passthrough() -> Self {
        Self {
            symbols: SymbolTable::default(),
            mode: SigningMode::Disabled,
        }
    }

    /// A session around an already-built signer.
    pub fn with_signer(signer: Signer) -> Self {
        Self {
            symbols: SymbolTable::default(),
            mode: SigningMode::Enabled(signer),
        }
    }

    pub fn signing_enabled(&self) -> bool {
        self.mode.is_enabled()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Copy of the fragment table as it stands.
    ///
    /// A failed unit may have defined parts before hitting its error;
    /// callers that keep going past the failure restore the snapshot so
    /// later units don't see those half-registered definitions.
    pub fn snapshot(&self) -> SymbolTable {
        self.symbols.clone()
    }

    pub fn restore(&mut self, symbols: SymbolTable) {
        self.symbols = symbols;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PRIVATE_KEY: &str = include_str!("../../tests/keys/test_rsa.pem");

    #[test]
    fn define_then_lookup() {
        let mut table = SymbolTable::default();
        table.define("greeting", "hello".to_string()).unwrap();

        let fragment = table.lookup("greeting").unwrap();
        assert_eq!(fragment.name, "greeting");
        assert_eq!(fragment.value, "hello");
    }

    #[test]
    fn lookup_before_define_fails() {
        let table = SymbolTable::default();
        assert!(table.lookup("anything").is_none());
    }

    #[test]
    fn duplicate_define_rejected() {
        let mut table = SymbolTable::default();
        table.define("name", "first".to_string()).unwrap();

        let result = table.define("name", "second".to_string());
        assert!(matches!(
            result,
            Err(TransformError::DuplicatePart { name }) if name == "name"
        ));
        // The first definition survives
        assert_eq!(table.lookup("name").unwrap().value, "first");
    }

    #[test]
    fn closest_finds_near_miss() {
        let mut table = SymbolTable::default();
        table.define("querypart2", "2".to_string()).unwrap();
        table.define("unrelated", "x".to_string()).unwrap();

        assert_eq!(table.closest("querypart"), Some("querypart2".to_string()));
        assert_eq!(table.closest("zzzzz"), None);
    }

    #[test]
    fn session_from_complete_credentials_signs() {
        let credentials = Credentials::new(
            Some("client-a".to_string()),
            Some(TEST_PRIVATE_KEY.to_string()),
            None,
        );
        let session = Session::new(&credentials).unwrap();
        assert!(session.signing_enabled());
    }

    #[test]
    fn session_from_incomplete_credentials_passes_through() {
        let credentials = Credentials::new(Some("client-a".to_string()), None, None);
        let session = Session::new(&credentials).unwrap();
        assert!(!session.signing_enabled());
    }

    #[test]
    fn session_rejects_malformed_key() {
        let credentials = Credentials::new(
            Some("client-a".to_string()),
            Some("garbage, not a key".to_string()),
            None,
        );
        assert!(matches!(
            Session::new(&credentials),
            Err(SignError::InvalidKey(_))
        ));
    }

    #[test]
    fn passthrough_session_disabled() {
        assert!(!Session::passthrough().signing_enabled());
    }

    #[test]
    fn restore_discards_definitions_after_snapshot() {
        let mut session = Session::passthrough();
        session.symbols.define("kept", "a".to_string()).unwrap();

        let checkpoint = session.snapshot();
        session.symbols.define("dropped", "b".to_string()).unwrap();

        session.restore(checkpoint);
        assert!(session.symbols().contains("kept"));
        assert!(!session.symbols().contains("dropped"));
    }
}
