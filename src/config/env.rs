//! Process credentials, read from the environment once per invocation.

use std::env;

pub const CLIENT_ID_VAR: &str = "QUERYSCOPE_CLIENT_ID";
pub const PRIVATE_KEY_VAR: &str = "QUERYSCOPE_PRIVATE_KEY";
pub const ISSUER_VAR: &str = "QUERYSCOPE_ISSUER";

const DEFAULT_ISSUER: &str = "queryscope";

/// Signing credentials as configured for the process.
///
/// The client id and private key are both required for signing; either one
/// absent (or blank) means pass-through mode. The issuer always has a value,
/// falling back to "queryscope".
#[derive(Debug, Clone)]
pub struct Credentials {
    client_id: Option<String>,
    private_key: Option<String>,
    issuer: String,
}

impl Credentials {
    pub fn new(
        client_id: Option<String>,
        private_key: Option<String>,
        issuer: Option<String>,
    ) -> Self {
        Self {
            client_id: normalize(client_id),
            private_key: normalize(private_key),
            issuer: normalize(issuer).unwrap_or_else(|| DEFAULT_ISSUER.to_string()),
        }
    }

    /// Read the QUERYSCOPE_* variables. Called once, before any traversal.
    pub fn from_env() -> Self {
        Self::new(
            env::var(CLIENT_ID_VAR).ok(),
            env::var(PRIVATE_KEY_VAR).ok(),
            env::var(ISSUER_VAR).ok(),
        )
    }

    /// Both halves needed for signing, or None.
    pub fn signing_pair(&self) -> Option<(&str, &str)> {
        match (&self.client_id, &self.private_key) {
            (Some(client_id), Some(private_key)) => Some((client_id, private_key)),
            _ => None,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
