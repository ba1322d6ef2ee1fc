//! Query digests and scope token signing.
//!
//! A scope token is a compact RS256 JWS whose claims carry the query digest
//! (`qd`), the signing time (`iat`) and the issuer (`iss`). The digest is an
//! HMAC-SHA256 of the expanded query keyed by the client id, hex encoded.
//! Downstream verifiers hold the RSA public key and recompute the digest.

use hmac::{Hmac, Mac};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug)]
pub enum SignError {
    #[error("invalid signing key: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),

    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Claims embedded in a scope token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Hex HMAC-SHA256 digest of the expanded query, keyed by the client id
    pub qd: String,
    /// Unix timestamp at signing
    pub iat: u64,
    /// Issuer
    pub iss: String,
}

/// Compute the query digest: hex HMAC-SHA256(client_id, query).
///
/// Pure function of its two inputs; no timestamps, no randomness.
pub fn query_digest(client_id: &str, query: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(client_id.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(query.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// RS256 token signer bound to one client id and issuer.
pub struct Signer {
    client_id: String,
    issuer: String,
    key: EncodingKey,
}

impl Signer {
    /// Create a signer, parsing the PEM private key exactly once.
    ///
    /// Malformed key material fails here, before any source is touched.
    /// PKCS#1 and PKCS#8 encodings are both accepted.
    pub fn new(
        client_id: impl Into<String>,
        private_key_pem: &str,
        issuer: impl Into<String>,
    ) -> Result<Self, SignError> {
        let key =
            EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).map_err(SignError::InvalidKey)?;
        Ok(Self {
            client_id: client_id.into(),
            issuer: issuer.into(),
            key,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Digest of an expanded query under this signer's client id.
    pub fn digest(&self, query: &str) -> String {
        query_digest(&self.client_id, query)
    }

    /// Sign an expanded query as an RS256 JWT over `{qd, iat, iss}`.
    pub fn sign(&self, query: &str) -> Result<String, SignError> {
        let claims = TokenClaims {
            qd: self.digest(query),
            iat: jsonwebtoken::get_current_timestamp(),
            iss: self.issuer.clone(),
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.key).map_err(SignError::Signing)
    }
}

/// The signing decision for a whole pass invocation, made exactly once.
pub enum SigningMode {
    /// Credentials present and valid; scopes get real tokens
    Enabled(Signer),
    /// Credentials absent; sources pass through untouched
    Disabled,
}

impl SigningMode {
    pub fn is_enabled(&self) -> bool {
        matches!(self, SigningMode::Enabled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use proptest::prelude::*;

    const TEST_PRIVATE_KEY: &str = include_str!("../tests/keys/test_rsa.pem");
    const TEST_PUBLIC_KEY: &str = include_str!("../tests/keys/test_rsa.pub.pem");

    fn decode_claims(token: &str, issuer: &str) -> TokenClaims {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["iss"]);
        validation.validate_exp = false;
        validation.set_issuer(&[issuer]);
        let key = DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap();
        decode::<TokenClaims>(token, &key, &validation).unwrap().claims
    }

    #[test]
    fn digest_is_hex_sha256_width() {
        let digest = query_digest("client-a", "query { me }");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn digest_deterministic() {
        let a = query_digest("client-a", "query { me }");
        let b = query_digest("client-a", "query { me }");
        assert_eq!(a, b);
    }

    #[test]
    fn digest_sensitive_to_both_inputs() {
        let base = query_digest("client-a", "query { me }");
        assert_ne!(base, query_digest("client-b", "query { me }"));
        assert_ne!(base, query_digest("client-a", "query { you }"));
    }

    #[test]
    fn signer_rejects_malformed_key() {
        let result = Signer::new("client-a", "not a pem at all", "issuer");
        assert!(matches!(result, Err(SignError::InvalidKey(_))));
    }

    #[test]
    fn signed_token_roundtrips_claims() {
        let signer = Signer::new("client-a", TEST_PRIVATE_KEY, "test-issuer").unwrap();
        let token = signer.sign("query { me }").unwrap();

        let claims = decode_claims(&token, "test-issuer");
        assert_eq!(claims.qd, query_digest("client-a", "query { me }"));
        assert_eq!(claims.iss, "test-issuer");
        assert!(claims.iat > 0);
    }

    #[test]
    fn token_rejected_under_wrong_issuer() {
        let signer = Signer::new("client-a", TEST_PRIVATE_KEY, "test-issuer").unwrap();
        let token = signer.sign("query { me }").unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["iss"]);
        validation.validate_exp = false;
        validation.set_issuer(&["someone-else"]);
        let key = DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap();
        assert!(decode::<TokenClaims>(&token, &key, &validation).is_err());
    }

    proptest! {
        #[test]
        fn digest_pure_and_well_formed(client in "[a-z0-9-]{1,24}", query in ".{0,128}") {
            let first = query_digest(&client, &query);
            let second = query_digest(&client, &query);
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.len(), 64);
            prop_assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}
