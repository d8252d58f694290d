use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::Serialize;
use std::fmt;

use crate::error::RemoteError;

/// Lifetime requested for each signed assertion; Google caps it at one hour.
const ASSERTION_TTL_SECS: i64 = 3600;

/// Non-interactive Google identity used for every Drive call.
#[derive(Clone)]
pub struct ServiceCredential {
    pub client_email: String,
    private_key: String,
    pub scopes: Vec<String>,
}

impl fmt::Debug for ServiceCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCredential")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

impl ServiceCredential {
    /// Environment-provided keys carry `\n` as two characters; restore real newlines.
    pub fn new(client_email: &str, private_key: &str, scopes: &[&str]) -> Self {
        Self {
            client_email: client_email.to_string(),
            private_key: private_key.replace("\\n", "\n"),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn private_key_pem(&self) -> &str {
        &self.private_key
    }

    /// Sign the RS256 JWT-bearer assertion exchanged at `token_uri`.
    pub fn assertion(&self, token_uri: &str, now: DateTime<Utc>) -> Result<String, RemoteError> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: self.scopes.join(" "),
            aud: token_uri,
            iat,
            exp: iat + ASSERTION_TTL_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())?;
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
    }
}
