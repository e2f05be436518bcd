//! Outbound envelope signing. Every response body leaves the process as a PS256-signed JWT under
//! the server's own key, addressed to the caller's organisation.

use std::fmt;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use log::*;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{config::ServerConfig, errors::ServerError};

/// Lifetime of a signed response envelope.
const RESPONSE_TTL_SECS: i64 = 300;

#[derive(Clone)]
pub struct ResponseSigner {
    key: EncodingKey,
    key_id: String,
    organisation_id: String,
}

impl fmt::Debug for ResponseSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseSigner")
            .field("key", &"<RSA private key>")
            .field("key_id", &self.key_id)
            .field("organisation_id", &self.organisation_id)
            .finish()
    }
}

impl ResponseSigner {
    pub fn new(key: EncodingKey, key_id: &str, organisation_id: &str) -> Self {
        Self { key, key_id: key_id.to_string(), organisation_id: organisation_id.to_string() }
    }

    /// Loads the signing key from the path the configuration names.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let pem = std::fs::read(&config.signing_key_path).map_err(|e| {
            ServerError::ConfigurationError(format!(
                "Could not read the signing key at {}. {e}",
                config.signing_key_path
            ))
        })?;
        let key = EncodingKey::from_rsa_pem(&pem).map_err(|e| {
            ServerError::ConfigurationError(format!("{} is not a valid RSA PEM key. {e}", config.signing_key_path))
        })?;
        Ok(Self::new(key, &config.signing_key_id, &config.organisation_id))
    }

    /// Wraps a response body in a signed envelope addressed to `audience`. The body is stamped
    /// with issuer, issue and expiry times and a fresh `jti`, so identical bodies never produce
    /// identical envelopes.
    pub fn sign<T: Serialize>(&self, body: &T, audience: &str) -> Result<String, ServerError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ServerError::SigningFailure(format!("Response body is not serializable. {e}")))?;
        let Value::Object(mut claims) = value else {
            return Err(ServerError::SigningFailure("Response body must be a JSON object".to_string()));
        };
        let iat = chrono::Utc::now().timestamp();
        claims.insert("iss".to_string(), json!(self.organisation_id));
        claims.insert("aud".to_string(), json!(audience));
        claims.insert("iat".to_string(), json!(iat));
        claims.insert("exp".to_string(), json!(iat + RESPONSE_TTL_SECS));
        claims.insert("jti".to_string(), json!(Uuid::new_v4()));
        let mut header = Header::new(Algorithm::PS256);
        header.kid = Some(self.key_id.clone());
        encode(&header, &claims, &self.key).map_err(|e| {
            error!("🔏️ Could not sign response body with key {}. {e}", self.key_id);
            ServerError::SigningFailure(e.to_string())
        })
    }
}
