//! The token gate.
//!
//! Callers authenticate with an opaque OAuth2 client-credentials token. The server introspects
//! the token at the authorisation server and then binds it to the caller's mTLS certificate: the
//! token's `cnf.x5t#S256` confirmation claim must equal the SHA-256 thumbprint of the certificate
//! the terminating proxy forwarded. A stolen token without the matching private key is useless.

use async_trait::async_trait;
use base64::{decode_config, encode_config, STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use log::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{config::IntrospectionConfig, errors::ServerError};

pub const EXPECTED_TOKEN_TYPE: &str = "token_type";
pub const PAYMENTS_SCOPE: &str = "payments";

/// The proof-of-possession confirmation claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Confirmation {
    #[serde(rename = "x5t#S256")]
    pub x5t_s256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenDetails {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub cnf: Option<Confirmation>,
    #[serde(default)]
    pub client_id: String,
}

impl TokenDetails {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope.split(' ').any(|s| s == scope)
    }

    /// The consent this token was authorised against, when present. Dynamic consent scopes look
    /// like `consent:urn:...`; the part after the `consent:` marker is the consent id.
    pub fn consent_scope(&self) -> Option<String> {
        self.scope
            .split(' ')
            .find(|s| s.starts_with("consent:urn"))
            .and_then(|s| s.strip_prefix("consent:"))
            .map(|s| s.to_string())
    }
}

/// SHA-256 thumbprint of a PEM certificate, base64url without padding, as used in `x5t#S256`.
pub fn cert_thumbprint(pem: &str) -> Option<String> {
    let body: String = pem
        .lines()
        .filter(|line| !line.contains("-----BEGIN CERTIFICATE-----") && !line.contains("-----END CERTIFICATE-----"))
        .collect::<Vec<&str>>()
        .join("")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .collect();
    let der = decode_config(body, STANDARD_NO_PAD).ok()?;
    let digest = Sha256::digest(&der);
    Some(encode_config(digest, URL_SAFE_NO_PAD))
}

/// Checks every condition the gate imposes on an introspected token. Returns false (and logs the
/// first failing condition) unless all of them hold.
pub fn validate_client_credentials(details: &TokenDetails, client_cert: Option<&str>) -> bool {
    if !details.active {
        debug!("🔑️ Token for {} is not active", details.client_id);
        return false;
    }
    if details.token_type != EXPECTED_TOKEN_TYPE {
        debug!("🔑️ Token for {} has unexpected type '{}'", details.client_id, details.token_type);
        return false;
    }
    if !details.has_scope(PAYMENTS_SCOPE) {
        debug!("🔑️ Token for {} is missing the '{PAYMENTS_SCOPE}' scope", details.client_id);
        return false;
    }
    let Some(cnf) = &details.cnf else {
        debug!("🔑️ Token for {} carries no confirmation claim", details.client_id);
        return false;
    };
    let Some(thumbprint) = client_cert.and_then(cert_thumbprint) else {
        debug!("🔑️ No usable client certificate accompanied the token for {}", details.client_id);
        return false;
    };
    if cnf.x5t_s256 != thumbprint {
        debug!("🔑️ Certificate thumbprint mismatch for {}. The token is bound to a different key.", details.client_id);
        return false;
    }
    true
}

/// Strategy seam for the token gate. The production implementation introspects upstream; the
/// reference mode substitutes a fixed identity.
#[async_trait]
pub trait TokenAuthenticator: Send + Sync {
    /// Authenticates a caller from its bearer token and forwarded certificate. `None` means the
    /// caller is rejected; the reason is logged, never returned.
    async fn authenticate(&self, bearer: Option<&str>, client_cert: Option<&str>) -> Option<TokenDetails>;
}

#[derive(Debug, Clone)]
pub struct IntrospectionAuthenticator {
    client: Client,
    config: IntrospectionConfig,
}

impl IntrospectionAuthenticator {
    pub fn new(config: IntrospectionConfig) -> Self {
        Self { client: Client::new(), config }
    }

    async fn introspect(&self, token: &str) -> Result<TokenDetails, ServerError> {
        self.client
            .post(&self.config.url)
            .basic_auth(&self.config.username, Some(self.config.password.reveal()))
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| ServerError::UpstreamUnavailable(format!("Introspection call failed. {e}")))?
            .json::<TokenDetails>()
            .await
            .map_err(|e| ServerError::UpstreamUnavailable(format!("Introspection response was not parseable. {e}")))
    }
}

#[async_trait]
impl TokenAuthenticator for IntrospectionAuthenticator {
    async fn authenticate(&self, bearer: Option<&str>, client_cert: Option<&str>) -> Option<TokenDetails> {
        let token = bearer?;
        let details = match self.introspect(token).await {
            Ok(details) => details,
            Err(e) => {
                warn!("🔑️ Token introspection failed. Rejecting the caller. {e}");
                return None;
            },
        };
        validate_client_credentials(&details, client_cert).then_some(details)
    }
}

/// **DANGER**: accepts every caller as a fixed reference client. Selected by switching
/// `PIS_VALIDATE_TOKEN` off.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator;

#[async_trait]
impl TokenAuthenticator for StaticAuthenticator {
    async fn authenticate(&self, _bearer: Option<&str>, _client_cert: Option<&str>) -> Option<TokenDetails> {
        Some(TokenDetails {
            active: true,
            token_type: EXPECTED_TOKEN_TYPE.to_string(),
            scope: "payments consent:urn:my_dummy_id".to_string(),
            cnf: None,
            client_id: "dummy_client".to_string(),
        })
    }
}
