//! Dynamic client trust.
//!
//! Clients are not provisioned with static keys. On every signed request the server resolves the
//! caller's registry record, follows its `jwksUri` to the currently published key set, and derives
//! the client's organisation id from the key set location. Key rotation on the client side is
//! therefore picked up without any server-side change.

use log::*;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetails {
    pub jwks_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(rename = "use", default)]
    pub key_use: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Picks the key matching `kid`, or the first RSA key when the envelope header carries no
    /// key id.
    pub fn find_key(&self, kid: Option<&str>) -> Option<&Jwk> {
        match kid {
            Some(kid) => self.keys.iter().find(|k| k.kid.as_deref() == Some(kid)),
            None => self.keys.iter().find(|k| k.kty == "RSA"),
        }
    }
}

/// Everything the verifier needs to know about a caller: who it is, and which keys currently
/// speak for it.
#[derive(Debug, Clone)]
pub struct ClientTrust {
    pub organisation_id: String,
    pub keyset: Jwks,
}

#[derive(Debug, Clone)]
pub struct ClientRegistry {
    client: Client,
    details_url: String,
}

impl ClientRegistry {
    pub fn new(details_url: &str) -> Self {
        Self { client: Client::new(), details_url: details_url.trim_end_matches('/').to_string() }
    }

    /// Resolves a client id to its current trust anchor. Two upstream calls: the registry record
    /// and the key set it points at.
    pub async fn resolve(&self, client_id: &str) -> Result<ClientTrust, ServerError> {
        let url = format!("{}/{client_id}", self.details_url);
        trace!("🗝️ Fetching client details for {client_id} from {url}");
        let details = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ServerError::UpstreamUnavailable(format!("Client registry call failed. {e}")))?
            .json::<ClientDetails>()
            .await
            .map_err(|e| ServerError::UpstreamUnavailable(format!("Client registry returned garbage. {e}")))?;
        let organisation_id = organisation_id_from_jwks_uri(&details.jwks_uri)
            .ok_or_else(|| ServerError::UpstreamUnavailable(format!("Unusable jwksUri: {}", details.jwks_uri)))?;
        trace!("🗝️ Client {client_id} belongs to organisation {organisation_id}. Fetching key set.");
        let keyset = self
            .client
            .get(&details.jwks_uri)
            .send()
            .await
            .map_err(|e| ServerError::UpstreamUnavailable(format!("Key set fetch failed. {e}")))?
            .json::<Jwks>()
            .await
            .map_err(|e| ServerError::UpstreamUnavailable(format!("Key set is not a valid JWKS. {e}")))?;
        Ok(ClientTrust { organisation_id, keyset })
    }
}

/// The organisation id is the first path segment of the published key set location, e.g.
/// `https://keystore.example/{org_id}/application.jwks`.
pub fn organisation_id_from_jwks_uri(jwks_uri: &str) -> Option<String> {
    let url = Url::parse(jwks_uri).ok()?;
    url.path_segments()?.find(|s| !s.is_empty()).map(|s| s.to_string())
}
