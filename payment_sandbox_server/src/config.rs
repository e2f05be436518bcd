use std::env;

use log::*;

use crate::secret::Secret;

const DEFAULT_PIS_HOST: &str = "127.0.0.1";
const DEFAULT_PIS_PORT: u16 = 8085;
const DEFAULT_SIGNING_KEY_PATH: &str = "./signing_key.pem";
const DEFAULT_CONSENT_ID_PREFIX: &str = "urn:sandbox:consent:";
const DEFAULT_ENROLLMENT_ID_PREFIX: &str = "urn:sandbox:enrollment:";
const DEFAULT_CREATE_CONSENT_AUDIENCE: &str = "createConsent";
const DEFAULT_CREATE_PAYMENT_AUDIENCE: &str = "createPayment";
const DEFAULT_CREATE_ENROLLMENT_AUDIENCE: &str = "createEnrollment";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// The organisation identity this server signs responses as (the `iss` claim).
    pub organisation_id: String,
    /// Key id declared in outbound envelope headers. Must match the entry published in the
    /// server's key set.
    pub signing_key_id: String,
    /// Filesystem location of the server's RSA signing key (PEM).
    pub signing_key_path: String,
    pub consent_id_prefix: String,
    pub enrollment_id_prefix: String,
    /// Base URL of the client-metadata registry. Client details are fetched from
    /// `{client_details_url}/{client_id}`.
    pub client_details_url: String,
    pub introspection: IntrospectionConfig,
    pub audiences: AudienceConfig,
    /// When false, token introspection is bypassed and every caller is treated as the fixed
    /// reference client. **DANGER** — reference mode only.
    pub validate_token: bool,
    /// When false, inbound envelopes are decoded without signature verification and bound to a
    /// placeholder organisation. **DANGER** — reference mode only.
    pub validate_signature: bool,
}

#[derive(Clone, Debug, Default)]
pub struct IntrospectionConfig {
    pub url: String,
    pub username: String,
    pub password: Secret<String>,
}

/// Expected audience claim for inbound envelopes, per resource kind. Patch operations reuse
/// their kind's audience.
#[derive(Clone, Debug)]
pub struct AudienceConfig {
    pub create_consent: String,
    pub create_payment: String,
    pub create_enrollment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PIS_HOST.to_string(),
            port: DEFAULT_PIS_PORT,
            organisation_id: String::default(),
            signing_key_id: String::default(),
            signing_key_path: DEFAULT_SIGNING_KEY_PATH.to_string(),
            consent_id_prefix: DEFAULT_CONSENT_ID_PREFIX.to_string(),
            enrollment_id_prefix: DEFAULT_ENROLLMENT_ID_PREFIX.to_string(),
            client_details_url: String::default(),
            introspection: IntrospectionConfig::default(),
            audiences: AudienceConfig::default(),
            validate_token: true,
            validate_signature: true,
        }
    }
}

impl Default for AudienceConfig {
    fn default() -> Self {
        Self {
            create_consent: DEFAULT_CREATE_CONSENT_AUDIENCE.to_string(),
            create_payment: DEFAULT_CREATE_PAYMENT_AUDIENCE.to_string(),
            create_enrollment: DEFAULT_CREATE_ENROLLMENT_AUDIENCE.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("PIS_HOST").ok().unwrap_or_else(|| DEFAULT_PIS_HOST.into());
        let port = env::var("PIS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for PIS_PORT. {e} Using the default, {DEFAULT_PIS_PORT}, instead."
                    );
                    DEFAULT_PIS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_PIS_PORT);
        let organisation_id = required_env("PIS_ORGANISATION_ID");
        let signing_key_id = required_env("PIS_SIGNING_KEY_ID");
        let signing_key_path = env::var("PIS_SIGNING_KEY_PATH").ok().unwrap_or_else(|| {
            error!("🪛️ PIS_SIGNING_KEY_PATH is not set. Looking for the signing key at {DEFAULT_SIGNING_KEY_PATH}.");
            DEFAULT_SIGNING_KEY_PATH.into()
        });
        let consent_id_prefix = env::var("PIS_CONSENT_ID_PREFIX").ok().unwrap_or_else(|| {
            warn!("🪛️ PIS_CONSENT_ID_PREFIX is not set. Using '{DEFAULT_CONSENT_ID_PREFIX}'.");
            DEFAULT_CONSENT_ID_PREFIX.into()
        });
        let enrollment_id_prefix = env::var("PIS_ENROLLMENT_ID_PREFIX").ok().unwrap_or_else(|| {
            warn!("🪛️ PIS_ENROLLMENT_ID_PREFIX is not set. Using '{DEFAULT_ENROLLMENT_ID_PREFIX}'.");
            DEFAULT_ENROLLMENT_ID_PREFIX.into()
        });
        let client_details_url = required_env("PIS_CLIENT_DETAILS_ENDPOINT");
        let validate_token = env::var("PIS_VALIDATE_TOKEN").map(|s| &s != "0" && &s != "false").unwrap_or(true);
        let validate_signature =
            env::var("PIS_VALIDATE_SIGNATURE").map(|s| &s != "0" && &s != "false").unwrap_or(true);
        if !validate_token {
            warn!("🚨️ PIS_VALIDATE_TOKEN is off. Token introspection will be BYPASSED. 🚨️");
        }
        if !validate_signature {
            warn!("🚨️ PIS_VALIDATE_SIGNATURE is off. Request signatures will NOT be verified. 🚨️");
        }
        Self {
            host,
            port,
            organisation_id,
            signing_key_id,
            signing_key_path,
            consent_id_prefix,
            enrollment_id_prefix,
            client_details_url,
            introspection: IntrospectionConfig::from_env_or_default(),
            audiences: AudienceConfig::from_env_or_default(),
            validate_token,
            validate_signature,
        }
    }
}

impl IntrospectionConfig {
    pub fn from_env_or_default() -> Self {
        let url = required_env("PIS_INTROSPECTION_ENDPOINT");
        let username = required_env("PIS_INTROSPECTION_USER");
        let password = Secret::new(env::var("PIS_INTROSPECTION_PASSWORD").ok().unwrap_or_else(|| {
            error!("🪛️ PIS_INTROSPECTION_PASSWORD is not set. Introspection calls will be rejected upstream.");
            String::default()
        }));
        Self { url, username, password }
    }
}

impl AudienceConfig {
    pub fn from_env_or_default() -> Self {
        let create_consent = env::var("PIS_CREATE_CONSENT_AUDIENCE").ok().unwrap_or_else(|| {
            warn!("🪛️ PIS_CREATE_CONSENT_AUDIENCE is not set. Using '{DEFAULT_CREATE_CONSENT_AUDIENCE}'.");
            DEFAULT_CREATE_CONSENT_AUDIENCE.into()
        });
        let create_payment = env::var("PIS_CREATE_PAYMENT_AUDIENCE").ok().unwrap_or_else(|| {
            warn!("🪛️ PIS_CREATE_PAYMENT_AUDIENCE is not set. Using '{DEFAULT_CREATE_PAYMENT_AUDIENCE}'.");
            DEFAULT_CREATE_PAYMENT_AUDIENCE.into()
        });
        let create_enrollment = env::var("PIS_CREATE_ENROLLMENT_AUDIENCE").ok().unwrap_or_else(|| {
            warn!("🪛️ PIS_CREATE_ENROLLMENT_AUDIENCE is not set. Using '{DEFAULT_CREATE_ENROLLMENT_AUDIENCE}'.");
            DEFAULT_CREATE_ENROLLMENT_AUDIENCE.into()
        });
        Self { create_consent, create_payment, create_enrollment }
    }
}

fn required_env(var: &str) -> String {
    env::var(var).ok().unwrap_or_else(|| {
        error!("🪛️ {var} is not set. Please set it; the sandbox cannot operate correctly without it.");
        String::default()
    })
}
