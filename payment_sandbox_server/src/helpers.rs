use actix_web::HttpRequest;

use crate::errors::ServerError;

pub const INTERACTION_ID_HEADER: &str = "x-fapi-interaction-id";
pub const IDEMPOTENCY_KEY_HEADER: &str = "x-idempotency-key";
/// The terminating proxy forwards the caller's mTLS certificate in this header, percent-encoded.
pub const CLIENT_CERT_HEADER: &str = "ssl-client-cert";
pub const JWT_CONTENT_TYPE: &str = "application/jwt";

/// Extracts the raw bearer token from the `Authorization` header, if one was sent.
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    let header = req.headers().get("Authorization")?.to_str().ok()?;
    header.split(' ').nth(1).map(|s| s.to_string())
}

/// Extracts and percent-decodes the forwarded client certificate, if one was sent.
pub fn client_certificate(req: &HttpRequest) -> Option<String> {
    let header = req.headers().get(CLIENT_CERT_HEADER)?.to_str().ok()?;
    Some(percent_decode(header))
}

pub fn interaction_id(req: &HttpRequest) -> Option<String> {
    req.headers().get(INTERACTION_ID_HEADER).and_then(|v| v.to_str().ok()).map(|s| s.to_string())
}

/// Write operations (create, patch) must carry a JWT content type, an interaction id and an
/// idempotency key.
pub fn require_write_headers(req: &HttpRequest) -> Result<(), ServerError> {
    let content_type = req
        .headers()
        .get("Content-Type")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').any(|part| part.trim() == JWT_CONTENT_TYPE))
        .unwrap_or(false);
    let has_interaction_id = req.headers().contains_key(INTERACTION_ID_HEADER);
    let has_idempotency_key = req.headers().contains_key(IDEMPOTENCY_KEY_HEADER);
    if content_type && has_interaction_id && has_idempotency_key {
        Ok(())
    } else {
        Err(ServerError::MissingMandatoryHeaders)
    }
}

/// Read operations only require the interaction id.
pub fn require_read_headers(req: &HttpRequest) -> Result<(), ServerError> {
    if req.headers().contains_key(INTERACTION_ID_HEADER) {
        Ok(())
    } else {
        Err(ServerError::MissingMandatoryHeaders)
    }
}

/// Decodes `%XX` escapes in place. Malformed escapes pass through untouched rather than failing
/// the request, since the certificate parse downstream will reject garbage anyway.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            // Slice the bytes, not the str: the two positions after a '%' may fall inside a
            // multibyte character.
            if let Some(b) = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
