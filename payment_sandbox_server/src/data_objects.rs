use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

/// Fixed self link served by the sandbox for every resource.
pub const SANDBOX_SELF_LINK: &str = "https://api.banco.com.br/open-banking/api/v1/resource";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_link: String,
}

impl Default for Links {
    fn default() -> Self {
        Self { self_link: SANDBOX_SELF_LINK.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub request_date_time: DateTime<Utc>,
}

impl Meta {
    pub fn now() -> Self {
        Self { request_date_time: Utc::now() }
    }
}

/// Every successful response body: the resource under `data`, the fixed sandbox link, and a
/// fresh request timestamp. Built per request; the envelope is never cached with the resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub links: Links,
    pub meta: Meta,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data, links: Links::default(), meta: Meta::now() }
    }
}

//-------------------------------------------------  Error envelope  ---------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub title: String,
    pub detail: String,
}

/// The one body shape shared by every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub errors: Vec<ApiError>,
    pub meta: Meta,
}

impl ErrorEnvelope {
    pub fn new(code: &str, title: &str, detail: String) -> Self {
        Self {
            errors: vec![ApiError { code: code.to_string(), title: title.to_string(), detail }],
            meta: Meta::now(),
        }
    }

    pub fn unauthorised() -> Self {
        Self::new("UNAUTHORIZED", "Unauthorised", "The authorisation token was not sent or is invalid".to_string())
    }

    pub fn missing_headers() -> Self {
        Self::new("MISSING_MANDATORY_HEADERS", "Missing mandatory headers", "A mandatory header was not sent".to_string())
    }

    pub fn bad_signature() -> Self {
        Self::new("BAD_SIGNATURE", "Bad signature", "Could not verify the message signature".to_string())
    }

    pub fn not_found(id: &str) -> Self {
        Self::new("NOT_FOUND", "Resource not found", format!("No resource found for id {id}"))
    }

    pub fn internal(detail: String) -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error", detail)
    }
}

impl From<&ServerError> for ErrorEnvelope {
    fn from(e: &ServerError) -> Self {
        match e {
            // An unreachable upstream fails closed as an authentication rejection.
            ServerError::Unauthorized | ServerError::UpstreamUnavailable(_) => Self::unauthorised(),
            ServerError::MissingMandatoryHeaders => Self::missing_headers(),
            ServerError::BadSignature => Self::bad_signature(),
            ServerError::NotFound(id) => Self::not_found(id),
            other => Self::internal(other.to_string()),
        }
    }
}
