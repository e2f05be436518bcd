use std::io;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use payment_sandbox_engine::ResourceStoreError;
use thiserror::Error;

use crate::data_objects::ErrorEnvelope;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("The authorisation token was not sent or is invalid")]
    Unauthorized,
    #[error("A mandatory header was not sent")]
    MissingMandatoryHeaders,
    #[error("Could not verify the message signature")]
    BadSignature,
    #[error("No resource found for id {0}")]
    NotFound(String),
    #[error("An upstream dependency could not be reached. {0}")]
    UpstreamUnavailable(String),
    #[error("Could not sign the response body. {0}")]
    SigningFailure(String),
    #[error("The server configuration is invalid. {0}")]
    ConfigurationError(String),
    #[error("An IO error happened on the server. {0}")]
    IOError(#[from] io::Error),
    #[error("The resource backend failed. {0}")]
    BackendError(String),
}

impl From<ResourceStoreError> for ServerError {
    fn from(e: ResourceStoreError) -> Self {
        match e {
            ResourceStoreError::NotFound(id) => Self::NotFound(id),
            other => Self::BackendError(other.to_string()),
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::MissingMandatoryHeaders => StatusCode::BAD_REQUEST,
            Self::BadSignature => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            // Fail closed. If the introspection or registry endpoint is down, callers are
            // rejected rather than waved through.
            Self::UpstreamUnavailable(_) => StatusCode::UNAUTHORIZED,
            Self::SigningFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorEnvelope::from(self))
    }
}
