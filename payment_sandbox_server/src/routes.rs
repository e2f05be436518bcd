//! Route handlers.
//!
//! Every write route runs the same gate in the same order: authenticate the token, check the
//! mandatory headers, verify the signed envelope, drive the lifecycle engine, sign the response.
//! Read routes skip envelope verification (there is no body to verify) but still authenticate
//! and still sign what they return.
//!
//! Handlers are generic over the [`ResourceStore`] backing the engine, so they must be registered
//! with explicit turbofish syntax:
//! `web::post().to(create_consent::<MemoryStore>)`

use actix_web::{get, http::StatusCode, web, web::Data, HttpRequest, HttpResponse};
use log::*;
use payment_sandbox_engine::{
    db_types::{CancellationRequest, ConsentDetails},
    LifecycleApi,
    ResourceStore,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    auth::{TokenAuthenticator, TokenDetails},
    config::AudienceConfig,
    data_objects::ApiResponse,
    errors::ServerError,
    helpers::{
        bearer_token,
        client_certificate,
        interaction_id,
        require_read_headers,
        require_write_headers,
        INTERACTION_ID_HEADER,
        JWT_CONTENT_TYPE,
    },
    signing::ResponseSigner,
    verify::{RequestVerifier, VerifiedRequest},
};

//----------------------------------------------   Health  ------------------------------------------------------------

/// Unauthenticated liveness check.
#[get("/health")]
pub async fn health() -> HttpResponse {
    trace!("💻️ Health check");
    HttpResponse::Ok().content_type("text/plain").body("👍️\n")
}

//----------------------------------------------  Shared plumbing  ----------------------------------------------------

async fn authenticate(req: &HttpRequest, authenticator: &dyn TokenAuthenticator) -> Result<TokenDetails, ServerError> {
    let bearer = bearer_token(req);
    let cert = client_certificate(req);
    authenticator.authenticate(bearer.as_deref(), cert.as_deref()).await.ok_or(ServerError::Unauthorized)
}

fn signed_response(req: &HttpRequest, status: StatusCode, envelope: String) -> HttpResponse {
    let mut builder = HttpResponse::build(status);
    builder.content_type(JWT_CONTENT_TYPE);
    if let Some(id) = interaction_id(req) {
        builder.insert_header((INTERACTION_ID_HEADER, id));
    }
    builder.body(envelope)
}

fn request_body(body: &web::Bytes) -> Result<&str, ServerError> {
    std::str::from_utf8(body).map_err(|_| ServerError::BadSignature)
}

/// The `data` section of a verified payload, as an object. Envelopes that verified but do not
/// carry one are malformed.
fn data_object(payload: &Value) -> Result<Map<String, Value>, ServerError> {
    payload.get("data").and_then(Value::as_object).cloned().ok_or(ServerError::BadSignature)
}

fn cancellation_request(payload: &Value) -> Result<CancellationRequest, ServerError> {
    let value = payload.pointer("/data/cancellation").cloned().ok_or(ServerError::BadSignature)?;
    serde_json::from_value(value).map_err(|_| ServerError::BadSignature)
}

async fn sign_for<T: Serialize>(
    signer: &ResponseSigner,
    verifier: &dyn RequestVerifier,
    client_id: &str,
    body: &T,
) -> Result<String, ServerError> {
    let audience = verifier.organisation_for(client_id).await.ok_or(ServerError::BadSignature)?;
    signer.sign(body, &audience)
}

//----------------------------------------------   Consents  ----------------------------------------------------------

/// Route handler for `POST /consents`.
pub async fn create_consent<B: ResourceStore>(
    req: HttpRequest,
    body: web::Bytes,
    authenticator: Data<dyn TokenAuthenticator>,
    verifier: Data<dyn RequestVerifier>,
    api: Data<LifecycleApi<B>>,
    signer: Data<ResponseSigner>,
    audiences: Data<AudienceConfig>,
) -> Result<HttpResponse, ServerError> {
    let token = authenticate(&req, authenticator.as_ref()).await?;
    require_write_headers(&req)?;
    let signed_body = request_body(&body)?;
    let VerifiedRequest { payload, organisation_id } = verifier
        .verify(&token.client_id, signed_body, &audiences.create_consent)
        .await
        .ok_or(ServerError::BadSignature)?;
    debug!("💻️ Consent creation request from organisation {organisation_id}");
    let data = data_object(&payload)?;
    let details: ConsentDetails =
        serde_json::from_value(Value::Object(data)).map_err(|_| ServerError::BadSignature)?;
    let consent = api.create_consent(details).await?;
    let envelope = signer.sign(&ApiResponse::new(consent), &organisation_id)?;
    Ok(signed_response(&req, StatusCode::CREATED, envelope))
}

/// Route handler for `GET /consents/{consent_id}`.
pub async fn get_consent<B: ResourceStore>(
    req: HttpRequest,
    path: web::Path<String>,
    authenticator: Data<dyn TokenAuthenticator>,
    verifier: Data<dyn RequestVerifier>,
    api: Data<LifecycleApi<B>>,
    signer: Data<ResponseSigner>,
) -> Result<HttpResponse, ServerError> {
    let token = authenticate(&req, authenticator.as_ref()).await?;
    require_read_headers(&req)?;
    let consent_id = path.into_inner();
    let consent = api.consent(&consent_id).await?.ok_or_else(|| ServerError::NotFound(consent_id))?;
    let envelope = sign_for(&signer, verifier.as_ref(), &token.client_id, &ApiResponse::new(consent)).await?;
    Ok(signed_response(&req, StatusCode::OK, envelope))
}

//----------------------------------------------   Payments  ----------------------------------------------------------

/// Route handler for `POST /pix/payments`. The consent the payment executes under comes from the
/// caller's token scope, not from the request body.
pub async fn create_payment<B: ResourceStore>(
    req: HttpRequest,
    body: web::Bytes,
    authenticator: Data<dyn TokenAuthenticator>,
    verifier: Data<dyn RequestVerifier>,
    api: Data<LifecycleApi<B>>,
    signer: Data<ResponseSigner>,
    audiences: Data<AudienceConfig>,
) -> Result<HttpResponse, ServerError> {
    let token = authenticate(&req, authenticator.as_ref()).await?;
    require_write_headers(&req)?;
    let consent_id = token.consent_scope().ok_or(ServerError::Unauthorized)?;
    let signed_body = request_body(&body)?;
    let VerifiedRequest { payload, organisation_id } = verifier
        .verify(&token.client_id, signed_body, &audiences.create_payment)
        .await
        .ok_or(ServerError::BadSignature)?;
    debug!("💻️ Payment creation request from organisation {organisation_id} under consent {consent_id}");
    let details = data_object(&payload)?;
    let payment = api.create_payment(details, consent_id).await?;
    let envelope = signer.sign(&ApiResponse::new(payment), &organisation_id)?;
    Ok(signed_response(&req, StatusCode::CREATED, envelope))
}

/// Route handler for `GET /pix/payments/{payment_id}`.
pub async fn get_payment<B: ResourceStore>(
    req: HttpRequest,
    path: web::Path<String>,
    authenticator: Data<dyn TokenAuthenticator>,
    verifier: Data<dyn RequestVerifier>,
    api: Data<LifecycleApi<B>>,
    signer: Data<ResponseSigner>,
) -> Result<HttpResponse, ServerError> {
    let token = authenticate(&req, authenticator.as_ref()).await?;
    require_read_headers(&req)?;
    let payment_id = path.into_inner();
    let payment = api.payment(&payment_id).await?.ok_or_else(|| ServerError::NotFound(payment_id))?;
    let envelope = sign_for(&signer, verifier.as_ref(), &token.client_id, &ApiResponse::new(payment)).await?;
    Ok(signed_response(&req, StatusCode::OK, envelope))
}

/// Route handler for `PATCH /pix/payments/{payment_id}`. The only patch the sandbox performs is
/// the cancel transition. Patch envelopes carry the same audience as payment creation.
pub async fn cancel_payment<B: ResourceStore>(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Bytes,
    authenticator: Data<dyn TokenAuthenticator>,
    verifier: Data<dyn RequestVerifier>,
    api: Data<LifecycleApi<B>>,
    signer: Data<ResponseSigner>,
    audiences: Data<AudienceConfig>,
) -> Result<HttpResponse, ServerError> {
    let token = authenticate(&req, authenticator.as_ref()).await?;
    require_write_headers(&req)?;
    let signed_body = request_body(&body)?;
    let VerifiedRequest { payload, organisation_id } = verifier
        .verify(&token.client_id, signed_body, &audiences.create_payment)
        .await
        .ok_or(ServerError::BadSignature)?;
    let request = cancellation_request(&payload)?;
    let payment_id = path.into_inner();
    debug!("💻️ Cancellation request for payment {payment_id} from organisation {organisation_id}");
    let payment = api.cancel_payment(&payment_id, &request).await?;
    let envelope = signer.sign(&ApiResponse::new(payment), &organisation_id)?;
    Ok(signed_response(&req, StatusCode::OK, envelope))
}

//----------------------------------------------   Enrollments  -------------------------------------------------------

/// Route handler for `POST /enrollments`.
pub async fn create_enrollment<B: ResourceStore>(
    req: HttpRequest,
    body: web::Bytes,
    authenticator: Data<dyn TokenAuthenticator>,
    verifier: Data<dyn RequestVerifier>,
    api: Data<LifecycleApi<B>>,
    signer: Data<ResponseSigner>,
    audiences: Data<AudienceConfig>,
) -> Result<HttpResponse, ServerError> {
    let token = authenticate(&req, authenticator.as_ref()).await?;
    require_write_headers(&req)?;
    let signed_body = request_body(&body)?;
    let VerifiedRequest { payload, organisation_id } = verifier
        .verify(&token.client_id, signed_body, &audiences.create_enrollment)
        .await
        .ok_or(ServerError::BadSignature)?;
    debug!("💻️ Enrollment creation request from organisation {organisation_id}");
    let details = data_object(&payload)?;
    let enrollment = api.create_enrollment(details).await?;
    let envelope = signer.sign(&ApiResponse::new(enrollment), &organisation_id)?;
    Ok(signed_response(&req, StatusCode::CREATED, envelope))
}

/// Route handler for `GET /enrollments/{enrollment_id}`.
pub async fn get_enrollment<B: ResourceStore>(
    req: HttpRequest,
    path: web::Path<String>,
    authenticator: Data<dyn TokenAuthenticator>,
    verifier: Data<dyn RequestVerifier>,
    api: Data<LifecycleApi<B>>,
    signer: Data<ResponseSigner>,
) -> Result<HttpResponse, ServerError> {
    let token = authenticate(&req, authenticator.as_ref()).await?;
    require_read_headers(&req)?;
    let enrollment_id = path.into_inner();
    let enrollment = api.enrollment(&enrollment_id).await?.ok_or_else(|| ServerError::NotFound(enrollment_id))?;
    let envelope = sign_for(&signer, verifier.as_ref(), &token.client_id, &ApiResponse::new(enrollment)).await?;
    Ok(signed_response(&req, StatusCode::OK, envelope))
}

/// Route handler for `PATCH /enrollments/{enrollment_id}`. The only patch the sandbox performs is
/// the revoke transition. Patch envelopes carry the same audience as enrollment creation.
pub async fn revoke_enrollment<B: ResourceStore>(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Bytes,
    authenticator: Data<dyn TokenAuthenticator>,
    verifier: Data<dyn RequestVerifier>,
    api: Data<LifecycleApi<B>>,
    signer: Data<ResponseSigner>,
    audiences: Data<AudienceConfig>,
) -> Result<HttpResponse, ServerError> {
    let token = authenticate(&req, authenticator.as_ref()).await?;
    require_write_headers(&req)?;
    let signed_body = request_body(&body)?;
    let VerifiedRequest { payload, organisation_id } = verifier
        .verify(&token.client_id, signed_body, &audiences.create_enrollment)
        .await
        .ok_or(ServerError::BadSignature)?;
    let request = cancellation_request(&payload)?;
    let enrollment_id = path.into_inner();
    debug!("💻️ Revocation request for enrollment {enrollment_id} from organisation {organisation_id}");
    let enrollment = api.revoke_enrollment(&enrollment_id, &request).await?;
    let envelope = signer.sign(&ApiResponse::new(enrollment), &organisation_id)?;
    Ok(signed_response(&req, StatusCode::OK, envelope))
}
