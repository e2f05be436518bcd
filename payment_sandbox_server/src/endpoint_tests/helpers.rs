use std::sync::Arc;

use actix_web::{
    http::{header::HeaderMap, StatusCode},
    test,
    test::TestRequest,
    web,
    web::Data,
    App,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, EncodingKey, Validation};
use payment_sandbox_engine::{IdGenerator, LifecycleApi, MemoryStore};
use serde_json::Value;

use super::mocks::{MockAuthenticator, MockVerifier};
use crate::{
    auth::{TokenAuthenticator, TokenDetails},
    config::AudienceConfig,
    helpers::{IDEMPOTENCY_KEY_HEADER, INTERACTION_ID_HEADER, JWT_CONTENT_TYPE},
    routes::{
        cancel_payment,
        create_consent,
        create_enrollment,
        create_payment,
        get_consent,
        get_enrollment,
        get_payment,
        health,
        revoke_enrollment,
    },
    signing::ResponseSigner,
    verify::RequestVerifier,
};

pub const TEST_SIGNING_KEY: &str = include_str!("./fixtures/signing_key.pem");
pub const TEST_PUBLIC_KEY: &str = include_str!("./fixtures/public_key.pem");
pub const TEST_CLIENT_CERT: &str = include_str!("./fixtures/client_cert.pem");
/// SHA-256 thumbprint of [`TEST_CLIENT_CERT`], base64url without padding.
pub const TEST_CERT_THUMBPRINT: &str = "XxDmYegw6YYfPuA3E08OMrkerfJSR0xaDv7-Xf4Hm68";
/// RSA public modulus of the test signing key, as published in a JWKS.
pub const TEST_RSA_N: &str = "sSC6s22nyDQNm5MIp5ATpKezTqO7WLpJ_k9m8iiHvgHncdpcEv_dSykH_RIpq9txn236dOCUTXEhXDeNDvnXe\
                              WaFrQR7uksdKC_FCl8piLV4KbbCc2OhaLsYDpyW2a0cVc_fuXiKdPkRdMTOZ6QSrm9SPm9mvzuQlOX6kXz2IJ\
                              tpcuVVH1fUh24IRz5HdoZZJJtPzSA6AFvhXl5fSA2cVFmUSz5NvJMd2_uB0vmczCVFDcmo5U9E77TNPgvADYO\
                              Elz4wsSFLIQuw5N-nLb-XfJNPLva1Bzkl30RxfNCRjiY7uy1v-hqXvNL4lWaKZl9ZtTDDKO7g-EWo2jfyR0ZJyw";
pub const TEST_RSA_E: &str = "AQAB";

pub const TEST_ORGANISATION: &str = "TEST_ORG";
pub const CLIENT_ORGANISATION: &str = "CLIENT_ORG";
pub const TEST_INTERACTION_ID: &str = "d78fc4e5-37ca-4da3-adf2-9b082bf92280";

pub fn test_signer() -> ResponseSigner {
    let key = EncodingKey::from_rsa_pem(TEST_SIGNING_KEY.as_bytes()).expect("test signing key is not a valid PEM");
    ResponseSigner::new(key, "test-signing-kid", TEST_ORGANISATION)
}

/// The identity every happy-path test authenticates as.
pub fn token_details() -> TokenDetails {
    TokenDetails {
        active: true,
        token_type: "token_type".to_string(),
        scope: "payments consent:urn:test-consent".to_string(),
        cnf: None,
        client_id: "client-1".to_string(),
    }
}

pub fn lifecycle_api() -> LifecycleApi<MemoryStore> {
    LifecycleApi::new(MemoryStore::new(), IdGenerator::new("urn:sandbox:consent:", "urn:sandbox:enrollment:"))
}

/// Runs one request against a fully wired app and returns status, headers and body.
pub async fn call(
    req: TestRequest,
    authenticator: MockAuthenticator,
    verifier: MockVerifier,
    api: LifecycleApi<MemoryStore>,
) -> (StatusCode, HeaderMap, String) {
    let authenticator: Arc<dyn TokenAuthenticator> = Arc::new(authenticator);
    let verifier: Arc<dyn RequestVerifier> = Arc::new(verifier);
    let app = test::init_service(
        App::new()
            .app_data(Data::new(api))
            .app_data(Data::new(test_signer()))
            .app_data(Data::new(AudienceConfig::default()))
            .app_data(Data::from(authenticator))
            .app_data(Data::from(verifier))
            .service(health)
            .route("/consents", web::post().to(create_consent::<MemoryStore>))
            .route("/consents/{consent_id}", web::get().to(get_consent::<MemoryStore>))
            .route("/pix/payments", web::post().to(create_payment::<MemoryStore>))
            .route("/pix/payments/{payment_id}", web::get().to(get_payment::<MemoryStore>))
            .route("/pix/payments/{payment_id}", web::patch().to(cancel_payment::<MemoryStore>))
            .route("/enrollments", web::post().to(create_enrollment::<MemoryStore>))
            .route("/enrollments/{enrollment_id}", web::get().to(get_enrollment::<MemoryStore>))
            .route("/enrollments/{enrollment_id}", web::patch().to(revoke_enrollment::<MemoryStore>)),
    )
    .await;
    let response = test::call_service(&app, req.to_request()).await;
    let status = response.status();
    let headers = response.headers().clone();
    let body = String::from_utf8(test::read_body(response).await.to_vec()).expect("response body was not UTF-8");
    (status, headers, body)
}

/// Decodes a signed response envelope with the server's public key and returns its claims.
pub fn decode_signed_response(envelope: &str, audience: &str) -> Value {
    let key = DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).expect("test public key is not a valid PEM");
    let mut validation = Validation::new(Algorithm::PS256);
    validation.set_audience(&[audience]);
    validation.set_issuer(&[TEST_ORGANISATION]);
    decode::<Value>(envelope, &key, &validation).expect("response envelope did not verify").claims
}

/// A write request carrying the full mandatory header set and an opaque bearer token.
pub fn write_request(method: &str, uri: &str) -> TestRequest {
    let req = match method {
        "PATCH" => TestRequest::patch(),
        _ => TestRequest::post(),
    };
    req.uri(uri)
        .insert_header(("Content-Type", JWT_CONTENT_TYPE))
        .insert_header((INTERACTION_ID_HEADER, TEST_INTERACTION_ID))
        .insert_header((IDEMPOTENCY_KEY_HEADER, "idem-key-1"))
        .insert_header(("Authorization", "Bearer opaque-token"))
        .set_payload("a.signed.envelope")
}

pub fn read_request(uri: &str) -> TestRequest {
    TestRequest::get()
        .uri(uri)
        .insert_header((INTERACTION_ID_HEADER, TEST_INTERACTION_ID))
        .insert_header(("Authorization", "Bearer opaque-token"))
}
