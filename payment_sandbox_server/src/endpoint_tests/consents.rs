use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::{json, Value};

use super::{
    helpers::{
        call,
        decode_signed_response,
        lifecycle_api,
        read_request,
        token_details,
        write_request,
        CLIENT_ORGANISATION,
        TEST_INTERACTION_ID,
        TEST_ORGANISATION,
    },
    mocks::{MockAuthenticator, MockVerifier},
};
use crate::{
    helpers::{INTERACTION_ID_HEADER, JWT_CONTENT_TYPE},
    verify::VerifiedRequest,
};

fn accepting_authenticator() -> MockAuthenticator {
    let mut authenticator = MockAuthenticator::new();
    authenticator.expect_authenticate().returning(|_, _| Some(token_details()));
    authenticator
}

fn verifier_with_payload(payload: Value) -> MockVerifier {
    let mut verifier = MockVerifier::new();
    verifier.expect_verify().returning(move |_, _, _| {
        Some(VerifiedRequest { payload: payload.clone(), organisation_id: CLIENT_ORGANISATION.to_string() })
    });
    verifier.expect_organisation_for().returning(|_| Some(CLIENT_ORGANISATION.to_string()));
    verifier
}

fn consent_payload() -> Value {
    json!({
        "iss": CLIENT_ORGANISATION,
        "aud": "createConsent",
        "data": {
            "loggedUser": { "document": { "identification": "11111111111", "rel": "CPF" } },
            "creditor": { "name": "Padaria Mendes", "personType": "PESSOA_JURIDICA" },
            "payment": { "amount": "100.00", "currency": "BRL", "type": "PIX" },
        }
    })
}

#[actix_web::test]
async fn create_consent_happy_path() {
    let req = write_request("POST", "/consents");
    let (status, headers, body) =
        call(req, accepting_authenticator(), verifier_with_payload(consent_payload()), lifecycle_api()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(headers.get("Content-Type").unwrap(), JWT_CONTENT_TYPE);
    assert_eq!(headers.get(INTERACTION_ID_HEADER).unwrap(), TEST_INTERACTION_ID);

    let claims = decode_signed_response(&body, CLIENT_ORGANISATION);
    let data = &claims["data"];
    assert!(data["consentId"].as_str().unwrap().starts_with("urn:sandbox:consent:"));
    assert_eq!(data["status"], "AWAITING_AUTHORISATION");
    assert_eq!(data["expirationDateTime"], data["creationDateTime"]);
    assert_eq!(data["loggedUser"]["document"]["rel"], "CPF");
    assert_eq!(claims["iss"], TEST_ORGANISATION);
    assert_eq!(claims["aud"], CLIENT_ORGANISATION);
    assert!(claims["jti"].is_string());
    assert_eq!(claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap(), 300);
}

#[actix_web::test]
async fn create_consent_without_a_token_is_unauthorised() {
    let mut authenticator = MockAuthenticator::new();
    authenticator.expect_authenticate().returning(|_, _| None);
    let req = write_request("POST", "/consents");
    let (status, _, body) =
        call(req, authenticator, verifier_with_payload(consent_payload()), lifecycle_api()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let envelope: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(envelope["errors"][0]["code"], "UNAUTHORIZED");
}

#[actix_web::test]
async fn create_consent_without_idempotency_key_is_rejected() {
    let req = TestRequest::post()
        .uri("/consents")
        .insert_header(("Content-Type", JWT_CONTENT_TYPE))
        .insert_header((INTERACTION_ID_HEADER, TEST_INTERACTION_ID))
        .insert_header(("Authorization", "Bearer opaque-token"))
        .set_payload("a.signed.envelope");
    let (status, _, body) =
        call(req, accepting_authenticator(), verifier_with_payload(consent_payload()), lifecycle_api()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let envelope: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(envelope["errors"][0]["code"], "MISSING_MANDATORY_HEADERS");
}

#[actix_web::test]
async fn create_consent_with_a_bad_signature_is_rejected() {
    let mut verifier = MockVerifier::new();
    verifier.expect_verify().returning(|_, _, _| None);
    let req = write_request("POST", "/consents");
    let (status, _, body) = call(req, accepting_authenticator(), verifier, lifecycle_api()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let envelope: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(envelope["errors"][0]["code"], "BAD_SIGNATURE");
}

#[actix_web::test]
async fn create_then_fetch_round_trip() {
    let api = lifecycle_api();
    let req = write_request("POST", "/consents");
    let (status, _, body) =
        call(req, accepting_authenticator(), verifier_with_payload(consent_payload()), api.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let created = decode_signed_response(&body, CLIENT_ORGANISATION);
    let consent_id = created["data"]["consentId"].as_str().unwrap().to_string();

    let req = read_request(&format!("/consents/{consent_id}"));
    let (status, _, body) =
        call(req, accepting_authenticator(), verifier_with_payload(consent_payload()), api).await;
    assert_eq!(status, StatusCode::OK);
    let fetched = decode_signed_response(&body, CLIENT_ORGANISATION);
    assert_eq!(fetched["data"], created["data"]);
    // Each envelope is freshly signed even when the resource is unchanged.
    assert_ne!(fetched["jti"], created["jti"]);
}

#[actix_web::test]
async fn fetching_an_unknown_consent_is_not_found() {
    let req = read_request("/consents/urn:sandbox:consent:ghost");
    let (status, _, body) =
        call(req, accepting_authenticator(), verifier_with_payload(consent_payload()), lifecycle_api()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let envelope: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(envelope["errors"][0]["code"], "NOT_FOUND");
}
