use actix_web::http::StatusCode;
use serde_json::{json, Value};

use super::{
    helpers::{call, decode_signed_response, lifecycle_api, read_request, token_details, write_request, CLIENT_ORGANISATION},
    mocks::{MockAuthenticator, MockVerifier},
};
use crate::{auth::TokenDetails, verify::VerifiedRequest};

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

fn payment_payload() -> Value {
    json!({
        "iss": CLIENT_ORGANISATION,
        "aud": "createPayment",
        "data": {
            "payment": { "amount": "250.00", "currency": "BRL" },
            "creditorAccount": { "ispb": "87654321", "number": "9876543210", "accountType": "CACC" },
            "remittanceInformation": "rent",
        }
    })
}

#[actix_web::test]
async fn created_payment_takes_its_consent_from_the_token_scope() {
    let req = write_request("POST", "/pix/payments");
    let (status, _, body) =
        call(req, accepting_authenticator(), verifier_with_payload(payment_payload()), lifecycle_api()).await;
    assert_eq!(status, StatusCode::CREATED);
    let claims = decode_signed_response(&body, CLIENT_ORGANISATION);
    let data = &claims["data"];
    // token_details() carries the scope "payments consent:urn:test-consent"
    assert_eq!(data["consentId"], "urn:test-consent");
    assert_eq!(data["status"], "RCVD");
    assert_eq!(data["debtorAccount"]["ispb"], "12345678");
    assert_eq!(data["remittanceInformation"], "rent");
    assert!(!data["paymentId"].as_str().unwrap().is_empty());
}

#[actix_web::test]
async fn a_token_without_a_consent_scope_cannot_create_payments() {
    let mut authenticator = MockAuthenticator::new();
    authenticator.expect_authenticate().returning(|_, _| {
        Some(TokenDetails { scope: "payments".to_string(), ..token_details() })
    });
    let req = write_request("POST", "/pix/payments");
    let (status, _, body) =
        call(req, authenticator, verifier_with_payload(payment_payload()), lifecycle_api()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let envelope: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(envelope["errors"][0]["code"], "UNAUTHORIZED");
}

#[actix_web::test]
async fn cancel_payment_end_to_end() {
    let api = lifecycle_api();
    let req = write_request("POST", "/pix/payments");
    let (status, _, body) =
        call(req, accepting_authenticator(), verifier_with_payload(payment_payload()), api.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let payment_id =
        decode_signed_response(&body, CLIENT_ORGANISATION)["data"]["paymentId"].as_str().unwrap().to_string();

    let cancel_payload = json!({
        "iss": CLIENT_ORGANISATION,
        "aud": "createPayment",
        "data": {
            "status": "CANC",
            "cancellation": { "cancelledBy": "ORGANISATION", "reason": "requested by payer" },
        }
    });
    let req = write_request("PATCH", &format!("/pix/payments/{payment_id}"));
    let (status, _, body) =
        call(req, accepting_authenticator(), verifier_with_payload(cancel_payload), api.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let data = decode_signed_response(&body, CLIENT_ORGANISATION)["data"].clone();
    assert_eq!(data["status"], "CANC");
    assert_eq!(data["cancellation"]["cancelledFrom"], "INICIADORA");
    assert_eq!(data["cancellation"]["cancelledBy"], "ORGANISATION");
    assert_eq!(data["cancellation"]["reason"], "requested by payer");

    // The cancellation is visible on a subsequent read.
    let req = read_request(&format!("/pix/payments/{payment_id}"));
    let (status, _, body) =
        call(req, accepting_authenticator(), verifier_with_payload(payment_payload()), api).await;
    assert_eq!(status, StatusCode::OK);
    let fetched = decode_signed_response(&body, CLIENT_ORGANISATION)["data"].clone();
    assert_eq!(fetched["status"], "CANC");
}

#[actix_web::test]
async fn cancelling_an_unknown_payment_is_not_found() {
    let cancel_payload = json!({
        "data": { "cancellation": { "cancelledBy": "ORGANISATION" } }
    });
    let req = write_request("PATCH", "/pix/payments/ghost");
    let (status, _, body) =
        call(req, accepting_authenticator(), verifier_with_payload(cancel_payload), lifecycle_api()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let envelope: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(envelope["errors"][0]["code"], "NOT_FOUND");
}

#[actix_web::test]
async fn a_patch_without_a_cancellation_section_is_malformed() {
    let payload = json!({ "data": { "status": "CANC" } });
    let req = write_request("PATCH", "/pix/payments/ghost");
    let (status, _, body) =
        call(req, accepting_authenticator(), verifier_with_payload(payload), lifecycle_api()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let envelope: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(envelope["errors"][0]["code"], "BAD_SIGNATURE");
}
