use actix_web::http::StatusCode;
use serde_json::{json, Value};

use super::{
    helpers::{call, decode_signed_response, lifecycle_api, token_details, write_request, CLIENT_ORGANISATION},
    mocks::{MockAuthenticator, MockVerifier},
};
use crate::verify::VerifiedRequest;

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

fn enrollment_payload() -> Value {
    json!({
        "iss": CLIENT_ORGANISATION,
        "aud": "createEnrollment",
        "data": {
            "permissions": ["PAYMENTS_INITIATE"],
            "debtorAccount": { "ispb": "12345678", "number": "1234567890", "accountType": "CACC" },
        }
    })
}

fn revoke_payload() -> Value {
    json!({
        "data": { "cancellation": { "cancelledBy": "USER", "reason": "DESCADASTRAMENTO" } }
    })
}

#[actix_web::test]
async fn created_enrollment_awaits_risk_signals() {
    let req = write_request("POST", "/enrollments");
    let (status, _, body) =
        call(req, accepting_authenticator(), verifier_with_payload(enrollment_payload()), lifecycle_api()).await;
    assert_eq!(status, StatusCode::CREATED);
    let data = decode_signed_response(&body, CLIENT_ORGANISATION)["data"].clone();
    assert!(data["enrollmentId"].as_str().unwrap().starts_with("urn:sandbox:enrollment:"));
    assert_eq!(data["status"], "AWAITING_RISK_SIGNALS");
    assert_eq!(data["permissions"][0], "PAYMENTS_INITIATE");
}

#[actix_web::test]
async fn revoke_enrollment_end_to_end() {
    let api = lifecycle_api();
    let req = write_request("POST", "/enrollments");
    let (status, _, body) =
        call(req, accepting_authenticator(), verifier_with_payload(enrollment_payload()), api.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let enrollment_id =
        decode_signed_response(&body, CLIENT_ORGANISATION)["data"]["enrollmentId"].as_str().unwrap().to_string();

    let req = write_request("PATCH", &format!("/enrollments/{enrollment_id}"));
    let (status, _, body) =
        call(req, accepting_authenticator(), verifier_with_payload(revoke_payload()), api).await;
    assert_eq!(status, StatusCode::OK);
    let data = decode_signed_response(&body, CLIENT_ORGANISATION)["data"].clone();
    assert_eq!(data["status"], "REVOKED");
    assert_eq!(data["cancellation"]["cancelledFrom"], "INICIADORA");
    assert_eq!(data["cancellation"]["cancelledBy"], "USER");
}

#[actix_web::test]
async fn revoking_twice_reapplies_the_terminal_state() {
    let api = lifecycle_api();
    let req = write_request("POST", "/enrollments");
    let (_, _, body) =
        call(req, accepting_authenticator(), verifier_with_payload(enrollment_payload()), api.clone()).await;
    let enrollment_id =
        decode_signed_response(&body, CLIENT_ORGANISATION)["data"]["enrollmentId"].as_str().unwrap().to_string();

    let req = write_request("PATCH", &format!("/enrollments/{enrollment_id}"));
    let (status, _, _) =
        call(req, accepting_authenticator(), verifier_with_payload(revoke_payload()), api.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let second_revoke = json!({
        "data": { "cancellation": { "cancelledBy": "ORGANISATION" } }
    });
    let req = write_request("PATCH", &format!("/enrollments/{enrollment_id}"));
    let (status, _, body) =
        call(req, accepting_authenticator(), verifier_with_payload(second_revoke), api).await;
    assert_eq!(status, StatusCode::OK);
    let data = decode_signed_response(&body, CLIENT_ORGANISATION)["data"].clone();
    assert_eq!(data["status"], "REVOKED");
    // Last writer wins on the cancellation record.
    assert_eq!(data["cancellation"]["cancelledBy"], "ORGANISATION");
    assert!(data["cancellation"].get("reason").is_none());
}
