//! # Payment Initiation Sandbox server
//! This crate hosts the security gate and HTTP surface of the payment initiation sandbox. It is
//! responsible for:
//! * Authenticating callers via OAuth2 client-credentials tokens bound to a mutual-TLS client
//!   certificate (proof of possession).
//! * Verifying that inbound request bodies are signed envelopes from a registered client
//!   organisation, using dynamically discovered key sets.
//! * Driving the resource lifecycle engine ([`payment_sandbox_engine`]) for consents, payment
//!   initiations and SCA enrollments.
//! * Signing every response body under the server's own key before it leaves the process.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more
//! information. Two switches (`PIS_VALIDATE_TOKEN`, `PIS_VALIDATE_SIGNATURE`) select between the
//! production gate and the reference mode; both default to on.
//!
//! ## Routes
//! * `/health`: liveness check.
//! * `POST /consents`, `GET /consents/{id}`
//! * `POST /pix/payments`, `GET /pix/payments/{id}`, `PATCH /pix/payments/{id}`
//! * `POST /enrollments`, `GET /enrollments/{id}`, `PATCH /enrollments/{id}`

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod routes;
pub mod secret;
pub mod server;
pub mod signing;
pub mod trust;
pub mod verify;

#[cfg(test)]
mod endpoint_tests;
