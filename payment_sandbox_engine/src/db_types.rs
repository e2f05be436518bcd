use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The actor-side marker stamped into every cancellation produced by this server. Cancellations
/// initiated here always originate from the payment initiator, never the account holder.
pub const CANCELLED_FROM_INITIATOR: &str = "INICIADORA";

//--------------------------------------   ConsentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsentStatus {
    /// Freshly created. The authorisation flow that moves a consent out of this state belongs to
    /// the authorisation server and is not reachable from this engine.
    AwaitingAuthorisation,
    Authorised,
    Rejected,
    Consumed,
}

impl Display for ConsentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsentStatus::AwaitingAuthorisation => write!(f, "AWAITING_AUTHORISATION"),
            ConsentStatus::Authorised => write!(f, "AUTHORISED"),
            ConsentStatus::Rejected => write!(f, "REJECTED"),
            ConsentStatus::Consumed => write!(f, "CONSUMED"),
        }
    }
}

//--------------------------------------   PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    /// The payment instruction has been received. Initial state for every new payment.
    Rcvd,
    /// Cancelled by the initiator. Terminal, and the only transition this engine performs.
    Canc,
    /// Pending settlement. Driven by the settlement flow, not this engine.
    Pdng,
    /// Settled. Driven by the settlement flow, not this engine.
    Acsc,
    /// Rejected by the account servicer. Not reachable from this engine.
    Rjct,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Rcvd => write!(f, "RCVD"),
            PaymentStatus::Canc => write!(f, "CANC"),
            PaymentStatus::Pdng => write!(f, "PDNG"),
            PaymentStatus::Acsc => write!(f, "ACSC"),
            PaymentStatus::Rjct => write!(f, "RJCT"),
        }
    }
}

//--------------------------------------   EnrollmentStatus   --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    /// Freshly created, waiting for device risk signals. Initial state for every new enrollment.
    AwaitingRiskSignals,
    Authorised,
    /// Revoked by the initiator. Terminal, and the only transition this engine performs.
    Revoked,
    Rejected,
}

impl Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrollmentStatus::AwaitingRiskSignals => write!(f, "AWAITING_RISK_SIGNALS"),
            EnrollmentStatus::Authorised => write!(f, "AUTHORISED"),
            EnrollmentStatus::Revoked => write!(f, "REVOKED"),
            EnrollmentStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

//--------------------------------------   Cancellation      ---------------------------------------------------------
/// The cancellation sub-record stamped onto a payment or enrollment when it reaches its terminal
/// state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub cancelled_from: String,
    pub cancelled_at: DateTime<Utc>,
    pub cancelled_by: String,
}

/// What a caller supplies when asking for a cancel/revoke. The initiator marker and the timestamp
/// are stamped by the engine, never taken from the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub cancelled_by: String,
}

impl Cancellation {
    pub fn from_request(request: &CancellationRequest, now: DateTime<Utc>) -> Self {
        Self {
            reason: request.reason.clone(),
            cancelled_from: CANCELLED_FROM_INITIATOR.to_string(),
            cancelled_at: now,
            cancelled_by: request.cancelled_by.clone(),
        }
    }
}

//--------------------------------------   DebtorAccount     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtorAccount {
    pub ispb: String,
    pub issuer: String,
    pub number: String,
    pub account_type: String,
}

impl DebtorAccount {
    /// The fixed demonstration account attached to every payment the sandbox creates.
    pub fn sandbox() -> Self {
        Self {
            ispb: "12345678".to_string(),
            issuer: "1774".to_string(),
            number: "1234567890".to_string(),
            account_type: "CACC".to_string(),
        }
    }
}

//--------------------------------------   Consent           ---------------------------------------------------------
/// The parts of a consent request payload the lifecycle engine carries through. Their inner
/// schemas (user document, creditor data, payment terms) are opaque to this engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentDetails {
    #[serde(default)]
    pub logged_user: Value,
    #[serde(default)]
    pub creditor: Value,
    #[serde(default)]
    pub payment: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consent {
    pub consent_id: String,
    pub status: ConsentStatus,
    pub creation_date_time: DateTime<Utc>,
    pub expiration_date_time: DateTime<Utc>,
    pub status_update_date_time: DateTime<Utc>,
    pub logged_user: Value,
    pub creditor: Value,
    pub payment: Value,
}

impl Consent {
    /// A new consent awaiting authorisation. The sandbox stamps the expiration with the creation
    /// instant; the authorisation flow that would extend it is out of scope.
    pub fn new(consent_id: String, details: ConsentDetails, now: DateTime<Utc>) -> Self {
        Self {
            consent_id,
            status: ConsentStatus::AwaitingAuthorisation,
            creation_date_time: now,
            expiration_date_time: now,
            status_update_date_time: now,
            logged_user: details.logged_user,
            creditor: details.creditor,
            payment: details.payment,
        }
    }
}

//--------------------------------------   PaymentInitiation  --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitiation {
    pub payment_id: String,
    pub consent_id: String,
    pub status: PaymentStatus,
    pub creation_date_time: DateTime<Utc>,
    pub status_update_date_time: DateTime<Utc>,
    pub debtor_account: DebtorAccount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation: Option<Cancellation>,
    /// Instruction fields carried through from the client payload (amount, creditor account,
    /// remittance information). Opaque to the lifecycle engine.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl PaymentInitiation {
    /// A new payment in the received state, pointing at the consent that authorised it and
    /// carrying the fixed sandbox debtor account.
    pub fn new(payment_id: String, consent_id: String, details: Map<String, Value>, now: DateTime<Utc>) -> Self {
        Self {
            payment_id,
            consent_id,
            status: PaymentStatus::Rcvd,
            creation_date_time: now,
            status_update_date_time: now,
            debtor_account: DebtorAccount::sandbox(),
            cancellation: None,
            details,
        }
    }

    /// The terminal cancel transition. Re-applying it to an already-cancelled payment overwrites
    /// the cancellation record and refreshes the status timestamp (last-writer-wins).
    pub fn cancelled(mut self, request: &CancellationRequest, now: DateTime<Utc>) -> Self {
        self.status = PaymentStatus::Canc;
        self.cancellation = Some(Cancellation::from_request(request, now));
        self.status_update_date_time = now;
        self
    }
}

//--------------------------------------   Enrollment        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub enrollment_id: String,
    pub status: EnrollmentStatus,
    pub creation_date_time: DateTime<Utc>,
    pub status_update_date_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation: Option<Cancellation>,
    /// Enrollment fields carried through from the client payload (permissions, debtor account,
    /// device data). Opaque to the lifecycle engine.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Enrollment {
    pub fn new(enrollment_id: String, details: Map<String, Value>, now: DateTime<Utc>) -> Self {
        Self {
            enrollment_id,
            status: EnrollmentStatus::AwaitingRiskSignals,
            creation_date_time: now,
            status_update_date_time: now,
            cancellation: None,
            details,
        }
    }

    /// The terminal revoke transition. Idempotent in the same way as
    /// [`PaymentInitiation::cancelled`].
    pub fn revoked(mut self, request: &CancellationRequest, now: DateTime<Utc>) -> Self {
        self.status = EnrollmentStatus::Revoked;
        self.cancellation = Some(Cancellation::from_request(request, now));
        self.status_update_date_time = now;
        self
    }
}
