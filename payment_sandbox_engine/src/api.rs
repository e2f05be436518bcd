use std::fmt::Debug;

use chrono::Utc;
use log::*;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    db_types::{CancellationRequest, Consent, ConsentDetails, Enrollment, PaymentInitiation},
    errors::ResourceStoreError,
    traits::ResourceStore,
};

//--------------------------------------   IdGenerator       ---------------------------------------------------------
/// Generates the server-side resource identifiers. Consent and enrollment ids carry the
/// configured prefix; payment ids are bare. The uuid v4 suffix is what makes concurrent creates
/// collision-resistant, so there is no counter to contend on.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    consent_prefix: String,
    enrollment_prefix: String,
}

impl IdGenerator {
    pub fn new<S: Into<String>>(consent_prefix: S, enrollment_prefix: S) -> Self {
        Self { consent_prefix: consent_prefix.into(), enrollment_prefix: enrollment_prefix.into() }
    }

    pub fn consent_id(&self) -> String {
        format!("{}{}", self.consent_prefix, Uuid::new_v4())
    }

    pub fn payment_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    pub fn enrollment_id(&self) -> String {
        format!("{}{}", self.enrollment_prefix, Uuid::new_v4())
    }
}

//--------------------------------------   LifecycleApi      ---------------------------------------------------------
/// The lifecycle engine. Every create and every state transition for the three resource kinds
/// goes through here; nothing else mutates the store.
#[derive(Clone)]
pub struct LifecycleApi<B> {
    store: B,
    ids: IdGenerator,
}

impl<B> Debug for LifecycleApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LifecycleApi")
    }
}

impl<B> LifecycleApi<B> {
    pub fn new(store: B, ids: IdGenerator) -> Self {
        Self { store, ids }
    }
}

impl<B> LifecycleApi<B>
where B: ResourceStore
{
    /// Creates a new consent in `AWAITING_AUTHORISATION` and stores it under a freshly generated,
    /// prefixed id.
    pub async fn create_consent(&self, details: ConsentDetails) -> Result<Consent, ResourceStoreError> {
        let now = Utc::now();
        let consent = Consent::new(self.ids.consent_id(), details, now);
        let consent = self.store.insert_consent(consent).await?;
        debug!("📒️ Consent {} created", consent.consent_id);
        Ok(consent)
    }

    pub async fn consent(&self, consent_id: &str) -> Result<Option<Consent>, ResourceStoreError> {
        self.store.fetch_consent(consent_id).await
    }

    /// Creates a new payment in `RCVD`. The consent id comes from the caller's authorized token
    /// scope; the engine does not re-check that the consent exists or is authorisable.
    pub async fn create_payment(
        &self,
        details: Map<String, Value>,
        consent_id: String,
    ) -> Result<PaymentInitiation, ResourceStoreError> {
        let now = Utc::now();
        let payment = PaymentInitiation::new(self.ids.payment_id(), consent_id, details, now);
        let payment = self.store.insert_payment(payment).await?;
        debug!("📒️ Payment {} created against consent {}", payment.payment_id, payment.consent_id);
        Ok(payment)
    }

    pub async fn payment(&self, payment_id: &str) -> Result<Option<PaymentInitiation>, ResourceStoreError> {
        self.store.fetch_payment(payment_id).await
    }

    /// Moves an existing payment to `CANC`. Patching an id that was never created is an error,
    /// never an implicit create.
    pub async fn cancel_payment(
        &self,
        payment_id: &str,
        request: &CancellationRequest,
    ) -> Result<PaymentInitiation, ResourceStoreError> {
        let payment = self.store.cancel_payment(payment_id, request, Utc::now()).await?;
        debug!("📒️ Payment {} cancelled by {}", payment.payment_id, request.cancelled_by);
        Ok(payment)
    }

    pub async fn create_enrollment(&self, details: Map<String, Value>) -> Result<Enrollment, ResourceStoreError> {
        let now = Utc::now();
        let enrollment = Enrollment::new(self.ids.enrollment_id(), details, now);
        let enrollment = self.store.insert_enrollment(enrollment).await?;
        debug!("📒️ Enrollment {} created", enrollment.enrollment_id);
        Ok(enrollment)
    }

    pub async fn enrollment(&self, enrollment_id: &str) -> Result<Option<Enrollment>, ResourceStoreError> {
        self.store.fetch_enrollment(enrollment_id).await
    }

    pub async fn revoke_enrollment(
        &self,
        enrollment_id: &str,
        request: &CancellationRequest,
    ) -> Result<Enrollment, ResourceStoreError> {
        let enrollment = self.store.revoke_enrollment(enrollment_id, request, Utc::now()).await?;
        debug!("📒️ Enrollment {} revoked by {}", enrollment.enrollment_id, request.cancelled_by);
        Ok(enrollment)
    }
}
