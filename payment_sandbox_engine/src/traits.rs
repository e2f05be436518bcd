use chrono::{DateTime, Utc};

use crate::{
    db_types::{CancellationRequest, Consent, Enrollment, PaymentInitiation},
    errors::ResourceStoreError,
};

/// The storage contract for the three resource kinds.
///
/// Backends must uphold the concurrency contract of the sandbox:
/// * `insert_*` is create-if-absent: inserting an id that already exists is an error, never an
///   overwrite.
/// * `fetch_*` treats not-found as a value (`None`), not an error.
/// * `cancel_payment` and `revoke_enrollment` apply the terminal transition as a single atomic
///   read-modify-write per key. Two concurrent cancels on the same id must serialize; the later
///   writer wins, and neither observes a half-applied record.
/// * Records are never deleted or evicted. A stored record stays retrievable until the process
///   ends (or, for a durable backend, indefinitely).
#[allow(async_fn_in_trait)]
pub trait ResourceStore: Clone + Send + Sync {
    async fn insert_consent(&self, consent: Consent) -> Result<Consent, ResourceStoreError>;

    async fn fetch_consent(&self, consent_id: &str) -> Result<Option<Consent>, ResourceStoreError>;

    async fn insert_payment(&self, payment: PaymentInitiation) -> Result<PaymentInitiation, ResourceStoreError>;

    async fn fetch_payment(&self, payment_id: &str) -> Result<Option<PaymentInitiation>, ResourceStoreError>;

    /// Atomically moves the payment to `CANC` and stamps its cancellation record. Fails with
    /// [`ResourceStoreError::NotFound`] when the id is absent; a patch never creates.
    async fn cancel_payment(
        &self,
        payment_id: &str,
        request: &CancellationRequest,
        now: DateTime<Utc>,
    ) -> Result<PaymentInitiation, ResourceStoreError>;

    async fn insert_enrollment(&self, enrollment: Enrollment) -> Result<Enrollment, ResourceStoreError>;

    async fn fetch_enrollment(&self, enrollment_id: &str) -> Result<Option<Enrollment>, ResourceStoreError>;

    /// Atomically moves the enrollment to `REVOKED`. Same contract as [`cancel_payment`].
    ///
    /// [`cancel_payment`]: ResourceStore::cancel_payment
    async fn revoke_enrollment(
        &self,
        enrollment_id: &str,
        request: &CancellationRequest,
        now: DateTime<Utc>,
    ) -> Result<Enrollment, ResourceStoreError>;
}
