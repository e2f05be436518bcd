//! The reference, in-memory store.
//!
//! Three maps behind read-write locks, one per resource kind. Suitable for the sandbox and for
//! tests; everything is lost on restart. There is no eviction and no background sweeping, which
//! is a deliberate property of the reference store.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use chrono::{DateTime, Utc};

use crate::{
    db_types::{CancellationRequest, Consent, Enrollment, PaymentInitiation},
    errors::ResourceStoreError,
    traits::ResourceStore,
};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    consents: Arc<RwLock<HashMap<String, Consent>>>,
    payments: Arc<RwLock<HashMap<String, PaymentInitiation>>>,
    enrollments: Arc<RwLock<HashMap<String, Enrollment>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(map: &str) -> ResourceStoreError {
    ResourceStoreError::StorageError(format!("{map} lock poisoned"))
}

impl ResourceStore for MemoryStore {
    async fn insert_consent(&self, consent: Consent) -> Result<Consent, ResourceStoreError> {
        let mut consents = self.consents.write().map_err(|_| poisoned("consent"))?;
        if consents.contains_key(&consent.consent_id) {
            return Err(ResourceStoreError::DuplicateId(consent.consent_id));
        }
        consents.insert(consent.consent_id.clone(), consent.clone());
        Ok(consent)
    }

    async fn fetch_consent(&self, consent_id: &str) -> Result<Option<Consent>, ResourceStoreError> {
        let consents = self.consents.read().map_err(|_| poisoned("consent"))?;
        Ok(consents.get(consent_id).cloned())
    }

    async fn insert_payment(&self, payment: PaymentInitiation) -> Result<PaymentInitiation, ResourceStoreError> {
        let mut payments = self.payments.write().map_err(|_| poisoned("payment"))?;
        if payments.contains_key(&payment.payment_id) {
            return Err(ResourceStoreError::DuplicateId(payment.payment_id));
        }
        payments.insert(payment.payment_id.clone(), payment.clone());
        Ok(payment)
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<Option<PaymentInitiation>, ResourceStoreError> {
        let payments = self.payments.read().map_err(|_| poisoned("payment"))?;
        Ok(payments.get(payment_id).cloned())
    }

    async fn cancel_payment(
        &self,
        payment_id: &str,
        request: &CancellationRequest,
        now: DateTime<Utc>,
    ) -> Result<PaymentInitiation, ResourceStoreError> {
        // Write lock spans the whole read-modify-write, so concurrent cancels serialize.
        let mut payments = self.payments.write().map_err(|_| poisoned("payment"))?;
        let entry = payments.get_mut(payment_id).ok_or_else(|| ResourceStoreError::NotFound(payment_id.to_string()))?;
        *entry = entry.clone().cancelled(request, now);
        Ok(entry.clone())
    }

    async fn insert_enrollment(&self, enrollment: Enrollment) -> Result<Enrollment, ResourceStoreError> {
        let mut enrollments = self.enrollments.write().map_err(|_| poisoned("enrollment"))?;
        if enrollments.contains_key(&enrollment.enrollment_id) {
            return Err(ResourceStoreError::DuplicateId(enrollment.enrollment_id));
        }
        enrollments.insert(enrollment.enrollment_id.clone(), enrollment.clone());
        Ok(enrollment)
    }

    async fn fetch_enrollment(&self, enrollment_id: &str) -> Result<Option<Enrollment>, ResourceStoreError> {
        let enrollments = self.enrollments.read().map_err(|_| poisoned("enrollment"))?;
        Ok(enrollments.get(enrollment_id).cloned())
    }

    async fn revoke_enrollment(
        &self,
        enrollment_id: &str,
        request: &CancellationRequest,
        now: DateTime<Utc>,
    ) -> Result<Enrollment, ResourceStoreError> {
        let mut enrollments = self.enrollments.write().map_err(|_| poisoned("enrollment"))?;
        let entry =
            enrollments.get_mut(enrollment_id).ok_or_else(|| ResourceStoreError::NotFound(enrollment_id.to_string()))?;
        *entry = entry.clone().revoked(request, now);
        Ok(entry.clone())
    }
}
