//! Consent authorization
//!
//! Holds issued consents and evaluates every command and read against the
//! requested scope, resource and participant. The resource-linkage check
//! runs even when the resource exists in the backing store, so a valid
//! consent for one resource can never read another party's data.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::{normalize_scope, ConsentContext, CoreError};

/// In-memory consent registry, seeded by the external issuance subsystem.
#[derive(Debug, Default)]
pub struct ConsentStore {
    consents: RwLock<HashMap<String, ConsentContext>>,
}

impl ConsentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, consent: ConsentContext) {
        self.consents
            .write()
            .expect("RwLock poisoned")
            .insert(consent.consent_id.clone(), consent);
    }

    pub fn get(&self, consent_id: &str) -> Option<ConsentContext> {
        self.consents
            .read()
            .expect("RwLock poisoned")
            .get(consent_id)
            .cloned()
    }
}

/// Evaluates a consent against a requested (scope, resource, participant).
#[derive(Debug, Clone)]
pub struct ConsentAuthorizer {
    store: Arc<ConsentStore>,
}

impl ConsentAuthorizer {
    pub fn new(store: Arc<ConsentStore>) -> Self {
        Self { store }
    }

    /// Authorize a request, returning the consent on success.
    ///
    /// Checks run in order: existence, participant, expiry (exclusive),
    /// scope (normalized), resource linkage. Each failure is a Forbidden
    /// classification; none reveals more than "not linked" about resources
    /// the caller is not entitled to.
    pub fn authorize(
        &self,
        consent_id: &str,
        scope: &str,
        resource_id: &str,
        participant_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ConsentContext, CoreError> {
        let consent = self
            .store
            .get(consent_id)
            .ok_or_else(|| CoreError::forbidden("Consent not found"))?;

        if consent.participant_id != participant_id {
            return Err(CoreError::forbidden("Consent participant mismatch"));
        }

        if !consent.is_active(now) {
            return Err(CoreError::forbidden("Consent expired"));
        }

        if !consent.has_scope(scope) {
            return Err(CoreError::Forbidden(format!(
                "Consent is missing scope {}",
                normalize_scope(scope)
            )));
        }

        if !consent.is_linked(resource_id) {
            return Err(CoreError::forbidden("Resource not linked to consent"));
        }

        Ok(consent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn authorizer_with(consent: ConsentContext) -> ConsentAuthorizer {
        let store = Arc::new(ConsentStore::new());
        store.insert(consent);
        ConsentAuthorizer::new(store)
    }

    fn consent(expires_at: DateTime<Utc>) -> ConsentContext {
        ConsentContext::new(
            "CONS-1",
            "tpp-001",
            "subject-1",
            vec!["payments".to_string()],
            vec!["ACC-1".to_string()],
            expires_at,
        )
        .unwrap()
    }

    #[test]
    fn test_authorized_request_passes() {
        let now = Utc::now();
        let authorizer = authorizer_with(consent(now + Duration::hours(1)));

        let result = authorizer.authorize("CONS-1", "payments", "ACC-1", "tpp-001", now);
        assert!(result.is_ok());
        assert_eq!(result.unwrap().consent_id, "CONS-1");
    }

    #[test]
    fn test_unknown_consent_is_forbidden() {
        let now = Utc::now();
        let authorizer = authorizer_with(consent(now + Duration::hours(1)));

        let err = authorizer
            .authorize("CONS-404", "payments", "ACC-1", "tpp-001", now)
            .unwrap_err();
        assert_eq!(err, CoreError::forbidden("Consent not found"));
    }

    #[test]
    fn test_participant_mismatch_is_forbidden() {
        let now = Utc::now();
        let authorizer = authorizer_with(consent(now + Duration::hours(1)));

        let err = authorizer
            .authorize("CONS-1", "payments", "ACC-1", "tpp-999", now)
            .unwrap_err();
        assert!(err.to_string().contains("participant mismatch"));
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let now = Utc::now();
        let authorizer = authorizer_with(consent(now));

        // now == expires_at is inactive
        let err = authorizer
            .authorize("CONS-1", "payments", "ACC-1", "tpp-001", now)
            .unwrap_err();
        assert!(err.to_string().contains("expired"));

        // just before expiry is active
        let authorizer = authorizer_with(consent(now + Duration::seconds(1)));
        assert!(authorizer
            .authorize("CONS-1", "payments", "ACC-1", "tpp-001", now)
            .is_ok());
    }

    #[test]
    fn test_missing_scope_names_the_scope() {
        let now = Utc::now();
        let authorizer = authorizer_with(consent(now + Duration::hours(1)));

        let err = authorizer
            .authorize("CONS-1", "fx-quotes", "ACC-1", "tpp-001", now)
            .unwrap_err();
        assert!(err.to_string().contains("FXQUOTES"));
    }

    #[test]
    fn test_scope_matches_across_spellings() {
        let now = Utc::now();
        let authorizer = authorizer_with(consent(now + Duration::hours(1)));

        for spelling in ["payments", "PAYMENTS", "Pay-Ments", "pay_ments"] {
            assert!(
                authorizer
                    .authorize("CONS-1", spelling, "ACC-1", "tpp-001", now)
                    .is_ok(),
                "spelling {} should authorize",
                spelling
            );
        }
    }

    #[test]
    fn test_unlinked_resource_is_rejected() {
        let now = Utc::now();
        let authorizer = authorizer_with(consent(now + Duration::hours(1)));

        // the resource may well exist in the backing store; the consent
        // still does not link it
        let err = authorizer
            .authorize("CONS-1", "payments", "ACC-2", "tpp-001", now)
            .unwrap_err();
        assert_eq!(err, CoreError::forbidden("Resource not linked to consent"));
    }
}
