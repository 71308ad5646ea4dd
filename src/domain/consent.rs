//! Consent Context
//!
//! A time-bound, scope-bound authorization granted by a resource owner to a
//! participant. Consents are issued by an external subsystem and consumed
//! read-only here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::CoreError;

/// Normalize a scope string for comparison: uppercase, punctuation stripped.
/// "Read-Policies", "ReadPolicies" and "read_policies" are all equivalent.
pub fn normalize_scope(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase()
}

/// A consent as evaluated by the authorizer.
///
/// # Invariants
/// - Scopes and resource IDs are non-empty strings after normalization
/// - Expiry is exclusive: the consent is active iff `expires_at > now`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentContext {
    pub consent_id: String,
    pub participant_id: String,
    pub subject_id: String,
    scopes: HashSet<String>,
    resource_ids: HashSet<String>,
    pub expires_at: DateTime<Utc>,
}

impl ConsentContext {
    pub fn new(
        consent_id: impl Into<String>,
        participant_id: impl Into<String>,
        subject_id: impl Into<String>,
        scopes: impl IntoIterator<Item = String>,
        resource_ids: impl IntoIterator<Item = String>,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        let mut normalized_scopes = HashSet::new();
        for scope in scopes {
            let normalized = normalize_scope(&scope);
            if normalized.is_empty() {
                return Err(CoreError::InvalidRequest(format!(
                    "Consent scope is empty after normalization: {:?}",
                    scope
                )));
            }
            normalized_scopes.insert(normalized);
        }

        let mut linked = HashSet::new();
        for resource_id in resource_ids {
            let trimmed = resource_id.trim().to_string();
            if trimmed.is_empty() {
                return Err(CoreError::InvalidRequest(
                    "Consent resource ID must not be empty".into(),
                ));
            }
            linked.insert(trimmed);
        }

        if normalized_scopes.is_empty() {
            return Err(CoreError::InvalidRequest(
                "Consent must carry at least one scope".into(),
            ));
        }
        if linked.is_empty() {
            return Err(CoreError::InvalidRequest(
                "Consent must link at least one resource".into(),
            ));
        }

        Ok(Self {
            consent_id: consent_id.into(),
            participant_id: participant_id.into(),
            subject_id: subject_id.into(),
            scopes: normalized_scopes,
            resource_ids: linked,
            expires_at,
        })
    }

    /// Active iff the expiry lies strictly in the future.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(&normalize_scope(scope))
    }

    pub fn is_linked(&self, resource_id: &str) -> bool {
        self.resource_ids.contains(resource_id.trim())
    }
}
