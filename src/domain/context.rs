//! Operation Context
//!
//! Metadata about the current request, extracted once at the API edge and
//! threaded through command and read paths for authorization, idempotency
//! and tracing.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use uuid::Uuid;

/// Context for an operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationContext {
    /// The calling participant (TPP identifier)
    pub participant_id: String,

    /// Interaction ID for request correlation, caller-supplied or generated
    pub interaction_id: Uuid,

    /// Consent referenced by this request, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent_id: Option<String>,

    /// Client IP address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<IpAddr>,
}

impl OperationContext {
    /// Create a context for a participant with a fresh interaction ID.
    pub fn new(participant_id: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            interaction_id: Uuid::new_v4(),
            consent_id: None,
            client_ip: None,
        }
    }

    pub fn with_interaction_id(mut self, interaction_id: Uuid) -> Self {
        self.interaction_id = interaction_id;
        self
    }

    pub fn with_consent(mut self, consent_id: impl Into<String>) -> Self {
        self.consent_id = Some(consent_id.into());
        self
    }

    pub fn with_client_ip(mut self, ip: IpAddr) -> Self {
        self.client_ip = Some(ip);
        self
    }

    /// Consent reference or an invalid-request error naming the header.
    pub fn require_consent(&self) -> Result<&str, super::CoreError> {
        self.consent_id
            .as_deref()
            .ok_or_else(|| super::CoreError::InvalidRequest("Missing x-consent-id header".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let interaction_id = Uuid::new_v4();
        let context = OperationContext::new("tpp-001")
            .with_interaction_id(interaction_id)
            .with_consent("CONS-1");

        assert_eq!(context.participant_id, "tpp-001");
        assert_eq!(context.interaction_id, interaction_id);
        assert_eq!(context.consent_id.as_deref(), Some("CONS-1"));
    }

    #[test]
    fn test_require_consent() {
        let context = OperationContext::new("tpp-001");
        assert!(context.require_consent().is_err());

        let context = context.with_consent("CONS-9");
        assert_eq!(context.require_consent().unwrap(), "CONS-9");
    }
}
