//! Core Error Taxonomy
//!
//! Business-facing errors that are independent of the web/infrastructure
//! layer. Every failure a command or query can surface is one of these;
//! the API edge translates them to HTTP responses.

use thiserror::Error;

/// Errors produced by the command and read paths.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Consent missing, expired, mismatched, or resource not linked (BOLA).
    /// The message never reveals more than "not linked" to an unauthorized
    /// caller.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Referenced entity absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Same idempotency key, different request fingerprint
    #[error("Idempotency conflict: same key with different request")]
    IdempotencyConflict,

    /// A request with the same idempotency key is still being processed
    #[error("Idempotency key is still being processed")]
    KeyInProgress,

    /// State-specific invariant violated (expired quote, tampered
    /// acceptance fields, already-finalized entity)
    #[error("Business rule violation: {0}")]
    BusinessRuleViolation(String),

    /// Screening/sanctions rejection
    #[error("Compliance violation: {0}")]
    ComplianceViolation(String),

    /// Malformed encrypted input
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Required upstream has no data
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Malformed or incomplete request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Anything unclassified; the message is logged, never returned
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Machine-readable code carried in error responses.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Forbidden(_) => "FORBIDDEN",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::IdempotencyConflict => "IDEMPOTENCY_CONFLICT",
            CoreError::KeyInProgress => "SERVICE_UNAVAILABLE",
            CoreError::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
            CoreError::ComplianceViolation(_) => "COMPLIANCE_VIOLATION",
            CoreError::DecryptionFailed(_) => "INVALID_REQUEST",
            CoreError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            CoreError::InvalidRequest(_) => "INVALID_REQUEST",
            CoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            CoreError::ServiceUnavailable(_) | CoreError::KeyInProgress | CoreError::Internal(_)
        )
    }

    /// Errors the caller may safely retry with the same idempotency key
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::ServiceUnavailable(_) | CoreError::KeyInProgress | CoreError::Internal(_)
        )
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}
