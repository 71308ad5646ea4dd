//! API Middleware
//!
//! Builds the operation context from the protocol headers and logs
//! requests with sensitive headers masked. The interaction ID is echoed on
//! every response for correlation.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::domain::{CoreError, OperationContext};
use crate::error::AppError;

/// Header carrying the calling participant (stands in for transport-level
/// client authentication)
pub const PARTICIPANT_HEADER: &str = "x-participant-id";
/// Caller-supplied correlation identifier, generated when absent
pub const INTERACTION_HEADER: &str = "x-fapi-interaction-id";
/// Consent referenced by read requests
pub const CONSENT_HEADER: &str = "x-consent-id";
/// Idempotency key required on write commands
pub const IDEMPOTENCY_KEY_HEADER: &str = "x-idempotency-key";
/// Detached payload signature for signed command types
pub const SIGNATURE_HEADER: &str = "x-payload-signature";
/// Replay indicator on write responses: HIT or MISS
pub const IDEMPOTENCY_OUTCOME_HEADER: &str = "x-idempotency-outcome";
/// Cache indicator on read responses: HIT or MISS
pub const CACHE_OUTCOME_HEADER: &str = "x-cache-outcome";

// =========================================================================
// Context middleware
// =========================================================================

/// Extract the operation context from headers and echo the interaction ID
/// on the response.
pub async fn context_middleware(
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let interaction_id = headers
        .get(INTERACTION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let participant_id = match headers.get(PARTICIPANT_HEADER).and_then(|v| v.to_str().ok()) {
        Some(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => {
            return Err(AppError::from(CoreError::InvalidRequest(format!(
                "Missing {} header",
                PARTICIPANT_HEADER
            )))
            .with_interaction_id(interaction_id)
            .into_response());
        }
    };

    let mut context =
        OperationContext::new(participant_id).with_interaction_id(interaction_id);

    if let Some(consent_id) = headers.get(CONSENT_HEADER).and_then(|v| v.to_str().ok()) {
        if !consent_id.trim().is_empty() {
            context = context.with_consent(consent_id.trim());
        }
    }

    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&interaction_id.to_string()) {
        response.headers_mut().insert(INTERACTION_HEADER, value);
    }
    Ok(response)
}

// =========================================================================
// Request logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    SIGNATURE_HEADER,
];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let masked_value = if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

/// Request logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let headers = mask_headers_for_logging(request.headers());

    let context = request.extensions().get::<OperationContext>().cloned();
    let interaction_id = context.as_ref().map(|ctx| ctx.interaction_id);
    let participant_id = context.map(|ctx| ctx.participant_id);

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        interaction_id = ?interaction_id,
        participant_id = ?participant_id,
        headers = ?headers,
        "Incoming request"
    );

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        interaction_id = ?interaction_id,
        "Request completed"
    );

    response
}
