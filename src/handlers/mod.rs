//! Command handlers
//!
//! One handler per state-changing command. Every handler runs the same
//! ordered protocol: signature check, idempotency claim, consent
//! authorization, business-rule evaluation, side effects, then persist +
//! publish + record. Rejected requests leave no idempotency record.

mod commands;
mod onboarding_handler;
mod payment_handler;
mod quote_handler;
#[cfg(test)]
mod tests;

pub use commands::{AcceptQuoteCommand, OnboardingCommand, PaymentCommand, QuoteCommand};
pub use onboarding_handler::OnboardingHandler;
pub use payment_handler::PaymentHandler;
pub use quote_handler::{AcceptQuoteHandler, QuoteHandler};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::future::Future;
use uuid::Uuid;

use crate::domain::{Amount, CoreError, CurrencyPair, OperationContext};
use crate::store::{Begin, IdempotencyStore};

/// A command result plus whether it was replayed from the idempotency store.
#[derive(Debug, Clone)]
pub struct Idempotent<T> {
    pub value: T,
    pub replayed: bool,
}

/// SHA-256 hex digest over a value's canonical JSON encoding.
pub(crate) fn content_digest<T: Serialize>(value: &T) -> Result<String, CoreError> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| CoreError::Internal(format!("digest serialization failed: {}", e)))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Request hash for idempotency: the semantically-relevant command fields
/// plus the interaction identifier, never the raw transport encoding.
pub(crate) fn request_fingerprint<T: Serialize>(
    command: &T,
    interaction_id: Uuid,
) -> Result<String, CoreError> {
    let bytes = serde_json::to_vec(command)
        .map_err(|e| CoreError::Internal(format!("fingerprint serialization failed: {}", e)))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hasher.update(interaction_id.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// The inputs an FX quote offer is bound to. Acceptance re-derives this
/// digest from the echoed fields; any mutation fails the transition.
#[derive(Serialize)]
struct QuoteBinding<'a> {
    consent_id: &'a str,
    settlement_account: &'a str,
    pair: String,
    amount: String,
}

pub(crate) fn quote_binding_digest(
    consent_id: &str,
    settlement_account: &str,
    pair: &CurrencyPair,
    amount: &Amount,
) -> Result<String, CoreError> {
    content_digest(&QuoteBinding {
        consent_id,
        settlement_account,
        pair: pair.to_string(),
        amount: amount.to_string(),
    })
}

/// Run a command under the idempotency protocol.
///
/// Claims the key, executes the operation on a fresh claim, records the
/// result on success and releases the claim on failure. A replay
/// deserializes the stored result without re-executing any side effect.
pub(crate) async fn run_idempotent<T, F, Fut>(
    store: &IdempotencyStore,
    idempotency_key: &str,
    context: &OperationContext,
    request_hash: String,
    now: DateTime<Utc>,
    op: F,
) -> Result<Idempotent<T>, CoreError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    if idempotency_key.trim().is_empty() {
        return Err(CoreError::InvalidRequest(
            "Idempotency key must not be empty".into(),
        ));
    }

    match store.begin(idempotency_key, &context.participant_id, &request_hash, now) {
        Begin::Replay(record) => {
            tracing::debug!(
                idempotency_key,
                participant_id = %context.participant_id,
                "Replaying stored command result"
            );
            let value = serde_json::from_value(record.result).map_err(|e| {
                CoreError::Internal(format!("stored idempotent result is unreadable: {}", e))
            })?;
            Ok(Idempotent {
                value,
                replayed: true,
            })
        }
        Begin::Conflict => Err(CoreError::IdempotencyConflict),
        Begin::InFlight => Err(CoreError::KeyInProgress),
        Begin::Started => match op().await {
            Ok(value) => {
                let result = serde_json::to_value(&value).map_err(|e| {
                    CoreError::Internal(format!("result serialization failed: {}", e))
                })?;
                store.complete(
                    idempotency_key,
                    &context.participant_id,
                    &request_hash,
                    result,
                    now,
                );
                Ok(Idempotent {
                    value,
                    replayed: false,
                })
            }
            Err(e) => {
                store.abort(idempotency_key, &context.participant_id);
                Err(e)
            }
        },
    }
}
