//! Protocol tests for the command handlers
//!
//! Exercise the full write path against in-process collaborators: replay,
//! conflict detection, consent gating, policy outcomes, side-effect
//! accounting and the tamper guard on quote acceptance.

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

use crate::consent::{ConsentAuthorizer, ConsentStore};
use crate::domain::{ConsentContext, CoreError, OperationContext};
use crate::model::{AccountStatus, DealStatus, PaymentStatus, QuoteStatus};
use crate::ports::{
    encrypt_profile, FixedRateSource, HexJsonDecrypter, NameListScreening, Ports,
    RecordingFundsReservation, RecordingPublisher, ThresholdRiskAssessment,
};
use crate::store::{IdempotencyStore, Tables};

use super::{
    content_digest, AcceptQuoteCommand, AcceptQuoteHandler, OnboardingCommand, OnboardingHandler,
    PaymentCommand, PaymentHandler, QuoteCommand, QuoteHandler,
};

const QUOTE_TTL_MINUTES: i64 = 5;

struct Harness {
    consents: Arc<ConsentStore>,
    idempotency: Arc<IdempotencyStore>,
    tables: Arc<Tables>,
    funds: Arc<RecordingFundsReservation>,
    events: Arc<RecordingPublisher>,
    payments: PaymentHandler,
    signed_payments: PaymentHandler,
    quotes: QuoteHandler,
    accepts: AcceptQuoteHandler,
    onboarding: OnboardingHandler,
}

fn harness() -> Harness {
    harness_with(true, &[])
}

fn harness_with(approve_funds: bool, blocked_names: &[&str]) -> Harness {
    let consents = Arc::new(ConsentStore::new());
    let idempotency = Arc::new(IdempotencyStore::new(Duration::hours(24)));
    let tables = Arc::new(Tables::new());
    let authorizer = ConsentAuthorizer::new(consents.clone());

    let funds = Arc::new(if approve_funds {
        RecordingFundsReservation::approving()
    } else {
        RecordingFundsReservation::declining()
    });
    let events = Arc::new(RecordingPublisher::new());
    let mut screening = NameListScreening::new();
    for name in blocked_names {
        screening = screening.with_blocked(name);
    }

    let ports = Ports {
        risk: Arc::new(ThresholdRiskAssessment::new(dec!(10000))),
        funds: funds.clone(),
        rates: Arc::new(FixedRateSource::new().with_rate("AED/USD", dec!(0.27229))),
        screening: Arc::new(screening),
        events: events.clone(),
        decrypter: Arc::new(HexJsonDecrypter),
    };

    Harness {
        payments: PaymentHandler::new(
            idempotency.clone(),
            authorizer.clone(),
            tables.clone(),
            &ports,
            false,
        ),
        signed_payments: PaymentHandler::new(
            idempotency.clone(),
            authorizer.clone(),
            tables.clone(),
            &ports,
            true,
        ),
        quotes: QuoteHandler::new(
            idempotency.clone(),
            authorizer.clone(),
            tables.clone(),
            &ports,
            Duration::minutes(QUOTE_TTL_MINUTES),
        ),
        accepts: AcceptQuoteHandler::new(
            idempotency.clone(),
            authorizer.clone(),
            tables.clone(),
            &ports,
        ),
        onboarding: OnboardingHandler::new(
            idempotency.clone(),
            authorizer,
            tables.clone(),
            &ports,
        ),
        consents,
        idempotency,
        tables,
        funds,
        events,
    }
}

fn seed_consent(harness: &Harness, scope: &str, resource: &str, expires_in: Duration) {
    harness.consents.insert(
        ConsentContext::new(
            "CONS-1",
            "tpp-001",
            "subject-1",
            vec![scope.to_string()],
            vec![resource.to_string()],
            Utc::now() + expires_in,
        )
        .unwrap(),
    );
}

fn ctx() -> OperationContext {
    OperationContext::new("tpp-001")
}

fn payment_command() -> PaymentCommand {
    PaymentCommand::new("CONS-1", "ACC-1", "ACC-2", "100.00", "AED")
}

fn quote_command() -> QuoteCommand {
    QuoteCommand::new("CONS-1", "ACC-1", "AED", "USD", "1000.00")
}

// =========================================================================
// Payments
// =========================================================================

#[tokio::test]
async fn test_payment_replay_is_byte_identical_without_side_effects() {
    let h = harness();
    seed_consent(&h, "payments", "ACC-1", Duration::hours(1));
    let ctx = ctx();
    let now = Utc::now();

    let first = h
        .payments
        .execute(payment_command(), None, "IDEMP-1", &ctx, now)
        .await
        .unwrap();
    assert!(!first.replayed);
    assert_eq!(first.value.status, PaymentStatus::SettlementInProcess);
    assert_eq!(h.funds.call_count(), 1);
    assert_eq!(h.events.event_types(), vec!["PaymentInitiated"]);

    let second = h
        .payments
        .execute(payment_command(), None, "IDEMP-1", &ctx, now)
        .await
        .unwrap();
    assert!(second.replayed);
    assert_eq!(second.value.id, first.value.id);
    assert_eq!(
        serde_json::to_value(&second.value).unwrap(),
        serde_json::to_value(&first.value).unwrap()
    );

    // no side effect fired twice
    assert_eq!(h.funds.call_count(), 1);
    assert_eq!(h.events.events().len(), 1);
}

#[tokio::test]
async fn test_payment_same_key_different_payload_conflicts() {
    let h = harness();
    seed_consent(&h, "payments", "ACC-1", Duration::hours(1));
    let ctx = ctx();
    let now = Utc::now();

    h.payments
        .execute(payment_command(), None, "IDEMP-1", &ctx, now)
        .await
        .unwrap();

    let mut tampered = payment_command();
    tampered.amount = "200.00".to_string();
    let err = h
        .payments
        .execute(tampered, None, "IDEMP-1", &ctx, now)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::IdempotencyConflict);

    // the original result is still replayable
    let replay = h
        .payments
        .execute(payment_command(), None, "IDEMP-1", &ctx, now)
        .await
        .unwrap();
    assert!(replay.replayed);
}

#[tokio::test]
async fn test_future_dated_payment_is_scheduled_without_reservation() {
    let h = harness();
    seed_consent(&h, "payments", "ACC-1", Duration::hours(1));
    let ctx = ctx();
    let now = Utc::now();

    let command = payment_command().with_execution_date(now.date_naive() + Duration::days(3));
    let result = h
        .payments
        .execute(command, None, "IDEMP-1", &ctx, now)
        .await
        .unwrap();

    assert_eq!(result.value.status, PaymentStatus::Scheduled);
    assert_eq!(h.funds.call_count(), 0);
}

#[tokio::test]
async fn test_risk_declined_payment_is_recorded_as_rejected() {
    let h = harness();
    seed_consent(&h, "payments", "ACC-1", Duration::hours(1));
    let ctx = ctx();
    let now = Utc::now();

    let mut command = payment_command();
    command.amount = "20000.00".to_string(); // over the risk threshold
    let result = h
        .payments
        .execute(command.clone(), None, "IDEMP-1", &ctx, now)
        .await
        .unwrap();

    assert_eq!(result.value.status, PaymentStatus::Rejected);
    assert!(result.value.status.is_terminal());
    assert_eq!(h.funds.call_count(), 0);
    assert_eq!(h.events.event_types(), vec!["PaymentInitiated"]);

    // a rejected payment is still a completed command: it replays
    let replay = h
        .payments
        .execute(command, None, "IDEMP-1", &ctx, now)
        .await
        .unwrap();
    assert!(replay.replayed);
    assert_eq!(replay.value.status, PaymentStatus::Rejected);
}

#[tokio::test]
async fn test_failed_funds_reservation_leaves_nothing_behind() {
    let h = harness_with(false, &[]);
    seed_consent(&h, "payments", "ACC-1", Duration::hours(1));
    let ctx = ctx();
    let now = Utc::now();

    let err = h
        .payments
        .execute(payment_command(), None, "IDEMP-1", &ctx, now)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::BusinessRuleViolation(_)));

    // nothing persisted, published or recorded as idempotent
    assert!(h.events.events().is_empty());
    assert!(h.idempotency.find("IDEMP-1", "tpp-001", now).is_none());
}

#[tokio::test]
async fn test_payment_against_unlinked_account_is_bola_rejected() {
    let h = harness();
    seed_consent(&h, "payments", "ACC-1", Duration::hours(1));
    let ctx = ctx();
    let now = Utc::now();

    let mut command = payment_command();
    command.debtor_account = "ACC-9".to_string();
    let err = h
        .payments
        .execute(command, None, "IDEMP-1", &ctx, now)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::forbidden("Resource not linked to consent"));

    // rejected requests never write an idempotency record
    assert!(h.idempotency.find("IDEMP-1", "tpp-001", now).is_none());
    assert_eq!(h.funds.call_count(), 0);
}

#[tokio::test]
async fn test_payment_with_missing_scope_names_the_scope() {
    let h = harness();
    seed_consent(&h, "accounts", "ACC-1", Duration::hours(1));
    let ctx = ctx();

    let err = h
        .payments
        .execute(payment_command(), None, "IDEMP-1", &ctx, Utc::now())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("PAYMENTS"), "got: {}", err);
}

#[tokio::test]
async fn test_payment_with_expired_consent_is_forbidden() {
    let h = harness();
    seed_consent(&h, "payments", "ACC-1", Duration::seconds(0));
    let ctx = ctx();

    let err = h
        .payments
        .execute(payment_command(), None, "IDEMP-1", &ctx, Utc::now())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("expired"), "got: {}", err);
}

#[tokio::test]
async fn test_signed_payment_requires_a_matching_signature() {
    let h = harness();
    seed_consent(&h, "payments", "ACC-1", Duration::hours(1));
    let ctx = ctx();
    let now = Utc::now();

    // missing signature is rejected before any store is touched
    let err = h
        .signed_payments
        .execute(payment_command(), None, "IDEMP-1", &ctx, now)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidRequest(_)));
    assert!(h.idempotency.find("IDEMP-1", "tpp-001", now).is_none());

    // wrong signature is rejected
    let err = h
        .signed_payments
        .execute(payment_command(), Some("deadbeef"), "IDEMP-1", &ctx, now)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidRequest(_)));

    // a signature over the exact payload passes
    let command = payment_command();
    let signature = content_digest(&command).unwrap();
    let result = h
        .signed_payments
        .execute(command, Some(&signature), "IDEMP-1", &ctx, now)
        .await
        .unwrap();
    assert!(!result.replayed);
}

// =========================================================================
// FX quotes and deals
// =========================================================================

#[tokio::test]
async fn test_quote_prices_from_the_rate_source() {
    let h = harness();
    seed_consent(&h, "fx-quotes", "ACC-1", Duration::hours(1));
    let ctx = ctx();
    let now = Utc::now();

    let result = h
        .quotes
        .execute(quote_command(), "IDEMP-Q1", &ctx, now)
        .await
        .unwrap();
    let quote = &result.value;

    assert_eq!(quote.status, QuoteStatus::Quoted);
    assert_eq!(quote.rate, dec!(0.27229));
    assert_eq!(quote.sell_amount, dec!(1000.00));
    assert_eq!(quote.buy_amount, dec!(272.29));
    assert_eq!(quote.expires_at, now + Duration::minutes(QUOTE_TTL_MINUTES));
    assert_eq!(h.events.event_types(), vec!["QuoteCreated"]);
}

#[tokio::test]
async fn test_quote_without_a_rate_is_unavailable() {
    let h = harness();
    seed_consent(&h, "fx-quotes", "ACC-1", Duration::hours(1));
    let ctx = ctx();

    let mut command = quote_command();
    command.buy_currency = "JPY".to_string();
    let err = h
        .quotes
        .execute(command, "IDEMP-Q1", &ctx, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ServiceUnavailable(_)));
    assert!(err.to_string().contains("AED/JPY"));
}

#[tokio::test]
async fn test_accept_books_the_deal_and_replays_the_same_deal_id() {
    let h = harness();
    seed_consent(&h, "fx-quotes", "ACC-1", Duration::hours(1));
    let ctx = ctx();
    let now = Utc::now();

    let quote = h
        .quotes
        .execute(quote_command(), "IDEMP-Q1", &ctx, now)
        .await
        .unwrap()
        .value;

    let accept = AcceptQuoteCommand::new(quote.id, &quote_command());
    let booked = h
        .accepts
        .execute(accept.clone(), "IDEMP-1", &ctx, now)
        .await
        .unwrap();
    assert!(!booked.replayed);
    assert_eq!(booked.value.status, DealStatus::Booked);
    assert_eq!(booked.value.sell_amount, dec!(1000.00));
    assert_eq!(booked.value.buy_amount, dec!(272.29));
    assert_eq!(h.funds.call_count(), 1);
    assert_eq!(h.funds.calls()[0].amount, dec!(1000.00));

    // the quote reached its terminal state
    let stored = h.tables.get_quote(quote.id).unwrap().unwrap();
    assert_eq!(stored.status, QuoteStatus::Booked);

    // replay returns the same deal without reserving again
    let replay = h
        .accepts
        .execute(accept.clone(), "IDEMP-1", &ctx, now)
        .await
        .unwrap();
    assert!(replay.replayed);
    assert_eq!(replay.value.id, booked.value.id);
    assert_eq!(h.funds.call_count(), 1);

    // same key, different payload: conflict
    let mut other = accept;
    other.settlement_account = "ACC-2".to_string();
    let err = h
        .accepts
        .execute(other, "IDEMP-1", &ctx, now)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::IdempotencyConflict);
}

#[tokio::test]
async fn test_accept_with_mutated_fields_is_tamper_rejected() {
    let h = harness();
    seed_consent(&h, "fx-quotes", "ACC-1", Duration::hours(1));
    let ctx = ctx();
    let now = Utc::now();

    let quote = h
        .quotes
        .execute(quote_command(), "IDEMP-Q1", &ctx, now)
        .await
        .unwrap()
        .value;

    let mut accept = AcceptQuoteCommand::new(quote.id, &quote_command());
    accept.amount = "1100.00".to_string();
    let err = h
        .accepts
        .execute(accept, "IDEMP-1", &ctx, now)
        .await
        .unwrap_err();
    assert!(
        err.to_string().contains("do not match the original quote"),
        "got: {}",
        err
    );

    // the tampered attempt must not book or reserve anything
    let stored = h.tables.get_quote(quote.id).unwrap().unwrap();
    assert_eq!(stored.status, QuoteStatus::Quoted);
    assert_eq!(h.funds.call_count(), 0);
}

#[tokio::test]
async fn test_accept_after_offer_expiry_is_rejected() {
    let h = harness();
    seed_consent(&h, "fx-quotes", "ACC-1", Duration::hours(1));
    let ctx = ctx();
    let now = Utc::now();

    let quote = h
        .quotes
        .execute(quote_command(), "IDEMP-Q1", &ctx, now)
        .await
        .unwrap()
        .value;

    // boundary: the offer dies exactly at its expiry
    let at_expiry = now + Duration::minutes(QUOTE_TTL_MINUTES);
    let accept = AcceptQuoteCommand::new(quote.id, &quote_command());
    let err = h
        .accepts
        .execute(accept, "IDEMP-1", &ctx, at_expiry)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("expired"), "got: {}", err);

    let stored = h.tables.get_quote(quote.id).unwrap().unwrap();
    assert_eq!(stored.status, QuoteStatus::Expired);
}

#[tokio::test]
async fn test_accept_on_finalized_quote_is_rejected() {
    let h = harness();
    seed_consent(&h, "fx-quotes", "ACC-1", Duration::hours(1));
    let ctx = ctx();
    let now = Utc::now();

    let quote = h
        .quotes
        .execute(quote_command(), "IDEMP-Q1", &ctx, now)
        .await
        .unwrap()
        .value;

    let accept = AcceptQuoteCommand::new(quote.id, &quote_command());
    h.accepts
        .execute(accept.clone(), "IDEMP-1", &ctx, now)
        .await
        .unwrap();

    // a fresh key against the terminal quote is a business-rule violation
    let err = h
        .accepts
        .execute(accept, "IDEMP-2", &ctx, now)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("already finalized"), "got: {}", err);
    assert_eq!(h.funds.call_count(), 1);
}

#[tokio::test]
async fn test_accept_unknown_quote_is_not_found() {
    let h = harness();
    seed_consent(&h, "fx-quotes", "ACC-1", Duration::hours(1));
    let ctx = ctx();

    let accept = AcceptQuoteCommand::new(Uuid::new_v4(), &quote_command());
    let err = h
        .accepts
        .execute(accept, "IDEMP-1", &ctx, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

// =========================================================================
// Onboarding
// =========================================================================

fn onboarding_command() -> OnboardingCommand {
    let profile = crate::model::CustomerProfile {
        full_name: "Amina Khalid".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 2).unwrap(),
        nationality: "AE".to_string(),
        id_document: "784-1990-1234567-1".to_string(),
    };
    OnboardingCommand::new("CONS-1", "APP-1", encrypt_profile(&profile))
}

#[tokio::test]
async fn test_onboarding_opens_an_active_account() {
    let h = harness();
    seed_consent(&h, "accounts", "APP-1", Duration::hours(1));
    let ctx = ctx();
    let now = Utc::now();

    let result = h
        .onboarding
        .execute(onboarding_command(), "IDEMP-1", &ctx, now)
        .await
        .unwrap();
    let account = &result.value;

    assert_eq!(account.status, AccountStatus::Active);
    assert_eq!(account.holder_name, "Amina Khalid");
    assert_eq!(account.application_ref, "APP-1");
    assert_eq!(h.events.event_types(), vec!["AccountOpened"]);

    // replay keeps the same account and publishes nothing new
    let replay = h
        .onboarding
        .execute(onboarding_command(), "IDEMP-1", &ctx, now)
        .await
        .unwrap();
    assert!(replay.replayed);
    assert_eq!(replay.value.id, account.id);
    assert_eq!(h.events.events().len(), 1);
}

#[tokio::test]
async fn test_screening_rejection_publishes_before_failing() {
    let h = harness_with(true, &["Amina Khalid"]);
    seed_consent(&h, "accounts", "APP-1", Duration::hours(1));
    let ctx = ctx();
    let now = Utc::now();

    let err = h
        .onboarding
        .execute(onboarding_command(), "IDEMP-1", &ctx, now)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ComplianceViolation(_)));

    // the rejection event went out even though the command failed
    assert_eq!(h.events.event_types(), vec!["OnboardingRejected"]);

    // and no idempotency record was written
    assert!(h.idempotency.find("IDEMP-1", "tpp-001", now).is_none());
}

#[tokio::test]
async fn test_malformed_encrypted_payload_fails_decryption() {
    let h = harness();
    seed_consent(&h, "accounts", "APP-1", Duration::hours(1));
    let ctx = ctx();

    let command = OnboardingCommand::new("CONS-1", "APP-1", "not-hex!");
    let err = h
        .onboarding
        .execute(command, "IDEMP-1", &ctx, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DecryptionFailed(_)));
    assert!(h.events.events().is_empty());
}
