//! API Routes
//!
//! HTTP endpoint definitions: the thin transport edge over the command
//! handlers and the read service.

use axum::{
    extract::{Extension, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{ConsentContext, CoreError, OperationContext};
use crate::error::AppError;
use crate::handlers::{
    AcceptQuoteCommand, Idempotent, OnboardingCommand, PaymentCommand, QuoteCommand,
};
use crate::model::{Account, AccountStatus, DealStatus, FxDeal, FxQuote, Payment, PaymentStatus, QuoteStatus};
use crate::read::{ReadOutcome, ReadResult};
use crate::state::AppState;

use super::middleware::{
    CACHE_OUTCOME_HEADER, IDEMPOTENCY_KEY_HEADER, IDEMPOTENCY_OUTCOME_HEADER, SIGNATURE_HEADER,
};

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsentSeedRequest {
    pub consent_id: String,
    pub participant_id: String,
    pub subject_id: String,
    pub scopes: Vec<String>,
    pub resource_ids: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsentSeedResponse {
    pub consent_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub consent_id: String,
    pub debtor_account: String,
    pub creditor_account: String,
    pub amount: String,
    pub currency: String,
    #[serde(default)]
    pub execution_date: Option<NaiveDate>,
    #[serde(default)]
    pub remittance_info: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub payment_id: Uuid,
    pub status: PaymentStatus,
    pub amount: Decimal,
    pub currency: String,
    pub execution_date: NaiveDate,
    pub idempotency_replay: bool,
    pub created_at: DateTime<Utc>,
}

impl PaymentResponse {
    fn from_result(result: &Idempotent<Payment>) -> Self {
        let payment = &result.value;
        Self {
            payment_id: payment.id,
            status: payment.status,
            amount: payment.amount,
            currency: payment.currency.as_str().to_string(),
            execution_date: payment.execution_date,
            idempotency_replay: result.replayed,
            created_at: payment.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub consent_id: String,
    pub settlement_account: String,
    pub sell_currency: String,
    pub buy_currency: String,
    pub amount: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub quote_id: Uuid,
    pub status: QuoteStatus,
    pub sell_currency: String,
    pub buy_currency: String,
    pub sell_amount: Decimal,
    pub rate: Decimal,
    pub buy_amount: Decimal,
    pub expires_at: DateTime<Utc>,
    pub idempotency_replay: bool,
}

impl QuoteResponse {
    fn from_result(result: &Idempotent<FxQuote>) -> Self {
        let quote = &result.value;
        Self {
            quote_id: quote.id,
            status: quote.status,
            sell_currency: quote.sell_currency.as_str().to_string(),
            buy_currency: quote.buy_currency.as_str().to_string(),
            sell_amount: quote.sell_amount,
            rate: quote.rate,
            buy_amount: quote.buy_amount,
            expires_at: quote.expires_at,
            idempotency_replay: result.replayed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptQuoteRequest {
    pub consent_id: String,
    pub settlement_account: String,
    pub sell_currency: String,
    pub buy_currency: String,
    pub amount: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DealResponse {
    pub deal_id: Uuid,
    pub quote_id: Uuid,
    pub status: DealStatus,
    pub sell_currency: String,
    pub buy_currency: String,
    pub sell_amount: Decimal,
    pub rate: Decimal,
    pub buy_amount: Decimal,
    pub idempotency_replay: bool,
    pub booked_at: DateTime<Utc>,
}

impl DealResponse {
    fn from_deal(deal: &FxDeal, replayed: bool) -> Self {
        Self {
            deal_id: deal.id,
            quote_id: deal.quote_id,
            status: deal.status,
            sell_currency: deal.sell_currency.as_str().to_string(),
            buy_currency: deal.buy_currency.as_str().to_string(),
            sell_amount: deal.sell_amount,
            rate: deal.rate,
            buy_amount: deal.buy_amount,
            idempotency_replay: replayed,
            booked_at: deal.booked_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OnboardingRequest {
    pub consent_id: String,
    pub application_ref: String,
    pub encrypted_profile: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub account_id: Uuid,
    pub application_ref: String,
    pub holder_name: String,
    pub status: AccountStatus,
    pub idempotency_replay: bool,
    pub opened_at: DateTime<Utc>,
}

impl AccountResponse {
    fn from_result(result: &Idempotent<Account>) -> Self {
        let account = &result.value;
        Self {
            account_id: account.id,
            application_ref: account.application_ref.clone(),
            holder_name: account.holder_name.clone(),
            status: account.status,
            idempotency_replay: result.replayed,
            opened_at: account.opened_at,
        }
    }
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Consent seeding (stands in for the external issuance subsystem)
        .route("/consents", post(seed_consent))
        // Payments
        .route("/payments", post(submit_payment))
        .route("/payments/:payment_id", get(get_payment))
        // FX
        .route("/fx/quotes", post(request_quote))
        .route("/fx/quotes/:quote_id/accept", post(accept_quote))
        .route("/fx/deals/:deal_id", get(get_deal))
        // Onboarding
        .route("/onboarding/accounts", post(open_account))
        .route("/onboarding/accounts/:account_id", get(get_account))
}

fn edge(context: &OperationContext) -> impl Fn(CoreError) -> AppError + '_ {
    move |e| AppError::from(e).with_interaction_id(context.interaction_id)
}

fn require_idempotency_key(
    headers: &HeaderMap,
    context: &OperationContext,
) -> Result<String, AppError> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AppError::from(CoreError::InvalidRequest(format!(
                "Missing {} header",
                IDEMPOTENCY_KEY_HEADER
            )))
            .with_interaction_id(context.interaction_id)
        })
}

fn replay_outcome<T>(result: &Idempotent<T>) -> &'static str {
    if result.replayed {
        "HIT"
    } else {
        "MISS"
    }
}

fn fresh_response<T, B: Serialize>(outcome: &ReadOutcome<T>, body: B) -> Response {
    let cache = if outcome.cache_hit { "HIT" } else { "MISS" };
    (
        StatusCode::OK,
        [
            ("etag", outcome.etag.clone()),
            (CACHE_OUTCOME_HEADER, cache.to_string()),
        ],
        Json(body),
    )
        .into_response()
}

fn not_modified_response(etag: String) -> Response {
    (StatusCode::NOT_MODIFIED, [("etag", etag)]).into_response()
}

fn if_none_match(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
}

// =========================================================================
// POST /consents
// =========================================================================

/// Seed a consent into the registry
async fn seed_consent(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<ConsentSeedRequest>,
) -> Result<impl IntoResponse, AppError> {
    let consent = ConsentContext::new(
        request.consent_id.clone(),
        request.participant_id,
        request.subject_id,
        request.scopes,
        request.resource_ids,
        request.expires_at,
    )
    .map_err(edge(&context))?;

    state.consents.insert(consent);

    Ok((
        StatusCode::CREATED,
        Json(ConsentSeedResponse {
            consent_id: request.consent_id,
        }),
    ))
}

// =========================================================================
// POST /payments
// =========================================================================

/// Submit a payment initiation
async fn submit_payment(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    headers: HeaderMap,
    Json(request): Json<PaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let idempotency_key = require_idempotency_key(&headers, &context)?;
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    let command = PaymentCommand {
        consent_id: request.consent_id,
        debtor_account: request.debtor_account,
        creditor_account: request.creditor_account,
        amount: request.amount,
        currency: request.currency,
        execution_date: request.execution_date,
        remittance_info: request.remittance_info,
    };

    let result = state
        .payments
        .execute(command, signature, &idempotency_key, &context, Utc::now())
        .await
        .map_err(edge(&context))?;

    Ok((
        StatusCode::CREATED,
        [(IDEMPOTENCY_OUTCOME_HEADER, replay_outcome(&result))],
        Json(PaymentResponse::from_result(&result)),
    ))
}

// =========================================================================
// GET /payments/:payment_id
// =========================================================================

/// Read a payment
async fn get_payment(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    headers: HeaderMap,
    Path(payment_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let result = state
        .reads
        .payment(payment_id, &context, if_none_match(&headers), Utc::now())
        .map_err(edge(&context))?;

    Ok(match result {
        ReadResult::NotModified { etag } => not_modified_response(etag),
        ReadResult::Fresh(outcome) => {
            let payment = &outcome.value;
            let body = PaymentResponse {
                payment_id: payment.id,
                status: payment.status,
                amount: payment.amount,
                currency: payment.currency.as_str().to_string(),
                execution_date: payment.execution_date,
                idempotency_replay: false,
                created_at: payment.created_at,
            };
            fresh_response(&outcome, body)
        }
    })
}

// =========================================================================
// POST /fx/quotes
// =========================================================================

/// Request an FX quote
async fn request_quote(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    headers: HeaderMap,
    Json(request): Json<QuoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let idempotency_key = require_idempotency_key(&headers, &context)?;

    let command = QuoteCommand {
        consent_id: request.consent_id,
        settlement_account: request.settlement_account,
        sell_currency: request.sell_currency,
        buy_currency: request.buy_currency,
        amount: request.amount,
    };

    let result = state
        .quotes
        .execute(command, &idempotency_key, &context, Utc::now())
        .await
        .map_err(edge(&context))?;

    Ok((
        StatusCode::CREATED,
        [(IDEMPOTENCY_OUTCOME_HEADER, replay_outcome(&result))],
        Json(QuoteResponse::from_result(&result)),
    ))
}

// =========================================================================
// POST /fx/quotes/:quote_id/accept
// =========================================================================

/// Accept a quoted offer into a booked deal
async fn accept_quote(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    headers: HeaderMap,
    Path(quote_id): Path<Uuid>,
    Json(request): Json<AcceptQuoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let idempotency_key = require_idempotency_key(&headers, &context)?;

    let command = AcceptQuoteCommand {
        quote_id,
        consent_id: request.consent_id,
        settlement_account: request.settlement_account,
        sell_currency: request.sell_currency,
        buy_currency: request.buy_currency,
        amount: request.amount,
    };

    let result = state
        .accepts
        .execute(command, &idempotency_key, &context, Utc::now())
        .await
        .map_err(edge(&context))?;

    Ok((
        StatusCode::CREATED,
        [(IDEMPOTENCY_OUTCOME_HEADER, replay_outcome(&result))],
        Json(DealResponse::from_deal(&result.value, result.replayed)),
    ))
}

// =========================================================================
// GET /fx/deals/:deal_id
// =========================================================================

/// Read a booked deal
async fn get_deal(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    headers: HeaderMap,
    Path(deal_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let result = state
        .reads
        .deal(deal_id, &context, if_none_match(&headers), Utc::now())
        .map_err(edge(&context))?;

    Ok(match result {
        ReadResult::NotModified { etag } => not_modified_response(etag),
        ReadResult::Fresh(outcome) => {
            let body = DealResponse::from_deal(&outcome.value, false);
            fresh_response(&outcome, body)
        }
    })
}

// =========================================================================
// POST /onboarding/accounts
// =========================================================================

/// Open an account from an encrypted onboarding application
async fn open_account(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    headers: HeaderMap,
    Json(request): Json<OnboardingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let idempotency_key = require_idempotency_key(&headers, &context)?;

    let command = OnboardingCommand {
        consent_id: request.consent_id,
        application_ref: request.application_ref,
        encrypted_profile: request.encrypted_profile,
    };

    let result = state
        .onboarding
        .execute(command, &idempotency_key, &context, Utc::now())
        .await
        .map_err(edge(&context))?;

    Ok((
        StatusCode::CREATED,
        [(IDEMPOTENCY_OUTCOME_HEADER, replay_outcome(&result))],
        Json(AccountResponse::from_result(&result)),
    ))
}

// =========================================================================
// GET /onboarding/accounts/:account_id
// =========================================================================

/// Read an account
async fn get_account(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    headers: HeaderMap,
    Path(account_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let result = state
        .reads
        .account(account_id, &context, if_none_match(&headers), Utc::now())
        .map_err(edge(&context))?;

    Ok(match result {
        ReadResult::NotModified { etag } => not_modified_response(etag),
        ReadResult::Fresh(outcome) => {
            let account = &outcome.value;
            let body = AccountResponse {
                account_id: account.id,
                application_ref: account.application_ref.clone(),
                holder_name: account.holder_name.clone(),
                status: account.status,
                idempotency_replay: false,
                opened_at: account.opened_at,
            };
            fresh_response(&outcome, body)
        }
    })
}
