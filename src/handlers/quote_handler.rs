//! FX Quote Handlers
//!
//! Requesting a quote prices an offer from the rate source and binds it to
//! its inputs. Accepting a quote is the one re-entrant transition: it
//! re-derives the input binding, rejects tampered or expired offers, and
//! books the deal at most once.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::consent::ConsentAuthorizer;
use crate::domain::{Amount, CoreError, Currency, CurrencyPair, DomainEvent, OperationContext};
use crate::model::{DealStatus, FxDeal, FxQuote, QuoteStatus};
use crate::policy;
use crate::ports::{EventPublisher, FundsReservation, Ports, RateLookup};
use crate::store::{IdempotencyStore, Tables};

use super::{
    quote_binding_digest, request_fingerprint, run_idempotent, AcceptQuoteCommand, Idempotent,
    QuoteCommand,
};

const FX_SCOPE: &str = "fx-quotes";

fn parse_fx_inputs(
    sell_currency: &str,
    buy_currency: &str,
    amount: &str,
) -> Result<(CurrencyPair, Amount), CoreError> {
    let sell = Currency::new(sell_currency)
        .map_err(|e| CoreError::InvalidRequest(format!("Invalid sell currency: {}", e)))?;
    let buy = Currency::new(buy_currency)
        .map_err(|e| CoreError::InvalidRequest(format!("Invalid buy currency: {}", e)))?;
    let pair = CurrencyPair::new(sell, buy)
        .map_err(|e| CoreError::InvalidRequest(format!("Invalid currency pair: {}", e)))?;
    let amount: Amount = amount
        .parse()
        .map_err(|e| CoreError::InvalidRequest(format!("Invalid amount: {}", e)))?;
    Ok((pair, amount))
}

// =========================================================================
// QuoteHandler
// =========================================================================

/// Handler for FX quote requests
pub struct QuoteHandler {
    idempotency: Arc<IdempotencyStore>,
    authorizer: ConsentAuthorizer,
    tables: Arc<Tables>,
    rates: Arc<dyn RateLookup>,
    events: Arc<dyn EventPublisher>,
    offer_ttl: Duration,
}

impl QuoteHandler {
    pub fn new(
        idempotency: Arc<IdempotencyStore>,
        authorizer: ConsentAuthorizer,
        tables: Arc<Tables>,
        ports: &Ports,
        offer_ttl: Duration,
    ) -> Self {
        Self {
            idempotency,
            authorizer,
            tables,
            rates: ports.rates.clone(),
            events: ports.events.clone(),
            offer_ttl,
        }
    }

    /// Execute the quote command
    pub async fn execute(
        &self,
        command: QuoteCommand,
        idempotency_key: &str,
        context: &OperationContext,
        now: DateTime<Utc>,
    ) -> Result<Idempotent<FxQuote>, CoreError> {
        let request_hash = request_fingerprint(&command, context.interaction_id)?;

        run_idempotent(
            &self.idempotency,
            idempotency_key,
            context,
            request_hash,
            now,
            || self.price(command, context, now),
        )
        .await
    }

    async fn price(
        &self,
        command: QuoteCommand,
        context: &OperationContext,
        now: DateTime<Utc>,
    ) -> Result<FxQuote, CoreError> {
        self.authorizer.authorize(
            &command.consent_id,
            FX_SCOPE,
            &command.settlement_account,
            &context.participant_id,
            now,
        )?;

        let (pair, amount) =
            parse_fx_inputs(&command.sell_currency, &command.buy_currency, &command.amount)?;

        let rate = self
            .rates
            .lookup(&pair, now)
            .await
            .ok_or_else(|| {
                CoreError::ServiceUnavailable(format!("No rate available for {}", pair))
            })?;

        let buy_amount = amount
            .convert(rate.rate)
            .map_err(|e| CoreError::InvalidRequest(format!("Unquotable amount: {}", e)))?;

        let fingerprint = quote_binding_digest(
            &command.consent_id,
            &command.settlement_account,
            &pair,
            &amount,
        )?;

        let quote = FxQuote {
            id: Uuid::new_v4(),
            participant_id: context.participant_id.clone(),
            consent_id: command.consent_id,
            settlement_account: command.settlement_account,
            sell_currency: pair.sell.clone(),
            buy_currency: pair.buy.clone(),
            sell_amount: amount.value(),
            rate: rate.rate,
            buy_amount: buy_amount.value(),
            status: QuoteStatus::Quoted,
            fingerprint,
            created_at: now,
            expires_at: now + self.offer_ttl,
        };

        self.tables.insert_quote(&quote);
        self.events
            .publish(DomainEvent::QuoteCreated {
                quote_id: quote.id,
                participant_id: quote.participant_id.clone(),
                pair: pair.to_string(),
                rate: quote.rate,
                offer_expires_at: quote.expires_at,
                occurred_at: now,
            })
            .await;

        tracing::info!(
            quote_id = %quote.id,
            pair = %pair,
            rate = %quote.rate,
            "FX quote offered"
        );

        Ok(quote)
    }
}

// =========================================================================
// AcceptQuoteHandler
// =========================================================================

/// Handler for accepting a quoted offer into a booked deal
pub struct AcceptQuoteHandler {
    idempotency: Arc<IdempotencyStore>,
    authorizer: ConsentAuthorizer,
    tables: Arc<Tables>,
    funds: Arc<dyn FundsReservation>,
    events: Arc<dyn EventPublisher>,
}

impl AcceptQuoteHandler {
    pub fn new(
        idempotency: Arc<IdempotencyStore>,
        authorizer: ConsentAuthorizer,
        tables: Arc<Tables>,
        ports: &Ports,
    ) -> Self {
        Self {
            idempotency,
            authorizer,
            tables,
            funds: ports.funds.clone(),
            events: ports.events.clone(),
        }
    }

    /// Execute the accept command
    pub async fn execute(
        &self,
        command: AcceptQuoteCommand,
        idempotency_key: &str,
        context: &OperationContext,
        now: DateTime<Utc>,
    ) -> Result<Idempotent<FxDeal>, CoreError> {
        let request_hash = request_fingerprint(&command, context.interaction_id)?;

        run_idempotent(
            &self.idempotency,
            idempotency_key,
            context,
            request_hash,
            now,
            || self.book(command, context, now),
        )
        .await
    }

    async fn book(
        &self,
        command: AcceptQuoteCommand,
        context: &OperationContext,
        now: DateTime<Utc>,
    ) -> Result<FxDeal, CoreError> {
        self.authorizer.authorize(
            &command.consent_id,
            FX_SCOPE,
            &command.settlement_account,
            &context.participant_id,
            now,
        )?;

        let quote = self
            .tables
            .get_quote(command.quote_id)?
            .ok_or_else(|| CoreError::not_found(format!("FX quote {}", command.quote_id)))?;

        // another participant's quote is indistinguishable from an unlinked one
        if quote.participant_id != context.participant_id {
            return Err(CoreError::forbidden("Resource not linked to consent"));
        }

        if quote.status.is_terminal() {
            return Err(CoreError::BusinessRuleViolation(
                "Quote is already finalized".into(),
            ));
        }

        if policy::quote_offer_expired(now, quote.expires_at) {
            self.tables.set_quote_status(quote.id, QuoteStatus::Expired);
            return Err(CoreError::BusinessRuleViolation("Quote offer expired".into()));
        }

        // acceptance is bound to the original inputs
        let (pair, amount) =
            parse_fx_inputs(&command.sell_currency, &command.buy_currency, &command.amount)?;
        let binding = quote_binding_digest(
            &command.consent_id,
            &command.settlement_account,
            &pair,
            &amount,
        )?;
        if binding != quote.fingerprint {
            return Err(CoreError::BusinessRuleViolation(
                "Acceptance fields do not match the original quote".into(),
            ));
        }

        // claim the quote before the side effect so a concurrent accept
        // cannot book twice; released again if the reservation fails
        if !self.tables.claim_quote_for_booking(quote.id) {
            return Err(CoreError::BusinessRuleViolation(
                "Quote is already finalized".into(),
            ));
        }

        let deal_id = Uuid::new_v4();
        let reserved = self
            .funds
            .reserve(
                &quote.settlement_account,
                quote.sell_amount,
                &quote.sell_currency,
                &deal_id.to_string(),
            )
            .await;
        if !reserved {
            self.tables.set_quote_status(quote.id, QuoteStatus::Quoted);
            return Err(CoreError::BusinessRuleViolation(
                "Funds reservation declined".into(),
            ));
        }

        let deal = FxDeal {
            id: deal_id,
            quote_id: quote.id,
            participant_id: quote.participant_id.clone(),
            consent_id: quote.consent_id.clone(),
            settlement_account: quote.settlement_account.clone(),
            sell_currency: quote.sell_currency.clone(),
            buy_currency: quote.buy_currency.clone(),
            sell_amount: quote.sell_amount,
            rate: quote.rate,
            buy_amount: quote.buy_amount,
            status: DealStatus::Booked,
            booked_at: now,
            updated_at: now,
        };

        self.tables.insert_deal(&deal);
        self.events
            .publish(DomainEvent::DealBooked {
                deal_id: deal.id,
                quote_id: deal.quote_id,
                participant_id: deal.participant_id.clone(),
                pair: pair.to_string(),
                sell_amount: deal.sell_amount,
                buy_amount: deal.buy_amount,
                occurred_at: now,
            })
            .await;

        tracing::info!(
            deal_id = %deal.id,
            quote_id = %deal.quote_id,
            "FX deal booked"
        );

        Ok(deal)
    }
}
