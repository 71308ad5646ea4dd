//! Application state
//!
//! Explicit constructor composition of the stores, the authorizer, the
//! handlers and the read service. Shared across request tasks.

use std::sync::Arc;

use crate::config::Config;
use crate::consent::{ConsentAuthorizer, ConsentStore};
use crate::handlers::{AcceptQuoteHandler, OnboardingHandler, PaymentHandler, QuoteHandler};
use crate::ports::Ports;
use crate::read::ReadService;
use crate::store::{IdempotencyStore, Tables};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub consents: Arc<ConsentStore>,
    pub tables: Arc<Tables>,
    pub payments: Arc<PaymentHandler>,
    pub quotes: Arc<QuoteHandler>,
    pub accepts: Arc<AcceptQuoteHandler>,
    pub onboarding: Arc<OnboardingHandler>,
    pub reads: Arc<ReadService>,
}

impl AppState {
    pub fn new(config: &Config, ports: Ports) -> Self {
        let consents = Arc::new(ConsentStore::new());
        let tables = Arc::new(Tables::new());
        let idempotency = Arc::new(IdempotencyStore::new(config.idempotency_ttl()));
        let authorizer = ConsentAuthorizer::new(consents.clone());

        let payments = Arc::new(PaymentHandler::new(
            idempotency.clone(),
            authorizer.clone(),
            tables.clone(),
            &ports,
            config.require_payment_signature,
        ));
        let quotes = Arc::new(QuoteHandler::new(
            idempotency.clone(),
            authorizer.clone(),
            tables.clone(),
            &ports,
            config.quote_offer_ttl(),
        ));
        let accepts = Arc::new(AcceptQuoteHandler::new(
            idempotency.clone(),
            authorizer.clone(),
            tables.clone(),
            &ports,
        ));
        let onboarding = Arc::new(OnboardingHandler::new(
            idempotency,
            authorizer.clone(),
            tables.clone(),
            &ports,
        ));
        let reads = Arc::new(ReadService::new(
            authorizer,
            tables.clone(),
            config.cache_ttl(),
            config.cache_capacity,
        ));

        Self {
            consents,
            tables,
            payments,
            quotes,
            accepts,
            onboarding,
            reads,
        }
    }
}
