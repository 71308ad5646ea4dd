//! Command definitions
//!
//! Commands represent intentions to change the system state. Amounts travel
//! as strings for precise decimal handling and are validated inside the
//! handlers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Command to submit a payment initiation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCommand {
    pub consent_id: String,
    pub debtor_account: String,
    pub creditor_account: String,
    pub amount: String,
    pub currency: String,
    /// Omitted means "execute now"
    pub execution_date: Option<NaiveDate>,
    pub remittance_info: Option<String>,
}

impl PaymentCommand {
    pub fn new(
        consent_id: impl Into<String>,
        debtor_account: impl Into<String>,
        creditor_account: impl Into<String>,
        amount: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            consent_id: consent_id.into(),
            debtor_account: debtor_account.into(),
            creditor_account: creditor_account.into(),
            amount: amount.into(),
            currency: currency.into(),
            execution_date: None,
            remittance_info: None,
        }
    }

    pub fn with_execution_date(mut self, date: NaiveDate) -> Self {
        self.execution_date = Some(date);
        self
    }

    pub fn with_remittance_info(mut self, info: impl Into<String>) -> Self {
        self.remittance_info = Some(info.into());
        self
    }
}

/// Command to request an FX quote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteCommand {
    pub consent_id: String,
    pub settlement_account: String,
    pub sell_currency: String,
    pub buy_currency: String,
    pub amount: String,
}

impl QuoteCommand {
    pub fn new(
        consent_id: impl Into<String>,
        settlement_account: impl Into<String>,
        sell_currency: impl Into<String>,
        buy_currency: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            consent_id: consent_id.into(),
            settlement_account: settlement_account.into(),
            sell_currency: sell_currency.into(),
            buy_currency: buy_currency.into(),
            amount: amount.into(),
        }
    }
}

/// Command to accept a previously quoted offer. Echoes the original quote
/// inputs; acceptance is bound to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptQuoteCommand {
    pub quote_id: Uuid,
    pub consent_id: String,
    pub settlement_account: String,
    pub sell_currency: String,
    pub buy_currency: String,
    pub amount: String,
}

impl AcceptQuoteCommand {
    pub fn new(quote_id: Uuid, quote: &QuoteCommand) -> Self {
        Self {
            quote_id,
            consent_id: quote.consent_id.clone(),
            settlement_account: quote.settlement_account.clone(),
            sell_currency: quote.sell_currency.clone(),
            buy_currency: quote.buy_currency.clone(),
            amount: quote.amount.clone(),
        }
    }
}

/// Command to open an account from an encrypted onboarding application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingCommand {
    pub consent_id: String,
    pub application_ref: String,
    pub encrypted_profile: String,
}

impl OnboardingCommand {
    pub fn new(
        consent_id: impl Into<String>,
        application_ref: impl Into<String>,
        encrypted_profile: impl Into<String>,
    ) -> Self {
        Self {
            consent_id: consent_id.into(),
            application_ref: application_ref.into(),
            encrypted_profile: encrypted_profile.into(),
        }
    }
}
