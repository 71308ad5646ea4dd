//! In-memory tables
//!
//! Storage rows keyed by primary key, with explicit mapping to and from the
//! domain entities. The rows use primitive representations (string statuses
//! and currency codes) so the domain model stays decoupled from storage.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::domain::{CoreError, Currency};
use crate::model::{
    Account, AccountStatus, DealStatus, FxDeal, FxQuote, Payment, PaymentStatus, QuoteStatus,
};

fn corrupt_row(entity: &str, err: impl std::fmt::Display) -> CoreError {
    CoreError::Internal(format!("corrupt {} row: {}", entity, err))
}

// =========================================================================
// Payment rows
// =========================================================================

#[derive(Debug, Clone)]
pub struct PaymentRow {
    pub id: Uuid,
    pub participant_id: String,
    pub consent_id: String,
    pub debtor_account: String,
    pub creditor_account: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub execution_date: NaiveDate,
    pub remittance_info: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Payment> for PaymentRow {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id,
            participant_id: payment.participant_id.clone(),
            consent_id: payment.consent_id.clone(),
            debtor_account: payment.debtor_account.clone(),
            creditor_account: payment.creditor_account.clone(),
            amount: payment.amount,
            currency: payment.currency.as_str().to_string(),
            status: payment.status.to_string(),
            execution_date: payment.execution_date,
            remittance_info: payment.remittance_info.clone(),
            created_at: payment.created_at,
            updated_at: payment.updated_at,
        }
    }
}

impl TryFrom<PaymentRow> for Payment {
    type Error = CoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status: PaymentStatus = row
            .status
            .parse()
            .map_err(|e| corrupt_row("payment", e))?;
        let currency =
            Currency::new(&row.currency).map_err(|e| corrupt_row("payment", e))?;
        Ok(Payment {
            id: row.id,
            participant_id: row.participant_id,
            consent_id: row.consent_id,
            debtor_account: row.debtor_account,
            creditor_account: row.creditor_account,
            amount: row.amount,
            currency,
            status,
            execution_date: row.execution_date,
            remittance_info: row.remittance_info,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =========================================================================
// Quote rows
// =========================================================================

#[derive(Debug, Clone)]
pub struct QuoteRow {
    pub id: Uuid,
    pub participant_id: String,
    pub consent_id: String,
    pub settlement_account: String,
    pub sell_currency: String,
    pub buy_currency: String,
    pub sell_amount: Decimal,
    pub rate: Decimal,
    pub buy_amount: Decimal,
    pub status: String,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<&FxQuote> for QuoteRow {
    fn from(quote: &FxQuote) -> Self {
        Self {
            id: quote.id,
            participant_id: quote.participant_id.clone(),
            consent_id: quote.consent_id.clone(),
            settlement_account: quote.settlement_account.clone(),
            sell_currency: quote.sell_currency.as_str().to_string(),
            buy_currency: quote.buy_currency.as_str().to_string(),
            sell_amount: quote.sell_amount,
            rate: quote.rate,
            buy_amount: quote.buy_amount,
            status: quote.status.to_string(),
            fingerprint: quote.fingerprint.clone(),
            created_at: quote.created_at,
            expires_at: quote.expires_at,
        }
    }
}

impl TryFrom<QuoteRow> for FxQuote {
    type Error = CoreError;

    fn try_from(row: QuoteRow) -> Result<Self, Self::Error> {
        let status: QuoteStatus = row.status.parse().map_err(|e| corrupt_row("quote", e))?;
        Ok(FxQuote {
            id: row.id,
            participant_id: row.participant_id,
            consent_id: row.consent_id,
            settlement_account: row.settlement_account,
            sell_currency: Currency::new(&row.sell_currency)
                .map_err(|e| corrupt_row("quote", e))?,
            buy_currency: Currency::new(&row.buy_currency)
                .map_err(|e| corrupt_row("quote", e))?,
            sell_amount: row.sell_amount,
            rate: row.rate,
            buy_amount: row.buy_amount,
            status,
            fingerprint: row.fingerprint,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

// =========================================================================
// Deal rows
// =========================================================================

#[derive(Debug, Clone)]
pub struct DealRow {
    pub id: Uuid,
    pub quote_id: Uuid,
    pub participant_id: String,
    pub consent_id: String,
    pub settlement_account: String,
    pub sell_currency: String,
    pub buy_currency: String,
    pub sell_amount: Decimal,
    pub rate: Decimal,
    pub buy_amount: Decimal,
    pub status: String,
    pub booked_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&FxDeal> for DealRow {
    fn from(deal: &FxDeal) -> Self {
        Self {
            id: deal.id,
            quote_id: deal.quote_id,
            participant_id: deal.participant_id.clone(),
            consent_id: deal.consent_id.clone(),
            settlement_account: deal.settlement_account.clone(),
            sell_currency: deal.sell_currency.as_str().to_string(),
            buy_currency: deal.buy_currency.as_str().to_string(),
            sell_amount: deal.sell_amount,
            rate: deal.rate,
            buy_amount: deal.buy_amount,
            status: deal.status.to_string(),
            booked_at: deal.booked_at,
            updated_at: deal.updated_at,
        }
    }
}

impl TryFrom<DealRow> for FxDeal {
    type Error = CoreError;

    fn try_from(row: DealRow) -> Result<Self, Self::Error> {
        let status: DealStatus = row.status.parse().map_err(|e| corrupt_row("deal", e))?;
        Ok(FxDeal {
            id: row.id,
            quote_id: row.quote_id,
            participant_id: row.participant_id,
            consent_id: row.consent_id,
            settlement_account: row.settlement_account,
            sell_currency: Currency::new(&row.sell_currency)
                .map_err(|e| corrupt_row("deal", e))?,
            buy_currency: Currency::new(&row.buy_currency)
                .map_err(|e| corrupt_row("deal", e))?,
            sell_amount: row.sell_amount,
            rate: row.rate,
            buy_amount: row.buy_amount,
            status,
            booked_at: row.booked_at,
            updated_at: row.updated_at,
        })
    }
}

// =========================================================================
// Account rows
// =========================================================================

#[derive(Debug, Clone)]
pub struct AccountRow {
    pub id: Uuid,
    pub participant_id: String,
    pub consent_id: String,
    pub application_ref: String,
    pub holder_name: String,
    pub status: String,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for AccountRow {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            participant_id: account.participant_id.clone(),
            consent_id: account.consent_id.clone(),
            application_ref: account.application_ref.clone(),
            holder_name: account.holder_name.clone(),
            status: account.status.to_string(),
            opened_at: account.opened_at,
            updated_at: account.updated_at,
        }
    }
}

impl TryFrom<AccountRow> for Account {
    type Error = CoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let status: AccountStatus = row.status.parse().map_err(|e| corrupt_row("account", e))?;
        Ok(Account {
            id: row.id,
            participant_id: row.participant_id,
            consent_id: row.consent_id,
            application_ref: row.application_ref,
            holder_name: row.holder_name,
            status,
            opened_at: row.opened_at,
            updated_at: row.updated_at,
        })
    }
}

// =========================================================================
// Tables
// =========================================================================

/// The backing store: one map per entity, keyed by primary key.
#[derive(Debug, Default)]
pub struct Tables {
    payments: RwLock<HashMap<Uuid, PaymentRow>>,
    quotes: RwLock<HashMap<Uuid, QuoteRow>>,
    deals: RwLock<HashMap<Uuid, DealRow>>,
    accounts: RwLock<HashMap<Uuid, AccountRow>>,
}

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_payment(&self, payment: &Payment) {
        self.payments
            .write()
            .expect("RwLock poisoned")
            .insert(payment.id, PaymentRow::from(payment));
    }

    pub fn get_payment(&self, id: Uuid) -> Result<Option<Payment>, CoreError> {
        self.payments
            .read()
            .expect("RwLock poisoned")
            .get(&id)
            .cloned()
            .map(Payment::try_from)
            .transpose()
    }

    pub fn insert_quote(&self, quote: &FxQuote) {
        self.quotes
            .write()
            .expect("RwLock poisoned")
            .insert(quote.id, QuoteRow::from(quote));
    }

    pub fn get_quote(&self, id: Uuid) -> Result<Option<FxQuote>, CoreError> {
        self.quotes
            .read()
            .expect("RwLock poisoned")
            .get(&id)
            .cloned()
            .map(FxQuote::try_from)
            .transpose()
    }

    /// Update a quote's status in place.
    pub fn set_quote_status(&self, id: Uuid, status: QuoteStatus) {
        if let Some(row) = self.quotes.write().expect("RwLock poisoned").get_mut(&id) {
            row.status = status.to_string();
        }
    }

    /// Atomically transition a quote from Quoted to Booked. Returns false
    /// when the quote is missing or no longer open, so two concurrent
    /// accepts cannot both book it.
    pub fn claim_quote_for_booking(&self, id: Uuid) -> bool {
        let mut quotes = self.quotes.write().expect("RwLock poisoned");
        match quotes.get_mut(&id) {
            Some(row) if row.status == QuoteStatus::Quoted.to_string() => {
                row.status = QuoteStatus::Booked.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn insert_deal(&self, deal: &FxDeal) {
        self.deals
            .write()
            .expect("RwLock poisoned")
            .insert(deal.id, DealRow::from(deal));
    }

    pub fn get_deal(&self, id: Uuid) -> Result<Option<FxDeal>, CoreError> {
        self.deals
            .read()
            .expect("RwLock poisoned")
            .get(&id)
            .cloned()
            .map(FxDeal::try_from)
            .transpose()
    }

    pub fn insert_account(&self, account: &Account) {
        self.accounts
            .write()
            .expect("RwLock poisoned")
            .insert(account.id, AccountRow::from(account));
    }

    pub fn get_account(&self, id: Uuid) -> Result<Option<Account>, CoreError> {
        self.accounts
            .read()
            .expect("RwLock poisoned")
            .get(&id)
            .cloned()
            .map(Account::try_from)
            .transpose()
    }
}
