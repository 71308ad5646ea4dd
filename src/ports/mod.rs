//! Collaborator ports
//!
//! The side-effecting collaborators a command depends on, expressed as
//! traits and injected through explicit constructor composition. Calls are
//! awaited inline as part of the command; there is no retry queue behind
//! them.

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::domain::{Currency, CurrencyPair, DomainEvent};
use crate::model::CustomerProfile;

pub use memory::{
    encrypt_profile, FixedRateSource, HexJsonDecrypter, NameListScreening,
    RecordingFundsReservation, RecordingPublisher, ThresholdRiskAssessment, TracingPublisher,
};

/// Outcome of a risk assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskDecision {
    Approved,
    Declined { reason: String },
}

/// The semantic view of a payment handed to risk assessment.
#[derive(Debug, Clone)]
pub struct PaymentInitiation {
    pub participant_id: String,
    pub debtor_account: String,
    pub creditor_account: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub execution_date: Option<NaiveDate>,
}

/// A rate observed from the rate source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FxRate {
    pub rate: Decimal,
    pub as_of: DateTime<Utc>,
}

/// Malformed encrypted input.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct DecryptError(pub String);

/// Risk/fraud decision for a payment initiation.
#[async_trait]
pub trait RiskAssessment: Send + Sync {
    async fn assess(&self, initiation: &PaymentInitiation) -> RiskDecision;
}

/// Reserve funds on an account for a pending settlement. Returns whether
/// the reservation was placed.
#[async_trait]
pub trait FundsReservation: Send + Sync {
    async fn reserve(
        &self,
        account: &str,
        amount: Decimal,
        currency: &Currency,
        reservation_key: &str,
    ) -> bool;
}

/// Look up the current rate for a currency pair.
#[async_trait]
pub trait RateLookup: Send + Sync {
    async fn lookup(&self, pair: &CurrencyPair, now: DateTime<Utc>) -> Option<FxRate>;
}

/// Sanctions/AML screening. Returns true when the profile is clear.
#[async_trait]
pub trait ScreeningCheck: Send + Sync {
    async fn screen(&self, profile: &CustomerProfile) -> bool;
}

/// Publish a domain event to the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: DomainEvent);
}

/// Decrypt an onboarding payload into a customer profile.
#[async_trait]
pub trait PayloadDecrypter: Send + Sync {
    async fn decrypt(&self, payload: &str) -> Result<CustomerProfile, DecryptError>;
}

/// The full set of collaborators a command handler may need.
#[derive(Clone)]
pub struct Ports {
    pub risk: Arc<dyn RiskAssessment>,
    pub funds: Arc<dyn FundsReservation>,
    pub rates: Arc<dyn RateLookup>,
    pub screening: Arc<dyn ScreeningCheck>,
    pub events: Arc<dyn EventPublisher>,
    pub decrypter: Arc<dyn PayloadDecrypter>,
}
