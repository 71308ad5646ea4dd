//! In-process port implementations
//!
//! Deterministic collaborators for the binary and for tests. Production
//! deployments replace these with adapters to the real risk engine, ledger,
//! rate feed, screening provider and event bus.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::domain::{Currency, CurrencyPair, DomainEvent};
use crate::model::CustomerProfile;

use super::{
    DecryptError, EventPublisher, FundsReservation, FxRate, PayloadDecrypter, PaymentInitiation,
    RateLookup, RiskAssessment, RiskDecision, ScreeningCheck,
};

/// Approves anything at or under a configured amount, declines the rest.
#[derive(Debug)]
pub struct ThresholdRiskAssessment {
    decline_over: Decimal,
}

impl ThresholdRiskAssessment {
    pub fn new(decline_over: Decimal) -> Self {
        Self { decline_over }
    }
}

#[async_trait]
impl RiskAssessment for ThresholdRiskAssessment {
    async fn assess(&self, initiation: &PaymentInitiation) -> RiskDecision {
        if initiation.amount > self.decline_over {
            RiskDecision::Declined {
                reason: format!("amount exceeds risk threshold {}", self.decline_over),
            }
        } else {
            RiskDecision::Approved
        }
    }
}

/// Records every reservation request and answers with a fixed verdict.
#[derive(Debug)]
pub struct RecordingFundsReservation {
    approve: bool,
    calls: Mutex<Vec<ReservationCall>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationCall {
    pub account: String,
    pub amount: Decimal,
    pub currency: String,
    pub reservation_key: String,
}

impl RecordingFundsReservation {
    pub fn approving() -> Self {
        Self {
            approve: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn declining() -> Self {
        Self {
            approve: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ReservationCall> {
        self.calls.lock().expect("Mutex poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("Mutex poisoned").len()
    }
}

#[async_trait]
impl FundsReservation for RecordingFundsReservation {
    async fn reserve(
        &self,
        account: &str,
        amount: Decimal,
        currency: &Currency,
        reservation_key: &str,
    ) -> bool {
        self.calls.lock().expect("Mutex poisoned").push(ReservationCall {
            account: account.to_string(),
            amount,
            currency: currency.as_str().to_string(),
            reservation_key: reservation_key.to_string(),
        });
        self.approve
    }
}

/// Serves rates from a fixed table keyed by "SELL/BUY".
#[derive(Debug, Default)]
pub struct FixedRateSource {
    rates: HashMap<String, Decimal>,
}

impl FixedRateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, pair: &str, rate: Decimal) -> Self {
        self.rates.insert(pair.to_string(), rate);
        self
    }
}

#[async_trait]
impl RateLookup for FixedRateSource {
    async fn lookup(&self, pair: &CurrencyPair, now: DateTime<Utc>) -> Option<FxRate> {
        self.rates
            .get(&pair.to_string())
            .map(|rate| FxRate { rate: *rate, as_of: now })
    }
}

/// Screening against a list of blocked names. An empty list clears everyone.
#[derive(Debug, Default)]
pub struct NameListScreening {
    blocked: HashSet<String>,
}

impl NameListScreening {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blocked(mut self, name: &str) -> Self {
        self.blocked.insert(name.to_ascii_uppercase());
        self
    }
}

#[async_trait]
impl ScreeningCheck for NameListScreening {
    async fn screen(&self, profile: &CustomerProfile) -> bool {
        !self.blocked.contains(&profile.full_name.to_ascii_uppercase())
    }
}

/// Publishes events to the log.
#[derive(Debug, Default)]
pub struct TracingPublisher;

#[async_trait]
impl EventPublisher for TracingPublisher {
    async fn publish(&self, event: DomainEvent) {
        tracing::info!(
            event_type = event.event_type(),
            participant_id = event.participant_id(),
            "Domain event published"
        );
    }
}

/// Collects published events for inspection in tests.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().expect("Mutex poisoned").clone()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.events()
            .iter()
            .map(|event| event.event_type())
            .collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: DomainEvent) {
        self.events.lock().expect("Mutex poisoned").push(event);
    }
}

/// Decrypts hex-encoded JSON payloads. Stands in for the real envelope
/// decryption; malformed input fails the same way.
#[derive(Debug, Default)]
pub struct HexJsonDecrypter;

#[async_trait]
impl PayloadDecrypter for HexJsonDecrypter {
    async fn decrypt(&self, payload: &str) -> Result<CustomerProfile, DecryptError> {
        let bytes = hex::decode(payload.trim())
            .map_err(|e| DecryptError(format!("payload is not valid hex: {}", e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| DecryptError(format!("payload is not a valid profile: {}", e)))
    }
}

/// Encode a profile the way `HexJsonDecrypter` expects. Used by tests and
/// seed tooling.
pub fn encrypt_profile(profile: &CustomerProfile) -> String {
    let json = serde_json::to_vec(profile).expect("profile serializes");
    hex::encode(json)
}
