//! FX quote and deal entities
//!
//! A quote is a TTL-bounded offer priced from the rate source. Accepting a
//! quote is the one re-entrant transition in the system: it re-validates the
//! original inputs against the stored fingerprint and produces a booked
//! deal. Terminal quote states are never re-entered.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::Currency;

/// Quote lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    /// Offer is open until its expiry
    Quoted,
    /// Accepted into a deal
    Booked,
    /// Offer expired before acceptance
    Expired,
}

impl QuoteStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, QuoteStatus::Booked | QuoteStatus::Expired)
    }
}

impl std::fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuoteStatus::Quoted => write!(f, "quoted"),
            QuoteStatus::Booked => write!(f, "booked"),
            QuoteStatus::Expired => write!(f, "expired"),
        }
    }
}

impl FromStr for QuoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quoted" => Ok(QuoteStatus::Quoted),
            "booked" => Ok(QuoteStatus::Booked),
            "expired" => Ok(QuoteStatus::Expired),
            other => Err(format!("unknown quote status: {}", other)),
        }
    }
}

/// An FX quote offered to a participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FxQuote {
    pub id: Uuid,
    pub participant_id: String,
    pub consent_id: String,
    pub settlement_account: String,
    pub sell_currency: Currency,
    pub buy_currency: Currency,
    pub sell_amount: Decimal,
    pub rate: Decimal,
    pub buy_amount: Decimal,
    pub status: QuoteStatus,
    /// SHA-256 over the original quote inputs; acceptance is bound to it
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl FxQuote {
    /// Offer expiry is exclusive: at `now == expires_at` the offer is gone.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Deal lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    Booked,
    Settled,
}

impl DealStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DealStatus::Settled)
    }
}

impl std::fmt::Display for DealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DealStatus::Booked => write!(f, "booked"),
            DealStatus::Settled => write!(f, "settled"),
        }
    }
}

impl FromStr for DealStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booked" => Ok(DealStatus::Booked),
            "settled" => Ok(DealStatus::Settled),
            other => Err(format!("unknown deal status: {}", other)),
        }
    }
}

/// A booked FX deal produced by accepting a quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FxDeal {
    pub id: Uuid,
    pub quote_id: Uuid,
    pub participant_id: String,
    pub consent_id: String,
    pub settlement_account: String,
    pub sell_currency: Currency,
    pub buy_currency: Currency,
    pub sell_amount: Decimal,
    pub rate: Decimal,
    pub buy_amount: Decimal,
    pub status: DealStatus,
    pub booked_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
