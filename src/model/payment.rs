//! Payment entity
//!
//! A payment initiation submitted under a payments consent. The initial
//! status is decided once, at submission, by the status policy.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::Currency;

/// Payment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Future-dated, waiting for its execution date
    Scheduled,
    /// Accepted for same-day execution, funds reserved
    SettlementInProcess,
    /// Funds moved
    Settled,
    /// Declined by the risk decision
    Rejected,
}

impl PaymentStatus {
    /// Terminal states are never re-entered
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Settled | PaymentStatus::Rejected)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Scheduled => write!(f, "scheduled"),
            PaymentStatus::SettlementInProcess => write!(f, "settlement_in_process"),
            PaymentStatus::Settled => write!(f, "settled"),
            PaymentStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(PaymentStatus::Scheduled),
            "settlement_in_process" => Ok(PaymentStatus::SettlementInProcess),
            "settled" => Ok(PaymentStatus::Settled),
            "rejected" => Ok(PaymentStatus::Rejected),
            other => Err(format!("unknown payment status: {}", other)),
        }
    }
}

/// A payment initiation accepted into the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub participant_id: String,
    pub consent_id: String,
    pub debtor_account: String,
    pub creditor_account: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub execution_date: NaiveDate,
    pub remittance_info: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
