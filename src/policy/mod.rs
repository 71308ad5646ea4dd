//! Status Policy
//!
//! Pure decision functions mapping business facts to initial entity states.
//! No I/O, no side effects; fully deterministic given their inputs.

use chrono::{DateTime, NaiveDate, Utc};

use crate::model::PaymentStatus;
use crate::ports::RiskDecision;

/// Decide a payment's initial status from its timing and the risk decision.
///
/// A declined risk decision wins over timing. A future-dated payment is
/// scheduled; anything due today (or back-dated) settles now.
pub fn payment_initial_status(
    now: DateTime<Utc>,
    requested_execution_date: Option<NaiveDate>,
    risk: &RiskDecision,
) -> PaymentStatus {
    if let RiskDecision::Declined { .. } = risk {
        return PaymentStatus::Rejected;
    }

    match requested_execution_date {
        Some(date) if date > now.date_naive() => PaymentStatus::Scheduled,
        _ => PaymentStatus::SettlementInProcess,
    }
}

/// Resolve the execution date a payment is stored with.
pub fn effective_execution_date(
    now: DateTime<Utc>,
    requested_execution_date: Option<NaiveDate>,
) -> NaiveDate {
    requested_execution_date.unwrap_or_else(|| now.date_naive())
}

/// Offer expiry is exclusive: at `now == expires_at` the offer is gone.
pub fn quote_offer_expired(now: DateTime<Utc>, offer_expires_at: DateTime<Utc>) -> bool {
    now >= offer_expires_at
}
