//! Domain Events
//!
//! Immutable facts published after a command takes effect. One event per
//! state change; compliance rejections are published even though the
//! command itself fails.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events published to the event bus port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    /// A payment was accepted into the system (any initial status,
    /// including a risk-declined one)
    PaymentInitiated {
        payment_id: Uuid,
        participant_id: String,
        status: String,
        amount: Decimal,
        currency: String,
        occurred_at: DateTime<Utc>,
    },

    /// An FX quote was offered to a participant
    QuoteCreated {
        quote_id: Uuid,
        participant_id: String,
        pair: String,
        rate: Decimal,
        offer_expires_at: DateTime<Utc>,
        occurred_at: DateTime<Utc>,
    },

    /// A previously quoted offer was accepted into a booked deal
    DealBooked {
        deal_id: Uuid,
        quote_id: Uuid,
        participant_id: String,
        pair: String,
        sell_amount: Decimal,
        buy_amount: Decimal,
        occurred_at: DateTime<Utc>,
    },

    /// An onboarding application passed screening and an account was opened
    AccountOpened {
        account_id: Uuid,
        participant_id: String,
        application_ref: String,
        occurred_at: DateTime<Utc>,
    },

    /// An onboarding application was rejected by screening
    OnboardingRejected {
        participant_id: String,
        application_ref: String,
        reason: String,
        occurred_at: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::PaymentInitiated { .. } => "PaymentInitiated",
            DomainEvent::QuoteCreated { .. } => "QuoteCreated",
            DomainEvent::DealBooked { .. } => "DealBooked",
            DomainEvent::AccountOpened { .. } => "AccountOpened",
            DomainEvent::OnboardingRejected { .. } => "OnboardingRejected",
        }
    }

    /// Get the participant this event belongs to
    pub fn participant_id(&self) -> &str {
        match self {
            DomainEvent::PaymentInitiated { participant_id, .. } => participant_id,
            DomainEvent::QuoteCreated { participant_id, .. } => participant_id,
            DomainEvent::DealBooked { participant_id, .. } => participant_id,
            DomainEvent::AccountOpened { participant_id, .. } => participant_id,
            DomainEvent::OnboardingRejected { participant_id, .. } => participant_id,
        }
    }
}
