//! Account and customer profile entities
//!
//! Accounts are opened by the onboarding command once the decrypted profile
//! passes screening.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Account lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Closed,
}

impl AccountStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AccountStatus::Closed)
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "active"),
            AccountStatus::Closed => write!(f, "closed"),
        }
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AccountStatus::Active),
            "closed" => Ok(AccountStatus::Closed),
            other => Err(format!("unknown account status: {}", other)),
        }
    }
}

/// An account opened through onboarding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub participant_id: String,
    pub consent_id: String,
    /// The onboarding application this account came from; the consent links it
    pub application_ref: String,
    pub holder_name: String,
    pub status: AccountStatus,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Decrypted customer profile handed to screening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub nationality: String,
    pub id_document: String,
}
