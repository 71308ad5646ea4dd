//! Amount and Currency types
//!
//! Domain primitives for monetary values. All amounts and currency codes are
//! validated at construction time, ensuring invalid values cannot exist in
//! the system.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum allowed amount (1 billion units of currency)
const MAX_AMOUNT: &str = "1000000000";

/// Maximum decimal places (currency minor units)
const MAX_SCALE: u32 = 2;

/// Amount represents a validated monetary value.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - Maximum 2 decimal places
/// - Maximum value is 1 billion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(Decimal);

/// Errors that can occur when creating an Amount or Currency
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(Decimal),

    #[error("Amount has too many decimal places (max {MAX_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Amount exceeds maximum allowed value ({MAX_AMOUNT})")]
    Overflow,

    #[error("Invalid amount format: {0}")]
    ParseError(String),

    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    /// - `AmountError::TooManyDecimals` if more than 2 decimal places
    /// - `AmountError::Overflow` if value > 1 billion
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }

        if value.scale() > MAX_SCALE {
            return Err(AmountError::TooManyDecimals(value.scale()));
        }

        let max = Decimal::from_str(MAX_AMOUNT).expect("Invalid MAX_AMOUNT constant");
        if value > max {
            return Err(AmountError::Overflow);
        }

        Ok(Self(value))
    }

    /// Get the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Convert this amount by an exchange rate, rounded to minor units.
    pub fn convert(&self, rate: Decimal) -> Result<Amount, AmountError> {
        let converted = (self.0 * rate).round_dp(MAX_SCALE);
        Amount::new(converted)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s).map_err(|e| AmountError::ParseError(e.to_string()))?;
        Amount::new(decimal)
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Amount::from_str(&value)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        format!("{:.2}", amount.0)
    }
}

/// A validated ISO 4217 currency code (3 uppercase ASCII letters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self, AmountError> {
        let trimmed = code.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AmountError::InvalidCurrency(code.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Currency {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// An ordered sell/buy currency pair, e.g. AED/USD.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub sell: Currency,
    pub buy: Currency,
}

impl CurrencyPair {
    pub fn new(sell: Currency, buy: Currency) -> Result<Self, AmountError> {
        if sell == buy {
            return Err(AmountError::InvalidCurrency(format!(
                "identical sell and buy currency {}",
                sell
            )));
        }
        Ok(Self { sell, buy })
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.sell, self.buy)
    }
}
