//! Entity model
//!
//! Command-driven entities. Each carries identity, its owning participant,
//! a closed status enumeration with a terminal predicate, and timestamps.

mod account;
mod fx;
mod payment;

pub use account::{Account, AccountStatus, CustomerProfile};
pub use fx::{DealStatus, FxDeal, FxQuote, QuoteStatus};
pub use payment::{Payment, PaymentStatus};
