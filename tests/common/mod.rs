//! Shared test setup: an in-process app with deterministic collaborators.

use std::sync::Arc;

use axum::{middleware, Router};
use rust_decimal_macros::dec;

use openfin_api::api;
use openfin_api::ports::{
    FixedRateSource, HexJsonDecrypter, NameListScreening, Ports, RecordingFundsReservation,
    RecordingPublisher, ThresholdRiskAssessment,
};
use openfin_api::{AppState, Config};

pub fn test_ports() -> Ports {
    Ports {
        risk: Arc::new(ThresholdRiskAssessment::new(dec!(10000))),
        funds: Arc::new(RecordingFundsReservation::approving()),
        rates: Arc::new(FixedRateSource::new().with_rate("AED/USD", dec!(0.27229))),
        screening: Arc::new(NameListScreening::new()),
        events: Arc::new(RecordingPublisher::new()),
        decrypter: Arc::new(HexJsonDecrypter),
    }
}

/// Build the routed app the way the binary does, minus the /api/v1 nesting.
pub fn test_app() -> Router {
    let state = AppState::new(&Config::default(), test_ports());
    api::create_router()
        .layer(middleware::from_fn(api::middleware::logging_middleware))
        .layer(middleware::from_fn(api::middleware::context_middleware))
        .with_state(state)
}
