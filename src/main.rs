//! openfin API - Open Finance Backend
//!
//! Idempotent, consent-gated command execution with cache-aside reads,
//! exposed over a thin HTTP surface.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use openfin_api::api;
use openfin_api::ports::{
    FixedRateSource, HexJsonDecrypter, NameListScreening, Ports, RecordingFundsReservation,
    ThresholdRiskAssessment, TracingPublisher,
};
use openfin_api::{AppState, Config};

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "openfin_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// In-process collaborators for the standalone binary. Deployments wire
/// real adapters here.
fn default_ports(config: &Config) -> Ports {
    Ports {
        risk: Arc::new(ThresholdRiskAssessment::new(config.risk_decline_over)),
        funds: Arc::new(RecordingFundsReservation::approving()),
        rates: Arc::new(
            FixedRateSource::new()
                .with_rate("AED/USD", rust_decimal::Decimal::new(27229, 5))
                .with_rate("USD/AED", rust_decimal::Decimal::new(36725, 4))
                .with_rate("EUR/USD", rust_decimal::Decimal::new(10860, 4)),
        ),
        screening: Arc::new(NameListScreening::new()),
        events: Arc::new(TracingPublisher),
        decrypter: Arc::new(HexJsonDecrypter),
    }
}

/// Build the application router
fn build_router(state: AppState) -> Router {
    // Axum layers are applied in reverse order (last added = first executed)
    // Order: context -> logging -> handler
    let protected_routes = api::create_router()
        .layer(middleware::from_fn(api::middleware::logging_middleware))
        .layer(middleware::from_fn(api::middleware::context_middleware));

    Router::new()
        // Health check (no participant header required)
        .route("/health", axum::routing::get(health_check))
        // Protected API routes
        .nest("/api/v1", protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    // Load configuration
    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Starting openfin API server");

    let state = AppState::new(&config, default_ports(&config));
    let app = build_router(state);

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down. Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
