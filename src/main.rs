//! Czech Law RAG System - demo site
//!
//! Serves the marketing pages and a chat page whose conversations run as
//! per-session state machines against a pluggable answering service.

mod answer;
mod api;
mod config;
mod runtime;
mod state_machine;

use answer::{AnsweringService, LoggingService, SimulatedAnswerService};
use api::{create_router, AppState};
use config::ChatConfig;
use runtime::{ProductionSessions, SessionSettings};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lawchat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = ChatConfig::from_env()?;

    let simulated: Arc<dyn AnsweringService> = Arc::new(SimulatedAnswerService::new(
        config.simulated_delay,
        config.reply_template.clone(),
    ));
    tracing::info!(
        service = simulated.name(),
        delay_ms = %config.simulated_delay.as_millis(),
        answer_timeout_ms = ?config.answer_timeout.map(|t| t.as_millis()),
        "Answering service initialized"
    );

    let sessions: ProductionSessions = ProductionSessions::new(
        LoggingService::new(simulated),
        SessionSettings {
            error_reply: config.error_reply.clone(),
            answer_timeout: config.answer_timeout,
            attach_grace: config.attach_grace,
        },
    );

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new().gzip(true).br(true);

    let app = create_router(AppState::new(sessions))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Czech Law RAG site listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
