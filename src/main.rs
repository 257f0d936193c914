// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pocket-Trader API Server
//!
//! Matches players who want to trade Pokémon TCG Pocket cards.

use pocket_trader::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryDb, TradeStore},
    services::{CardCatalog, LogDelivery},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Pocket-Trader API");

    let store: Arc<dyn TradeStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryDb::new())
        }
    };

    // Load the card catalog up front so a bad dataset shows at startup
    let catalog = Arc::new(CardCatalog::from_file(&config.card_catalog_path));
    match catalog.load() {
        Ok(count) => tracing::info!(count, "Card catalog loaded"),
        Err(e) => tracing::error!(
            path = %config.card_catalog_path,
            error = %e,
            "Card catalog failed to load, card lookups will be empty"
        ),
    }

    // Build shared state
    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        catalog,
        Arc::new(LogDelivery),
    ));

    // Build router
    let app = pocket_trader::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in ["pocket_trader=debug", "info"] {
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }

    tracing_subscriber::registry().with(filter).with(format).init();
}
