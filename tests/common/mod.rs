// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use chrono::{DateTime, Utc};
use pocket_trader::config::Config;
use pocket_trader::db::{FirestoreDb, MemoryDb, TradeStore};
use pocket_trader::models::{Rarity, TradePost, User};
use pocket_trader::routes::create_router;
use pocket_trader::services::{CardCatalog, LogDelivery};
use pocket_trader::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Catalog from the bundled dataset.
#[allow(dead_code)]
pub fn test_catalog() -> Arc<CardCatalog> {
    let catalog = CardCatalog::from_file(Config::test_default().card_catalog_path);
    catalog.load().expect("card dataset should load");
    Arc::new(catalog)
}

/// Create a test app over an in-memory store.
/// Returns the router, the shared state and the store for seeding.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<MemoryDb>) {
    let store = Arc::new(MemoryDb::new());
    let state = Arc::new(AppState::new(
        Config::test_default(),
        store.clone(),
        test_catalog(),
        Arc::new(LogDelivery),
    ));
    (create_router(state.clone()), state, store)
}

/// Create a test app whose store is offline; every store call fails.
#[allow(dead_code)]
pub fn create_offline_app() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(
        Config::test_default(),
        Arc::new(FirestoreDb::new_mock()),
        test_catalog(),
        Arc::new(LogDelivery),
    ));
    (create_router(state.clone()), state)
}

/// Create a test JWT token.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    pocket_trader::middleware::auth::create_jwt(
        user_id,
        Some(&format!("{}@example.com", user_id)),
        signing_key,
    )
    .unwrap()
}

#[allow(dead_code)]
pub fn test_user(id: &str) -> User {
    let now = Utc::now();
    User {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        friend_code: Some("1234567812345678".to_string()),
        tcg_pocket_username: Some(id.to_string()),
        notification_preference: Default::default(),
        notification_contact: Default::default(),
        created_at: now,
        updated_at: now,
    }
}

/// Active listing refreshed at `refreshed`.
#[allow(dead_code)]
pub fn test_post(
    id: &str,
    owner: &str,
    wanted: &str,
    offered: &[&str],
    rarity: Rarity,
    refreshed: DateTime<Utc>,
) -> TradePost {
    TradePost {
        id: id.to_string(),
        user_id: owner.to_string(),
        card_wanted: wanted.to_string(),
        cards_for_trade: offered.iter().map(|s| s.to_string()).collect(),
        rarity,
        created_at: refreshed,
        updated_at: refreshed,
        last_refreshed: refreshed,
        is_active: true,
        is_completed: false,
    }
}

#[allow(dead_code)]
pub async fn seed(store: &MemoryDb, post: &TradePost) {
    store.insert_trade_post(post).await.unwrap();
}

/// Build a request, optionally authenticated and with a JSON body.
#[allow(dead_code)]
pub fn request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
