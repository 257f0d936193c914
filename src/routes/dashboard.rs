// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::services::Dashboard;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/dashboard", get(get_dashboard))
}

async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Dashboard>> {
    let summary = state
        .listings
        .dashboard(&user.user_id, chrono::Utc::now())
        .await?;
    Ok(Json(summary))
}
