// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification inbox routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::UserNotification;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/{id}/read", post(mark_read))
}

#[derive(Deserialize)]
struct InboxQuery {
    #[serde(default)]
    unread_only: bool,
    limit: Option<u32>,
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<InboxQuery>,
) -> Result<Json<Vec<UserNotification>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let notifications = state
        .notifications
        .list_for_recipient(&user.user_id, query.unread_only, limit)
        .await?;
    Ok(Json(notifications))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<UserNotification>> {
    Ok(Json(state.notifications.mark_read(&id, &user.user_id).await?))
}
