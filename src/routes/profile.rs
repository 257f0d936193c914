// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile and missing-card routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{Card, User};
use crate::services::profile::format_friend_code;
use crate::services::ProfileUpdate;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me).put(update_me))
        .route("/api/me/missing-cards", get(missing_cards))
        .route("/api/me/missing-cards/{number}", post(toggle_missing_card))
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: User,
    /// Friend code grouped for display (`XXXX-XXXX-XXXX-XXXX`)
    pub friend_code_display: Option<String>,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        let friend_code_display = user.friend_code.as_deref().map(format_friend_code);
        Self {
            user,
            friend_code_display,
        }
    }
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let profile = state.profile.get_profile(&user.user_id).await?;
    Ok(Json(profile.into()))
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<ProfileResponse>> {
    let profile = state
        .profile
        .update_profile(&user.user_id, user.email.as_deref(), body, chrono::Utc::now())
        .await?;
    Ok(Json(profile.into()))
}

// ─── Missing Cards ───────────────────────────────────────────

#[derive(Serialize)]
pub struct ToggleResponse {
    pub card_number: String,
    pub missing: bool,
}

async fn missing_cards(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Card>>> {
    Ok(Json(state.profile.missing_cards(&user.user_id).await?))
}

async fn toggle_missing_card(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(number): Path<String>,
) -> Result<Json<ToggleResponse>> {
    let missing = state
        .profile
        .toggle_missing_card(&user.user_id, &number, chrono::Utc::now())
        .await?;

    tracing::debug!(user_id = %user.user_id, card_number = %number, missing, "Missing card toggled");

    Ok(Json(ToggleResponse {
        card_number: number,
        missing,
    }))
}
