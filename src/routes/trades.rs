// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trade listing routes.

use super::cards::parse_rarity;
use crate::db::ListingFilter;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{TradePost, UserNotification};
use crate::services::{FeedQuery, InterestNotice, ListingPage, NewTradePost, OwnerListings};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Browsing the feed needs no session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/trades", get(list_trades))
}

/// Routes that act on behalf of the signed-in user.
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/trades", post(create_trade))
        .route("/api/trades/{id}/refresh", post(refresh_trade))
        .route("/api/trades/{id}/complete", post(complete_trade))
        .route("/api/trades/{id}/notify", post(notify_owner))
        .route("/api/my/trades", get(my_trades))
}

// ─── Feed ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TradesQuery {
    /// Pagination: page number (1-indexed)
    #[serde(default = "default_page")]
    page: u32,
    /// Pagination: items per page (defaults to the configured page size)
    page_size: Option<u32>,
    rarity: Option<String>,
    card_number: Option<String>,
    search: Option<String>,
}

fn default_page() -> u32 {
    1
}

async fn list_trades(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TradesQuery>,
) -> Result<Json<ListingPage>> {
    let query = FeedQuery {
        filter: ListingFilter {
            rarity: parse_rarity("rarity", params.rarity.as_deref())?,
            card_number: params
                .card_number
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        },
        search: params.search,
    };
    let page_size = params.page_size.unwrap_or(state.config.page_size);

    let page = state
        .listings
        .list_active(&query, params.page, page_size)
        .await?;
    Ok(Json(page))
}

// ─── Owner Transitions ───────────────────────────────────────

#[derive(Deserialize)]
struct CreateTradeRequest {
    card_wanted: String,
    cards_for_trade: Vec<String>,
    rarity: String,
}

async fn create_trade(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateTradeRequest>,
) -> Result<(StatusCode, Json<TradePost>)> {
    let rarity = parse_rarity("rarity", Some(&body.rarity))?
        .ok_or_else(|| AppError::validation("rarity", "Rarity is required"))?;

    let post = state
        .lifecycle
        .create(
            &user.user_id,
            NewTradePost {
                card_wanted: body.card_wanted,
                cards_for_trade: body.cards_for_trade,
                rarity,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

async fn refresh_trade(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<TradePost>> {
    Ok(Json(state.lifecycle.refresh(&id, &user.user_id).await?))
}

async fn complete_trade(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<TradePost>> {
    Ok(Json(state.lifecycle.complete(&id, &user.user_id).await?))
}

async fn my_trades(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<OwnerListings>> {
    let grouped = state
        .listings
        .list_for_owner(&user.user_id, chrono::Utc::now())
        .await?;
    Ok(Json(grouped))
}

// ─── Interest ────────────────────────────────────────────────

async fn notify_owner(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<InterestNotice>,
) -> Result<(StatusCode, Json<UserNotification>)> {
    tracing::debug!(trade_post_id = %id, sender = %user.user_id, "Notify request");

    let notification = state
        .notifications
        .notify(&id, &user.user_id, body)
        .await?;

    Ok((StatusCode::CREATED, Json(notification)))
}
