// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Card catalog routes (public).

use crate::error::{AppError, Result};
use crate::models::{Card, Rarity};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/cards", get(search_cards))
        .route("/api/cards/{number}", get(get_card))
}

/// Parse an optional rarity parameter; blank means "any".
pub(crate) fn parse_rarity(field: &'static str, raw: Option<&str>) -> Result<Option<Rarity>> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => r
            .parse()
            .map(Some)
            .map_err(|msg: String| AppError::validation(field, msg)),
        None => Ok(None),
    }
}

#[derive(Deserialize)]
struct CardSearchQuery {
    #[serde(default)]
    q: String,
    rarity: Option<String>,
}

async fn search_cards(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CardSearchQuery>,
) -> Result<Json<Vec<Card>>> {
    let rarity = parse_rarity("rarity", query.rarity.as_deref())?;
    Ok(Json(state.catalog.search(&query.q, rarity)))
}

async fn get_card(
    State(state): State<Arc<AppState>>,
    Path(number): Path<String>,
) -> Result<Json<Card>> {
    state
        .catalog
        .get_by_number(&number)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Card {}", number)))
}
