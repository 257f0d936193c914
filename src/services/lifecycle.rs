// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trade listing lifecycle: create, refresh, complete and the expiry sweep.
//!
//! State lives entirely in the stored flags and `last_refreshed`:
//!
//! ```text
//!   create ──> Active ──(6h without refresh, sweep)──> Expired
//!                ^  │                                   │
//!                │  └───────── complete ──> Completed <─┘
//!                └──────── refresh ──────────────────────┘
//! ```
//!
//! Owner transitions are written with a conditional replace against the state
//! that was read, so a concurrent sweep or second request can't be silently
//! overwritten.

use crate::db::TradeStore;
use crate::error::AppError;
use crate::models::trade::EXPIRY_THRESHOLD;
use crate::models::{Rarity, TradePost};
use crate::services::CardCatalog;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Attempts at the read-check-write cycle before giving up.
const MAX_CAS_ATTEMPTS: usize = 3;

/// Input for a new listing.
#[derive(Debug, Clone)]
pub struct NewTradePost {
    pub card_wanted: String,
    pub cards_for_trade: Vec<String>,
    pub rarity: Rarity,
}

/// Owner-facing listing transitions.
#[derive(Clone)]
pub struct TradeLifecycle {
    store: Arc<dyn TradeStore>,
    catalog: Arc<CardCatalog>,
}

impl TradeLifecycle {
    pub fn new(store: Arc<dyn TradeStore>, catalog: Arc<CardCatalog>) -> Self {
        Self { store, catalog }
    }

    pub async fn create(&self, owner: &str, input: NewTradePost) -> Result<TradePost, AppError> {
        self.create_at(owner, input, Utc::now()).await
    }

    /// Create an active listing, checking every card against the catalog.
    pub async fn create_at(
        &self,
        owner: &str,
        input: NewTradePost,
        now: DateTime<Utc>,
    ) -> Result<TradePost, AppError> {
        let card_wanted = input.card_wanted.trim().to_string();
        if card_wanted.is_empty() {
            return Err(AppError::validation("card_wanted", "A wanted card is required"));
        }

        let cards_for_trade: Vec<String> = input
            .cards_for_trade
            .iter()
            .map(|c| c.trim().to_string())
            .collect();
        if cards_for_trade.is_empty() {
            return Err(AppError::validation(
                "cards_for_trade",
                "At least one card must be offered",
            ));
        }
        if cards_for_trade.iter().any(String::is_empty) {
            return Err(AppError::validation(
                "cards_for_trade",
                "Offered card numbers must not be empty",
            ));
        }

        // Writes never trust a degraded empty catalog.
        self.catalog.load()?;
        self.check_card("card_wanted", &card_wanted, input.rarity)?;
        for number in &cards_for_trade {
            self.check_card("cards_for_trade", number, input.rarity)?;
        }

        let post = TradePost {
            id: Uuid::new_v4().to_string(),
            user_id: owner.to_string(),
            card_wanted,
            cards_for_trade,
            rarity: input.rarity,
            created_at: now,
            updated_at: now,
            last_refreshed: now,
            is_active: true,
            is_completed: false,
        };

        self.store.insert_trade_post(&post).await?;

        tracing::info!(
            trade_post_id = %post.id,
            user_id = owner,
            card_wanted = %post.card_wanted,
            offered = post.cards_for_trade.len(),
            "Trade listing created"
        );

        Ok(post)
    }

    fn check_card(&self, field: &str, number: &str, rarity: Rarity) -> Result<(), AppError> {
        let card = self
            .catalog
            .get_by_number(number)
            .ok_or_else(|| AppError::NotFound(format!("Card {}", number)))?;

        if card.rarity != rarity {
            return Err(AppError::validation(
                field,
                format!(
                    "Card {} is {}, listing is {}",
                    number,
                    card.rarity.display_name(),
                    rarity.display_name()
                ),
            ));
        }
        Ok(())
    }

    pub async fn refresh(&self, id: &str, actor: &str) -> Result<TradePost, AppError> {
        self.refresh_at(id, actor, Utc::now()).await
    }

    /// Reactivate an expired listing (or one past the threshold that hasn't
    /// been swept yet).
    pub async fn refresh_at(
        &self,
        id: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<TradePost, AppError> {
        let post = self
            .transition(id, actor, |current| {
                if current.is_completed {
                    return Err(AppError::validation(
                        "status",
                        "Completed listings cannot be refreshed",
                    ));
                }
                if current.is_active && !current.is_expired_at(now) {
                    return Err(AppError::validation("status", "Listing has not expired yet"));
                }

                let mut updated = current.clone();
                updated.is_active = true;
                updated.last_refreshed = now;
                updated.updated_at = now;
                Ok(Some(updated))
            })
            .await?;

        tracing::info!(trade_post_id = id, user_id = actor, "Trade listing refreshed");
        Ok(post)
    }

    pub async fn complete(&self, id: &str, actor: &str) -> Result<TradePost, AppError> {
        self.complete_at(id, actor, Utc::now()).await
    }

    /// Mark a listing completed. Completing twice returns the listing unchanged.
    pub async fn complete_at(
        &self,
        id: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<TradePost, AppError> {
        let post = self
            .transition(id, actor, |current| {
                if current.is_completed {
                    return Ok(None);
                }

                let mut updated = current.clone();
                updated.is_completed = true;
                updated.is_active = false;
                updated.updated_at = now;
                Ok(Some(updated))
            })
            .await?;

        tracing::info!(trade_post_id = id, user_id = actor, "Trade listing completed");
        Ok(post)
    }

    /// Expire every active listing not refreshed within the threshold.
    ///
    /// Safe to run any number of times; returns how many listings changed.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let expired = self
            .store
            .expire_stale_trade_posts(now - EXPIRY_THRESHOLD)
            .await?;

        if expired > 0 {
            tracing::info!(expired, "Expired stale trade listings");
        }
        Ok(expired)
    }

    /// Owner-checked read-check-write. `apply` returns the replacement, or
    /// `None` when the current state already satisfies the request.
    async fn transition<F>(&self, id: &str, actor: &str, apply: F) -> Result<TradePost, AppError>
    where
        F: Fn(&TradePost) -> Result<Option<TradePost>, AppError> + Send + Sync,
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let current = self
                .store
                .get_trade_post(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Trade listing {}", id)))?;

            if current.user_id != actor {
                tracing::warn!(
                    trade_post_id = id,
                    user_id = actor,
                    "Rejected transition by non-owner"
                );
                return Err(AppError::Unauthorized(
                    "Only the listing owner may change it".to_string(),
                ));
            }

            let Some(updated) = apply(&current)? else {
                return Ok(current);
            };

            if self.store.replace_trade_post_if(&current, &updated).await? {
                return Ok(updated);
            }

            tracing::debug!(trade_post_id = id, attempt, "Listing changed concurrently, retrying");
        }

        Err(AppError::BackendUnavailable(format!(
            "Trade listing {} kept changing during update",
            id
        )))
    }
}
