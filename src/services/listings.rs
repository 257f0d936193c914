// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read side of trade listings: the public feed, the owner's own listings
//! and the dashboard summary.

use crate::db::{ListingFilter, TradeStore};
use crate::error::AppError;
use crate::models::{
    Card, ListingStatus, PublicUser, TradePost, TradePostWithCards, UserNotification,
};
use crate::services::{CardCatalog, TradeLifecycle};
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

const MAX_CONCURRENT_LOOKUPS: usize = 10;
const DASHBOARD_NOTIFICATIONS: u32 = 5;
const DASHBOARD_RECENT_TRADES: u32 = 3;

/// Filters for the public feed.
#[derive(Debug, Clone, Default)]
pub struct FeedQuery {
    pub filter: ListingFilter,
    /// Free text applied to the fetched page only
    pub search: Option<String>,
}

/// One page of the public feed.
#[derive(Debug, Serialize)]
pub struct ListingPage {
    pub items: Vec<TradePostWithCards>,
    pub page: u32,
    pub page_size: u32,
    /// Matches before pagination. The free-text search does not change it.
    pub total_count: u64,
    pub total_pages: u64,
}

/// A user's own listings split by status.
#[derive(Debug, Default, Serialize)]
pub struct OwnerListings {
    pub active: Vec<TradePostWithCards>,
    pub expired: Vec<TradePostWithCards>,
    pub completed: Vec<TradePostWithCards>,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub active_count: usize,
    pub expiring_soon_count: usize,
    pub recent_notifications: Vec<UserNotification>,
    pub recent_trades: Vec<TradePostWithCards>,
}

#[derive(Clone)]
pub struct ListingQuery {
    store: Arc<dyn TradeStore>,
    catalog: Arc<CardCatalog>,
    lifecycle: TradeLifecycle,
    max_page_size: u32,
}

impl ListingQuery {
    pub fn new(
        store: Arc<dyn TradeStore>,
        catalog: Arc<CardCatalog>,
        lifecycle: TradeLifecycle,
        max_page_size: u32,
    ) -> Self {
        Self {
            store,
            catalog,
            lifecycle,
            max_page_size,
        }
    }

    /// Run the expiry sweep; failure only costs freshness, so it is logged.
    async fn sweep_best_effort(&self, now: DateTime<Utc>) {
        if let Err(e) = self.lifecycle.sweep(now).await {
            tracing::warn!(error = %e, "Expiry sweep failed, continuing with query");
        }
    }

    pub async fn list_active(
        &self,
        query: &FeedQuery,
        page: u32,
        page_size: u32,
    ) -> Result<ListingPage, AppError> {
        self.list_active_at(query, page, page_size, Utc::now()).await
    }

    /// Active listings, most recently refreshed first.
    pub async fn list_active_at(
        &self,
        query: &FeedQuery,
        page: u32,
        page_size: u32,
        now: DateTime<Utc>,
    ) -> Result<ListingPage, AppError> {
        if page < 1 {
            return Err(AppError::validation("page", "Page must be at least 1"));
        }
        if page_size < 1 {
            return Err(AppError::validation(
                "page_size",
                "Page size must be at least 1",
            ));
        }
        let page_size = page_size.min(self.max_page_size);

        self.sweep_best_effort(now).await;

        let total_count = self.store.count_active_trade_posts(&query.filter).await?;
        let offset = (page - 1).saturating_mul(page_size);
        let posts = self
            .store
            .list_active_trade_posts(&query.filter, offset, page_size)
            .await?;

        let mut items = self.enrich_all(posts, now).await;

        if let Some(search) = query.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                items.retain(|item| item.matches_search(search));
            }
        }

        tracing::debug!(
            page,
            page_size,
            total_count,
            returned = items.len(),
            "Listed active trades"
        );

        Ok(ListingPage {
            items,
            page,
            page_size,
            total_count,
            total_pages: total_count.div_ceil(u64::from(page_size)),
        })
    }

    /// The owner's listings grouped by status, newest first.
    ///
    /// Listings past the expiry threshold that haven't been swept yet are
    /// reported as expired.
    pub async fn list_for_owner(
        &self,
        owner: &str,
        now: DateTime<Utc>,
    ) -> Result<OwnerListings, AppError> {
        let posts = self.store.list_trade_posts_for_user(owner).await?;
        let mut grouped = OwnerListings::default();

        for item in self.enrich_all(posts, now).await {
            match item.status {
                ListingStatus::Active => grouped.active.push(item),
                ListingStatus::Expired => grouped.expired.push(item),
                ListingStatus::Completed => grouped.completed.push(item),
            }
        }

        Ok(grouped)
    }

    pub async fn dashboard(&self, user_id: &str, now: DateTime<Utc>) -> Result<Dashboard, AppError> {
        self.sweep_best_effort(now).await;

        let own = self.list_for_owner(user_id, now).await?;
        let recent_notifications = self
            .store
            .list_notifications_for_user(user_id, true, DASHBOARD_NOTIFICATIONS)
            .await?;
        let recent = self
            .store
            .recent_active_trade_posts(DASHBOARD_RECENT_TRADES)
            .await?;

        Ok(Dashboard {
            active_count: own.active.len(),
            expiring_soon_count: own.active.iter().filter(|t| t.expiring_soon).count(),
            recent_notifications,
            recent_trades: self.enrich_all(recent, now).await,
        })
    }

    async fn enrich_all(&self, posts: Vec<TradePost>, now: DateTime<Utc>) -> Vec<TradePostWithCards> {
        let owners = self.resolve_owners(&posts).await;
        posts
            .into_iter()
            .map(|post| {
                let owner = owners.get(&post.user_id).cloned();
                self.enrich(post, owner, now)
            })
            .collect()
    }

    /// Owner profiles for a set of listings.
    ///
    /// One batched lookup first; any owner it didn't return is looked up
    /// individually. Owners that still can't be found are left out.
    async fn resolve_owners(&self, posts: &[TradePost]) -> HashMap<String, PublicUser> {
        let mut ids: Vec<String> = posts.iter().map(|p| p.user_id.clone()).collect();
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            return HashMap::new();
        }

        let mut owners: HashMap<String, PublicUser> = match self.store.get_users(&ids).await {
            Ok(users) => users
                .into_iter()
                .map(|u| (u.id.clone(), u.public_profile()))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Batched owner lookup failed, falling back");
                HashMap::new()
            }
        };

        let unresolved: Vec<String> = ids
            .into_iter()
            .filter(|id| !owners.contains_key(id))
            .collect();
        if unresolved.is_empty() {
            return owners;
        }

        tracing::debug!(count = unresolved.len(), "Resolving owners individually");

        let lookups = stream::iter(unresolved)
            .map(|id| async move {
                let result = self.store.get_user(&id).await;
                (id, result)
            })
            .buffer_unordered(MAX_CONCURRENT_LOOKUPS)
            .collect::<Vec<_>>()
            .await;

        for (id, result) in lookups {
            match result {
                Ok(Some(user)) => {
                    owners.insert(id, user.public_profile());
                }
                Ok(None) => tracing::debug!(user_id = %id, "Listing owner not found"),
                Err(e) => tracing::warn!(user_id = %id, error = %e, "Owner lookup failed"),
            }
        }

        owners
    }

    /// Attach card details and the derived status. Cards missing from the
    /// catalog get a placeholder carrying the listing's rarity.
    fn enrich(
        &self,
        post: TradePost,
        user: Option<PublicUser>,
        now: DateTime<Utc>,
    ) -> TradePostWithCards {
        let lookup = |number: &str| -> Card {
            self.catalog
                .get_by_number(number)
                .unwrap_or_else(|| Card::placeholder(number, post.rarity))
        };

        let card_wanted_details = lookup(post.card_wanted.as_str());
        let cards_for_trade_details = post.cards_for_trade.iter().map(|n| lookup(n.as_str())).collect();

        let status = match post.status() {
            ListingStatus::Active if post.is_expired_at(now) => ListingStatus::Expired,
            status => status,
        };
        let expiring_soon = status == ListingStatus::Active && post.is_expiring_soon(now);

        TradePostWithCards {
            post,
            status,
            expiring_soon,
            user,
            card_wanted_details,
            cards_for_trade_details,
        }
    }
}
