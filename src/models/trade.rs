// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trade listing model and its derived lifecycle status.

use crate::models::{Card, PublicUser, Rarity};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Listings not refreshed for this long are swept to expired.
pub const EXPIRY_THRESHOLD: Duration = Duration::hours(6);

/// Listings are flagged "expiring soon" once they are this old.
pub const EXPIRING_SOON_THRESHOLD: Duration = Duration::minutes(5 * 60 + 30);

/// A "want X, offer [Y, Z]" listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePost {
    pub id: String,
    /// Owner; only the owner may refresh or complete
    pub user_id: String,
    pub card_wanted: String,
    pub cards_for_trade: Vec<String>,
    pub rarity: Rarity,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_refreshed: DateTime<Utc>,
    pub is_active: bool,
    pub is_completed: bool,
}

/// Lifecycle status derived from the stored flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Active,
    Expired,
    Completed,
}

impl TradePost {
    pub fn status(&self) -> ListingStatus {
        if self.is_completed {
            ListingStatus::Completed
        } else if self.is_active {
            ListingStatus::Active
        } else {
            ListingStatus::Expired
        }
    }

    /// Time since the listing was last refreshed.
    pub fn elapsed_since_refresh(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.last_refreshed)
    }

    /// Whether the listing is old enough to be swept, regardless of the stored flag.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.elapsed_since_refresh(now) >= EXPIRY_THRESHOLD
    }

    /// Within the last 30 minutes before expiry. Informational only.
    pub fn is_expiring_soon(&self, now: DateTime<Utc>) -> bool {
        let elapsed = self.elapsed_since_refresh(now);
        elapsed >= EXPIRING_SOON_THRESHOLD && elapsed < EXPIRY_THRESHOLD
    }

    /// Every card number referenced by the listing, wanted card first.
    pub fn card_numbers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.card_wanted.as_str())
            .chain(self.cards_for_trade.iter().map(String::as_str))
    }

    /// True when the number is wanted or offered by this listing.
    pub fn involves_card(&self, number: &str) -> bool {
        self.card_wanted == number || self.cards_for_trade.iter().any(|c| c == number)
    }
}

/// Listing enriched with owner and card details for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct TradePostWithCards {
    #[serde(flatten)]
    pub post: TradePost,
    pub status: ListingStatus,
    pub expiring_soon: bool,
    pub user: Option<PublicUser>,
    pub card_wanted_details: Card,
    pub cards_for_trade_details: Vec<Card>,
}

impl TradePostWithCards {
    /// Case-insensitive substring match over wanted/offered card names and numbers.
    pub fn matches_search(&self, search: &str) -> bool {
        let needle = search.to_lowercase();
        let hit = |card: &Card| {
            card.name.to_lowercase().contains(&needle)
                || card.number.to_lowercase().contains(&needle)
        };
        hit(&self.card_wanted_details) || self.cards_for_trade_details.iter().any(hit)
    }
}
