//! Database layer.
//!
//! Services talk to the backend through [`TradeStore`]. Two implementations
//! ship: [`FirestoreDb`] for deployments and [`MemoryDb`] for local runs and
//! tests.

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{Rarity, TradePost, User, UserMissingCard, UserNotification};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const USER_MISSING_CARDS: &str = "user_missing_cards";
    pub const TRADE_POSTS: &str = "trade_posts";
    pub const USER_NOTIFICATIONS: &str = "user_notifications";
}

/// Narrowing applied to the active-listings query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingFilter {
    /// Exact match on the listing's own rarity field
    pub rarity: Option<Rarity>,
    /// Matches `card_wanted` or membership in `cards_for_trade`
    pub card_number: Option<String>,
}

impl ListingFilter {
    /// Whether an active, non-completed listing passes the filter.
    pub fn matches(&self, post: &TradePost) -> bool {
        self.rarity.is_none_or(|r| post.rarity == r)
            && self
                .card_number
                .as_deref()
                .is_none_or(|n| post.involves_card(n))
    }
}

/// Fields compared by [`TradeStore::replace_trade_post_if`].
pub fn same_lifecycle_state(a: &TradePost, b: &TradePost) -> bool {
    a.is_active == b.is_active
        && a.is_completed == b.is_completed
        && a.last_refreshed == b.last_refreshed
}

/// Record read/write operations the application needs from the backend.
#[async_trait]
pub trait TradeStore: Send + Sync {
    // ─── Users ───────────────────────────────────────────────────

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError>;

    /// Batched lookup. Users that can't be resolved are simply absent.
    async fn get_users(&self, user_ids: &[String]) -> Result<Vec<User>, AppError>;

    async fn upsert_user(&self, user: &User) -> Result<(), AppError>;

    // ─── Missing Cards ───────────────────────────────────────────

    async fn list_missing_cards(&self, user_id: &str) -> Result<Vec<UserMissingCard>, AppError>;

    async fn has_missing_card(&self, user_id: &str, card_number: &str) -> Result<bool, AppError>;

    async fn add_missing_card(&self, record: &UserMissingCard) -> Result<(), AppError>;

    async fn remove_missing_card(&self, user_id: &str, card_number: &str)
        -> Result<(), AppError>;

    // ─── Trade Posts ─────────────────────────────────────────────

    async fn insert_trade_post(&self, post: &TradePost) -> Result<(), AppError>;

    async fn get_trade_post(&self, id: &str) -> Result<Option<TradePost>, AppError>;

    /// Write `updated` only if the stored listing still has the lifecycle
    /// state of `expected` (see [`same_lifecycle_state`]).
    ///
    /// Returns `false` when the listing changed (or vanished) in between.
    async fn replace_trade_post_if(
        &self,
        expected: &TradePost,
        updated: &TradePost,
    ) -> Result<bool, AppError>;

    /// Set `is_active = false` on every active listing with
    /// `last_refreshed <= cutoff`. The condition is re-checked per listing at
    /// write time. Returns the number of listings expired.
    async fn expire_stale_trade_posts(&self, cutoff: DateTime<Utc>) -> Result<usize, AppError>;

    /// Number of active, non-completed listings passing the filter.
    async fn count_active_trade_posts(&self, filter: &ListingFilter) -> Result<u64, AppError>;

    /// Active, non-completed listings passing the filter, most recently
    /// refreshed first.
    async fn list_active_trade_posts(
        &self,
        filter: &ListingFilter,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<TradePost>, AppError>;

    /// Every listing owned by the user, newest first.
    async fn list_trade_posts_for_user(&self, user_id: &str) -> Result<Vec<TradePost>, AppError>;

    /// Most recently created active listings across all users.
    async fn recent_active_trade_posts(&self, limit: u32) -> Result<Vec<TradePost>, AppError>;

    // ─── Notifications ───────────────────────────────────────────

    async fn find_notification(
        &self,
        trade_post_id: &str,
        notifier_username: &str,
    ) -> Result<Option<UserNotification>, AppError>;

    /// Create-only insert; fails with [`AppError::DuplicateNotification`] if
    /// the ID is already taken.
    async fn insert_notification(&self, notification: &UserNotification) -> Result<(), AppError>;

    async fn get_notification(&self, id: &str) -> Result<Option<UserNotification>, AppError>;

    async fn mark_notification_read(&self, id: &str) -> Result<(), AppError>;

    /// Notifications addressed to the user, newest first.
    async fn list_notifications_for_user(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: u32,
    ) -> Result<Vec<UserNotification>, AppError>;
}
