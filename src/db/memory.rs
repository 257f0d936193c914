//! In-process store backed by concurrent maps.
//!
//! Each map entry is locked for the duration of a conditional update, which
//! gives the same single-row atomicity the hosted backend provides.

use crate::db::{same_lifecycle_state, ListingFilter, TradeStore};
use crate::error::AppError;
use crate::models::{TradePost, User, UserMissingCard, UserNotification};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory [`TradeStore`].
#[derive(Default)]
pub struct MemoryDb {
    users: DashMap<String, User>,
    missing_cards: DashMap<String, UserMissingCard>,
    trade_posts: DashMap<String, TradePost>,
    notifications: DashMap<String, UserNotification>,
    /// When set, batched user lookups return nothing (a join that yields no rows)
    skip_batch_user_lookup: AtomicBool,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make [`TradeStore::get_users`] come back empty, forcing callers onto
    /// their per-row fallback.
    pub fn set_skip_batch_user_lookup(&self, skip: bool) {
        self.skip_batch_user_lookup.store(skip, Ordering::Relaxed);
    }

    fn active_sorted(&self, filter: &ListingFilter) -> Vec<TradePost> {
        let mut posts: Vec<TradePost> = self
            .trade_posts
            .iter()
            .filter(|p| p.is_active && !p.is_completed && filter.matches(p))
            .map(|p| p.value().clone())
            .collect();
        posts.sort_by(|a, b| {
            b.last_refreshed
                .cmp(&a.last_refreshed)
                .then_with(|| a.id.cmp(&b.id))
        });
        posts
    }
}

#[async_trait]
impl TradeStore for MemoryDb {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(user_id).map(|u| u.value().clone()))
    }

    async fn get_users(&self, user_ids: &[String]) -> Result<Vec<User>, AppError> {
        if self.skip_batch_user_lookup.load(Ordering::Relaxed) {
            return Ok(Vec::new());
        }
        Ok(user_ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.value().clone()))
            .collect())
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn list_missing_cards(&self, user_id: &str) -> Result<Vec<UserMissingCard>, AppError> {
        let mut records: Vec<UserMissingCard> = self
            .missing_cards
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| a.card_number.cmp(&b.card_number));
        Ok(records)
    }

    async fn has_missing_card(&self, user_id: &str, card_number: &str) -> Result<bool, AppError> {
        Ok(self
            .missing_cards
            .contains_key(&UserMissingCard::document_id(user_id, card_number)))
    }

    async fn add_missing_card(&self, record: &UserMissingCard) -> Result<(), AppError> {
        self.missing_cards
            .entry(UserMissingCard::document_id(&record.user_id, &record.card_number))
            .or_insert_with(|| record.clone());
        Ok(())
    }

    async fn remove_missing_card(
        &self,
        user_id: &str,
        card_number: &str,
    ) -> Result<(), AppError> {
        self.missing_cards
            .remove(&UserMissingCard::document_id(user_id, card_number));
        Ok(())
    }

    async fn insert_trade_post(&self, post: &TradePost) -> Result<(), AppError> {
        self.trade_posts.insert(post.id.clone(), post.clone());
        Ok(())
    }

    async fn get_trade_post(&self, id: &str) -> Result<Option<TradePost>, AppError> {
        Ok(self.trade_posts.get(id).map(|p| p.value().clone()))
    }

    async fn replace_trade_post_if(
        &self,
        expected: &TradePost,
        updated: &TradePost,
    ) -> Result<bool, AppError> {
        match self.trade_posts.get_mut(&expected.id) {
            Some(mut current) if same_lifecycle_state(&current, expected) => {
                *current = updated.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire_stale_trade_posts(&self, cutoff: DateTime<Utc>) -> Result<usize, AppError> {
        let mut expired = 0;
        for mut post in self.trade_posts.iter_mut() {
            if post.is_active && post.last_refreshed <= cutoff {
                post.is_active = false;
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn count_active_trade_posts(&self, filter: &ListingFilter) -> Result<u64, AppError> {
        Ok(self
            .trade_posts
            .iter()
            .filter(|p| p.is_active && !p.is_completed && filter.matches(p))
            .count() as u64)
    }

    async fn list_active_trade_posts(
        &self,
        filter: &ListingFilter,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<TradePost>, AppError> {
        Ok(self
            .active_sorted(filter)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn list_trade_posts_for_user(&self, user_id: &str) -> Result<Vec<TradePost>, AppError> {
        let mut posts: Vec<TradePost> = self
            .trade_posts
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.value().clone())
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn recent_active_trade_posts(&self, limit: u32) -> Result<Vec<TradePost>, AppError> {
        let mut posts = self.active_sorted(&ListingFilter::default());
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts.truncate(limit as usize);
        Ok(posts)
    }

    async fn find_notification(
        &self,
        trade_post_id: &str,
        notifier_username: &str,
    ) -> Result<Option<UserNotification>, AppError> {
        Ok(self
            .notifications
            .iter()
            .find(|n| n.trade_post_id == trade_post_id && n.notifier_username == notifier_username)
            .map(|n| n.value().clone()))
    }

    async fn insert_notification(&self, notification: &UserNotification) -> Result<(), AppError> {
        match self.notifications.entry(notification.id.clone()) {
            Entry::Occupied(_) => Err(AppError::DuplicateNotification),
            Entry::Vacant(slot) => {
                slot.insert(notification.clone());
                Ok(())
            }
        }
    }

    async fn get_notification(&self, id: &str) -> Result<Option<UserNotification>, AppError> {
        Ok(self.notifications.get(id).map(|n| n.value().clone()))
    }

    async fn mark_notification_read(&self, id: &str) -> Result<(), AppError> {
        match self.notifications.get_mut(id) {
            Some(mut n) => {
                n.is_read = true;
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Notification {}", id))),
        }
    }

    async fn list_notifications_for_user(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: u32,
    ) -> Result<Vec<UserNotification>, AppError> {
        let mut notifications: Vec<UserNotification> = self
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .map(|n| n.value().clone())
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications.truncate(limit as usize);
        Ok(notifications)
    }
}
