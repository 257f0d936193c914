// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trade-interest notifications: record, deliver, read.

use crate::db::TradeStore;
use crate::error::AppError;
use crate::models::{TradePost, User, UserNotification};
use crate::services::DeliveryChannel;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Interest in a listing, as submitted by the notifier.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InterestNotice {
    #[validate(length(min = 1, max = 50, message = "Username must be 1 to 50 characters"))]
    pub notifier_username: String,
    #[validate(length(max = 200, message = "Message must be at most 200 characters"))]
    pub message: Option<String>,
}

impl InterestNotice {
    pub fn new(notifier_username: &str, message: Option<&str>) -> Self {
        Self {
            notifier_username: notifier_username.to_string(),
            message: message.map(str::to_string),
        }
    }

    /// Trim both fields; a blank message becomes no message.
    fn normalized(self) -> Self {
        Self {
            notifier_username: self.notifier_username.trim().to_string(),
            message: self
                .message
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
        }
    }
}

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn TradeStore>,
    delivery: Arc<dyn DeliveryChannel>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn TradeStore>, delivery: Arc<dyn DeliveryChannel>) -> Self {
        Self { store, delivery }
    }

    pub async fn notify(
        &self,
        trade_post_id: &str,
        actor: &str,
        notice: InterestNotice,
    ) -> Result<UserNotification, AppError> {
        self.notify_at(trade_post_id, actor, notice, Utc::now())
            .await
    }

    /// Record interest in a listing and tell its owner.
    ///
    /// The stored notification is the result; delivery runs in the
    /// background and its failures never undo the record.
    pub async fn notify_at(
        &self,
        trade_post_id: &str,
        actor: &str,
        notice: InterestNotice,
        now: DateTime<Utc>,
    ) -> Result<UserNotification, AppError> {
        let post = self
            .store
            .get_trade_post(trade_post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Trade listing {}", trade_post_id)))?;

        if post.user_id == actor {
            tracing::warn!(trade_post_id = %post.id, user_id = %actor, "Owner tried to notify own listing");
            return Err(AppError::Unauthorized(
                "Cannot notify yourself about your own listing".to_string(),
            ));
        }

        let notice = notice.normalized();
        notice.validate()?;
        let notifier_username = notice.notifier_username.as_str();
        let message = notice.message.as_deref();

        if self
            .store
            .find_notification(&post.id, notifier_username)
            .await?
            .is_some()
        {
            return Err(AppError::DuplicateNotification);
        }

        let notification = UserNotification {
            id: UserNotification::id_for(&post.id, notifier_username),
            user_id: post.user_id.clone(),
            trade_post_id: post.id.clone(),
            notifier_username: notifier_username.to_string(),
            message: message.map(str::to_string),
            created_at: now,
            is_read: false,
        };

        // A racing request that passed the pre-check still loses here.
        self.store.insert_notification(&notification).await?;

        tracing::info!(
            notification_id = %notification.id,
            trade_post_id = %post.id,
            recipient = %post.user_id,
            "Trade interest recorded"
        );

        match self.store.get_user(&post.user_id).await {
            Ok(Some(owner)) => self.dispatch(&owner, &post, &notification),
            Ok(None) => {
                tracing::debug!(recipient = %post.user_id, "Owner has no profile, skipping delivery")
            }
            Err(e) => {
                tracing::warn!(recipient = %post.user_id, error = %e, "Owner lookup failed, skipping delivery")
            }
        }

        Ok(notification)
    }

    /// Spawn a send for each enabled channel that has a contact address.
    fn dispatch(&self, owner: &User, post: &TradePost, notification: &UserNotification) {
        let prefs = owner.notification_preference;
        let contact = &owner.notification_contact;
        let body = delivery_body(post, notification);

        let email = contact
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| prefs.email && !e.is_empty());
        if let Some(to) = email {
            let delivery = self.delivery.clone();
            let to = to.to_string();
            let body = body.clone();
            let notification_id = notification.id.clone();
            tokio::spawn(async move {
                if let Err(e) = delivery
                    .send_email(&to, "Someone wants to trade with you", &body)
                    .await
                {
                    tracing::warn!(notification_id = %notification_id, error = %e, "Email delivery failed");
                }
            });
        }

        let phone = contact
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| prefs.text && !p.is_empty());
        if let Some(to) = phone {
            let delivery = self.delivery.clone();
            let to = to.to_string();
            let notification_id = notification.id.clone();
            tokio::spawn(async move {
                if let Err(e) = delivery.send_sms(&to, &body).await {
                    tracing::warn!(notification_id = %notification_id, error = %e, "SMS delivery failed");
                }
            });
        }
    }

    /// Mark a notification read. Only its recipient may do this.
    pub async fn mark_read(&self, id: &str, actor: &str) -> Result<UserNotification, AppError> {
        let mut notification = self
            .store
            .get_notification(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notification {}", id)))?;

        if notification.user_id != actor {
            return Err(AppError::Unauthorized(
                "Only the recipient may mark a notification read".to_string(),
            ));
        }

        if !notification.is_read {
            self.store.mark_notification_read(id).await?;
            notification.is_read = true;
        }

        Ok(notification)
    }

    /// Inbox for a user, newest first.
    pub async fn list_for_recipient(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: u32,
    ) -> Result<Vec<UserNotification>, AppError> {
        self.store
            .list_notifications_for_user(user_id, unread_only, limit)
            .await
    }
}

fn delivery_body(post: &TradePost, notification: &UserNotification) -> String {
    let mut body = format!(
        "{} is interested in your trade for {} (offering {}).",
        notification.notifier_username,
        post.card_wanted,
        post.cards_for_trade.join(", ")
    );
    if let Some(message) = &notification.message {
        body.push_str("\n\n");
        body.push_str(message);
    }
    body
}
