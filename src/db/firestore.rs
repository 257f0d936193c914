// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper implementing [`TradeStore`].
//!
//! Provides typed operations for:
//! - Users (profile storage)
//! - User missing cards (set membership, keyed by user and card)
//! - Trade posts (listings and their lifecycle flags)
//! - User notifications (keyed by listing and notifier)

use crate::db::{collections, same_lifecycle_state, ListingFilter, TradeStore};
use crate::error::AppError;
use crate::models::{Rarity, TradePost, User, UserMissingCard, UserNotification};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::errors::FirestoreError;
use firestore::select_filter_builder::FirestoreQueryFilterBuilder;
use firestore::{
    FirestoreConsistencySelector, FirestoreQueryDirection, FirestoreQueryFilter, FirestoreTimestamp,
};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore caps `in` filters at 30 values.
const IN_FILTER_LIMIT: usize = 30;

/// Stored form of a [`TradePost`].
///
/// Timestamps are kept as native Firestore timestamps so range filters and
/// ordering on them are chronological.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TradePostDoc {
    id: String,
    user_id: String,
    card_wanted: String,
    cards_for_trade: Vec<String>,
    rarity: Rarity,
    #[serde(with = "firestore::serialize_as_timestamp")]
    created_at: DateTime<Utc>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    updated_at: DateTime<Utc>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    last_refreshed: DateTime<Utc>,
    is_active: bool,
    is_completed: bool,
}

impl From<&TradePost> for TradePostDoc {
    fn from(p: &TradePost) -> Self {
        Self {
            id: p.id.clone(),
            user_id: p.user_id.clone(),
            card_wanted: p.card_wanted.clone(),
            cards_for_trade: p.cards_for_trade.clone(),
            rarity: p.rarity,
            created_at: p.created_at,
            updated_at: p.updated_at,
            last_refreshed: p.last_refreshed,
            is_active: p.is_active,
            is_completed: p.is_completed,
        }
    }
}

impl From<TradePostDoc> for TradePost {
    fn from(d: TradePostDoc) -> Self {
        Self {
            id: d.id,
            user_id: d.user_id,
            card_wanted: d.card_wanted,
            cards_for_trade: d.cards_for_trade,
            rarity: d.rarity,
            created_at: d.created_at,
            updated_at: d.updated_at,
            last_refreshed: d.last_refreshed,
            is_active: d.is_active,
            is_completed: d.is_completed,
        }
    }
}

/// Stored form of a [`UserNotification`], with a native timestamp for ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NotificationDoc {
    id: String,
    user_id: String,
    trade_post_id: String,
    notifier_username: String,
    message: Option<String>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    created_at: DateTime<Utc>,
    is_read: bool,
}

impl From<&UserNotification> for NotificationDoc {
    fn from(n: &UserNotification) -> Self {
        Self {
            id: n.id.clone(),
            user_id: n.user_id.clone(),
            trade_post_id: n.trade_post_id.clone(),
            notifier_username: n.notifier_username.clone(),
            message: n.message.clone(),
            created_at: n.created_at,
            is_read: n.is_read,
        }
    }
}

impl From<NotificationDoc> for UserNotification {
    fn from(d: NotificationDoc) -> Self {
        Self {
            id: d.id,
            user_id: d.user_id,
            trade_post_id: d.trade_post_id,
            notifier_username: d.notifier_username,
            message: d.message,
            created_at: d.created_at,
            is_read: d.is_read,
        }
    }
}

fn db_err(e: FirestoreError) -> AppError {
    AppError::BackendUnavailable(e.to_string())
}

/// A commit rejected because a document read in the transaction changed.
fn is_contention(e: &FirestoreError) -> bool {
    matches!(e, FirestoreError::DatabaseError(d) if d.public.code == "Aborted")
}

/// Feed filter: active, not completed, plus the optional rarity and card.
fn active_filter(
    filter: &ListingFilter,
) -> impl Fn(FirestoreQueryFilterBuilder) -> Option<FirestoreQueryFilter> {
    let rarity = filter.rarity.map(|r| r.as_str().to_string());
    let card_number = filter.card_number.clone();

    move |q| {
        q.for_all([
            q.field("is_active").eq(true),
            q.field("is_completed").eq(false),
            rarity.clone().and_then(|r| q.field("rarity").eq(r)),
            card_number.clone().and_then(|n| {
                q.for_any([
                    q.field("card_wanted").eq(n.clone()),
                    q.field("cards_for_trade").array_contains(n),
                ])
            }),
        ])
    }
}

#[derive(Debug, Deserialize)]
struct CountResult {
    count: u64,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            AppError::BackendUnavailable(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::BackendUnavailable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client.as_ref().ok_or_else(|| {
            AppError::BackendUnavailable("Database not connected (offline mode)".to_string())
        })
    }

    /// Active, non-completed listings matching the filter, in feed order.
    async fn query_active(
        &self,
        filter: &ListingFilter,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<TradePost>, AppError> {
        let docs: Vec<TradePostDoc> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::TRADE_POSTS)
            .filter(active_filter(filter))
            .order_by([("last_refreshed", FirestoreQueryDirection::Descending)])
            .offset(offset)
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(db_err)?;
        Ok(docs.into_iter().map(TradePost::from).collect())
    }

    async fn put_trade_post(&self, post: &TradePost) -> Result<(), AppError> {
        let doc = TradePostDoc::from(post);
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::TRADE_POSTS)
            .document_id(&post.id)
            .object(&doc)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl TradeStore for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(db_err)
    }

    async fn get_users(&self, user_ids: &[String]) -> Result<Vec<User>, AppError> {
        let client = self.get_client()?;
        let mut users = Vec::with_capacity(user_ids.len());

        for chunk in user_ids.chunks(IN_FILTER_LIMIT) {
            let ids = chunk.to_vec();
            let found: Vec<User> = client
                .fluent()
                .select()
                .from(collections::USERS)
                .filter(move |q| q.for_all([q.field("id").is_in(ids.clone())]))
                .obj()
                .query()
                .await
                .map_err(db_err)?;
            users.extend(found);
        }

        Ok(users)
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    // ─── Missing Card Operations ─────────────────────────────────

    async fn list_missing_cards(&self, user_id: &str) -> Result<Vec<UserMissingCard>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USER_MISSING_CARDS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .order_by([("card_number", FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    async fn has_missing_card(&self, user_id: &str, card_number: &str) -> Result<bool, AppError> {
        let record: Option<UserMissingCard> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_MISSING_CARDS)
            .obj()
            .one(&UserMissingCard::document_id(user_id, card_number))
            .await
            .map_err(db_err)?;
        Ok(record.is_some())
    }

    async fn add_missing_card(&self, record: &UserMissingCard) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USER_MISSING_CARDS)
            .document_id(UserMissingCard::document_id(
                &record.user_id,
                &record.card_number,
            ))
            .object(record)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn remove_missing_card(
        &self,
        user_id: &str,
        card_number: &str,
    ) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USER_MISSING_CARDS)
            .document_id(UserMissingCard::document_id(user_id, card_number))
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    // ─── Trade Post Operations ───────────────────────────────────

    async fn insert_trade_post(&self, post: &TradePost) -> Result<(), AppError> {
        self.put_trade_post(post).await
    }

    async fn get_trade_post(&self, id: &str) -> Result<Option<TradePost>, AppError> {
        let doc: Option<TradePostDoc> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::TRADE_POSTS)
            .obj()
            .one(id)
            .await
            .map_err(db_err)?;
        Ok(doc.map(TradePost::from))
    }

    /// Read-check-write inside one transaction.
    ///
    /// The read is bound to the transaction, so a write to the listing that
    /// commits between the read and our commit aborts the commit and the
    /// replace reports `false`.
    async fn replace_trade_post_if(
        &self,
        expected: &TradePost,
        updated: &TradePost,
    ) -> Result<bool, AppError> {
        let client = self.get_client()?;

        let mut transaction = client.begin_transaction().await.map_err(|e| {
            AppError::BackendUnavailable(format!("Failed to begin transaction: {}", e))
        })?;

        let current: Option<TradePostDoc> = client
            .clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ))
            .fluent()
            .select()
            .by_id_in(collections::TRADE_POSTS)
            .obj()
            .one(&expected.id)
            .await
            .map_err(db_err)?;

        let unchanged = current
            .map(TradePost::from)
            .is_some_and(|c| same_lifecycle_state(&c, expected));

        if !unchanged {
            tracing::debug!(trade_post_id = %expected.id, "Listing changed underneath update");
            let _ = transaction.rollback().await;
            return Ok(false);
        }

        let doc = TradePostDoc::from(updated);
        client
            .fluent()
            .update()
            .in_col(collections::TRADE_POSTS)
            .document_id(&updated.id)
            .object(&doc)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::BackendUnavailable(format!(
                    "Failed to add listing to transaction: {}",
                    e
                ))
            })?;

        match transaction.commit().await {
            Ok(_) => Ok(true),
            Err(e) if is_contention(&e) => {
                tracing::debug!(trade_post_id = %expected.id, "Listing update lost a race");
                Ok(false)
            }
            Err(e) => Err(AppError::BackendUnavailable(format!(
                "Transaction commit failed: {}",
                e
            ))),
        }
    }

    async fn expire_stale_trade_posts(&self, cutoff: DateTime<Utc>) -> Result<usize, AppError> {
        let stale: Vec<TradePostDoc> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::TRADE_POSTS)
            .filter(move |q| {
                q.for_all([
                    q.field("is_active").eq(true),
                    q.field("last_refreshed")
                        .less_than_or_equal(FirestoreTimestamp(cutoff)),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(db_err)?;

        // Each listing is re-read inside its own transaction, so a refresh
        // that lands after the query above is not overwritten.
        let results = stream::iter(stale.into_iter().map(TradePost::from))
            .map(|post| async move {
                let mut expired = post.clone();
                expired.is_active = false;
                self.replace_trade_post_if(&post, &expired).await
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<bool, AppError>>>()
            .await;

        let mut count = 0;
        for result in results {
            if result? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn count_active_trade_posts(&self, filter: &ListingFilter) -> Result<u64, AppError> {
        let counts: Vec<CountResult> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::TRADE_POSTS)
            .filter(active_filter(filter))
            .aggregate(|a| a.fields([a.field("count").count()]))
            .obj()
            .query()
            .await
            .map_err(db_err)?;
        Ok(counts.first().map_or(0, |c| c.count))
    }

    async fn list_active_trade_posts(
        &self,
        filter: &ListingFilter,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<TradePost>, AppError> {
        self.query_active(filter, offset, limit).await
    }

    async fn list_trade_posts_for_user(&self, user_id: &str) -> Result<Vec<TradePost>, AppError> {
        let user_id = user_id.to_string();
        let docs: Vec<TradePostDoc> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::TRADE_POSTS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .order_by([("created_at", FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(db_err)?;
        Ok(docs.into_iter().map(TradePost::from).collect())
    }

    async fn recent_active_trade_posts(&self, limit: u32) -> Result<Vec<TradePost>, AppError> {
        let docs: Vec<TradePostDoc> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::TRADE_POSTS)
            .filter(|q| {
                q.for_all([
                    q.field("is_active").eq(true),
                    q.field("is_completed").eq(false),
                ])
            })
            .order_by([("created_at", FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(db_err)?;
        Ok(docs.into_iter().map(TradePost::from).collect())
    }

    // ─── Notification Operations ─────────────────────────────────

    async fn find_notification(
        &self,
        trade_post_id: &str,
        notifier_username: &str,
    ) -> Result<Option<UserNotification>, AppError> {
        self.get_notification(&UserNotification::id_for(trade_post_id, notifier_username))
            .await
    }

    async fn insert_notification(&self, notification: &UserNotification) -> Result<(), AppError> {
        let doc = NotificationDoc::from(notification);
        let result: Result<(), FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USER_NOTIFICATIONS)
            .document_id(&notification.id)
            .object(&doc)
            .execute()
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(FirestoreError::DataConflictError(_)) => Err(AppError::DuplicateNotification),
            Err(e) => Err(db_err(e)),
        }
    }

    async fn get_notification(&self, id: &str) -> Result<Option<UserNotification>, AppError> {
        let doc: Option<NotificationDoc> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_NOTIFICATIONS)
            .obj()
            .one(id)
            .await
            .map_err(db_err)?;
        Ok(doc.map(UserNotification::from))
    }

    async fn mark_notification_read(&self, id: &str) -> Result<(), AppError> {
        let mut notification = self
            .get_notification(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notification {}", id)))?;
        if notification.is_read {
            return Ok(());
        }
        notification.is_read = true;

        let doc = NotificationDoc::from(&notification);
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(["is_read"])
            .in_col(collections::USER_NOTIFICATIONS)
            .document_id(id)
            .object(&doc)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn list_notifications_for_user(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: u32,
    ) -> Result<Vec<UserNotification>, AppError> {
        let user_id = user_id.to_string();
        let docs: Vec<NotificationDoc> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USER_NOTIFICATIONS)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    unread_only.then(|| q.field("is_read").eq(false)).flatten(),
                ])
            })
            .order_by([("created_at", FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(db_err)?;
        Ok(docs.into_iter().map(UserNotification::from).collect())
    }
}
