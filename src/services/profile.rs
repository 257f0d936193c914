// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile and missing-card list.

use crate::db::TradeStore;
use crate::error::AppError;
use crate::models::{Card, NotificationContact, NotificationPreference, User, UserMissingCard};
use crate::services::CardCatalog;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use validator::{Validate, ValidateEmail};

/// Digits in an in-game friend code.
pub const FRIEND_CODE_DIGITS: usize = 16;

/// Strip everything but ASCII digits.
pub fn normalize_friend_code(code: &str) -> String {
    code.chars().filter(char::is_ascii_digit).collect()
}

/// A friend code is valid when it has exactly 16 digits once separators
/// are removed.
pub fn is_valid_friend_code(code: &str) -> bool {
    normalize_friend_code(code).len() == FRIEND_CODE_DIGITS
}

/// `1234567812345678` -> `1234-5678-1234-5678`. Input that isn't exactly
/// 16 bare digits is returned as-is.
pub fn format_friend_code(code: &str) -> String {
    if code.len() != FRIEND_CODE_DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
        return code.to_string();
    }
    code.as_bytes()
        .chunks(4)
        .map(|group| std::str::from_utf8(group).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("-")
}

/// Profile form submitted by the user.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProfileUpdate {
    pub friend_code: String,
    #[validate(length(max = 50, message = "Username must be at most 50 characters"))]
    pub tcg_pocket_username: String,
    #[serde(default)]
    pub notification_preference: NotificationPreference,
    #[serde(default)]
    pub notification_contact: NotificationContact,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ProfileUpdate {
    /// Field-level checks beyond the derived ones.
    fn check(&self) -> Result<(), AppError> {
        self.validate()?;

        if self.friend_code.trim().is_empty() {
            return Err(AppError::validation("friend_code", "Friend code is required"));
        }
        if !is_valid_friend_code(&self.friend_code) {
            return Err(AppError::validation(
                "friend_code",
                format!("Friend code must be {} digits", FRIEND_CODE_DIGITS),
            ));
        }
        if self.tcg_pocket_username.trim().is_empty() {
            return Err(AppError::validation(
                "tcg_pocket_username",
                "Username is required",
            ));
        }

        let email = non_blank(&self.notification_contact.email);
        if self.notification_preference.email && email.is_none() {
            return Err(AppError::validation(
                "notification_contact.email",
                "Email address is required for email notifications",
            ));
        }
        if email.is_some_and(|e| !e.validate_email()) {
            return Err(AppError::validation(
                "notification_contact.email",
                "Email address is not valid",
            ));
        }
        if self.notification_preference.text
            && non_blank(&self.notification_contact.phone).is_none()
        {
            return Err(AppError::validation(
                "notification_contact.phone",
                "Phone number is required for text notifications",
            ));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn TradeStore>,
    catalog: Arc<CardCatalog>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn TradeStore>, catalog: Arc<CardCatalog>) -> Self {
        Self { store, catalog }
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<User, AppError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))
    }

    /// Validate and store the profile, creating the user on first save.
    ///
    /// `account_email` is the identity provider's address, used only when
    /// the user row doesn't exist yet.
    pub async fn update_profile(
        &self,
        user_id: &str,
        account_email: Option<&str>,
        update: ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<User, AppError> {
        update.check()?;

        let contact = NotificationContact {
            email: non_blank(&update.notification_contact.email).map(str::to_string),
            phone: non_blank(&update.notification_contact.phone).map(str::to_string),
        };

        let mut user = match self.store.get_user(user_id).await? {
            Some(existing) => existing,
            None => {
                tracing::info!(user_id, "Creating user profile");
                User {
                    id: user_id.to_string(),
                    email: account_email
                        .map(str::to_string)
                        .or_else(|| contact.email.clone())
                        .unwrap_or_default(),
                    friend_code: None,
                    tcg_pocket_username: None,
                    notification_preference: NotificationPreference::default(),
                    notification_contact: NotificationContact::default(),
                    created_at: now,
                    updated_at: now,
                }
            }
        };

        user.friend_code = Some(normalize_friend_code(&update.friend_code));
        user.tcg_pocket_username = Some(update.tcg_pocket_username.trim().to_string());
        user.notification_preference = update.notification_preference;
        user.notification_contact = contact;
        user.updated_at = now;

        self.store.upsert_user(&user).await?;
        tracing::debug!(user_id, "Profile saved");

        Ok(user)
    }

    /// Flip a card's membership in the user's missing list. Returns whether
    /// the card is missing afterwards.
    pub async fn toggle_missing_card(
        &self,
        user_id: &str,
        card_number: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        self.catalog.load()?;
        let card = self
            .catalog
            .get_by_number(card_number)
            .ok_or_else(|| AppError::NotFound(format!("Card {}", card_number)))?;

        if self.store.has_missing_card(user_id, &card.number).await? {
            self.store.remove_missing_card(user_id, &card.number).await?;
            Ok(false)
        } else {
            self.store
                .add_missing_card(&UserMissingCard {
                    user_id: user_id.to_string(),
                    card_number: card.number,
                    created_at: now,
                })
                .await?;
            Ok(true)
        }
    }

    /// Cards on the user's missing list, in catalog order.
    pub async fn missing_cards(&self, user_id: &str) -> Result<Vec<Card>, AppError> {
        let numbers: Vec<String> = self
            .store
            .list_missing_cards(user_id)
            .await?
            .into_iter()
            .map(|r| r.card_number)
            .collect();
        Ok(self.catalog.get_by_numbers(&numbers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use crate::models::Rarity;

    #[test]
    fn test_friend_code_length() {
        assert!(is_valid_friend_code("1234567812345678"));
        assert!(is_valid_friend_code("1234-5678-1234-5678"));
        assert!(is_valid_friend_code(" 1234 5678 1234 5678 "));
        assert!(!is_valid_friend_code("123456781234"));
        assert!(!is_valid_friend_code("12345678123456789"));
        assert!(!is_valid_friend_code(""));
    }

    #[test]
    fn test_friend_code_formatting() {
        assert_eq!(normalize_friend_code("1234-5678-1234-5678"), "1234567812345678");
        assert_eq!(format_friend_code("1234567812345678"), "1234-5678-1234-5678");
        assert_eq!(format_friend_code("1234-5678-1234-5678"), "1234-5678-1234-5678");
        assert_eq!(format_friend_code("123456781234"), "123456781234");
    }

    fn update() -> ProfileUpdate {
        ProfileUpdate {
            friend_code: "1234-5678-1234-5678".to_string(),
            tcg_pocket_username: " Ash ".to_string(),
            notification_preference: NotificationPreference::default(),
            notification_contact: NotificationContact::default(),
        }
    }

    fn service() -> ProfileService {
        let catalog = CardCatalog::from_cards(vec![Card {
            number: "A1-001".to_string(),
            name: "Bulbasaur".to_string(),
            rarity: Rarity::OneDiamond,
            exclusive_pack: "Mewtwo".to_string(),
        }]);
        ProfileService::new(Arc::new(MemoryDb::new()), Arc::new(catalog))
    }

    fn field_of(err: AppError) -> String {
        match err {
            AppError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_profile_creates_user() {
        let service = service();
        let now = Utc::now();
        let user = service
            .update_profile("u1", Some("ash@example.com"), update(), now)
            .await
            .unwrap();

        assert_eq!(user.email, "ash@example.com");
        assert_eq!(user.friend_code.as_deref(), Some("1234567812345678"));
        assert_eq!(user.tcg_pocket_username.as_deref(), Some("Ash"));
        assert_eq!(service.get_profile("u1").await.unwrap().created_at, now);
    }

    #[tokio::test]
    async fn test_update_profile_rules() {
        let service = service();
        let now = Utc::now();

        let mut bad = update();
        bad.friend_code = "123456781234".to_string();
        let err = service.update_profile("u1", None, bad, now).await.unwrap_err();
        assert_eq!(field_of(err), "friend_code");

        let mut bad = update();
        bad.tcg_pocket_username = "  ".to_string();
        let err = service.update_profile("u1", None, bad, now).await.unwrap_err();
        assert_eq!(field_of(err), "tcg_pocket_username");

        let mut bad = update();
        bad.notification_preference.email = true;
        let err = service.update_profile("u1", None, bad, now).await.unwrap_err();
        assert_eq!(field_of(err), "notification_contact.email");

        let mut bad = update();
        bad.notification_preference.text = true;
        bad.notification_contact.phone = Some(" ".to_string());
        let err = service.update_profile("u1", None, bad, now).await.unwrap_err();
        assert_eq!(field_of(err), "notification_contact.phone");

        let mut ok = update();
        ok.notification_preference.text = true;
        ok.notification_contact.phone = Some("555-0100".to_string());
        assert!(service.update_profile("u1", None, ok, now).await.is_ok());
    }

    #[tokio::test]
    async fn test_toggle_missing_card() {
        let service = service();
        let now = Utc::now();

        assert!(service.toggle_missing_card("u1", "A1-001", now).await.unwrap());
        assert_eq!(service.missing_cards("u1").await.unwrap().len(), 1);

        assert!(!service.toggle_missing_card("u1", "A1-001", now).await.unwrap());
        assert!(service.missing_cards("u1").await.unwrap().is_empty());

        assert!(matches!(
            service.toggle_missing_card("u1", "ZZZ-999", now).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_toggle_with_unreadable_catalog_is_unavailable() {
        let service = ProfileService::new(
            Arc::new(MemoryDb::new()),
            Arc::new(CardCatalog::from_file("does/not/exist.json")),
        );

        assert!(matches!(
            service.toggle_missing_card("u1", "A1-001", Utc::now()).await,
            Err(AppError::BackendUnavailable(_))
        ));
        // Read paths still degrade to an empty list
        assert!(service.missing_cards("u1").await.unwrap().is_empty());
    }
}
