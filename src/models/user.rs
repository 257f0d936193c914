//! User profile model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Channels the user wants to be told about trade interest on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreference {
    pub email: bool,
    pub text: bool,
}

/// Where to deliver notifications for the enabled channels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContact {
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// User profile stored in the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Identity provider subject (also used as document ID)
    pub id: String,
    pub email: String,
    /// 16 digits, no separators. `None` until the profile is completed.
    pub friend_code: Option<String>,
    pub tcg_pocket_username: Option<String>,
    #[serde(default)]
    pub notification_preference: NotificationPreference,
    #[serde(default)]
    pub notification_contact: NotificationContact,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Fields of the owner that are shown next to a listing.
    pub fn public_profile(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            email: self.email.clone(),
            friend_code: self.friend_code.clone(),
            tcg_pocket_username: self.tcg_pocket_username.clone(),
        }
    }
}

/// Public projection of a user, joined onto listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub friend_code: Option<String>,
    pub tcg_pocket_username: Option<String>,
}

/// Set membership of a card in a user's "missing" list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMissingCard {
    pub user_id: String,
    pub card_number: String,
    pub created_at: DateTime<Utc>,
}

impl UserMissingCard {
    /// Document ID derived from the (user, card) pair so the set can't hold duplicates.
    pub fn document_id(user_id: &str, card_number: &str) -> String {
        format!("{}_{}", user_id, urlencoding::encode(card_number))
    }
}
