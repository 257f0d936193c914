// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trade-interest notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest message a notifier may attach.
pub const MAX_MESSAGE_LEN: usize = 200;

/// Notice that someone is interested in a listing, addressed to its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserNotification {
    /// Derived from (trade_post_id, notifier_username), see [`UserNotification::id_for`]
    pub id: String,
    /// Recipient (the listing owner)
    pub user_id: String,
    pub trade_post_id: String,
    /// Free text, not a validated account
    pub notifier_username: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

impl UserNotification {
    /// Name-based ID for a (listing, notifier) pair.
    ///
    /// Two notices from the same claimed username for the same listing map to
    /// the same document, so a create-only insert rejects the second one.
    pub fn id_for(trade_post_id: &str, notifier_username: &str) -> String {
        let key = format!("{}\u{1f}{}", trade_post_id, notifier_username);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_deterministic_per_pair() {
        let a = UserNotification::id_for("trade-1", "Ash");
        let b = UserNotification::id_for("trade-1", "Ash");
        let c = UserNotification::id_for("trade-1", "Misty");
        let d = UserNotification::id_for("trade-2", "Ash");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_id_separator_prevents_ambiguous_concatenation() {
        assert_ne!(
            UserNotification::id_for("ab", "c"),
            UserNotification::id_for("a", "bc")
        );
    }
}
