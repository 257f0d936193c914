// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod card;
pub mod notification;
pub mod trade;
pub mod user;

pub use card::{Card, Rarity};
pub use notification::UserNotification;
pub use trade::{ListingStatus, TradePost, TradePostWithCards};
pub use user::{NotificationContact, NotificationPreference, PublicUser, User, UserMissingCard};
