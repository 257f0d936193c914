// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod catalog;
pub mod delivery;
pub mod lifecycle;
pub mod listings;
pub mod notifications;
pub mod profile;

pub use catalog::{CardCatalog, CatalogError};
pub use delivery::{DeliveryChannel, LogDelivery};
pub use lifecycle::{NewTradePost, TradeLifecycle};
pub use listings::{Dashboard, FeedQuery, ListingPage, ListingQuery, OwnerListings};
pub use notifications::{InterestNotice, NotificationService};
pub use profile::{ProfileService, ProfileUpdate};
