// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pocket-Trader: trade matching for the Pokémon TCG Pocket card game
//!
//! This crate provides the backend API for posting "want X, offer Y" trade
//! listings, browsing them, and notifying listing owners of interest.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::TradeStore;
use services::{
    CardCatalog, DeliveryChannel, ListingQuery, NotificationService, ProfileService,
    TradeLifecycle,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub catalog: Arc<CardCatalog>,
    pub lifecycle: TradeLifecycle,
    pub listings: ListingQuery,
    pub notifications: NotificationService,
    pub profile: ProfileService,
}

impl AppState {
    /// Wire the services over one store and catalog.
    pub fn new(
        config: Config,
        store: Arc<dyn TradeStore>,
        catalog: Arc<CardCatalog>,
        delivery: Arc<dyn DeliveryChannel>,
    ) -> Self {
        let lifecycle = TradeLifecycle::new(store.clone(), catalog.clone());
        let listings = ListingQuery::new(
            store.clone(),
            catalog.clone(),
            lifecycle.clone(),
            config.max_page_size,
        );
        let notifications = NotificationService::new(store.clone(), delivery);
        let profile = ProfileService::new(store, catalog.clone());

        Self {
            config,
            catalog,
            lifecycle,
            listings,
            notifications,
            profile,
        }
    }
}
