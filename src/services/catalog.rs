// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Card catalog: static card metadata loaded once and cached in memory.

use crate::models::{Card, Rarity};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Loaded catalog contents.
#[derive(Debug, Default)]
struct CatalogIndex {
    /// Cards in dataset order
    cards: Vec<Card>,
    /// Card number -> position in `cards`
    by_number: HashMap<String, usize>,
}

impl CatalogIndex {
    fn build(cards: Vec<Card>) -> Self {
        let by_number = cards
            .iter()
            .enumerate()
            .map(|(i, c)| (c.number.clone(), i))
            .collect();
        Self { cards, by_number }
    }

    fn get(&self, number: &str) -> Option<&Card> {
        self.by_number.get(number).map(|&i| &self.cards[i])
    }
}

/// Read-only card lookup shared by the services that need card details.
///
/// Loading is lazy and idempotent; a failed load is not remembered, so the
/// next call tries again.
#[derive(Debug)]
pub struct CardCatalog {
    source: Option<PathBuf>,
    index: OnceLock<CatalogIndex>,
}

impl CardCatalog {
    /// Catalog backed by a JSON file (an array of cards). Nothing is read until first use.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source: Some(path.as_ref().to_path_buf()),
            index: OnceLock::new(),
        }
    }

    /// Catalog over an in-memory card list, already loaded.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        let index = OnceLock::new();
        let _ = index.set(CatalogIndex::build(cards));
        Self {
            source: None,
            index,
        }
    }

    /// Populate the catalog if it isn't loaded yet. Returns the number of cards.
    pub fn load(&self) -> Result<usize, CatalogError> {
        Ok(self.try_index()?.cards.len())
    }

    fn try_index(&self) -> Result<&CatalogIndex, CatalogError> {
        if let Some(index) = self.index.get() {
            return Ok(index);
        }

        let path = self.source.as_ref().ok_or(CatalogError::NoSource)?;
        let json_data =
            fs::read_to_string(path).map_err(|e| CatalogError::IoError(e.to_string()))?;
        let cards: Vec<Card> =
            serde_json::from_str(&json_data).map_err(|e| CatalogError::ParseError(e.to_string()))?;

        tracing::info!(count = cards.len(), path = %path.display(), "Loaded card catalog");

        // A concurrent loader may have won; either copy is identical.
        Ok(self.index.get_or_init(|| CatalogIndex::build(cards)))
    }

    /// Index for read paths: a load failure degrades to an empty catalog.
    fn index(&self) -> &CatalogIndex {
        static EMPTY: OnceLock<CatalogIndex> = OnceLock::new();

        match self.try_index() {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(error = %e, "Card catalog unavailable, serving empty results");
                EMPTY.get_or_init(CatalogIndex::default)
            }
        }
    }

    pub fn get_by_number(&self, number: &str) -> Option<Card> {
        self.index().get(number).cloned()
    }

    /// Cards for the given numbers, in catalog order. Unknown numbers are dropped.
    pub fn get_by_numbers<S: AsRef<str>>(&self, numbers: &[S]) -> Vec<Card> {
        let index = self.index();
        let mut positions: Vec<usize> = numbers
            .iter()
            .filter_map(|n| index.by_number.get(n.as_ref()).copied())
            .collect();
        positions.sort_unstable();
        positions.dedup();
        positions.into_iter().map(|i| index.cards[i].clone()).collect()
    }

    pub fn get_by_rarity(&self, rarity: Rarity) -> Vec<Card> {
        self.index()
            .cards
            .iter()
            .filter(|c| c.rarity == rarity)
            .cloned()
            .collect()
    }

    pub fn get_all_cards(&self) -> Vec<Card> {
        self.index().cards.clone()
    }

    /// Case-insensitive substring search over number, name and pack,
    /// optionally narrowed to one rarity. An empty query matches everything.
    pub fn search(&self, query: &str, rarity: Option<Rarity>) -> Vec<Card> {
        let needle = query.trim().to_lowercase();

        self.index()
            .cards
            .iter()
            .filter(|card| rarity.is_none_or(|r| card.rarity == r))
            .filter(|card| {
                needle.is_empty()
                    || card.number.to_lowercase().contains(&needle)
                    || card.name.to_lowercase().contains(&needle)
                    || card.exclusive_pack.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }
}

/// Errors from catalog loading.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read file: {0}")]
    IoError(String),

    #[error("Failed to parse card data: {0}")]
    ParseError(String),

    #[error("Catalog has no data source")]
    NoSource,
}
