// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Card catalog entries and rarity tiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rarity tier of a card. Listings are scoped to a single tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rarity {
    #[serde(rename = "1-diamond")]
    OneDiamond,
    #[serde(rename = "2-diamond")]
    TwoDiamond,
    #[serde(rename = "3-diamond")]
    ThreeDiamond,
    #[serde(rename = "4-diamond")]
    FourDiamond,
    #[serde(rename = "1-star")]
    OneStar,
}

impl Rarity {
    pub const ALL: [Rarity; 5] = [
        Rarity::OneDiamond,
        Rarity::TwoDiamond,
        Rarity::ThreeDiamond,
        Rarity::FourDiamond,
        Rarity::OneStar,
    ];

    /// Stored/wire form, e.g. `"3-diamond"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::OneDiamond => "1-diamond",
            Rarity::TwoDiamond => "2-diamond",
            Rarity::ThreeDiamond => "3-diamond",
            Rarity::FourDiamond => "4-diamond",
            Rarity::OneStar => "1-star",
        }
    }

    /// Human-readable label, e.g. `"3 Diamond"`.
    pub fn display_name(&self) -> &'static str {
        match self {
            Rarity::OneDiamond => "1 Diamond",
            Rarity::TwoDiamond => "2 Diamond",
            Rarity::ThreeDiamond => "3 Diamond",
            Rarity::FourDiamond => "4 Diamond",
            Rarity::OneStar => "1 Star",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rarity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rarity::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("Unknown rarity: {}", s))
    }
}

/// A card from the static catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Catalog number (e.g., "A1-001"), unique
    pub number: String,
    pub name: String,
    pub rarity: Rarity,
    /// Booster pack the card is exclusive to
    pub exclusive_pack: String,
}

impl Card {
    pub const UNKNOWN_NAME: &'static str = "Unknown Card";
    pub const UNKNOWN_PACK: &'static str = "Unknown";

    /// Stand-in for a card number the catalog does not know about.
    /// Takes the rarity of the listing that references it.
    pub fn placeholder(number: &str, rarity: Rarity) -> Self {
        Self {
            number: number.to_string(),
            name: Self::UNKNOWN_NAME.to_string(),
            rarity,
            exclusive_pack: Self::UNKNOWN_PACK.to_string(),
        }
    }
}
