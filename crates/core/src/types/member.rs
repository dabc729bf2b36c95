//! Collection members and collection kinds.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::MemberId;
use super::price::Price;

/// One entry tracked inside a user-scoped collection.
///
/// Besides the identifier, a member carries denormalized display data so a
/// product card can render without a second lookup. Only `id` takes part in
/// membership; two members with the same ID are the same member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    /// When the server recorded the member, if it reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

impl Member {
    /// Create a member with only an ID and display name.
    #[must_use]
    pub fn new(id: MemberId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            handle: None,
            price: None,
            added_at: None,
        }
    }

    /// Attach a product handle.
    #[must_use]
    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    /// Attach a display price.
    #[must_use]
    pub const fn with_price(mut self, price: Price) -> Self {
        self.price = Some(price);
        self
    }
}

/// Returned when a collection name is not one of the known kinds.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown collection '{0}' (expected 'favorites' or 'cart')")]
pub struct UnknownCollection(pub String);

/// The user-scoped collections the storefront keeps in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    #[default]
    Favorites,
    Cart,
}

impl CollectionKind {
    /// Path segment the remote API uses for this collection.
    #[must_use]
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::Favorites => "favorites",
            Self::Cart => "cart",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

impl FromStr for CollectionKind {
    type Err = UnknownCollection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "favorites" | "favourites" | "wishlist" => Ok(Self::Favorites),
            "cart" => Ok(Self::Cart),
            other => Err(UnknownCollection(other.to_string())),
        }
    }
}
