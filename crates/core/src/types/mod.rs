//! Core types for storefront sync.
//!
//! This module provides type-safe wrappers for the domain concepts a
//! user-scoped collection deals in.

pub mod id;
pub mod member;
pub mod price;

pub use id::*;
pub use member::{CollectionKind, Member, UnknownCollection};
pub use price::{CurrencyCode, Price};
