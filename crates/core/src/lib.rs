//! Storefront Sync Core - Shared types library.
//!
//! This crate provides the types shared by the sync components:
//! - `storefront-sync` - Remote store client and reconciled collections
//! - `storefront-sync-cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no runtime.
//! This keeps it lightweight and allows it to be used anywhere, including by
//! display code that only renders members.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, prices, and collection members

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
