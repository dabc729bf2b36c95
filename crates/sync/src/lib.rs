//! Storefront Sync - Optimistic synchronization of user-scoped collections.
//!
//! Keeps a local, in-memory copy of a signed-in user's favorites or cart in
//! step with the remote storefront API.
//!
//! # Architecture
//!
//! - [`store`] - `RemoteStore` trait and the `reqwest`-backed [`HttpStore`]
//! - [`owner`] - The signed-in owner and the read-only [`OwnerSource`] capability
//! - [`collection`] - [`ReconciledCollection`], which applies mutation intents
//!   optimistically and rolls them back when the remote call fails
//! - [`notify`] - Fire-and-forget user notifications
//! - [`bindings`] - Cheap, cloneable accessors for display code
//!
//! Remote errors never escape a collection: callers observe a consistent
//! collection plus an out-of-band notification.
//!
//! # Example
//!
//! ```rust,ignore
//! use storefront_sync::{HttpStore, ReconciledCollection, SyncConfig, TracingSink};
//!
//! let config = SyncConfig::from_env()?;
//! let store = HttpStore::new(&config)?;
//! let collection = ReconciledCollection::new(store, config.owner.clone(), TracingSink, config.collection);
//! collection.sync_owner().await;
//!
//! let favorites = collection.into_bindings();
//! favorites.toggle(member).await;
//! assert!(favorites.is_member(member_id));
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod bindings;
pub mod collection;
pub mod config;
pub mod error;
pub mod notify;
pub mod owner;
pub mod store;

pub use bindings::Bindings;
pub use collection::{IntentOutcome, ReconciledCollection, SyncState};
pub use config::{ConfigError, SyncConfig};
pub use error::{Result, SyncError};
pub use notify::{ChannelSink, Notification, NotificationKind, NotificationSink, TracingSink};
pub use owner::{Owner, OwnerSource};
pub use store::{HttpStore, RemoteStore, StoreError};

pub use storefront_sync_core::{CollectionKind, Member, MemberId, OwnerId, Price};
