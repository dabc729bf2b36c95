//! Remote store clients.
//!
//! The remote API is the source of truth for a user's collections. A
//! [`RemoteStore`] issues the three calls a collection needs and nothing
//! else: no retries, no caching, no idempotency keys. Failures are returned
//! unchanged so the caller decides what to roll back.

mod http;

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

use storefront_sync_core::{Member, MemberId};

use crate::owner::Owner;

pub use http::{HttpStore, REQUEST_ID_HEADER};

/// Errors that can occur when talking to the remote store.
///
/// Every variant is a network error from the collection's point of view; a
/// malformed body is reported separately only for diagnostics.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed (connection refused, timeout, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Response body did not have the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Base URL cannot have path segments appended (e.g. `mailto:`).
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl StoreError {
    /// Whether the server answered with 401/403.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

/// CRUD access to one named collection on the remote store.
///
/// Implementations must be cheap to share; a collection holds its store for
/// its whole lifetime and calls it from concurrent intents.
pub trait RemoteStore: Send + Sync {
    /// Fetch every member of the owner's collection.
    fn fetch_all(
        &self,
        owner: &Owner,
    ) -> impl Future<Output = Result<Vec<Member>, StoreError>> + Send;

    /// Add a member to the owner's collection.
    fn add(
        &self,
        owner: &Owner,
        member: &Member,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove a member from the owner's collection.
    fn remove(
        &self,
        owner: &Owner,
        member_id: MemberId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl<T: RemoteStore> RemoteStore for Arc<T> {
    fn fetch_all(
        &self,
        owner: &Owner,
    ) -> impl Future<Output = Result<Vec<Member>, StoreError>> + Send {
        (**self).fetch_all(owner)
    }

    fn add(
        &self,
        owner: &Owner,
        member: &Member,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).add(owner, member)
    }

    fn remove(
        &self,
        owner: &Owner,
        member_id: MemberId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).remove(owner, member_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_unauthorized() {
        let unauthorized = StoreError::Status {
            status: 401,
            message: String::new(),
        };
        let unavailable = StoreError::Status {
            status: 503,
            message: String::new(),
        };
        assert!(unauthorized.is_unauthorized());
        assert!(!unavailable.is_unauthorized());
        assert!(!StoreError::Malformed("x".to_string()).is_unauthorized());
    }
}
