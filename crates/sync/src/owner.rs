//! The signed-in owner a collection is scoped to.
//!
//! Authentication itself belongs to another part of the application. The
//! sync layer only ever *reads* who is signed in, through [`OwnerSource`],
//! which is handed to a collection at construction time.

use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::watch;

use storefront_sync_core::OwnerId;

/// An authenticated owner: the user's ID plus the bearer credential used for
/// every remote call made on their behalf.
///
/// The credential is a [`SecretString`], so it is redacted from `Debug`.
#[derive(Debug, Clone)]
pub struct Owner {
    id: OwnerId,
    token: SecretString,
}

impl Owner {
    /// Create an owner from an ID and bearer token.
    #[must_use]
    pub fn new(id: OwnerId, token: impl Into<String>) -> Self {
        Self {
            id,
            token: SecretString::from(token.into()),
        }
    }

    #[must_use]
    pub const fn id(&self) -> OwnerId {
        self.id
    }

    #[must_use]
    pub const fn token(&self) -> &SecretString {
        &self.token
    }
}

/// Read-only access to the currently signed-in owner.
pub trait OwnerSource: Send + Sync {
    /// The owner right now, or `None` when nobody is signed in.
    fn current_owner(&self) -> Option<Owner>;
}

/// A fixed owner (or none), e.g. one loaded from configuration.
impl OwnerSource for Option<Owner> {
    fn current_owner(&self) -> Option<Owner> {
        self.clone()
    }
}

/// The receiving half of the auth state channel.
impl OwnerSource for watch::Receiver<Option<Owner>> {
    fn current_owner(&self) -> Option<Owner> {
        self.borrow().clone()
    }
}

impl<T: OwnerSource + ?Sized> OwnerSource for Arc<T> {
    fn current_owner(&self) -> Option<Owner> {
        (**self).current_owner()
    }
}
