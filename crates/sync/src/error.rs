//! Error types for collection sync.

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by a [`ReconciledCollection`](crate::ReconciledCollection).
///
/// Mutation intents never return these as `Err`; they are carried inside an
/// [`IntentOutcome`](crate::IntentOutcome) so the caller always sees a
/// consistent collection.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No owner is signed in.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// The collection has not finished its first load for this owner.
    #[error("Collection is still loading")]
    NotReady,

    /// The remote store rejected the call or could not be reached.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for `SyncError`.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_display() {
        assert_eq!(
            SyncError::AuthenticationRequired.to_string(),
            "Authentication required"
        );

        let err = SyncError::from(StoreError::Status {
            status: 503,
            message: "down".to_string(),
        });
        assert_eq!(err.to_string(), "Store error: API error: 503 - down");
    }
}
