//! Collection commands.
//!
//! Every command builds an [`HttpStore`] from the environment, syncs the
//! configured owner, and then reads or mutates the collection through the
//! same [`Bindings`] a storefront page would use.

use storefront_sync::{
    Bindings, ConfigError, HttpStore, IntentOutcome, Owner, ReconciledCollection, StoreError,
    SyncConfig, SyncError, TracingSink,
};
use storefront_sync_core::{Member, MemberId};
use thiserror::Error;

/// Bindings as the CLI builds them.
pub type CliBindings = Bindings<HttpStore, Option<Owner>, TracingSink>;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// HTTP client could not be built.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// No owner configured.
    #[error("No owner configured; set SYNC_OWNER_ID and SYNC_OWNER_TOKEN")]
    NoOwner,

    /// The initial fetch failed, so the collection cannot be trusted.
    #[error("Could not load the {0} collection (see log for details)")]
    LoadFailed(String),

    /// A mutation intent did not go through.
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// JSON output could not be rendered.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Build and load the collection for the configured owner.
///
/// # Errors
///
/// Returns an error if configuration is missing, no owner is configured, or
/// the initial fetch fails.
pub async fn open() -> Result<CliBindings, CommandError> {
    let config = SyncConfig::from_env()?;
    if config.owner.is_none() {
        return Err(CommandError::NoOwner);
    }

    let store = HttpStore::new(&config)?;
    let collection =
        ReconciledCollection::new(store, config.owner.clone(), TracingSink, config.collection);
    collection.sync_owner().await;

    if collection.last_load_failed() {
        return Err(CommandError::LoadFailed(config.collection.to_string()));
    }
    Ok(collection.into_bindings())
}

/// Build a member from command-line arguments.
#[must_use]
pub fn member(id: MemberId, name: Option<String>, handle: Option<String>) -> Member {
    let member = Member::new(id, name.unwrap_or_else(|| format!("Product {id}")));
    match handle {
        Some(handle) => member.with_handle(handle),
        None => member,
    }
}

/// Print the collection to stdout.
///
/// # Errors
///
/// Returns an error if JSON rendering fails.
#[allow(clippy::print_stdout)]
pub fn list(favorites: &CliBindings, json: bool) -> Result<(), CommandError> {
    let members = favorites.members();

    if json {
        println!("{}", serde_json::to_string_pretty(&members)?);
        return Ok(());
    }

    for member in &members {
        let price = member
            .price
            .map(|p| p.to_string())
            .unwrap_or_default();
        println!("{}\t{}\t{}", member.id, member.name, price);
    }
    tracing::info!(
        count = members.len(),
        collection = %favorites.collection().kind(),
        "Listed collection"
    );
    Ok(())
}

/// Toggle a member.
///
/// # Errors
///
/// Returns an error if the intent was rejected or rolled back.
pub async fn toggle(favorites: &CliBindings, member: Member) -> Result<(), CommandError> {
    let id = member.id;
    let outcome = favorites.toggle(member).await;
    report(favorites, id, outcome)
}

/// Add a member.
///
/// # Errors
///
/// Returns an error if the intent was rejected or rolled back.
pub async fn add(favorites: &CliBindings, member: Member) -> Result<(), CommandError> {
    let id = member.id;
    let outcome = favorites.collection().add(member).await;
    report(favorites, id, outcome)
}

/// Remove a member.
///
/// # Errors
///
/// Returns an error if the intent was rejected or rolled back.
pub async fn remove(favorites: &CliBindings, id: MemberId) -> Result<(), CommandError> {
    let outcome = favorites.collection().remove(id).await;
    report(favorites, id, outcome)
}

fn report(favorites: &CliBindings, id: MemberId, outcome: IntentOutcome) -> Result<(), CommandError> {
    match outcome {
        IntentOutcome::Confirmed => {
            tracing::info!(
                member_id = %id,
                present = favorites.is_member(id),
                count = favorites.count(),
                "Saved"
            );
            Ok(())
        }
        IntentOutcome::Unchanged => {
            tracing::info!(member_id = %id, "Already up to date");
            Ok(())
        }
        IntentOutcome::Rejected(e) | IntentOutcome::RolledBack(e) | IntentOutcome::Superseded(e) => {
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_defaults_name_from_id() {
        let member = member(MemberId::new(12), None, None);
        assert_eq!(member.name, "Product 12");
        assert!(member.handle.is_none());
    }

    #[test]
    fn test_member_keeps_given_fields() {
        let member = member(
            MemberId::new(3),
            Some("Pineapple Tee".to_string()),
            Some("pineapple-tee".to_string()),
        );
        assert_eq!(member.name, "Pineapple Tee");
        assert_eq!(member.handle.as_deref(), Some("pineapple-tee"));
    }
}
