//! Sync configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SYNC_API_BASE_URL` - Base URL of the storefront REST API
//!
//! ## Optional
//! - `SYNC_COLLECTION` - Which collection to sync: `favorites` or `cart` (default: favorites)
//! - `SYNC_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: none, requests may hang)
//! - `SYNC_OWNER_ID` - Signed-in owner ID (used by the CLI; requires `SYNC_OWNER_TOKEN`)
//! - `SYNC_OWNER_TOKEN` - Bearer token for the owner (requires `SYNC_OWNER_ID`)

use std::time::Duration;

use thiserror::Error;
use url::Url;

use storefront_sync_core::{CollectionKind, OwnerId};

use crate::owner::Owner;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Sync configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the storefront REST API
    pub base_url: Url,
    /// Which collection to keep in sync
    pub collection: CollectionKind,
    /// Optional per-request timeout
    pub request_timeout: Option<Duration>,
    /// Owner to act as, when configured (token is redacted in `Debug`)
    pub owner: Option<Owner>,
}

impl SyncConfig {
    /// Create a configuration for `base_url` with every optional setting at
    /// its default.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            collection: CollectionKind::Favorites,
            request_timeout: None,
            owner: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = get_required_env(&lookup, "SYNC_API_BASE_URL")?;
        let base_url = Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("SYNC_API_BASE_URL".to_string(), e.to_string())
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "SYNC_API_BASE_URL".to_string(),
                format!("unsupported scheme '{}'", base_url.scheme()),
            ));
        }

        let collection = get_env_or_default(&lookup, "SYNC_COLLECTION", "favorites")
            .parse::<CollectionKind>()
            .map_err(|e| ConfigError::InvalidEnvVar("SYNC_COLLECTION".to_string(), e.to_string()))?;

        let request_timeout = get_optional_env(&lookup, "SYNC_REQUEST_TIMEOUT_SECS")
            .map(|secs| {
                secs.parse::<u64>().map(Duration::from_secs).map_err(|e| {
                    ConfigError::InvalidEnvVar(
                        "SYNC_REQUEST_TIMEOUT_SECS".to_string(),
                        e.to_string(),
                    )
                })
            })
            .transpose()?;

        let owner = owner_from_lookup(&lookup)?;

        Ok(Self {
            base_url,
            collection,
            request_timeout,
            owner,
        })
    }
}

/// The owner ID and token must be set together.
fn owner_from_lookup(
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<Option<Owner>, ConfigError> {
    match (
        get_optional_env(lookup, "SYNC_OWNER_ID"),
        get_optional_env(lookup, "SYNC_OWNER_TOKEN"),
    ) {
        (None, None) => Ok(None),
        (Some(id), Some(token)) => {
            let id = id.parse::<OwnerId>().map_err(|e| {
                ConfigError::InvalidEnvVar("SYNC_OWNER_ID".to_string(), e.to_string())
            })?;
            Ok(Some(Owner::new(id, token)))
        }
        (Some(_), None) => Err(ConfigError::MissingEnvVar("SYNC_OWNER_TOKEN".to_string())),
        (None, Some(_)) => Err(ConfigError::MissingEnvVar("SYNC_OWNER_ID".to_string())),
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<String, ConfigError> {
    get_optional_env(lookup, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get_optional_env(lookup, key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<SyncConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        SyncConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = load(&[("SYNC_API_BASE_URL", "https://api.example.test")]).unwrap();
        assert_eq!(config.base_url.as_str(), "https://api.example.test/");
        assert_eq!(config.collection, CollectionKind::Favorites);
        assert!(config.request_timeout.is_none());
        assert!(config.owner.is_none());
    }

    #[test]
    fn test_missing_base_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "SYNC_API_BASE_URL"));
    }

    #[test]
    fn test_blank_base_url_counts_as_missing() {
        let err = load(&[("SYNC_API_BASE_URL", "  ")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let err = load(&[("SYNC_API_BASE_URL", "ftp://files.example.test")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_full_config() {
        let config = load(&[
            ("SYNC_API_BASE_URL", "http://localhost:8080/api"),
            ("SYNC_COLLECTION", "cart"),
            ("SYNC_REQUEST_TIMEOUT_SECS", "15"),
            ("SYNC_OWNER_ID", "42"),
            ("SYNC_OWNER_TOKEN", "tok_9f8e7d"),
        ])
        .unwrap();

        assert_eq!(config.collection, CollectionKind::Cart);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(15)));
        let owner = config.owner.unwrap();
        assert_eq!(owner.id(), OwnerId::new(42));
        assert_eq!(owner.token().expose_secret(), "tok_9f8e7d");
    }

    #[test]
    fn test_unknown_collection() {
        let err = load(&[
            ("SYNC_API_BASE_URL", "http://localhost:8080"),
            ("SYNC_COLLECTION", "orders"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "SYNC_COLLECTION"));
    }

    #[test]
    fn test_invalid_timeout() {
        let err = load(&[
            ("SYNC_API_BASE_URL", "http://localhost:8080"),
            ("SYNC_REQUEST_TIMEOUT_SECS", "soon"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_owner_requires_both_id_and_token() {
        let err = load(&[
            ("SYNC_API_BASE_URL", "http://localhost:8080"),
            ("SYNC_OWNER_ID", "42"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "SYNC_OWNER_TOKEN"));

        let err = load(&[
            ("SYNC_API_BASE_URL", "http://localhost:8080"),
            ("SYNC_OWNER_TOKEN", "tok"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "SYNC_OWNER_ID"));
    }

    #[test]
    fn test_debug_redacts_owner_token() {
        let config = load(&[
            ("SYNC_API_BASE_URL", "http://localhost:8080"),
            ("SYNC_OWNER_ID", "1"),
            ("SYNC_OWNER_TOKEN", "tok_super_private"),
        ])
        .unwrap();
        assert!(!format!("{config:?}").contains("tok_super_private"));
    }
}
