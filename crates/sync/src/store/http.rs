//! `reqwest`-backed remote store.
//!
//! Endpoints, relative to the configured base URL:
//!
//! - `GET    /{collection}/{owner_id}` returns `{ "items": [Member, ...] }`
//! - `POST   /{collection}/{owner_id}/items/{member_id}` with the member as JSON
//! - `DELETE /{collection}/{owner_id}/items/{member_id}`
//!
//! Every request carries `Authorization: Bearer <token>` and a fresh
//! `x-request-id` so server logs can be correlated with ours.

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use storefront_sync_core::{CollectionKind, Member, MemberId, OwnerId};

use super::{RemoteStore, StoreError};
use crate::config::SyncConfig;
use crate::owner::Owner;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest slice of an error body kept in `StoreError::Status`.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Body of the fetch endpoint.
#[derive(Debug, Deserialize)]
struct ItemsResponse {
    items: Vec<Member>,
}

/// Remote store client for one collection over HTTP.
#[derive(Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: Url,
    collection: CollectionKind,
}

impl HttpStore {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL cannot carry a path or the HTTP client
    /// fails to build.
    pub fn new(config: &SyncConfig) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Self::with_client(builder.build()?, config.base_url.clone(), config.collection)
    }

    /// Create a client around an existing `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL cannot carry a path.
    pub fn with_client(
        client: reqwest::Client,
        base_url: Url,
        collection: CollectionKind,
    ) -> Result<Self, StoreError> {
        if base_url.cannot_be_a_base() {
            return Err(StoreError::InvalidBaseUrl(base_url.to_string()));
        }

        Ok(Self {
            client,
            base_url,
            collection,
        })
    }

    #[must_use]
    pub const fn collection(&self) -> CollectionKind {
        self.collection
    }

    /// `{base}/{collection}/{owner_id}`
    fn collection_url(&self, owner_id: OwnerId) -> Url {
        self.endpoint(&[self.collection.path_segment(), &owner_id.to_string()])
    }

    /// `{base}/{collection}/{owner_id}/items/{member_id}`
    fn item_url(&self, owner_id: OwnerId, member_id: MemberId) -> Url {
        self.endpoint(&[
            self.collection.path_segment(),
            &owner_id.to_string(),
            "items",
            &member_id.to_string(),
        ])
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `with_client`, so the path is always mutable here.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Start a request with the owner's credential and a fresh request ID.
    fn request(&self, method: reqwest::Method, url: Url, owner: &Owner) -> reqwest::RequestBuilder {
        let request_id = Uuid::new_v4().to_string();
        debug!(%method, %url, %request_id, "Sending store request");

        self.client
            .request(method, url)
            .bearer_auth(owner.token().expose_secret())
            .header(REQUEST_ID_HEADER, request_id)
    }
}

/// Map a non-success response to `StoreError::Status`.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(
        status = %status,
        body = %body.chars().take(500).collect::<String>(),
        "Store returned non-success status"
    );

    Err(StoreError::Status {
        status: status.as_u16(),
        message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    })
}

impl RemoteStore for HttpStore {
    #[instrument(skip(self, owner), fields(collection = %self.collection, owner_id = %owner.id()))]
    async fn fetch_all(&self, owner: &Owner) -> Result<Vec<Member>, StoreError> {
        let url = self.collection_url(owner.id());
        let response = self.request(reqwest::Method::GET, url, owner).send().await?;
        let response = ensure_success(response).await?;

        // Read as text first so a bad body is reported as malformed, not as HTTP
        let text = response.text().await?;
        let parsed: ItemsResponse = serde_json::from_str(&text).map_err(|e| {
            warn!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse collection response"
            );
            StoreError::Malformed(e.to_string())
        })?;

        debug!(count = parsed.items.len(), "Fetched collection");
        Ok(parsed.items)
    }

    #[instrument(skip(self, owner, member), fields(collection = %self.collection, owner_id = %owner.id(), member_id = %member.id))]
    async fn add(&self, owner: &Owner, member: &Member) -> Result<(), StoreError> {
        let url = self.item_url(owner.id(), member.id);
        let response = self
            .request(reqwest::Method::POST, url, owner)
            .json(member)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    #[instrument(skip(self, owner), fields(collection = %self.collection, owner_id = %owner.id()))]
    async fn remove(&self, owner: &Owner, member_id: MemberId) -> Result<(), StoreError> {
        let url = self.item_url(owner.id(), member_id);
        let response = self
            .request(reqwest::Method::DELETE, url, owner)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store(base: &str, collection: CollectionKind) -> HttpStore {
        HttpStore::with_client(reqwest::Client::new(), Url::parse(base).unwrap(), collection)
            .unwrap()
    }

    #[test]
    fn test_collection_url() {
        let store = store("https://api.example.test/v1", CollectionKind::Favorites);
        assert_eq!(
            store.collection_url(OwnerId::new(12)).as_str(),
            "https://api.example.test/v1/favorites/12"
        );
    }

    #[test]
    fn test_item_url_with_trailing_slash_base() {
        let store = store("https://api.example.test/v1/", CollectionKind::Cart);
        assert_eq!(
            store.item_url(OwnerId::new(12), MemberId::new(7)).as_str(),
            "https://api.example.test/v1/cart/12/items/7"
        );
    }

    #[test]
    fn test_rejects_cannot_be_a_base_url() {
        let result = HttpStore::with_client(
            reqwest::Client::new(),
            Url::parse("mailto:shop@example.test").unwrap(),
            CollectionKind::Favorites,
        );
        assert!(matches!(result, Err(StoreError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_items_response_requires_items_field() {
        assert!(serde_json::from_str::<ItemsResponse>(r#"{"data": []}"#).is_err());

        let parsed: ItemsResponse =
            serde_json::from_str(r#"{"items": [{"id": 1, "name": "Tee"}]}"#).unwrap();
        assert_eq!(parsed.items.len(), 1);
    }
}
