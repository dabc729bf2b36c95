//! Integration test support for storefront sync.
//!
//! Runs an in-process fake of the storefront collection API on an ephemeral
//! port, so the real [`HttpStore`](storefront_sync::HttpStore) can be driven
//! end to end without external services.
//!
//! # Example
//!
//! ```rust,ignore
//! let server = FakeStoreServer::start().await;
//! server.seed(CollectionKind::Favorites, OwnerId::new(1), vec![member]);
//!
//! let store = HttpStore::new(&server.config(CollectionKind::Favorites))?;
//! let members = store.fetch_all(&FakeStoreServer::owner(1)).await?;
//! ```
//!
//! The fake accepts exactly one bearer token per owner, see
//! [`FakeStoreServer::token_for`].

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{OriginalUri, Path, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use storefront_sync::store::REQUEST_ID_HEADER;
use storefront_sync::{Owner, SyncConfig};
use storefront_sync_core::{CollectionKind, Member, MemberId, OwnerId};

/// A request as the fake server saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Default)]
struct ServerState {
    collections: HashMap<(String, i64), Vec<Member>>,
    /// Number of upcoming add/remove calls to answer with 503.
    failing_mutations: usize,
    malformed_fetch: bool,
    requests: Vec<RecordedRequest>,
}

type Shared = Arc<Mutex<ServerState>>;

fn lock(state: &Shared) -> MutexGuard<'_, ServerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process fake of the collection API.
pub struct FakeStoreServer {
    addr: SocketAddr,
    state: Shared,
    task: JoinHandle<()>,
}

impl FakeStoreServer {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    #[allow(clippy::expect_used)]
    pub async fn start() -> Self {
        let state = Shared::default();
        let app = Router::new().nest("/api", routes()).with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake store listener");
        let addr = listener
            .local_addr()
            .expect("Failed to read fake store address");

        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Fake store server stopped");
            }
        });

        Self { addr, state, task }
    }

    /// The bearer token the fake accepts for `owner_id`.
    #[must_use]
    pub fn token_for(owner_id: i64) -> String {
        format!("tok_{owner_id}_9qXv2Lm")
    }

    /// An owner carrying the token the fake accepts.
    #[must_use]
    pub fn owner(owner_id: i64) -> Owner {
        Owner::new(OwnerId::new(owner_id), Self::token_for(owner_id))
    }

    /// Base URL of the API, including the `/api` prefix.
    ///
    /// # Panics
    ///
    /// Panics if the bound address does not form a valid URL.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/api", self.addr)).expect("Invalid fake store URL")
    }

    /// Configuration pointing at this server.
    #[must_use]
    pub fn config(&self, collection: CollectionKind) -> SyncConfig {
        SyncConfig {
            collection,
            ..SyncConfig::new(self.base_url())
        }
    }

    /// Replace an owner's collection on the server.
    pub fn seed(&self, collection: CollectionKind, owner_id: OwnerId, members: Vec<Member>) {
        lock(&self.state).collections.insert(
            (collection.path_segment().to_string(), owner_id.as_i64()),
            members,
        );
    }

    /// Member IDs the server currently holds for an owner, in order.
    #[must_use]
    pub fn member_ids(&self, collection: CollectionKind, owner_id: OwnerId) -> Vec<MemberId> {
        lock(&self.state)
            .collections
            .get(&(collection.path_segment().to_string(), owner_id.as_i64()))
            .map(|members| members.iter().map(|m| m.id).collect())
            .unwrap_or_default()
    }

    /// Answer the next `count` add/remove calls with 503.
    pub fn fail_next_mutations(&self, count: usize) {
        lock(&self.state).failing_mutations = count;
    }

    /// Answer fetches with a body that lacks `items`.
    pub fn serve_malformed_fetch(&self, malformed: bool) {
        lock(&self.state).malformed_fetch = malformed;
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }
}

impl Drop for FakeStoreServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// =============================================================================
// Routes
// =============================================================================

fn routes() -> Router<Shared> {
    Router::new()
        .route("/{collection}/{owner}", get(fetch_collection))
        .route(
            "/{collection}/{owner}/items/{member}",
            axum::routing::post(add_item).delete(remove_item),
        )
}

/// Record the request and check its bearer token against the path owner.
fn authorize(
    state: &Shared,
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    owner: i64,
) -> Result<(), Response> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let expected = format!("Bearer {}", FakeStoreServer::token_for(owner));
    let allowed = authorization.as_deref() == Some(expected.as_str());

    lock(state).requests.push(RecordedRequest {
        method,
        path: uri.path().to_string(),
        authorization,
        request_id,
    });

    if allowed {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid token").into_response())
    }
}

/// Consume one scripted failure, if any remain.
fn take_failure(state: &Shared) -> bool {
    let mut state = lock(state);
    if state.failing_mutations > 0 {
        state.failing_mutations -= 1;
        true
    } else {
        false
    }
}

async fn fetch_collection(
    State(state): State<Shared>,
    Path((collection, owner)): Path<(String, i64)>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = authorize(&state, Method::GET, &uri, &headers, owner) {
        return response;
    }

    let state = lock(&state);
    if state.malformed_fetch {
        return Json(json!({ "data": [] })).into_response();
    }

    let items = state
        .collections
        .get(&(collection, owner))
        .cloned()
        .unwrap_or_default();
    Json(json!({ "items": items })).into_response()
}

async fn add_item(
    State(state): State<Shared>,
    Path((collection, owner, member)): Path<(String, i64, i64)>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(body): Json<Member>,
) -> Response {
    if let Err(response) = authorize(&state, Method::POST, &uri, &headers, owner) {
        return response;
    }
    if take_failure(&state) {
        return (StatusCode::SERVICE_UNAVAILABLE, "store unavailable").into_response();
    }
    if body.id.as_i64() != member {
        return (StatusCode::BAD_REQUEST, "member id mismatch").into_response();
    }

    let mut state = lock(&state);
    let members = state.collections.entry((collection, owner)).or_default();
    // Adding an existing member is idempotent
    if !members.iter().any(|m| m.id == body.id) {
        members.push(body);
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn remove_item(
    State(state): State<Shared>,
    Path((collection, owner, member)): Path<(String, i64, i64)>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = authorize(&state, Method::DELETE, &uri, &headers, owner) {
        return response;
    }
    if take_failure(&state) {
        return (StatusCode::SERVICE_UNAVAILABLE, "store unavailable").into_response();
    }

    let mut state = lock(&state);
    if let Some(members) = state.collections.get_mut(&(collection, owner)) {
        members.retain(|m| m.id.as_i64() != member);
    }
    StatusCode::NO_CONTENT.into_response()
}
