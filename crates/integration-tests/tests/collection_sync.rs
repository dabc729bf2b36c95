//! End-to-end tests: a reconciled collection over the real HTTP store.

use storefront_sync::{
    ChannelSink, HttpStore, IntentOutcome, NotificationKind, Owner, ReconciledCollection,
    SyncError, SyncState,
};
use storefront_sync_core::{CollectionKind, Member, MemberId, OwnerId};
use storefront_sync_integration_tests::FakeStoreServer;
use tokio::sync::watch;

fn product(id: i64) -> Member {
    Member::new(MemberId::new(id), format!("p{id}"))
}

fn ids(members: &[Member]) -> Vec<i64> {
    members.iter().map(|m| m.id.as_i64()).collect()
}

#[tokio::test]
async fn test_confirmed_removal_and_rejected_addition() {
    let server = FakeStoreServer::start().await;
    server.seed(
        CollectionKind::Favorites,
        OwnerId::new(1),
        vec![product(1), product(2)],
    );
    let store = HttpStore::new(&server.config(CollectionKind::Favorites))
        .expect("Failed to build store");
    let (sink, mut notifications) = ChannelSink::new();
    let favorites = ReconciledCollection::new(
        store,
        Some(FakeStoreServer::owner(1)),
        sink,
        CollectionKind::Favorites,
    )
    .into_bindings();
    favorites.collection().sync_owner().await;
    assert_eq!(ids(&favorites.members()), vec![1, 2]);

    assert!(favorites.toggle(product(1)).await.is_confirmed());
    assert_eq!(ids(&favorites.members()), vec![2]);
    assert_eq!(
        server.member_ids(CollectionKind::Favorites, OwnerId::new(1)),
        vec![MemberId::new(2)]
    );

    server.fail_next_mutations(1);
    let outcome = favorites.toggle(product(3)).await;
    assert!(matches!(outcome, IntentOutcome::RolledBack(SyncError::Store(_))));
    assert_eq!(ids(&favorites.members()), vec![2]);

    let notification = notifications.try_recv().expect("Missing notification");
    assert_eq!(notification.kind, NotificationKind::Error);
    assert!(notifications.try_recv().is_err());
}

#[tokio::test]
async fn test_owner_switch_refetches_with_new_credentials() {
    let server = FakeStoreServer::start().await;
    server.seed(CollectionKind::Cart, OwnerId::new(1), vec![product(10)]);
    server.seed(CollectionKind::Cart, OwnerId::new(2), vec![product(20), product(21)]);
    let store =
        HttpStore::new(&server.config(CollectionKind::Cart)).expect("Failed to build store");
    let (auth, changes) = watch::channel(Some(FakeStoreServer::owner(1)));
    let cart = ReconciledCollection::new(store, changes, (), CollectionKind::Cart);

    cart.sync_owner().await;
    assert_eq!(ids(&cart.members()), vec![10]);

    auth.send(Some(FakeStoreServer::owner(2)))
        .expect("Auth channel closed");
    cart.sync_owner().await;

    assert_eq!(cart.owner_id(), Some(OwnerId::new(2)));
    assert_eq!(ids(&cart.members()), vec![20, 21]);
    assert!(!cart.is_member(MemberId::new(10)));

    let last = server.requests().pop().expect("No requests recorded");
    assert_eq!(last.path, "/api/cart/2");
    assert_eq!(
        last.authorization,
        Some(format!("Bearer {}", FakeStoreServer::token_for(2)))
    );
}

#[tokio::test]
async fn test_signed_out_toggle_sends_nothing() {
    let server = FakeStoreServer::start().await;
    let store = HttpStore::new(&server.config(CollectionKind::Favorites))
        .expect("Failed to build store");
    let (sink, mut notifications) = ChannelSink::new();
    let favorites =
        ReconciledCollection::new(store, None::<Owner>, sink, CollectionKind::Favorites);
    favorites.sync_owner().await;

    let outcome = favorites.toggle(product(1)).await;

    assert!(matches!(
        outcome,
        IntentOutcome::Rejected(SyncError::AuthenticationRequired)
    ));
    assert_eq!(favorites.state(), SyncState::Uninitialized);
    assert_eq!(favorites.count(), 0);
    assert!(server.requests().is_empty());
    assert_eq!(
        notifications.try_recv().expect("Missing notification").kind,
        NotificationKind::Error
    );
}

#[tokio::test]
async fn test_malformed_initial_fetch_degrades_to_empty() {
    let server = FakeStoreServer::start().await;
    server.seed(CollectionKind::Favorites, OwnerId::new(1), vec![product(1)]);
    server.serve_malformed_fetch(true);
    let store = HttpStore::new(&server.config(CollectionKind::Favorites))
        .expect("Failed to build store");
    let (sink, mut notifications) = ChannelSink::new();
    let favorites = ReconciledCollection::new(
        store,
        Some(FakeStoreServer::owner(1)),
        sink,
        CollectionKind::Favorites,
    );

    favorites.sync_owner().await;

    assert_eq!(favorites.state(), SyncState::Ready);
    assert_eq!(favorites.count(), 0);
    assert!(favorites.last_load_failed());
    assert!(notifications.try_recv().is_err());

    server.serve_malformed_fetch(false);
    favorites.refresh().await.expect("Refresh failed");
    assert_eq!(ids(&favorites.members()), vec![1]);
    assert!(!favorites.last_load_failed());
}

#[tokio::test]
async fn test_expired_token_rolls_back_with_sign_in_prompt() {
    let server = FakeStoreServer::start().await;
    let store = HttpStore::new(&server.config(CollectionKind::Favorites))
        .expect("Failed to build store");
    let (auth, changes) = watch::channel(Some(FakeStoreServer::owner(4)));
    let (sink, mut notifications) = ChannelSink::new();
    let favorites = ReconciledCollection::new(store, changes, sink, CollectionKind::Favorites);
    favorites.sync_owner().await;

    // Same owner, token no longer accepted by the server
    auth.send(Some(Owner::new(OwnerId::new(4), "tok_revoked")))
        .expect("Auth channel closed");
    let outcome = favorites.toggle(product(9)).await;

    assert!(matches!(outcome, IntentOutcome::RolledBack(_)));
    assert_eq!(favorites.count(), 0);
    let notification = notifications.try_recv().expect("Missing notification");
    assert!(notification.message.contains("session has expired"));
}
