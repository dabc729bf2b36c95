//! Display-facing accessors over a reconciled collection.
//!
//! Product cards and header badges only need to ask "is this a favorite?",
//! "how many items?" and to fire a toggle. [`Bindings`] exposes exactly that,
//! is cheap to clone into every component, and never performs I/O itself
//! except through `toggle`.

use std::sync::Arc;

use tokio::task::JoinHandle;

use storefront_sync_core::{Member, MemberId};

use crate::collection::{IntentOutcome, ReconciledCollection, SyncState};
use crate::notify::NotificationSink;
use crate::owner::OwnerSource;
use crate::store::RemoteStore;

/// Shared handle to a [`ReconciledCollection`] for display code.
pub struct Bindings<S, O, N> {
    collection: Arc<ReconciledCollection<S, O, N>>,
}

impl<S, O, N> Clone for Bindings<S, O, N> {
    fn clone(&self) -> Self {
        Self {
            collection: Arc::clone(&self.collection),
        }
    }
}

impl<S, O, N> Bindings<S, O, N>
where
    S: RemoteStore,
    O: OwnerSource,
    N: NotificationSink,
{
    #[must_use]
    pub fn new(collection: ReconciledCollection<S, O, N>) -> Self {
        Self::from_shared(Arc::new(collection))
    }

    #[must_use]
    pub const fn from_shared(collection: Arc<ReconciledCollection<S, O, N>>) -> Self {
        Self { collection }
    }

    /// The underlying collection, for owner syncing and refreshes.
    #[must_use]
    pub const fn collection(&self) -> &Arc<ReconciledCollection<S, O, N>> {
        &self.collection
    }

    #[must_use]
    pub fn is_member(&self, member_id: MemberId) -> bool {
        self.collection.is_member(member_id)
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.collection.count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    #[must_use]
    pub fn members(&self) -> Vec<Member> {
        self.collection.members()
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        self.collection.state()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == SyncState::Ready
    }

    /// Toggle membership and wait for the store to answer.
    ///
    /// The local change is visible to every clone of these bindings before
    /// this future first yields. If the future is dropped before the store
    /// answers, the change stays applied without a rollback until the next
    /// fetch; prefer [`spawn_toggle`](Self::spawn_toggle) from handlers that
    /// may be cancelled.
    pub async fn toggle(&self, member: Member) -> IntentOutcome {
        self.collection.toggle(member).await
    }
}

impl<S, O, N> Bindings<S, O, N>
where
    S: RemoteStore + 'static,
    O: OwnerSource + 'static,
    N: NotificationSink + 'static,
{
    /// Fire a toggle from an event handler without waiting for it.
    pub fn spawn_toggle(&self, member: Member) -> JoinHandle<IntentOutcome> {
        let collection = Arc::clone(&self.collection);
        tokio::spawn(async move { collection.toggle(member).await })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use storefront_sync_core::{CollectionKind, OwnerId};

    use super::*;
    use crate::owner::Owner;
    use crate::store::StoreError;

    /// Accepts everything and counts mutations.
    #[derive(Default)]
    struct AcceptAll {
        mutations: Mutex<usize>,
    }

    impl RemoteStore for AcceptAll {
        async fn fetch_all(&self, _owner: &Owner) -> Result<Vec<Member>, StoreError> {
            Ok(vec![Member::new(MemberId::new(1), "Tee")])
        }

        async fn add(&self, _owner: &Owner, _member: &Member) -> Result<(), StoreError> {
            *self.mutations.lock().unwrap() += 1;
            Ok(())
        }

        async fn remove(&self, _owner: &Owner, _member_id: MemberId) -> Result<(), StoreError> {
            *self.mutations.lock().unwrap() += 1;
            Ok(())
        }
    }

    async fn bindings_with_store() -> (Bindings<Arc<AcceptAll>, Option<Owner>, ()>, Arc<AcceptAll>) {
        let store = Arc::new(AcceptAll::default());
        let collection = ReconciledCollection::new(
            Arc::clone(&store),
            Some(Owner::new(OwnerId::new(1), "t")),
            (),
            CollectionKind::Favorites,
        );
        collection.sync_owner().await;
        (collection.into_bindings(), store)
    }

    async fn bindings() -> Bindings<Arc<AcceptAll>, Option<Owner>, ()> {
        bindings_with_store().await.0
    }

    #[tokio::test]
    async fn test_accessors_reflect_collection() {
        let favorites = bindings().await;
        assert!(favorites.is_ready());
        assert_eq!(favorites.count(), 1);
        assert!(!favorites.is_empty());
        assert!(favorites.is_member(MemberId::new(1)));
        assert!(!favorites.is_member(MemberId::new(2)));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let favorites = bindings().await;
        let badge = favorites.clone();

        assert!(favorites.toggle(Member::new(MemberId::new(1), "Tee")).await.is_confirmed());
        assert!(badge.is_empty());
    }

    #[tokio::test]
    async fn test_reads_do_not_touch_the_store() {
        let (favorites, store) = bindings_with_store().await;
        let _ = (favorites.count(), favorites.members(), favorites.state());
        assert_eq!(*store.mutations.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_spawn_toggle() {
        let favorites = bindings().await;
        let handle = favorites.spawn_toggle(Member::new(MemberId::new(2), "Mug"));
        assert!(handle.await.unwrap().is_confirmed());
        assert!(favorites.is_member(MemberId::new(2)));
    }
}
