//! Locally reconciled, optimistically updated collections.
//!
//! A [`ReconciledCollection`] holds the last-known-good members of one
//! owner's favorites or cart. Mutation intents are applied to the local copy
//! immediately, then sent to the [`RemoteStore`]. A failed call restores the
//! exact previous state (including position) and emits one error
//! notification; a successful call needs no further work.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --owner signs in--> Loading --fetch ok--> Ready(members)
//!                                           --fetch err-> Ready(empty)
//! any state --owner signs out--> Uninitialized (cleared)
//! any state --owner switches--> Loading (cleared, refetched for new owner)
//! ```
//!
//! # Races
//!
//! Two intents for the same member may be in flight together. Only the
//! newest one may roll back on failure; an older failure is reported as
//! [`IntentOutcome::Superseded`] and leaves the members alone. Resolutions
//! from a previous owner session never touch the current one. A fetch that
//! lands while an intent is unresolved keeps that intent's optimistic state.

mod state;

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use storefront_sync_core::{CollectionKind, Member, MemberId, OwnerId};

use crate::bindings::Bindings;
use crate::error::{Result, SyncError};
use crate::notify::{NotificationKind, NotificationSink};
use crate::owner::{Owner, OwnerSource};
use crate::store::RemoteStore;

use state::{Begin, Change, Inner, Intent, Ticket};

pub use state::SyncState;

/// How a mutation intent ended.
#[derive(Debug)]
pub enum IntentOutcome {
    /// The remote store accepted the change.
    Confirmed,
    /// The collection already matched the request; nothing was sent.
    Unchanged,
    /// Refused before any state change (not signed in, still loading).
    Rejected(SyncError),
    /// The remote call failed and the optimistic change was undone.
    RolledBack(SyncError),
    /// The remote call failed, but a newer intent for the same member or an
    /// owner change already replaced its optimistic state.
    Superseded(SyncError),
}

impl IntentOutcome {
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }

    /// The error behind a rejected, rolled back or superseded intent.
    #[must_use]
    pub const fn error(&self) -> Option<&SyncError> {
        match self {
            Self::Rejected(e) | Self::RolledBack(e) | Self::Superseded(e) => Some(e),
            Self::Confirmed | Self::Unchanged => None,
        }
    }
}

/// Whether a failed fetch wipes the members or keeps them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadMode {
    /// First fetch for an owner; failure degrades to an empty collection.
    Initial,
    /// Explicit refetch; failure keeps what is already shown.
    Refresh,
}

/// Forgets an in-flight intent if its future is dropped before the store
/// answers, so later fetches are no longer overridden by it.
struct InFlight<'a> {
    inner: &'a RwLock<Inner>,
    ticket: Option<Ticket>,
}

impl InFlight<'_> {
    fn resolved(&mut self) {
        self.ticket = None;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.inner
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .abandon(ticket);
            debug!("Intent dropped before the store answered");
        }
    }
}

/// A user-scoped collection kept in sync with a remote store.
pub struct ReconciledCollection<S, O, N> {
    store: S,
    owner_source: O,
    sink: N,
    kind: CollectionKind,
    inner: RwLock<Inner>,
}

impl<S, O, N> ReconciledCollection<S, O, N>
where
    S: RemoteStore,
    O: OwnerSource,
    N: NotificationSink,
{
    /// Create an empty, uninitialized collection.
    ///
    /// Nothing is fetched until [`sync_owner`](Self::sync_owner) or
    /// [`follow_owner`](Self::follow_owner) sees a signed-in owner.
    #[must_use]
    pub fn new(store: S, owner_source: O, sink: N, kind: CollectionKind) -> Self {
        Self {
            store,
            owner_source,
            sink,
            kind,
            inner: RwLock::new(Inner::new()),
        }
    }

    /// Wrap the collection in display-facing [`Bindings`].
    #[must_use]
    pub fn into_bindings(self) -> Bindings<S, O, N> {
        Bindings::new(self)
    }

    // A panic while holding the lock cannot leave `Inner` half-updated in a
    // way later readers care about, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub const fn kind(&self) -> CollectionKind {
        self.kind
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        self.read().state
    }

    /// Owner of the current session, if any.
    #[must_use]
    pub fn owner_id(&self) -> Option<OwnerId> {
        self.read().owner.as_ref().map(Owner::id)
    }

    #[must_use]
    pub fn is_member(&self, member_id: MemberId) -> bool {
        self.read().members.contains_key(&member_id)
    }

    #[must_use]
    pub fn get(&self, member_id: MemberId) -> Option<Member> {
        self.read().members.get(&member_id).cloned()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.read().members.len()
    }

    /// Snapshot of the members in display order.
    #[must_use]
    pub fn members(&self) -> Vec<Member> {
        self.read().members.values().cloned().collect()
    }

    /// Whether the most recent fetch failed.
    ///
    /// The initial load degrades silently to an empty collection; this lets
    /// a display show that the emptiness may not be real.
    #[must_use]
    pub fn last_load_failed(&self) -> bool {
        self.read().last_load_failed
    }

    // =========================================================================
    // Owner Sessions
    // =========================================================================

    /// Re-read the owner source and react to any sign-in, sign-out or switch.
    pub async fn sync_owner(&self) {
        let owner = self.owner_source.current_owner();
        self.switch_owner(owner).await;
    }

    /// Track an auth state channel until its sender is dropped.
    ///
    /// The current value is applied immediately, then every change.
    pub async fn follow_owner(&self, mut changes: watch::Receiver<Option<Owner>>) {
        loop {
            let owner = changes.borrow_and_update().clone();
            self.switch_owner(owner).await;
            if changes.changed().await.is_err() {
                debug!(collection = %self.kind, "Auth state channel closed");
                break;
            }
        }
    }

    #[instrument(skip_all, fields(collection = %self.kind, owner_id = ?owner.as_ref().map(Owner::id)))]
    async fn switch_owner(&self, owner: Option<Owner>) {
        let load = {
            let mut inner = self.write();
            let current_id = inner.owner.as_ref().map(Owner::id);
            let next_id = owner.as_ref().map(Owner::id);

            if current_id == next_id {
                // Same person, possibly with a refreshed token
                inner.owner = owner;
                return;
            }

            let session = inner.session + 1;
            inner
                .reset(owner.clone())
                .zip(owner)
                .map(|(load_seq, owner)| (owner, session, load_seq))
        };

        let Some((owner, session, load_seq)) = load else {
            info!("Owner signed out, collection cleared");
            return;
        };

        info!("Loading collection for owner");
        if let Err(error) = self.load(owner, session, load_seq, LoadMode::Initial).await {
            debug!(%error, "Initial load degraded to an empty collection");
        }
    }

    /// Refetch the whole collection for the current owner.
    ///
    /// On failure the members already shown are kept.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationRequired` when nobody is signed in, or the
    /// store error when the fetch fails.
    #[instrument(skip(self), fields(collection = %self.kind))]
    pub async fn refresh(&self) -> Result<()> {
        let (owner, session, load_seq) = {
            let mut inner = self.write();
            let Some(owner) = inner.owner.clone() else {
                return Err(SyncError::AuthenticationRequired);
            };
            inner.load_seq += 1;
            (owner, inner.session, inner.load_seq)
        };

        self.load(owner, session, load_seq, LoadMode::Refresh).await
    }

    async fn load(&self, owner: Owner, session: u64, load_seq: u64, mode: LoadMode) -> Result<()> {
        let result = self.store.fetch_all(&owner).await;

        let mut inner = self.write();
        if !inner.is_current_load(session, load_seq) {
            debug!("Discarding stale collection load");
            return Ok(());
        }

        inner.state = SyncState::Ready;
        match result {
            Ok(members) => {
                inner.replace_members(members);
                inner.last_load_failed = false;
                let count = inner.members.len();
                drop(inner);
                info!(count, "Collection loaded");
                Ok(())
            }
            Err(error) => {
                inner.last_load_failed = true;
                if mode == LoadMode::Initial {
                    inner.members.clear();
                }
                drop(inner);
                warn!(%error, ?mode, "Failed to load collection");
                Err(error.into())
            }
        }
    }

    // =========================================================================
    // Mutation Intents
    // =========================================================================

    /// Add the member if absent, remove it if present.
    ///
    /// Dropping the returned future after the optimistic apply leaves the
    /// change visible without a rollback; the next fetch shows the store's
    /// answer. Use [`Bindings::spawn_toggle`] from handlers that may be
    /// cancelled.
    pub async fn toggle(&self, member: Member) -> IntentOutcome {
        self.run_intent(Intent::Toggle(member)).await
    }

    /// Add the member; `Unchanged` if it is already present.
    pub async fn add(&self, member: Member) -> IntentOutcome {
        self.run_intent(Intent::Add(member)).await
    }

    /// Remove the member; `Unchanged` if it is absent.
    pub async fn remove(&self, member_id: MemberId) -> IntentOutcome {
        self.run_intent(Intent::Remove(member_id)).await
    }

    #[instrument(skip_all, fields(collection = %self.kind))]
    async fn run_intent(&self, intent: Intent) -> IntentOutcome {
        let Some(owner) = self.owner_source.current_owner() else {
            self.sink.notify(
                NotificationKind::Error,
                format!("Sign in to save items to your {}", self.kind),
            );
            return IntentOutcome::Rejected(SyncError::AuthenticationRequired);
        };

        // Optimistic apply; the lock is released before the store is awaited
        let begin = self.write().begin(owner.id(), intent);
        let pending = match begin {
            Begin::Started(pending) => pending,
            Begin::Unchanged => return IntentOutcome::Unchanged,
            Begin::NotReady => {
                self.sink.notify(
                    NotificationKind::Info,
                    format!("Your {} is still loading, try again in a moment", self.kind),
                );
                return IntentOutcome::Rejected(SyncError::NotReady);
            }
        };

        let mut in_flight = InFlight {
            inner: &self.inner,
            ticket: Some(pending.ticket()),
        };
        let result = match &pending.change {
            Change::Add(member) => self.store.add(&owner, member).await,
            Change::Remove(member_id) => self.store.remove(&owner, *member_id).await,
        };
        in_flight.resolved();

        let mut inner = self.write();
        let current = inner.finish(&pending);

        let error = match result {
            Ok(()) => {
                drop(inner);
                debug!(member_id = %pending.member_id, "Intent confirmed");
                return IntentOutcome::Confirmed;
            }
            Err(error) => error,
        };

        if !current {
            drop(inner);
            warn!(
                member_id = %pending.member_id,
                %error,
                "Stale intent failed; newer state kept"
            );
            return IntentOutcome::Superseded(error.into());
        }

        let adding = matches!(pending.change, Change::Add(_));
        inner.revert(pending.undo);
        drop(inner);

        warn!(member_id = %pending.member_id, %error, adding, "Intent failed, rolled back");
        let message = if error.is_unauthorized() {
            format!("Your session has expired. Sign in again to update your {}", self.kind)
        } else if adding {
            format!("Could not add {} to your {}", pending.name, self.kind)
        } else {
            format!("Could not remove {} from your {}", pending.name, self.kind)
        };
        self.sink.notify(NotificationKind::Error, message);

        IntentOutcome::RolledBack(error.into())
    }
}
