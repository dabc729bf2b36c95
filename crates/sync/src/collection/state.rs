//! Lock-protected state of a reconciled collection.
//!
//! Everything here is synchronous; the async orchestration in the parent
//! module takes the lock, calls one of these methods, and releases it before
//! awaiting the remote store.

use std::collections::HashMap;

use indexmap::IndexMap;

use storefront_sync_core::{Member, MemberId, OwnerId};

use crate::owner::Owner;

/// Macro-state of a collection for the current owner session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
    /// No owner, or the owner has not been loaded yet.
    Uninitialized,
    /// Initial fetch for the owner is in flight.
    Loading,
    /// Members are available and intents are accepted.
    Ready,
}

/// A requested change, before it is resolved against the current members.
#[derive(Debug, Clone)]
pub(super) enum Intent {
    Toggle(Member),
    Add(Member),
    Remove(MemberId),
}

/// The remote call an intent turned into.
#[derive(Debug, Clone)]
pub(super) enum Change {
    Add(Member),
    Remove(MemberId),
}

/// How to undo an optimistic change exactly.
#[derive(Debug, Clone)]
pub(super) enum Undo {
    /// The member was inserted; remove it again.
    Remove(MemberId),
    /// The member was removed from `index`; put it back there.
    Restore { index: usize, member: Member },
}

/// An intent that has been applied optimistically and awaits the store.
#[derive(Debug)]
pub(super) struct Pending {
    pub member_id: MemberId,
    pub name: String,
    pub change: Change,
    pub undo: Undo,
    session: u64,
    seq: u64,
}

impl Pending {
    pub const fn ticket(&self) -> Ticket {
        Ticket {
            member_id: self.member_id,
            session: self.session,
            seq: self.seq,
        }
    }
}

/// Identifies one in-flight intent without borrowing it.
#[derive(Debug, Clone, Copy)]
pub(super) struct Ticket {
    member_id: MemberId,
    session: u64,
    seq: u64,
}

/// The newest unresolved intent for a member and what it shows locally.
#[derive(Debug)]
struct Optimistic {
    seq: u64,
    /// `None` when the intent removed the member.
    member: Option<Member>,
}

/// Result of trying to start an intent.
#[derive(Debug)]
pub(super) enum Begin {
    /// No loaded session for this owner yet.
    NotReady,
    /// The collection already matches; nothing to send.
    Unchanged,
    Started(Pending),
}

#[derive(Debug)]
pub(super) struct Inner {
    pub state: SyncState,
    pub owner: Option<Owner>,
    /// Bumped on every owner change; resolutions from older sessions are dropped.
    pub session: u64,
    /// Bumped on every fetch; only the newest fetch may replace members.
    pub load_seq: u64,
    pub members: IndexMap<MemberId, Member>,
    pub last_load_failed: bool,
    next_seq: u64,
    /// Newest unresolved intent per member.
    latest_intent: HashMap<MemberId, Optimistic>,
}

impl Inner {
    pub fn new() -> Self {
        Self {
            state: SyncState::Uninitialized,
            owner: None,
            session: 0,
            load_seq: 0,
            members: IndexMap::new(),
            last_load_failed: false,
            next_seq: 0,
            latest_intent: HashMap::new(),
        }
    }

    /// Start a new owner session, dropping everything from the previous one.
    ///
    /// Returns the load sequence to fetch under when there is a new owner.
    pub fn reset(&mut self, owner: Option<Owner>) -> Option<u64> {
        self.session += 1;
        self.members.clear();
        self.latest_intent.clear();
        self.last_load_failed = false;

        if owner.is_some() {
            self.state = SyncState::Loading;
            self.owner = owner;
            self.load_seq += 1;
            Some(self.load_seq)
        } else {
            self.state = SyncState::Uninitialized;
            self.owner = None;
            None
        }
    }

    /// Whether a fetch started under `session`/`load_seq` is still wanted.
    pub const fn is_current_load(&self, session: u64, load_seq: u64) -> bool {
        self.session == session && self.load_seq == load_seq
    }

    /// Replace all members with a fetched list. Duplicate IDs keep the first position.
    ///
    /// Members with an unresolved intent keep their optimistic presence, since
    /// the fetch may have been answered before the store saw the intent.
    pub fn replace_members(&mut self, members: Vec<Member>) {
        let mut fetched: IndexMap<MemberId, Member> =
            members.into_iter().map(|m| (m.id, m)).collect();

        let mut unresolved: Vec<_> = self.latest_intent.iter().collect();
        unresolved.sort_by_key(|(_, optimistic)| optimistic.seq);
        for (member_id, optimistic) in unresolved {
            match &optimistic.member {
                Some(member) => {
                    fetched.entry(*member_id).or_insert_with(|| member.clone());
                }
                None => {
                    fetched.shift_remove(member_id);
                }
            }
        }

        self.members = fetched;
    }

    /// Apply an intent optimistically.
    pub fn begin(&mut self, owner_id: OwnerId, intent: Intent) -> Begin {
        let owner_matches = self.owner.as_ref().is_some_and(|o| o.id() == owner_id);
        if !owner_matches || self.state != SyncState::Ready {
            return Begin::NotReady;
        }

        let (member_id, insert) = match intent {
            Intent::Toggle(member) => {
                let was_present = self.members.contains_key(&member.id);
                (member.id, (!was_present).then_some(member))
            }
            Intent::Add(member) => {
                if self.members.contains_key(&member.id) {
                    return Begin::Unchanged;
                }
                (member.id, Some(member))
            }
            Intent::Remove(member_id) => {
                if !self.members.contains_key(&member_id) {
                    return Begin::Unchanged;
                }
                (member_id, None)
            }
        };

        let (name, change, undo) = if let Some(member) = insert {
            let name = member.name.clone();
            self.members.insert(member_id, member.clone());
            (name, Change::Add(member), Undo::Remove(member_id))
        } else {
            let Some((index, _, member)) = self.members.shift_remove_full(&member_id) else {
                return Begin::Unchanged;
            };
            (
                member.name.clone(),
                Change::Remove(member_id),
                Undo::Restore { index, member },
            )
        };

        self.next_seq += 1;
        let seq = self.next_seq;
        let shown = match &change {
            Change::Add(member) => Some(member.clone()),
            Change::Remove(_) => None,
        };
        self.latest_intent.insert(
            member_id,
            Optimistic {
                seq,
                member: shown,
            },
        );

        Begin::Started(Pending {
            member_id,
            name,
            change,
            undo,
            session: self.session,
            seq,
        })
    }

    /// Mark a pending intent resolved.
    ///
    /// Returns `true` when it is still the newest intent for its member in
    /// the current session, i.e. when its outcome may touch the members.
    pub fn finish(&mut self, pending: &Pending) -> bool {
        if pending.session != self.session {
            return false;
        }
        self.forget(pending.member_id, pending.seq)
    }

    /// Stop tracking an intent whose caller went away before it resolved.
    ///
    /// The optimistic change stays visible; the next fetch decides.
    pub fn abandon(&mut self, ticket: Ticket) {
        if ticket.session == self.session {
            self.forget(ticket.member_id, ticket.seq);
        }
    }

    fn forget(&mut self, member_id: MemberId, seq: u64) -> bool {
        let newest = self
            .latest_intent
            .get(&member_id)
            .is_some_and(|optimistic| optimistic.seq == seq);
        if newest {
            self.latest_intent.remove(&member_id);
        }
        newest
    }

    /// Undo an optimistic change.
    pub fn revert(&mut self, undo: Undo) {
        match undo {
            Undo::Remove(member_id) => {
                self.members.shift_remove(&member_id);
            }
            Undo::Restore { index, member } => {
                if self.members.contains_key(&member.id) {
                    // A refresh already brought it back; keep that position
                    self.members.insert(member.id, member);
                } else {
                    let index = index.min(self.members.len());
                    self.members.shift_insert(index, member.id, member);
                }
            }
        }
    }
}
