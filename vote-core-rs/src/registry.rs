//! Registry of live votes, keyed by name.
//!
//! Membership is guarded by one `RwLock` separate from every vote's own lock.
//! The registry lock is only held to change or copy the member list; it is
//! never held while a vote is locked or a callback runs.
//!
//! Lookups are a linear scan. Vote counts here are in the tens, so a map
//! buys nothing over a `Vec`.

use crate::diag::{Diagnostics, VoteSnapshot};
use crate::error::{VoteError, VoteResult};
use crate::types::VoteValue;
use crate::vote::Vote;
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, trace};

/// Live votes plus names claimed by creations still in progress
pub(crate) struct Roster<V: VoteValue> {
    votes: Vec<Arc<Vote<V>>>,
    pending: Vec<String>,
}

impl<V: VoteValue> Roster<V> {
    fn taken(&self, name: &str) -> bool {
        self.votes.iter().any(|v| v.name() == name) || self.pending.iter().any(|n| n == name)
    }
}

pub(crate) type Members<V> = RwLock<Roster<V>>;

/// Shared handle to a set of votes. Clones refer to the same set.
pub struct Registry<V: VoteValue> {
    members: Arc<Members<V>>,
}

impl<V: VoteValue> Registry<V> {
    pub fn new() -> Self {
        Self {
            members: Arc::new(RwLock::new(Roster {
                votes: Vec::new(),
                pending: Vec::new(),
            })),
        }
    }

    pub(crate) fn from_members(members: Arc<Members<V>>) -> Self {
        Self { members }
    }

    pub(crate) fn downgrade(&self) -> Weak<Members<V>> {
        Arc::downgrade(&self.members)
    }

    /// Look up a live vote by name
    pub fn find(&self, name: &str) -> Option<Arc<Vote<V>>> {
        self.members
            .read()
            .votes
            .iter()
            .find(|v| v.name() == name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.read().votes.iter().any(|v| v.name() == name)
    }

    pub fn len(&self) -> usize {
        self.members.read().votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().votes.is_empty()
    }

    /// Names of all live votes, in creation order
    pub fn names(&self) -> Vec<String> {
        self.members
            .read()
            .votes
            .iter()
            .map(|v| v.name().to_string())
            .collect()
    }

    /// Handles to all live votes, in creation order
    pub fn votes(&self) -> Vec<Arc<Vote<V>>> {
        self.members.read().votes.clone()
    }

    /// Diagnostic dump of every live vote
    pub fn snapshots(&self) -> Vec<VoteSnapshot<V>> {
        // Copy the list first so no vote is locked under the registry lock
        self.votes().iter().map(|v| v.dump()).collect()
    }

    /// Claim `name` for a vote about to be created.
    ///
    /// Fails if a live vote or another pending creation holds the name. The
    /// claim is dropped with the returned guard unless it is committed.
    pub(crate) fn reserve(&self, name: &str) -> VoteResult<Reservation<'_, V>> {
        let mut members = self.members.write();
        if members.taken(name) {
            return Err(VoteError::DuplicateName(name.to_string()));
        }
        members.pending.push(name.to_string());
        trace!("Registry: reserved {}", name);
        Ok(Reservation {
            registry: self,
            name: name.to_string(),
            committed: false,
        })
    }

    fn release(&self, name: &str) {
        let mut members = self.members.write();
        members.pending.retain(|n| n != name);
        trace!("Registry: released {}", name);
    }

    pub(crate) fn unregister(&self, vote: &Vote<V>) -> bool {
        let mut members = self.members.write();
        let before = members.votes.len();
        members
            .votes
            .retain(|v| !std::ptr::eq(Arc::as_ptr(v), vote));
        let removed = members.votes.len() != before;
        if removed {
            debug!("Registry: - {} ({} votes)", vote.name(), members.votes.len());
        }
        removed
    }
}

/// A name held by an in-progress creation
pub(crate) struct Reservation<'a, V: VoteValue> {
    registry: &'a Registry<V>,
    name: String,
    committed: bool,
}

impl<V: VoteValue> Reservation<'_, V> {
    /// Turn the reservation into a live registry entry
    pub(crate) fn commit(mut self, vote: Arc<Vote<V>>) {
        let mut members = self.registry.members.write();
        members.pending.retain(|n| *n != self.name);
        members.votes.push(vote);
        debug!("Registry: + {} ({} votes)", self.name, members.votes.len());
        self.committed = true;
    }
}

impl<V: VoteValue> Drop for Reservation<'_, V> {
    fn drop(&mut self) {
        if !self.committed {
            self.registry.release(&self.name);
        }
    }
}

impl<V: VoteValue> Clone for Registry<V> {
    fn clone(&self) -> Self {
        Self {
            members: self.members.clone(),
        }
    }
}

impl<V: VoteValue> Default for Registry<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide registry for machine-word votes
pub fn global() -> &'static Registry<i64> {
    static GLOBAL: OnceLock<Registry<i64>> = OnceLock::new();
    GLOBAL.get_or_init(Registry::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CallbackResult, Policy};
    use crate::vote::VoteBuilder;

    fn create(registry: &Registry<i64>, name: &str) -> Arc<Vote<i64>> {
        VoteBuilder::ordered(name, Policy::Min)
            .voter("a")
            .create(registry, 0, |_: &i64| -> CallbackResult { Ok(()) })
            .unwrap()
    }

    #[test]
    fn test_find_and_names() {
        let registry = Registry::new();
        create(&registry, "fcc");
        create(&registry, "usb_icl");

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["fcc", "usb_icl"]);
        assert!(registry.contains("fcc"));
        assert_eq!(registry.find("usb_icl").unwrap().name(), "usb_icl");
        assert!(registry.find("fv").is_none());
    }

    #[test]
    fn test_clones_share_members() {
        let registry = Registry::new();
        let other = registry.clone();
        create(&registry, "fcc");
        assert!(other.contains("fcc"));
    }

    #[test]
    fn test_registries_are_independent() {
        let a = Registry::new();
        let b = Registry::new();
        create(&a, "fcc");
        create(&b, "fcc");
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_destroy_removes_only_that_vote() {
        let registry = Registry::new();
        let fcc = create(&registry, "fcc");
        create(&registry, "usb_icl");

        fcc.destroy();
        assert_eq!(registry.names(), vec!["usb_icl"]);
    }

    #[test]
    fn test_destroy_outliving_registry() {
        let registry = Registry::new();
        let vote = create(&registry, "fcc");
        drop(registry);
        vote.destroy();
        assert!(vote.is_destroyed());
    }

    #[test]
    fn test_snapshots_cover_all_votes() {
        let registry = Registry::new();
        create(&registry, "fcc");
        create(&registry, "usb_icl");

        let names: Vec<_> = registry.snapshots().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["fcc", "usb_icl"]);
    }

    #[test]
    fn test_reservation_blocks_name_until_dropped() {
        let registry = Registry::<i64>::new();
        let held = registry.reserve("fcc").unwrap();
        assert!(matches!(
            registry.reserve("fcc"),
            Err(VoteError::DuplicateName(_))
        ));
        // Pending names are not live votes
        assert!(!registry.contains("fcc"));
        assert!(registry.is_empty());

        drop(held);
        create(&registry, "fcc");
        assert!(matches!(
            registry.reserve("fcc"),
            Err(VoteError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_global_is_shared() {
        let vote = create(global(), "registry_test_global");
        assert!(global().contains("registry_test_global"));
        vote.destroy();
        assert!(!global().contains("registry_test_global"));
    }
}
