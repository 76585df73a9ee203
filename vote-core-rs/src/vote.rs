//! Vote: one arbitrated parameter and its resolution engine.
//!
//! Each vote owns a voter table (the declared voters plus the reserved `Init`
//! and `Force` slots) and a [`PriorityQueue`] over the same indices. Every
//! mutation runs under the vote's lock, which is also held while the consumer
//! callback runs, so the "did the winner change" decision and the
//! notification are atomic with respect to other producers.
//!
//! The callback must not call back into the same vote; the lock is not
//! reentrant and doing so deadlocks the calling thread.

use crate::error::{VoteError, VoteResult};
use crate::pqueue::PriorityQueue;
use crate::registry::{Members, Registry};
use crate::types::*;
use chrono::{DateTime, Utc};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace, warn};

/// Arbitration state, owned by the vote and only touched under its lock
pub(crate) struct VoteState<V> {
    pub(crate) voters: Vec<Voter<V>>,
    pub(crate) queue: PriorityQueue<V>,
    pub(crate) callback: Box<dyn VoteCallback<V>>,
    pub(crate) last_change: DateTime<Utc>,
}

/// One arbitrated parameter.
///
/// Handles are shared as `Arc<Vote<V>>`; [`Vote::destroy`] removes the vote
/// from its registry and releases its state. Using a handle after that is a
/// programming error and panics.
pub struct Vote<V: VoteValue> {
    name: String,
    policy: Policy,
    /// Number of caller-declared voters (reserved slots excluded)
    ordinary: usize,
    state: Mutex<Option<VoteState<V>>>,
    registry: Weak<Members<V>>,
}

impl<V: VoteValue> Vote<V> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Number of caller-declared voters
    pub fn voter_count(&self) -> usize {
        self.ordinary
    }

    /// Index of the ordinary voter called `name`
    pub fn voter_index(&self, name: &str) -> Option<usize> {
        self.lock().voters[..self.ordinary]
            .iter()
            .position(|v| v.name == name)
    }

    /// Like [`Vote::voter_index`], reporting a missing voter as an error
    pub fn require_voter(&self, name: &str) -> VoteResult<usize> {
        self.voter_index(name).ok_or_else(|| VoteError::UnknownVoter {
            vote: self.name.clone(),
            voter: name.to_string(),
        })
    }

    /// Names of the ordinary voters, in declaration order
    pub fn voter_names(&self) -> Vec<String> {
        self.lock().voters[..self.ordinary]
            .iter()
            .map(|v| v.name.clone())
            .collect()
    }

    /// Cast or withdraw the vote of an ordinary voter.
    ///
    /// Repeating the voter's current `(enabled, value)` is a no-op. The
    /// callback runs only when the effective value changes, and its result is
    /// returned.
    pub fn set(&self, index: usize, enabled: bool, value: V) -> VoteResult<()> {
        self.check_ordinary(index);
        let mut state = self.lock();

        let voter = &state.voters[index];
        if voter.enabled == enabled && voter.value == value {
            trace!("Vote {}: {} unchanged", self.name, voter.name);
            return Ok(());
        }

        let old = state.queue.top().cloned();

        if state.voters[index].enabled {
            state.queue.remove(index);
        }
        let voter = &mut state.voters[index];
        voter.enabled = enabled;
        voter.value = value.clone();
        if enabled {
            state.queue.push(index, value);
        }

        debug!(
            "Vote {}: {} -> {} {:?}",
            self.name,
            state.voters[index].name,
            if enabled { "enabled" } else { "disabled" },
            state.voters[index].value
        );

        self.notify_if_changed(&mut state, old)
    }

    /// Reassign an ordinary voter's priority.
    ///
    /// Not permitted under `CustomData`, where the comparator carries all
    /// ordering.
    pub fn set_priority(&self, index: usize, priority: Priority) -> VoteResult<()> {
        if self.policy == Policy::CustomData {
            return Err(VoteError::NotPermitted(self.name.clone()));
        }
        self.check_ordinary(index);
        if !priority_in_range(priority) {
            return Err(VoteError::PriorityOutOfRange {
                priority,
                min: MIN_PRIORITY,
                max: MAX_PRIORITY,
            });
        }

        let mut state = self.lock();
        let old = state.queue.top().cloned();
        state.queue.set_priority(index, priority);

        debug!(
            "Vote {}: {} priority {}",
            self.name, state.voters[index].name, priority
        );

        self.notify_if_changed(&mut state, old)
    }

    pub fn get_priority(&self, slot: impl Into<Slot>) -> Priority {
        let index = self.slot_index(slot.into());
        self.lock().queue.get_priority(index)
    }

    /// Snapshot of a voter's `(enabled, value)`
    pub fn get_voter(&self, slot: impl Into<Slot>) -> (bool, V) {
        let index = self.slot_index(slot.into());
        let state = self.lock();
        let voter = &state.voters[index];
        (voter.enabled, voter.value.clone())
    }

    /// Current effective value
    pub fn get_result(&self) -> VoteResult<V> {
        self.lock()
            .queue
            .top()
            .cloned()
            .ok_or_else(|| VoteError::Empty(self.name.clone()))
    }

    /// Voter currently owning the top position
    pub fn winner(&self) -> Option<Slot> {
        self.lock()
            .queue
            .top_index()
            .map(|i| Slot::from_index(i, self.ordinary))
    }

    /// Display name of the current winner
    pub fn winner_name(&self) -> Option<String> {
        let state = self.lock();
        let name = state.queue.top_index().map(|i| state.voters[i].name.clone());
        name
    }

    /// Re-deliver the current effective value to the consumer, changed or not
    pub fn refresh(&self) -> VoteResult<()> {
        let mut state = self.lock();
        debug!("Vote {}: refresh", self.name);
        self.dispatch(&mut state)
    }

    /// Engage or release the reserved `Force` voter.
    ///
    /// `Force` outranks every ordinary voter, so while engaged its value is
    /// the effective value. On release `value` is ignored and the last forced
    /// value stays recorded. The consumer is always notified; a callback
    /// failure is logged rather than returned.
    pub fn force_override(&self, enabled: bool, value: V) {
        self.apply_force(enabled.then_some(value));
    }

    /// Release the `Force` voter; same as `force_override(false, _)`
    pub fn release_force(&self) {
        self.apply_force(None);
    }

    fn apply_force(&self, value: Option<V>) {
        let force = Slot::Force.index(self.ordinary);
        let mut state = self.lock();
        let old = state.queue.top().cloned();
        let engaged = value.is_some();

        match value {
            Some(value) => {
                state.queue.push(force, value.clone());
                state.voters[force].value = value;
            }
            None if state.queue.is_active(force) => {
                let popped = state.queue.pop();
                debug_assert_eq!(popped, Some(force));
            }
            None => {}
        }
        state.voters[force].enabled = engaged;

        if state.queue.top() != old.as_ref() {
            state.last_change = Utc::now();
        }

        info!(
            "Vote {}: force override {} (effective {:?})",
            self.name,
            if engaged { "engaged" } else { "released" },
            state.queue.top()
        );

        if let Err(e) = self.dispatch(&mut state) {
            warn!("Vote {}: {}", self.name, e);
        }
    }

    /// Value of the `Force` voter, if engaged
    pub fn forced(&self) -> Option<V> {
        let state = self.lock();
        let force = &state.voters[Slot::Force.index(self.ordinary)];
        let value = force.enabled.then(|| force.value.clone());
        value
    }

    /// Remove the vote from its registry and release its state
    pub fn destroy(&self) {
        if let Some(members) = self.registry.upgrade() {
            Registry::from_members(members).unregister(self);
        }

        match self.state.lock().take() {
            Some(_) => info!("Vote {}: destroyed", self.name),
            None => panic!("vote {:?} destroyed twice", self.name),
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().is_none()
    }

    /// Run `f` against the live state; `None` once destroyed
    pub(crate) fn inspect<R>(&self, f: impl FnOnce(&VoteState<V>) -> R) -> Option<R> {
        self.state.lock().as_ref().map(f)
    }

    pub(crate) fn slot_of(&self, index: usize) -> Slot {
        Slot::from_index(index, self.ordinary)
    }

    fn lock(&self) -> MappedMutexGuard<'_, VoteState<V>> {
        MutexGuard::map(self.state.lock(), |state| match state {
            Some(state) => state,
            None => panic!("vote {:?} used after destroy", self.name),
        })
    }

    fn check_ordinary(&self, index: usize) {
        assert!(
            index < self.ordinary,
            "vote {:?}: voter index {} out of range ({} voters)",
            self.name,
            index,
            self.ordinary
        );
    }

    fn slot_index(&self, slot: Slot) -> usize {
        if let Slot::Ordinary(i) = slot {
            self.check_ordinary(i);
        }
        slot.index(self.ordinary)
    }

    fn notify_if_changed(&self, state: &mut VoteState<V>, old: Option<V>) -> VoteResult<()> {
        if state.queue.top() == old.as_ref() {
            return Ok(());
        }

        state.last_change = Utc::now();
        debug!(
            "Vote {}: effective {:?} -> {:?}",
            self.name,
            old,
            state.queue.top()
        );
        self.dispatch(state)
    }

    fn dispatch(&self, state: &mut VoteState<V>) -> VoteResult<()> {
        let VoteState {
            queue, callback, ..
        } = state;
        let value = queue
            .top()
            .ok_or_else(|| VoteError::Empty(self.name.clone()))?;

        callback.on_vote(value).map_err(|source| VoteError::Callback {
            vote: self.name.clone(),
            source,
        })
    }
}

impl<V: VoteValue> fmt::Debug for Vote<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vote")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("voters", &self.ordinary)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Declares a vote before it is created and registered
pub struct VoteBuilder<V> {
    name: String,
    policy: Policy,
    voters: Vec<(String, Option<Priority>)>,
    comparator: Option<Arc<dyn Comparator<V>>>,
}

impl<V: VoteValue> VoteBuilder<V> {
    /// Start a vote with no comparator installed.
    ///
    /// `Min`, `Max` and `CustomData` need one: use [`VoteBuilder::ordered`]
    /// for naturally ordered values or [`VoteBuilder::comparator`].
    pub fn new(name: impl Into<String>, policy: Policy) -> Self {
        Self {
            name: name.into(),
            policy,
            voters: Vec::new(),
            comparator: None,
        }
    }

    pub fn voter(mut self, name: impl Into<String>) -> Self {
        self.voters.push((name.into(), None));
        self
    }

    pub fn voters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.voters
            .extend(names.into_iter().map(|name| (name.into(), None)));
        self
    }

    /// Add a voter with an initial priority other than [`DEFAULT_PRIORITY`]
    pub fn voter_with_priority(mut self, name: impl Into<String>, priority: Priority) -> Self {
        self.voters.push((name.into(), Some(priority)));
        self
    }

    /// Install the tie-break rule, replacing any previous one
    pub fn comparator(mut self, comparator: impl Comparator<V> + 'static) -> Self {
        self.comparator = Some(Arc::new(comparator));
        self
    }

    /// Validate, build and register the vote.
    ///
    /// The name is reserved first, so a creation that loses a same-name race
    /// fails before its callback ever runs. The callback is then invoked once
    /// with `initial` before the vote becomes visible in the registry.
    /// Creation is all-or-nothing: on any error no vote is registered and the
    /// name is free again.
    pub fn create(
        self,
        registry: &Registry<V>,
        initial: V,
        callback: impl VoteCallback<V> + 'static,
    ) -> VoteResult<Arc<Vote<V>>> {
        let VoteBuilder {
            name,
            policy,
            voters,
            comparator,
        } = self;

        if voters.is_empty() {
            return Err(VoteError::NoVoters(name));
        }
        let comparator = match (policy.needs_comparator(), comparator) {
            (true, None) => return Err(VoteError::MissingComparator(name)),
            (true, comparator) => comparator,
            (false, _) => None,
        };
        if let Some(&priority) = voters
            .iter()
            .filter_map(|(_, p)| p.as_ref())
            .find(|p| !priority_in_range(**p))
        {
            return Err(VoteError::PriorityOutOfRange {
                priority,
                min: MIN_PRIORITY,
                max: MAX_PRIORITY,
            });
        }
        let reservation = registry.reserve(&name)?;

        let ordinary = voters.len();
        let capacity = ordinary + RESERVED_SLOTS;
        let mut queue = PriorityQueue::new(capacity, comparator)?;

        let mut table = Vec::new();
        table.try_reserve_exact(capacity)?;
        for (i, (voter, priority)) in voters.into_iter().enumerate() {
            queue.set_priority(i, priority.unwrap_or(DEFAULT_PRIORITY));
            table.push(Voter::new(voter, false, initial.clone()));
        }
        table.push(Voter::new(INIT_VOTER_NAME, true, initial.clone()));
        table.push(Voter::new(FORCE_VOTER_NAME, false, initial.clone()));

        let init = Slot::Init.index(ordinary);
        queue.set_priority(init, INIT_PRIORITY);
        queue.set_priority(Slot::Force.index(ordinary), FORCE_PRIORITY);
        queue.push(init, initial);

        let vote = Arc::new(Vote {
            name,
            policy,
            ordinary,
            state: Mutex::new(Some(VoteState {
                voters: table,
                queue,
                callback: Box::new(callback),
                last_change: Utc::now(),
            })),
            registry: registry.downgrade(),
        });

        vote.refresh()?;
        reservation.commit(vote.clone());

        info!(
            "Vote {}: created ({} policy, {} voters, initial {:?})",
            vote.name,
            vote.policy,
            vote.ordinary,
            vote.get_result()?
        );

        Ok(vote)
    }
}

impl<V: VoteValue + Ord> VoteBuilder<V> {
    /// Start a vote whose values have a natural order.
    ///
    /// `Min` and `Max` get the matching comparator installed.
    pub fn ordered(name: impl Into<String>, policy: Policy) -> Self {
        let builder = Self::new(name, policy);
        match policy {
            Policy::Min => builder.comparator(Smaller),
            Policy::Max => builder.comparator(Larger),
            Policy::EnableOnly | Policy::CustomData => builder,
        }
    }
}
