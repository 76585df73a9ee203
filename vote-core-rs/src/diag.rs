//! Diagnostic surface: read-only snapshots plus the forced-value control.
//!
//! Transport-agnostic. An embedding application can print snapshots to a
//! console, serve them as JSON, or ignore this module entirely. Reads never
//! fail: a destroyed vote dumps as an empty snapshot.

use crate::types::{Policy, Priority, Slot, VoteValue};
use crate::vote::Vote;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// State of one active voter at dump time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoterSnapshot<V> {
    pub slot: Slot,
    pub name: String,
    pub enabled: bool,
    pub value: V,
    pub priority: Priority,
    /// Owns the top position
    pub winner: bool,
}

/// Point-in-time view of a vote
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteSnapshot<V> {
    pub name: String,
    pub policy: Policy,
    /// Effective value; `None` if the vote is gone
    pub result: Option<V>,
    /// Name of the winning voter
    pub winner: Option<String>,
    /// Value of the force override, if engaged
    pub forced: Option<V>,
    /// Active voters, winner first, then by descending priority
    pub voters: Vec<VoterSnapshot<V>>,
    pub last_change: Option<DateTime<Utc>>,
}

impl<V> VoteSnapshot<V> {
    /// Snapshot reporting "no data"
    pub fn empty(name: impl Into<String>, policy: Policy) -> Self {
        Self {
            name: name.into(),
            policy,
            result: None,
            winner: None,
            forced: None,
            voters: Vec::new(),
            last_change: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.result.is_none()
    }
}

impl<V: fmt::Debug> fmt::Display for VoteSnapshot<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.policy)?;
        let Some(result) = &self.result else {
            return writeln!(f, ": no data");
        };
        write!(f, ": {:?}", result)?;
        if let Some(winner) = &self.winner {
            write!(f, " [{}]", winner)?;
        }
        if let Some(forced) = &self.forced {
            write!(f, " forced={:?}", forced)?;
        }
        writeln!(f)?;

        for v in &self.voters {
            writeln!(
                f,
                "  {} {:<16} en={} val={:?} prio={}",
                if v.winner { '*' } else { ' ' },
                v.name,
                u8::from(v.enabled),
                v.value,
                v.priority
            )?;
        }
        Ok(())
    }
}

/// Introspection surface of a vote
pub trait Diagnostics {
    type Value;

    /// Current state for display; never fails
    fn dump(&self) -> VoteSnapshot<Self::Value>;

    /// Read half of the forced-value control
    fn read_forced(&self) -> Option<Self::Value>;

    /// Write half: `Some` engages the override, `None` releases it
    fn write_forced(&self, value: Option<Self::Value>);
}

impl<V: VoteValue> Diagnostics for Vote<V> {
    type Value = V;

    fn dump(&self) -> VoteSnapshot<V> {
        self.inspect(|state| {
            let top = state.queue.top_index();

            let mut voters: Vec<_> = state
                .queue
                .active()
                .map(|i| {
                    let voter = &state.voters[i];
                    VoterSnapshot {
                        slot: self.slot_of(i),
                        name: voter.name.clone(),
                        enabled: voter.enabled,
                        value: voter.value.clone(),
                        priority: state.queue.get_priority(i),
                        winner: Some(i) == top,
                    }
                })
                .collect();
            voters.sort_by(|a, b| b.winner.cmp(&a.winner).then(b.priority.cmp(&a.priority)));

            let force = &state.voters[Slot::Force.index(self.voter_count())];
            VoteSnapshot {
                name: self.name().to_string(),
                policy: self.policy(),
                result: state.queue.top().cloned(),
                winner: top.map(|i| state.voters[i].name.clone()),
                forced: force.enabled.then(|| force.value.clone()),
                voters,
                last_change: Some(state.last_change),
            }
        })
        .unwrap_or_else(|| VoteSnapshot::empty(self.name(), self.policy()))
    }

    fn read_forced(&self) -> Option<V> {
        self.inspect(|state| {
            let force = &state.voters[Slot::Force.index(self.voter_count())];
            force.enabled.then(|| force.value.clone())
        })
        .flatten()
    }

    fn write_forced(&self, value: Option<V>) {
        match value {
            Some(value) => self.force_override(true, value),
            None => self.release_force(),
        }
    }
}
