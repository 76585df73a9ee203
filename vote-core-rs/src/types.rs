//! Core types for the vote engine

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Voter priority. Higher always wins regardless of value.
pub type Priority = i32;

/// Lowest priority an ordinary voter may hold
pub const MIN_PRIORITY: Priority = 0;

/// Highest priority an ordinary voter may hold
pub const MAX_PRIORITY: Priority = 99;

/// Priority of a voter that never had one assigned
pub const DEFAULT_PRIORITY: Priority = MIN_PRIORITY;

/// Priority of the reserved `Init` voter (below every ordinary voter)
pub const INIT_PRIORITY: Priority = MIN_PRIORITY - 1;

/// Priority of the reserved `Force` voter (above every ordinary voter)
pub const FORCE_PRIORITY: Priority = MAX_PRIORITY + 1;

/// Number of reserved slots appended after the ordinary voters
pub const RESERVED_SLOTS: usize = 2;

/// Display name of the reserved fallback voter
pub const INIT_VOTER_NAME: &str = "init";

/// Display name of the reserved override voter
pub const FORCE_VOTER_NAME: &str = "force";

/// Values a vote can arbitrate over.
///
/// Blanket-implemented; any cloneable, comparable-for-equality payload works.
pub trait VoteValue: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

impl<T> VoteValue for T where T: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

/// Rule family used to resolve ties among equal-priority active voters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Smallest value wins
    Min,
    /// Largest value wins
    Max,
    /// Only enablement matters; no value tie-break
    EnableOnly,
    /// Externally supplied comparator decides
    CustomData,
}

impl Policy {
    /// Whether the policy needs a comparator to order equal-priority voters
    pub fn needs_comparator(&self) -> bool {
        !matches!(self, Policy::EnableOnly)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Policy::Min => "min",
            Policy::Max => "max",
            Policy::EnableOnly => "enable_only",
            Policy::CustomData => "custom_data",
        })
    }
}

/// Tie-break between two values of equal priority.
///
/// `Ordering::Greater` means `a` wins over `b`.
pub trait Comparator<V>: Send + Sync {
    fn compare(&self, a: &V, b: &V) -> Ordering;
}

impl<V, F> Comparator<V> for F
where
    F: Fn(&V, &V) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &V, b: &V) -> Ordering {
        self(a, b)
    }
}

/// Natural-order comparator favouring the smaller value (`Min` policy)
#[derive(Debug, Clone, Copy, Default)]
pub struct Smaller;

impl<V: Ord> Comparator<V> for Smaller {
    fn compare(&self, a: &V, b: &V) -> Ordering {
        b.cmp(a)
    }
}

/// Natural-order comparator favouring the larger value (`Max` policy)
#[derive(Debug, Clone, Copy, Default)]
pub struct Larger;

impl<V: Ord> Comparator<V> for Larger {
    fn compare(&self, a: &V, b: &V) -> Ordering {
        a.cmp(b)
    }
}

/// Result a consumer callback hands back to the engine
pub type CallbackResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Consumer notified with the effective value whenever it changes.
///
/// The implementor carries whatever context the consumer needs. It is invoked
/// with the vote's lock held and must not call back into the same vote.
pub trait VoteCallback<V>: Send {
    fn on_vote(&mut self, value: &V) -> CallbackResult;
}

impl<V, F> VoteCallback<V> for F
where
    F: FnMut(&V) -> CallbackResult + Send,
{
    fn on_vote(&mut self, value: &V) -> CallbackResult {
        self(value)
    }
}

/// Address of a voter within a vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    /// One of the caller-declared voters, by declaration order
    Ordinary(usize),
    /// Reserved always-active fallback
    Init,
    /// Reserved diagnostic override
    Force,
}

impl Slot {
    /// Position in the priority structure for a vote with `ordinary` voters
    pub(crate) fn index(self, ordinary: usize) -> usize {
        match self {
            Slot::Ordinary(i) => i,
            Slot::Init => ordinary,
            Slot::Force => ordinary + 1,
        }
    }

    /// Inverse of [`Slot::index`]
    pub(crate) fn from_index(index: usize, ordinary: usize) -> Self {
        match index.checked_sub(ordinary) {
            None => Slot::Ordinary(index),
            Some(0) => Slot::Init,
            Some(_) => Slot::Force,
        }
    }

    pub fn is_reserved(&self) -> bool {
        !matches!(self, Slot::Ordinary(_))
    }
}

impl From<usize> for Slot {
    fn from(index: usize) -> Self {
        Slot::Ordinary(index)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Ordinary(i) => write!(f, "#{}", i),
            Slot::Init => write!(f, "{}", INIT_VOTER_NAME),
            Slot::Force => write!(f, "{}", FORCE_VOTER_NAME),
        }
    }
}

/// One named contributor to a vote
#[derive(Debug, Clone, PartialEq)]
pub struct Voter<V> {
    pub name: String,
    pub enabled: bool,
    pub value: V,
}

impl<V> Voter<V> {
    pub fn new(name: impl Into<String>, enabled: bool, value: V) -> Self {
        Self {
            name: name.into(),
            enabled,
            value,
        }
    }
}

/// Check that an ordinary voter priority lies in `[MIN_PRIORITY, MAX_PRIORITY]`
pub fn priority_in_range(priority: Priority) -> bool {
    (MIN_PRIORITY..=MAX_PRIORITY).contains(&priority)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_priorities_bracket_range() {
        assert!(INIT_PRIORITY < MIN_PRIORITY);
        assert!(FORCE_PRIORITY > MAX_PRIORITY);
        assert!(priority_in_range(DEFAULT_PRIORITY));
        assert!(!priority_in_range(INIT_PRIORITY));
        assert!(!priority_in_range(FORCE_PRIORITY));
    }

    #[test]
    fn test_slot_index_mapping() {
        let n = 3;
        assert_eq!(Slot::Ordinary(2).index(n), 2);
        assert_eq!(Slot::Init.index(n), 3);
        assert_eq!(Slot::Force.index(n), 4);

        for i in 0..n + RESERVED_SLOTS {
            assert_eq!(Slot::from_index(i, n).index(n), i);
        }
        assert_eq!(Slot::from_index(3, n), Slot::Init);
        assert_eq!(Slot::from_index(4, n), Slot::Force);
    }

    #[test]
    fn test_natural_comparators() {
        assert_eq!(Smaller.compare(&3, &5), Ordering::Greater);
        assert_eq!(Larger.compare(&3, &5), Ordering::Less);
        assert_eq!(Larger.compare(&5, &5), Ordering::Equal);
    }

    #[test]
    fn test_policy_serialization() {
        let json = serde_json::to_string(&Policy::EnableOnly).unwrap();
        assert_eq!(json, "\"enable_only\"");

        let parsed: Policy = serde_json::from_str("\"custom_data\"").unwrap();
        assert_eq!(parsed, Policy::CustomData);
        assert_eq!(parsed.to_string(), "custom_data");
    }

    #[test]
    fn test_closure_comparator() {
        let by_len = |a: &String, b: &String| a.len().cmp(&b.len());
        assert_eq!(
            by_len.compare(&"long".to_string(), &"s".to_string()),
            Ordering::Greater
        );
    }
}
