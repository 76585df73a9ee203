//! Configuration input for vote creation
//!
//! Board setup code describes its votes as data; these types deserialize
//! from JSON such as:
//!
//! ```json
//! {
//!   "name": "chg_current",
//!   "policy": "min",
//!   "voters": ["thermal", { "name": "usb", "priority": 5 }],
//!   "initial": 2000
//! }
//! ```

use crate::error::VoteResult;
use crate::registry::Registry;
use crate::types::{Policy, Priority, VoteCallback, VoteValue};
use crate::vote::{Vote, VoteBuilder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One declared voter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawVoter")]
pub struct VoterConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

/// Accepts either a bare name or a full voter object
#[derive(Deserialize)]
#[serde(untagged)]
enum RawVoter {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        priority: Option<Priority>,
    },
}

impl From<RawVoter> for VoterConfig {
    fn from(raw: RawVoter) -> Self {
        match raw {
            RawVoter::Name(name) => Self {
                name,
                priority: None,
            },
            RawVoter::Full { name, priority } => Self { name, priority },
        }
    }
}

/// One declared vote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteConfig<V> {
    pub name: String,
    pub policy: Policy,
    pub voters: Vec<VoterConfig>,
    pub initial: V,
}

impl<V: VoteValue> VoteConfig<V> {
    pub fn new(name: impl Into<String>, policy: Policy, initial: V) -> Self {
        Self {
            name: name.into(),
            policy,
            voters: Vec::new(),
            initial,
        }
    }

    pub fn voter(mut self, name: impl Into<String>) -> Self {
        self.voters.push(VoterConfig {
            name: name.into(),
            priority: None,
        });
        self
    }

    pub fn voter_with_priority(mut self, name: impl Into<String>, priority: Priority) -> Self {
        self.voters.push(VoterConfig {
            name: name.into(),
            priority: Some(priority),
        });
        self
    }

    /// Builder with the declared voters and no comparator
    pub fn builder(&self) -> VoteBuilder<V> {
        self.declare(VoteBuilder::new(self.name.clone(), self.policy))
    }

    fn declare(&self, builder: VoteBuilder<V>) -> VoteBuilder<V> {
        self.voters.iter().fold(builder, |b, v| match v.priority {
            Some(p) => b.voter_with_priority(v.name.clone(), p),
            None => b.voter(v.name.clone()),
        })
    }
}

impl<V: VoteValue + Ord> VoteConfig<V> {
    /// Builder with natural-order comparators installed for `Min`/`Max`
    pub fn ordered_builder(&self) -> VoteBuilder<V> {
        self.declare(VoteBuilder::ordered(self.name.clone(), self.policy))
    }

    /// Create and register the vote described by this config
    pub fn create(
        &self,
        registry: &Registry<V>,
        callback: impl VoteCallback<V> + 'static,
    ) -> VoteResult<Arc<Vote<V>>> {
        self.ordered_builder()
            .create(registry, self.initial.clone(), callback)
    }
}
