//! Vote Core Property-Based Tests
//!
//! Standalone test suite using proptest for arbitration invariants.
//!
//! # Usage
//!
//! ```bash
//! cargo test -p vote-property-tests                  # Run all property tests
//! cargo test -p vote-property-tests queue            # Only priority structure tests
//! PROPTEST_CASES=1000 cargo test -p vote-property-tests  # More test cases
//! ```
//!
//! # Test Modules
//!
//! - `prop_queue`: heap order against a linear scan
//! - `prop_vote`: determinism, idempotence, non-emptiness, force dominance,
//!   notify-on-change-only

use parking_lot::Mutex;
use std::sync::Arc;

pub use vote_core::*;

/// Fallback value every test vote starts from
pub const INITIAL: i64 = 1_000;

/// One producer action against a vote
#[derive(Debug, Clone, Copy)]
pub enum Op {
    Set {
        voter: usize,
        enabled: bool,
        value: i64,
    },
    Priority {
        voter: usize,
        priority: Priority,
    },
}

impl Op {
    pub fn apply(&self, vote: &Vote<i64>) -> VoteResult<()> {
        match *self {
            Op::Set {
                voter,
                enabled,
                value,
            } => vote.set(voter, enabled, value),
            Op::Priority { voter, priority } => vote.set_priority(voter, priority),
        }
    }
}

/// Values delivered to a vote's consumer, in order
pub type Delivered = Arc<Mutex<Vec<i64>>>;

/// Create a vote with `voters` producers whose consumer records every value
pub fn recording_vote(
    registry: &Registry<i64>,
    policy: Policy,
    voters: usize,
) -> VoteResult<(Arc<Vote<i64>>, Delivered)> {
    let delivered: Delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = delivered.clone();

    let names: Vec<String> = (0..voters).map(|i| format!("v{}", i)).collect();
    let vote = VoteBuilder::ordered("prop", policy)
        .voters(names)
        .create(registry, INITIAL, move |v: &i64| -> CallbackResult {
            sink.lock().push(*v);
            Ok(())
        })?;

    Ok((vote, delivered))
}

/// Number of values delivered so far
pub fn delivered_len(delivered: &Delivered) -> usize {
    delivered.lock().len()
}
