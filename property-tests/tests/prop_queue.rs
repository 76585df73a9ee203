//! Property tests for the indexed priority structure
//!
//! Tests ordering invariants for:
//! - Top: always the maximum by (priority, comparator)
//! - Membership: len tracks active slots
//! - Pop: drains in non-increasing order

use proptest::prelude::*;
use std::sync::Arc;
use vote_property_tests::*;

const CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy)]
enum QueueOp {
    Push(usize, i64),
    Remove(usize),
    SetPriority(usize, Priority),
}

// ============================================================================
// Strategies
// ============================================================================

fn queue_op() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        3 => (0..CAPACITY, -20i64..20).prop_map(|(i, v)| QueueOp::Push(i, v)),
        1 => (0..CAPACITY).prop_map(QueueOp::Remove),
        1 => (0..CAPACITY, 0..4).prop_map(|(i, p)| QueueOp::SetPriority(i, p)),
    ]
}

/// Reference top: highest priority, then largest value
fn scan_top(model: &[Option<i64>], priorities: &[Priority]) -> Option<i64> {
    model
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (priorities[i], v)))
        .max()
        .map(|(_, v)| v)
}

// ============================================================================
// Ordering Property Tests
// ============================================================================

proptest! {
    /// CORE INVARIANT: top() equals the maximum over active slots
    #[test]
    fn top_matches_linear_scan(ops in prop::collection::vec(queue_op(), 1..200)) {
        let mut q = PriorityQueue::<i64>::new(CAPACITY, Some(Arc::new(Larger))).unwrap();
        let mut model = [None; CAPACITY];
        let mut priorities = [DEFAULT_PRIORITY; CAPACITY];

        for op in ops {
            match op {
                QueueOp::Push(i, v) => {
                    q.push(i, v);
                    model[i] = Some(v);
                }
                QueueOp::Remove(i) => {
                    q.remove(i);
                    model[i] = None;
                }
                QueueOp::SetPriority(i, p) => {
                    q.set_priority(i, p);
                    priorities[i] = p;
                }
            }

            prop_assert_eq!(q.top().copied(), scan_top(&model, &priorities));
            prop_assert_eq!(q.len(), model.iter().flatten().count());
        }
    }

    /// Popping everything yields keys in non-increasing order
    #[test]
    fn pop_drains_in_order(
        entries in prop::collection::vec((0..4i32, -20i64..20), 1..CAPACITY)
    ) {
        let mut q = PriorityQueue::<i64>::new(CAPACITY, Some(Arc::new(Larger))).unwrap();
        for (i, &(p, v)) in entries.iter().enumerate() {
            q.set_priority(i, p);
            q.push(i, v);
        }

        let mut drained = Vec::new();
        while let Some(i) = q.top_index() {
            drained.push((q.get_priority(i), *q.top().unwrap()));
            prop_assert_eq!(q.pop(), Some(i));
        }

        prop_assert_eq!(drained.len(), entries.len());
        prop_assert!(drained.windows(2).all(|w| w[0] >= w[1]));
        prop_assert!(q.is_empty());
    }
}
