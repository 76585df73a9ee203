//! Indexed priority structure.
//!
//! A fixed set of slots `0..capacity`, any subset of which may be active.
//! Active slots are kept in a binary max-heap ordered by `(priority, value)`,
//! with a reverse index so any slot can be re-ordered or removed in
//! O(log n) without searching for it.
//!
//! Ordering:
//! - higher priority wins outright
//! - on equal priority the comparator (if any) decides, `Greater` winning
//! - without a comparator equal-priority slots are unordered among themselves

use crate::error::{VoteError, VoteResult};
use crate::types::{Comparator, Priority, DEFAULT_PRIORITY};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Fixed-capacity indexed max-heap
pub struct PriorityQueue<V> {
    /// Active slot indices in heap order
    heap: Vec<usize>,
    /// Heap position of each slot, `None` when inactive
    pos: Vec<Option<usize>>,
    /// Last-set priority of each slot (kept while inactive)
    priorities: Vec<Priority>,
    /// Value of each active slot
    values: Vec<Option<V>>,
    comparator: Option<Arc<dyn Comparator<V>>>,
}

impl<V> PriorityQueue<V> {
    /// Create a structure with `capacity` slots, all inactive.
    ///
    /// All storage is reserved up front; later operations never allocate.
    pub fn new(
        capacity: usize,
        comparator: Option<Arc<dyn Comparator<V>>>,
    ) -> VoteResult<Self> {
        if capacity == 0 {
            return Err(VoteError::ZeroCapacity);
        }

        let mut heap = Vec::new();
        heap.try_reserve_exact(capacity)?;
        let mut pos = Vec::new();
        pos.try_reserve_exact(capacity)?;
        let mut priorities = Vec::new();
        priorities.try_reserve_exact(capacity)?;
        let mut values = Vec::new();
        values.try_reserve_exact(capacity)?;

        pos.resize(capacity, None);
        priorities.resize(capacity, DEFAULT_PRIORITY);
        values.resize_with(capacity, || None);

        Ok(Self {
            heap,
            pos,
            priorities,
            values,
            comparator,
        })
    }

    pub fn capacity(&self) -> usize {
        self.pos.len()
    }

    /// Number of active slots
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.check_index(index);
        self.pos[index].is_some()
    }

    /// Record the priority of a slot, re-ordering it if active
    pub fn set_priority(&mut self, index: usize, priority: Priority) {
        self.check_index(index);
        self.priorities[index] = priority;
        if let Some(p) = self.pos[index] {
            self.resift(p);
        }
    }

    pub fn get_priority(&self, index: usize) -> Priority {
        self.check_index(index);
        self.priorities[index]
    }

    /// Activate a slot with `value`, or replace the value of an active slot
    pub fn push(&mut self, index: usize, value: V) {
        self.check_index(index);
        self.values[index] = Some(value);

        match self.pos[index] {
            Some(p) => self.resift(p),
            None => {
                let p = self.heap.len();
                self.heap.push(index);
                self.pos[index] = Some(p);
                self.sift_up(p);
            }
        }
    }

    /// Remove the current maximum, returning its slot index
    pub fn pop(&mut self) -> Option<usize> {
        let top = self.top_index()?;
        self.remove(top);
        Some(top)
    }

    /// Deactivate a slot; no-op if already inactive
    pub fn remove(&mut self, index: usize) {
        self.check_index(index);
        let Some(p) = self.pos[index].take() else {
            return;
        };
        self.values[index] = None;

        let last = self.heap.len() - 1;
        if p != last {
            self.heap.swap(p, last);
            self.pos[self.heap[p]] = Some(p);
        }
        self.heap.pop();

        if p < self.heap.len() {
            self.resift(p);
        }
    }

    /// Value of the current maximum
    pub fn top(&self) -> Option<&V> {
        self.top_index().and_then(|i| self.values[i].as_ref())
    }

    /// Slot index of the current maximum
    pub fn top_index(&self) -> Option<usize> {
        self.heap.first().copied()
    }

    /// Value of a slot, if active
    pub fn get(&self, index: usize) -> Option<&V> {
        self.check_index(index);
        self.values[index].as_ref()
    }

    /// Active slot indices, in no particular order
    pub fn active(&self) -> impl Iterator<Item = usize> + '_ {
        self.heap.iter().copied()
    }

    fn check_index(&self, index: usize) {
        assert!(
            index < self.capacity(),
            "priority structure index {} out of range (capacity {})",
            index,
            self.capacity()
        );
    }

    /// Does slot `a` rank strictly above slot `b`?
    fn wins(&self, a: usize, b: usize) -> bool {
        match self.priorities[a].cmp(&self.priorities[b]) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => match (&self.comparator, &self.values[a], &self.values[b]) {
                (Some(cmp), Some(va), Some(vb)) => cmp.compare(va, vb) == Ordering::Greater,
                _ => false,
            },
        }
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.pos[self.heap[i]] = Some(i);
        self.pos[self.heap[j]] = Some(j);
    }

    fn resift(&mut self, p: usize) {
        let p = self.sift_up(p);
        self.sift_down(p);
    }

    fn sift_up(&mut self, mut p: usize) -> usize {
        while p > 0 {
            let parent = (p - 1) / 2;
            if !self.wins(self.heap[p], self.heap[parent]) {
                break;
            }
            self.swap(p, parent);
            p = parent;
        }
        p
    }

    fn sift_down(&mut self, mut p: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * p + 1;
            let right = left + 1;
            let mut best = p;

            if left < len && self.wins(self.heap[left], self.heap[best]) {
                best = left;
            }
            if right < len && self.wins(self.heap[right], self.heap[best]) {
                best = right;
            }
            if best == p {
                break;
            }
            self.swap(p, best);
            p = best;
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for PriorityQueue<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityQueue")
            .field("capacity", &self.capacity())
            .field("active", &self.heap.len())
            .field("top", &self.top_index())
            .field("has_comparator", &self.comparator.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Larger, Smaller};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn min_queue(capacity: usize) -> PriorityQueue<i64> {
        PriorityQueue::new(capacity, Some(Arc::new(Smaller))).unwrap()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = PriorityQueue::<i64>::new(0, None).unwrap_err();
        assert!(matches!(err, VoteError::ZeroCapacity));
    }

    #[test]
    fn test_empty_top() {
        let q = min_queue(4);
        assert!(q.is_empty());
        assert_eq!(q.top(), None);
        assert_eq!(q.top_index(), None);
    }

    #[test]
    fn test_comparator_breaks_ties() {
        let mut q = min_queue(3);
        q.push(0, 5);
        q.push(1, 3);
        q.push(2, 8);
        assert_eq!(q.top(), Some(&3));
        assert_eq!(q.top_index(), Some(1));

        let mut q = PriorityQueue::<i64>::new(3, Some(Arc::new(Larger))).unwrap();
        q.push(0, 5);
        q.push(1, 3);
        q.push(2, 8);
        assert_eq!(q.top(), Some(&8));
    }

    #[test]
    fn test_priority_dominates_value() {
        let mut q = min_queue(3);
        q.push(0, 1);
        q.set_priority(1, 10);
        q.push(1, 1000);
        assert_eq!(q.top(), Some(&1000));
    }

    #[test]
    fn test_set_priority_reorders_active_slot() {
        let mut q = min_queue(3);
        q.push(0, 1);
        q.push(1, 2);
        assert_eq!(q.top_index(), Some(0));

        q.set_priority(1, 5);
        assert_eq!(q.top_index(), Some(1));
        assert_eq!(q.get_priority(1), 5);

        q.set_priority(1, DEFAULT_PRIORITY);
        assert_eq!(q.top_index(), Some(0));
    }

    #[test]
    fn test_set_priority_on_inactive_slot_is_remembered() {
        let mut q = min_queue(2);
        q.set_priority(1, 7);
        assert!(!q.is_active(1));
        q.push(0, 1);
        q.push(1, 100);
        assert_eq!(q.top_index(), Some(1));
    }

    #[test]
    fn test_push_active_updates_in_place() {
        let mut q = min_queue(3);
        q.push(0, 5);
        q.push(1, 3);
        q.push(1, 9);
        assert_eq!(q.len(), 2);
        assert_eq!(q.top(), Some(&5));
        assert_eq!(q.get(1), Some(&9));
    }

    #[test]
    fn test_remove_and_pop() {
        let mut q = min_queue(4);
        for (i, v) in [4, 2, 7, 1].into_iter().enumerate() {
            q.push(i, v);
        }

        q.remove(2);
        q.remove(2);
        assert_eq!(q.len(), 3);
        assert!(!q.is_active(2));

        assert_eq!(q.pop(), Some(3));
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(0));
        assert_eq!(q.pop(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn test_no_comparator_keeps_priority_order() {
        let mut q: PriorityQueue<&str> = PriorityQueue::new(3, None).unwrap();
        q.push(0, "a");
        q.set_priority(2, 3);
        q.push(2, "c");
        q.push(1, "b");
        assert_eq!(q.top(), Some(&"c"));

        q.remove(2);
        assert!(matches!(q.top(), Some(&"a") | Some(&"b")));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_index_panics() {
        let mut q = min_queue(2);
        q.push(2, 1);
    }

    #[test]
    fn test_matches_linear_scan() {
        let capacity = 12;
        let mut q = min_queue(capacity);
        let mut model: Vec<Option<(Priority, i64)>> = vec![None; capacity];
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..2000 {
            let i = rng.gen_range(0..capacity);
            match rng.gen_range(0..4) {
                0 | 1 => {
                    let v = rng.gen_range(0..20);
                    q.push(i, v);
                    model[i] = Some((q.get_priority(i), v));
                }
                2 => {
                    q.remove(i);
                    model[i] = None;
                }
                _ => {
                    let p = rng.gen_range(0..4);
                    q.set_priority(i, p);
                    if let Some(entry) = model[i].as_mut() {
                        entry.0 = p;
                    }
                }
            }

            // Highest priority, then smallest value
            let expected = model
                .iter()
                .flatten()
                .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
                .map(|(_, v)| *v);
            assert_eq!(q.top().copied(), expected);
        }
    }
}
