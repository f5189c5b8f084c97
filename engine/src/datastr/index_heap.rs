//! An addressable priority queue implemented with a 4-ary heap.
//!
//! Every element maps to a unique index through `Indexing`, so the position of an element
//! can be looked up and its key decreased without searching.
//!
//! # Examples
//!
//! ```
//! use routing_engine::datastr::index_heap::{Indexing, IndexdMinHeap};
//!
//! #[derive(Copy, Clone, Eq, PartialEq, Debug, Ord, PartialOrd)]
//! pub struct State {
//!     pub distance: usize,
//!     pub node: usize,
//! }
//!
//! impl Indexing for State {
//!     fn as_index(&self) -> usize {
//!         self.node
//!     }
//! }
//!
//! let mut heap = IndexdMinHeap::new(3);
//! heap.push(State { node: 0, distance: 42 });
//! heap.push(State { node: 1, distance: 23 });
//! heap.push(State { node: 2, distance: 50000 });
//! assert_eq!(heap.peek().cloned(), Some(State { node: 1, distance: 23 }));
//! heap.decrease_key(State { node: 0, distance: 1 });
//! assert_eq!(heap.pop(), Some(State { node: 0, distance: 1 }));
//! ```

/// Maps heap elements to a unique index in `[0, max_index)`.
pub trait Indexing {
    fn as_index(&self) -> usize;
}

/// A min priority queue over elements with indices from `0` to `max_index - 1`.
/// The interface mirrors the standard library `BinaryHeap` (with reversed order)
/// plus `decrease_key` and `increase_key`.
#[derive(Debug, Clone)]
pub struct IndexdMinHeap<T> {
    positions: Vec<usize>,
    data: Vec<T>,
}

const TREE_ARITY: usize = 4;
const INVALID_POSITION: usize = usize::MAX;

impl<T: Ord + Indexing> IndexdMinHeap<T> {
    pub fn new(max_index: usize) -> IndexdMinHeap<T> {
        IndexdMinHeap {
            positions: vec![INVALID_POSITION; max_index],
            data: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Upper bound (exclusive) for element indices.
    pub fn max_index(&self) -> usize {
        self.positions.len()
    }

    pub fn contains_index(&self, index: usize) -> bool {
        self.positions[index] != INVALID_POSITION
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(self.positions[index])
    }

    pub fn clear(&mut self) {
        for element in &self.data {
            self.positions[element.as_index()] = INVALID_POSITION;
        }
        self.data.clear();
    }

    pub fn peek(&self) -> Option<&T> {
        self.data.first()
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.data.is_empty() {
            return None;
        }
        let last = self.data.len() - 1;
        self.swap_positions(0, last);
        let min = self.data.pop()?;
        self.positions[min.as_index()] = INVALID_POSITION;
        if !self.data.is_empty() {
            self.sift_down(0);
        }
        Some(min)
    }

    /// Panics if an element with the same index is already queued.
    pub fn push(&mut self, element: T) {
        assert!(!self.contains_index(element.as_index()));
        let position = self.data.len();
        self.positions[element.as_index()] = position;
        self.data.push(element);
        self.sift_up(position);
    }

    /// Inserts the element or replaces the queued element with the same index if the new one is smaller.
    /// Returns whether the heap changed.
    pub fn push_or_decrease(&mut self, element: T) -> bool {
        let index = element.as_index();
        if !self.contains_index(index) {
            self.push(element);
            true
        } else if element < self.data[self.positions[index]] {
            self.decrease_key(element);
            true
        } else {
            false
        }
    }

    /// Replaces the queued element with the same index by a smaller one.
    pub fn decrease_key(&mut self, element: T) {
        let position = self.positions[element.as_index()];
        debug_assert!(element <= self.data[position]);
        self.data[position] = element;
        self.sift_up(position);
    }

    /// Replaces the queued element with the same index by a larger one.
    pub fn increase_key(&mut self, element: T) {
        let position = self.positions[element.as_index()];
        debug_assert!(element >= self.data[position]);
        self.data[position] = element;
        self.sift_down(position);
    }

    fn swap_positions(&mut self, a: usize, b: usize) {
        self.positions.swap(self.data[a].as_index(), self.data[b].as_index());
        self.data.swap(a, b);
    }

    fn sift_up(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / TREE_ARITY;
            if self.data[parent] <= self.data[position] {
                break;
            }
            self.swap_positions(parent, position);
            position = parent;
        }
    }

    fn sift_down(&mut self, mut position: usize) {
        loop {
            let first_child = TREE_ARITY * position + 1;
            let last_child = (first_child + TREE_ARITY).min(self.data.len());
            let smallest_child = match (first_child..last_child).min_by(|&a, &b| self.data[a].cmp(&self.data[b])) {
                Some(child) => child,
                None => return,
            };
            if self.data[smallest_child] >= self.data[position] {
                return;
            }
            self.swap_positions(smallest_child, position);
            position = smallest_child;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    #[derive(Copy, Clone, Eq, PartialEq, Debug, Ord, PartialOrd)]
    struct Entry {
        key: u32,
        id: usize,
    }

    impl Indexing for Entry {
        fn as_index(&self) -> usize {
            self.id
        }
    }

    #[test]
    fn pops_in_ascending_order_after_random_updates() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut heap = IndexdMinHeap::new(100);
        let mut keys = vec![u32::MAX; 100];
        for _ in 0..500 {
            let id = rng.gen_range(0..100);
            let key = rng.gen_range(0..1000);
            if heap.push_or_decrease(Entry { key, id }) {
                keys[id] = key;
            } else {
                assert!(keys[id] <= key);
            }
        }
        let mut last = 0;
        let mut popped = 0;
        while let Some(Entry { key, id }) = heap.pop() {
            assert!(key >= last);
            assert_eq!(keys[id], key);
            last = key;
            popped += 1;
        }
        assert_eq!(popped, keys.iter().filter(|&&k| k != u32::MAX).count());
    }

    #[test]
    fn increase_key_moves_element_down() {
        let mut heap = IndexdMinHeap::new(3);
        heap.push(Entry { key: 1, id: 0 });
        heap.push(Entry { key: 2, id: 1 });
        heap.push(Entry { key: 3, id: 2 });
        heap.increase_key(Entry { key: 10, id: 0 });
        assert_eq!(heap.pop(), Some(Entry { key: 2, id: 1 }));
        assert_eq!(heap.pop(), Some(Entry { key: 3, id: 2 }));
        assert_eq!(heap.pop(), Some(Entry { key: 10, id: 0 }));
        assert!(heap.is_empty());
        assert!(!heap.contains_index(0));
    }
}
