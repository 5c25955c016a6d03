//! Index-addressed binary min-heap used to merge partition cursors.
//!
//! [`MergeQueue`] stores slot numbers rather than the cursors themselves. The
//! cursors live in a separate array owned by the merge engine, and every heap
//! operation receives that array through the [`SlotOrdering`] trait. Keeping the
//! cursors outside of the heap lets the engine mutate a cursor in place (advance
//! it) and then restore the heap with a single sift-down, which
//! [`std::collections::BinaryHeap`] cannot express.
//!
//! The heap is 1-based: the root lives at position 1 and the children of
//! position `i` live at `2i` and `2i + 1`. Besides the usual operations it
//! provides [`MergeQueue::fill_top`], which collects every slot tied with the
//! root by walking only the tied subtree.

use std::cmp::Ordering;

/// Total order over the items addressed by queue slots.
pub trait SlotOrdering {
    /// Compares the items stored in slots `a` and `b`.
    fn compare_slots(&self, a: usize, b: usize) -> Ordering;
}

/// Binary min-heap of slot numbers with tie discovery at the root.
///
/// The queue never looks at the items directly; every operation that needs to
/// compare receives the item array. Callers must pass the same (logically) array
/// to every call, and must call [`MergeQueue::update_min_key`] after changing the
/// item in the root slot.
#[derive(Debug, Clone)]
pub struct MergeQueue {
    /// Heap of slots; position 0 is unused.
    heap: Vec<usize>,
    /// Maximum number of slots the queue accepts.
    capacity: usize,
    /// Scratch stack of heap positions, reused by `fill_top`.
    stack: Vec<usize>,
}

impl MergeQueue {
    /// Creates an empty queue that accepts up to `capacity` slots.
    pub fn with_capacity(capacity: usize) -> MergeQueue {
        let mut heap = Vec::with_capacity(capacity + 1);
        heap.push(usize::MAX);
        MergeQueue {
            heap,
            capacity,
            stack: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Removes all slots, keeping the allocation.
    pub fn clear(&mut self) {
        self.heap.truncate(1);
    }

    /// Slots in heap order (root first).
    pub fn slots(&self) -> &[usize] {
        &self.heap[1..]
    }

    /// Returns the slot with the smallest item without removing it.
    #[inline]
    pub fn peek_min(&self) -> Option<usize> {
        self.heap.get(1).copied()
    }

    /// Adds a slot to the queue.
    ///
    /// # Panics
    ///
    /// Panics if the queue already holds `capacity` slots.
    pub fn insert<O>(&mut self, slot: usize, items: &O)
    where
        O: SlotOrdering + ?Sized,
    {
        assert!(
            self.len() < self.capacity,
            "merge queue is full ({} slots)",
            self.capacity
        );
        self.heap.push(slot);
        self.sift_up(self.len(), items);
    }

    /// Removes and returns the slot with the smallest item.
    pub fn remove_min<O>(&mut self, items: &O) -> Option<usize>
    where
        O: SlotOrdering + ?Sized,
    {
        if self.is_empty() {
            return None;
        }
        // The last slot takes the root position.
        let min = self.heap.swap_remove(1);
        if !self.is_empty() {
            self.sift_down(1, items);
        }
        Some(min)
    }

    /// Restores the heap after the item of the root slot has grown, and returns
    /// the new root.
    pub fn update_min_key<O>(&mut self, items: &O) -> Option<usize>
    where
        O: SlotOrdering + ?Sized,
    {
        if self.is_empty() {
            return None;
        }
        self.sift_down(1, items);
        self.peek_min()
    }

    /// Collects the root slot and every other slot whose item equals the root's
    /// into `top` (root first), and returns how many there are.
    ///
    /// The slots remain in the queue. Since a node never compares less than its
    /// parent, a node can tie the root only if its parent does, so the walk
    /// descends only through tied nodes and costs O(number of ties).
    pub fn fill_top<O>(&mut self, items: &O, top: &mut Vec<usize>) -> usize
    where
        O: SlotOrdering + ?Sized,
    {
        top.clear();
        let size = self.len();
        if size == 0 {
            return 0;
        }

        let root = self.heap[1];
        top.push(root);
        self.stack.clear();
        self.stack.push(1);

        while let Some(pos) = self.stack.pop() {
            let left = pos << 1;
            for child in left..=size.min(left + 1) {
                let slot = self.heap[child];
                if items.compare_slots(slot, root) == Ordering::Equal {
                    top.push(slot);
                    self.stack.push(child);
                }
            }
        }
        top.len()
    }

    #[inline]
    fn less<O>(items: &O, a: usize, b: usize) -> bool
    where
        O: SlotOrdering + ?Sized,
    {
        items.compare_slots(a, b) == Ordering::Less
    }

    fn sift_up<O>(&mut self, mut pos: usize, items: &O)
    where
        O: SlotOrdering + ?Sized,
    {
        let node = self.heap[pos];
        let mut parent = pos >> 1;
        while parent > 0 && Self::less(items, node, self.heap[parent]) {
            self.heap[pos] = self.heap[parent];
            pos = parent;
            parent >>= 1;
        }
        self.heap[pos] = node;
    }

    fn sift_down<O>(&mut self, mut pos: usize, items: &O)
    where
        O: SlotOrdering + ?Sized,
    {
        let size = self.len();
        let node = self.heap[pos];
        let mut child = pos << 1;
        if child < size && Self::less(items, self.heap[child + 1], self.heap[child]) {
            child += 1;
        }
        while child <= size && Self::less(items, self.heap[child], node) {
            self.heap[pos] = self.heap[child];
            pos = child;
            child = pos << 1;
            if child < size && Self::less(items, self.heap[child + 1], self.heap[child]) {
                child += 1;
            }
        }
        self.heap[pos] = node;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    impl SlotOrdering for [Vec<u8>] {
        fn compare_slots(&self, a: usize, b: usize) -> Ordering {
            self[a].cmp(&self[b])
        }
    }

    fn terms(values: &[&str]) -> Vec<Vec<u8>> {
        values.iter().map(|v| v.as_bytes().to_vec()).collect()
    }

    fn fill(queue: &mut MergeQueue, items: &[Vec<u8>]) {
        for slot in 0..items.len() {
            queue.insert(slot, items);
        }
    }

    fn assert_heap_invariant(queue: &MergeQueue, items: &[Vec<u8>]) {
        let slots = queue.slots();
        for pos in 2..=slots.len() {
            let parent = slots[pos / 2 - 1];
            let node = slots[pos - 1];
            assert_ne!(
                items.compare_slots(node, parent),
                Ordering::Less,
                "heap invariant violated at position {pos}"
            );
        }
    }

    #[test]
    fn test_empty_queue() {
        let mut queue = MergeQueue::with_capacity(4);
        let items: Vec<Vec<u8>> = vec![];
        assert!(queue.is_empty());
        assert_eq!(queue.capacity(), 4);
        assert_eq!(queue.peek_min(), None);
        assert_eq!(queue.remove_min(items.as_slice()), None);
        assert_eq!(queue.update_min_key(items.as_slice()), None);
        let mut top = vec![7];
        assert_eq!(queue.fill_top(items.as_slice(), &mut top), 0);
        assert!(top.is_empty());
    }

    #[test]
    fn test_remove_min_yields_sorted_order() {
        let items = terms(&["delta", "alpha", "echo", "charlie", "bravo", "alpha"]);
        let mut queue = MergeQueue::with_capacity(items.len());
        fill(&mut queue, &items);
        assert_heap_invariant(&queue, &items);

        let mut drained = Vec::new();
        while let Some(slot) = queue.remove_min(items.as_slice()) {
            assert_heap_invariant(&queue, &items);
            drained.push(items[slot].clone());
        }
        let mut expected = items.clone();
        expected.sort();
        assert_eq!(drained, expected);
    }

    #[test]
    fn test_update_min_key_after_growing_root() {
        let mut items = terms(&["b", "a", "c"]);
        let mut queue = MergeQueue::with_capacity(3);
        fill(&mut queue, &items);
        assert_eq!(queue.peek_min(), Some(1));

        items[1] = b"d".to_vec();
        assert_eq!(queue.update_min_key(items.as_slice()), Some(0));
        assert_heap_invariant(&queue, &items);

        items[0] = b"z".to_vec();
        assert_eq!(queue.update_min_key(items.as_slice()), Some(2));
        assert_eq!(queue.remove_min(items.as_slice()), Some(2));
        assert_eq!(queue.remove_min(items.as_slice()), Some(1));
        assert_eq!(queue.remove_min(items.as_slice()), Some(0));
    }

    #[test]
    #[should_panic(expected = "merge queue is full (2 slots)")]
    fn test_insert_past_capacity() {
        let items = terms(&["a", "b", "c"]);
        let mut queue = MergeQueue::with_capacity(2);
        fill(&mut queue, &items);
    }

    #[test]
    fn test_clear_keeps_queue_usable() {
        let items = terms(&["b", "a"]);
        let mut queue = MergeQueue::with_capacity(2);
        fill(&mut queue, &items);
        queue.clear();
        assert!(queue.is_empty());
        fill(&mut queue, &items);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek_min(), Some(1));
    }

    #[test]
    fn test_fill_top_finds_every_tie() {
        let items = terms(&["b", "a", "c", "a", "a", "b", "a"]);
        let mut queue = MergeQueue::with_capacity(items.len());
        fill(&mut queue, &items);

        let mut top = Vec::new();
        assert_eq!(queue.fill_top(items.as_slice(), &mut top), 4);
        let mut slots = top.clone();
        slots.sort_unstable();
        assert_eq!(slots, vec![1, 3, 4, 6]);
        // Discovery does not remove anything.
        assert_eq!(queue.len(), items.len());
    }

    #[test]
    fn test_fill_top_random_multisets() {
        fastrand::seed(0x5eed_7095);
        let mut top = Vec::new();
        for _ in 0..500 {
            let count = fastrand::usize(1..40);
            let items: Vec<Vec<u8>> = (0..count)
                .map(|_| vec![fastrand::u8(b'a'..b'f')])
                .collect();
            let mut queue = MergeQueue::with_capacity(count);
            fill(&mut queue, &items);
            assert_heap_invariant(&queue, &items);

            let min = items.iter().min().unwrap();
            let ties = items.iter().filter(|item| *item == min).count();

            assert_eq!(queue.fill_top(items.as_slice(), &mut top), ties);
            let distinct: HashSet<usize> = top.iter().copied().collect();
            assert_eq!(distinct.len(), ties);
            assert!(top.iter().all(|&slot| &items[slot] == min));
            assert_eq!(top[0], queue.peek_min().unwrap());
        }
    }
}
