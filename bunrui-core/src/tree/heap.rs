//! Bounded neighbour heaps and the node priority queue.

use std::{
    cmp::Ordering,
    collections::BinaryHeap,
};

/// `rows x k` array of bounded max-heaps over `(reduced distance, index)`.
///
/// Each row keeps the `k` smallest pushes; its root is the current pruning
/// threshold and stays `+inf` until the row is full.
///
/// # Examples
/// ```
/// use bunrui_core::NeighborsHeap;
///
/// let mut heap = NeighborsHeap::new(1, 2);
/// heap.push(0, 3.0, 7);
/// heap.push(0, 1.0, 4);
/// heap.push(0, 2.0, 9);
/// assert_eq!(heap.largest(0), 2.0);
/// let (distances, indices) = heap.into_sorted();
/// assert_eq!(distances, vec![1.0, 2.0]);
/// assert_eq!(indices, vec![4, 9]);
/// ```
#[derive(Clone, Debug)]
pub struct NeighborsHeap {
    distances: Vec<f64>,
    indices: Vec<usize>,
    k: usize,
}

impl NeighborsHeap {
    /// Creates `rows` empty heaps of capacity `k`.
    #[must_use]
    pub fn new(rows: usize, k: usize) -> Self {
        Self {
            distances: vec![f64::INFINITY; rows * k],
            indices: vec![0; rows * k],
            k,
        }
    }

    /// Capacity of each row.
    #[must_use]
    #[rustfmt::skip]
    pub fn k(&self) -> usize { self.k }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.distances.len().checked_div(self.k).unwrap_or(0)
    }

    /// Largest retained distance in `row`, `+inf` while not full.
    ///
    /// # Panics
    /// Panics when `row` is out of range or `k == 0`.
    #[must_use]
    pub fn largest(&self, row: usize) -> f64 {
        self.distances[row * self.k]
    }

    /// Offers `(distance, index)` to `row`; returns whether it was kept.
    ///
    /// # Panics
    /// Panics when `row` is out of range.
    pub fn push(&mut self, row: usize, distance: f64, index: usize) -> bool {
        self.row_mut(row).push(distance, index)
    }

    /// Mutable view of a single row.
    ///
    /// # Panics
    /// Panics when `row` is out of range.
    pub fn row_mut(&mut self, row: usize) -> HeapRow<'_> {
        let span = row * self.k..(row + 1) * self.k;
        HeapRow::new(&mut self.distances[span.clone()], &mut self.indices[span])
    }

    pub(crate) fn buffers_mut(&mut self) -> (&mut [f64], &mut [usize]) {
        (&mut self.distances, &mut self.indices)
    }

    /// Sorts every row ascending by distance (ties by index) and returns the
    /// flattened buffers.
    #[must_use]
    pub fn into_sorted(self) -> (Vec<f64>, Vec<usize>) {
        let Self {
            mut distances,
            mut indices,
            k,
        } = self;
        if k == 0 {
            return (distances, indices);
        }
        let mut pairs = Vec::with_capacity(k);
        for (row_distances, row_indices) in distances.chunks_exact_mut(k).zip(indices.chunks_exact_mut(k)) {
            pairs.clear();
            pairs.extend(row_distances.iter().copied().zip(row_indices.iter().copied()));
            pairs.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            for ((distance, index), (out_distance, out_index)) in
                pairs.iter().zip(row_distances.iter_mut().zip(row_indices.iter_mut()))
            {
                *out_distance = *distance;
                *out_index = *index;
            }
        }
        (distances, indices)
    }

    /// Returns the flattened buffers in heap order.
    #[must_use]
    pub fn into_raw(self) -> (Vec<f64>, Vec<usize>) {
        (self.distances, self.indices)
    }
}

/// A single bounded max-heap borrowed from a [`NeighborsHeap`] or from a
/// caller-owned pair of slices.
#[derive(Debug)]
pub struct HeapRow<'a> {
    distances: &'a mut [f64],
    indices: &'a mut [usize],
}

impl<'a> HeapRow<'a> {
    /// Wraps two equally sized slices; `distances` should start at `+inf`.
    ///
    /// # Panics
    /// Panics when the slices differ in length.
    pub fn new(distances: &'a mut [f64], indices: &'a mut [usize]) -> Self {
        assert_eq!(distances.len(), indices.len(), "heap slices must match");
        Self { distances, indices }
    }

    /// Current pruning threshold.
    #[must_use]
    pub fn largest(&self) -> f64 {
        self.distances.first().copied().unwrap_or(f64::NEG_INFINITY)
    }

    /// Offers `(distance, index)`; returns whether it was kept.
    pub fn push(&mut self, distance: f64, index: usize) -> bool {
        let size = self.distances.len();
        if size == 0 || distance >= self.distances[0] {
            return false;
        }
        let mut slot = 0;
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let swap = if left >= size {
                break;
            } else if right >= size {
                if self.distances[left] > distance {
                    left
                } else {
                    break;
                }
            } else if self.distances[left] >= self.distances[right] {
                if distance < self.distances[left] {
                    left
                } else {
                    break;
                }
            } else if distance < self.distances[right] {
                right
            } else {
                break;
            };
            self.distances[slot] = self.distances[swap];
            self.indices[slot] = self.indices[swap];
            slot = swap;
        }
        self.distances[slot] = distance;
        self.indices[slot] = index;
        true
    }
}

/// Entry of a [`NodeHeap`].
#[derive(Clone, Copy, Debug)]
pub struct NodeHeapEntry {
    /// Priority; smaller values pop first.
    pub val: f64,
    /// First node id.
    pub i1: usize,
    /// Second node id (unused by single-tree traversals).
    pub i2: usize,
}

impl PartialEq for NodeHeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NodeHeapEntry {}

impl PartialOrd for NodeHeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeHeapEntry {
    // Reversed so the std max-heap pops the smallest value first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .val
            .total_cmp(&self.val)
            .then_with(|| other.i1.cmp(&self.i1))
            .then_with(|| other.i2.cmp(&self.i2))
    }
}

/// Min-priority queue of node (or node pair) entries.
///
/// # Examples
/// ```
/// use bunrui_core::{NodeHeap, NodeHeapEntry};
///
/// let mut heap = NodeHeap::default();
/// heap.push(NodeHeapEntry { val: 2.0, i1: 1, i2: 0 });
/// heap.push(NodeHeapEntry { val: 0.5, i1: 2, i2: 0 });
/// assert_eq!(heap.pop().map(|entry| entry.i1), Some(2));
/// assert_eq!(heap.len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct NodeHeap {
    entries: BinaryHeap<NodeHeapEntry>,
}

impl NodeHeap {
    /// Creates an empty heap with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: BinaryHeap::with_capacity(capacity),
        }
    }

    /// Adds an entry.
    pub fn push(&mut self, entry: NodeHeapEntry) {
        self.entries.push(entry);
    }

    /// Removes the entry with the smallest value.
    pub fn pop(&mut self) -> Option<NodeHeapEntry> {
        self.entries.pop()
    }

    /// Entry that would be popped next.
    #[must_use]
    pub fn peek(&self) -> Option<&NodeHeapEntry> {
        self.entries.peek()
    }

    /// Number of queued entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the heap is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
