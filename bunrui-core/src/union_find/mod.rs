//! Disjoint-set structures used to build and read the cluster hierarchy.
//!
//! [`UnionFind`] turns a sorted edge list into a dendrogram: every union
//! allocates a fresh label `>= n` that becomes the root of both inputs, so
//! the parent array doubles as the merge tree. [`TreeUnionFind`] resolves
//! the final flat labels, tracking which roots still stand for a selected
//! cluster.

use thiserror::Error;

use crate::error::define_error_codes;

/// Errors raised by [`UnionFind`].
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum UnionFindError {
    /// An element id was outside the structure.
    #[error("element {id} is out of range for {capacity} slots")]
    OutOfRange {
        /// The rejected id.
        id: usize,
        /// Number of slots in the structure.
        capacity: usize,
    },
    /// Every merge label has already been used.
    #[error("all {capacity} slots are already allocated")]
    Exhausted {
        /// Number of slots in the structure.
        capacity: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`UnionFindError`] variants.
    enum UnionFindErrorCode for UnionFindError {
        /// An element id was outside the structure.
        OutOfRange => OutOfRange { .. } => "UNION_FIND_OUT_OF_RANGE",
        /// Every merge label has already been used.
        Exhausted => Exhausted { .. } => "UNION_FIND_EXHAUSTED",
    }
}

/// Dendrogram-building union-find over `n` leaves and `n - 1` merge slots.
///
/// Roots are fixed points (`parent[x] == x`).
///
/// # Examples
/// ```
/// use bunrui_core::UnionFind;
///
/// let mut forest = UnionFind::new(5);
/// let merged = forest.union(3, 4)?;
/// assert_eq!(merged, 5);
/// assert_eq!(forest.parents(), &[0, 1, 2, 5, 5, 5, 6, 7, 8]);
/// assert_eq!(forest.size_of(4), 2);
/// # Ok::<(), bunrui_core::UnionFindError>(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
    next_label: usize,
}

impl UnionFind {
    /// Creates a structure for `n` leaves.
    #[must_use]
    pub fn new(n: usize) -> Self {
        let capacity = (2 * n).saturating_sub(1);
        let size = (0..capacity).map(|id| usize::from(id < n)).collect();
        Self {
            parent: (0..capacity).collect(),
            size,
            next_label: n,
        }
    }

    /// Total number of slots (`2n - 1`).
    #[must_use]
    #[rustfmt::skip]
    pub fn capacity(&self) -> usize { self.parent.len() }

    /// Label the next union will allocate.
    #[must_use]
    #[rustfmt::skip]
    pub fn next_label(&self) -> usize { self.next_label }

    /// Raw parent array.
    #[must_use]
    #[rustfmt::skip]
    pub fn parents(&self) -> &[usize] { &self.parent }

    /// Merges the sets containing `a` and `b` under a freshly allocated
    /// label, returning that label.
    ///
    /// Merging two members of the same set still allocates a label whose
    /// only child is the shared root.
    ///
    /// # Errors
    /// Returns [`UnionFindError::OutOfRange`] for ids outside the structure
    /// and [`UnionFindError::Exhausted`] when every merge slot is used. The
    /// structure is left unchanged on error.
    pub fn union(&mut self, a: usize, b: usize) -> Result<usize, UnionFindError> {
        self.check(a)?;
        self.check(b)?;
        let label = self.next_label;
        if label >= self.capacity() {
            return Err(UnionFindError::Exhausted {
                capacity: self.capacity(),
            });
        }
        let root_a = self.fast_find(a);
        let root_b = self.fast_find(b);
        self.parent[root_a] = label;
        self.parent[root_b] = label;
        self.size[label] = if root_a == root_b {
            self.size[root_a]
        } else {
            self.size[root_a] + self.size[root_b]
        };
        self.next_label += 1;
        Ok(label)
    }

    /// Finds the root of `x` and compresses the path behind it.
    ///
    /// # Panics
    /// Panics when `x` is out of range.
    pub fn fast_find(&mut self, x: usize) -> usize {
        let root = self.find(x);
        let mut node = x;
        while self.parent[node] != node {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Finds the root of `x` without modifying the structure.
    ///
    /// # Panics
    /// Panics when `x` is out of range.
    #[must_use]
    pub fn find(&self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        root
    }

    /// Size of the set containing `x`.
    ///
    /// # Panics
    /// Panics when `x` is out of range.
    #[must_use]
    pub fn size_of(&self, x: usize) -> usize {
        self.size[self.find(x)]
    }

    fn check(&self, id: usize) -> Result<(), UnionFindError> {
        if id < self.capacity() {
            Ok(())
        } else {
            Err(UnionFindError::OutOfRange {
                id,
                capacity: self.capacity(),
            })
        }
    }
}

/// Union-find that remembers which roots still represent a selected
/// cluster.
///
/// `union(parent, child)` always keeps the parent's root as representative,
/// so after all non-selected rows have been merged a point's root is the
/// nearest ancestor that is still its own component.
#[derive(Clone, Debug)]
pub struct TreeUnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
    is_component: Vec<bool>,
}

impl TreeUnionFind {
    /// Creates `size` singleton components.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
            is_component: vec![true; size],
        }
    }

    /// Number of elements.
    #[must_use]
    #[rustfmt::skip]
    pub fn len(&self) -> usize { self.parent.len() }

    /// Whether the structure holds no elements.
    #[must_use]
    #[rustfmt::skip]
    pub fn is_empty(&self) -> bool { self.parent.is_empty() }

    /// Attaches the set of `child` beneath the set of `parent_cluster`.
    ///
    /// # Panics
    /// Panics when either id is out of range.
    pub fn union(&mut self, parent_cluster: usize, child: usize) {
        let parent_root = self.find(parent_cluster);
        let child_root = self.find(child);
        if parent_root == child_root {
            return;
        }
        self.parent[child_root] = parent_root;
        if self.rank[parent_root] <= self.rank[child_root] {
            self.rank[parent_root] = self.rank[child_root].saturating_add(1);
        }
        self.is_component[child_root] = false;
    }

    /// Finds the representative of `x`, compressing the path.
    ///
    /// # Panics
    /// Panics when `x` is out of range.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Whether `x` is still the representative of its own component.
    ///
    /// # Panics
    /// Panics when `x` is out of range.
    #[must_use]
    pub fn is_component(&self, x: usize) -> bool {
        self.is_component[x]
    }

    /// Ids whose component flag is still set.
    #[must_use]
    pub fn components(&self) -> Vec<usize> {
        self.is_component
            .iter()
            .enumerate()
            .filter_map(|(id, &flag)| flag.then_some(id))
            .collect()
    }
}

#[cfg(test)]
mod tests;
