use compare::natural;

use super::RankedTree;
use crate::raw::RawRankedTree;

impl<K: Ord, V> RankedTree<K, V> {
    /// Creates an empty tree with room for at least `capacity` distinct keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_tree::RankedTree;
    ///
    /// let tree: RankedTree<i32, i32> = RankedTree::with_capacity(32);
    /// assert!(tree.is_empty());
    /// assert!(tree.capacity() >= 32);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(capacity) for memory allocation.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        RankedTree {
            raw: RawRankedTree::with_capacity(capacity, natural()),
        }
    }
}

impl<K, V, C> RankedTree<K, V, C> {
    /// Creates an empty tree ordered by `compare`, with room for at least `capacity`
    /// distinct keys.
    #[must_use]
    pub fn with_capacity_and_comparator(capacity: usize, compare: C) -> Self {
        RankedTree {
            raw: RawRankedTree::with_capacity(capacity, compare),
        }
    }

    /// Returns how many distinct keys the tree can hold without reallocating.
    ///
    /// Values sharing a key live with that key, so capacity is counted in keys.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }
}
