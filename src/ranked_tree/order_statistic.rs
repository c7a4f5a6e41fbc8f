use core::ops::Index;

use compare::Compare;

use super::RankedTree;
use crate::{Rank, Result};

impl<K, V, C> RankedTree<K, V, C> {
    /// Returns the values of the key covering `position` in the flattened, in-order
    /// sequence of values.
    ///
    /// The whole bag is returned, so every position inside a key's run of values
    /// selects the same slice.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`](crate::Error::OutOfRange) if `position >= self.len()`.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_tree::{Error, RankedTree};
    ///
    /// let tree = RankedTree::from([(1, 'a'), (1, 'b'), (2, 'c')]);
    /// assert_eq!(tree.select(0), Ok(&['a', 'b'][..]));
    /// assert_eq!(tree.select(1), Ok(&['a', 'b'][..]));
    /// assert_eq!(tree.select(2), Ok(&['c'][..]));
    /// assert_eq!(tree.select(3), Err(Error::OutOfRange { position: 3, len: 3 }));
    /// ```
    pub fn select(&self, position: usize) -> Result<&[V]> {
        self.select_entry(position).map(|(_, values)| values)
    }

    /// Like [`select`](RankedTree::select), but also returns the key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`](crate::Error::OutOfRange) if `position >= self.len()`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_tree::RankedTree;
    ///
    /// let tree = RankedTree::from([("b", 2), ("a", 1)]);
    /// assert_eq!(tree.select_entry(1), Ok((&"b", &[2][..])));
    /// ```
    pub fn select_entry(&self, position: usize) -> Result<(&K, &[V])> {
        self.raw.select(position)
    }
}

impl<K, V, C: Compare<K>> RankedTree<K, V, C> {
    /// Returns the position of `key`'s first value in the flattened, in-order sequence
    /// of values, or `None` if the key is not present.
    ///
    /// Equivalently, the number of values stored under keys ordered before `key`.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_tree::RankedTree;
    ///
    /// let tree = RankedTree::from([(1, 'a'), (1, 'b'), (5, 'c')]);
    /// assert_eq!(tree.rank(&1), Some(0));
    /// assert_eq!(tree.rank(&5), Some(2));
    /// assert_eq!(tree.rank(&3), None);
    /// ```
    #[must_use]
    pub fn rank(&self, key: &K) -> Option<usize> {
        self.raw.rank(key)
    }
}

/// Indexes into the tree by position, yielding the values of the covering key.
///
/// # Panics
///
/// Panics if the position is out of bounds.
///
/// # Examples
///
/// ```
/// use ranked_tree::{RankedTree, Rank};
///
/// let tree = RankedTree::from([("a", 1), ("a", 2), ("b", 3)]);
/// assert_eq!(tree[Rank(1)], [1, 2]);
/// assert_eq!(tree[Rank(2)], [3]);
/// ```
impl<K, V, C> Index<Rank> for RankedTree<K, V, C> {
    type Output = [V];

    fn index(&self, rank: Rank) -> &Self::Output {
        match self.select(rank.0) {
            Ok(values) => values,
            Err(error) => panic!("index out of bounds: {error}"),
        }
    }
}
