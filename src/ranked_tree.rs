use core::fmt;
use core::iter::FusedIterator;
use core::slice;

use compare::{Compare, Natural, natural};

use crate::raw::{InOrder, RawRankedTree, Values, ValuesIntoIter};

mod capacity;
mod order_statistic;

pub use crate::Rank;

/// An ordered multi-map based on a [red-black tree], with order-statistic queries.
///
/// Each key maps to a *bag* of values kept in insertion order. Inserting under a key
/// that is already present appends to its bag instead of replacing anything, and
/// deleting removes a single `(key, value)` pair.
///
/// Positions count **values**, not keys: a key holding three values occupies three
/// consecutive positions. [`rank`](RankedTree::rank) returns the position of a key's
/// first value and [`select`](RankedTree::select) returns the bag covering a position,
/// both in O(log n).
///
/// Keys are ordered by a comparator fixed at construction. [`RankedTree::new`] uses the
/// key's [`Ord`] implementation; [`RankedTree::with_comparator`] accepts any
/// [`compare::Compare`], including closures and reversed orderings.
///
/// # Examples
///
/// ```
/// use ranked_tree::RankedTree;
///
/// let mut tree = RankedTree::new();
///
/// assert!(tree.insert(1, "jeff"));
/// assert!(!tree.insert(1, "bob"));
/// assert!(!tree.insert(1, "barry"));
/// assert_eq!(tree.find(&1), Some(&["jeff", "bob", "barry"][..]));
///
/// assert!(tree.delete(&1, &"bob"));
/// tree.insert(2, "bob");
/// tree.insert(3, "garry");
///
/// assert_eq!(tree.len(), 4);
/// assert_eq!(tree.rank(&2), Some(2));
/// assert_eq!(tree.select(3), Ok(&["garry"][..]));
/// ```
///
/// A descending tree from the same implementation:
///
/// ```
/// use compare::{Compare, natural};
/// use ranked_tree::RankedTree;
///
/// let mut scoreboard = RankedTree::with_comparator(natural().rev());
/// scoreboard.insert(120, "ann");
/// scoreboard.insert(340, "bea");
/// scoreboard.insert(200, "cal");
///
/// let leaders: Vec<_> = scoreboard.iter().map(|(_, name)| *name).collect();
/// assert_eq!(leaders, ["bea", "cal", "ann"]);
/// ```
///
/// [red-black tree]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree
pub struct RankedTree<K, V, C = Natural<K>> {
    raw: RawRankedTree<K, V, C>,
}

/// An iterator over the `(key, value)` pairs of a `RankedTree`.
///
/// One pair is produced per value, so a key holding several values is repeated.
///
/// This `struct` is created by the [`iter`] method on [`RankedTree`].
///
/// [`iter`]: RankedTree::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V> {
    nodes: InOrder<'a, K, V>,
    front: Option<(&'a K, slice::Iter<'a, V>)>,
    remaining: usize,
}

/// An iterator over the distinct keys of a `RankedTree`.
///
/// This `struct` is created by the [`keys`] method on [`RankedTree`].
///
/// [`keys`]: RankedTree::keys
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Keys<'a, K, V> {
    nodes: InOrder<'a, K, V>,
}

/// An owning iterator over the `(key, value)` pairs of a `RankedTree`.
///
/// This `struct` is created by the [`into_iter`] method on [`RankedTree`]
/// (provided by the [`IntoIterator`] trait).
///
/// [`into_iter`]: IntoIterator::into_iter
pub struct IntoIter<K, V> {
    groups: alloc::vec::IntoIter<(K, Values<V>)>,
    front: Option<(K, ValuesIntoIter<V>)>,
    remaining: usize,
}

impl<K: Ord, V> RankedTree<K, V> {
    /// Makes a new, empty `RankedTree` ordered by `K`'s [`Ord`] implementation.
    ///
    /// Does not allocate anything on its own.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_tree::RankedTree;
    ///
    /// let mut tree = RankedTree::new();
    /// tree.insert(1, "a");
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparator(natural())
    }
}

impl<K, V, C> RankedTree<K, V, C> {
    /// Makes a new, empty `RankedTree` ordered by `compare`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_tree::RankedTree;
    ///
    /// // Order strings by length only.
    /// let mut tree = RankedTree::with_comparator(|a: &&str, b: &&str| a.len().cmp(&b.len()));
    /// tree.insert("ccc", 3);
    /// tree.insert("a", 1);
    /// tree.insert("bb", 2);
    ///
    /// let keys: Vec<_> = tree.keys().copied().collect();
    /// assert_eq!(keys, ["a", "bb", "ccc"]);
    /// ```
    #[must_use]
    pub const fn with_comparator(compare: C) -> Self {
        RankedTree {
            raw: RawRankedTree::new(compare),
        }
    }

    /// Returns the comparator ordering this tree's keys.
    #[must_use]
    pub fn comparator(&self) -> &C {
        self.raw.comparator()
    }

    /// Returns the number of values in the tree, counting every value of every key.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_tree::RankedTree;
    ///
    /// let mut tree = RankedTree::new();
    /// tree.insert(1, 'a');
    /// tree.insert(1, 'b');
    /// assert_eq!(tree.len(), 2);
    /// ```
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the tree contains no values.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Clears the tree, removing all keys and values.
    ///
    /// # Complexity
    ///
    /// O(n)
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Returns the smallest key and its values.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_tree::RankedTree;
    ///
    /// let tree = RankedTree::from([(2, 'b'), (1, 'a'), (1, 'z')]);
    /// assert_eq!(tree.first(), Some((&1, &['a', 'z'][..])));
    /// ```
    #[must_use]
    pub fn first(&self) -> Option<(&K, &[V])> {
        self.raw.first().map(|node| (node.key(), node.values()))
    }

    /// Returns the largest key and its values.
    #[must_use]
    pub fn last(&self) -> Option<(&K, &[V])> {
        self.raw.last().map(|node| (node.key(), node.values()))
    }

    /// Gets an iterator over `(key, value)` pairs in ascending key order, values of one
    /// key in insertion order.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_tree::RankedTree;
    ///
    /// let tree = RankedTree::from([(3, 'c'), (1, 'a'), (1, 'b')]);
    /// let pairs: Vec<_> = tree.iter().collect();
    /// assert_eq!(pairs, [(&1, &'a'), (&1, &'b'), (&3, &'c')]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            nodes: self.raw.in_order(),
            front: None,
            remaining: self.raw.len(),
        }
    }

    /// Gets an iterator over the distinct keys, in ascending order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            nodes: self.raw.in_order(),
        }
    }
}

impl<K, V, C: Compare<K>> RankedTree<K, V, C> {
    /// Adds `value` under `key`.
    ///
    /// Returns `true` if `key` was not present and a new entry was created, `false` if
    /// the value was appended to an existing key's values.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Panics
    ///
    /// Panics if the tree already holds the maximum number of distinct keys.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.raw.insert(key, value)
    }

    /// Returns every value stored under `key` in insertion order, or `None` if the key
    /// is not present.
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
    /// let tree = RankedTree::from([(1, "a"), (1, "b")]);
    /// assert_eq!(tree.find(&1), Some(&["a", "b"][..]));
    /// assert_eq!(tree.find(&2), None);
    /// ```
    #[must_use]
    pub fn find(&self, key: &K) -> Option<&[V]> {
        self.raw.find(key)
    }

    /// Returns `true` if at least one value is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.raw.find(key).is_some()
    }

    /// Removes one occurrence of `value` from under `key`.
    ///
    /// Returns `false`, leaving the tree unchanged, if `key` is absent or `value` is not
    /// among its values. The key itself disappears with its last value.
    ///
    /// # Complexity
    ///
    /// O(log n + m) where m is the number of values under `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_tree::RankedTree;
    ///
    /// let mut tree = RankedTree::from([(1, "a"), (1, "b")]);
    /// assert!(tree.delete(&1, &"a"));
    /// assert!(!tree.delete(&1, &"a"));
    /// assert!(tree.delete(&1, &"b"));
    /// assert!(!tree.contains_key(&1));
    /// ```
    pub fn delete(&mut self, key: &K, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.raw.delete(key, value)
    }
}

impl<K: Clone, V: Clone, C: Clone> Clone for RankedTree<K, V, C> {
    fn clone(&self) -> Self {
        RankedTree { raw: self.raw.clone() }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for RankedTree<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<K: Ord, V> Default for RankedTree<K, V> {
    /// Creates an empty `RankedTree`.
    fn default() -> RankedTree<K, V> {
        RankedTree::new()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for RankedTree<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> RankedTree<K, V> {
        let mut tree = RankedTree::new();
        tree.extend(iter);
        tree
    }
}

impl<K, V, C: Compare<K>> Extend<(K, V)> for RankedTree<K, V, C> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Ord, V, const N: usize> From<[(K, V); N]> for RankedTree<K, V> {
    /// Builds a tree from pairs in array order, so values sharing a key keep their
    /// array order.
    ///
    /// ```
    /// use ranked_tree::RankedTree;
    ///
    /// let tree = RankedTree::from([(2, 'x'), (1, 'y'), (2, 'z')]);
    /// assert_eq!(tree.find(&2), Some(&['x', 'z'][..]));
    /// ```
    fn from(arr: [(K, V); N]) -> Self {
        arr.into_iter().collect()
    }
}

impl<'a, K, V, C> IntoIterator for &'a RankedTree<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K: Clone, V, C> IntoIterator for RankedTree<K, V, C> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    /// Gets an owning iterator over `(key, value)` pairs in ascending key order.
    ///
    /// ```
    /// use ranked_tree::RankedTree;
    ///
    /// let tree = RankedTree::from([(2, 'b'), (1, 'a'), (2, 'c')]);
    /// let pairs: Vec<_> = tree.into_iter().collect();
    /// assert_eq!(pairs, [(1, 'a'), (2, 'b'), (2, 'c')]);
    /// ```
    fn into_iter(mut self) -> IntoIter<K, V> {
        let remaining = self.raw.len();
        IntoIter {
            groups: self.raw.drain_to_vec().into_iter(),
            front: None,
            remaining,
        }
    }
}

impl<'a, K: 'a, V: 'a> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((key, values)) = &mut self.front
                && let Some(value) = values.next()
            {
                self.remaining -= 1;
                return Some((*key, value));
            }

            let node = self.nodes.next()?;
            self.front = Some((node.key(), node.values().iter()));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            nodes: self.nodes.clone(),
            front: self.front.clone(),
            remaining: self.remaining,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").field("remaining", &self.remaining).finish()
    }
}

impl<'a, K: 'a, V: 'a> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.nodes.next().map(|node| node.key())
    }
}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Keys {
            nodes: self.nodes.clone(),
        }
    }
}

impl<K: Clone, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        loop {
            if let Some((key, values)) = &mut self.front
                && let Some(value) = values.next()
            {
                self.remaining -= 1;
                return Some((key.clone(), value));
            }

            let (key, values) = self.groups.next()?;
            self.front = Some((key, values.into_iter()));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Clone, V> ExactSizeIterator for IntoIter<K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K: Clone, V> FusedIterator for IntoIter<K, V> {}

impl<K: fmt::Debug, V> fmt::Debug for IntoIter<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntoIter").field("remaining", &self.remaining).finish()
    }
}
