/// A zero-based position in the in-order sequence of a tree's values.
///
/// Every value counts, so a key holding three values spans three positions.
///
/// # Examples
///
/// ```
/// use ranked_tree::{RankedTree, Rank};
///
/// let mut tree = RankedTree::new();
/// tree.insert("a", 10);
/// tree.insert("a", 11);
/// tree.insert("b", 20);
///
/// assert_eq!(tree[Rank(2)], [20]);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Rank(pub usize);
