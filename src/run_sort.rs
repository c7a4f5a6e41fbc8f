//! A natural-run merge sort staged in a [`RankedTree`].
//!
//! Elements are consumed one at a time and grouped into maximal monotone runs as they
//! arrive. Descending runs are built back to front, so every stored run is ascending.
//! Finished runs are filed in a `RankedTree` keyed by length; sorting merges runs of
//! neighbouring lengths pairwise until a single run is left.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use compare::{Compare, Natural, natural};
use log::{debug, trace};

use crate::RankedTree;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Direction {
    Ascending,
    Descending,
}

/// Sorts a stream of elements by merging the runs already present in it.
///
/// Input that is mostly ordered, in either direction, is sorted in close to linear
/// time. The sort is not stable.
///
/// # Examples
///
/// ```
/// use ranked_tree::RunSorter;
///
/// let mut sorter = RunSorter::new();
/// sorter.extend([1, 4, 9, 7, 3, 2, 5, 8]);
/// assert_eq!(sorter.len(), 8);
/// assert_eq!(sorter.sort(), [1, 2, 3, 4, 5, 7, 8, 9]);
/// ```
pub struct RunSorter<T, C = Natural<T>> {
    compare: C,
    runs: RankedTree<usize, VecDeque<T>>,
    run: VecDeque<T>,
    direction: Direction,
    len: usize,
}

impl<T: Ord> RunSorter<T> {
    /// Makes a new, empty `RunSorter` ordering elements by `T`'s [`Ord`] implementation.
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparator(natural())
    }
}

impl<T: Ord> Default for RunSorter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C: Compare<T>> RunSorter<T, C> {
    /// Makes a new, empty `RunSorter` ordering elements by `compare`.
    ///
    /// # Examples
    ///
    /// ```
    /// use compare::{Compare, natural};
    /// use ranked_tree::RunSorter;
    ///
    /// let mut sorter = RunSorter::with_comparator(natural().rev());
    /// sorter.extend([3, 9, 1]);
    /// assert_eq!(sorter.sort(), [9, 3, 1]);
    /// ```
    #[must_use]
    pub fn with_comparator(compare: C) -> Self {
        RunSorter {
            compare,
            runs: RankedTree::new(),
            run: VecDeque::new(),
            direction: Direction::Ascending,
            len: 0,
        }
    }

    /// Number of elements consumed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no element has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Consumes one element, extending the open run or closing it and opening the next.
    pub fn push(&mut self, element: T) {
        self.len += 1;

        match self.direction {
            _ if self.run.is_empty() => {
                self.direction = Direction::Ascending;
                self.run.push_back(element);
            }
            Direction::Ascending => {
                let previous = self.run.back().expect("`RunSorter::push()` - open run is empty!");
                if self.compare.compares_lt(&element, previous) {
                    self.close_run();
                    self.direction = Direction::Descending;
                    self.run.push_back(element);
                } else {
                    self.run.push_back(element);
                }
            }
            Direction::Descending => {
                let previous = self.run.front().expect("`RunSorter::push()` - open run is empty!");
                if self.compare.compares_gt(&element, previous) {
                    self.close_run();
                    self.direction = Direction::Ascending;
                    self.run.push_back(element);
                } else {
                    self.run.push_front(element);
                }
            }
        }
    }

    /// Merges every run and returns the consumed elements in ascending order.
    ///
    /// # Complexity
    ///
    /// O(n log r) comparisons for r natural runs.
    #[must_use]
    pub fn sort(mut self) -> Vec<T> {
        self.close_run();
        let RunSorter { compare, mut runs, .. } = self;

        while runs.len() > 1 {
            trace!("merging {} runs", runs.len());

            let mut merged = RankedTree::new();
            let mut pending = runs.into_iter().map(|(_, run)| run);
            while let Some(a) = pending.next() {
                let run = match pending.next() {
                    Some(b) => merge(&compare, a, b),
                    None => a,
                };
                merged.insert(run.len(), run);
            }
            runs = merged;
        }

        runs.into_iter().next().map(|(_, run)| Vec::from(run)).unwrap_or_default()
    }

    fn close_run(&mut self) {
        if self.run.is_empty() {
            return;
        }

        let run = core::mem::take(&mut self.run);
        debug!("closed {:?} run of {} elements", self.direction, run.len());
        self.runs.insert(run.len(), run);
    }
}

impl<T, C: Compare<T>> Extend<T> for RunSorter<T, C> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for element in iter {
            self.push(element);
        }
    }
}

/// Merges two ascending runs, taking from `a` unless its head compares greater.
fn merge<T, C: Compare<T>>(compare: &C, a: VecDeque<T>, b: VecDeque<T>) -> VecDeque<T> {
    let mut merged = VecDeque::with_capacity(a.len() + b.len());
    let mut a = a.into_iter().peekable();
    let mut b = b.into_iter().peekable();

    while let (Some(x), Some(y)) = (a.peek(), b.peek()) {
        let next = if compare.compares_gt(x, y) { b.next() } else { a.next() };
        merged.extend(next);
    }
    merged.extend(a);
    merged.extend(b);
    merged
}

/// Sorts `iter` with a [`RunSorter`].
///
/// # Examples
///
/// ```
/// assert_eq!(ranked_tree::run_sort([5, 1, 4, 1, 3]), [1, 1, 3, 4, 5]);
/// ```
#[must_use]
pub fn run_sort<T: Ord>(iter: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut sorter = RunSorter::new();
    sorter.extend(iter);
    sorter.sort()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::vec;
    use proptest::prelude::*;

    fn runs_of<T: Clone, C: Compare<T>>(sorter: &RunSorter<T, C>) -> Vec<Vec<T>> {
        sorter.runs.iter().map(|(_, run)| run.iter().cloned().collect()).collect()
    }

    #[test]
    fn descending_runs_are_stored_ascending() {
        let mut sorter = RunSorter::new();
        sorter.extend([1, 2, 3, 9, 8, 8, 7]);
        sorter.close_run();

        assert_eq!(runs_of(&sorter), [vec![7, 8, 8], vec![1, 2, 3, 9]]);
    }

    #[test]
    fn runs_are_filed_by_length() {
        let mut sorter = RunSorter::new();
        sorter.extend([5, 6, 7, 8, 1, 9, 3]);
        sorter.close_run();

        let filed: Vec<_> = sorter.runs.iter().map(|(&len, run)| (len, run.front().copied())).collect();
        assert_eq!(filed, [(1, Some(1)), (1, Some(9)), (1, Some(3)), (4, Some(5))]);
        assert_eq!(sorter.len(), 7);
    }

    #[test]
    fn merge_prefers_first_run_on_ties() {
        let a: VecDeque<(i32, char)> = [(1, 'a'), (2, 'a')].into();
        let b: VecDeque<(i32, char)> = [(1, 'b'), (3, 'b')].into();
        let by_number = |x: &(i32, char), y: &(i32, char)| x.0.cmp(&y.0);

        let merged: Vec<_> = merge(&by_number, a, b).into();
        assert_eq!(merged, [(1, 'a'), (1, 'b'), (2, 'a'), (3, 'b')]);
    }

    #[test]
    fn empty_and_single_inputs() {
        assert_eq!(run_sort(Vec::<u8>::new()), Vec::<u8>::new());
        assert_eq!(run_sort([42]), [42]);
        assert!(RunSorter::<u8>::default().is_empty());
    }

    proptest! {
        #[test]
        fn sorts_like_slice_sort(mut input in prop::collection::vec(-50i32..50, 0..300)) {
            let sorted = run_sort(input.iter().copied());
            input.sort_unstable();
            prop_assert_eq!(sorted, input);
        }
    }
}
