use alloc::vec::Vec;
use core::cmp::Ordering;

use compare::Compare;
use log::{debug, trace};

use super::arena::Arena;
use super::handle::Handle;
use super::node::{Color, Node, Side, Values};
use crate::error::{Error, Result};

/// The red-black order statistic tree backing `RankedTree`.
///
/// Every node holds all values stored under its key, and caches the number of
/// values in its subtree so that rank and select run in O(log n).
#[derive(Clone)]
pub(crate) struct RawRankedTree<K, V, C> {
    /// Arena storing all tree nodes.
    nodes: Arena<Node<K, V>>,
    /// Handle to the root node, if the tree is non-empty.
    root: Option<Handle>,
    /// Total number of values (not keys) in the tree.
    len: usize,
    /// Key ordering, fixed for the lifetime of the tree.
    compare: C,
    /// Deletion repair steps taken so far, by classic case number.
    #[cfg(test)]
    removal_cases: Vec<u8>,
}

/// The relatives of a node carrying a black-height deficit.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Deficit {
    parent: Handle,
    sibling: Handle,
    /// Side of `parent` the deficient node hangs from.
    side: Side,
}

/// One step of deletion repair, named for the shape it handles.
///
/// The classic red-parent, black-sibling, black-nephews case has no state of its
/// own: `BlackSiblingBlackNephews` moves the deficit onto the red parent, and the
/// next step settles it by painting the parent black.
#[derive(Clone, Copy, Debug)]
pub(crate) enum RemovalCase {
    /// Case 1: the deficit reached the root or a red node; painting it black ends the repair.
    Settle,
    /// Case 2: the sibling is red. Rotating it above the parent yields a black sibling.
    RedSibling(Deficit),
    /// Case 3: sibling and nephews are black. Reddening the sibling moves the deficit up.
    BlackSiblingBlackNephews(Deficit),
    /// Case 5: only the near nephew is red. Rotating the sibling makes the far nephew red.
    NearNephewRed(Deficit),
    /// Case 6: the far nephew is red. One rotation at the parent absorbs the deficit.
    FarNephewRed(Deficit),
}

impl<K, V, C> RawRankedTree<K, V, C> {
    /// Creates a new, empty tree ordered by `compare`.
    pub(crate) const fn new(compare: C) -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
            len: 0,
            compare,
            #[cfg(test)]
            removal_cases: Vec::new(),
        }
    }

    /// Creates a new tree with room for `capacity` keys before reallocating.
    pub(crate) fn with_capacity(capacity: usize, compare: C) -> Self {
        Self {
            nodes: Arena::with_capacity(capacity),
            ..Self::new(compare)
        }
    }

    /// Returns the number of values in the tree.
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of keys the node arena can hold without reallocating.
    pub(crate) fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    pub(crate) fn comparator(&self) -> &C {
        &self.compare
    }

    /// Clears all nodes from the tree.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.len = 0;
    }

    /// Walks the nodes in ascending key order.
    pub(crate) fn in_order(&self) -> InOrder<'_, K, V> {
        InOrder {
            nodes: &self.nodes,
            next: self.root.map(|root| extreme(&self.nodes, root, Side::Left)),
        }
    }

    /// Returns the node with the smallest key.
    pub(crate) fn first(&self) -> Option<&Node<K, V>> {
        self.root.map(|root| self.nodes.get(extreme(&self.nodes, root, Side::Left)))
    }

    /// Returns the node with the largest key.
    pub(crate) fn last(&self) -> Option<&Node<K, V>> {
        self.root.map(|root| self.nodes.get(extreme(&self.nodes, root, Side::Right)))
    }

    /// Removes every node, returning keys and value bags in ascending key order.
    /// This is O(n) as it skips rebalancing entirely.
    pub(crate) fn drain_to_vec(&mut self) -> Vec<(K, Values<V>)> {
        let order: Vec<Handle> = {
            let mut order = Vec::with_capacity(self.nodes.len());
            let mut current = self.root.map(|root| extreme(&self.nodes, root, Side::Left));
            while let Some(handle) = current {
                order.push(handle);
                current = successor(&self.nodes, handle);
            }
            order
        };

        let drained = order.into_iter().map(|handle| self.nodes.take(handle).into_parts()).collect();
        self.clear();
        drained
    }

    /// Returns the `(key, values)` of the node whose block of values contains `position`,
    /// counting values in ascending key order.
    pub(crate) fn select(&self, position: usize) -> Result<(&K, &[V])> {
        if position >= self.len {
            return Err(Error::OutOfRange {
                position,
                len: self.len,
            });
        }

        let mut current = self.root;
        let mut remaining = position;

        while let Some(handle) = current {
            let node = self.nodes.get(handle);
            let left = self.size_of(node.left());
            if remaining < left {
                current = node.left();
                continue;
            }

            remaining -= left;
            if remaining < node.values().len() {
                return Ok((node.key(), node.values()));
            }
            remaining -= node.values().len();
            current = node.right();
        }

        unreachable!(
            "`RawRankedTree::select()` - size invariant violated, position {position} not found among {} values",
            self.len
        )
    }

    #[inline]
    fn size_of(&self, node: Option<Handle>) -> usize {
        node.map_or(0, |handle| self.nodes.get(handle).size())
    }

    /// Absent children count as black leaves.
    #[inline]
    fn color_of(&self, node: Option<Handle>) -> Color {
        node.map_or(Color::Black, |handle| self.nodes.get(handle).color())
    }

    #[inline]
    fn paint(&mut self, node: Handle, color: Color) {
        self.nodes.get_mut(node).set_color(color);
    }

    /// Puts `new` where `old` hung from `parent`, or at the root when there is no parent.
    fn replace_child(&mut self, parent: Option<Handle>, old: Handle, new: Option<Handle>) {
        match parent {
            Some(parent) => {
                let parent_node = self.nodes.get_mut(parent);
                let side = parent_node.side_of(old);
                parent_node.set_child(side, new);
            }
            None => self.root = new,
        }

        if let Some(new) = new {
            self.nodes.get_mut(new).set_parent(parent);
        }
    }

    /// Rotates `node` down toward `side`. Its child on the other side (the pivot) takes
    /// its place, and the pivot's `side` child moves across to `node`.
    ///
    /// Only the two nodes that swap places change size, and both new sizes follow
    /// from their old sizes and the size of the subtree that changes hands.
    fn rotate(&mut self, node: Handle, side: Side) {
        let pivot = self
            .nodes
            .get(node)
            .child(side.opposite())
            .expect("`RawRankedTree::rotate()` - rotating a node without a pivot!");
        let inner = self.nodes.get(pivot).child(side);
        let parent = self.nodes.get(node).parent();

        let node_size = self.nodes.get(node).size();
        let pivot_size = self.nodes.get(pivot).size();
        let inner_size = self.size_of(inner);

        trace!("rotating {node:?} {side:?} around pivot {pivot:?}");

        self.nodes.get_mut(node).set_child(side.opposite(), inner);
        if let Some(inner) = inner {
            self.nodes.get_mut(inner).set_parent(Some(node));
        }

        self.replace_child(parent, node, Some(pivot));

        let pivot_node = self.nodes.get_mut(pivot);
        pivot_node.set_child(side, Some(node));
        pivot_node.set_size(node_size);

        let rotated = self.nodes.get_mut(node);
        rotated.set_parent(Some(pivot));
        rotated.set_size(node_size - pivot_size + inner_size);
    }
}

impl<K, V, C: Compare<K>> RawRankedTree<K, V, C> {
    /// Searches for the node holding `key`.
    fn find_node(&self, key: &K) -> Option<Handle> {
        let mut current = self.root;

        while let Some(handle) = current {
            let node = self.nodes.get(handle);
            current = match self.compare.compare(key, node.key()) {
                Ordering::Less => node.left(),
                Ordering::Greater => node.right(),
                Ordering::Equal => return Some(handle),
            };
        }

        None
    }

    /// Returns every value stored under `key`, in insertion order.
    pub(crate) fn find(&self, key: &K) -> Option<&[V]> {
        self.find_node(key).map(|handle| self.nodes.get(handle).values())
    }

    /// Returns the number of values ordered strictly before the first value of `key`.
    pub(crate) fn rank(&self, key: &K) -> Option<usize> {
        let mut node = self.find_node(key)?;
        let mut rank = self.size_of(self.nodes.get(node).left());

        while let Some(parent) = self.nodes.get(node).parent() {
            let parent_node = self.nodes.get(parent);
            if parent_node.right() == Some(node) {
                rank += self.size_of(parent_node.left()) + parent_node.values().len();
            }
            node = parent;
        }

        Some(rank)
    }

    /// Adds `value` under `key`. Returns `true` if `key` was not present before.
    pub(crate) fn insert(&mut self, key: K, value: V) -> bool {
        let Some(mut current) = self.root else {
            let mut root = Node::new(key, value);
            root.set_color(Color::Black);
            let root = self.nodes.alloc(root);
            debug!("created root node {root:?}");
            self.root = Some(root);
            self.len = 1;
            return true;
        };

        self.len += 1;

        // Every node on the search path gains a value, wherever it ends up.
        let (parent, side) = loop {
            let node = self.nodes.get_mut(current);
            node.grow(1);

            let side = match self.compare.compare(&key, node.key()) {
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
                Ordering::Equal => {
                    node.push_value(value);
                    return false;
                }
            };

            match node.child(side) {
                Some(child) => current = child,
                None => break (current, side),
            }
        };

        let mut node = Node::new(key, value);
        node.set_parent(Some(parent));
        let node = self.nodes.alloc(node);
        self.nodes.get_mut(parent).set_child(side, Some(node));
        debug!("created node {node:?} under {parent:?}");

        self.insert_repair(node);
        true
    }

    /// Restores the red-black invariants after `node` was attached as a red leaf.
    fn insert_repair(&mut self, mut node: Handle) {
        while let Some(parent) = self.nodes.get(node).parent()
            && self.nodes.get(parent).is_red()
        {
            // A red parent is never the root.
            let Some(grandparent) = self.nodes.get(parent).parent() else {
                break;
            };
            let side = self.nodes.get(grandparent).side_of(parent);
            let uncle = self.nodes.get(grandparent).child(side.opposite());

            if let Some(uncle) = uncle
                && self.nodes.get(uncle).is_red()
            {
                trace!("insert repair at {node:?}: red uncle, pushing red up to {grandparent:?}");
                self.paint(parent, Color::Black);
                self.paint(uncle, Color::Black);
                self.paint(grandparent, Color::Red);
                node = grandparent;
                continue;
            }

            let mut top = parent;
            if self.nodes.get(parent).side_of(node) != side {
                trace!("insert repair at {node:?}: inner grandchild, rotating {parent:?} {side:?}");
                self.rotate(parent, side);
                top = node;
                node = parent;
            }

            trace!("insert repair at {node:?}: rotating {grandparent:?} {:?}", side.opposite());
            self.paint(top, Color::Black);
            self.paint(grandparent, Color::Red);
            self.rotate(grandparent, side.opposite());
        }

        if let Some(root) = self.root {
            self.paint(root, Color::Black);
        }
    }

    /// Removes one occurrence of `value` from under `key`. Returns `false`, leaving the
    /// tree untouched, when the pair is not present.
    pub(crate) fn delete(&mut self, key: &K, value: &V) -> bool
    where
        V: PartialEq,
    {
        let Some(node) = self.find_node(key) else {
            return false;
        };
        if !self.nodes.get(node).values().contains(value) {
            return false;
        }

        // The node and all of its ancestors lose one value.
        let mut current = Some(node);
        while let Some(handle) = current {
            let ancestor = self.nodes.get_mut(handle);
            ancestor.shrink(1);
            current = ancestor.parent();
        }
        self.len -= 1;

        let target = self.nodes.get_mut(node);
        let removed = target.remove_value(value);
        debug_assert!(removed.is_some(), "`RawRankedTree::delete()` - value vanished during delete!");

        if target.values().is_empty() {
            self.remove_node(node);
        }
        true
    }

    /// Unlinks and frees a node whose value bag just became empty.
    fn remove_node(&mut self, mut node: Handle) {
        let (left, right) = {
            let target = self.nodes.get(node);
            (target.left(), target.right())
        };

        if let (Some(_), Some(right)) = (left, right) {
            let successor = extreme(&self.nodes, right, Side::Left);
            let block = self.nodes.get(successor).values().len();

            // The successor's whole block moves up into `node`, so every node strictly
            // between the two loses all of it.
            let mut current = self.nodes.get(successor).parent();
            while let Some(handle) = current
                && handle != node
            {
                let between = self.nodes.get_mut(handle);
                between.shrink(block);
                current = between.parent();
            }

            let (target, promoted) = self.nodes.get_pair_mut(node, successor);
            target.swap_payload(promoted);
            let remaining = self.size_of(self.nodes.get(successor).right());
            self.nodes.get_mut(successor).set_size(remaining);

            debug!("promoted successor {successor:?} ({block} values) into {node:?}");
            node = successor;
        }

        let target = self.nodes.get(node);
        let parent = target.parent();
        let color = target.color();
        let child = target.left().or(target.right());

        match (child, parent) {
            (Some(child), _) => {
                self.replace_child(parent, node, Some(child));
                if color == Color::Black {
                    self.remove_repair(child);
                }
            }
            (None, None) => self.root = None,
            (None, Some(_)) => {
                // A childless black node stays linked as a phantom leaf while the repair runs.
                if color == Color::Black {
                    self.remove_repair(node);
                }
                let parent = self.nodes.get(node).parent();
                self.replace_child(parent, node, None);
            }
        }

        self.nodes.free(node);
        debug!("removed node {node:?}");
    }

    /// Works out which repair step applies to a `node` that is one black short.
    fn classify_removal(&self, node: Handle) -> RemovalCase {
        let current = self.nodes.get(node);
        let Some(parent) = current.parent() else {
            return RemovalCase::Settle;
        };
        if current.is_red() {
            return RemovalCase::Settle;
        }

        let side = self.nodes.get(parent).side_of(node);
        let sibling = self
            .nodes
            .get(parent)
            .child(side.opposite())
            .expect("`RawRankedTree::classify_removal()` - black node without a sibling!");
        let deficit = Deficit { parent, sibling, side };

        let sibling_node = self.nodes.get(sibling);
        if sibling_node.is_red() {
            return RemovalCase::RedSibling(deficit);
        }

        let near = self.color_of(sibling_node.child(side));
        let far = self.color_of(sibling_node.child(side.opposite()));
        match (near, far) {
            (Color::Black, Color::Black) => RemovalCase::BlackSiblingBlackNephews(deficit),
            (Color::Red, Color::Black) => RemovalCase::NearNephewRed(deficit),
            (_, Color::Red) => RemovalCase::FarNephewRed(deficit),
        }
    }

    /// Restores the red-black invariants after a black node was spliced out above `node`.
    fn remove_repair(&mut self, mut node: Handle) {
        loop {
            let case = self.classify_removal(node);
            trace!("remove repair at {node:?}: {case:?}");
            #[cfg(test)]
            self.removal_cases.push(case.number());

            match case {
                RemovalCase::Settle => {
                    self.paint(node, Color::Black);
                    return;
                }
                RemovalCase::RedSibling(Deficit { parent, sibling, side }) => {
                    self.paint(sibling, Color::Black);
                    self.paint(parent, Color::Red);
                    self.rotate(parent, side);
                }
                RemovalCase::BlackSiblingBlackNephews(Deficit { parent, sibling, .. }) => {
                    self.paint(sibling, Color::Red);
                    node = parent;
                }
                RemovalCase::NearNephewRed(Deficit { sibling, side, .. }) => {
                    if let Some(near) = self.nodes.get(sibling).child(side) {
                        self.paint(near, Color::Black);
                    }
                    self.paint(sibling, Color::Red);
                    self.rotate(sibling, side.opposite());
                }
                RemovalCase::FarNephewRed(Deficit { parent, sibling, side }) => {
                    let parent_color = self.nodes.get(parent).color();
                    self.paint(sibling, parent_color);
                    self.paint(parent, Color::Black);
                    if let Some(far) = self.nodes.get(sibling).child(side.opposite()) {
                        self.paint(far, Color::Black);
                    }
                    self.rotate(parent, side);

                    let Some(root) = self.root else {
                        return;
                    };
                    node = root;
                }
            }
        }
    }
}

#[cfg(test)]
impl RemovalCase {
    fn number(self) -> u8 {
        match self {
            RemovalCase::Settle => 1,
            RemovalCase::RedSibling(_) => 2,
            RemovalCase::BlackSiblingBlackNephews(_) => 3,
            RemovalCase::NearNephewRed(_) => 5,
            RemovalCase::FarNephewRed(_) => 6,
        }
    }
}

/// Follows `side` links from `from` as far as they go.
fn extreme<K, V>(nodes: &Arena<Node<K, V>>, from: Handle, side: Side) -> Handle {
    let mut current = from;
    while let Some(child) = nodes.get(current).child(side) {
        current = child;
    }
    current
}

/// The next node in ascending key order.
fn successor<K, V>(nodes: &Arena<Node<K, V>>, node: Handle) -> Option<Handle> {
    if let Some(right) = nodes.get(node).right() {
        return Some(extreme(nodes, right, Side::Left));
    }

    let mut child = node;
    let mut parent = nodes.get(node).parent();
    while let Some(handle) = parent {
        let parent_node = nodes.get(handle);
        if parent_node.left() == Some(child) {
            return Some(handle);
        }
        child = handle;
        parent = parent_node.parent();
    }

    None
}

/// In-order walk over the nodes of a tree, following parent links back up.
pub(crate) struct InOrder<'a, K, V> {
    nodes: &'a Arena<Node<K, V>>,
    next: Option<Handle>,
}

impl<'a, K, V> Iterator for InOrder<'a, K, V> {
    type Item = &'a Node<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.next?;
        self.next = successor(self.nodes, handle);
        Some(self.nodes.get(handle))
    }
}

impl<K, V> Clone for InOrder<'_, K, V> {
    fn clone(&self) -> Self {
        InOrder {
            nodes: self.nodes,
            next: self.next,
        }
    }
}

impl<K, V> core::iter::FusedIterator for InOrder<'_, K, V> {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(
    clippy::manual_assert,
    clippy::uninlined_format_args,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
mod tests {
    use super::*;
    use alloc::collections::{BTreeMap, BTreeSet};
    use alloc::string::{String, ToString};
    use alloc::vec;
    use compare::{Natural, natural};
    use core::fmt::Display;
    use core::result::Result;
    use proptest::prelude::*;

    type Tree = RawRankedTree<i32, i32, Natural<i32>>;

    fn tree() -> Tree {
        RawRankedTree::new(natural())
    }

    /// Builds a tree storing `key * 10` under each key, in the given order.
    fn tree_of(keys: &[i32]) -> Tree {
        let mut tree = tree();
        for &key in keys {
            tree.insert(key, key * 10);
        }
        tree.validate_invariants();
        tree
    }

    /// Structural fingerprint of a node: key, values, color, size and child keys.
    type NodeShape<K, V> = (K, Vec<V>, Color, usize, Option<K>, Option<K>);

    impl<K: Clone, V: Clone, C: Compare<K>> RawRankedTree<K, V, C> {
        /// Validates all red-black and size invariants. Panics with a descriptive message
        /// listing every violation.
        pub(crate) fn validate_invariants(&self) {
            let Some(root) = self.root else {
                assert_eq!(self.len, 0, "Empty tree should have len 0");
                assert_eq!(self.nodes.len(), 0, "Empty tree should hold no nodes");
                return;
            };

            let mut errors: Vec<String> = Vec::new();

            if self.nodes.get(root).parent().is_some() {
                errors.push("Root has a parent link".to_string());
            }
            if self.nodes.get(root).is_red() {
                errors.push("Root is red".to_string());
            }

            let mut node_count = 0;
            let (size, _) = self.validate_node(root, None, None, &mut node_count, &mut errors);

            if size != self.len {
                errors.push(alloc::format!("Root size mismatch: root.size={size}, self.len={}", self.len));
            }
            if node_count != self.nodes.len() {
                errors.push(alloc::format!(
                    "Arena leak: {} live slots but {node_count} reachable nodes",
                    self.nodes.len()
                ));
            }

            assert!(errors.is_empty(), "Tree invariant violations:\n{}", errors.join("\n"));
        }

        /// Returns `(subtree_size, black_height)`.
        fn validate_node(
            &self,
            handle: Handle,
            lower: Option<&K>,
            upper: Option<&K>,
            node_count: &mut usize,
            errors: &mut Vec<String>,
        ) -> (usize, usize) {
            *node_count += 1;
            let node = self.nodes.get(handle);

            if node.values().is_empty() {
                errors.push(alloc::format!("Empty value bag at {handle:?}"));
            }
            if let Some(lower) = lower
                && self.compare.compare(node.key(), lower) != Ordering::Greater
            {
                errors.push(alloc::format!("Key at {handle:?} not greater than its lower bound"));
            }
            if let Some(upper) = upper
                && self.compare.compare(node.key(), upper) != Ordering::Less
            {
                errors.push(alloc::format!("Key at {handle:?} not less than its upper bound"));
            }

            let mut sizes = [0usize; 2];
            let mut heights = [0usize; 2];
            for (i, side) in [Side::Left, Side::Right].into_iter().enumerate() {
                let Some(child) = node.child(side) else {
                    continue;
                };

                if self.nodes.get(child).parent() != Some(handle) {
                    errors.push(alloc::format!("Child {child:?} of {handle:?} has a stale parent link"));
                }
                if node.is_red() && self.nodes.get(child).is_red() {
                    errors.push(alloc::format!("Red node {handle:?} has red child {child:?}"));
                }

                let (lower, upper) = match side {
                    Side::Left => (lower, Some(node.key())),
                    Side::Right => (Some(node.key()), upper),
                };
                (sizes[i], heights[i]) = self.validate_node(child, lower, upper, node_count, errors);
            }

            if heights[0] != heights[1] {
                errors.push(alloc::format!(
                    "Black height mismatch at {handle:?}: left={}, right={}",
                    heights[0],
                    heights[1]
                ));
            }

            let size = sizes[0] + sizes[1] + node.values().len();
            if node.size() != size {
                errors.push(alloc::format!("Size mismatch at {handle:?}: stored={}, computed={size}", node.size()));
            }

            let black = usize::from(node.color() == Color::Black);
            (size, heights[0] + black)
        }

        /// Pre-order fingerprint of every node, used to check that a call changed nothing.
        fn snapshot(&self) -> Vec<NodeShape<K, V>> {
            let mut shapes = Vec::new();
            let mut stack: Vec<Handle> = self.root.into_iter().collect();
            while let Some(handle) = stack.pop() {
                let node = self.nodes.get(handle);
                let key_of = |child: Option<Handle>| child.map(|c| self.nodes.get(c).key().clone());
                shapes.push((
                    node.key().clone(),
                    node.values().to_vec(),
                    node.color(),
                    node.size(),
                    key_of(node.left()),
                    key_of(node.right()),
                ));
                stack.extend(node.right());
                stack.extend(node.left());
            }
            shapes
        }
    }

    impl<K: Display, V, C> RawRankedTree<K, V, C> {
        /// Renders the tree as `key{R|B}(left,right)`, `_` for an absent child.
        fn render(&self) -> String {
            self.root.map_or_else(|| "_".to_string(), |root| self.render_node(root))
        }

        fn render_node(&self, handle: Handle) -> String {
            let node = self.nodes.get(handle);
            let color = if node.is_red() { 'R' } else { 'B' };
            if node.left().is_none() && node.right().is_none() {
                return alloc::format!("{}{color}", node.key());
            }

            let child = |side| node.child(side).map_or_else(|| "_".to_string(), |c| self.render_node(c));
            alloc::format!("{}{color}({},{})", node.key(), child(Side::Left), child(Side::Right))
        }
    }

    impl<K, V, C> RawRankedTree<K, V, C> {
        fn take_removal_cases(&mut self) -> Vec<u8> {
            core::mem::take(&mut self.removal_cases)
        }
    }

    // ─── Insertion ───────────────────────────────────────────────────────────

    #[test]
    fn ascending_inserts_rebalance() {
        let tree = tree_of(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(tree.render(), "2B(1B,4R(3B,5B(_,6R)))");
    }

    #[test]
    fn inner_grandchild_is_rotated_twice() {
        let tree = tree_of(&[3, 1, 2]);
        assert_eq!(tree.render(), "2B(1R,3R)");
    }

    #[test]
    fn equal_key_appends_without_new_node() {
        let mut tree = tree_of(&[2, 1, 3]);
        assert!(!tree.insert(3, 31));
        assert!(!tree.insert(3, 32));

        tree.validate_invariants();
        assert_eq!(tree.render(), "2B(1R,3R)");
        assert_eq!(tree.find(&3), Some(&[30, 31, 32][..]));
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.nodes.len(), 3);
    }

    // ─── Deletion repair, one fixture per case ─────────────────────────────

    #[test]
    fn removal_with_red_sibling() {
        let mut tree = tree_of(&[1, 2, 3, 4, 5, 6]);
        assert!(tree.delete(&1, &10));
        tree.validate_invariants();

        assert_eq!(tree.take_removal_cases(), [2, 3, 1]);
        assert_eq!(tree.render(), "4B(2B(_,3R),5B(_,6R))");
    }

    #[test]
    fn removal_with_black_sibling_and_nephews() {
        let mut tree = tree_of(&[2, 1, 3, 4]);
        assert!(tree.delete(&4, &40));
        assert_eq!(tree.take_removal_cases(), [] as [u8; 0], "red leaves need no repair");
        assert_eq!(tree.render(), "2B(1B,3B)");

        assert!(tree.delete(&1, &10));
        tree.validate_invariants();

        assert_eq!(tree.take_removal_cases(), [3, 1]);
        assert_eq!(tree.render(), "2B(_,3R)");
    }

    #[test]
    fn removal_with_near_nephew_red() {
        let mut tree = tree_of(&[2, 1, 4, 3]);
        assert_eq!(tree.render(), "2B(1B,4B(3R,_))");

        assert!(tree.delete(&1, &10));
        tree.validate_invariants();

        assert_eq!(tree.take_removal_cases(), [5, 6, 1]);
        assert_eq!(tree.render(), "3B(2B,4B)");
    }

    #[test]
    fn removal_with_far_nephew_red() {
        let mut tree = tree_of(&[2, 1, 3, 4]);
        assert_eq!(tree.render(), "2B(1B,3B(_,4R))");

        assert!(tree.delete(&1, &10));
        tree.validate_invariants();

        assert_eq!(tree.take_removal_cases(), [6, 1]);
        assert_eq!(tree.render(), "3B(2B,4B)");
    }

    #[test]
    fn removal_of_black_node_with_single_red_child() {
        let mut tree = tree_of(&[2, 1, 3, 4]);
        assert!(tree.delete(&3, &30));
        tree.validate_invariants();

        assert_eq!(tree.take_removal_cases(), [1]);
        assert_eq!(tree.render(), "2B(1B,4B)");
    }

    #[test]
    fn removal_of_last_node_empties_tree() {
        let mut tree = tree_of(&[7]);
        assert!(tree.delete(&7, &70));
        tree.validate_invariants();

        assert!(tree.is_empty());
        assert_eq!(tree.render(), "_");
        assert!(tree.take_removal_cases().is_empty());
    }

    #[test]
    fn scrambled_workload_reaches_every_removal_case() {
        let mut keys: Vec<i32> = (0..1024).collect();
        let mut x: u64 = 0x2545_f491_4f6c_dd1d;
        let mut shuffle = |keys: &mut Vec<i32>| {
            for i in (1..keys.len()).rev() {
                x = x.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
                keys.swap(i, (x >> 33) as usize % (i + 1));
            }
        };

        shuffle(&mut keys);
        let mut tree = tree_of(&keys);
        shuffle(&mut keys);
        for key in &keys {
            assert!(tree.delete(key, &(key * 10)));
        }
        tree.validate_invariants();
        assert!(tree.is_empty());

        let seen: BTreeSet<u8> = tree.take_removal_cases().into_iter().collect();
        assert_eq!(seen, BTreeSet::from([1, 2, 3, 5, 6]));
    }

    // ─── Successor promotion with multi-valued successors ──────────────────

    #[test]
    fn shallow_successor_with_many_values() {
        let mut tree = tree();
        tree.insert(2, 20);
        tree.insert(1, 10);
        for value in [30, 31, 32] {
            tree.insert(3, value);
        }

        assert!(tree.delete(&2, &20));
        tree.validate_invariants();

        assert_eq!(tree.render(), "3B(1R,_)");
        assert_eq!(tree.find(&3), Some(&[30, 31, 32][..]));
        assert_eq!(tree.rank(&3), Some(1));
        assert_eq!(tree.select(3), Ok((&3, &[30, 31, 32][..])));
    }

    #[test]
    fn deep_successor_with_many_values() {
        let mut tree = tree_of(&[1, 2, 3, 4, 5, 6]);
        tree.insert(3, 31);
        tree.insert(3, 32);
        tree.validate_invariants();

        assert!(tree.delete(&2, &20));
        tree.validate_invariants();

        assert_eq!(tree.take_removal_cases(), [6, 1]);
        assert_eq!(tree.render(), "3B(1B,5R(4B,6B))");
        assert_eq!(tree.len(), 7);
        assert_eq!(tree.find(&3), Some(&[30, 31, 32][..]));
        assert_eq!(tree.rank(&3), Some(1));
        assert_eq!(tree.rank(&4), Some(4));
        assert_eq!(tree.rank(&6), Some(6));
        for position in 1..4 {
            assert_eq!(tree.select(position), Ok((&3, &[30, 31, 32][..])));
        }
        assert_eq!(tree.select(4), Ok((&4, &[40][..])));
    }

    // ─── Partial deletes and misses ──────────────────────────────────────────

    #[test]
    fn partial_delete_keeps_node_and_order() {
        let mut tree: RawRankedTree<i32, &str, Natural<i32>> = RawRankedTree::new(natural());
        assert!(tree.insert(1, "jeff"));
        assert!(!tree.insert(1, "bob"));
        assert!(!tree.insert(1, "barry"));

        assert!(tree.delete(&1, &"bob"));
        tree.validate_invariants();

        assert_eq!(tree.find(&1), Some(&["jeff", "barry"][..]));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn missing_pairs_leave_tree_untouched() {
        let mut tree = tree_of(&[5, 3, 8, 1, 4, 7, 9]);
        tree.insert(4, 41);
        let before = tree.snapshot();

        assert!(!tree.delete(&6, &60), "absent key");
        assert!(!tree.delete(&4, &42), "absent value under a present key");
        assert_eq!(tree.snapshot(), before);
        assert_eq!(tree.len(), 8);

        assert!(tree.delete(&4, &41));
        let after = tree.snapshot();
        assert!(!tree.delete(&4, &41), "second delete of the same pair");
        assert_eq!(tree.snapshot(), after);
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    #[test]
    fn empty_tree_queries() {
        let tree = tree();
        tree.validate_invariants();

        assert!(tree.find(&0).is_none());
        assert!(tree.rank(&0).is_none());
        assert_eq!(tree.select(0), Err(Error::OutOfRange { position: 0, len: 0 }));
        assert!(tree.first().is_none() && tree.last().is_none());
        assert_eq!(tree.in_order().count(), 0);
    }

    #[test]
    fn descending_comparator_reverses_order() {
        let mut tree = RawRankedTree::new(natural().rev());
        for key in [3, 9, 1, 4] {
            tree.insert(key, ());
        }
        tree.validate_invariants();

        let keys: Vec<i32> = tree.in_order().map(|node| *node.key()).collect();
        assert_eq!(keys, [9, 4, 3, 1]);
        assert_eq!(tree.rank(&9), Some(0));
        assert_eq!(tree.rank(&1), Some(3));
        assert_eq!(tree.first().map(Node::key), Some(&9));
        assert_eq!(tree.last().map(Node::key), Some(&1));
    }

    #[test]
    fn drain_returns_sorted_bags_and_resets() {
        let mut tree = tree_of(&[4, 2, 6]);
        tree.insert(2, 21);

        let drained: Vec<(i32, Vec<i32>)> =
            tree.drain_to_vec().into_iter().map(|(key, values)| (key, values.into_vec())).collect();
        assert_eq!(drained, [(2, vec![20, 21]), (4, vec![40]), (6, vec![60])]);
        tree.validate_invariants();
        assert!(tree.is_empty());
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut tree = tree_of(&[1, 2, 3]);
        tree.delete(&2, &20);
        tree.insert(4, 40);
        tree.validate_invariants();
        assert_eq!(tree.nodes.len(), 3);
        assert!(tree.capacity() >= 3);
    }

    // ─── Randomized operation sequences ──────────────────────────────────────

    #[derive(Clone, Debug)]
    enum Op {
        Insert(i32, i32),
        Delete(i32, i32),
    }

    /// Keys drawn from a small range so nodes collect several values.
    fn op_strategy(keys: i32) -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0..keys, 0..4).prop_map(|(k, v)| Op::Insert(k, v)),
            2 => (0..keys, 0..4).prop_map(|(k, v)| Op::Delete(k, v)),
        ]
    }

    fn apply(tree: &mut Tree, model: &mut BTreeMap<i32, Vec<i32>>, op: &Op) -> Result<(), TestCaseError> {
        match *op {
            Op::Insert(key, value) => {
                let fresh = !model.contains_key(&key);
                prop_assert_eq!(tree.insert(key, value), fresh, "insert({}, {})", key, value);
                model.entry(key).or_default().push(value);
            }
            Op::Delete(key, value) => {
                let expected = match model.get_mut(&key) {
                    Some(values) => match values.iter().position(|&v| v == value) {
                        Some(index) => {
                            values.remove(index);
                            if values.is_empty() {
                                model.remove(&key);
                            }
                            true
                        }
                        None => false,
                    },
                    None => false,
                };
                prop_assert_eq!(tree.delete(&key, &value), expected, "delete({}, {})", key, value);
            }
        }
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn invariants_hold_after_every_operation(ops in prop::collection::vec(op_strategy(64), 0..400)) {
            let mut tree = tree();
            let mut model = BTreeMap::new();

            for op in &ops {
                apply(&mut tree, &mut model, op)?;
                tree.validate_invariants();
            }

            let flattened: Vec<(i32, i32)> =
                model.iter().flat_map(|(&k, values)| values.iter().map(move |&v| (k, v))).collect();
            let walked: Vec<(i32, i32)> =
                tree.in_order().flat_map(|node| node.values().iter().map(move |&v| (*node.key(), v))).collect();
            prop_assert_eq!(walked, flattened);
        }

        #[test]
        fn crowded_keys_exercise_multi_valued_successors(ops in prop::collection::vec(op_strategy(8), 0..400)) {
            let mut tree = tree();
            let mut model = BTreeMap::new();

            for op in &ops {
                apply(&mut tree, &mut model, op)?;
                tree.validate_invariants();
                prop_assert_eq!(tree.len(), model.values().map(Vec::len).sum::<usize>());
            }
        }

        #[test]
        fn rank_and_select_are_dual(ops in prop::collection::vec(op_strategy(128), 1..300)) {
            let mut tree = tree();
            let mut model = BTreeMap::new();
            for op in &ops {
                apply(&mut tree, &mut model, op)?;
            }
            tree.validate_invariants();

            let mut start = 0;
            for (key, values) in &model {
                prop_assert_eq!(tree.rank(key), Some(start), "rank({})", key);
                start += values.len();
            }

            for position in 0..tree.len() {
                let (key, values) = tree.select(position).expect("position is in range");
                let rank = tree.rank(key).expect("selected key is present");
                prop_assert!(rank <= position && position < rank + values.len());
            }

            prop_assert_eq!(tree.select(tree.len()), Err(Error::OutOfRange { position: tree.len(), len: tree.len() }));
        }
    }
}
