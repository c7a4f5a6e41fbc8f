use smallvec::SmallVec;

use super::handle::Handle;

/// Inline capacity of a node's value bag. Most keys carry a single value.
pub(crate) const INLINE_VALUES: usize = 1;

pub(crate) type Values<V> = SmallVec<[V; INLINE_VALUES]>;
pub(crate) type ValuesIntoIter<V> = smallvec::IntoIter<[V; INLINE_VALUES]>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Color {
    Red,
    Black,
}

/// One side of a node. Repairs are written once for a side and mirrored via [`Side::opposite`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    #[inline]
    pub(crate) const fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// A red-black tree node holding every value stored under one key.
#[derive(Clone)]
pub(crate) struct Node<K, V> {
    key: K,
    // Never empty while the node is linked into a tree.
    values: Values<V>,
    color: Color,
    parent: Option<Handle>,
    left: Option<Handle>,
    right: Option<Handle>,
    // Number of values (not nodes) in the subtree rooted here.
    size: usize,
}

impl<K, V> Node<K, V> {
    /// Creates a detached red node holding a single value.
    pub(crate) fn new(key: K, value: V) -> Self {
        let mut values = Values::new();
        values.push(value);
        Self {
            key,
            values,
            color: Color::Red,
            parent: None,
            left: None,
            right: None,
            size: 1,
        }
    }

    #[inline]
    pub(crate) fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    pub(crate) fn values(&self) -> &[V] {
        &self.values
    }

    /// Consumes the node, returning its key and value bag.
    pub(crate) fn into_parts(self) -> (K, Values<V>) {
        (self.key, self.values)
    }

    pub(crate) fn push_value(&mut self, value: V) {
        self.values.push(value);
    }

    /// Removes the first value equal to `value`, keeping the order of the rest.
    pub(crate) fn remove_value(&mut self, value: &V) -> Option<V>
    where
        V: PartialEq,
    {
        let index = self.values.iter().position(|v| v == value)?;
        Some(self.values.remove(index))
    }

    /// Exchanges key and value bag with `other`, leaving colors, links and sizes alone.
    pub(crate) fn swap_payload(&mut self, other: &mut Self) {
        core::mem::swap(&mut self.key, &mut other.key);
        core::mem::swap(&mut self.values, &mut other.values);
    }

    #[inline]
    pub(crate) fn color(&self) -> Color {
        self.color
    }

    #[inline]
    pub(crate) fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    #[inline]
    pub(crate) fn is_red(&self) -> bool {
        self.color == Color::Red
    }

    #[inline]
    pub(crate) fn parent(&self) -> Option<Handle> {
        self.parent
    }

    #[inline]
    pub(crate) fn set_parent(&mut self, parent: Option<Handle>) {
        self.parent = parent;
    }

    #[inline]
    pub(crate) fn left(&self) -> Option<Handle> {
        self.left
    }

    #[inline]
    pub(crate) fn right(&self) -> Option<Handle> {
        self.right
    }

    #[inline]
    pub(crate) fn child(&self, side: Side) -> Option<Handle> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    #[inline]
    pub(crate) fn set_child(&mut self, side: Side, child: Option<Handle>) {
        match side {
            Side::Left => self.left = child,
            Side::Right => self.right = child,
        }
    }

    /// Which side `child` hangs from. `child` must be one of this node's children.
    #[inline]
    pub(crate) fn side_of(&self, child: Handle) -> Side {
        if self.left == Some(child) {
            Side::Left
        } else {
            debug_assert_eq!(self.right, Some(child), "`Node::side_of()` - not a child of this node!");
            Side::Right
        }
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub(crate) fn set_size(&mut self, size: usize) {
        self.size = size;
    }

    #[inline]
    pub(crate) fn grow(&mut self, by: usize) {
        self.size += by;
    }

    #[inline]
    pub(crate) fn shrink(&mut self, by: usize) {
        debug_assert!(self.size >= by, "`Node::shrink()` - subtree size underflow!");
        self.size -= by;
    }
}
