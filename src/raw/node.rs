use smallvec::SmallVec;

use super::node_id::NodeId;
use crate::order::Direction;

/// The values stored under one key, in arrival order.
pub(crate) type Values<V> = SmallVec<[V; 1]>;

/// A single tree cell: one key, its values, and the links around it.
///
/// `left` and `right` are the only owning links; `parent` exists purely for
/// upward walks and always mirrors the child links.
#[derive(Clone)]
pub(crate) struct Node<K, V> {
    key: K,
    // Never empty while the node is reachable.
    values: Values<V>,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    // 1 for a leaf; an absent subtree counts as 0.
    height: u8,
}

impl<K, V> Node<K, V> {
    /// Creates a detached leaf.
    pub(crate) fn new(key: K, values: Values<V>, parent: Option<NodeId>) -> Self {
        debug_assert!(!values.is_empty(), "a node must hold at least one value");
        Self {
            key,
            values,
            parent,
            left: None,
            right: None,
            height: 1,
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

    pub(crate) fn values_mut(&mut self) -> &mut [V] {
        &mut self.values
    }

    pub(crate) fn append(&mut self, values: Values<V>) {
        self.values.extend(values);
    }

    /// Swaps in a new key and values, returning the old ones. Links are untouched.
    pub(crate) fn replace_entry(&mut self, key: K, values: Values<V>) -> (K, Values<V>) {
        (core::mem::replace(&mut self.key, key), core::mem::replace(&mut self.values, values))
    }

    pub(crate) fn into_entry(self) -> (K, Values<V>) {
        (self.key, self.values)
    }

    #[inline]
    pub(crate) fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    #[inline]
    pub(crate) fn left(&self) -> Option<NodeId> {
        self.left
    }

    // Parent links are kept in sync by `RawAvlTree::link_left`, not here.
    pub(crate) fn set_left(&mut self, left: Option<NodeId>) {
        self.left = left;
    }

    #[inline]
    pub(crate) fn right(&self) -> Option<NodeId> {
        self.right
    }

    pub(crate) fn set_right(&mut self, right: Option<NodeId>) {
        self.right = right;
    }

    /// The child whose keys come before this node's key when walking in `direction`.
    #[inline]
    pub(crate) fn child_before(&self, direction: Direction) -> Option<NodeId> {
        match direction {
            Direction::Ascending => self.left,
            Direction::Descending => self.right,
        }
    }

    /// The child whose keys come after this node's key when walking in `direction`.
    #[inline]
    pub(crate) fn child_after(&self, direction: Direction) -> Option<NodeId> {
        self.child_before(direction.reverse())
    }

    #[inline]
    pub(crate) fn height(&self) -> u8 {
        self.height
    }

    pub(crate) fn set_height(&mut self, height: u8) {
        self.height = height;
    }
}
