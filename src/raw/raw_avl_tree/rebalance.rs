//! The rebalance engine: cached heights, balance factors and rotations.
//!
//! Each rotation is O(1) link surgery on two nodes (three for a double
//! rotation) and refreshes the cached height of exactly the nodes whose
//! children changed, bottom-up. The caller owns the link into the rotated
//! subtree and must re-link it from the returned id.

use tracing::trace;

use super::RawAvlTree;
use crate::raw::node_id::NodeId;

impl<K, V> RawAvlTree<K, V> {
    /// Height of an optional subtree; an absent one has height 0.
    #[inline]
    pub(super) fn subtree_height(&self, id: Option<NodeId>) -> u8 {
        id.map_or(0, |id| self.nodes.get(id).height())
    }

    /// Recomputes the cached height of `at` from its children.
    pub(super) fn update_height(&mut self, at: NodeId) {
        let node = self.nodes.get(at);
        let height = 1 + self.subtree_height(node.left()).max(self.subtree_height(node.right()));
        self.nodes.get_mut(at).set_height(height);
    }

    /// Right height minus left height.
    pub(super) fn balance_factor(&self, at: NodeId) -> i16 {
        let node = self.nodes.get(at);
        i16::from(self.subtree_height(node.right())) - i16::from(self.subtree_height(node.left()))
    }

    /// Restores `|balance| <= 1` at `at`, whose children are already balanced.
    ///
    /// Returns the root of the subtree after any rotation.
    pub(super) fn rebalance(&mut self, at: NodeId) -> NodeId {
        let balance = self.balance_factor(at);
        if balance >= 2 {
            let right = self.nodes.get(at).right().expect("`rebalance()` - right-heavy node has no right child!");
            if self.balance_factor(right) >= 0 {
                self.rotate_left(at)
            } else {
                self.rotate_right_left(at)
            }
        } else if balance <= -2 {
            let left = self.nodes.get(at).left().expect("`rebalance()` - left-heavy node has no left child!");
            if self.balance_factor(left) <= 0 {
                self.rotate_right(at)
            } else {
                self.rotate_left_right(at)
            }
        } else {
            at
        }
    }

    /// Lifts the right child of `at` into its place.
    ///
    /// ```text
    ///     at                pivot
    ///    /  \               /   \
    ///   a   pivot   =>     at    c
    ///       /   \         /  \
    ///    inner   c       a   inner
    /// ```
    pub(super) fn rotate_left(&mut self, at: NodeId) -> NodeId {
        let node = self.nodes.get(at);
        let parent = node.parent();
        let pivot = node.right().expect("`rotate_left()` - node has no right child!");
        let inner = self.nodes.get(pivot).left();

        self.link_right(at, inner);
        self.link_left(pivot, Some(at));
        self.nodes.get_mut(pivot).set_parent(parent);

        self.update_height(at);
        self.update_height(pivot);
        trace!(height = self.nodes.get(pivot).height(), "rotated left");
        pivot
    }

    /// Lifts the left child of `at` into its place. Mirror of `rotate_left`.
    pub(super) fn rotate_right(&mut self, at: NodeId) -> NodeId {
        let node = self.nodes.get(at);
        let parent = node.parent();
        let pivot = node.left().expect("`rotate_right()` - node has no left child!");
        let inner = self.nodes.get(pivot).right();

        self.link_left(at, inner);
        self.link_right(pivot, Some(at));
        self.nodes.get_mut(pivot).set_parent(parent);

        self.update_height(at);
        self.update_height(pivot);
        trace!(height = self.nodes.get(pivot).height(), "rotated right");
        pivot
    }

    /// Rotates the right child right, then `at` left.
    pub(super) fn rotate_right_left(&mut self, at: NodeId) -> NodeId {
        let right = self.nodes.get(at).right().expect("`rotate_right_left()` - node has no right child!");
        let right = self.rotate_right(right);
        self.link_right(at, Some(right));
        self.rotate_left(at)
    }

    /// Rotates the left child left, then `at` right.
    pub(super) fn rotate_left_right(&mut self, at: NodeId) -> NodeId {
        let left = self.nodes.get(at).left().expect("`rotate_left_right()` - node has no left child!");
        let left = self.rotate_left(left);
        self.link_left(at, Some(left));
        self.rotate_right(at)
    }
}
