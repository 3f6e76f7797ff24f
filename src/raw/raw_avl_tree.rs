use core::cmp::Ordering;

use tracing::trace;

use super::arena::Arena;
use super::node::{Node, Values};
use super::node_id::NodeId;
use crate::comparator::Comparator;
use crate::error::InvariantViolation;
use crate::order::{Direction, SearchMode};

mod rebalance;

/// The AVL tree backing `AvlTree`.
///
/// Key-directed operations take the comparator as an argument; the facade
/// owns it. Mutations recurse from the root and hand the (possibly rotated)
/// subtree root back up, so every ancestor re-links its child from the
/// returned id.
#[derive(Clone)]
pub(crate) struct RawAvlTree<K, V> {
    /// Every node, linked into one tree through child ids.
    nodes: Arena<Node<K, V>>,
    /// The root node, if the tree is non-empty.
    root: Option<NodeId>,
}

/// A removed key and the values it held.
pub(crate) type Removed<K, V> = (K, Values<V>);

impl<K, V> RawAvlTree<K, V> {
    /// Creates a new, empty tree.
    pub(crate) const fn new() -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
        }
    }

    /// Creates a tree with room for `capacity` keys before reallocating.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Arena::with_capacity(capacity),
            root: None,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    /// Number of distinct keys.
    pub(crate) const fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Height of the whole tree; 0 when empty.
    pub(crate) fn height(&self) -> usize {
        usize::from(self.subtree_height(self.root))
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    /// Returns the key and values stored at `id`.
    #[inline]
    pub(crate) fn entry(&self, id: NodeId) -> (&K, &[V]) {
        let node = self.nodes.get(id);
        (node.key(), node.values())
    }

    /// The first node met when walking the whole tree in `direction`.
    pub(crate) fn first(&self, direction: Direction) -> Option<NodeId> {
        self.root.map(|root| self.first_within(root, direction))
    }

    /// The first node of the subtree at `from` when walking in `direction`.
    fn first_within(&self, from: NodeId, direction: Direction) -> NodeId {
        let mut current = from;
        while let Some(next) = self.nodes.get(current).child_before(direction) {
            current = next;
        }
        current
    }

    /// The node that follows `id` when walking in `direction`, using parent links.
    pub(crate) fn step(&self, id: NodeId, direction: Direction) -> Option<NodeId> {
        let node = self.nodes.get(id);
        if let Some(after) = node.child_after(direction) {
            return Some(self.first_within(after, direction));
        }

        // Climb until we leave a subtree through the link that precedes its parent.
        let mut child = id;
        let mut parent = node.parent();
        while let Some(up) = parent {
            let up_node = self.nodes.get(up);
            if up_node.child_before(direction) == Some(child) {
                return Some(up);
            }
            child = up;
            parent = up_node.parent();
        }
        None
    }

    /// Removes the first key in `direction` (the minimum for `Ascending`).
    pub(crate) fn pop(&mut self, direction: Direction) -> Option<Removed<K, V>> {
        let root = self.root?;
        let (root, removed) = self.detach_first(root, direction);
        self.set_root(root);
        Some(removed)
    }

    fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
        if let Some(root) = root {
            self.nodes.get_mut(root).set_parent(None);
        }
    }

    /// Makes `child` the left child of `at`, pointing it back at `at`.
    fn link_left(&mut self, at: NodeId, child: Option<NodeId>) {
        self.nodes.get_mut(at).set_left(child);
        if let Some(child) = child {
            self.nodes.get_mut(child).set_parent(Some(at));
        }
    }

    /// Makes `child` the right child of `at`, pointing it back at `at`.
    fn link_right(&mut self, at: NodeId, child: Option<NodeId>) {
        self.nodes.get_mut(at).set_right(child);
        if let Some(child) = child {
            self.nodes.get_mut(child).set_parent(Some(at));
        }
    }

    /// Frees `at`, which has at most one child, and lets `child` take its place.
    fn splice_out(&mut self, at: NodeId, child: Option<NodeId>) -> (Option<NodeId>, Removed<K, V>) {
        let node = self.nodes.remove(at);
        if let Some(child) = child {
            self.nodes.get_mut(child).set_parent(node.parent());
        }
        trace!(promoted_child = child.is_some(), "spliced node out of tree");
        (child, node.into_entry())
    }

    /// Detaches the first node of the subtree at `at` in `direction`.
    ///
    /// Returns the new subtree root and the detached entry. Every node on the
    /// path is rebalanced on the way back up.
    fn detach_first(&mut self, at: NodeId, direction: Direction) -> (Option<NodeId>, Removed<K, V>) {
        let node = self.nodes.get(at);
        let Some(before) = node.child_before(direction) else {
            let after = node.child_after(direction);
            return self.splice_out(at, after);
        };

        let (subtree, removed) = self.detach_first(before, direction);
        match direction {
            Direction::Ascending => self.link_left(at, subtree),
            Direction::Descending => self.link_right(at, subtree),
        }
        self.update_height(at);
        (Some(self.rebalance(at)), removed)
    }
}

impl<K, V> RawAvlTree<K, V> {
    /// Finds the node holding `key`.
    pub(crate) fn find<C>(&self, comparator: &C, key: &K) -> Option<NodeId>
    where
        C: Comparator<K> + ?Sized,
    {
        let mut current = self.root;
        while let Some(id) = current {
            let node = self.nodes.get(id);
            current = match comparator.compare(key, node.key()) {
                Ordering::Equal => return Some(id),
                Ordering::Less => node.left(),
                Ordering::Greater => node.right(),
            };
        }
        None
    }

    pub(crate) fn values_mut<C>(&mut self, comparator: &C, key: &K) -> Option<&mut [V]>
    where
        C: Comparator<K> + ?Sized,
    {
        let id = self.find(comparator, key)?;
        Some(self.nodes.get_mut(id).values_mut())
    }

    /// Finds `key`, or the tightest bound on the side `mode` asks for.
    ///
    /// Descends exactly like `find`. Every node passed on the way down is a
    /// candidate bound, and a later candidate on the same side is always
    /// tighter than an earlier one.
    pub(crate) fn search<C>(&self, comparator: &C, key: &K, mode: SearchMode) -> Option<NodeId>
    where
        C: Comparator<K> + ?Sized,
    {
        let mut bound = None;
        let mut current = self.root;
        while let Some(id) = current {
            let node = self.nodes.get(id);
            current = match comparator.compare(key, node.key()) {
                Ordering::Equal => return Some(id),
                Ordering::Less => {
                    if mode == SearchMode::ClosestMax {
                        bound = Some(id);
                    }
                    node.left()
                }
                Ordering::Greater => {
                    if mode == SearchMode::ClosestMin {
                        bound = Some(id);
                    }
                    node.right()
                }
            };
        }
        bound
    }

    /// Appends `values` under `key`, creating the key if needed.
    ///
    /// Returns `true` if a new node was created. `values` must not be empty.
    pub(crate) fn insert<C>(&mut self, comparator: &C, key: K, values: Values<V>) -> bool
    where
        C: Comparator<K> + ?Sized,
    {
        debug_assert!(!values.is_empty(), "`RawAvlTree::insert()` - no values to insert");
        let Some(root) = self.root else {
            let root = self.nodes.insert(Node::new(key, values, None));
            self.root = Some(root);
            return true;
        };

        let (root, created) = self.insert_into(comparator, root, key, values);
        self.set_root(Some(root));
        created
    }

    fn insert_into<C>(&mut self, comparator: &C, at: NodeId, key: K, values: Values<V>) -> (NodeId, bool)
    where
        C: Comparator<K> + ?Sized,
    {
        let node = self.nodes.get(at);
        let ordering = comparator.compare(&key, node.key());
        let (left, right) = (node.left(), node.right());

        let created = match ordering {
            Ordering::Equal => {
                self.nodes.get_mut(at).append(values);
                false
            }
            Ordering::Less => {
                let (child, created) = match left {
                    Some(left) => self.insert_into(comparator, left, key, values),
                    None => (self.nodes.insert(Node::new(key, values, Some(at))), true),
                };
                self.link_left(at, Some(child));
                created
            }
            Ordering::Greater => {
                let (child, created) = match right {
                    Some(right) => self.insert_into(comparator, right, key, values),
                    None => (self.nodes.insert(Node::new(key, values, Some(at))), true),
                };
                self.link_right(at, Some(child));
                created
            }
        };

        // Appending to an existing key leaves every height untouched.
        if !created {
            return (at, false);
        }
        self.update_height(at);
        (self.rebalance(at), true)
    }

    /// Removes `key` and returns it along with its values.
    pub(crate) fn remove<C>(&mut self, comparator: &C, key: &K) -> Option<Removed<K, V>>
    where
        C: Comparator<K> + ?Sized,
    {
        let root = self.root?;
        let (root, removed) = self.remove_from(comparator, root, key);
        let removed = removed?;
        self.set_root(root);
        Some(removed)
    }

    fn remove_from<C>(&mut self, comparator: &C, at: NodeId, key: &K) -> (Option<NodeId>, Option<Removed<K, V>>)
    where
        C: Comparator<K> + ?Sized,
    {
        let node = self.nodes.get(at);
        let ordering = comparator.compare(key, node.key());
        let (left, right) = (node.left(), node.right());

        let removed = match (ordering, left, right) {
            (Ordering::Less, Some(left), _) => {
                let (subtree, removed) = self.remove_from(comparator, left, key);
                if removed.is_none() {
                    return (Some(at), None);
                }
                self.link_left(at, subtree);
                removed
            }
            (Ordering::Greater, _, Some(right)) => {
                let (subtree, removed) = self.remove_from(comparator, right, key);
                if removed.is_none() {
                    return (Some(at), None);
                }
                self.link_right(at, subtree);
                removed
            }
            (Ordering::Less | Ordering::Greater, _, _) => return (Some(at), None),
            (Ordering::Equal, Some(_), Some(right)) => {
                // The in-order successor moves into this slot; its own node has no left child.
                let (subtree, (successor_key, successor_values)) = self.detach_first(right, Direction::Ascending);
                self.link_right(at, subtree);
                Some(self.nodes.get_mut(at).replace_entry(successor_key, successor_values))
            }
            (Ordering::Equal, child, None) | (Ordering::Equal, None, child) => {
                let (subtree, removed) = self.splice_out(at, child);
                return (subtree, Some(removed));
            }
        };

        self.update_height(at);
        (Some(self.rebalance(at)), removed)
    }

    /// Verifies ordering, balance, parent links, cached heights and value lists.
    pub(crate) fn check_invariants<C>(&self, comparator: &C) -> Result<(), InvariantViolation>
    where
        C: Comparator<K> + ?Sized,
    {
        let mut reachable = 0;
        if let Some(root) = self.root {
            self.check_subtree(comparator, root, None, 0, (None, None), &mut reachable)?;
        }

        let stored = self.nodes.len();
        if reachable != stored {
            return Err(InvariantViolation::LengthMismatch { reachable, stored });
        }
        Ok(())
    }

    /// Checks the subtree at `at`, whose keys must lie strictly inside
    /// `bounds`, and returns its real height.
    fn check_subtree<C>(
        &self,
        comparator: &C,
        at: NodeId,
        parent: Option<NodeId>,
        depth: usize,
        (lower, upper): (Option<&K>, Option<&K>),
        reachable: &mut usize,
    ) -> Result<u8, InvariantViolation>
    where
        C: Comparator<K> + ?Sized,
    {
        let node = self.nodes.get(at);
        *reachable += 1;

        if node.parent() != parent {
            return Err(InvariantViolation::BrokenParentLink { depth });
        }
        if node.values().is_empty() {
            return Err(InvariantViolation::EmptyValues { depth });
        }
        let above_lower = lower.is_none_or(|lower| comparator.compare(node.key(), lower) == Ordering::Greater);
        let below_upper = upper.is_none_or(|upper| comparator.compare(node.key(), upper) == Ordering::Less);
        if !above_lower || !below_upper {
            return Err(InvariantViolation::Unordered { depth });
        }

        let left = match node.left() {
            Some(child) => self.check_subtree(comparator, child, Some(at), depth + 1, (lower, Some(node.key())), reachable)?,
            None => 0,
        };
        let right = match node.right() {
            Some(child) => self.check_subtree(comparator, child, Some(at), depth + 1, (Some(node.key()), upper), reachable)?,
            None => 0,
        };

        let actual = 1 + left.max(right);
        if node.height() != actual {
            return Err(InvariantViolation::StaleHeight {
                depth,
                cached: node.height(),
                actual,
            });
        }
        let balance = i16::from(right) - i16::from(left);
        if balance.abs() > 1 {
            return Err(InvariantViolation::Unbalanced { depth, balance });
        }
        Ok(actual)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::comparator::NaturalOrder;
    use alloc::collections::BTreeMap;
    use alloc::vec::Vec;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use smallvec::smallvec;

    fn tree_of(keys: &[i32]) -> RawAvlTree<i32, i32> {
        let mut tree = RawAvlTree::new();
        for &key in keys {
            tree.insert(&NaturalOrder, key, smallvec![key * 10]);
            assert_eq!(tree.check_invariants(&NaturalOrder), Ok(()));
        }
        tree
    }

    fn walk(tree: &RawAvlTree<i32, i32>, direction: Direction) -> Vec<i32> {
        let mut keys = Vec::new();
        let mut current = tree.first(direction);
        while let Some(id) = current {
            keys.push(*tree.entry(id).0);
            current = tree.step(id, direction);
        }
        keys
    }

    fn root_key(tree: &RawAvlTree<i32, i32>) -> i32 {
        *tree.entry(tree.root.unwrap()).0
    }

    #[test]
    fn empty_tree() {
        let tree: RawAvlTree<i32, i32> = RawAvlTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.first(Direction::Ascending), None);
        assert_eq!(tree.find(&NaturalOrder, &1), None);
        assert_eq!(tree.search(&NaturalOrder, &1, SearchMode::ClosestMax), None);
        assert_eq!(tree.check_invariants(&NaturalOrder), Ok(()));
    }

    #[test]
    fn duplicate_key_appends_without_new_node() {
        let mut tree = tree_of(&[5]);
        assert!(!tree.insert(&NaturalOrder, 5, smallvec![51, 52]));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.entry(tree.find(&NaturalOrder, &5).unwrap()).1, &[50, 51, 52]);
    }

    #[test]
    fn search_picks_the_tightest_bound() {
        let tree = tree_of(&[2, 4, 6]);
        let found = |key, mode| tree.search(&NaturalOrder, &key, mode).map(|id| *tree.entry(id).0);

        assert_eq!(found(3, SearchMode::ClosestMax), Some(4));
        assert_eq!(found(3, SearchMode::ClosestMin), Some(2));
        assert_eq!(found(6, SearchMode::ClosestMax), Some(6));
        assert_eq!(found(6, SearchMode::ClosestMin), Some(6));
        assert_eq!(found(7, SearchMode::ClosestMax), None);
        assert_eq!(found(7, SearchMode::ClosestMin), Some(6));
        assert_eq!(found(1, SearchMode::ClosestMin), None);
        assert_eq!(found(1, SearchMode::ClosestMax), Some(2));
        assert_eq!(found(5, SearchMode::ClosestMin), Some(4));
    }

    #[test]
    fn step_walks_both_ways() {
        let tree = tree_of(&[5, 3, 8, 1, 4, 7, 9, 2, 6]);
        assert_eq!(walk(&tree, Direction::Ascending), (1..=9).collect::<Vec<_>>());
        assert_eq!(walk(&tree, Direction::Descending), (1..=9).rev().collect::<Vec<_>>());
        assert!(tree.height() <= 4);
    }

    #[test]
    fn leaf_removal_detaches() {
        let mut tree = tree_of(&[2, 1, 3]);
        assert_eq!(tree.remove(&NaturalOrder, &3).map(|(k, v)| (k, v.into_vec())), Some((3, alloc::vec![30])));
        assert_eq!(tree.check_invariants(&NaturalOrder), Ok(()));
        assert_eq!(walk(&tree, Direction::Ascending), [1, 2]);
    }

    #[test]
    fn single_child_removal_splices() {
        let mut tree = tree_of(&[2, 1, 3, 4]);
        tree.remove(&NaturalOrder, &3);
        assert_eq!(tree.check_invariants(&NaturalOrder), Ok(()));
        assert_eq!(walk(&tree, Direction::Ascending), [1, 2, 4]);
    }

    #[test]
    fn two_child_removal_promotes_successor() {
        let mut tree = tree_of(&[4, 2, 6, 1, 3, 5, 7]);
        let (key, values) = tree.remove(&NaturalOrder, &4).unwrap();
        assert_eq!((key, values.as_slice()), (4, &[40][..]));
        assert_eq!(root_key(&tree), 5);
        assert_eq!(tree.check_invariants(&NaturalOrder), Ok(()));
        assert_eq!(walk(&tree, Direction::Ascending), [1, 2, 3, 5, 6, 7]);
    }

    #[test]
    fn removing_a_missing_key_changes_nothing() {
        let mut tree = tree_of(&[4, 2, 6]);
        assert!(tree.remove(&NaturalOrder, &5).is_none());
        assert!(tree.remove(&NaturalOrder, &0).is_none());
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.check_invariants(&NaturalOrder), Ok(()));
    }

    #[test]
    fn removal_rebalances_every_ancestor() {
        // Minimal AVL tree of height 5: deleting its shallowest leaf forces
        // rotations at more than one level on the way back to the root.
        let mut tree = tree_of(&[8, 5, 11, 3, 7, 10, 12, 2, 4, 6, 9, 1]);
        assert_eq!(tree.height(), 5);
        tree.remove(&NaturalOrder, &12);
        assert_eq!(tree.check_invariants(&NaturalOrder), Ok(()));
        assert_eq!(tree.height(), 4);
        assert_eq!(walk(&tree, Direction::Ascending), (1..=11).collect::<Vec<_>>());
    }

    #[test]
    fn pop_takes_the_extremes() {
        let mut tree = tree_of(&[3, 1, 2, 5, 4]);
        assert_eq!(tree.pop(Direction::Ascending).map(|(k, _)| k), Some(1));
        assert_eq!(tree.pop(Direction::Descending).map(|(k, _)| k), Some(5));
        assert_eq!(tree.check_invariants(&NaturalOrder), Ok(()));
        assert_eq!(walk(&tree, Direction::Ascending), [2, 3, 4]);
    }

    #[test]
    fn check_invariants_reports_a_corrupted_height() {
        let mut tree = tree_of(&[2, 1, 3]);
        let root = tree.root.unwrap();
        tree.nodes.get_mut(root).set_height(7);
        assert_eq!(
            tree.check_invariants(&NaturalOrder),
            Err(InvariantViolation::StaleHeight {
                depth: 0,
                cached: 7,
                actual: 2
            })
        );
    }

    #[test]
    fn check_invariants_reports_a_broken_parent_link() {
        let mut tree = tree_of(&[2, 1, 3]);
        let left = tree.nodes.get(tree.root.unwrap()).left().unwrap();
        tree.nodes.get_mut(left).set_parent(None);
        assert_eq!(
            tree.check_invariants(&NaturalOrder),
            Err(InvariantViolation::BrokenParentLink { depth: 1 })
        );
    }

    #[test]
    fn check_invariants_reports_misordered_keys() {
        let mut tree = tree_of(&[2, 1, 3]);
        let left = tree.nodes.get(tree.root.unwrap()).left().unwrap();
        tree.nodes.get_mut(left).replace_entry(9, smallvec![90]);
        assert_eq!(tree.check_invariants(&NaturalOrder), Err(InvariantViolation::Unordered { depth: 1 }));
    }

    #[derive(Clone, Debug)]
    enum Op {
        Insert(i32),
        Remove(i32),
        PopFirst,
        PopLast,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            6 => (0i32..400).prop_map(Op::Insert),
            3 => (0i32..400).prop_map(Op::Remove),
            1 => Just(Op::PopFirst),
            1 => Just(Op::PopLast),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn invariants_hold_after_every_operation(ops in prop::collection::vec(op_strategy(), 0..600)) {
            let mut tree: RawAvlTree<i32, i32> = RawAvlTree::new();
            let mut model: BTreeMap<i32, Vec<i32>> = BTreeMap::new();

            for op in ops {
                match op {
                    Op::Insert(key) => {
                        let created = tree.insert(&NaturalOrder, key, smallvec![key]);
                        let existed = model.contains_key(&key);
                        model.entry(key).or_default().push(key);
                        prop_assert_eq!(created, !existed);
                    }
                    Op::Remove(key) => {
                        let removed = tree.remove(&NaturalOrder, &key).map(|(k, v)| (k, v.into_vec()));
                        prop_assert_eq!(removed, model.remove_entry(&key));
                    }
                    Op::PopFirst => {
                        let popped = tree.pop(Direction::Ascending).map(|(k, v)| (k, v.into_vec()));
                        prop_assert_eq!(popped, model.pop_first());
                    }
                    Op::PopLast => {
                        let popped = tree.pop(Direction::Descending).map(|(k, v)| (k, v.into_vec()));
                        prop_assert_eq!(popped, model.pop_last());
                    }
                }

                prop_assert_eq!(tree.check_invariants(&NaturalOrder), Ok(()));
                prop_assert_eq!(tree.len(), model.len());
            }

            let expected: Vec<i32> = model.keys().copied().collect();
            prop_assert_eq!(walk(&tree, Direction::Ascending), expected);
        }
    }
}
