use alloc::vec::Vec;
use core::fmt;
use core::iter::FusedIterator;

use tracing::debug;

use crate::comparator::{Comparator, NaturalOrder};
use crate::error::InvariantViolation;
use crate::order::{Direction, SearchMode};
use crate::raw::{NodeId, RawAvlTree, Values};

mod capacity;

/// An ordered multi-map based on an [AVL tree].
///
/// Every key maps to a non-empty list of values kept in arrival order:
/// inserting under a key that is already present appends to its list instead
/// of replacing it. Keys are ordered by a [`Comparator`] chosen at
/// construction, [`NaturalOrder`] unless stated otherwise.
///
/// The tree stays height-balanced: the subtrees under any node differ in
/// height by at most one, so the height never exceeds about
/// 1.44 log<sub>2</sub>(n + 2). Lookups, insertions and removals are
/// O(log n); iteration is amortized O(1) per step.
///
/// It is a logic error for a key to be modified in such a way that its
/// ordering relative to any other key changes while it is in the map, or to
/// supply a comparator that is not a strict total order. The behavior
/// resulting from such a logic error is not specified, but will be
/// encapsulated to the `AvlTree` that observed it and not result in undefined
/// behavior.
///
/// # Examples
///
/// ```
/// use avl_multimap::{AvlTree, Direction, SearchMode};
///
/// // Events keyed by the millisecond they fire at.
/// let mut timeline = AvlTree::new();
/// timeline.push(250, "fade in");
/// timeline.push(1000, "cue music");
/// timeline.push(250, "show title");
///
/// assert_eq!(timeline.get(&250), Some((&250, &["fade in", "show title"][..])));
///
/// // The next instant at or after 400ms.
/// assert_eq!(timeline.search(&400, SearchMode::ClosestMax).map(|(at, _)| *at), Some(1000));
///
/// // Play backwards from 900ms.
/// let instants: Vec<_> = timeline.entries(Direction::Descending, Some(&900)).map(|(at, _)| *at).collect();
/// assert_eq!(instants, [250]);
/// ```
///
/// [AVL tree]: https://en.wikipedia.org/wiki/AVL_tree
pub struct AvlTree<K, V, C = NaturalOrder> {
    raw: RawAvlTree<K, V>,
    comparator: C,
}

/// A cursor over the entries of an `AvlTree`, in one direction.
///
/// This `struct` is created by the [`entries`] and [`iter`] methods on
/// [`AvlTree`]. It walks from node to node through parent links, never
/// restarting from the root, and once it runs off either end it stays
/// exhausted. The shared borrow it holds keeps the tree from being mutated
/// while it is alive.
///
/// # Examples
///
/// ```
/// use avl_multimap::{AvlTree, Direction};
///
/// let tree = AvlTree::from([(1, 'a'), (2, 'b'), (3, 'c')]);
/// let mut iter = tree.entries(Direction::Descending, None);
/// assert_eq!(iter.peek(), Some((&3, &['c'][..])));
/// assert_eq!(iter.next(), Some((&3, &['c'][..])));
/// assert_eq!(iter.next(), Some((&2, &['b'][..])));
/// ```
///
/// [`entries`]: AvlTree::entries
/// [`iter`]: AvlTree::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V> {
    raw: &'a RawAvlTree<K, V>,
    direction: Direction,
    current: Option<NodeId>,
}

impl<K, V> AvlTree<K, V> {
    /// Makes a new, empty `AvlTree` ordered by [`Ord`].
    ///
    /// Does not allocate anything on its own.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::AvlTree;
    ///
    /// let mut tree = AvlTree::new();
    /// tree.push(1, "a");
    /// ```
    #[must_use]
    pub const fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }
}

impl<K, V, C> AvlTree<K, V, C> {
    /// Makes a new, empty `AvlTree` ordered by `comparator`.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::AvlTree;
    ///
    /// let mut newest_first = AvlTree::with_comparator(|a: &u32, b: &u32| b.cmp(a));
    /// newest_first.push(1, ());
    /// newest_first.push(2, ());
    /// assert_eq!(newest_first.first_key_value().map(|(k, _)| *k), Some(2));
    /// ```
    #[must_use]
    pub const fn with_comparator(comparator: C) -> Self {
        Self {
            raw: RawAvlTree::new(),
            comparator,
        }
    }

    /// Returns the comparator that orders this tree.
    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    /// Returns the number of distinct keys in the tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::AvlTree;
    ///
    /// let mut tree = AvlTree::new();
    /// tree.insert(1, ["a", "b"]);
    /// tree.insert(2, ["c"]);
    /// assert_eq!(tree.len(), 2);
    /// ```
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the tree holds no keys.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns `true` if the tree holds at least one key.
    #[must_use]
    pub const fn is_populated(&self) -> bool {
        !self.is_empty()
    }

    /// Returns the height of the tree: 0 when empty, 1 for a single key.
    ///
    /// # Complexity
    ///
    /// O(1) - heights are cached per node.
    #[must_use]
    pub fn height(&self) -> usize {
        self.raw.height()
    }

    /// Returns the smallest key and its values.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::AvlTree;
    ///
    /// let tree = AvlTree::from([(2, 'b'), (1, 'a')]);
    /// assert_eq!(tree.first_key_value(), Some((&1, &['a'][..])));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    #[must_use]
    pub fn first_key_value(&self) -> Option<(&K, &[V])> {
        self.raw.first(Direction::Ascending).map(|id| self.raw.entry(id))
    }

    /// Returns the largest key and its values.
    ///
    /// # Complexity
    ///
    /// O(log n)
    #[must_use]
    pub fn last_key_value(&self) -> Option<(&K, &[V])> {
        self.raw.first(Direction::Descending).map(|id| self.raw.entry(id))
    }

    /// Removes and returns the smallest key and its values.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::AvlTree;
    ///
    /// let mut tree = AvlTree::from([(1, 'a'), (2, 'b'), (1, 'c')]);
    /// assert_eq!(tree.pop_first(), Some((1, vec!['a', 'c'])));
    /// assert_eq!(tree.pop_first(), Some((2, vec!['b'])));
    /// assert_eq!(tree.pop_first(), None);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn pop_first(&mut self) -> Option<(K, Vec<V>)> {
        self.raw.pop(Direction::Ascending).map(|(key, values)| (key, values.into_vec()))
    }

    /// Removes and returns the largest key and its values.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn pop_last(&mut self) -> Option<(K, Vec<V>)> {
        self.raw.pop(Direction::Descending).map(|(key, values)| (key, values.into_vec()))
    }

    /// Removes every key, keeping the allocated node storage.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::AvlTree;
    ///
    /// let mut tree = AvlTree::from([(1, "a")]);
    /// tree.clear();
    /// assert!(!tree.is_populated());
    /// ```
    pub fn clear(&mut self) {
        debug!(len = self.raw.len(), "clearing tree");
        self.raw.clear();
    }

    /// Gets an iterator over the entries of the tree in ascending key order.
    ///
    /// Same as `entries(Direction::Ascending, None)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::AvlTree;
    ///
    /// let tree = AvlTree::from([(3, 'c'), (1, 'a'), (2, 'b')]);
    /// let keys: Vec<_> = tree.iter().map(|(k, _)| *k).collect();
    /// assert_eq!(keys, [1, 2, 3]);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n) to create the iterator; amortized O(1) per step.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            raw: &self.raw,
            direction: Direction::Ascending,
            current: self.raw.first(Direction::Ascending),
        }
    }
}

impl<K, V, C: Comparator<K>> AvlTree<K, V, C> {
    /// Builds a tree from `(key, values)` pairs by inserting them in order.
    ///
    /// A key that appears more than once gets the values of every occurrence,
    /// earliest first. Pairs with no values are skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::{AvlTree, NaturalOrder};
    ///
    /// let tree = AvlTree::from_entries(NaturalOrder, [(2, vec!['x']), (1, vec![]), (2, vec!['y', 'z'])]);
    /// assert_eq!(tree.len(), 1);
    /// assert_eq!(tree.get(&2), Some((&2, &['x', 'y', 'z'][..])));
    /// ```
    pub fn from_entries<E, I>(comparator: C, entries: E) -> Self
    where
        E: IntoIterator<Item = (K, I)>,
        I: IntoIterator<Item = V>,
    {
        let mut tree = Self::with_comparator(comparator);
        for (key, values) in entries {
            tree.insert(key, values);
        }
        tree
    }

    /// Returns the stored key equal to `key` and its values.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::AvlTree;
    ///
    /// let mut tree = AvlTree::new();
    /// tree.push(1, "a");
    /// assert_eq!(tree.get(&1), Some((&1, &["a"][..])));
    /// assert_eq!(tree.get(&2), None);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn get(&self, key: &K) -> Option<(&K, &[V])> {
        self.raw.find(&self.comparator, key).map(|id| self.raw.entry(id))
    }

    /// Returns the values stored under `key` for in-place modification.
    ///
    /// The list itself cannot grow or shrink through this reference; use
    /// [`insert`](Self::insert) or [`remove`](Self::remove) for that.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::AvlTree;
    ///
    /// let mut tree = AvlTree::from([(1, 10), (1, 20)]);
    /// if let Some(values) = tree.get_mut(&1) {
    ///     values.iter_mut().for_each(|v| *v += 1);
    /// }
    /// assert_eq!(tree.get(&1), Some((&1, &[11, 21][..])));
    /// ```
    pub fn get_mut(&mut self, key: &K) -> Option<&mut [V]> {
        self.raw.values_mut(&self.comparator, key)
    }

    /// Returns `true` if the tree holds `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        self.raw.find(&self.comparator, key).is_some()
    }

    /// Looks up `key`, settling for its nearest neighbor when it is absent.
    ///
    /// An exact match is returned whatever the `mode`. Otherwise
    /// [`SearchMode::ClosestMax`] returns the smallest key greater than `key`
    /// and [`SearchMode::ClosestMin`] the largest key less than it. `None`
    /// means there is no key on that side.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::{AvlTree, SearchMode};
    ///
    /// let tree = AvlTree::from([(2, ()), (4, ()), (6, ())]);
    /// let key = |k, mode| tree.search(&k, mode).map(|(k, _)| *k);
    ///
    /// assert_eq!(key(3, SearchMode::ClosestMax), Some(4));
    /// assert_eq!(key(3, SearchMode::ClosestMin), Some(2));
    /// assert_eq!(key(6, SearchMode::ClosestMax), Some(6));
    /// assert_eq!(key(7, SearchMode::ClosestMax), None);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn search(&self, key: &K, mode: SearchMode) -> Option<(&K, &[V])> {
        self.raw.search(&self.comparator, key, mode).map(|id| self.raw.entry(id))
    }

    /// Appends `values` to the list stored under `key`, creating the key if
    /// it is new.
    ///
    /// Returns `true` if the key was not present before. An empty `values`
    /// leaves the tree untouched and returns `false`.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::AvlTree;
    ///
    /// let mut tree = AvlTree::new();
    /// assert!(tree.insert("k", ["a"]));
    /// assert!(!tree.insert("k", ["b", "c"]));
    /// assert!(!tree.insert("j", []));
    /// assert_eq!(tree.get(&"k"), Some((&"k", &["a", "b", "c"][..])));
    /// assert!(!tree.contains_key(&"j"));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n), with at most one single or double rotation.
    pub fn insert<I>(&mut self, key: K, values: I) -> bool
    where
        I: IntoIterator<Item = V>,
    {
        let values: Values<V> = values.into_iter().collect();
        if values.is_empty() {
            return false;
        }
        self.raw.insert(&self.comparator, key, values)
    }

    /// Appends a single value under `key`. Returns `true` if the key is new.
    pub fn push(&mut self, key: K, value: V) -> bool {
        self.raw.insert(&self.comparator, key, smallvec::smallvec![value])
    }

    /// Removes `key` from the tree, returning every value it held.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::AvlTree;
    ///
    /// let mut tree = AvlTree::from([(1, "a"), (1, "b")]);
    /// assert_eq!(tree.remove(&1), Some(vec!["a", "b"]));
    /// assert_eq!(tree.remove(&1), None);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n). Unlike insertion, a removal may rotate at every level on the
    /// way back to the root.
    pub fn remove(&mut self, key: &K) -> Option<Vec<V>> {
        self.remove_entry(key).map(|(_, values)| values)
    }

    /// Removes `key` from the tree, returning the stored key and its values.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, Vec<V>)> {
        self.raw.remove(&self.comparator, key).map(|(key, values)| (key, values.into_vec()))
    }

    /// Gets an iterator over the entries in `direction`.
    ///
    /// Without a `start` key the walk begins at the smallest key
    /// ([`Direction::Ascending`]) or the largest ([`Direction::Descending`]).
    /// With one, it begins at `start` itself if present, and otherwise at
    /// the nearest key that lies ahead in the walk direction.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::{AvlTree, Direction};
    ///
    /// let tree = AvlTree::from([(10, ()), (20, ()), (30, ())]);
    /// let keys = |direction, start| tree.entries(direction, start).map(|(k, _)| *k).collect::<Vec<_>>();
    ///
    /// assert_eq!(keys(Direction::Ascending, Some(&15)), [20, 30]);
    /// assert_eq!(keys(Direction::Descending, Some(&15)), [10]);
    /// assert_eq!(keys(Direction::Descending, Some(&20)), [20, 10]);
    /// assert!(keys(Direction::Ascending, Some(&31)).is_empty());
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n) to create the iterator; amortized O(1) per step.
    pub fn entries(&self, direction: Direction, start: Option<&K>) -> Iter<'_, K, V> {
        let current = match start {
            None => self.raw.first(direction),
            Some(start) => {
                let mode = match direction {
                    Direction::Ascending => SearchMode::ClosestMax,
                    Direction::Descending => SearchMode::ClosestMin,
                };
                self.raw.search(&self.comparator, start, mode)
            }
        };
        Iter {
            raw: &self.raw,
            direction,
            current,
        }
    }

    /// Verifies every structural invariant of the tree.
    ///
    /// Checks that keys are strictly ordered, that every node is balanced,
    /// that parent links agree with child links, that cached heights are
    /// exact and that no key holds an empty value list. This walks the whole
    /// tree and is meant for tests, not for regular use.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::AvlTree;
    ///
    /// let tree: AvlTree<_, _> = (0..100).map(|k| (k, k)).collect();
    /// assert_eq!(tree.check_invariants(), Ok(()));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(n)
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        self.raw.check_invariants(&self.comparator)
    }
}

impl<K: Clone, V: Clone, C: Clone> Clone for AvlTree<K, V, C> {
    fn clone(&self) -> Self {
        AvlTree {
            raw: self.raw.clone(),
            comparator: self.comparator.clone(),
        }
    }
}

// Equal trees hold the same keys with the same values in the same order;
// the comparator is not compared.
impl<K: PartialEq, V: PartialEq, C> PartialEq for AvlTree<K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq, C> Eq for AvlTree<K, V, C> {}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for AvlTree<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, C: Default> Default for AvlTree<K, V, C> {
    fn default() -> Self {
        AvlTree::with_comparator(C::default())
    }
}

impl<K, V, C: Comparator<K> + Default> FromIterator<(K, V)> for AvlTree<K, V, C> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut tree = AvlTree::default();
        tree.extend(iter);
        tree
    }
}

impl<K, V, C: Comparator<K>> Extend<(K, V)> for AvlTree<K, V, C> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.push(key, value);
        }
    }
}

impl<K: Ord, V, const N: usize> From<[(K, V); N]> for AvlTree<K, V> {
    fn from(arr: [(K, V); N]) -> Self {
        arr.into_iter().collect()
    }
}

impl<'a, K, V, C> IntoIterator for &'a AvlTree<K, V, C> {
    type Item = (&'a K, &'a [V]);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V> Iter<'a, K, V> {
    /// Returns the entry the next call to `next` will yield, without advancing.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::AvlTree;
    ///
    /// let tree = AvlTree::from([(1, 'a')]);
    /// let mut iter = tree.iter();
    /// assert_eq!(iter.peek(), Some((&1, &['a'][..])));
    /// iter.next();
    /// assert_eq!(iter.peek(), None);
    /// ```
    #[must_use]
    pub fn peek(&self) -> Option<(&'a K, &'a [V])> {
        self.current.map(|id| self.raw.entry(id))
    }

    /// Returns the direction this iterator walks in.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a [V]);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.raw.step(id, self.direction);
        Some(self.raw.entry(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.current {
            Some(_) => (1, Some(self.raw.len())),
            None => (0, Some(0)),
        }
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            raw: self.raw,
            direction: self.direction,
            current: self.current,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("direction", &self.direction)
            .field("current", &self.peek())
            .finish()
    }
}
