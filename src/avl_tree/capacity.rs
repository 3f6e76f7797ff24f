use super::AvlTree;
use crate::comparator::NaturalOrder;
use crate::raw::RawAvlTree;

impl<K, V> AvlTree<K, V, NaturalOrder> {
    /// Creates an empty tree with node storage for at least `capacity` keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::AvlTree;
    ///
    /// let tree: AvlTree<i32, i32> = AvlTree::with_capacity(32);
    /// assert!(tree.is_empty());
    /// assert!(tree.capacity() >= 32);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(capacity) for memory allocation.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_comparator(capacity, NaturalOrder)
    }
}

impl<K, V, C> AvlTree<K, V, C> {
    /// Creates an empty tree ordered by `comparator`, with node storage for
    /// at least `capacity` keys.
    #[must_use]
    pub fn with_capacity_and_comparator(capacity: usize, comparator: C) -> Self {
        AvlTree {
            raw: RawAvlTree::with_capacity(capacity),
            comparator,
        }
    }

    /// Returns how many keys the tree can hold before its node storage grows.
    ///
    /// Values are stored with their key; a key holding more than one value
    /// allocates that list separately.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::AvlTree;
    ///
    /// let mut tree = AvlTree::with_capacity(4);
    /// let before = tree.capacity();
    /// tree.push(1, 'a');
    /// tree.push(2, 'b');
    /// assert_eq!(tree.capacity(), before);
    /// ```
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }
}
