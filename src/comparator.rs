use core::cmp::Ordering;

/// A three-way comparison that defines the key order of an [`AvlTree`].
///
/// `Less`, `Equal` and `Greater` play the roles of LT, EQ and GT. The order
/// must be a strict total order (irreflexive, transitive, antisymmetric) and
/// must not change for the lifetime of the tree. Two keys comparing `Equal`
/// are the same entry. Breaking this contract is a logic error: the tree will
/// not cause undefined behavior, but lookups, iteration order and the
/// self-check may give meaningless results.
///
/// Every `Fn(&K, &K) -> Ordering` is a comparator, so closures work directly:
///
/// ```
/// use avl_multimap::AvlTree;
///
/// let mut by_len = AvlTree::with_comparator(|a: &&str, b: &&str| a.len().cmp(&b.len()));
/// by_len.push("pear", 1);
/// by_len.push("fig", 2);
/// by_len.push("plum", 3); // same length as "pear", so it joins that entry
///
/// assert_eq!(by_len.get(&"kiwi"), Some((&"pear", &[1, 3][..])));
/// ```
///
/// [`AvlTree`]: crate::AvlTree
pub trait Comparator<K: ?Sized> {
    /// Compares `a` against `b`.
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

impl<K: ?Sized, F> Comparator<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}

/// Orders keys by their [`Ord`] implementation. The default comparator.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct NaturalOrder;

impl<K: Ord + ?Sized> Comparator<K> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}
