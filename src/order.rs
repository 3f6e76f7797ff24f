/// The order in which an [`Iter`](crate::avl_tree::Iter) walks the keys.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Direction {
    /// Smallest key first.
    #[default]
    Ascending,
    /// Largest key first.
    Descending,
}

impl Direction {
    /// Returns the opposite direction.
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Direction::Ascending => Direction::Descending,
            Direction::Descending => Direction::Ascending,
        }
    }
}

/// Which bound [`AvlTree::search`](crate::AvlTree::search) settles for when
/// the key itself is absent.
///
/// An exact match always wins regardless of mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SearchMode {
    /// The largest key that compares less than the search key (the predecessor).
    ClosestMin,
    /// The smallest key that compares greater than the search key (the successor).
    ClosestMax,
}
