use thiserror::Error;

/// A broken structural invariant, reported by
/// [`AvlTree::check_invariants`](crate::AvlTree::check_invariants).
///
/// `depth` counts edges from the root, so the root itself is at depth 0.
/// Any of these is a bug in the tree or a comparator that is not a strict
/// total order.
#[derive(Error, Clone, Copy, Debug, Eq, PartialEq)]
pub enum InvariantViolation {
    /// A key is not strictly between the bounds its ancestors impose.
    #[error("key at depth {depth} is out of order with an ancestor")]
    Unordered { depth: usize },

    /// The subtree heights under a node differ by more than one.
    #[error("node at depth {depth} has balance factor {balance}")]
    Unbalanced { depth: usize, balance: i16 },

    /// A child does not point back at the node that links to it.
    #[error("node at depth {depth} has a parent link that disagrees with the tree shape")]
    BrokenParentLink { depth: usize },

    /// The cached height of a node does not match its children.
    #[error("node at depth {depth} caches height {cached} but has height {actual}")]
    StaleHeight { depth: usize, cached: u8, actual: u8 },

    /// A reachable node holds no values.
    #[error("node at depth {depth} holds no values")]
    EmptyValues { depth: usize },

    /// The number of reachable nodes differs from the number of stored nodes.
    #[error("{reachable} nodes are reachable from the root but {stored} are stored")]
    LengthMismatch { reachable: usize, stored: usize },
}
