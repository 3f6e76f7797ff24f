//! A height-balanced ordered multi-map for Rust.
//!
//! [`AvlTree`] maps each key to an ordered list of values and keeps its keys
//! in an AVL tree, ordered by a user-supplied [`Comparator`]. On top of the
//! usual map operations it offers:
//!
//! - [`search`](AvlTree::search) - nearest-match lookup that falls back to the
//!   closest smaller or larger key ([`SearchMode`])
//! - [`entries`](AvlTree::entries) - a cursor that walks in either
//!   [`Direction`], optionally starting from an arbitrary key
//! - [`check_invariants`](AvlTree::check_invariants) - an explicit structural
//!   self-check for tests
//!
//! # Example
//!
//! ```
//! use avl_multimap::{AvlTree, Direction, SearchMode};
//!
//! let mut schedule = AvlTree::new();
//! schedule.insert(900, ["standup"]);
//! schedule.insert(1300, ["lunch", "walk"]);
//! schedule.insert(900, ["coffee"]);
//!
//! assert_eq!(schedule.get(&900), Some((&900, &["standup", "coffee"][..])));
//!
//! // What is next after 10:00?
//! let (at, what) = schedule.search(&1000, SearchMode::ClosestMax).unwrap();
//! assert_eq!((*at, what), (1300, &["lunch", "walk"][..]));
//!
//! // Everything up to 13:00, latest first.
//! let times: Vec<_> = schedule.entries(Direction::Descending, Some(&1300)).map(|(at, _)| *at).collect();
//! assert_eq!(times, [1300, 900]);
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`
//! - **Arena storage** - Nodes live in one slab and link to each other by index;
//!   parent links are plain indices used only for walking upwards
//! - **Cached heights** - Rotations refresh only the nodes they touch
//!
//! # Implementation
//!
//! Mutations recurse from the root and return the (possibly rotated) root of
//! each subtree to its parent. Insertion performs at most one single or double
//! rotation; removal may rotate at every ancestor of the removed node.

#![no_std]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod comparator;
mod error;
mod order;
mod raw;

pub mod avl_tree;

pub use avl_tree::AvlTree;
pub use comparator::{Comparator, NaturalOrder};
pub use error::InvariantViolation;
pub use order::{Direction, SearchMode};
