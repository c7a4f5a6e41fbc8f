//! An order-statistic multi-map built on a red-black tree, for Rust.
//!
//! This crate provides [`RankedTree`], an ordered map from keys to *bags* of values.
//! Every node records how many values live in its subtree, which turns the tree
//! into an order-statistic structure over the flattened value sequence:
//!
//! - [`rank`](RankedTree::rank) - Position of a key's first value
//! - [`select`](RankedTree::select) - Values of the key covering a position
//! - Indexing by [`Rank`] - e.g., `tree[Rank(0)]` for the smallest key's values
//!
//! It also ships [`RunSorter`], a natural-run merge sort that stages its runs in a
//! `RankedTree` keyed by run length.
//!
//! # Example
//!
//! ```
//! use ranked_tree::{RankedTree, Rank};
//!
//! let mut tree = RankedTree::new();
//! tree.insert(1, "jeff");
//! tree.insert(1, "bob");
//! tree.insert(1, "barry");
//!
//! // Multiple values per key, in insertion order
//! assert_eq!(tree.find(&1), Some(&["jeff", "bob", "barry"][..]));
//!
//! // Delete removes a single (key, value) pair
//! assert!(tree.delete(&1, &"bob"));
//! tree.insert(2, "bob");
//! tree.insert(3, "garry");
//!
//! // Positions count values, not keys
//! assert_eq!(tree.rank(&2), Some(2));
//! assert_eq!(tree.select(3), Ok(&["garry"][..]));
//! assert_eq!(tree[Rank(0)], ["jeff", "barry"]);
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **Pluggable ordering** - Any [`compare::Compare`], including closures and reversed orders
//! - **O(log n) rank operations** - Subtree sizes are kept in values and repaired on every rotation
//!
//! # Implementation
//!
//! Nodes live in a slot arena and link to each other through small integer handles,
//! so the tree is free of `unsafe` and of reference-counted pointers. Insertion and
//! deletion follow the classic red-black repair cases with size bookkeeping folded
//! into each rotation.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod error;
mod order_statistic;
mod raw;

pub mod ranked_tree;
pub mod run_sort;

pub use error::{Error, Result};
pub use order_statistic::Rank;
pub use ranked_tree::RankedTree;
pub use run_sort::{RunSorter, run_sort};
