//! Data-Parallel Algorithms over the Conqueue Substrate
//!
//! Block-partitioned reductions and fork/join algorithms that spawn owned
//! scoped workers per call - no long-lived pool:
//!
//! - [`accumulate`]: parallel fold with an explicit-identity operator
//! - [`prefix_scan`]: two-pass inclusive scan, identity-prefixed output
//! - [`for_each`] / [`for_each_dynamic`]: static blocks vs. a shared task
//!   queue (a [`conqueue_rs::CoarseQueue`]) for uneven workloads
//! - [`merge_sort`]: stable fork/join sort with a thread budget
//!
//! Operators carry their identity through the [`Monoid`] trait ([`Sum`],
//! [`Product`], [`Concat`], or [`with_identity`] for ad-hoc closures) and
//! must be associative for results to match the sequential algorithms.
//!
//! # Failure semantics
//!
//! All-or-nothing: a panic in user code cancels the computation, every
//! spawned worker is joined, and the first captured payload re-raises at the
//! call site. Mutations already applied to the input are not rolled back.
//!
//! # Example
//!
//! ```
//! use conqueue_par::{accumulate, prefix_scan, Sum};
//!
//! let data: Vec<u64> = (1..=10).collect();
//! assert_eq!(accumulate(&data, 0, &Sum), 55);
//! assert_eq!(prefix_scan(&[1, 2, 3], &Sum), vec![0, 1, 3, 6]);
//! ```

mod accumulate;
mod for_each;
mod merge_sort;
mod monoid;
mod partition;
mod prefix;

pub use accumulate::{accumulate, accumulate_with};
pub use for_each::{for_each, for_each_dynamic, for_each_dynamic_with, for_each_with};
pub use merge_sort::{merge_sort, merge_sort_with};
pub use monoid::{with_identity, Concat, Monoid, OpWith, Product, Sum};
pub use prefix::{prefix_scan, prefix_scan_with};
