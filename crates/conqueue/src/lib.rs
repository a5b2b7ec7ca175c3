//! Conqueue - A Family of Thread-Safe Queues
//!
//! Reusable concurrency building blocks sharing one behavioral contract
//! ([`Queue`] / [`BlockingQueue`]), from the simplest mutex-guarded FIFO up to
//! lock-free and work-stealing structures:
//!
//! - [`CoarseQueue`]: one mutex, one condvar - the correctness baseline
//! - [`TwoLockQueue`]: disjoint head/tail locks for producer/consumer scaling
//! - [`Bounded`]: capacity + backpressure wrapper over any inner queue
//! - [`SegmentedQueue`]: per-segment locking, contention localized to the ends
//! - [`MsQueue`]: Michael-Scott lock-free FIFO with epoch reclamation
//! - [`RingQueue`]: bounded lock-free MPMC ring (per-slot sequence protocol)
//! - [`PriorityQueue`], [`DelayQueue`], [`BatchQueue`]
//! - [`HierarchicalQueue`]: per-worker heaps + global overflow + work stealing
//!
//! # Example
//!
//! ```
//! use conqueue_rs::{BlockingQueue, CoarseQueue, Queue};
//!
//! let queue = CoarseQueue::new();
//! queue.push(1);
//! queue.push(2);
//!
//! assert_eq!(queue.pop(), 1);
//! assert_eq!(queue.try_pop(), Some(2));
//! assert!(queue.is_empty());
//! ```
//!
//! Every variant documents whether `len()` is exact or approximate; lock-free
//! and hierarchical variants only promise an approximation.

mod backoff;
mod batch;
mod bounded;
mod coarse;
mod delay;
mod error;
mod hierarchical;
mod invariants;
mod linked;
mod ms_queue;
mod priority;
mod queue;
mod ring;
mod segmented;
mod stats;

pub use batch::BatchQueue;
pub use bounded::Bounded;
pub use coarse::CoarseQueue;
pub use delay::DelayQueue;
pub use error::QueueError;
pub use hierarchical::{HierConfig, HierarchicalQueue};
pub use linked::TwoLockQueue;
pub use ms_queue::MsQueue;
pub use priority::PriorityQueue;
pub use queue::{BlockingQueue, Queue};
pub use ring::RingQueue;
pub use segmented::SegmentedQueue;
pub use stats::StatsSnapshot;
