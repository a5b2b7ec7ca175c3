use crate::Queue;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// An element annotated with its absolute expiry on the monotonic clock.
struct Delayed<T> {
    value: T,
    expiry: Instant,
}

// The heap orders by expiry alone; payloads never take part in comparisons.
// `BinaryHeap` is a max-heap, so comparisons are reversed to surface the
// earliest expiry at the top.
impl<T> PartialEq for Delayed<T> {
    fn eq(&self, other: &Self) -> bool {
        self.expiry == other.expiry
    }
}

impl<T> Eq for Delayed<T> {}

impl<T> PartialOrd for Delayed<T> {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Delayed<T> {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other.expiry.cmp(&self.expiry)
    }
}

/// Queue whose elements become visible only after a per-element delay.
///
/// `push` stamps the element with `now + delay`; consumers receive elements
/// in expiry order, never before their expiry. Ties on identical expiries are
/// broken by heap sift order. `len()` is exact and counts unexpired elements
/// too.
pub struct DelayQueue<T> {
    heap: Mutex<BinaryHeap<Delayed<T>>>,
    available: Condvar,
}

impl<T> DelayQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            available: Condvar::new(),
        }
    }

    /// Inserts `value`, visible to consumers after `delay`.
    pub fn push(&self, value: T, delay: Duration) {
        let expiry = Instant::now() + delay;
        self.heap.lock().unwrap().push(Delayed { value, expiry });
        // A new element may move the earliest expiry forward; every waiter
        // must re-arm its deadline.
        self.available.notify_all();
    }

    /// Removes the earliest-expiring element, waiting for it to expire.
    pub fn pop(&self) -> T {
        let mut heap = self.heap.lock().unwrap();
        loop {
            let now = Instant::now();
            match heap.peek().map(|head| head.expiry) {
                None => heap = self.available.wait(heap).unwrap(),
                Some(expiry) if expiry <= now => {
                    // Fused inspect-and-take under the same lock hold.
                    if let Some(head) = heap.pop() {
                        return head.value;
                    }
                }
                Some(expiry) => {
                    heap = self.available.wait_timeout(heap, expiry - now).unwrap().0;
                }
            }
        }
    }

    /// Removes the earliest-expiring element only if it has already expired.
    pub fn try_pop(&self) -> Option<T> {
        let mut heap = self.heap.lock().unwrap();
        match heap.peek() {
            Some(head) if head.expiry <= Instant::now() => heap.pop().map(|d| d.value),
            _ => None,
        }
    }

    /// Time until the earliest element expires; zero if already expired,
    /// `None` when empty.
    pub fn next_delay(&self) -> Option<Duration> {
        let heap = self.heap.lock().unwrap();
        heap.peek()
            .map(|head| head.expiry.saturating_duration_since(Instant::now()))
    }

    /// Total elements held, expired or not.
    pub fn len(&self) -> usize {
        self.heap.lock().unwrap().len()
    }

    /// True when no elements are held at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for DelayQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The contract view: `try_push` applies a zero delay, `try_pop` yields only
/// expired elements.
impl<T: Send> Queue<T> for DelayQueue<T> {
    fn try_push(&self, value: T) -> Result<(), T> {
        self.push(value, Duration::ZERO);
        Ok(())
    }

    fn try_pop(&self) -> Option<T> {
        DelayQueue::try_pop(self)
    }

    fn len(&self) -> usize {
        DelayQueue::len(self)
    }
}
