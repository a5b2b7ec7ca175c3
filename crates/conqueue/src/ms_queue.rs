use crate::backoff::Backoff;
use crate::Queue;
use crossbeam_epoch::{self as epoch, Atomic, Owned, Shared};
use crossbeam_utils::CachePadded;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Michael-Scott lock-free FIFO.
///
/// A singly-linked list with a sentinel between `head` and `tail`. Enqueuers
/// CAS the tail node's `next` link and then help the lagging `tail` pointer
/// forward; dequeuers CAS `head` over the sentinel. Linearizable; unbounded.
///
/// Reclamation is epoch-based: a dequeued sentinel is handed to
/// `crossbeam_epoch` and freed once no pinned thread can still hold a
/// reference to it.
///
/// `len()` is approximate - a relaxed counter, not a linearization point.
pub struct MsQueue<T> {
    head: CachePadded<Atomic<Node<T>>>,
    tail: CachePadded<Atomic<Node<T>>>,
    len: AtomicUsize,
}

struct Node<T> {
    /// Uninitialized in the sentinel, initialized everywhere else. A popped
    /// node becomes the new sentinel after its payload is moved out.
    value: MaybeUninit<T>,
    next: Atomic<Node<T>>,
}

// Safety: payloads cross threads exactly once (push to pop); the epoch layer
// keeps freed nodes out of reach of concurrent readers.
unsafe impl<T: Send> Send for MsQueue<T> {}
unsafe impl<T: Send> Sync for MsQueue<T> {}

impl<T> MsQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        let queue = Self {
            head: CachePadded::new(Atomic::null()),
            tail: CachePadded::new(Atomic::null()),
            len: AtomicUsize::new(0),
        };
        let sentinel = Owned::new(Node {
            value: MaybeUninit::uninit(),
            next: Atomic::null(),
        });
        unsafe {
            // No other thread can observe the queue during construction.
            let guard = epoch::unprotected();
            let sentinel = sentinel.into_shared(guard);
            queue.head.store(sentinel, Ordering::Relaxed);
            queue.tail.store(sentinel, Ordering::Relaxed);
        }
        queue
    }

    /// Appends `value` to the back of the queue.
    pub fn push(&self, value: T) {
        let guard = epoch::pin();
        let new = Owned::new(Node {
            value: MaybeUninit::new(value),
            next: Atomic::null(),
        })
        .into_shared(&guard);

        let mut backoff = Backoff::new();
        loop {
            let tail = self.tail.load(Ordering::Acquire, &guard);
            // SAFETY: tail is never null after construction and the guard
            // keeps the node alive.
            let t = unsafe { tail.deref() };
            let next = t.next.load(Ordering::Acquire, &guard);

            if next.is_null() {
                // tail looks current: try to link after it.
                if t.next
                    .compare_exchange(
                        Shared::null(),
                        new,
                        Ordering::Release,
                        Ordering::Relaxed,
                        &guard,
                    )
                    .is_ok()
                {
                    // Swing tail to the new node; a failure means someone
                    // helped already.
                    let _ = self.tail.compare_exchange(
                        tail,
                        new,
                        Ordering::Release,
                        Ordering::Relaxed,
                        &guard,
                    );
                    self.len.fetch_add(1, Ordering::Relaxed);
                    return;
                }
            } else {
                // tail lags behind the real last node: help it forward.
                let _ = self.tail.compare_exchange(
                    tail,
                    next,
                    Ordering::Release,
                    Ordering::Relaxed,
                    &guard,
                );
            }
            backoff.spin();
        }
    }
}

impl<T> Default for MsQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Queue<T> for MsQueue<T> {
    fn try_push(&self, value: T) -> Result<(), T> {
        self.push(value);
        Ok(())
    }

    fn try_pop(&self) -> Option<T> {
        let guard = epoch::pin();
        let mut backoff = Backoff::new();
        loop {
            let head = self.head.load(Ordering::Acquire, &guard);
            // SAFETY: head is never null; the guard pins the epoch.
            let h = unsafe { head.deref() };
            let next = h.next.load(Ordering::Acquire, &guard);
            // SAFETY: a non-null next is a fully initialized node published
            // by the Release CAS in push.
            let n = unsafe { next.as_ref() }?;

            if self
                .head
                .compare_exchange(head, next, Ordering::Release, Ordering::Relaxed, &guard)
                .is_ok()
            {
                // Keep tail off the node we are about to retire.
                let tail = self.tail.load(Ordering::Relaxed, &guard);
                if head == tail {
                    let _ = self.tail.compare_exchange(
                        tail,
                        next,
                        Ordering::Release,
                        Ordering::Relaxed,
                        &guard,
                    );
                }
                // SAFETY: we won the head CAS, so the old sentinel is ours to
                // retire and `n`'s payload is ours to move out; `n` is the
                // new sentinel and nobody else reads its value slot.
                unsafe {
                    guard.defer_destroy(head);
                    self.len.fetch_sub(1, Ordering::Relaxed);
                    return Some(n.value.assume_init_read());
                }
            }
            backoff.spin();
        }
    }

    /// Approximate: relaxed counter, not a linearization point.
    fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }
}

impl<T> Drop for MsQueue<T> {
    fn drop(&mut self) {
        // SAFETY: &mut self means no concurrent operations and no live
        // guards; walking with an unprotected guard is fine.
        unsafe {
            let guard = epoch::unprotected();
            let mut node = self.head.load(Ordering::Relaxed, guard);
            let mut is_sentinel = true;
            while !node.is_null() {
                let next = node.deref().next.load(Ordering::Relaxed, guard);
                let mut owned = node.into_owned();
                if !is_sentinel {
                    owned.value.assume_init_drop();
                }
                is_sentinel = false;
                drop(owned);
                node = next;
            }
        }
    }
}
