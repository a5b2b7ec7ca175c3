use crate::backoff::Backoff;
use crate::invariants::{debug_assert_bounded_count, debug_assert_slot_claimed};
use crate::{Queue, QueueError};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

// =============================================================================
// RESERVE-COMMIT PROTOCOL
// =============================================================================
//
// A fixed array of slots, each carrying its own sequence number. `head` and
// `tail` are free-running positions; the slot for position `p` is
// `buffer[p & mask]`.
//
// Slot states, for a slot at buffer index `i` on lap `k` (position
// `p = k * capacity + i`):
//
//   sequence == p       free, waiting for the producer of position p
//   sequence == p + 1   occupied, waiting for the consumer of position p
//
// A producer CASes `tail` from `p` to `p + 1` to *reserve* the slot, writes
// the value, then *commits* by storing `sequence = p + 1` with Release. A
// consumer that loaded `sequence == p + 1` with Acquire therefore sees the
// completed write; one that arrives between reserve and commit observes the
// old sequence and backs off. Consuming mirrors this: reserve via CAS on
// `head`, read the value, release the slot for the next lap with
// `sequence = p + capacity`.
//
// This closes the publish-before-write race of the naive two-index ring: an
// index advance alone never exposes a slot; only the per-slot commit does.
//
// =============================================================================

#[derive(Debug)]
struct Slot<T> {
    sequence: AtomicUsize,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// Bounded lock-free MPMC ring.
///
/// Capacity is rounded up to a power of two (minimum 2). `try_push` reports
/// full with `Err(value)`; there is no blocking form. Linearizable per-slot;
/// `len()` is approximate between two racing index loads.
#[derive(Debug)]
pub struct RingQueue<T> {
    buffer: Box<[Slot<T>]>,
    mask: usize,
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
}

// Safety: slots are handed off producer->consumer through the Release commit
// and Acquire claim on their sequence number.
unsafe impl<T: Send> Send for RingQueue<T> {}
unsafe impl<T: Send> Sync for RingQueue<T> {}

impl<T> RingQueue<T> {
    /// Creates a ring holding at least `capacity` elements.
    ///
    /// Fails with [`QueueError::CapacityTooSmall`] below 2; rounds up to the
    /// next power of two otherwise.
    pub fn with_capacity(capacity: usize) -> Result<Self, QueueError> {
        if capacity < 2 {
            return Err(QueueError::CapacityTooSmall { min: 2 });
        }
        let capacity = capacity.next_power_of_two();
        let buffer = (0..capacity)
            .map(|i| Slot {
                sequence: AtomicUsize::new(i),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect();
        Ok(Self {
            buffer,
            mask: capacity - 1,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        })
    }

    /// Usable capacity (the rounded-up power of two).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

impl<T: Send> Queue<T> for RingQueue<T> {
    fn try_push(&self, value: T) -> Result<(), T> {
        let mut backoff = Backoff::new();
        let mut tail = self.tail.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[tail & self.mask];
            let seq = slot.sequence.load(Ordering::Acquire);
            let dif = seq.wrapping_sub(tail) as isize;

            if dif == 0 {
                // Slot free for this position: reserve it.
                match self.tail.compare_exchange_weak(
                    tail,
                    tail.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // Re-read after the reserve: the slot's sequence must
                        // not have moved between our observation and the CAS
                        // that serialized the claim.
                        debug_assert_slot_claimed!(slot.sequence.load(Ordering::Relaxed), tail);
                        // SAFETY: the reserve CAS gives this thread exclusive
                        // access to the slot until the commit below.
                        unsafe { (*slot.value.get()).write(value) };
                        slot.sequence.store(tail.wrapping_add(1), Ordering::Release);
                        return Ok(());
                    }
                    Err(current) => tail = current,
                }
            } else if dif < 0 {
                // The slot still holds the value from one lap ago: full.
                return Err(value);
            } else {
                tail = self.tail.load(Ordering::Relaxed);
            }
            backoff.spin();
        }
    }

    fn try_pop(&self) -> Option<T> {
        let mut backoff = Backoff::new();
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[head & self.mask];
            let seq = slot.sequence.load(Ordering::Acquire);
            let dif = seq.wrapping_sub(head.wrapping_add(1)) as isize;

            if dif == 0 {
                match self.head.compare_exchange_weak(
                    head,
                    head.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // Re-read after the reserve: only this thread may
                        // release the slot for the next lap, so the committed
                        // sequence must still be in place.
                        debug_assert_slot_claimed!(
                            slot.sequence.load(Ordering::Relaxed),
                            head.wrapping_add(1)
                        );
                        // SAFETY: the reserve CAS gives exclusive access; the
                        // Acquire load above saw the producer's commit.
                        let value = unsafe { (*slot.value.get()).assume_init_read() };
                        // Release the slot for the next lap.
                        slot.sequence
                            .store(head.wrapping_add(self.mask + 1), Ordering::Release);
                        return Some(value);
                    }
                    Err(current) => head = current,
                }
            } else if dif < 0 {
                // Producer for this position hasn't committed: empty.
                return None;
            } else {
                head = self.head.load(Ordering::Relaxed);
            }
            backoff.spin();
        }
    }

    /// Approximate between two racing index loads; clamped to capacity.
    fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        tail.wrapping_sub(head).min(self.capacity())
    }
}

impl<T> Drop for RingQueue<T> {
    fn drop(&mut self) {
        // Positions in [head, tail) hold committed values; &mut self rules
        // out half-reserved slots.
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        debug_assert_bounded_count!(tail, head, self.capacity());
        let mut pos = head;
        while pos != tail {
            let slot = &mut self.buffer[pos & self.mask];
            // SAFETY: committed and never consumed.
            unsafe { slot.value.get_mut().assume_init_drop() };
            pos = pos.wrapping_add(1);
        }
    }
}
