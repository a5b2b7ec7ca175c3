use crate::{BlockingQueue, Queue, QueueError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};

const DEFAULT_SEG_SIZE: usize = 64;

// =============================================================================
// SEGMENTED PROTOCOL
// =============================================================================
//
// The queue is an ordered run of fixed-size ring segments, addressed by a
// monotonically increasing segment index. `tail_seg` names the segment
// producers fill, `head_seg` the one consumers drain; each segment carries its
// own mutex, so once the run spans two segments producers and consumers stop
// sharing locks entirely.
//
// Index advancement:
// - producers advance `tail_seg` by CAS only after observing the tail segment
//   full under its lock;
// - consumers advance `head_seg` by CAS only after observing the head segment
//   empty under its lock, and only while `head_seg != tail_seg`.
//
// Both sides re-verify their index under the segment lock before acting; a
// producer that loses the race to an advance must not insert into a segment
// the head may already have passed, or the element would be stranded.
//
// The directory is a read-mostly `RwLock<Vec<_>>`. Segments are created
// lazily on first touch and retired (entry dropped) once `head_seg` has
// passed them; a straggler holding a stale index sees the `None` entry and
// reloads.
//
// =============================================================================

#[derive(Debug)]
struct SegmentState<T> {
    slots: Box<[Option<T>]>,
    start: usize,
    len: usize,
}

#[derive(Debug)]
struct Segment<T> {
    state: Mutex<SegmentState<T>>,
}

impl<T> Segment<T> {
    fn new(seg_size: usize) -> Self {
        let mut slots = Vec::with_capacity(seg_size);
        slots.resize_with(seg_size, || None);
        Self {
            state: Mutex::new(SegmentState {
                slots: slots.into_boxed_slice(),
                start: 0,
                len: 0,
            }),
        }
    }
}

impl<T> SegmentState<T> {
    fn push(&mut self, value: T) -> Result<(), T> {
        let cap = self.slots.len();
        if self.len == cap {
            return Err(value);
        }
        let idx = (self.start + self.len) % cap;
        debug_assert!(self.slots[idx].is_none(), "occupied slot inside the free region");
        self.slots[idx] = Some(value);
        self.len += 1;
        Ok(())
    }

    fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = self.slots[self.start].take();
        debug_assert!(value.is_some(), "empty slot inside the occupied region");
        self.start = (self.start + 1) % self.slots.len();
        self.len -= 1;
        value
    }
}

/// FIFO decomposed into fixed-size ring segments with per-segment locks.
///
/// Contention localizes to the producer and consumer ends once at least two
/// segments are live. FIFO holds within a segment and across segment
/// transitions; concurrent producers racing a tail advance may interleave at
/// segment granularity. `len()` is approximate - it sums per-segment sizes
/// under their own locks without a global snapshot.
#[derive(Debug)]
pub struct SegmentedQueue<T> {
    segments: RwLock<Vec<Option<Arc<Segment<T>>>>>,
    head_seg: AtomicUsize,
    tail_seg: AtomicUsize,
    seg_size: usize,
    /// Upper-bound element count for the sleep protocol, maintained under
    /// segment locks.
    count: AtomicUsize,
    sleep: Mutex<()>,
    not_empty: Condvar,
    waiting: AtomicUsize,
}

impl<T> SegmentedQueue<T> {
    /// Creates a queue with the default segment size (64 elements).
    pub fn new() -> Self {
        Self::with_segment_size(DEFAULT_SEG_SIZE).unwrap()
    }

    /// Creates a queue whose segments hold `seg_size` elements each.
    pub fn with_segment_size(seg_size: usize) -> Result<Self, QueueError> {
        if seg_size == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        Ok(Self {
            segments: RwLock::new(Vec::new()),
            head_seg: AtomicUsize::new(0),
            tail_seg: AtomicUsize::new(0),
            seg_size,
            count: AtomicUsize::new(0),
            sleep: Mutex::new(()),
            not_empty: Condvar::new(),
            waiting: AtomicUsize::new(0),
        })
    }

    /// Elements per segment.
    #[inline]
    pub fn segment_size(&self) -> usize {
        self.seg_size
    }

    /// Fetches the segment at `idx`, creating it (and any gap before it) on
    /// first touch. `None` means the segment was already retired; the caller
    /// holds a stale index and must reload.
    fn segment(&self, idx: usize) -> Option<Arc<Segment<T>>> {
        {
            let dir = self.segments.read().unwrap();
            if idx < dir.len() {
                return dir[idx].clone();
            }
        }
        let mut dir = self.segments.write().unwrap();
        while dir.len() <= idx {
            dir.push(Some(Arc::new(Segment::new(self.seg_size))));
        }
        dir[idx].clone()
    }

    /// Drops the directory entry for a segment the head has passed.
    fn retire(&self, idx: usize) {
        let mut dir = self.segments.write().unwrap();
        if idx < dir.len() {
            dir[idx] = None;
        }
    }

    fn wake_one(&self) {
        if self.waiting.load(Ordering::SeqCst) > 0 {
            // Taking the sleep mutex orders this notify after the waiter's
            // park, closing the check-then-wait window.
            drop(self.sleep.lock().unwrap());
            self.not_empty.notify_one();
        }
    }
}

impl<T> Default for SegmentedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Queue<T> for SegmentedQueue<T> {
    fn try_push(&self, value: T) -> Result<(), T> {
        let mut value = value;
        loop {
            let tail = self.tail_seg.load(Ordering::Acquire);
            let Some(seg) = self.segment(tail) else {
                // Retired segment: our tail snapshot is stale.
                continue;
            };

            {
                let mut state = seg.state.lock().unwrap();
                // Re-verify under the lock: inserting into a segment the tail
                // has left could strand the element behind the head.
                if self.tail_seg.load(Ordering::Acquire) != tail {
                    continue;
                }
                match state.push(value) {
                    Ok(()) => {
                        self.count.fetch_add(1, Ordering::SeqCst);
                        drop(state);
                        self.wake_one();
                        return Ok(());
                    }
                    Err(v) => value = v,
                }
            }

            // Segment full: move the tail on. Losing the race just means
            // another producer already did.
            let _ = self.tail_seg.compare_exchange(
                tail,
                tail + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
    }

    fn try_pop(&self) -> Option<T> {
        loop {
            let head = self.head_seg.load(Ordering::Acquire);
            let Some(seg) = self.segment(head) else {
                continue;
            };

            let advanced;
            {
                let mut state = seg.state.lock().unwrap();
                if self.head_seg.load(Ordering::Acquire) != head {
                    continue;
                }
                if let Some(value) = state.pop() {
                    self.count.fetch_sub(1, Ordering::SeqCst);
                    let drained = state.len == 0;
                    drop(state);
                    // Drained head segment with the tail elsewhere: hand the
                    // head to the next segment and retire this one.
                    if drained
                        && head != self.tail_seg.load(Ordering::Acquire)
                        && self
                            .head_seg
                            .compare_exchange(head, head + 1, Ordering::AcqRel, Ordering::Acquire)
                            .is_ok()
                    {
                        self.retire(head);
                    }
                    return Some(value);
                }
                // Empty head segment. Only an empty *final* segment means an
                // empty queue.
                if self.tail_seg.load(Ordering::Acquire) == head {
                    return None;
                }
                advanced = self
                    .head_seg
                    .compare_exchange(head, head + 1, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok();
            }
            if advanced {
                self.retire(head);
            }
        }
    }

    /// Approximate: per-segment sums under per-segment locks, no global
    /// snapshot.
    fn len(&self) -> usize {
        let head = self.head_seg.load(Ordering::Acquire);
        let tail = self.tail_seg.load(Ordering::Acquire);
        let mut total = 0;
        for idx in head..=tail {
            if let Some(seg) = {
                let dir = self.segments.read().unwrap();
                if idx < dir.len() { dir[idx].clone() } else { None }
            } {
                total += seg.state.lock().unwrap().len;
            }
        }
        total
    }
}

impl<T: Send> BlockingQueue<T> for SegmentedQueue<T> {
    fn push(&self, value: T) {
        let _ = self.try_push(value);
    }

    fn pop(&self) -> T {
        loop {
            if let Some(value) = self.try_pop() {
                return value;
            }
            let guard = self.sleep.lock().unwrap();
            self.waiting.fetch_add(1, Ordering::SeqCst);
            // Last-chance check: a push may have landed before the waiting
            // flag went up; SeqCst on both sides makes one of us see the
            // other.
            let guard = if self.count.load(Ordering::SeqCst) == 0 {
                self.not_empty.wait(guard).unwrap()
            } else {
                guard
            };
            self.waiting.fetch_sub(1, Ordering::SeqCst);
            drop(guard);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_zero_segment_size_rejected() {
        assert_eq!(
            SegmentedQueue::<u32>::with_segment_size(0).unwrap_err(),
            QueueError::ZeroCapacity
        );
    }

    #[test]
    fn test_fifo_within_and_across_segments() {
        // Tiny segments force several transitions.
        let queue = SegmentedQueue::with_segment_size(4).unwrap();
        for i in 0..20 {
            queue.push(i);
        }
        assert_eq!(queue.len(), 20);
        for i in 0..20 {
            assert_eq!(queue.try_pop(), Some(i));
        }
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_segments_are_retired() {
        let queue = SegmentedQueue::with_segment_size(2).unwrap();
        for i in 0..10 {
            queue.push(i);
        }
        for _ in 0..10 {
            queue.try_pop();
        }
        let live = queue
            .segments
            .read()
            .unwrap()
            .iter()
            .filter(|s| s.is_some())
            .count();
        assert!(live <= 2, "{live} segments still live after a full drain");
    }

    #[test]
    fn test_no_loss_under_contention() {
        let queue = Arc::new(SegmentedQueue::with_segment_size(8).unwrap());
        let producers = 4u64;
        let per_producer = 1000u64;

        let mut handles = Vec::new();
        for p in 0..producers {
            let queue = Arc::clone(&queue);
            handles.push(thread::spawn(move || {
                for i in 0..per_producer {
                    queue.push(p * 100_000 + i);
                }
            }));
        }

        let mut consumers = Vec::new();
        for _ in 0..4 {
            let queue = Arc::clone(&queue);
            consumers.push(thread::spawn(move || {
                let mut taken = Vec::new();
                for _ in 0..per_producer {
                    taken.push(queue.pop());
                }
                taken
            }));
        }

        for h in handles {
            h.join().unwrap();
        }
        let mut all: Vec<u64> = consumers
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        let mut expected: Vec<u64> = (0..producers)
            .flat_map(|p| (0..per_producer).map(move |i| p * 100_000 + i))
            .collect();
        expected.sort_unstable();
        assert_eq!(all, expected);
    }
}
