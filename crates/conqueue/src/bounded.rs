use crate::{BlockingQueue, CoarseQueue, Queue, QueueError};
use std::marker::PhantomData;
use std::sync::{Condvar, Mutex};

/// Capacity and backpressure over any inner queue.
///
/// The wrapper mutex owns the authoritative size counter; the inner queue is
/// only ever touched while that counter proves the operation can succeed, so
/// `len()` and `is_empty()` are O(1) and exact regardless of the inner
/// variant. Producers park on `not_full`, consumers on `not_empty`.
#[derive(Debug)]
pub struct Bounded<T, Q: Queue<T> = CoarseQueue<T>> {
    inner: Q,
    max_size: usize,
    size: Mutex<usize>,
    not_full: Condvar,
    not_empty: Condvar,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send> Bounded<T, CoarseQueue<T>> {
    /// Creates a bounded FIFO over a [`CoarseQueue`].
    ///
    /// Fails with [`QueueError::ZeroCapacity`] when `max_size` is zero.
    pub fn new(max_size: usize) -> Result<Self, QueueError> {
        Self::over(CoarseQueue::new(), max_size)
    }
}

impl<T, Q: Queue<T>> Bounded<T, Q> {
    /// Wraps an existing queue. `inner` must be empty; the wrapper counter
    /// starts at zero and becomes the single source of truth.
    pub fn over(inner: Q, max_size: usize) -> Result<Self, QueueError> {
        if max_size == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        debug_assert!(inner.is_empty(), "wrapping a non-empty queue");
        Ok(Self {
            inner,
            max_size,
            size: Mutex::new(0),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            _marker: PhantomData,
        })
    }

    /// The capacity this queue was built with.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// Forwards to the inner queue under a size proof. The counter said the
    /// operation must succeed, so a refusal means the wrapper lost exclusive
    /// ownership of the inner queue.
    fn push_inner(&self, value: T) {
        if self.inner.try_push(value).is_err() {
            unreachable!("inner queue refused a push below capacity");
        }
    }

    fn pop_inner(&self) -> T {
        match self.inner.try_pop() {
            Some(value) => value,
            None => unreachable!("inner queue empty while the counter is positive"),
        }
    }
}

impl<T: Send, Q: Queue<T>> Queue<T> for Bounded<T, Q> {
    fn try_push(&self, value: T) -> Result<(), T> {
        let mut size = self.size.lock().unwrap();
        if *size >= self.max_size {
            return Err(value);
        }
        self.push_inner(value);
        *size += 1;
        drop(size);
        self.not_empty.notify_one();
        Ok(())
    }

    fn try_pop(&self) -> Option<T> {
        let mut size = self.size.lock().unwrap();
        if *size == 0 {
            return None;
        }
        let value = self.pop_inner();
        *size -= 1;
        drop(size);
        self.not_full.notify_one();
        Some(value)
    }

    fn len(&self) -> usize {
        *self.size.lock().unwrap()
    }
}

impl<T: Send, Q: Queue<T>> BlockingQueue<T> for Bounded<T, Q> {
    fn push(&self, value: T) {
        let mut size = self.size.lock().unwrap();
        while *size >= self.max_size {
            size = self.not_full.wait(size).unwrap();
        }
        self.push_inner(value);
        *size += 1;
        drop(size);
        self.not_empty.notify_one();
    }

    fn pop(&self) -> T {
        let mut size = self.size.lock().unwrap();
        while *size == 0 {
            size = self.not_empty.wait(size).unwrap();
        }
        let value = self.pop_inner();
        *size -= 1;
        drop(size);
        self.not_full.notify_one();
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TwoLockQueue;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(Bounded::<u32>::new(0).unwrap_err(), QueueError::ZeroCapacity);
    }

    #[test]
    fn test_backpressure_sequence() {
        let queue = Bounded::new(2).unwrap();

        queue.push('A');
        queue.push('B');
        assert!(queue.try_push('C').is_err());

        assert_eq!(queue.pop(), 'A');
        assert!(queue.try_push('C').is_ok());
        assert_eq!(queue.pop(), 'B');
        assert_eq!(queue.pop(), 'C');
        assert!(queue.is_empty());
    }

    #[test]
    fn test_push_blocks_until_space() {
        let queue = Arc::new(Bounded::new(1).unwrap());
        queue.push(1u32);

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(2))
        };

        // Give the producer a moment to park on not_full.
        thread::sleep(Duration::from_millis(20));
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.pop(), 1);
        producer.join().unwrap();
        assert_eq!(queue.pop(), 2);
    }

    #[test]
    fn test_size_never_exceeds_bound() {
        let queue = Arc::new(Bounded::over(TwoLockQueue::new(), 4).unwrap());
        let mut handles = Vec::new();

        for _ in 0..3 {
            let queue = Arc::clone(&queue);
            handles.push(thread::spawn(move || {
                for i in 0..200u32 {
                    queue.push(i);
                }
            }));
        }
        for _ in 0..3 {
            let queue = Arc::clone(&queue);
            handles.push(thread::spawn(move || {
                for _ in 0..200 {
                    queue.pop();
                    assert!(queue.len() <= 4);
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }
        assert!(queue.is_empty());
    }
}
