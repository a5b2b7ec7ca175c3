use crate::{BlockingQueue, Queue};
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// The baseline FIFO: one mutex over a `VecDeque`, one condition variable.
///
/// Unbounded, strictly FIFO on the serialization order of its lock, exact
/// `len()`. Every other variant in this crate trades some of this simplicity
/// for scalability; this one exists to be obviously correct.
#[derive(Debug)]
pub struct CoarseQueue<T> {
    items: Mutex<VecDeque<T>>,
    available: Condvar,
}

impl<T> CoarseQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    /// Creates an empty queue with room for `capacity` elements before the
    /// backing buffer reallocates. Purely an allocation hint; the queue stays
    /// unbounded.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            available: Condvar::new(),
        }
    }
}

impl<T> Default for CoarseQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Queue<T> for CoarseQueue<T> {
    fn try_push(&self, value: T) -> Result<(), T> {
        self.items.lock().unwrap().push_back(value);
        // One item in, one waiter woken. A waiter that loses the race to
        // another consumer re-checks its predicate and sleeps again.
        self.available.notify_one();
        Ok(())
    }

    fn try_pop(&self) -> Option<T> {
        self.items.lock().unwrap().pop_front()
    }

    fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}

impl<T: Send> BlockingQueue<T> for CoarseQueue<T> {
    fn push(&self, value: T) {
        // Unbounded: blocking push never actually waits.
        let _ = self.try_push(value);
    }

    fn pop(&self) -> T {
        let mut items = self.items.lock().unwrap();
        loop {
            match items.pop_front() {
                Some(value) => return value,
                None => items = self.available.wait(items).unwrap(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_smoke() {
        let queue = CoarseQueue::new();
        queue.push(1);
        queue.push(2);
        queue.push(3);

        assert_eq!(queue.pop(), 1);
        assert_eq!(queue.pop(), 2);
        assert_eq!(queue.pop(), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_try_pop_empty() {
        let queue: CoarseQueue<u32> = CoarseQueue::new();
        assert_eq!(queue.try_pop(), None);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_pop_blocks_until_push() {
        let queue = Arc::new(CoarseQueue::new());

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };

        // The consumer parks on the condvar until this lands.
        queue.push(7u32);
        assert_eq!(consumer.join().unwrap(), 7);
    }

    #[test]
    fn test_concurrent_producers() {
        let queue = Arc::new(CoarseQueue::new());
        let mut handles = Vec::new();

        for p in 0..4u64 {
            let queue = Arc::clone(&queue);
            handles.push(thread::spawn(move || {
                for i in 0..100u64 {
                    queue.push(p * 1000 + i);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let mut seen = Vec::new();
        while let Some(v) = queue.try_pop() {
            seen.push(v);
        }
        assert_eq!(seen.len(), 400);

        // Per-producer order survives interleaving.
        for p in 0..4u64 {
            let mine: Vec<_> = seen.iter().filter(|v| **v / 1000 == p).collect();
            assert!(mine.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
