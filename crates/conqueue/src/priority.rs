use crate::{BlockingQueue, Queue, QueueError};
use std::collections::BinaryHeap;
use std::sync::{Condvar, Mutex};

/// Priority-ordered queue, optionally bounded.
///
/// A max-heap by `T`'s `Ord`: `pop` returns the greatest element first. Wrap
/// elements in [`core::cmp::Reverse`] for min-heap behavior. Ties between
/// equal elements are broken by heap sift order.
///
/// The top element is never exposed separately from its removal - `pop` and
/// `try_pop` are the fused inspect-and-take, so two consumers can never act
/// on the same observation.
///
/// `len()` is exact (read under the heap mutex).
#[derive(Debug)]
pub struct PriorityQueue<T: Ord> {
    heap: Mutex<BinaryHeap<T>>,
    max_size: Option<usize>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T: Ord> PriorityQueue<T> {
    /// Creates a queue with no capacity bound.
    pub fn unbounded() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            max_size: None,
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Creates a queue that holds at most `max_size` elements; `push` applies
    /// backpressure once full.
    pub fn bounded(max_size: usize) -> Result<Self, QueueError> {
        if max_size == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        Ok(Self {
            heap: Mutex::new(BinaryHeap::with_capacity(max_size)),
            max_size: Some(max_size),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        })
    }

    /// Space left before `push` blocks.
    ///
    /// Fails with [`QueueError::Unbounded`] when no bound was configured.
    pub fn remaining_capacity(&self) -> Result<usize, QueueError> {
        match self.max_size {
            Some(max) => Ok(max - self.heap.lock().unwrap().len()),
            None => Err(QueueError::Unbounded),
        }
    }
}

impl<T: Ord + Send> Queue<T> for PriorityQueue<T> {
    fn try_push(&self, value: T) -> Result<(), T> {
        let mut heap = self.heap.lock().unwrap();
        if let Some(max) = self.max_size {
            if heap.len() >= max {
                return Err(value);
            }
        }
        heap.push(value);
        drop(heap);
        self.not_empty.notify_one();
        Ok(())
    }

    fn try_pop(&self) -> Option<T> {
        let value = self.heap.lock().unwrap().pop();
        if value.is_some() {
            self.not_full.notify_one();
        }
        value
    }

    fn len(&self) -> usize {
        self.heap.lock().unwrap().len()
    }
}

impl<T: Ord + Send> BlockingQueue<T> for PriorityQueue<T> {
    fn push(&self, value: T) {
        let mut heap = self.heap.lock().unwrap();
        if let Some(max) = self.max_size {
            while heap.len() >= max {
                heap = self.not_full.wait(heap).unwrap();
            }
        }
        heap.push(value);
        drop(heap);
        self.not_empty.notify_one();
    }

    fn pop(&self) -> T {
        let mut heap = self.heap.lock().unwrap();
        loop {
            match heap.pop() {
                Some(value) => {
                    drop(heap);
                    self.not_full.notify_one();
                    return value;
                }
                None => heap = self.not_empty.wait(heap).unwrap(),
            }
        }
    }
}
