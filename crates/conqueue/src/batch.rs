use crate::{BlockingQueue, Queue, QueueError};
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

const DEFAULT_MAX_BATCH: usize = 1024;
const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(100);

/// FIFO tuned for bursty producers: batch insertion and batch removal
/// amortize the lock and signaling cost over many elements.
///
/// `batch_pop` waits up to `max_wait` for anything to arrive, then takes up
/// to `max_batch` elements from the front, leaving the remainder. A timed-out
/// pop returns an empty vector. `len()` is exact.
#[derive(Debug)]
pub struct BatchQueue<T> {
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    max_batch: usize,
    max_wait: Duration,
}

impl<T> BatchQueue<T> {
    /// Creates a queue with the defaults: `max_batch = 1024`,
    /// `max_wait = 100 ms`.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_BATCH, DEFAULT_MAX_WAIT).unwrap()
    }

    /// Creates a queue with an explicit batch ceiling and default wait.
    ///
    /// Fails with [`QueueError::ZeroCapacity`] when `max_batch` is zero.
    pub fn with_config(max_batch: usize, max_wait: Duration) -> Result<Self, QueueError> {
        if max_batch == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        Ok(Self {
            items: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            max_batch,
            max_wait,
        })
    }

    /// The most elements a single batch pop will return.
    #[inline]
    pub fn max_batch(&self) -> usize {
        self.max_batch
    }

    /// Moves a whole burst in under one lock hold and one signal.
    pub fn batch_push(&self, batch: Vec<T>) {
        if batch.is_empty() {
            return;
        }
        let mut items = self.items.lock().unwrap();
        items.extend(batch);
        drop(items);
        // A burst can satisfy several waiters at once.
        self.not_empty.notify_all();
    }

    /// Waits up to the configured `max_wait`, then takes up to `max_batch`
    /// elements. Empty on timeout.
    pub fn batch_pop(&self) -> Vec<T> {
        self.batch_pop_for(self.max_wait)
    }

    /// Waits up to `wait`, then takes whatever is available (up to
    /// `max_batch`, possibly nothing).
    pub fn batch_pop_for(&self, wait: Duration) -> Vec<T> {
        let deadline = Instant::now() + wait;
        let mut items = self.items.lock().unwrap();
        while items.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            items = self.not_empty.wait_timeout(items, deadline - now).unwrap().0;
        }
        Self::take_front(&mut items, self.max_batch)
    }

    /// Non-blocking batch removal.
    pub fn try_batch_pop(&self) -> Vec<T> {
        let mut items = self.items.lock().unwrap();
        Self::take_front(&mut items, self.max_batch)
    }

    fn take_front(items: &mut VecDeque<T>, max_batch: usize) -> Vec<T> {
        let n = items.len().min(max_batch);
        items.drain(..n).collect()
    }
}

impl<T> Default for BatchQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Queue<T> for BatchQueue<T> {
    fn try_push(&self, value: T) -> Result<(), T> {
        self.items.lock().unwrap().push_back(value);
        self.not_empty.notify_one();
        Ok(())
    }

    fn try_pop(&self) -> Option<T> {
        self.items.lock().unwrap().pop_front()
    }

    fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}

impl<T: Send> BlockingQueue<T> for BatchQueue<T> {
    fn push(&self, value: T) {
        let _ = self.try_push(value);
    }

    fn pop(&self) -> T {
        let mut items = self.items.lock().unwrap();
        loop {
            match items.pop_front() {
                Some(value) => return value,
                None => items = self.not_empty.wait(items).unwrap(),
            }
        }
    }
}
