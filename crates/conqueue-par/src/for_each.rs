use crate::partition::{join_all, worker_count, DEFAULT_MIN_GRAIN};
use conqueue_rs::{CoarseQueue, Queue};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;

/// Applies `f` to every element, statically partitioned.
///
/// The slice is split into one contiguous block per worker. A panic in `f`
/// lets the remaining workers finish their blocks, then re-raises at the call
/// site; elements already visited stay mutated.
pub fn for_each<T, F>(items: &mut [T], f: F)
where
    T: Send,
    F: Fn(&mut T) + Sync,
{
    for_each_with(items, f, DEFAULT_MIN_GRAIN, 0);
}

/// [`for_each`] with an explicit grain and thread cap (`0` = hardware).
pub fn for_each_with<T, F>(items: &mut [T], f: F, min_grain: usize, max_threads: usize)
where
    T: Send,
    F: Fn(&mut T) + Sync,
{
    let n = items.len();
    if n == 0 {
        return;
    }
    let workers = worker_count(n, min_grain, max_threads);
    if workers <= 1 {
        for x in items {
            f(x);
        }
        return;
    }

    let chunk = n.div_ceil(workers);
    let f = &f;
    thread::scope(|s| {
        let handles: Vec<_> = items
            .chunks_mut(chunk)
            .map(|block| {
                s.spawn(move || {
                    for x in block {
                        f(x);
                    }
                })
            })
            .collect();
        join_all(handles);
    });
}

/// Applies `f` to every element, dynamically partitioned.
///
/// Grain-sized blocks go through a shared task queue and workers pull until
/// it drains, so uneven per-element cost balances across threads. On the
/// first panic the queue is drained and a cancel flag stops the other workers
/// at their next task boundary; the panic re-raises here after all workers
/// have joined.
pub fn for_each_dynamic<T, F>(items: &mut [T], f: F)
where
    T: Send,
    F: Fn(&mut T) + Sync,
{
    for_each_dynamic_with(items, f, DEFAULT_MIN_GRAIN, 0);
}

/// [`for_each_dynamic`] with an explicit grain and thread cap (`0` = hardware).
pub fn for_each_dynamic_with<T, F>(items: &mut [T], f: F, min_grain: usize, max_threads: usize)
where
    T: Send,
    F: Fn(&mut T) + Sync,
{
    let n = items.len();
    if n == 0 {
        return;
    }
    let workers = worker_count(n, min_grain, max_threads);
    if workers <= 1 {
        for x in items {
            f(x);
        }
        return;
    }

    let tasks: CoarseQueue<&mut [T]> = CoarseQueue::new();
    for block in items.chunks_mut(min_grain.max(1)) {
        let _ = tasks.try_push(block);
    }

    let failure = FirstPanic::new();
    thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(|| {
                while !failure.is_cancelled() {
                    let Some(block) = tasks.try_pop() else {
                        break;
                    };
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        for x in block {
                            f(x);
                        }
                    }));
                    if let Err(payload) = result {
                        failure.record(payload);
                        // Starve the other workers so nobody starts new work.
                        while tasks.try_pop().is_some() {}
                    }
                }
            });
        }
    });
    failure.rethrow_if_any();
}

/// First-panic-wins cell shared by the dynamic workers.
struct FirstPanic {
    cancelled: AtomicBool,
    slot: Mutex<Option<Box<dyn Any + Send>>>,
}

impl FirstPanic {
    fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            slot: Mutex::new(None),
        }
    }

    /// Checked at every task boundary.
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn record(&self, payload: Box<dyn Any + Send>) {
        let mut slot = self.slot.lock().unwrap();
        if slot.is_none() {
            *slot = Some(payload);
        }
        drop(slot);
        self.cancelled.store(true, Ordering::Release);
    }

    fn rethrow_if_any(self) {
        if let Some(payload) = self.slot.into_inner().unwrap() {
            panic::resume_unwind(payload);
        }
    }
}
