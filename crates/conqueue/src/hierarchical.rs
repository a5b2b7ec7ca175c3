use crate::stats::{Stats, StatsSnapshot};
use crate::{BlockingQueue, Queue};
use std::any::Any;
use std::cell::RefCell;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::thread::{self, ThreadId};
use std::time::Duration;

// =============================================================================
// TIERED DESIGN
// =============================================================================
//
// Each worker thread owns a local max-heap; a shared global heap absorbs
// overflow. The hot path - push and pop on the owner's heap - takes only the
// local lock. Work becomes visible to other threads two ways:
//
// - a local heap that grows past `local_threshold` is drained wholesale into
//   the global heap;
// - idle workers steal up to `max_steal` elements from another thread's
//   local heap, discovered through the non-empty list.
//
// Lock order is `non_empty_list -> global -> local`, and a thread never holds
// two local locks at once (self-steal is filtered), so the hierarchy is
// deadlock-free by construction.
//
// The `non_empty` flag and the list membership change together under the list
// mutex. The flag is a hint: because a pusher publishes *after* releasing its
// heap lock (to respect the lock order), a listed heap can be transiently
// empty. Stealers unlist drained victims, and the timed wait in `pop` bounds
// the cost of any stale hint.
//
// Ordering contract: every pushed element is popped exactly once, and any pop
// returns the maximum of *some* visible non-empty subset (its own heap, the
// global heap, or one sampled victim). Strict global priority order is
// deliberately traded for scalability.
//
// =============================================================================

/// Tuning knobs for [`HierarchicalQueue`].
#[derive(Debug, Clone, Copy)]
pub struct HierConfig {
    /// Local heap size that triggers a drain into the global heap.
    ///
    /// Default: 100
    pub local_threshold: usize,

    /// Most elements one steal takes from a victim.
    ///
    /// Default: 10
    pub max_steal: usize,

    /// Upper bound on one blocking-wait interval; re-checks run at least this
    /// often even if a wakeup goes missing.
    ///
    /// Default: 100 ms
    pub wait_timeout: Duration,
}

impl Default for HierConfig {
    fn default() -> Self {
        Self {
            local_threshold: 100,
            max_steal: 10,
            wait_timeout: Duration::from_millis(100),
        }
    }
}

impl HierConfig {
    /// Sets the local-heap drain threshold.
    pub fn with_local_threshold(mut self, local_threshold: usize) -> Self {
        self.local_threshold = local_threshold;
        self
    }

    /// Sets the per-steal element budget.
    pub fn with_max_steal(mut self, max_steal: usize) -> Self {
        self.max_steal = max_steal;
        self
    }

    /// Sets the blocking-wait re-check interval.
    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }
}

struct LocalHeap<T> {
    heap: Mutex<BinaryHeap<T>>,
    /// Mirrors membership in the non-empty list; mutated only under the list
    /// mutex.
    non_empty: AtomicBool,
    owner: ThreadId,
}

struct Shared<T: Ord> {
    global: Mutex<BinaryHeap<T>>,
    global_cv: Condvar,
    /// Owns every live local heap, keyed by worker identity.
    registry: Mutex<HashMap<ThreadId, Arc<LocalHeap<T>>>>,
    /// Local heaps believed to hold work; stealers scan this.
    non_empty_list: Mutex<Vec<Arc<LocalHeap<T>>>>,
    /// List length mirror, readable without the list lock.
    listed: AtomicUsize,
    config: HierConfig,
    stats: Stats,
    /// Keys this instance's slot in thread-local storage.
    id: u64,
}

/// Work-stealing priority queue with per-worker local heaps.
///
/// A max-heap by `Ord` (wrap in [`core::cmp::Reverse`] for min-first).
/// Clonable handle; clones share the same queue. Each thread that touches the
/// queue gets a lazily registered local heap, drained back into the global
/// heap when the thread exits.
///
/// Not linearizable to a single heap: a pop returns the best element of the
/// tier it hit, not necessarily the global best. Every element is returned
/// exactly once. `len()` is approximate - per-heap sums without a global
/// snapshot.
pub struct HierarchicalQueue<T: Ord + Send + 'static> {
    shared: Arc<Shared<T>>,
}

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(0);

thread_local! {
    /// Per-thread registrations, keyed by queue instance id. Dropping an
    /// entry (at thread exit) drains that thread's local heap.
    static REGISTRATIONS: RefCell<HashMap<u64, Box<dyn Any>>> = RefCell::new(HashMap::new());
}

/// Held in thread-local storage; the registry keeps the strong side.
struct Registration<T: Ord + Send + 'static> {
    shared: Weak<Shared<T>>,
    local: Arc<LocalHeap<T>>,
}

impl<T: Ord + Send + 'static> Drop for Registration<T> {
    fn drop(&mut self) {
        // Owner exit: surviving work must not die with the thread.
        if let Some(shared) = self.shared.upgrade() {
            shared.drain_into_global(&self.local);
            shared.registry.lock().unwrap().remove(&self.local.owner);
            shared.global_cv.notify_one();
        }
    }
}

impl<T: Ord + Send + 'static> HierarchicalQueue<T> {
    /// Creates a queue with the default [`HierConfig`].
    pub fn new() -> Self {
        Self::with_config(HierConfig::default())
    }

    /// Creates a queue with explicit tuning.
    pub fn with_config(config: HierConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                global: Mutex::new(BinaryHeap::new()),
                global_cv: Condvar::new(),
                registry: Mutex::new(HashMap::new()),
                non_empty_list: Mutex::new(Vec::new()),
                listed: AtomicUsize::new(0),
                config,
                stats: Stats::new(),
                id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
            }),
        }
    }

    /// Operation counters since construction.
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// The calling thread's local heap, registered on first touch.
    fn local(&self) -> Arc<LocalHeap<T>> {
        REGISTRATIONS.with(|regs| {
            let mut regs = regs.borrow_mut();
            if let Some(entry) = regs.get(&self.shared.id) {
                if let Some(reg) = entry.downcast_ref::<Registration<T>>() {
                    return Arc::clone(&reg.local);
                }
            }

            let local = Arc::new(LocalHeap {
                heap: Mutex::new(BinaryHeap::new()),
                non_empty: AtomicBool::new(false),
                owner: thread::current().id(),
            });
            self.shared
                .registry
                .lock()
                .unwrap()
                .insert(local.owner, Arc::clone(&local));
            regs.insert(
                self.shared.id,
                Box::new(Registration {
                    shared: Arc::downgrade(&self.shared),
                    local: Arc::clone(&local),
                }),
            );
            local
        })
    }

    fn try_pop_with(&self, local: &Arc<LocalHeap<T>>) -> Option<T> {
        // Tier 1: own heap.
        if local.non_empty.load(Ordering::Acquire) {
            let (value, drained) = {
                let mut heap = local.heap.lock().unwrap();
                let value = heap.pop();
                let drained = heap.is_empty();
                (value, drained)
            };
            if value.is_some() {
                if drained {
                    self.shared.unlist_if_drained(local);
                }
                return value;
            }
            // Stale flag on our own empty heap: clear it here - stealers
            // skip the caller, so nobody else will.
            self.shared.unlist_if_drained(local);
        }

        // Tier 2: global heap.
        if let Some(value) = self.shared.global.lock().unwrap().pop() {
            return Some(value);
        }

        // Tier 3: steal.
        self.steal(local)
    }

    /// Scans the non-empty list for a victim and moves up to `max_steal`
    /// elements; the victim's best element is the return value, the rest land
    /// in the caller's heap.
    fn steal(&self, me: &Arc<LocalHeap<T>>) -> Option<T> {
        let candidates: Vec<Arc<LocalHeap<T>>> =
            self.shared.non_empty_list.lock().unwrap().clone();

        for victim in candidates {
            if Arc::ptr_eq(&victim, me) {
                continue;
            }

            let (stolen, victim_drained) = {
                let mut heap = victim.heap.lock().unwrap();
                let mut stolen = Vec::with_capacity(self.shared.config.max_steal);
                // Heap pops descend, so stolen[0] is the victim's best.
                for _ in 0..self.shared.config.max_steal {
                    match heap.pop() {
                        Some(v) => stolen.push(v),
                        None => break,
                    }
                }
                (stolen, heap.is_empty())
            };

            if victim_drained {
                self.shared.unlist_if_drained(&victim);
            }
            if stolen.is_empty() {
                continue;
            }
            self.shared.stats.add_steal(stolen.len() as u64);

            let mut stolen = stolen.into_iter();
            let best = stolen.next();
            let rest: Vec<T> = stolen.collect();
            if !rest.is_empty() {
                {
                    let mut heap = me.heap.lock().unwrap();
                    heap.extend(rest);
                }
                // The caller's heap just became work other threads can see.
                if !me.non_empty.load(Ordering::Acquire) {
                    self.shared.mark_listed(me);
                }
                self.shared.global_cv.notify_one();
            }
            return best;
        }
        None
    }
}

impl<T: Ord + Send + 'static> Default for HierarchicalQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord + Send + 'static> Clone for HierarchicalQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Ord + Send + 'static> Queue<T> for HierarchicalQueue<T> {
    fn try_push(&self, value: T) -> Result<(), T> {
        let local = self.local();
        let spill = {
            let mut heap = local.heap.lock().unwrap();
            heap.push(value);
            heap.len() > self.shared.config.local_threshold
        };
        self.shared.stats.add_push();

        // Publish after releasing the heap lock (list -> local order).
        if !local.non_empty.load(Ordering::Acquire) {
            self.shared.mark_listed(&local);
        }
        if spill {
            self.shared.spill(&local);
        }
        Ok(())
    }

    fn try_pop(&self) -> Option<T> {
        let local = self.local();
        let value = self.try_pop_with(&local);
        if value.is_some() {
            self.shared.stats.add_pop();
        }
        value
    }

    /// Approximate: global plus per-heap sums, each under its own lock, no
    /// global snapshot.
    fn len(&self) -> usize {
        let mut total = self.shared.global.lock().unwrap().len();
        let heaps: Vec<Arc<LocalHeap<T>>> = self
            .shared
            .registry
            .lock()
            .unwrap()
            .values()
            .cloned()
            .collect();
        for heap in heaps {
            total += heap.heap.lock().unwrap().len();
        }
        total
    }
}

impl<T: Ord + Send + 'static> BlockingQueue<T> for HierarchicalQueue<T> {
    fn push(&self, value: T) {
        let _ = self.try_push(value);
    }

    fn pop(&self) -> T {
        let local = self.local();
        loop {
            if let Some(value) = self.try_pop_with(&local) {
                self.shared.stats.add_pop();
                return value;
            }

            // Anything already visible? Re-try instead of parking. The hints
            // are read without the list lock; the timed wait below bounds the
            // damage of a stale one.
            if local.non_empty.load(Ordering::Acquire)
                || self.shared.listed.load(Ordering::Acquire) > 0
            {
                continue;
            }
            let global = self.shared.global.lock().unwrap();
            if !global.is_empty() {
                continue;
            }
            let _ = self
                .shared
                .global_cv
                .wait_timeout(global, self.shared.config.wait_timeout)
                .unwrap();
        }
    }
}

impl<T: Ord> Shared<T> {
    /// Adds `local` to the non-empty list unless already present. Flag and
    /// membership change together under the list mutex.
    fn mark_listed(&self, local: &Arc<LocalHeap<T>>) {
        let mut list = self.non_empty_list.lock().unwrap();
        if !local.non_empty.swap(true, Ordering::AcqRel) {
            list.push(Arc::clone(local));
            self.listed.fetch_add(1, Ordering::Release);
        }
    }

    /// Clears flag and membership if the heap is empty at re-check.
    fn unlist_if_drained(&self, local: &Arc<LocalHeap<T>>) {
        let mut list = self.non_empty_list.lock().unwrap();
        let empty = local.heap.lock().unwrap().is_empty();
        if empty && local.non_empty.swap(false, Ordering::AcqRel) {
            if let Some(pos) = list.iter().position(|h| Arc::ptr_eq(h, local)) {
                list.remove(pos);
                self.listed.fetch_sub(1, Ordering::Release);
            }
        }
    }

    /// Moves everything in `local` to the global heap and unlists it.
    /// Lock order: list -> global -> local.
    fn drain_into_global(&self, local: &Arc<LocalHeap<T>>) {
        let mut list = self.non_empty_list.lock().unwrap();
        let mut global = self.global.lock().unwrap();
        {
            let mut heap = local.heap.lock().unwrap();
            global.extend(heap.drain());
        }
        if local.non_empty.swap(false, Ordering::AcqRel) {
            if let Some(pos) = list.iter().position(|h| Arc::ptr_eq(h, local)) {
                list.remove(pos);
                self.listed.fetch_sub(1, Ordering::Release);
            }
        }
    }

    /// Threshold overflow: publish the local surplus and wake a waiter.
    fn spill(&self, local: &Arc<LocalHeap<T>>) {
        self.drain_into_global(local);
        self.stats.add_spill();
        self.global_cv.notify_one();
    }
}
