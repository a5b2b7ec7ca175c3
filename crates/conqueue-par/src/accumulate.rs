use crate::monoid::Monoid;
use crate::partition::{join_all, worker_count, DEFAULT_MIN_GRAIN};
use std::thread;

/// Parallel fold of `items` with `op`, starting from `init`.
///
/// The range is split into one contiguous block per worker; each worker folds
/// its block from `op.identity()`, and the partials are folded from `init` in
/// block order. With an associative operator the result equals the sequential
/// fold; with a non-associative one it is well-defined but may differ.
///
/// A panic in the operator is re-raised here after all workers have joined.
///
/// ```
/// use conqueue_par::{accumulate, Sum};
///
/// let data: Vec<u64> = (1..=10).collect();
/// assert_eq!(accumulate(&data, 0, &Sum), 55);
/// ```
pub fn accumulate<T, M>(items: &[T], init: T, op: &M) -> T
where
    T: Clone + Send + Sync,
    M: Monoid<T>,
{
    accumulate_with(items, init, op, DEFAULT_MIN_GRAIN, 0)
}

/// [`accumulate`] with an explicit grain and thread cap (`0` = hardware).
pub fn accumulate_with<T, M>(
    items: &[T],
    init: T,
    op: &M,
    min_grain: usize,
    max_threads: usize,
) -> T
where
    T: Clone + Send + Sync,
    M: Monoid<T>,
{
    let n = items.len();
    if n == 0 {
        return init;
    }

    let workers = worker_count(n, min_grain, max_threads);
    if workers <= 1 {
        return items
            .iter()
            .cloned()
            .fold(init, |acc, x| op.combine(acc, x));
    }

    let chunk = n.div_ceil(workers);
    let partials = thread::scope(|s| {
        let handles: Vec<_> = items
            .chunks(chunk)
            .map(|block| {
                s.spawn(move || {
                    block
                        .iter()
                        .cloned()
                        .fold(op.identity(), |acc, x| op.combine(acc, x))
                })
            })
            .collect();
        join_all(handles)
    });

    partials
        .into_iter()
        .fold(init, |acc, partial| op.combine(acc, partial))
}
