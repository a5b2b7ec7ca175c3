use crate::monoid::Monoid;
use crate::partition::{join_all, worker_count, DEFAULT_MIN_GRAIN};
use std::mem;
use std::thread;

/// Parallel inclusive scan, preceded by the identity element.
///
/// The output has `n + 1` entries: `out[0] == op.identity()` and
/// `out[i + 1] == op.combine(out[i], items[i])` for an associative operator.
///
/// Two passes: workers scan their blocks locally from the identity and report
/// block sums; block offsets are reduced sequentially; workers then fold
/// their offset into every element, with the first block left untouched.
///
/// ```
/// use conqueue_par::{prefix_scan, Sum};
///
/// assert_eq!(prefix_scan(&[1, 2, 3, 4, 5], &Sum), vec![0, 1, 3, 6, 10, 15]);
/// ```
pub fn prefix_scan<T, M>(items: &[T], op: &M) -> Vec<T>
where
    T: Clone + Send + Sync,
    M: Monoid<T>,
{
    prefix_scan_with(items, op, DEFAULT_MIN_GRAIN, 0)
}

/// [`prefix_scan`] with an explicit grain and thread cap (`0` = hardware).
pub fn prefix_scan_with<T, M>(items: &[T], op: &M, min_grain: usize, max_threads: usize) -> Vec<T>
where
    T: Clone + Send + Sync,
    M: Monoid<T>,
{
    let n = items.len();
    let workers = worker_count(n, min_grain, max_threads);
    if workers <= 1 {
        return sequential_scan(items, op);
    }

    let chunk = n.div_ceil(workers);

    // Pass 1: independent local scans, each seeded from the identity.
    let mut blocks: Vec<Vec<T>> = thread::scope(|s| {
        let handles: Vec<_> = items
            .chunks(chunk)
            .map(|block| {
                s.spawn(move || {
                    let mut acc = op.identity();
                    let mut scanned = Vec::with_capacity(block.len());
                    for x in block {
                        acc = op.combine(acc, x.clone());
                        scanned.push(acc.clone());
                    }
                    scanned
                })
            })
            .collect();
        join_all(handles)
    });

    // Offset reduction: the running combination of preceding block sums.
    let mut offsets = Vec::with_capacity(blocks.len());
    let mut running = op.identity();
    for block in &blocks {
        offsets.push(running.clone());
        if let Some(sum) = block.last() {
            running = op.combine(running, sum.clone());
        }
    }

    // Pass 2: fold each block's offset into its elements. Block 0's offset is
    // the identity, so it keeps its local result.
    thread::scope(|s| {
        let handles: Vec<_> = blocks
            .iter_mut()
            .zip(offsets.iter())
            .skip(1)
            .map(|(block, offset)| {
                s.spawn(move || {
                    for slot in block.iter_mut() {
                        let local = mem::replace(slot, op.identity());
                        *slot = op.combine(offset.clone(), local);
                    }
                })
            })
            .collect();
        join_all(handles);
    });

    let mut out = Vec::with_capacity(n + 1);
    out.push(op.identity());
    for block in blocks {
        out.extend(block);
    }
    out
}

fn sequential_scan<T, M>(items: &[T], op: &M) -> Vec<T>
where
    T: Clone,
    M: Monoid<T>,
{
    let mut out = Vec::with_capacity(items.len() + 1);
    let mut acc = op.identity();
    out.push(acc.clone());
    for x in items {
        acc = op.combine(acc, x.clone());
        out.push(acc.clone());
    }
    out
}
