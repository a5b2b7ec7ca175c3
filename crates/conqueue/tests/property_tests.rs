//! Model-equivalence property tests.
//!
//! Each queue variant is driven by an arbitrary operation sequence alongside
//! a trivially correct reference model; observable behavior must match
//! exactly. These are single-threaded by construction - the multi-threaded
//! interleavings live in `queue_contract.rs`.

use conqueue_rs::{
    BatchQueue, Bounded, CoarseQueue, MsQueue, PriorityQueue, Queue, RingQueue, SegmentedQueue,
    TwoLockQueue,
};
use proptest::prelude::*;
use std::collections::VecDeque;
use std::time::Duration;

/// One step against a FIFO under test: push a value or pop one.
#[derive(Debug, Clone)]
enum Op {
    Push(u16),
    Pop,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => any::<u16>().prop_map(Op::Push),
        1 => Just(Op::Pop),
    ]
}

fn check_fifo_against_model<Q: Queue<u16>>(queue: &Q, ops: &[Op]) -> Result<(), TestCaseError> {
    let mut model: VecDeque<u16> = VecDeque::new();
    for op in ops {
        match op {
            Op::Push(v) => {
                prop_assert!(queue.try_push(*v).is_ok());
                model.push_back(*v);
            }
            Op::Pop => {
                prop_assert_eq!(queue.try_pop(), model.pop_front());
            }
        }
        prop_assert_eq!(queue.len(), model.len());
        prop_assert_eq!(queue.is_empty(), model.is_empty());
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_coarse_matches_model(ops in prop::collection::vec(op_strategy(), 1..200)) {
        check_fifo_against_model(&CoarseQueue::new(), &ops)?;
    }

    #[test]
    fn prop_two_lock_matches_model(ops in prop::collection::vec(op_strategy(), 1..200)) {
        check_fifo_against_model(&TwoLockQueue::new(), &ops)?;
    }

    #[test]
    fn prop_segmented_matches_model(
        ops in prop::collection::vec(op_strategy(), 1..200),
        seg_size in 1usize..9,
    ) {
        check_fifo_against_model(&SegmentedQueue::with_segment_size(seg_size).unwrap(), &ops)?;
    }

    #[test]
    fn prop_ms_queue_matches_model(ops in prop::collection::vec(op_strategy(), 1..200)) {
        check_fifo_against_model(&MsQueue::new(), &ops)?;
    }

    #[test]
    fn prop_ring_matches_bounded_model(
        ops in prop::collection::vec(op_strategy(), 1..200),
        capacity in 2usize..33,
    ) {
        let ring = RingQueue::with_capacity(capacity).unwrap();
        let cap = ring.capacity();
        let mut model: VecDeque<u16> = VecDeque::new();

        for op in &ops {
            match op {
                Op::Push(v) => {
                    if model.len() < cap {
                        prop_assert!(ring.try_push(*v).is_ok());
                        model.push_back(*v);
                    } else {
                        prop_assert_eq!(ring.try_push(*v), Err(*v));
                    }
                }
                Op::Pop => {
                    prop_assert_eq!(ring.try_pop(), model.pop_front());
                }
            }
            prop_assert!(ring.len() <= cap, "count exceeded capacity");
        }
    }

    #[test]
    fn prop_bounded_wrapper_matches_model(
        ops in prop::collection::vec(op_strategy(), 1..200),
        max_size in 1usize..17,
    ) {
        let queue = Bounded::new(max_size).unwrap();
        let mut model: VecDeque<u16> = VecDeque::new();

        for op in &ops {
            match op {
                Op::Push(v) => {
                    if model.len() < max_size {
                        prop_assert!(queue.try_push(*v).is_ok());
                        model.push_back(*v);
                    } else {
                        prop_assert_eq!(queue.try_push(*v), Err(*v));
                    }
                }
                Op::Pop => {
                    prop_assert_eq!(queue.try_pop(), model.pop_front());
                }
            }
            prop_assert!(queue.len() <= max_size);
        }
    }

    #[test]
    fn prop_priority_drains_sorted(values in prop::collection::vec(any::<u32>(), 0..200)) {
        let queue = PriorityQueue::unbounded();
        for v in &values {
            queue.push(*v);
        }

        let mut drained = Vec::with_capacity(values.len());
        while let Some(v) = queue.try_pop() {
            drained.push(v);
        }

        let mut expected = values.clone();
        expected.sort_unstable_by(|a, b| b.cmp(a));
        prop_assert_eq!(drained, expected);
    }

    #[test]
    fn prop_batch_pop_takes_front_in_order(
        values in prop::collection::vec(any::<u16>(), 0..300),
        max_batch in 1usize..64,
    ) {
        let queue = BatchQueue::with_config(max_batch, Duration::from_millis(1)).unwrap();
        queue.batch_push(values.clone());

        let mut drained = Vec::with_capacity(values.len());
        loop {
            let batch = queue.try_batch_pop();
            if batch.is_empty() {
                break;
            }
            prop_assert!(batch.len() <= max_batch);
            drained.extend(batch);
        }
        prop_assert_eq!(drained, values);
    }
}

use conqueue_rs::BlockingQueue;

proptest! {
    /// Pushing then draining through the blocking API preserves FIFO order.
    #[test]
    fn prop_blocking_pop_preserves_order(values in prop::collection::vec(any::<u16>(), 1..100)) {
        let queue = CoarseQueue::new();
        for v in &values {
            queue.push(*v);
        }
        for v in &values {
            prop_assert_eq!(queue.pop(), *v);
        }
    }
}
