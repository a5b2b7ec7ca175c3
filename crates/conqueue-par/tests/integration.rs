//! End-to-end scenarios for the parallel algorithm layer.

use conqueue_par::{
    accumulate, accumulate_with, for_each, for_each_dynamic, for_each_dynamic_with, merge_sort,
    merge_sort_with, prefix_scan, with_identity, Concat, Product, Sum,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn accumulate_sum_and_product_scenarios() {
    let one_to_ten: Vec<u64> = (1..=10).collect();
    assert_eq!(accumulate(&one_to_ten, 0, &Sum), 55);
    assert_eq!(accumulate(&[2u64, 3, 4, 5], 1, &Product), 120);
}

#[test]
fn accumulate_associative_matches_sequential() {
    let data: Vec<i64> = (0..50_000).map(|i| (i * 7) % 1_001 - 500).collect();
    let sequential: i64 = data.iter().sum();
    // Several partition shapes must all agree with the sequential fold.
    for threads in [0, 1, 2, 5, 16] {
        assert_eq!(accumulate_with(&data, 0, &Sum, 25, threads), sequential);
    }
}

#[test]
fn accumulate_float_within_tolerance() {
    let data: Vec<f64> = (1..=10_000).map(|i| 1.0 / f64::from(i)).collect();
    let sequential: f64 = data.iter().sum();
    let parallel = accumulate(&data, 0.0, &Sum);
    // Non-associativity of float addition: equal up to rounding, not bitwise.
    assert!((parallel - sequential).abs() < 1e-9);
}

#[test]
fn prefix_scan_scenarios() {
    assert_eq!(prefix_scan(&[1, 2, 3, 4, 5], &Sum), vec![0, 1, 3, 6, 10, 15]);

    let words: Vec<String> = ["Hello", " ", "World", "!"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(
        prefix_scan(&words, &Concat),
        vec![
            String::new(),
            "Hello".to_string(),
            "Hello ".to_string(),
            "Hello World".to_string(),
            "Hello World!".to_string(),
        ]
    );
}

#[test]
fn prefix_scan_recurrence_on_large_input() {
    let data: Vec<u64> = (0..20_000).map(|i| i % 13).collect();
    let out = prefix_scan(&data, &Sum);
    assert_eq!(out.len(), data.len() + 1);
    assert_eq!(out[0], 0);
    for i in 0..data.len() {
        assert_eq!(out[i + 1], out[i] + data[i]);
    }
}

#[test]
fn for_each_static_and_dynamic_agree() {
    let mut a: Vec<u64> = (0..5_000).collect();
    let mut b = a.clone();

    for_each(&mut a, |x| *x = *x * 3 + 1);
    for_each_dynamic(&mut b, |x| *x = *x * 3 + 1);
    assert_eq!(a, b);
}

#[test]
fn for_each_identity_is_idempotent() {
    let original: Vec<u64> = (0..2_000).collect();
    let mut data = original.clone();
    for_each(&mut data, |_| {});
    assert_eq!(data, original);
    for_each_dynamic(&mut data, |_| {});
    assert_eq!(data, original);
}

#[test]
fn for_each_panic_surfaces_at_call_site() {
    let mut data: Vec<u64> = (0..2_000).collect();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        for_each(&mut data, |x| assert!(*x != 1_500, "boom"));
    }));
    let payload = result.unwrap_err();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());
    assert!(message.unwrap_or_default().contains("boom"));
}

#[test]
fn for_each_dynamic_cancels_after_failure() {
    let mut data: Vec<u64> = (0..100_000).collect();
    let visited = AtomicUsize::new(0);

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        for_each_dynamic_with(
            &mut data,
            |x| {
                visited.fetch_add(1, Ordering::Relaxed);
                assert!(*x != 0, "first element poisons the run");
            },
            25,
            4,
        );
    }));
    assert!(result.is_err());
    assert!(
        visited.load(Ordering::Relaxed) < 100_000,
        "cancellation should stop workers before the full input is visited"
    );
}

#[test]
fn merge_sort_sorts_and_preserves_multiset() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let mut data: Vec<i64> = (0..50_000).map(|i| (i * 37) % 4_001 - 2_000).collect();
    data.shuffle(&mut rng);

    let mut expected = data.clone();
    expected.sort();

    merge_sort(&mut data);
    assert_eq!(data, expected);
}

#[test]
fn merge_sort_explicit_budgets_agree() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(3);
    let mut base: Vec<u32> = (0..10_000).map(|i| i % 101).collect();
    base.shuffle(&mut rng);

    let mut sequential = base.clone();
    merge_sort_with(&mut sequential, 1_000, 1);
    let mut parallel = base.clone();
    merge_sort_with(&mut parallel, 100, 8);
    assert_eq!(sequential, parallel);
}

#[test]
fn custom_monoid_reduction() {
    // Bitwise-or accumulation: identity 0, associative and commutative.
    let or = with_identity(0u64, |a: u64, b: u64| a | b);
    let data: Vec<u64> = (0..64).map(|i| 1u64 << (i % 8)).collect();
    assert_eq!(accumulate(&data, 0, &or), 0xFF);
}

#[test]
fn reductions_on_empty_inputs() {
    assert_eq!(accumulate::<u64, _>(&[], 9, &Sum), 9);
    assert_eq!(prefix_scan::<u64, _>(&[], &Sum), vec![0]);

    let mut empty: Vec<u64> = Vec::new();
    for_each(&mut empty, |_| unreachable!());
    merge_sort(&mut empty);
}
