use crate::{
    cache::{CacheOutcome, ResultCache},
    descriptor::{AggregateColumn, AggregateDescriptor, AggregateFunction},
    error::Error,
    executor::ResultMapping,
    filter::FilterChain,
    value::Value,
};
use std::{
    collections::BTreeMap,
    sync::{
        Arc, Barrier,
        atomic::{AtomicU64, Ordering},
    },
    thread,
};

fn descriptor(function: AggregateFunction) -> AggregateDescriptor {
    AggregateDescriptor::new(
        "authors",
        "posts",
        FilterChain::new(),
        function,
        AggregateColumn::Wildcard,
    )
}

fn mapping_of(parent: u64, value: u64) -> ResultMapping {
    let mut map = BTreeMap::new();
    map.insert(Value::Uint(parent), Value::Uint(value));

    ResultMapping::new(map)
}

#[test]
fn first_caller_computes_and_second_shares() {
    let cache = ResultCache::new();
    let key = descriptor(AggregateFunction::Count);

    let (first, outcome) = cache
        .get_or_compute(&key, || Ok(mapping_of(1, 3)))
        .expect("first lookup should compute");
    assert_eq!(outcome, CacheOutcome::Computed);

    let (second, outcome) = cache
        .get_or_compute(&key, || {
            panic!("second lookup must not recompute");
        })
        .expect("second lookup should share");
    assert_eq!(outcome, CacheOutcome::Shared);
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn distinct_descriptors_compute_independently() {
    let cache = ResultCache::new();

    cache
        .get_or_compute(&descriptor(AggregateFunction::Count), || Ok(mapping_of(1, 3)))
        .expect("count descriptor should compute");
    let (_, outcome) = cache
        .get_or_compute(&descriptor(AggregateFunction::Exists), || Ok(mapping_of(1, 1)))
        .expect("exists descriptor should compute");

    assert_eq!(outcome, CacheOutcome::Computed);
    assert_eq!(cache.descriptor_count(), 2);
}

#[test]
fn failed_computation_leaves_the_slot_empty() {
    let cache = ResultCache::new();
    let key = descriptor(AggregateFunction::Count);

    let err = cache
        .get_or_compute(&key, || {
            Err(Error::invariant("backend exploded"))
        })
        .expect_err("failing computation should propagate");
    assert!(matches!(err, Error::Invariant { .. }));

    // The failure did not poison the slot; a later caller recomputes.
    let (mapping, outcome) = cache
        .get_or_compute(&key, || Ok(mapping_of(1, 3)))
        .expect("retry should compute");
    assert_eq!(outcome, CacheOutcome::Computed);
    assert_eq!(mapping.get(&Value::Uint(1)), Some(&Value::Uint(3)));
}

#[test]
fn concurrent_same_descriptor_requests_execute_once() {
    const THREADS: usize = 8;

    let cache = Arc::new(ResultCache::new());
    let executions = Arc::new(AtomicU64::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let cache = cache.clone();
            let executions = executions.clone();
            let barrier = barrier.clone();

            thread::spawn(move || {
                barrier.wait();
                let (mapping, _) = cache
                    .get_or_compute(&descriptor(AggregateFunction::Count), || {
                        executions.fetch_add(1, Ordering::SeqCst);
                        // Widen the race window so waiters really block.
                        thread::sleep(std::time::Duration::from_millis(10));
                        Ok(mapping_of(1, 3))
                    })
                    .expect("concurrent lookup should succeed");

                mapping.get(&Value::Uint(1)).cloned()
            })
        })
        .collect();

    for handle in handles {
        let value = handle.join().expect("worker thread should not panic");
        assert_eq!(value, Some(Value::Uint(3)));
    }

    assert_eq!(executions.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_distinct_descriptors_do_not_serialize_results() {
    let cache = Arc::new(ResultCache::new());
    let barrier = Arc::new(Barrier::new(2));

    let count_cache = cache.clone();
    let count_barrier = barrier.clone();
    let count = thread::spawn(move || {
        count_barrier.wait();
        count_cache
            .get_or_compute(&descriptor(AggregateFunction::Count), || Ok(mapping_of(1, 5)))
            .expect("count lookup should succeed")
            .1
    });

    let exists_cache = cache.clone();
    let exists_barrier = barrier.clone();
    let exists = thread::spawn(move || {
        exists_barrier.wait();
        exists_cache
            .get_or_compute(&descriptor(AggregateFunction::Exists), || Ok(mapping_of(1, 1)))
            .expect("exists lookup should succeed")
            .1
    });

    assert_eq!(count.join().expect("count thread"), CacheOutcome::Computed);
    assert_eq!(exists.join().expect("exists thread"), CacheOutcome::Computed);
    assert_eq!(cache.descriptor_count(), 2);
}
