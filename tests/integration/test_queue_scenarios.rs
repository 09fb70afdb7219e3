//! End-to-end queue scenarios: ordering, pairing, exhaustion and back-pressure.

use readq_lib::errors::QueueError;
use readq_lib::read_queue::{Lifecycle, QueueConfig, ReadSupplierQueue, ReaderMode};
use readq_lib::reader::{IterPairedReader, PairedReadReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::helpers::{BoxedReader, drain_concurrently, drain_pairs, readers};

type Name = &'static str;

fn file_pair(first: Vec<Name>, second: Vec<Name>) -> (BoxedReader<Name>, BoxedReader<Name>) {
    let mut both = readers(vec![first, second]);
    let second = both.pop().unwrap();
    let first = both.pop().unwrap();
    (first, second)
}

#[test]
fn test_single_source_in_order_with_two_batches() {
    let config = QueueConfig::default().with_batch_size(3).with_pool_size(2);
    let mut queue =
        ReadSupplierQueue::new(readers(vec![vec!["a", "b", "c", "d", "e"]]), &config).unwrap();
    let mut supplier = queue.create_supplier().unwrap();
    queue.start_readers().unwrap();

    assert_eq!(queue.stats().pool_size, 2);

    let mut seen = Vec::new();
    while let Some(read) = supplier.next_read() {
        seen.push(*read);
        let census = queue.stats().census;
        // The supplier holds the batch it is reading; the reader has at most the other one.
        assert_eq!(census.draining, 1, "census: {census:?}");
        assert!(census.filling + census.ready <= 1, "census: {census:?}");
    }
    assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
    assert!(supplier.next_read().is_none());
    drop(supplier);
    queue.wait_until_finished().unwrap();
}

#[test]
fn test_dual_file_pairs_in_order() {
    let mut queue = ReadSupplierQueue::new_paired_files(
        vec![file_pair(vec!["p0", "p1"], vec!["q0", "q1"])],
        &QueueConfig::default(),
    )
    .unwrap();
    assert_eq!(queue.mode(), ReaderMode::PairedFiles);
    let mut supplier = queue.create_paired_supplier().unwrap();
    queue.start_readers().unwrap();

    let (pairs, errors) = drain_pairs(&mut supplier);
    assert_eq!(pairs, vec![("p0", "q0"), ("p1", "q1")]);
    assert!(errors.is_empty());
    drop(supplier);
    queue.wait_until_finished().unwrap();
}

#[test]
fn test_dual_file_many_batches_stay_aligned() {
    let k = 1_000;
    let first: Vec<u32> = (0..k).collect();
    let second: Vec<u32> = (0..k).map(|i| i + 1_000_000).collect();
    let mut both = readers(vec![first, second]);
    let r2 = both.pop().unwrap();
    let r1 = both.pop().unwrap();

    let config = QueueConfig::default().with_batch_size(7);
    let mut queue = ReadSupplierQueue::new_paired_files(vec![(r1, r2)], &config).unwrap();
    let mut supplier = queue.create_paired_supplier().unwrap();
    queue.start_readers().unwrap();

    let (pairs, errors) = drain_pairs(&mut supplier);
    assert!(errors.is_empty());
    assert_eq!(pairs.len(), k as usize);
    for (i, (a, b)) in pairs.iter().enumerate() {
        assert_eq!(*a, i as u32);
        assert_eq!(*b, *a + 1_000_000);
    }
    drop(supplier);
    queue.wait_until_finished().unwrap();

    let stats = queue.stats();
    assert_eq!(stats.groups[0].reads, [k as u64, k as u64]);
    assert!(stats.misalignments.is_empty());
}

#[test]
fn test_dual_file_unequal_lengths_report_misalignment() {
    let config = QueueConfig::default().with_batch_size(2);
    let mut queue = ReadSupplierQueue::new_paired_files(
        vec![file_pair(vec!["p0", "p1", "p2", "p3", "p4"], vec!["q0", "q1"])],
        &config,
    )
    .unwrap();
    let mut supplier = queue.create_paired_supplier().unwrap();
    queue.start_readers().unwrap();

    let (pairs, errors) = drain_pairs(&mut supplier);
    assert_eq!(pairs, vec![("p0", "q0"), ("p1", "q1")]);
    assert_eq!(errors.len(), 1, "misalignment is reported once: {errors:?}");
    assert!(matches!(errors[0], QueueError::PairMisaligned { group: 0, .. }));
    drop(supplier);

    let err = queue.wait_until_finished().unwrap_err();
    assert!(matches!(err, QueueError::PairMisaligned { .. }));
    let stats = queue.stats();
    assert_eq!(stats.census.free, stats.pool_size, "leftover batches were returned");
    assert_eq!(stats.lifecycle, Lifecycle::Finished);
}

#[test]
fn test_short_first_side_does_not_deadlock() {
    // The first side runs out early while the second side keeps filling its quota.
    let second: Vec<u32> = (0..200).collect();
    let mut both = readers(vec![vec![1u32], second]);
    let r2 = both.pop().unwrap();
    let r1 = both.pop().unwrap();

    let config = QueueConfig::default().with_batch_size(3).with_pool_size(4);
    let mut queue = ReadSupplierQueue::new_paired_files(vec![(r1, r2)], &config).unwrap();
    let mut supplier = queue.create_paired_supplier().unwrap();
    queue.start_readers().unwrap();

    let (pairs, errors) = drain_pairs(&mut supplier);
    assert_eq!(pairs, vec![(1, 0)]);
    assert!(!errors.is_empty());
    drop(supplier);
    assert!(queue.wait_until_finished().is_err());
}

#[test]
fn test_zero_length_sources() {
    let mut queue = ReadSupplierQueue::new_paired_files(
        vec![file_pair(vec![], vec![]), file_pair(vec![], vec![])],
        &QueueConfig::default(),
    )
    .unwrap();
    let mut supplier = queue.create_paired_supplier().unwrap();
    queue.start_readers().unwrap();

    assert!(supplier.next_read_pair().unwrap().is_none());
    drop(supplier);
    queue.wait_until_finished().unwrap();
    assert_eq!(queue.stats().total_reads(), 0);
}

#[test]
fn test_paired_reader_mode() {
    let pairs: Vec<(u32, u32)> = (0..50).map(|i| (i, i * 10)).collect();
    let paired: Vec<Box<dyn PairedReadReader<u32>>> = vec![
        Box::new(IterPairedReader::new(pairs.clone())),
        Box::new(IterPairedReader::new(pairs.clone())),
    ];
    let config = QueueConfig::default().with_batch_size(8);
    let mut queue = ReadSupplierQueue::new_paired(paired, &config).unwrap();
    assert_eq!(queue.mode(), ReaderMode::PairedReader);
    let mut supplier = queue.create_paired_supplier().unwrap();
    queue.start_readers().unwrap();

    let (mut seen, errors) = drain_pairs(&mut supplier);
    assert!(errors.is_empty());
    assert!(seen.iter().all(|(a, b)| *b == *a * 10));
    seen.sort_unstable();
    let mut expected: Vec<_> = pairs.iter().chain(pairs.iter()).copied().collect();
    expected.sort_unstable();
    assert_eq!(seen, expected);
    drop(supplier);
    queue.wait_until_finished().unwrap();
}

#[test]
fn test_many_suppliers_see_each_read_once() {
    let sources: Vec<Vec<u32>> =
        (0..4).map(|s| (0..500).map(|i| s * 10_000 + i).collect()).collect();
    let config = QueueConfig::default().with_batch_size(16);
    let mut queue = ReadSupplierQueue::new(readers(sources.clone()), &config).unwrap();
    let suppliers = (0..6).map(|_| queue.create_supplier().unwrap()).collect();
    queue.start_readers().unwrap();

    let per_supplier = drain_concurrently(suppliers);
    queue.wait_until_finished().unwrap();

    let mut all: Vec<u32> = per_supplier.iter().flatten().copied().collect();
    all.sort_unstable();
    let mut expected: Vec<u32> = sources.into_iter().flatten().collect();
    expected.sort_unstable();
    assert_eq!(all, expected);

    // Each supplier sees any one source in source order.
    for seen in &per_supplier {
        for s in 0..4 {
            let from_source: Vec<_> = seen.iter().filter(|v| **v / 10_000 == s).collect();
            assert!(from_source.windows(2).all(|w| w[0] < w[1]));
        }
    }
}

#[test]
fn test_census_is_constant_while_running() {
    let sources: Vec<Vec<u32>> = (0..3).map(|_| (0..2_000).collect()).collect();
    let config = QueueConfig::default().with_batch_size(5).with_pool_size(5);
    let mut queue = ReadSupplierQueue::new(readers(sources), &config).unwrap();
    let suppliers = (0..2).map(|_| queue.create_supplier().unwrap()).collect();
    queue.start_readers().unwrap();

    let done = AtomicBool::new(false);
    thread::scope(|scope| {
        scope.spawn(|| {
            let per_supplier = drain_concurrently(suppliers);
            assert_eq!(per_supplier.iter().map(Vec::len).sum::<usize>(), 6_000);
            done.store(true, Ordering::SeqCst);
        });
        while !done.load(Ordering::SeqCst) {
            let census = queue.stats().census;
            assert_eq!(census.total(), 5);
            thread::yield_now();
        }
    });
    queue.wait_until_finished().unwrap();
}

#[test]
fn test_blocked_reader_resumes_after_release() {
    let config = QueueConfig::default().with_batch_size(2).with_pool_size(1);
    let mut queue = ReadSupplierQueue::new(readers(vec![vec![1u32, 2, 3, 4]]), &config).unwrap();
    let mut supplier = queue.create_supplier().unwrap();
    queue.start_readers().unwrap();

    assert_eq!(supplier.next_read(), Some(&1));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(queue.stats().total_batches(), 1, "reader waits for the only batch");

    assert_eq!(supplier.next_read(), Some(&2));
    assert_eq!(supplier.next_read(), Some(&3));
    assert_eq!(supplier.next_read(), Some(&4));
    assert_eq!(supplier.next_read(), None);
    drop(supplier);
    queue.wait_until_finished().unwrap();
    assert_eq!(queue.stats().total_batches(), 2);
}
