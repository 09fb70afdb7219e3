//! Property-based tests for record conservation and pairing.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use readq_lib::read_queue::{QueueConfig, ReadSupplierQueue};
use std::thread;

use crate::helpers::{drain_pairs, readers};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // Every record from every source comes out exactly once, whatever the batch size, pool
    // size and number of concurrent suppliers.
    #[test]
    fn proptest_records_are_conserved(
        lengths in prop::collection::vec(0usize..300, 1..5),
        batch_size in 1usize..20,
        spare_batches in 0usize..4,
        suppliers in 1usize..5,
        seed in any::<u64>(),
    ) {
        let sources: Vec<Vec<u64>> = lengths
            .iter()
            .enumerate()
            .map(|(s, len)| (0..*len as u64).map(|i| ((s as u64) << 32) | i).collect())
            .collect();
        let config = QueueConfig::default()
            .with_batch_size(batch_size)
            .with_pool_size(sources.len() + spare_batches);
        let mut queue = ReadSupplierQueue::new(readers(sources.clone()), &config).unwrap();
        let handles: Vec<_> = (0..suppliers).map(|_| queue.create_supplier().unwrap()).collect();
        queue.start_readers().unwrap();

        let per_supplier: Vec<Vec<u64>> = thread::scope(|scope| {
            let threads: Vec<_> = handles
                .into_iter()
                .enumerate()
                .map(|(i, mut supplier)| {
                    scope.spawn(move || {
                        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                        let mut seen = Vec::new();
                        while let Some(read) = supplier.next_read() {
                            seen.push(*read);
                            if rng.random_bool(0.05) {
                                thread::yield_now();
                            }
                        }
                        seen
                    })
                })
                .collect();
            threads.into_iter().map(|t| t.join().unwrap()).collect()
        });
        queue.wait_until_finished().unwrap();

        let mut all: Vec<u64> = per_supplier.into_iter().flatten().collect();
        all.sort_unstable();
        let mut expected: Vec<u64> = sources.into_iter().flatten().collect();
        expected.sort_unstable();
        prop_assert_eq!(all, expected);

        let stats = queue.stats();
        prop_assert_eq!(stats.census.free, stats.pool_size);
        prop_assert_eq!(stats.total_reads(), lengths.iter().sum::<usize>() as u64);
    }

    // Equal-length paired files yield exactly as many pairs as each file has records, each
    // pair made of the Nth record of both files.
    #[test]
    fn proptest_paired_files_stay_aligned(
        len in 0u32..400,
        batch_size in 1usize..16,
        spare_batches in 0usize..4,
    ) {
        let first: Vec<u32> = (0..len).collect();
        let second: Vec<u32> = (0..len).map(|i| !i).collect();
        let mut both = readers(vec![first, second]);
        let r2 = both.pop().unwrap();
        let r1 = both.pop().unwrap();

        let config =
            QueueConfig::default().with_batch_size(batch_size).with_pool_size(2 + spare_batches);
        let mut queue = ReadSupplierQueue::new_paired_files(vec![(r1, r2)], &config).unwrap();
        let mut supplier = queue.create_paired_supplier().unwrap();
        queue.start_readers().unwrap();

        let (pairs, errors) = drain_pairs(&mut supplier);
        drop(supplier);
        queue.wait_until_finished().unwrap();

        prop_assert!(errors.is_empty());
        prop_assert_eq!(pairs.len(), len as usize);
        for (i, (a, b)) in pairs.into_iter().enumerate() {
            prop_assert_eq!(a, i as u32);
            prop_assert_eq!(b, !a);
        }
    }
}
