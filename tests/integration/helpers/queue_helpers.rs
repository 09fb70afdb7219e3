//! Helpers for building queues over in-memory readers and draining them.

use readq_lib::read_queue::{PairedReadSupplierFromQueue, ReadSupplierFromQueue};
use readq_lib::reader::{IterReader, ReadReader};
use std::thread;

pub type BoxedReader<T> = Box<dyn ReadReader<T>>;

/// One boxed in-memory reader per source.
pub fn readers<T: Send + 'static>(sources: Vec<Vec<T>>) -> Vec<BoxedReader<T>> {
    sources.into_iter().map(|s| Box::new(IterReader::new(s)) as BoxedReader<T>).collect()
}

/// Drains every supplier on its own thread and returns what each one saw.
pub fn drain_concurrently<T: Clone + Send>(
    suppliers: Vec<ReadSupplierFromQueue<T>>,
) -> Vec<Vec<T>> {
    thread::scope(|scope| {
        let handles: Vec<_> = suppliers
            .into_iter()
            .map(|mut supplier| {
                scope.spawn(move || {
                    let mut seen = Vec::new();
                    while let Some(read) = supplier.next_read() {
                        seen.push(read.clone());
                    }
                    seen
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().expect("supplier thread panicked")).collect()
    })
}

/// Drains a paired supplier on the current thread, collecting pairs and errors.
pub fn drain_pairs<T: Clone>(
    supplier: &mut PairedReadSupplierFromQueue<T>,
) -> (Vec<(T, T)>, Vec<readq_lib::errors::QueueError>) {
    let mut pairs = Vec::new();
    let mut errors = Vec::new();
    loop {
        match supplier.next_read_pair() {
            Ok(Some((a, b))) => pairs.push((a.clone(), b.clone())),
            Ok(None) => break,
            Err(e) => errors.push(e),
        }
    }
    (pairs, errors)
}
