//! Consumer-side adaptors that turn claimed batches into a stream of reads or pairs.

use std::sync::Arc;

use super::batch::ReadBatch;
use super::queue::{Misalignment, Shared};
use crate::errors::Result;

/// Hands out single reads from a single-end queue, one at a time.
///
/// Each supplier holds at most one batch. Any number of suppliers may drain the same queue
/// from different threads; each read is delivered to exactly one of them. Dropping the
/// supplier returns its batch to the pool and tells the queue it is finished.
pub struct ReadSupplierFromQueue<T> {
    shared: Arc<Shared<T>>,
    current: Option<ReadBatch<T>>,
    next_index: usize,
    supplied: u64,
    done: bool,
}

impl<T> ReadSupplierFromQueue<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>) -> Self {
        Self { shared, current: None, next_index: 0, supplied: 0, done: false }
    }

    /// Returns the next read, blocking until one is ready, or `None` once every reader is
    /// exhausted and every read has been handed out. Keeps returning `None` after that.
    ///
    /// The returned reference is valid until the next call.
    pub fn next_read(&mut self) -> Option<&T> {
        if !self.advance() {
            return None;
        }
        let index = self.next_index;
        self.next_index += 1;
        self.supplied += 1;
        self.current.as_ref()?.get(index)
    }

    /// Number of reads this supplier has handed out.
    #[must_use]
    pub fn reads_supplied(&self) -> u64 {
        self.supplied
    }

    /// Ensures the current batch has an unread record, claiming new batches as needed.
    fn advance(&mut self) -> bool {
        loop {
            if let Some(batch) = &self.current {
                if self.next_index < batch.len() {
                    return true;
                }
            }
            if let Some(batch) = self.current.take() {
                self.shared.done_with_batch(batch);
            }
            if self.done {
                return false;
            }
            match self.shared.get_batch() {
                Some(batch) => {
                    self.current = Some(batch);
                    self.next_index = 0;
                }
                None => {
                    self.done = true;
                    return false;
                }
            }
        }
    }
}

impl<T> Drop for ReadSupplierFromQueue<T> {
    fn drop(&mut self) {
        if let Some(batch) = self.current.take() {
            self.shared.done_with_batch(batch);
        }
        self.shared.supplier_finished();
    }
}

/// Hands out read pairs from a paired-file or paired-reader queue.
///
/// Holds one batch from each side of a group with a shared cursor, so the Nth read of the
/// first batch is always paired with the Nth read of the second.
///
/// If the two batches of a claim hold different numbers of reads, the pairs they have in
/// common are returned first and the next call returns
/// [`QueueError::PairMisaligned`](crate::errors::QueueError::PairMisaligned). The same error
/// is returned when one side of a group runs out while the other still has reads. Either
/// way the supplier stays usable and later calls continue with other work.
pub struct PairedReadSupplierFromQueue<T> {
    shared: Arc<Shared<T>>,
    current: Option<(ReadBatch<T>, ReadBatch<T>)>,
    next_index: usize,
    /// Reported once the common prefix of the current pair has been handed out.
    pending: Option<Misalignment>,
    supplied: u64,
    done: bool,
}

impl<T> PairedReadSupplierFromQueue<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>) -> Self {
        Self { shared, current: None, next_index: 0, pending: None, supplied: 0, done: false }
    }

    /// Returns the next pair, blocking until one is ready, or `Ok(None)` once all input is
    /// consumed.
    ///
    /// The returned references are valid until the next call.
    pub fn next_read_pair(&mut self) -> Result<Option<(&T, &T)>> {
        if !self.advance()? {
            return Ok(None);
        }
        let index = self.next_index;
        self.next_index += 1;
        self.supplied += 1;
        Ok(self.current.as_ref().and_then(|(first, second)| {
            Some((first.get(index)?, second.get(index)?))
        }))
    }

    /// Number of pairs this supplier has handed out.
    #[must_use]
    pub fn pairs_supplied(&self) -> u64 {
        self.supplied
    }

    fn advance(&mut self) -> Result<bool> {
        loop {
            if let Some((first, second)) = &self.current {
                if self.next_index < first.len().min(second.len()) {
                    return Ok(true);
                }
            }
            self.release_current();
            if let Some(misalignment) = self.pending.take() {
                return Err(misalignment.into());
            }
            if self.done {
                return Ok(false);
            }
            match self.shared.get_batch_pair()? {
                Some(pair) => {
                    self.current = Some((pair.first, pair.second));
                    self.pending = pair.misalignment;
                    self.next_index = 0;
                }
                None => {
                    self.done = true;
                    return Ok(false);
                }
            }
        }
    }

    fn release_current(&mut self) {
        if let Some((first, second)) = self.current.take() {
            self.shared.done_with_batch(first);
            self.shared.done_with_batch(second);
        }
    }
}

impl<T> Drop for PairedReadSupplierFromQueue<T> {
    fn drop(&mut self) {
        self.release_current();
        self.shared.supplier_finished();
    }
}
