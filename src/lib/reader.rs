//! Pull-style reader interfaces consumed by the read queue.
//!
//! Readers fill caller-owned slots rather than returning fresh values so that the
//! records held in a [`ReadBatch`](crate::read_queue::ReadBatch) keep their allocations
//! when the batch is recycled. This mirrors `read_record(&mut record)` style readers.
//!
//! Any error returned by a reader ends that reader's stream: the queue logs it and treats
//! the source as exhausted.

use anyhow::Result;

/// A source of single reads.
pub trait ReadReader<T>: Send {
    /// Reads the next record into `read`.
    ///
    /// Returns `Ok(true)` if a record was read and `Ok(false)` once the source is exhausted.
    fn next_read(&mut self, read: &mut T) -> Result<bool>;
}

/// A source that yields already-matched read pairs from a single stream.
pub trait PairedReadReader<T>: Send {
    /// Reads the next pair into `first` and `second`.
    ///
    /// Returns `Ok(true)` if a pair was read and `Ok(false)` once the source is exhausted.
    fn next_read_pair(&mut self, first: &mut T, second: &mut T) -> Result<bool>;
}

impl<T, R: ReadReader<T> + ?Sized> ReadReader<T> for Box<R> {
    fn next_read(&mut self, read: &mut T) -> Result<bool> {
        (**self).next_read(read)
    }
}

impl<T, R: PairedReadReader<T> + ?Sized> PairedReadReader<T> for Box<R> {
    fn next_read_pair(&mut self, first: &mut T, second: &mut T) -> Result<bool> {
        (**self).next_read_pair(first, second)
    }
}

/// Adapts any iterator of records into a [`ReadReader`].
///
/// ```
/// use readq_lib::reader::{IterReader, ReadReader};
///
/// let mut reader = IterReader::new(vec![1u32, 2]);
/// let mut slot = 0;
/// assert!(reader.next_read(&mut slot).unwrap());
/// assert_eq!(slot, 1);
/// ```
pub struct IterReader<I> {
    iter: I,
}

impl<I: Iterator> IterReader<I> {
    /// Wraps anything that can be turned into an iterator.
    pub fn new<C: IntoIterator<IntoIter = I>>(items: C) -> Self {
        Self { iter: items.into_iter() }
    }
}

impl<T, I> ReadReader<T> for IterReader<I>
where
    I: Iterator<Item = T> + Send,
{
    fn next_read(&mut self, read: &mut T) -> Result<bool> {
        match self.iter.next() {
            Some(next) => {
                *read = next;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Adapts an iterator of `(first, second)` tuples into a [`PairedReadReader`].
pub struct IterPairedReader<I> {
    iter: I,
}

impl<I: Iterator> IterPairedReader<I> {
    /// Wraps anything that can be turned into an iterator of pairs.
    pub fn new<C: IntoIterator<IntoIter = I>>(pairs: C) -> Self {
        Self { iter: pairs.into_iter() }
    }
}

impl<T, I> PairedReadReader<T> for IterPairedReader<I>
where
    I: Iterator<Item = (T, T)> + Send,
{
    fn next_read_pair(&mut self, first: &mut T, second: &mut T) -> Result<bool> {
        match self.iter.next() {
            Some((a, b)) => {
                *first = a;
                *second = b;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
