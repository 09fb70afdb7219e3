//! Reader thread bodies.
//!
//! Each reader thread loops: check out an empty batch, fill it in place from its reader,
//! publish it. The batch that comes back short (or empty) is the last one. A reader error
//! is logged and ends that stream exactly as exhaustion would; the other streams carry on,
//! and the group is flagged as failed in the queue's stats.

use super::batch::{ReadBatch, Side};
use super::queue::Shared;
use crate::reader::{PairedReadReader, ReadReader};

/// How filling one batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fill {
    /// The batch is full and the reader may have more.
    Full,
    /// The reader reached the end of its input.
    Exhausted,
    /// The reader returned an error; treated as the end of its input.
    Failed,
}

impl Fill {
    fn is_last(self) -> bool {
        self != Fill::Full
    }
}

/// Fills `batch` from `reader`.
fn fill_batch<T, R>(reader: &mut R, batch: &mut ReadBatch<T>, group: usize, side: Side) -> Fill
where
    R: ReadReader<T> + ?Sized,
{
    while let Some(slot) = batch.next_slot() {
        match reader.next_read(slot) {
            Ok(true) => batch.commit(),
            Ok(false) => return Fill::Exhausted,
            Err(e) => {
                log::error!("Error reading group {group} ({side} side): {e:#}");
                return Fill::Failed;
            }
        }
    }
    Fill::Full
}

/// Fills `first` and `second` from a pair-emitting reader.
fn fill_batch_pair<T, R>(
    reader: &mut R,
    first: &mut ReadBatch<T>,
    second: &mut ReadBatch<T>,
    group: usize,
) -> Fill
where
    R: PairedReadReader<T> + ?Sized,
{
    loop {
        let (Some(a), Some(b)) = (first.next_slot(), second.next_slot()) else {
            return Fill::Full;
        };
        match reader.next_read_pair(a, b) {
            Ok(true) => {
                first.commit();
                second.commit();
            }
            Ok(false) => return Fill::Exhausted,
            Err(e) => {
                log::error!("Error reading pairs for group {group}: {e:#}");
                return Fill::Failed;
            }
        }
    }
}

/// Runs a single-end reader for `side` of `group` until it is exhausted.
pub(crate) fn run_reader<T>(
    shared: &Shared<T>,
    group: usize,
    side: Side,
    mut reader: Box<dyn ReadReader<T>>,
) {
    if !shared.wait_for_start() {
        return;
    }
    let mut total = 0u64;
    let last = loop {
        let mut batch = shared.get_empty_batch(group, side);
        let fill = fill_batch(reader.as_mut(), &mut batch, group, side);
        total += batch.len() as u64;
        shared.publish(group, side, batch);
        if fill.is_last() {
            break fill;
        }
    };
    // Close the source before reporting so its file handle is released first.
    drop(reader);
    shared.reader_finished(group, &[side], total, last == Fill::Failed);
}

/// Runs a pair-emitting reader for both sides of `group` until it is exhausted.
pub(crate) fn run_paired_reader<T>(
    shared: &Shared<T>,
    group: usize,
    mut reader: Box<dyn PairedReadReader<T>>,
) {
    if !shared.wait_for_start() {
        return;
    }
    let mut total = 0u64;
    let last = loop {
        let (mut first, mut second) = shared.get_empty_batch_pair(group);
        let fill = fill_batch_pair(reader.as_mut(), &mut first, &mut second, group);
        total += first.len() as u64;
        shared.publish_pair(group, first, second);
        if fill.is_last() {
            break fill;
        }
    };
    drop(reader);
    shared.reader_finished(group, &[Side::First, Side::Second], total, last == Fill::Failed);
}
