//! Reader groups: one production unit of one or two sources and its ready lists.

use std::collections::VecDeque;
use std::fmt;

use super::batch::{ReadBatch, Side};
use crate::reader::{PairedReadReader, ReadReader};

/// How the reads of a queue are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderMode {
    /// Independent single-end readers, one per group.
    Single,
    /// Two single-end readers per group whose Nth reads form the Nth pair.
    PairedFiles,
    /// One reader per group that yields matched pairs.
    PairedReader,
}

impl ReaderMode {
    /// Whether suppliers for this mode hand out pairs.
    #[must_use]
    pub fn is_paired(self) -> bool {
        !matches!(self, ReaderMode::Single)
    }

    /// Number of ready lists (and reader streams) each group uses.
    #[must_use]
    pub fn streams_per_group(self) -> usize {
        if self.is_paired() { 2 } else { 1 }
    }

    /// Number of reader threads each group runs.
    #[must_use]
    pub fn threads_per_group(self) -> usize {
        match self {
            ReaderMode::PairedFiles => 2,
            ReaderMode::Single | ReaderMode::PairedReader => 1,
        }
    }

    /// Short human-readable name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ReaderMode::Single => "single-end",
            ReaderMode::PairedFiles => "paired-file",
            ReaderMode::PairedReader => "paired",
        }
    }
}

impl fmt::Display for ReaderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The readers bound to one group, held until the reader threads are started.
pub(crate) enum GroupReaders<T> {
    Single(Box<dyn ReadReader<T>>),
    PairedFiles(Box<dyn ReadReader<T>>, Box<dyn ReadReader<T>>),
    Paired(Box<dyn PairedReadReader<T>>),
}

/// Per-group counters reported in [`QueueStats`](super::QueueStats).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupStats {
    /// Reads published, per side.
    pub reads: [u64; 2],
    /// Batches published, per side.
    pub batches: [u64; 2],
    /// Whether the two sides were found to be out of sync.
    pub misaligned: bool,
    /// Whether a reader of this group stopped on a read error rather than end of input.
    pub reader_failed: bool,
}

/// Shared-state half of a reader group: its ready lists and bookkeeping.
///
/// Always accessed under the queue lock.
pub(crate) struct ReaderGroup<T> {
    mode: ReaderMode,
    ready: [VecDeque<ReadBatch<T>>; 2],
    /// Batches filling or ready, per side; bounded by the per-stream quota in paired-file mode.
    in_flight: [usize; 2],
    /// Whether the reader for each side has exited.
    finished: [bool; 2],
    /// Whether this group is currently in the queue's ready-group set.
    pub(crate) in_ready_set: bool,
    pub(crate) stats: GroupStats,
}

impl<T> ReaderGroup<T> {
    pub(crate) fn new(mode: ReaderMode) -> Self {
        Self {
            mode,
            ready: [VecDeque::new(), VecDeque::new()],
            in_flight: [0, 0],
            finished: [false, false],
            in_ready_set: false,
            stats: GroupStats::default(),
        }
    }

    /// True if a supplier can claim work from this group: a batch on the first side, or for
    /// paired modes a batch on each side.
    pub(crate) fn has_work(&self) -> bool {
        if self.mode.is_paired() {
            !self.ready[0].is_empty() && !self.ready[1].is_empty()
        } else {
            !self.ready[0].is_empty()
        }
    }

    pub(crate) fn in_flight(&self, side: Side) -> usize {
        self.in_flight[side.index()]
    }

    /// Records that a reader checked out a batch for `side`.
    pub(crate) fn begin_fill(&mut self, side: Side) {
        self.in_flight[side.index()] += 1;
    }

    /// Records that a reader returned an unused batch for `side`.
    pub(crate) fn abandon_fill(&mut self, side: Side) {
        self.in_flight[side.index()] -= 1;
    }

    /// Appends a filled batch to the tail of `side`'s ready list.
    pub(crate) fn push_ready(&mut self, side: Side, batch: ReadBatch<T>) {
        self.stats.reads[side.index()] += batch.len() as u64;
        self.stats.batches[side.index()] += 1;
        self.ready[side.index()].push_back(batch);
    }

    /// Detaches the oldest ready batch on the first side.
    pub(crate) fn pop_ready(&mut self) -> Option<ReadBatch<T>> {
        let batch = self.ready[0].pop_front()?;
        self.in_flight[0] -= 1;
        Some(batch)
    }

    /// Detaches the oldest ready batch from each side together.
    pub(crate) fn pop_ready_pair(&mut self) -> Option<(ReadBatch<T>, ReadBatch<T>)> {
        if !self.has_work() {
            return None;
        }
        let first = self.ready[0].pop_front()?;
        let second = self.ready[1].pop_front()?;
        self.in_flight[0] -= 1;
        self.in_flight[1] -= 1;
        Some((first, second))
    }

    /// Records that the reader for `side` has exited.
    pub(crate) fn mark_finished(&mut self, side: Side) {
        self.finished[side.index()] = true;
    }

    /// Detaches batches that can never be paired: for paired modes, everything waiting on
    /// one side once the other side's reader has finished with nothing left ready.
    pub(crate) fn take_unpairable(&mut self) -> Vec<(Side, ReadBatch<T>)> {
        let mut leftovers = Vec::new();
        if !self.mode.is_paired() {
            return leftovers;
        }
        for (done, other) in [(Side::First, Side::Second), (Side::Second, Side::First)] {
            if self.finished[done.index()] && self.ready[done.index()].is_empty() {
                while let Some(batch) = self.ready[other.index()].pop_front() {
                    self.in_flight[other.index()] -= 1;
                    leftovers.push((other, batch));
                }
            }
        }
        leftovers
    }

    pub(crate) fn ready_len(&self, side: Side) -> usize {
        self.ready[side.index()].len()
    }
}
