//! Fixed-capacity read batches and the ledger that tracks where each batch lives.

use std::fmt;

/// Which half of a reader group a batch belongs to.
///
/// Single-end groups only ever use [`Side::First`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Side 0: the only side of a single-end group, or the first end of a pair.
    First,
    /// Side 1: the second end of a pair.
    Second,
}

impl Side {
    /// Index of this side into per-side arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Side::First => 0,
            Side::Second => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::First => write!(f, "first"),
            Side::Second => write!(f, "second"),
        }
    }
}

/// A fixed-capacity batch of reads, the unit handed between readers and suppliers.
///
/// The record slots are allocated once when the pool is built and reused for the life of
/// the queue; only the first [`len`](Self::len) slots hold valid reads. A batch that is not
/// full is the final batch its reader produced.
#[derive(Debug)]
pub struct ReadBatch<T> {
    id: usize,
    count: usize,
    reads: Vec<T>,
}

impl<T: Default> ReadBatch<T> {
    pub(crate) fn new(id: usize, capacity: usize) -> Self {
        let mut reads = Vec::with_capacity(capacity);
        reads.resize_with(capacity, T::default);
        Self { id, count: 0, reads }
    }
}

impl<T> ReadBatch<T> {
    /// Identifier of this batch within its pool.
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Number of valid reads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// True if the batch holds no reads.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Maximum number of reads the batch can hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.reads.len()
    }

    /// True once every slot holds a read.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.count == self.reads.len()
    }

    /// The valid reads, in the order they were read.
    #[must_use]
    pub fn reads(&self) -> &[T] {
        &self.reads[..self.count]
    }

    /// The read at `index`, if it is valid.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.reads().get(index)
    }

    /// The next unused slot, for a reader to fill in place.
    pub(crate) fn next_slot(&mut self) -> Option<&mut T> {
        self.reads.get_mut(self.count)
    }

    /// Marks the slot returned by [`next_slot`](Self::next_slot) as holding a valid read.
    pub(crate) fn commit(&mut self) {
        debug_assert!(self.count < self.reads.len(), "commit past batch capacity");
        self.count += 1;
    }

    /// Forgets all reads, keeping the slots for reuse.
    pub(crate) fn clear(&mut self) {
        self.count = 0;
    }
}

/// Where a batch currently is. Every batch is in exactly one state at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// On the free list.
    Free,
    /// Checked out to a reader thread.
    Filling,
    /// On a reader group's ready list.
    Ready {
        /// Index of the owning reader group.
        group: usize,
        /// Which of the group's ready lists holds it.
        side: Side,
    },
    /// Checked out to a supplier.
    Draining,
}

impl BatchState {
    /// Whether `self -> next` is a legal step of `Free -> Filling -> Ready -> Draining -> Free`.
    ///
    /// `Filling -> Free` is also allowed: a reader that reads nothing hands its batch straight
    /// back instead of publishing an empty one.
    fn can_become(self, next: BatchState) -> bool {
        matches!(
            (self, next),
            (BatchState::Free, BatchState::Filling)
                | (BatchState::Filling, BatchState::Ready { .. } | BatchState::Free)
                | (BatchState::Ready { .. }, BatchState::Draining | BatchState::Free)
                | (BatchState::Draining, BatchState::Free)
        )
    }
}

/// Counts of batches in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchCensus {
    /// Batches on the free list.
    pub free: usize,
    /// Batches being filled by readers.
    pub filling: usize,
    /// Batches on ready lists.
    pub ready: usize,
    /// Batches being drained by suppliers.
    pub draining: usize,
}

impl BatchCensus {
    /// Total batches counted; always equal to the pool size.
    #[must_use]
    pub fn total(&self) -> usize {
        self.free + self.filling + self.ready + self.draining
    }

    /// Batches checked out of any list.
    #[must_use]
    pub fn checked_out(&self) -> usize {
        self.filling + self.draining
    }
}

/// Per-batch state table, indexed by batch id.
///
/// Batches move between containers by value, so a batch can never sit in two lists; the
/// ledger additionally rejects any out-of-order state change.
#[derive(Debug)]
pub(crate) struct BatchLedger {
    states: Vec<BatchState>,
}

impl BatchLedger {
    pub(crate) fn new(pool_size: usize) -> Self {
        Self { states: vec![BatchState::Free; pool_size] }
    }

    pub(crate) fn state(&self, id: usize) -> BatchState {
        self.states[id]
    }

    /// Moves batch `id` into `next`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a batch of this pool or the transition is illegal; both mean
    /// a batch was handed back to the wrong queue or twice.
    pub(crate) fn transition(&mut self, id: usize, next: BatchState) {
        let current = *self
            .states
            .get(id)
            .unwrap_or_else(|| panic!("batch {id} does not belong to this queue"));
        assert!(
            current.can_become(next),
            "illegal batch transition for batch {id}: {current:?} -> {next:?}"
        );
        self.states[id] = next;
    }

    pub(crate) fn census(&self) -> BatchCensus {
        let mut census = BatchCensus::default();
        for state in &self.states {
            match state {
                BatchState::Free => census.free += 1,
                BatchState::Filling => census.filling += 1,
                BatchState::Ready { .. } => census.ready += 1,
                BatchState::Draining => census.draining += 1,
            }
        }
        census
    }
}
