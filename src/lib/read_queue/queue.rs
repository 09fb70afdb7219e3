//! The queue coordinator: batch pool, reader groups, and all synchronization.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::batch::{BatchCensus, BatchLedger, BatchState, ReadBatch, Side};
use super::config::QueueConfig;
use super::group::{GroupReaders, GroupStats, ReaderGroup, ReaderMode};
use super::producer;
use super::supplier::{PairedReadSupplierFromQueue, ReadSupplierFromQueue};
use crate::errors::{QueueError, Result};
use crate::reader::{PairedReadReader, ReadReader};

/// Where the queue is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Constructed; reader threads not started.
    Idle,
    /// Reader threads are producing batches.
    Running,
    /// Every reader has finished; suppliers are draining what is left.
    Draining,
    /// Every batch is back in the pool and every supplier has finished.
    Finished,
    /// Reader threads could not be started; nothing was read.
    Aborted,
}

impl Lifecycle {
    /// True once no reader will publish another batch.
    #[must_use]
    pub fn input_done(self) -> bool {
        matches!(self, Lifecycle::Draining | Lifecycle::Finished | Lifecycle::Aborted)
    }
}

/// A detected disagreement between the two sides of a paired reader group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Misalignment {
    /// Index of the reader group.
    pub group: usize,
    /// Reads on the first side.
    pub first_reads: usize,
    /// Reads on the second side.
    pub second_reads: usize,
    /// Reads that could not be paired.
    pub dropped: usize,
}

impl From<Misalignment> for QueueError {
    fn from(m: Misalignment) -> Self {
        QueueError::PairMisaligned {
            group: m.group,
            first_reads: m.first_reads,
            second_reads: m.second_reads,
            dropped: m.dropped,
        }
    }
}

/// Point-in-time view of a queue.
#[derive(Debug, Clone)]
pub struct QueueStats {
    /// Production mode.
    pub mode: ReaderMode,
    /// Reads per batch.
    pub batch_size: usize,
    /// Batches in the pool.
    pub pool_size: usize,
    /// Where every batch currently is.
    pub census: BatchCensus,
    /// Lifecycle state.
    pub lifecycle: Lifecycle,
    /// Reader threads still running.
    pub readers_running: usize,
    /// Suppliers created and not yet finished.
    pub suppliers_running: usize,
    /// Per-group counters, indexed by group.
    pub groups: Vec<GroupStats>,
    /// Paired groups found out of sync.
    pub misalignments: Vec<Misalignment>,
}

impl QueueStats {
    /// Total reads published by all readers (both sides of pairs counted separately).
    #[must_use]
    pub fn total_reads(&self) -> u64 {
        self.groups.iter().map(|g| g.reads[0] + g.reads[1]).sum()
    }

    /// Total batches published by all readers.
    #[must_use]
    pub fn total_batches(&self) -> u64 {
        self.groups.iter().map(|g| g.batches[0] + g.batches[1]).sum()
    }

    /// Groups with a reader that stopped on a read error.
    #[must_use]
    pub fn failed_groups(&self) -> Vec<usize> {
        self.groups.iter().enumerate().filter(|(_, g)| g.reader_failed).map(|(i, _)| i).collect()
    }
}

/// A pair of batches claimed together from one group.
pub(crate) struct BatchPair<T> {
    pub(crate) group: usize,
    pub(crate) first: ReadBatch<T>,
    pub(crate) second: ReadBatch<T>,
    /// Set when the two batches hold different numbers of reads.
    pub(crate) misalignment: Option<Misalignment>,
}

/// Everything guarded by the queue lock.
struct QueueState<T> {
    free: VecDeque<ReadBatch<T>>,
    groups: Vec<ReaderGroup<T>>,
    /// Groups with claimable work, served round-robin.
    ready_groups: VecDeque<usize>,
    ledger: BatchLedger,
    lifecycle: Lifecycle,
    readers_running: usize,
    suppliers_running: usize,
    misalignments: Vec<Misalignment>,
    /// Misalignments found outside a pair claim, not yet handed to a supplier.
    unreported: VecDeque<Misalignment>,
}

impl<T> QueueState<T> {
    /// Adds `group` to the ready set if it now has claimable work.
    fn mark_ready(&mut self, group: usize) {
        let g = &mut self.groups[group];
        if !g.in_ready_set && g.has_work() {
            g.in_ready_set = true;
            self.ready_groups.push_back(group);
        }
    }

    /// Puts a group that was just served back at the tail of the ready set if it still has
    /// work, otherwise drops it from the set.
    fn requeue(&mut self, group: usize) {
        let g = &mut self.groups[group];
        if g.has_work() {
            self.ready_groups.push_back(group);
        } else {
            g.in_ready_set = false;
        }
    }

    fn claim_single(&mut self) -> Option<ReadBatch<T>> {
        while let Some(group) = self.ready_groups.pop_front() {
            let batch = self.groups[group].pop_ready();
            self.requeue(group);
            if let Some(batch) = batch {
                self.ledger.transition(batch.id(), BatchState::Draining);
                return Some(batch);
            }
        }
        None
    }

    fn claim_pair(&mut self) -> Option<BatchPair<T>> {
        while let Some(group) = self.ready_groups.pop_front() {
            let pair = self.groups[group].pop_ready_pair();
            self.requeue(group);
            if let Some((first, second)) = pair {
                self.ledger.transition(first.id(), BatchState::Draining);
                self.ledger.transition(second.id(), BatchState::Draining);
                let misalignment = if first.len() == second.len() {
                    None
                } else {
                    self.record_misalignment(group, first.len(), second.len())
                };
                return Some(BatchPair { group, first, second, misalignment });
            }
        }
        None
    }

    /// Notes that `group` is out of sync; returns the record only the first time per group.
    /// Later reports for the same group add to the recorded counts.
    fn record_misalignment(
        &mut self,
        group: usize,
        first_reads: usize,
        second_reads: usize,
    ) -> Option<Misalignment> {
        let dropped = first_reads.abs_diff(second_reads);
        let g = &mut self.groups[group];
        if g.stats.misaligned {
            if let Some(m) = self.misalignments.iter_mut().find(|m| m.group == group) {
                m.first_reads += first_reads;
                m.second_reads += second_reads;
                m.dropped += dropped;
            }
            return None;
        }
        g.stats.misaligned = true;
        let m = Misalignment { group, first_reads, second_reads, dropped };
        log::warn!(
            "Reader group {group} is out of sync: {first_reads} vs {second_reads} reads; \
             dropping {} unpaired reads",
            m.dropped
        );
        self.misalignments.push(m);
        Some(m)
    }

    /// Returns batches of `group` that can no longer be paired to the pool, queueing a
    /// misalignment report the first time it happens. Returns true if anything was dropped.
    fn drop_unpairable(&mut self, group: usize) -> bool {
        let leftovers = self.groups[group].take_unpairable();
        if leftovers.is_empty() {
            return false;
        }
        let mut reads = [0usize; 2];
        for (side, mut batch) in leftovers {
            reads[side.index()] += batch.len();
            self.ledger.transition(batch.id(), BatchState::Free);
            batch.clear();
            self.free.push_back(batch);
        }
        if let Some(m) = self.record_misalignment(group, reads[0], reads[1]) {
            self.unreported.push_back(m);
        }
        true
    }
}

/// State shared between the queue owner, reader threads and suppliers.
pub(crate) struct Shared<T> {
    state: Mutex<QueueState<T>>,
    /// A supplier may find work (or the input is done).
    batch_ready: Condvar,
    /// A reader may find an empty batch (or the queue has started or aborted).
    empty_batch_available: Condvar,
    /// The queue reached `Finished` or `Aborted`.
    all_consumed: Condvar,
    mode: ReaderMode,
    batch_size: usize,
    pool_size: usize,
    /// Most batches one reader stream may hold filling or ready.
    stream_quota: usize,
}

impl<T> Shared<T> {
    /// Blocks a freshly spawned reader until the queue starts. Returns false if the start
    /// was aborted and the reader must exit without reading.
    pub(crate) fn wait_for_start(&self) -> bool {
        let mut state = self.state.lock();
        while state.lifecycle == Lifecycle::Idle {
            self.empty_batch_available.wait(&mut state);
        }
        state.lifecycle != Lifecycle::Aborted
    }

    /// Checks out an empty batch for `side` of `group`, waiting for one to be free and for
    /// the stream to be under its quota.
    pub(crate) fn get_empty_batch(&self, group: usize, side: Side) -> ReadBatch<T> {
        let mut state = self.state.lock();
        loop {
            if state.groups[group].in_flight(side) < self.stream_quota {
                if let Some(mut batch) = state.free.pop_front() {
                    state.ledger.transition(batch.id(), BatchState::Filling);
                    state.groups[group].begin_fill(side);
                    batch.clear();
                    return batch;
                }
            }
            self.empty_batch_available.wait(&mut state);
        }
    }

    /// Checks out one empty batch for each side of `group` at once, so a pair-emitting
    /// reader never holds one batch while waiting for another.
    pub(crate) fn get_empty_batch_pair(&self, group: usize) -> (ReadBatch<T>, ReadBatch<T>) {
        let mut state = self.state.lock();
        loop {
            let under_quota = state.groups[group].in_flight(Side::First) < self.stream_quota;
            if under_quota && state.free.len() >= 2 {
                if let (Some(mut first), Some(mut second)) =
                    (state.free.pop_front(), state.free.pop_front())
                {
                    for (side, batch) in [(Side::First, &mut first), (Side::Second, &mut second)] {
                        state.ledger.transition(batch.id(), BatchState::Filling);
                        state.groups[group].begin_fill(side);
                        batch.clear();
                    }
                    return (first, second);
                }
            }
            self.empty_batch_available.wait(&mut state);
        }
    }

    /// Publishes a filled batch onto `side` of `group`. An empty batch goes straight back
    /// to the pool.
    pub(crate) fn publish(&self, group: usize, side: Side, batch: ReadBatch<T>) {
        let mut state = self.state.lock();
        self.publish_locked(&mut state, group, side, batch);
    }

    /// Publishes both halves of a pair-emitting reader's batches under one lock.
    pub(crate) fn publish_pair(&self, group: usize, first: ReadBatch<T>, second: ReadBatch<T>) {
        let mut state = self.state.lock();
        self.publish_locked(&mut state, group, Side::First, first);
        self.publish_locked(&mut state, group, Side::Second, second);
    }

    fn publish_locked(
        &self,
        state: &mut QueueState<T>,
        group: usize,
        side: Side,
        batch: ReadBatch<T>,
    ) {
        if batch.is_empty() {
            state.ledger.transition(batch.id(), BatchState::Free);
            state.groups[group].abandon_fill(side);
            state.free.push_back(batch);
            self.empty_batch_available.notify_all();
            return;
        }
        state.ledger.transition(batch.id(), BatchState::Ready { group, side });
        state.groups[group].push_ready(side, batch);
        if state.drop_unpairable(group) {
            self.empty_batch_available.notify_all();
            self.batch_ready.notify_one();
            return;
        }
        state.mark_ready(group);
        if state.groups[group].has_work() {
            self.batch_ready.notify_one();
        }
    }

    /// Called by each reader thread as it exits, with the sides it was producing and
    /// whether it stopped on a read error.
    pub(crate) fn reader_finished(&self, group: usize, sides: &[Side], reads: u64, failed: bool) {
        let mut state = self.state.lock();
        state.readers_running -= 1;
        log::debug!(
            "Reader for group {group} finished after {reads} reads; {} readers still running",
            state.readers_running
        );
        if failed {
            state.groups[group].stats.reader_failed = true;
        }
        for side in sides {
            state.groups[group].mark_finished(*side);
        }
        if state.drop_unpairable(group) {
            self.empty_batch_available.notify_all();
            self.batch_ready.notify_one();
        }
        if state.readers_running == 0 && state.lifecycle == Lifecycle::Running {
            state.lifecycle = Lifecycle::Draining;
            self.batch_ready.notify_all();
            self.check_finished(&mut state);
        }
    }

    /// Claims the next ready batch for a single-end supplier; `None` once all input is
    /// consumed.
    pub(crate) fn get_batch(&self) -> Option<ReadBatch<T>> {
        let mut state = self.state.lock();
        loop {
            if let Some(batch) = state.claim_single() {
                return Some(batch);
            }
            if state.lifecycle.input_done() {
                return None;
            }
            self.batch_ready.wait(&mut state);
        }
    }

    /// Claims a batch from each side of one group for a paired supplier; `Ok(None)` once
    /// all input is consumed.
    ///
    /// Batches that can never be paired (one side of a group ran out first) are returned to
    /// the pool as soon as that is known, and the misalignment is reported to exactly one
    /// supplier as an error.
    pub(crate) fn get_batch_pair(&self) -> Result<Option<BatchPair<T>>> {
        let mut state = self.state.lock();
        loop {
            if let Some(pair) = state.claim_pair() {
                if state.drop_unpairable(pair.group) {
                    self.empty_batch_available.notify_all();
                    self.batch_ready.notify_one();
                }
                return Ok(Some(pair));
            }
            if let Some(m) = state.unreported.pop_front() {
                return Err(m.into());
            }
            if state.lifecycle.input_done() {
                return Ok(None);
            }
            self.batch_ready.wait(&mut state);
        }
    }

    /// Returns a drained batch to the pool.
    pub(crate) fn done_with_batch(&self, mut batch: ReadBatch<T>) {
        let mut state = self.state.lock();
        state.ledger.transition(batch.id(), BatchState::Free);
        batch.clear();
        state.free.push_back(batch);
        self.empty_batch_available.notify_all();
        self.check_finished(&mut state);
    }

    pub(crate) fn supplier_finished(&self) {
        let mut state = self.state.lock();
        assert!(
            state.suppliers_running > 0,
            "supplier_finished called more often than suppliers were created"
        );
        state.suppliers_running -= 1;
        self.check_finished(&mut state);
    }

    /// Moves `Draining -> Finished` once every batch is home and no supplier is active.
    fn check_finished(&self, state: &mut QueueState<T>) {
        if state.lifecycle == Lifecycle::Draining
            && state.suppliers_running == 0
            && state.free.len() == self.pool_size
        {
            state.lifecycle = Lifecycle::Finished;
            log::debug!("Read queue finished; all {} batches returned", self.pool_size);
            self.all_consumed.notify_all();
        }
    }
}

/// A body to run on a new reader thread.
type ReaderJob = Box<dyn FnOnce() + Send>;

/// A bounded queue of reusable read batches between reader threads and suppliers.
///
/// Build it with one of the three constructors, create suppliers, call
/// [`start_readers`](Self::start_readers), drain the suppliers (on any threads), drop them,
/// then call [`wait_until_finished`](Self::wait_until_finished).
///
/// # Example
///
/// ```
/// use readq_lib::read_queue::{QueueConfig, ReadSupplierQueue};
/// use readq_lib::reader::{IterReader, ReadReader};
///
/// let readers: Vec<Box<dyn ReadReader<u32>>> =
///     vec![Box::new(IterReader::new(0..5)), Box::new(IterReader::new(5..8))];
/// let config = QueueConfig::default().with_batch_size(2);
/// let mut queue = ReadSupplierQueue::new(readers, &config).unwrap();
///
/// let mut supplier = queue.create_supplier().unwrap();
/// queue.start_readers().unwrap();
///
/// let mut seen = Vec::new();
/// while let Some(read) = supplier.next_read() {
///     seen.push(*read);
/// }
/// drop(supplier);
/// queue.wait_until_finished().unwrap();
///
/// seen.sort_unstable();
/// assert_eq!(seen, (0..8).collect::<Vec<_>>());
/// ```
pub struct ReadSupplierQueue<T> {
    shared: Arc<Shared<T>>,
    /// Readers not yet handed to threads, one entry per group.
    readers: Vec<GroupReaders<T>>,
    handles: Vec<JoinHandle<()>>,
    started: bool,
}

impl<T: Default + Send + 'static> ReadSupplierQueue<T> {
    /// Builds a queue over independent single-end readers, one group each.
    pub fn new(readers: Vec<Box<dyn ReadReader<T>>>, config: &QueueConfig) -> Result<Self> {
        let groups = readers.into_iter().map(GroupReaders::Single).collect();
        Self::with_groups(ReaderMode::Single, groups, config)
    }

    /// Builds a queue over pairs of single-end readers whose Nth reads form the Nth pair,
    /// e.g. R1 and R2 FASTQ files. Each pair is one group with two reader threads.
    pub fn new_paired_files(
        readers: Vec<(Box<dyn ReadReader<T>>, Box<dyn ReadReader<T>>)>,
        config: &QueueConfig,
    ) -> Result<Self> {
        let groups =
            readers.into_iter().map(|(r1, r2)| GroupReaders::PairedFiles(r1, r2)).collect();
        Self::with_groups(ReaderMode::PairedFiles, groups, config)
    }

    /// Builds a queue over readers that emit matched pairs from one stream.
    pub fn new_paired(
        readers: Vec<Box<dyn PairedReadReader<T>>>,
        config: &QueueConfig,
    ) -> Result<Self> {
        let groups = readers.into_iter().map(GroupReaders::Paired).collect();
        Self::with_groups(ReaderMode::PairedReader, groups, config)
    }

    fn with_groups(
        mode: ReaderMode,
        readers: Vec<GroupReaders<T>>,
        config: &QueueConfig,
    ) -> Result<Self> {
        let streams = readers.len() * mode.streams_per_group();
        let (batch_size, pool_size) = config.resolve(streams)?;
        let free = (0..pool_size).map(|id| ReadBatch::new(id, batch_size)).collect();
        let groups = (0..readers.len()).map(|_| ReaderGroup::new(mode)).collect();

        log::debug!(
            "Created {mode} read queue: {} groups, {} reader threads, {pool_size} batches of \
             {batch_size} reads",
            readers.len(),
            readers.len() * mode.threads_per_group()
        );

        // The two sides of a paired-file group are capped so neither can hold the whole pool
        // while the other waits for a batch to pair with.
        let stream_quota = match mode {
            ReaderMode::PairedFiles => pool_size / streams,
            ReaderMode::Single | ReaderMode::PairedReader => pool_size,
        };

        let state = QueueState {
            free,
            groups,
            ready_groups: VecDeque::new(),
            ledger: BatchLedger::new(pool_size),
            lifecycle: Lifecycle::Idle,
            readers_running: 0,
            suppliers_running: 0,
            misalignments: Vec::new(),
            unreported: VecDeque::new(),
        };
        let shared = Shared {
            state: Mutex::new(state),
            batch_ready: Condvar::new(),
            empty_batch_available: Condvar::new(),
            all_consumed: Condvar::new(),
            mode,
            batch_size,
            pool_size,
            stream_quota,
        };
        Ok(Self { shared: Arc::new(shared), readers, handles: Vec::new(), started: false })
    }

    /// Starts one thread per reader (two per paired-file group).
    ///
    /// Either every reader thread starts reading or none does: if any thread fails to spawn,
    /// the ones already spawned exit without reading, suppliers see end of input, and the
    /// spawn error is returned.
    pub fn start_readers(&mut self) -> Result<()> {
        self.start_readers_with(|name, job| thread::Builder::new().name(name).spawn(job))
    }

    pub(crate) fn start_readers_with<S>(&mut self, mut spawn: S) -> Result<()>
    where
        S: FnMut(String, ReaderJob) -> io::Result<JoinHandle<()>>,
    {
        if self.started {
            return Err(QueueError::AlreadyStarted);
        }
        self.started = true;

        let jobs = self.reader_jobs();
        self.shared.state.lock().readers_running = jobs.len();

        let mut failure = None;
        for (name, job) in jobs {
            match spawn(name.clone(), job) {
                Ok(handle) => self.handles.push(handle),
                Err(source) => {
                    failure = Some(QueueError::ThreadSpawn { thread: name, source });
                    break;
                }
            }
        }

        let mut state = self.shared.state.lock();
        if let Some(err) = failure {
            log::error!("{err}; aborting read queue start");
            state.lifecycle = Lifecycle::Aborted;
            state.readers_running = 0;
            self.shared.empty_batch_available.notify_all();
            self.shared.batch_ready.notify_all();
            self.shared.all_consumed.notify_all();
            drop(state);
            for handle in self.handles.drain(..) {
                if handle.join().is_err() {
                    log::error!("A reader thread panicked");
                }
            }
            return Err(err);
        }

        log::debug!("Started {} reader threads", self.handles.len());
        state.lifecycle = Lifecycle::Running;
        self.shared.empty_batch_available.notify_all();
        Ok(())
    }

    /// Builds the named thread bodies for every reader, consuming the readers.
    fn reader_jobs(&mut self) -> Vec<(String, ReaderJob)> {
        let mut jobs: Vec<(String, ReaderJob)> = Vec::new();
        for (group, readers) in std::mem::take(&mut self.readers).into_iter().enumerate() {
            match readers {
                GroupReaders::Single(reader) => {
                    let shared = Arc::clone(&self.shared);
                    let job: ReaderJob = Box::new(move || {
                        producer::run_reader(&shared, group, Side::First, reader);
                    });
                    jobs.push((format!("readq-reader-{group}"), job));
                }
                GroupReaders::PairedFiles(first, second) => {
                    for (side, reader) in [(Side::First, first), (Side::Second, second)] {
                        let shared = Arc::clone(&self.shared);
                        let job: ReaderJob = Box::new(move || {
                            producer::run_reader(&shared, group, side, reader);
                        });
                        jobs.push((format!("readq-reader-{group}-r{}", side.index() + 1), job));
                    }
                }
                GroupReaders::Paired(reader) => {
                    let shared = Arc::clone(&self.shared);
                    let job: ReaderJob = Box::new(move || {
                        producer::run_paired_reader(&shared, group, reader);
                    });
                    jobs.push((format!("readq-reader-{group}"), job));
                }
            }
        }
        jobs
    }
}

impl<T> ReadSupplierQueue<T> {
    /// Production mode of this queue.
    #[must_use]
    pub fn mode(&self) -> ReaderMode {
        self.shared.mode
    }

    /// Creates a supplier of single reads. Only valid for single-end queues.
    pub fn create_supplier(&self) -> Result<ReadSupplierFromQueue<T>> {
        if self.shared.mode.is_paired() {
            return Err(QueueError::WrongMode {
                requested: "single-end",
                mode: self.shared.mode.name(),
            });
        }
        self.shared.state.lock().suppliers_running += 1;
        Ok(ReadSupplierFromQueue::new(Arc::clone(&self.shared)))
    }

    /// Creates a supplier of read pairs. Valid for paired-file and paired-reader queues.
    pub fn create_paired_supplier(&self) -> Result<PairedReadSupplierFromQueue<T>> {
        if !self.shared.mode.is_paired() {
            return Err(QueueError::WrongMode {
                requested: "paired",
                mode: self.shared.mode.name(),
            });
        }
        self.shared.state.lock().suppliers_running += 1;
        Ok(PairedReadSupplierFromQueue::new(Arc::clone(&self.shared)))
    }

    /// Blocks until every reader has exited, every supplier has finished, and every batch is
    /// back in the pool, then joins the reader threads.
    ///
    /// Returns an error if any paired group was found out of sync.
    ///
    /// Suppliers must be dropped (or otherwise finished) for this to return; a queue whose
    /// reads are never drained waits forever.
    pub fn wait_until_finished(&mut self) -> Result<()> {
        if !self.started {
            return Err(QueueError::NotStarted);
        }
        let misalignment = {
            let mut state = self.shared.state.lock();
            while !matches!(state.lifecycle, Lifecycle::Finished | Lifecycle::Aborted) {
                self.shared.all_consumed.wait(&mut state);
            }
            state.misalignments.first().copied()
        };
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("A reader thread panicked");
            }
        }
        match misalignment {
            Some(m) => Err(m.into()),
            None => Ok(()),
        }
    }

    /// Snapshot of the queue's counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let state = self.shared.state.lock();
        QueueStats {
            mode: self.shared.mode,
            batch_size: self.shared.batch_size,
            pool_size: self.shared.pool_size,
            census: state.ledger.census(),
            lifecycle: state.lifecycle,
            readers_running: state.readers_running,
            suppliers_running: state.suppliers_running,
            groups: state.groups.iter().map(|g| g.stats).collect(),
            misalignments: state.misalignments.clone(),
        }
    }
}

impl<T> Drop for ReadSupplierQueue<T> {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            log::warn!(
                "Read queue dropped before wait_until_finished; detaching {} reader threads",
                self.handles.len()
            );
        }
    }
}
