//! Count reads or read pairs in FASTQ files using the read queue.
//!
//! Each input (or R1/R2 pair of inputs) gets its own reader thread; `--threads` consumer
//! threads drain the queue concurrently. Useful both as a fast FASTQ counter and as a smoke
//! test for the queue on real data.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use log::{info, warn};
use readq_lib::errors::QueueError;
use readq_lib::fastq::{FastqReadReader, InterleavedFastqReader, SequenceRead};
use readq_lib::logging::{OperationTimer, format_count, log_queue_summary};
use readq_lib::metrics::{ReaderGroupMetric, write_metrics};
use readq_lib::read_queue::{
    PairedReadSupplierFromQueue, QueueConfig, ReadSupplierFromQueue, ReadSupplierQueue,
};
use readq_lib::reader::{PairedReadReader, ReadReader};
use std::thread;

use crate::commands::command::Command;
use crate::commands::common::{FastqInputOptions, InputLayout, MetricsOptions, QueueOptions};

/// Count reads (or pairs) in FASTQ files.
#[derive(Debug, Parser)]
#[command(
    name = "count",
    about = "\x1b[38;5;72m[FASTQ]\x1b[0m          \x1b[36mCount reads or pairs in FASTQ files\x1b[0m",
    long_about = r#"
Count the reads (or read pairs) and bases in one or more FASTQ files.

Inputs are read on one thread per file and consumed on --threads threads through a
bounded pool of reusable batches.

Input layouts:
  single       every file is counted independently (reads)
  paired       files are taken as R1 R2 R1 R2 ... (pairs)
  interleaved  every file alternates R1 and R2 records (pairs)

Paired inputs whose two sides hold different numbers of records are reported as an error
after every matching pair has been counted. A malformed or truncated input also fails the
command, after the records read before the problem have been counted.

Example usage:
  readq count -i sample.fq.gz
  readq count -i r1.fq.gz r2.fq.gz --layout paired -t 4 --metrics counts.txt
"#
)]
pub struct Count {
    /// Input files and layout
    #[command(flatten)]
    pub input: FastqInputOptions,

    /// Queue sizing and threads
    #[command(flatten)]
    pub queue: QueueOptions,

    /// Metrics output
    #[command(flatten)]
    pub metrics: MetricsOptions,
}

/// What one consumer thread saw.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    /// Reads, or pairs for paired layouts.
    pub records: u64,
    /// Bases across all reads (both ends for pairs).
    pub bases: u64,
    /// Out-of-sync errors reported to this consumer.
    pub misalignments: u64,
}

impl Tally {
    fn merge(self, other: Tally) -> Tally {
        Tally {
            records: self.records + other.records,
            bases: self.bases + other.bases,
            misalignments: self.misalignments + other.misalignments,
        }
    }
}

impl Command for Count {
    fn execute(&self) -> Result<()> {
        self.input.validate()?;
        let config = self.queue.to_config()?;

        info!("Starting Count");
        info!("Inputs: {} ({:?} layout)", self.input.inputs.len(), self.input.layout);
        info!("Consumer threads: {}", self.queue.threads);

        let unit = if self.input.layout == InputLayout::Single { "reads" } else { "pairs" };
        let timer = OperationTimer::new(&format!("Counting {unit}"));
        let (tally, result) = match self.input.layout {
            InputLayout::Single => self.count_single(&config)?,
            InputLayout::Paired | InputLayout::Interleaved => self.count_paired(&config)?,
        };
        timer.log_completion(tally.records);

        info!(
            "Counted {} {unit} with {} bases",
            format_count(tally.records),
            format_count(tally.bases)
        );
        if tally.misalignments > 0 {
            warn!("{} out-of-sync reader groups were reported", tally.misalignments);
        }
        println!("{}\t{}", tally.records, tally.bases);
        result
    }
}

impl Count {
    fn count_single(&self, config: &QueueConfig) -> Result<(Tally, Result<()>)> {
        let readers = self
            .input
            .inputs
            .iter()
            .map(|path| {
                let reader: Box<dyn ReadReader<SequenceRead>> =
                    Box::new(FastqReadReader::from_path(path)?);
                Ok(reader)
            })
            .collect::<Result<Vec<_>>>()?;
        let mut queue = ReadSupplierQueue::new(readers, config)?;
        let suppliers = (0..self.queue.threads)
            .map(|_| queue.create_supplier())
            .collect::<readq_lib::errors::Result<Vec<_>>>()?;
        queue.start_readers()?;

        let tally = drain_all(suppliers, count_reads)?;
        Ok((tally, self.finish(&mut queue)))
    }

    fn count_paired(&self, config: &QueueConfig) -> Result<(Tally, Result<()>)> {
        let mut queue = if self.input.layout == InputLayout::Paired {
            let readers = self
                .input
                .inputs
                .chunks(2)
                .map(|pair| {
                    let r1: Box<dyn ReadReader<SequenceRead>> =
                        Box::new(FastqReadReader::from_path(&pair[0])?);
                    let r2: Box<dyn ReadReader<SequenceRead>> =
                        Box::new(FastqReadReader::from_path(&pair[1])?);
                    Ok((r1, r2))
                })
                .collect::<Result<Vec<_>>>()?;
            ReadSupplierQueue::new_paired_files(readers, config)?
        } else {
            let readers = self
                .input
                .inputs
                .iter()
                .map(|path| {
                    Ok(Box::new(InterleavedFastqReader::from_path(path)?)
                        as Box<dyn PairedReadReader<SequenceRead>>)
                })
                .collect::<Result<Vec<_>>>()?;
            ReadSupplierQueue::new_paired(readers, config)?
        };
        let suppliers = (0..self.queue.threads)
            .map(|_| queue.create_paired_supplier())
            .collect::<readq_lib::errors::Result<Vec<_>>>()?;
        queue.start_readers()?;

        let tally = drain_all(suppliers, count_pairs)?;
        Ok((tally, self.finish(&mut queue)))
    }

    /// Waits for the queue, logs its summary and writes metrics. The returned error, if
    /// any, is the queue's verdict on pairing or a reader that stopped on a read error.
    fn finish(&self, queue: &mut ReadSupplierQueue<SequenceRead>) -> Result<()> {
        let outcome = queue.wait_until_finished();
        let stats = queue.stats();
        log_queue_summary(&stats);

        if let Some(path) = &self.metrics.metrics {
            write_metrics(path, &ReaderGroupMetric::from_stats(&stats))?;
            info!("Wrote queue metrics to {}", path.display());
        }
        outcome.context("Read queue finished with an error")?;

        let failed = stats.failed_groups();
        if !failed.is_empty() {
            bail!("Failed to read all input for reader groups {failed:?}; counts are incomplete");
        }
        Ok(())
    }
}

/// Runs `drain` on every supplier, each on its own scoped thread, and sums the tallies.
fn drain_all<S: Send>(suppliers: Vec<S>, drain: fn(S) -> Tally) -> Result<Tally> {
    thread::scope(|scope| {
        let handles: Vec<_> =
            suppliers.into_iter().map(|supplier| scope.spawn(move || drain(supplier))).collect();
        handles.into_iter().try_fold(Tally::default(), |total, handle| -> Result<Tally> {
            let tally = handle.join().map_err(|_| anyhow!("A counting thread panicked"))?;
            Ok(total.merge(tally))
        })
    })
}

fn count_reads(mut supplier: ReadSupplierFromQueue<SequenceRead>) -> Tally {
    let mut tally = Tally::default();
    while let Some(read) = supplier.next_read() {
        tally.records += 1;
        tally.bases += read.len() as u64;
    }
    tally
}

fn count_pairs(mut supplier: PairedReadSupplierFromQueue<SequenceRead>) -> Tally {
    let mut tally = Tally::default();
    loop {
        match supplier.next_read_pair() {
            Ok(Some((first, second))) => {
                tally.records += 1;
                tally.bases += (first.len() + second.len()) as u64;
            }
            Ok(None) => break,
            Err(e @ QueueError::PairMisaligned { .. }) => {
                warn!("{e}");
                tally.misalignments += 1;
            }
            Err(e) => {
                warn!("Stopping consumer: {e}");
                break;
            }
        }
    }
    tally
}
