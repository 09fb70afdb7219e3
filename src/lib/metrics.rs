//! Per-group queue metrics and TSV output.

use anyhow::{Context, Result};
use fgoxide::io::DelimFile;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::read_queue::QueueStats;

/// Reads and batches produced by one reader group, one row per group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderGroupMetric {
    /// Index of the reader group.
    pub group: usize,
    /// Production mode of the queue (`single-end`, `paired-file` or `paired`).
    pub mode: String,
    /// Reads published on the first (or only) side.
    pub first_reads: u64,
    /// Reads published on the second side; zero for single-end queues.
    pub second_reads: u64,
    /// Batches published on the first side.
    pub first_batches: u64,
    /// Batches published on the second side.
    pub second_batches: u64,
    /// Reads that could not be paired and were dropped.
    pub unpaired_reads: u64,
    /// Whether a reader of this group stopped on a read error.
    pub reader_failed: bool,
}

impl ReaderGroupMetric {
    /// Builds one row per group from a queue snapshot.
    #[must_use]
    pub fn from_stats(stats: &QueueStats) -> Vec<Self> {
        stats
            .groups
            .iter()
            .enumerate()
            .map(|(group, g)| {
                let unpaired_reads = stats
                    .misalignments
                    .iter()
                    .filter(|m| m.group == group)
                    .map(|m| m.dropped as u64)
                    .sum();
                Self {
                    group,
                    mode: stats.mode.name().to_string(),
                    first_reads: g.reads[0],
                    second_reads: g.reads[1],
                    first_batches: g.batches[0],
                    second_batches: g.batches[1],
                    unpaired_reads,
                    reader_failed: g.reader_failed,
                }
            })
            .collect()
    }
}

/// Writes metrics rows to a TSV file with a header line.
pub fn write_metrics<P: AsRef<Path>, T: Serialize>(path: P, metrics: &[T]) -> Result<()> {
    let path = path.as_ref();
    DelimFile::default()
        .write_tsv(&path, metrics)
        .with_context(|| format!("Failed to write metrics: {}", path.display()))
}
