//! Common CLI options shared across commands.
//!
//! This module provides shared argument structures that can be composed into
//! command structs using `#[command(flatten)]`.

use std::path::PathBuf;

use clap::{Args, ValueEnum};

use readq_lib::read_queue::{DEFAULT_BATCH_SIZE, QueueConfig};
use readq_lib::validation::{validate_files_exist, validate_positive};

/// How the input FASTQ files are arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputLayout {
    /// Every file is an independent single-end source.
    Single,
    /// Files are taken two at a time as R1/R2 pairs.
    Paired,
    /// Every file holds R1 and R2 records alternating.
    Interleaved,
}

/// Input FASTQ files and their layout.
#[derive(Debug, Clone, Args)]
pub struct FastqInputOptions {
    /// Input FASTQ files (plain or gzipped)
    #[arg(short = 'i', long = "input", required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// How the input files are arranged
    #[arg(short = 'l', long = "layout", value_enum, default_value = "single")]
    pub layout: InputLayout,
}

impl FastqInputOptions {
    /// Validates that every input exists and that paired inputs come in twos.
    ///
    /// # Errors
    ///
    /// Returns an error if an input is missing or an odd number of paired inputs is given.
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_files_exist(&self.inputs, "Input FASTQ")?;
        if self.layout == InputLayout::Paired && self.inputs.len() % 2 != 0 {
            anyhow::bail!(
                "--layout paired needs an even number of inputs (R1 R2 R1 R2 ...), got {}",
                self.inputs.len()
            );
        }
        Ok(())
    }
}

/// Queue sizing and consumer threading options.
#[derive(Debug, Clone, Args)]
pub struct QueueOptions {
    /// Number of consumer threads draining the queue
    #[arg(short = 't', long = "threads", default_value = "1")]
    pub threads: usize,

    /// Reads per batch
    #[arg(long = "batch-size", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Number of batches in the pool (default: two per reader stream plus two)
    #[arg(long = "pool-size")]
    pub pool_size: Option<usize>,
}

impl QueueOptions {
    /// Validates the options and builds the queue configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread count or batch size is zero.
    pub fn to_config(&self) -> anyhow::Result<QueueConfig> {
        validate_positive(self.threads, "threads")?;
        validate_positive(self.batch_size, "batch-size")?;
        let config = QueueConfig::default().with_batch_size(self.batch_size);
        Ok(match self.pool_size {
            Some(pool_size) => config.with_pool_size(pool_size),
            None => config,
        })
    }
}

/// Options for writing metrics to a file.
#[derive(Debug, Clone, Default, Args)]
pub struct MetricsOptions {
    /// Optional output TSV of per-reader-group metrics
    #[arg(short = 'm', long = "metrics")]
    pub metrics: Option<PathBuf>,
}
