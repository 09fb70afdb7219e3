#![deny(unsafe_code)]
// Clippy lint configuration for CI
// These lints are allowed because:
// - cast_*: Read and batch counters are converted between usize and u64 freely
// - missing_*_doc: Documentation improvements tracked separately
// - needless_pass_by_value: Readers are handed over by value to their threads
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::needless_pass_by_value,
    clippy::uninlined_format_args
)]

//! # readq - bounded read queues for parallel sequencing-data readers
//!
//! This library moves sequencing reads from one or more reader threads to any number of
//! consumer threads through a fixed pool of reusable batches.
//!
//! ## Overview
//!
//! ### Core Functionality
//!
//! - **[`read_queue`]** - The queue coordinator, batches, and suppliers
//! - **[`reader`]** - The reader traits the queue pulls from, plus iterator adaptors
//! - **[`fastq`]** - FASTQ readers (single-end and interleaved) for plain or gzipped input
//!
//! ### Utilities
//!
//! - **[`errors`]** - Error type shared by the library
//! - **[`logging`]** - Count/duration formatting and queue summaries
//! - **[`metrics`]** - Per-group metrics rows and TSV writing
//! - **[`validation`]** - Input validation for command-line parameters
//!
//! ## Quick Start
//!
//! ### Draining paired FASTQ files on several threads
//!
//! ```no_run
//! use readq_lib::fastq::{FastqReadReader, SequenceRead};
//! use readq_lib::read_queue::{QueueConfig, ReadSupplierQueue};
//! use readq_lib::reader::ReadReader;
//! use std::thread;
//!
//! # fn main() -> anyhow::Result<()> {
//! let r1: Box<dyn ReadReader<SequenceRead>> = Box::new(FastqReadReader::from_path("r1.fq.gz")?);
//! let r2: Box<dyn ReadReader<SequenceRead>> = Box::new(FastqReadReader::from_path("r2.fq.gz")?);
//! let mut queue = ReadSupplierQueue::new_paired_files(vec![(r1, r2)], &QueueConfig::default())?;
//!
//! let suppliers =
//!     (0..4).map(|_| queue.create_paired_supplier()).collect::<Result<Vec<_>, _>>()?;
//! queue.start_readers()?;
//!
//! thread::scope(|scope| {
//!     for mut supplier in suppliers {
//!         scope.spawn(move || {
//!             while let Ok(Some((first, second))) = supplier.next_read_pair() {
//!                 assert_eq!(first.base_name(), second.base_name());
//!             }
//!         });
//!     }
//! });
//! queue.wait_until_finished()?;
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod fastq;
pub mod logging;
pub mod metrics;
pub mod read_queue;
pub mod reader;
pub mod validation;
