//! A bounded, batch-recycling queue between reader threads and read consumers.
//!
//! One dedicated thread per reader fills fixed-capacity [`ReadBatch`]es drawn from a pool;
//! any number of suppliers, on any threads, claim filled batches and hand reads out one at a
//! time. Drained batches go back to the pool, so memory stays bounded by
//! `pool_size * batch_size` reads however far the readers get ahead.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────┐
//!       ┌────────>│  free pool   │─────────┐
//!       │         └──────────────┘         │ get_empty_batch
//!       │ done_with_batch                  v
//! ┌───────────┐   ┌──────────────┐   ┌───────────┐
//! │ suppliers │<──│ ready groups │<──│  readers  │
//! │ (callers) │   │ (round-robin)│   │ (threads) │
//! └───────────┘   └──────────────┘   └───────────┘
//!      get_batch / get_batch_pair       publish
//! ```
//!
//! # Reader modes
//!
//! - **Single-end** ([`ReadSupplierQueue::new`]): each reader is its own group; suppliers
//!   get single reads.
//! - **Paired files** ([`ReadSupplierQueue::new_paired_files`]): two readers per group whose
//!   Nth reads form the Nth pair (R1/R2 files); suppliers get pairs.
//! - **Paired reader** ([`ReadSupplierQueue::new_paired`]): one reader per group that emits
//!   pairs (interleaved input); suppliers get pairs.
//!
//! Reads from one reader (or one side of a pair) are delivered in source order; there is no
//! ordering across groups.

mod batch;
mod config;
mod group;
mod producer;
mod queue;
mod supplier;

pub use batch::{BatchCensus, BatchState, ReadBatch, Side};
pub use config::{DEFAULT_BATCH_SIZE, QueueConfig};
pub use group::{GroupStats, ReaderMode};
pub use queue::{Lifecycle, Misalignment, QueueStats, ReadSupplierQueue};
pub use supplier::{PairedReadSupplierFromQueue, ReadSupplierFromQueue};
