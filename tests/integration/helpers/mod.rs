//! Helper utilities for integration tests.

pub mod fastq_generator;
pub mod queue_helpers;

pub use fastq_generator::*;
pub use queue_helpers::*;
