//! CLI command implementations for readq.
//!
//! - [`count`] - Count reads or pairs in FASTQ inputs through the read queue

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::uninlined_format_args
)]

pub mod command;
pub mod common;
pub mod count;
