//! Custom error types for readq operations.

use thiserror::Error;

/// Result type alias for readq operations
pub type Result<T> = std::result::Result<T, QueueError>;

/// Error type for read queue operations
#[derive(Error, Debug)]
pub enum QueueError {
    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// An input file is missing
    #[error("{description} does not exist: {path}")]
    FileNotFound {
        /// What the file is for, e.g. "Input FASTQ"
        description: String,
        /// The path that was given
        path: String,
    },

    /// A reader thread could not be created; no reader was left running
    #[error("Failed to spawn reader thread '{thread}': {source}")]
    ThreadSpawn {
        /// Name of the thread that failed to spawn
        thread: String,
        /// The underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The queue was built for a different kind of supplier
    #[error("Cannot create a {requested} supplier for a queue of {mode} readers")]
    WrongMode {
        /// The supplier kind that was requested
        requested: &'static str,
        /// The production mode the queue was built with
        mode: &'static str,
    },

    /// `wait_until_finished` was called before `start_readers`
    #[error("Reader threads have not been started")]
    NotStarted,

    /// `start_readers` was called more than once
    #[error("Reader threads have already been started")]
    AlreadyStarted,

    /// The two sides of a paired reader group produced different numbers of reads
    #[error(
        "Reader group {group} is out of sync: {first_reads} reads on the first side vs \
         {second_reads} on the second ({dropped} unpaired reads dropped)"
    )]
    PairMisaligned {
        /// Index of the reader group
        group: usize,
        /// Reads in the first-side batch (or left over on the first side)
        first_reads: usize,
        /// Reads in the second-side batch (or left over on the second side)
        second_reads: usize,
        /// Number of reads that could not be paired and were discarded
        dropped: usize,
    },
}
