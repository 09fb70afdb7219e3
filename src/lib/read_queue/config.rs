//! Sizing of the batch pool.

use crate::errors::{QueueError, Result};

/// Default number of reads per batch.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Configuration for a [`ReadSupplierQueue`](super::ReadSupplierQueue).
///
/// The pool is the queue's only memory bound: at most `pool_size * batch_size` reads are
/// resident at once, however slowly the suppliers drain them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Reads per batch.
    pub batch_size: usize,
    /// Number of batches in the pool; derived from the number of reader streams if unset.
    pub pool_size: Option<usize>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { batch_size: DEFAULT_BATCH_SIZE, pool_size: None }
    }
}

impl QueueConfig {
    /// Sets the number of reads per batch.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the number of batches in the pool.
    #[must_use]
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = Some(pool_size);
        self
    }

    /// Pool size for a queue with `streams` reader streams: two batches per stream so
    /// every reader can fill one while another waits to be drained, plus two spare.
    #[must_use]
    pub fn default_pool_size(streams: usize) -> usize {
        2 * streams + 2
    }

    /// Validates the configuration for `streams` reader streams and returns
    /// `(batch_size, pool_size)`.
    ///
    /// Each stream needs at least one batch of its own, otherwise a paired group could wait
    /// forever for its second side.
    pub(crate) fn resolve(&self, streams: usize) -> Result<(usize, usize)> {
        if self.batch_size == 0 {
            return Err(QueueError::InvalidParameter {
                parameter: "batch_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if streams == 0 {
            return Err(QueueError::InvalidParameter {
                parameter: "readers".to_string(),
                reason: "at least one reader is required".to_string(),
            });
        }
        let pool_size = self.pool_size.unwrap_or_else(|| Self::default_pool_size(streams));
        if pool_size < streams {
            return Err(QueueError::InvalidParameter {
                parameter: "pool_size".to_string(),
                reason: format!("{pool_size} batches cannot serve {streams} reader streams"),
            });
        }
        Ok((self.batch_size, pool_size))
    }
}
