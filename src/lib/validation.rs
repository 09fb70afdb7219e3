//! Input validation utilities for command-line parameters and file paths.

use crate::errors::{QueueError, Result};
use std::fmt::Display;
use std::path::Path;

/// Validate that a file exists
///
/// # Example
/// ```
/// use readq_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/reads.fq", "Input FASTQ");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        return Err(QueueError::FileNotFound {
            description: description.to_string(),
            path: path_ref.display().to_string(),
        });
    }
    Ok(())
}

/// Validate that several files exist, reporting the first one that does not.
pub fn validate_files_exist<P: AsRef<Path>>(files: &[P], description: &str) -> Result<()> {
    files.iter().try_for_each(|path| validate_file_exists(path, description))
}

/// Validate that a value is positive (> 0)
///
/// # Example
/// ```
/// use readq_lib::validation::validate_positive;
///
/// validate_positive(10, "threads").unwrap();
/// assert!(validate_positive(0, "threads").is_err());
/// ```
#[allow(clippy::needless_pass_by_value)]
pub fn validate_positive<T: Ord + Display + Default>(value: T, name: &str) -> Result<()> {
    if value <= T::default() {
        return Err(QueueError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("Must be positive (> 0), got: {value}"),
        });
    }
    Ok(())
}
