//! FASTQ sources for the read queue.
//!
//! [`FastqReadReader`] reads one FASTQ file as a single-end source; two of them make an
//! R1/R2 pair of sources. [`InterleavedFastqReader`] reads a single file whose records
//! alternate R1, R2 and yields matched pairs.
//!
//! Files are opened through `fgoxide`, so plain and gzip-compressed input both work.
//! Records are copied into caller-owned [`SequenceRead`] slots, reusing their buffers.
//!
//! # Example
//!
//! ```no_run
//! use readq_lib::fastq::{FastqReadReader, SequenceRead};
//! use readq_lib::reader::ReadReader;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut reader = FastqReadReader::from_path("reads.fq.gz")?;
//! let mut read = SequenceRead::default();
//! while reader.next_read(&mut read)? {
//!     println!("{} is {} bases", read.name_str(), read.len());
//! }
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result, bail};
use fgoxide::io::Io;
use seq_io::fastq::Reader as FastqReader;
use seq_io::fastq::Record;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::reader::{PairedReadReader, ReadReader};

/// Buffer size for FASTQ file readers.
const BUFFER_SIZE: usize = 1024 * 1024;

/// One sequencing read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceRead {
    /// The header line without the leading '@'.
    pub name: Vec<u8>,
    /// The bases.
    pub bases: Vec<u8>,
    /// Phred+33 encoded qualities, one per base.
    pub quals: Vec<u8>,
}

impl SequenceRead {
    /// Builds a read from string parts; mostly useful for tests.
    #[must_use]
    pub fn new(name: &str, bases: &str, quals: &str) -> Self {
        Self { name: name.into(), bases: bases.into(), quals: quals.into() }
    }

    /// Number of bases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    /// True if the read has no bases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// The name as text (lossy).
    #[must_use]
    pub fn name_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    /// The read name up to the first whitespace, with any `/1` or `/2` suffix removed.
    #[must_use]
    pub fn base_name(&self) -> &[u8] {
        let id = self.name.split(u8::is_ascii_whitespace).next().unwrap_or(&[]);
        match id {
            [head @ .., b'/', b'1' | b'2'] => head,
            _ => id,
        }
    }

    /// Overwrites this read with `record`, keeping the existing allocations.
    fn fill_from<R: Record>(&mut self, record: &R) {
        self.name.clear();
        self.name.extend_from_slice(record.head());
        self.bases.clear();
        self.bases.extend_from_slice(record.seq());
        self.quals.clear();
        self.quals.extend_from_slice(record.qual());
    }
}

/// Opens a plain or gzipped FASTQ file for reading.
pub fn open_fastq<P: AsRef<Path>>(path: P) -> Result<FastqReader<Box<dyn BufRead + Send>>> {
    let path = path.as_ref();
    let io = Io::new(5, BUFFER_SIZE);
    let reader = io
        .new_reader(path)
        .with_context(|| format!("Failed to open FASTQ file: {}", path.display()))?;
    Ok(FastqReader::with_capacity(reader, BUFFER_SIZE))
}

/// A single-end FASTQ source.
pub struct FastqReadReader {
    source: FastqReader<Box<dyn BufRead + Send>>,
    path: PathBuf,
    records: u64,
}

impl FastqReadReader {
    /// Opens `path` (plain or gzipped).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Ok(Self { source: open_fastq(path)?, path: path.to_path_buf(), records: 0 })
    }

    /// Wraps an already opened stream; `label` names it in error messages.
    #[must_use]
    pub fn from_reader(reader: Box<dyn BufRead + Send>, label: &str) -> Self {
        Self {
            source: FastqReader::with_capacity(reader, BUFFER_SIZE),
            path: PathBuf::from(label),
            records: 0,
        }
    }
}

impl ReadReader<SequenceRead> for FastqReadReader {
    fn next_read(&mut self, read: &mut SequenceRead) -> Result<bool> {
        match self.source.next() {
            None => Ok(false),
            Some(record) => {
                let record = record.with_context(|| {
                    format!(
                        "Error parsing FASTQ record {} of {}",
                        self.records + 1,
                        self.path.display()
                    )
                })?;
                read.fill_from(&record);
                self.records += 1;
                Ok(true)
            }
        }
    }
}

/// A FASTQ source whose records alternate first and second of pair.
///
/// Fails if the file holds an odd number of records or if the two records of a pair have
/// different names (ignoring `/1` and `/2` suffixes and anything after the first space).
pub struct InterleavedFastqReader {
    inner: FastqReadReader,
    pairs: u64,
}

impl InterleavedFastqReader {
    /// Opens `path` (plain or gzipped).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self { inner: FastqReadReader::from_path(path)?, pairs: 0 })
    }

    /// Wraps an already opened stream; `label` names it in error messages.
    #[must_use]
    pub fn from_reader(reader: Box<dyn BufRead + Send>, label: &str) -> Self {
        Self { inner: FastqReadReader::from_reader(reader, label), pairs: 0 }
    }
}

impl PairedReadReader<SequenceRead> for InterleavedFastqReader {
    fn next_read_pair(
        &mut self,
        first: &mut SequenceRead,
        second: &mut SequenceRead,
    ) -> Result<bool> {
        if !self.inner.next_read(first)? {
            return Ok(false);
        }
        if !self.inner.next_read(second)? {
            bail!(
                "Interleaved FASTQ {} ends with an unpaired record: {}",
                self.inner.path.display(),
                first.name_str()
            );
        }
        if first.base_name() != second.base_name() {
            bail!(
                "Interleaved FASTQ {} is out of order at pair {}: '{}' vs '{}'",
                self.inner.path.display(),
                self.pairs + 1,
                first.name_str(),
                second.name_str()
            );
        }
        self.pairs += 1;
        Ok(true)
    }
}
