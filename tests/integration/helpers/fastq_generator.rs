//! Builders for FASTQ fixtures.

use readq_lib::fastq::SequenceRead;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Deterministic read `index` of a file, with a base count that varies by index.
pub fn make_read(prefix: &str, index: usize, suffix: &str) -> SequenceRead {
    const BASES: &[u8] = b"ACGT";
    let len = 10 + index % 7;
    let bases: String = (0..len).map(|i| BASES[(index + i) % 4] as char).collect();
    let quals = "I".repeat(len);
    SequenceRead::new(&format!("{prefix}{index}{suffix}"), &bases, &quals)
}

/// Writes `reads` to `path` as FASTQ.
pub fn write_fastq(path: &Path, reads: &[SequenceRead]) {
    let mut out = BufWriter::new(File::create(path).expect("Failed to create FASTQ"));
    for read in reads {
        out.write_all(b"@").unwrap();
        out.write_all(&read.name).unwrap();
        out.write_all(b"\n").unwrap();
        out.write_all(&read.bases).unwrap();
        out.write_all(b"\n+\n").unwrap();
        out.write_all(&read.quals).unwrap();
        out.write_all(b"\n").unwrap();
    }
    out.flush().unwrap();
}

/// Writes `count` R1 reads and `count` R2 reads to two files.
pub fn write_paired_fastqs(r1: &Path, r2: &Path, count: usize) -> (u64, u64) {
    let first: Vec<_> = (0..count).map(|i| make_read("pair", i, "/1")).collect();
    let second: Vec<_> = (0..count).map(|i| make_read("pair", i, "/2")).collect();
    write_fastq(r1, &first);
    write_fastq(r2, &second);
    (count as u64, total_bases(&first) + total_bases(&second))
}

/// Writes `count` pairs to one file with R1 and R2 records alternating.
pub fn write_interleaved_fastq(path: &Path, count: usize) -> u64 {
    let reads: Vec<_> = (0..count)
        .flat_map(|i| [make_read("pair", i, "/1"), make_read("pair", i, "/2")])
        .collect();
    write_fastq(path, &reads);
    total_bases(&reads)
}

/// Sum of read lengths.
pub fn total_bases(reads: &[SequenceRead]) -> u64 {
    reads.iter().map(|r| r.len() as u64).sum()
}
