//! Integration tests for the count command.

use readq_lib::metrics::ReaderGroupMetric;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

use crate::helpers::{
    make_read, total_bases, write_fastq, write_interleaved_fastq, write_paired_fastqs,
};

fn run_count(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_readq"))
        .arg("count")
        .args(args)
        .output()
        .expect("Failed to run count command")
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

/// Parses the `records<TAB>bases` line printed on stdout.
fn counts(output: &Output) -> (u64, u64) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().last().expect("count printed nothing");
    let (records, bases) = line.split_once('\t').expect("expected records<TAB>bases");
    (records.parse().unwrap(), bases.parse().unwrap())
}

#[test]
fn test_count_single_end_files() {
    let temp_dir = TempDir::new().unwrap();
    let a = temp_dir.path().join("a.fq");
    let b = temp_dir.path().join("b.fq");
    let reads_a: Vec<_> = (0..1_234).map(|i| make_read("a", i, "")).collect();
    let reads_b: Vec<_> = (0..17).map(|i| make_read("b", i, "")).collect();
    write_fastq(&a, &reads_a);
    write_fastq(&b, &reads_b);

    let output =
        run_count(&["-i", path_str(&a), path_str(&b), "-t", "3", "--batch-size", "50"]);
    assert!(output.status.success(), "count failed: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(counts(&output), (1_251, total_bases(&reads_a) + total_bases(&reads_b)));
}

#[test]
fn test_count_paired_files_with_metrics() {
    let temp_dir = TempDir::new().unwrap();
    let r1 = temp_dir.path().join("r1.fq");
    let r2 = temp_dir.path().join("r2.fq");
    let metrics = temp_dir.path().join("metrics.txt");
    let (pairs, bases) = write_paired_fastqs(&r1, &r2, 500);

    let output = run_count(&[
        "-i",
        path_str(&r1),
        path_str(&r2),
        "--layout",
        "paired",
        "-t",
        "2",
        "--batch-size",
        "32",
        "--metrics",
        path_str(&metrics),
    ]);
    assert!(output.status.success(), "count failed: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(counts(&output), (pairs, bases));

    let rows: Vec<ReaderGroupMetric> =
        fgoxide::io::DelimFile::default().read_tsv(&metrics).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].mode, "paired-file");
    assert_eq!((rows[0].first_reads, rows[0].second_reads), (500, 500));
    assert_eq!(rows[0].unpaired_reads, 0);
}

#[test]
fn test_count_interleaved() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("interleaved.fq");
    let bases = write_interleaved_fastq(&input, 321);

    let output = run_count(&["-i", path_str(&input), "--layout", "interleaved", "-t", "4"]);
    assert!(output.status.success(), "count failed: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(counts(&output), (321, bases));
}

#[test]
fn test_count_mismatched_pairs_fails() {
    let temp_dir = TempDir::new().unwrap();
    let r1 = temp_dir.path().join("r1.fq");
    let r2 = temp_dir.path().join("r2.fq");
    let metrics = temp_dir.path().join("metrics.txt");
    write_fastq(&r1, &(0..10).map(|i| make_read("p", i, "/1")).collect::<Vec<_>>());
    write_fastq(&r2, &(0..7).map(|i| make_read("p", i, "/2")).collect::<Vec<_>>());

    let output = run_count(&[
        "-i",
        path_str(&r1),
        path_str(&r2),
        "--layout",
        "paired",
        "--batch-size",
        "4",
        "--metrics",
        path_str(&metrics),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("out of sync"));

    // Metrics are still written, and every pair both files share was counted.
    let rows: Vec<ReaderGroupMetric> =
        fgoxide::io::DelimFile::default().read_tsv(&metrics).unwrap();
    assert_eq!(rows[0].unpaired_reads, 3);
    assert_eq!(counts(&output).0, 7);
}

#[test]
fn test_count_missing_input_fails() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.fq");
    let output = run_count(&["-i", path_str(&missing)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}

#[test]
fn test_count_odd_paired_inputs_fails() {
    let temp_dir = TempDir::new().unwrap();
    let r1 = temp_dir.path().join("r1.fq");
    write_fastq(&r1, &[make_read("p", 0, "/1")]);
    let output = run_count(&["-i", path_str(&r1), "--layout", "paired"]);
    assert!(!output.status.success());
}

#[test]
fn test_count_truncated_interleaved_input_fails() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("interleaved.fq");
    let metrics = temp_dir.path().join("metrics.txt");
    let reads = [make_read("p", 0, "/1"), make_read("p", 0, "/2"), make_read("p", 1, "/1")];
    write_fastq(&input, &reads);

    let output = run_count(&[
        "-i",
        path_str(&input),
        "--layout",
        "interleaved",
        "--metrics",
        path_str(&metrics),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("counts are incomplete"));
    assert_eq!(counts(&output).0, 1);

    let rows: Vec<ReaderGroupMetric> =
        fgoxide::io::DelimFile::default().read_tsv(&metrics).unwrap();
    assert!(rows[0].reader_failed);
}
