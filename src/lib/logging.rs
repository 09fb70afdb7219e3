//! Formatting helpers for log output and queue summaries.

use std::time::{Duration, Instant};

use crate::read_queue::QueueStats;

/// Formats a count with thousands separators.
///
/// ```
/// use readq_lib::logging::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(1_234_567), "1,234,567");
/// ```
#[must_use]
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Formats a fraction (0.0-1.0) as a percentage with `decimals` decimal places.
///
/// ```
/// use readq_lib::logging::format_percent;
///
/// assert_eq!(format_percent(0.9543, 2), "95.43%");
/// assert_eq!(format_percent(1.0, 0), "100%");
/// ```
#[must_use]
pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.decimals$}%", value * 100.0, decimals = decimals)
}

/// Formats a duration in human-readable form (e.g. "45s", "2m 15s", "1h 30m").
///
/// ```
/// use readq_lib::logging::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(135)), "2m 15s");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        let mins = secs / 60;
        let remaining_secs = secs % 60;
        if remaining_secs == 0 { format!("{mins}m") } else { format!("{mins}m {remaining_secs}s") }
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins == 0 { format!("{hours}h") } else { format!("{hours}h {mins}m") }
    }
}

/// Formats a processing rate in reads per second, falling back to reads per minute for
/// slow rates.
///
/// ```
/// use readq_lib::logging::format_rate;
/// use std::time::Duration;
///
/// assert_eq!(format_rate(1000, Duration::from_secs(1)), "1,000 reads/s");
/// assert_eq!(format_rate(30, Duration::from_secs(60)), "30.0 reads/min");
/// ```
#[must_use]
pub fn format_rate(count: u64, duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 0.001 {
        return format!("{} reads/s", format_count(count));
    }

    let rate = count as f64 / secs;
    if rate >= 1.0 {
        format!("{} reads/s", format_count(rate as u64))
    } else {
        let per_min = count as f64 / (secs / 60.0);
        format!("{per_min:.1} reads/min")
    }
}

/// Logs a summary of a finished (or running) queue at info level, with per-group detail
/// at debug level.
pub fn log_queue_summary(stats: &QueueStats) {
    log::info!("Read Queue Summary ({} readers):", stats.mode);
    log::info!("  Reads queued: {}", format_count(stats.total_reads()));
    log::info!("  Batches queued: {}", format_count(stats.total_batches()));
    log::info!(
        "  Pool: {} batches of {} reads",
        stats.pool_size,
        format_count(stats.batch_size as u64)
    );

    let capacity = stats.total_batches() * stats.batch_size as u64;
    if capacity > 0 {
        let fill = stats.total_reads() as f64 / capacity as f64;
        log::info!("  Mean batch fill: {}", format_percent(fill, 1));
    }

    for (group, g) in stats.groups.iter().enumerate() {
        if stats.mode.is_paired() {
            log::debug!(
                "  Group {group}: {} / {} reads in {} / {} batches",
                format_count(g.reads[0]),
                format_count(g.reads[1]),
                g.batches[0],
                g.batches[1]
            );
        } else {
            log::debug!(
                "  Group {group}: {} reads in {} batches",
                format_count(g.reads[0]),
                g.batches[0]
            );
        }
    }

    for group in stats.failed_groups() {
        log::warn!("  Group {group} stopped early on a read error");
    }

    for m in &stats.misalignments {
        log::warn!(
            "  Group {} out of sync: {} vs {} reads ({} dropped)",
            m.group,
            m.first_reads,
            m.second_reads,
            m.dropped
        );
    }
}

/// Times an operation and logs its completion with a count and rate.
///
/// ```no_run
/// use readq_lib::logging::OperationTimer;
///
/// let timer = OperationTimer::new("Counting reads");
/// // ... do work ...
/// timer.log_completion(10_000);
/// ```
pub struct OperationTimer {
    operation: String,
    start_time: Instant,
}

impl OperationTimer {
    /// Creates a new operation timer and logs the start.
    #[must_use]
    pub fn new(operation: &str) -> Self {
        log::info!("{operation} ...");
        Self { operation: operation.to_string(), start_time: Instant::now() }
    }

    /// Time since the timer was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Logs the completion with item count and rate.
    pub fn log_completion(&self, count: u64) {
        let duration = self.elapsed();
        log::info!(
            "{} completed: {} in {} ({})",
            self.operation,
            format_count(count),
            format_duration(duration),
            format_rate(count, duration)
        );
    }
}
