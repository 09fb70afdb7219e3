//! Integration tests for readq.
//!
//! These tests drive the queue end to end through its public API and the `readq` binary.

mod helpers;
mod test_count_command;
mod test_queue_properties;
mod test_queue_scenarios;
