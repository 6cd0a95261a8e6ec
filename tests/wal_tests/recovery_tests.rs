//! Tests for log replay
//!
//! These tests verify:
//! - Replay of a missing or empty log
//! - Only records after the last checkpoint are returned
//! - Torn tails are truncated, corrupt lines skipped and counted
//! - Inspect mode (stats only, file untouched)

use std::fs;
use std::path::PathBuf;

use lsmkv::config::LogSyncStrategy;
use lsmkv::wal::{LogAction, LogRecovery, LogWriter};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("wal.log");
    (temp_dir, log_path)
}

fn write_adds(path: &PathBuf, keys: std::ops::RangeInclusive<i64>) {
    let mut writer = LogWriter::open(path, LogSyncStrategy::OsBuffer).unwrap();
    for key in keys {
        writer.append_add(key, &format!("value{}", key)).unwrap();
    }
}

// =============================================================================
// Clean Log Tests
// =============================================================================

#[test]
fn test_replay_missing_file() {
    let (_temp, log_path) = setup_temp_log();

    let (records, stats) = LogRecovery::replay(&log_path).unwrap();

    assert!(records.is_empty());
    assert_eq!(stats.records_read, 0);
    assert!(!log_path.exists());
}

#[test]
fn test_replay_empty_file() {
    let (_temp, log_path) = setup_temp_log();
    fs::File::create(&log_path).unwrap();

    let (records, stats) = LogRecovery::replay(&log_path).unwrap();

    assert!(records.is_empty());
    assert_eq!(stats.records_replayed, 0);
    assert_eq!(stats.lines_corrupted, 0);
    assert_eq!(stats.last_checkpoint, None);
    assert!(!stats.torn_tail);
}

#[test]
fn test_replay_without_checkpoint_returns_everything_in_order() {
    let (_temp, log_path) = setup_temp_log();
    write_adds(&log_path, 1..=10);

    let (records, stats) = LogRecovery::replay(&log_path).unwrap();

    assert_eq!(records.len(), 10);
    assert_eq!(stats.records_read, 10);
    assert_eq!(stats.records_replayed, 10);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.key, i as i64 + 1);
    }
}

#[test]
fn test_replay_preserves_operations() {
    let (_temp, log_path) = setup_temp_log();
    {
        let mut writer = LogWriter::open(&log_path, LogSyncStrategy::EveryWrite).unwrap();
        writer.append_add(1, "v1").unwrap();
        writer.append_delete(1).unwrap();
        writer.append_add(2, "v2").unwrap();
    }

    let (records, _) = LogRecovery::replay(&log_path).unwrap();

    assert_eq!(records[0].action, LogAction::Add);
    assert_eq!(records[1].action, LogAction::Delete);
    assert_eq!(records[2].action, LogAction::Add);
}

// =============================================================================
// Checkpoint Tests
// =============================================================================

#[test]
fn test_replay_starts_after_last_checkpoint() {
    let (_temp, log_path) = setup_temp_log();
    {
        let mut writer = LogWriter::open(&log_path, LogSyncStrategy::OsBuffer).unwrap();
        writer.append_add(1, "a").unwrap();
        writer.checkpoint("seg-first").unwrap();
        writer.append_add(2, "b").unwrap();
        writer.append_add(3, "c").unwrap();
        writer.checkpoint("seg-second").unwrap();
        writer.append_delete(2).unwrap();
    }

    let (records, stats) = LogRecovery::replay(&log_path).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, LogAction::Delete);
    assert_eq!(records[0].key, 2);
    assert_eq!(stats.records_read, 6);
    assert_eq!(stats.records_replayed, 1);
    assert_eq!(stats.last_checkpoint.as_deref(), Some("seg-second"));
}

#[test]
fn test_replay_ending_in_checkpoint_is_empty() {
    let (_temp, log_path) = setup_temp_log();
    {
        let mut writer = LogWriter::open(&log_path, LogSyncStrategy::OsBuffer).unwrap();
        writer.append_add(1, "a").unwrap();
        writer.checkpoint("seg").unwrap();
    }

    let (records, _) = LogRecovery::replay(&log_path).unwrap();

    assert!(records.is_empty());
}

// =============================================================================
// Damaged Log Tests
// =============================================================================

#[test]
fn test_replay_truncates_torn_tail() {
    let (_temp, log_path) = setup_temp_log();
    fs::write(&log_path, "1 - 1:1,a\n2 - 1:2,b\n3 - 1:3,pa").unwrap();

    let (records, stats) = LogRecovery::replay(&log_path).unwrap();

    assert_eq!(records.len(), 2);
    assert!(stats.torn_tail);
    assert_eq!(
        fs::read_to_string(&log_path).unwrap(),
        "1 - 1:1,a\n2 - 1:2,b\n"
    );
}

#[test]
fn test_append_after_torn_tail_replay_starts_clean_line() {
    let (_temp, log_path) = setup_temp_log();
    fs::write(&log_path, "1 - 1:1,a\n2 - 1:2,b").unwrap();

    LogRecovery::replay(&log_path).unwrap();
    {
        let mut writer = LogWriter::open(&log_path, LogSyncStrategy::OsBuffer).unwrap();
        writer.append_add(3, "c").unwrap();
    }

    let (records, stats) = LogRecovery::replay(&log_path).unwrap();
    assert_eq!(records.iter().map(|r| r.key).collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(stats.lines_corrupted, 0);
}

#[test]
fn test_replay_skips_corrupt_lines() {
    let (_temp, log_path) = setup_temp_log();
    fs::write(&log_path, "1 - 1:1,a\n@@@@\n3 - 1:3,c\n").unwrap();

    let (records, stats) = LogRecovery::replay(&log_path).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(stats.lines_corrupted, 1);
    assert_eq!(stats.records_read, 2);
}

// =============================================================================
// Inspect Tests
// =============================================================================

#[test]
fn test_inspect_does_not_modify_file() {
    let (_temp, log_path) = setup_temp_log();
    let contents = "1 - 1:1,a\n2 - 1:2,b";
    fs::write(&log_path, contents).unwrap();

    let (records, stats) = LogRecovery::inspect(&log_path).unwrap();

    assert_eq!(records.len(), 1);
    assert!(stats.torn_tail);
    assert_eq!(fs::read_to_string(&log_path).unwrap(), contents);
}
