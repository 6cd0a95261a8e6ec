//! Tests for log records
//!
//! These tests verify:
//! - Line encoding of ADD, DELETE and CHECKPOINT records
//! - Parsing of well-formed lines
//! - Rejection of malformed lines
//! - Conversion to memtable records

use lsmkv::wal::{LogAction, LogRecord};
use lsmkv::{KvError, Record, TOMBSTONE};

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_add() {
    let record = LogRecord {
        timestamp: 1_718_000_000,
        action: LogAction::Add,
        key: 5,
        value: "hello".to_string(),
    };

    assert_eq!(record.encode(), "1718000000 - 1:5,hello\n");
}

#[test]
fn test_encode_delete_uses_tombstone_marker() {
    let mut record = LogRecord::delete(5);
    record.timestamp = 42;

    assert_eq!(record.encode(), format!("42 - 3:5,{}\n", TOMBSTONE));
}

#[test]
fn test_encode_checkpoint() {
    let mut record = LogRecord::checkpoint("seg-1-000001-0000abcd.seg");
    record.timestamp = 7;

    assert_eq!(record.encode(), "7 - 0:0,seg-1-000001-0000abcd.seg\n");
}

#[test]
fn test_constructors_stamp_current_time() {
    let record = LogRecord::add(1, "v");

    assert!(record.timestamp > 1_600_000_000);
}

// =============================================================================
// Parsing Tests
// =============================================================================

#[test]
fn test_parse_add() {
    let record = LogRecord::parse("1718000000 - 1:5,hello\n").unwrap();

    assert_eq!(record.timestamp, 1_718_000_000);
    assert_eq!(record.action, LogAction::Add);
    assert_eq!(record.key, 5);
    assert_eq!(record.value, "hello");
}

#[test]
fn test_parse_without_newline() {
    let record = LogRecord::parse("1 - 3:9,*-*").unwrap();

    assert_eq!(record.action, LogAction::Delete);
    assert_eq!(record.key, 9);
}

#[test]
fn test_parse_empty_value() {
    let record = LogRecord::parse("1 - 1:4,\n").unwrap();

    assert_eq!(record.value, "");
}

#[test]
fn test_encode_parse_preserves_record() {
    let original = LogRecord::add(123, "some value");

    let parsed = LogRecord::parse(&original.encode()).unwrap();

    assert_eq!(parsed, original);
}

#[test]
fn test_parse_rejects_malformed_lines() {
    let bad = [
        "",
        "garbage",
        "1 - 1:5",            // no value separator
        "1 1:5,x",            // no timestamp separator
        "x - 1:5,v",          // bad timestamp
        "1 - 9:5,v",          // unknown action
        "1 - 1:five,v",       // bad key
        "1 - 3:5,not-a-tomb", // delete without marker
    ];

    for line in bad {
        assert!(
            matches!(LogRecord::parse(line), Err(KvError::LogCorruption(_))),
            "expected corruption for {:?}",
            line
        );
    }
}

// =============================================================================
// Conversion Tests
// =============================================================================

#[test]
fn test_to_record() {
    assert_eq!(LogRecord::add(1, "a").to_record(), Some(Record::value(1, "a")));
    assert_eq!(LogRecord::delete(2).to_record(), Some(Record::tombstone(2)));
    assert_eq!(LogRecord::checkpoint("seg").to_record(), None);
}

#[test]
fn test_action_codes() {
    assert_eq!(LogAction::Checkpoint.code(), 0);
    assert_eq!(LogAction::Add.code(), 1);
    assert_eq!(LogAction::Delete.code(), 3);
    assert_eq!(LogAction::from_code(2), None);
}
