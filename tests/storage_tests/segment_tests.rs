//! Tests for segment files
//!
//! These tests verify:
//! - Writing records in the `<key>,<value>` line format
//! - Key ordering enforcement on write and read
//! - Temporary file handling (commit by rename, cleanup on drop)
//! - Point lookups, including tombstones and early exit
//! - Corruption and missing-file reporting

use std::fs;
use std::path::PathBuf;

use lsmkv::storage::{SegmentReader, SegmentWriter};
use lsmkv::{Entry, KvError, Record};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_segment() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("seg-1-000001-00000001.seg");
    (temp_dir, path)
}

fn write_segment(path: &PathBuf, records: &[Record]) {
    let mut writer = SegmentWriter::create(path).unwrap();
    for record in records {
        writer.add(record).unwrap();
    }
    writer.finish().unwrap();
}

fn tmp_files(dir: &std::path::Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .path()
                .extension()
                .map_or(false, |ext| ext == "tmp")
        })
        .count()
}

// =============================================================================
// Writer Tests
// =============================================================================

#[test]
fn test_write_line_format() {
    let (_temp, path) = setup_temp_segment();

    write_segment(
        &path,
        &[Record::value(3, "b"), Record::value(5, "c"), Record::tombstone(9)],
    );

    assert_eq!(fs::read_to_string(&path).unwrap(), "3,b\n5,c\n9,*-*\n");
}

#[test]
fn test_finish_returns_metadata() {
    let (_temp, path) = setup_temp_segment();

    let mut writer = SegmentWriter::create(&path).unwrap();
    writer.add(&Record::value(2, "a")).unwrap();
    writer.add(&Record::tombstone(4)).unwrap();
    writer.add(&Record::value(8, "b")).unwrap();
    assert_eq!(writer.record_count(), 3);
    let meta = writer.finish().unwrap();

    assert_eq!(meta.name, "seg-1-000001-00000001.seg");
    assert_eq!(meta.record_count, 3);
    assert_eq!(meta.tombstone_count, 1);
    assert_eq!(meta.min_key, Some(2));
    assert_eq!(meta.max_key, Some(8));
    assert!(meta.might_contain(5));
    assert!(!meta.might_contain(9));
}

#[test]
fn test_empty_segment() {
    let (_temp, path) = setup_temp_segment();

    let meta = SegmentWriter::create(&path).unwrap().finish().unwrap();

    assert!(meta.is_empty());
    assert!(!meta.might_contain(1));
    assert_eq!(fs::read_to_string(&path).unwrap(), "");
}

#[test]
fn test_writer_rejects_unordered_keys() {
    let (_temp, path) = setup_temp_segment();

    let mut writer = SegmentWriter::create(&path).unwrap();
    writer.add(&Record::value(5, "a")).unwrap();

    assert!(matches!(
        writer.add(&Record::value(3, "b")),
        Err(KvError::InvalidInput(_))
    ));
    assert!(matches!(
        writer.add(&Record::value(5, "c")),
        Err(KvError::InvalidInput(_))
    ));
}

#[test]
fn test_uncommitted_segment_is_invisible() {
    let (temp, path) = setup_temp_segment();

    let mut writer = SegmentWriter::create(&path).unwrap();
    writer.add(&Record::value(1, "a")).unwrap();

    assert!(!path.exists());
    assert_eq!(tmp_files(temp.path()), 1);

    writer.finish().unwrap();

    assert!(path.exists());
    assert_eq!(tmp_files(temp.path()), 0);
}

#[test]
fn test_dropped_writer_removes_temp_file() {
    let (temp, path) = setup_temp_segment();

    {
        let mut writer = SegmentWriter::create(&path).unwrap();
        writer.add(&Record::value(1, "a")).unwrap();
    }

    assert!(!path.exists());
    assert_eq!(tmp_files(temp.path()), 0);
}

#[test]
fn test_finish_fails_when_directory_is_gone() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("segments");
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("seg-1-000001-00000001.seg");

    let mut writer = SegmentWriter::create(&path).unwrap();
    writer.add(&Record::value(1, "a")).unwrap();
    fs::remove_dir_all(&dir).unwrap();

    assert!(matches!(writer.finish(), Err(KvError::Io(_))));
    assert!(!path.exists());
}

#[test]
fn test_finish_leaves_only_the_committed_file() {
    let (temp, path) = setup_temp_segment();
    write_segment(&path, &[Record::value(1, "a")]);

    let names: Vec<String> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();

    assert_eq!(names, vec!["seg-1-000001-00000001.seg".to_string()]);
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_reader_yields_records_in_order() {
    let (_temp, path) = setup_temp_segment();
    let records = vec![
        Record::value(1, "one"),
        Record::tombstone(2),
        Record::value(10, ""),
    ];
    write_segment(&path, &records);

    let reader = SegmentReader::open(&path).unwrap();
    assert_eq!(reader.name(), "seg-1-000001-00000001.seg");

    let read: Vec<Record> = reader.collect::<Result<_, _>>().unwrap();
    assert_eq!(read, records);
}

#[test]
fn test_get() {
    let (_temp, path) = setup_temp_segment();
    write_segment(
        &path,
        &[Record::value(3, "b"), Record::value(5, "c"), Record::tombstone(7)],
    );

    let get = |key| SegmentReader::open(&path).unwrap().get(key).unwrap();

    assert_eq!(get(3), Some(Entry::Value("b".to_string())));
    assert_eq!(get(5), Some(Entry::Value("c".to_string())));
    assert_eq!(get(7), Some(Entry::Tombstone));
    assert_eq!(get(1), None);
    assert_eq!(get(4), None);
    assert_eq!(get(100), None);
}

#[test]
fn test_get_stops_before_damage_past_the_key() {
    let (_temp, path) = setup_temp_segment();
    fs::write(&path, "1,a\n2,b\n3,c\nthis line is damaged\n").unwrap();

    let reader = SegmentReader::open(&path).unwrap();

    assert_eq!(reader.get(2).unwrap(), Some(Entry::Value("b".to_string())));
}

#[test]
fn test_open_missing_segment() {
    let (_temp, path) = setup_temp_segment();

    match SegmentReader::open(&path) {
        Err(KvError::SegmentMissing(name)) => assert_eq!(name, "seg-1-000001-00000001.seg"),
        other => panic!("expected SegmentMissing, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_reader_reports_malformed_line() {
    let (_temp, path) = setup_temp_segment();
    fs::write(&path, "1,a\nbroken\n3,c\n").unwrap();

    let mut reader = SegmentReader::open(&path).unwrap();
    assert!(reader.next_record().unwrap().is_some());

    match reader.next_record() {
        Err(KvError::SegmentCorruption { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected SegmentCorruption, got {:?}", other),
    }
    assert!(reader.next_record().unwrap().is_none());
}

#[test]
fn test_reader_reports_unordered_keys() {
    let (_temp, path) = setup_temp_segment();
    fs::write(&path, "5,a\n3,b\n").unwrap();

    let result: Result<Vec<Record>, KvError> = SegmentReader::open(&path).unwrap().collect();

    assert!(matches!(result, Err(KvError::SegmentCorruption { .. })));
}
