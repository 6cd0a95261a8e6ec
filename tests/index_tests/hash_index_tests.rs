//! Tests for HashIndex
//!
//! These tests verify:
//! - Insert, overwrite and lookup
//! - Negative keys hash into range
//! - Growth and rehash past the load factor
//! - Removal and clear

use lsmkv::index::HashIndex;

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_index_is_empty() {
    let index = HashIndex::new(16, 0.8);

    assert!(index.is_empty());
    assert_eq!(index.len(), 0);
    assert_eq!(index.bucket_count(), 16);
    assert_eq!(index.lookup(1), None);
}

#[test]
fn test_insert_and_lookup() {
    let mut index = HashIndex::new(16, 0.8);

    index.insert_or_update(7, "seg-a").unwrap();
    index.insert_or_update(23, "seg-b").unwrap();

    assert_eq!(index.lookup(7), Some("seg-a"));
    assert_eq!(index.lookup(23), Some("seg-b"));
    assert_eq!(index.lookup(8), None);
    assert_eq!(index.len(), 2);
}

#[test]
fn test_insert_overwrites_existing_mapping() {
    let mut index = HashIndex::new(16, 0.8);

    index.insert_or_update(7, "seg-old").unwrap();
    index.insert_or_update(7, "seg-new").unwrap();

    assert_eq!(index.lookup(7), Some("seg-new"));
    assert_eq!(index.len(), 1);
}

#[test]
fn test_colliding_keys_are_chained() {
    let mut index = HashIndex::new(8, 1.0);

    // All map to bucket 3
    index.insert_or_update(3, "a").unwrap();
    index.insert_or_update(11, "b").unwrap();
    index.insert_or_update(19, "c").unwrap();

    assert_eq!(index.lookup(3), Some("a"));
    assert_eq!(index.lookup(11), Some("b"));
    assert_eq!(index.lookup(19), Some("c"));
}

#[test]
fn test_negative_keys() {
    let mut index = HashIndex::new(8, 0.8);

    index.insert_or_update(-1, "neg").unwrap();
    index.insert_or_update(7, "pos").unwrap();
    index.insert_or_update(i64::MIN, "min").unwrap();

    assert_eq!(index.lookup(-1), Some("neg"));
    assert_eq!(index.lookup(7), Some("pos"));
    assert_eq!(index.lookup(i64::MIN), Some("min"));
}

// =============================================================================
// Growth Tests
// =============================================================================

#[test]
fn test_grows_past_load_factor() {
    let mut index = HashIndex::new(4, 0.8);

    // 3/4 = 0.75 stays, 4/4 = 1.0 grows
    for key in 1..=3 {
        index.insert_or_update(key, "seg").unwrap();
    }
    assert_eq!(index.bucket_count(), 4);

    index.insert_or_update(4, "seg").unwrap();
    assert_eq!(index.bucket_count(), 8);
    assert!(index.load_factor() <= 0.8);
}

#[test]
fn test_lookups_survive_rehash() {
    let mut index = HashIndex::new(2, 0.8);

    for key in 1..=500 {
        index.insert_or_update(key, &format!("seg-{}", key % 7)).unwrap();
    }

    assert_eq!(index.len(), 500);
    assert!(index.load_factor() <= 0.8);
    for key in 1..=500 {
        assert_eq!(index.lookup(key), Some(format!("seg-{}", key % 7).as_str()));
    }
}

#[test]
fn test_overwrite_does_not_grow() {
    let mut index = HashIndex::new(4, 0.8);

    for _ in 0..100 {
        index.insert_or_update(1, "seg").unwrap();
    }

    assert_eq!(index.len(), 1);
    assert_eq!(index.bucket_count(), 4);
}

// =============================================================================
// Removal Tests
// =============================================================================

#[test]
fn test_remove() {
    let mut index = HashIndex::new(8, 0.8);

    index.insert_or_update(1, "a").unwrap();
    index.insert_or_update(9, "b").unwrap();

    assert_eq!(index.remove(1), Some("a".to_string()));
    assert_eq!(index.remove(1), None);
    assert_eq!(index.lookup(9), Some("b"));
    assert_eq!(index.len(), 1);
}

#[test]
fn test_clear_keeps_buckets() {
    let mut index = HashIndex::new(2, 0.8);
    for key in 1..=10 {
        index.insert_or_update(key, "seg").unwrap();
    }
    let buckets = index.bucket_count();

    index.clear();

    assert!(index.is_empty());
    assert_eq!(index.bucket_count(), buckets);
    assert_eq!(index.lookup(5), None);
}
