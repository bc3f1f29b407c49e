//! Unit tests for the file-backed cache handler

use crate::backend::{pipeline_cache_key, PipelineCacheHandler};
use crate::cache_handler::DefaultCacheHandler;
use tempfile::tempdir;

#[test]
fn test_missing_file_means_no_cache() {
    let dir = tempdir().unwrap();
    let handler = DefaultCacheHandler::new(dir.path());
    assert!(handler.load(42).is_empty());
}

#[test]
fn test_store_then_load_round_trip() {
    let dir = tempdir().unwrap();
    let handler = DefaultCacheHandler::new(dir.path());
    let blob: Vec<u8> = (0..=255u8).cycle().take(1000).collect();

    handler.store(7, &blob);

    assert_eq!(handler.load(7), blob);
}

#[test]
fn test_round_trip_across_handler_instances() {
    let dir = tempdir().unwrap();
    let key = pipeline_cache_key(0xABCD);

    DefaultCacheHandler::new(dir.path()).store(key, &[1, 2, 3, 4]);
    let reloaded = DefaultCacheHandler::new(dir.path()).load(key);

    assert_eq!(reloaded, vec![1, 2, 3, 4]);
}

#[test]
fn test_file_name_is_decimal_key() {
    let dir = tempdir().unwrap();
    let handler = DefaultCacheHandler::new(dir.path());
    let key = u64::MAX;

    handler.store(key, &[9]);

    let expected = dir.path().join("18446744073709551615.bin");
    assert_eq!(handler.path_for(key), expected);
    assert_eq!(std::fs::read(expected).unwrap(), vec![9]);
}

#[test]
fn test_store_creates_nested_directory() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("pipelines").join("0000000000000001");
    let handler = DefaultCacheHandler::new(&nested);

    handler.store(1, &[5, 5]);

    assert!(nested.is_dir());
    assert_eq!(handler.load(1), vec![5, 5]);
}

#[test]
fn test_store_overwrites_previous_blob() {
    let dir = tempdir().unwrap();
    let handler = DefaultCacheHandler::new(dir.path());

    handler.store(3, &[1, 1, 1, 1]);
    handler.store(3, &[2]);

    assert_eq!(handler.load(3), vec![2]);
}
