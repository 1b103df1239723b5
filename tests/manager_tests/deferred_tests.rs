//! Tests for DeferredFileManager
//!
//! These tests verify:
//! - create and open both reserve-or-fetch the same slot
//! - The reserve → use → load → release protocol
//! - Release and close remove cache content
//! - One failing entry never stops the rest from closing

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

use handlestore::{
    DeferredFileManager, Manager, OpenManager, ResourceState, StoreError,
};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

/// Cache root plus a scratch area on the same filesystem for producers
fn setup_cache() -> (TempDir, PathBuf, DeferredFileManager) {
    let temp_dir = TempDir::new().unwrap();
    let cache = temp_dir.path().join("cache");
    fs::create_dir(&cache).unwrap();
    let manager = DeferredFileManager::open_root(&cache).unwrap();
    (temp_dir, cache, manager)
}

/// Simulate a producer writing its output somewhere else first
fn produce(temp: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = temp.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

// =============================================================================
// Reservation Tests
// =============================================================================

#[test]
fn test_create_reserves_without_file() {
    let (_temp, cache, manager) = setup_cache();

    let (handle, release) = manager.create("result-1").unwrap();

    assert_eq!(handle.lock().state(), ResourceState::Reserved);
    assert_eq!(handle.lock().path(), cache.join("result-1").as_path());
    assert!(!cache.join("result-1").exists());
    assert!(manager.contains("result-1"));

    release.release();
}

#[test]
fn test_create_and_open_are_identical() {
    let (_temp, _cache, manager) = setup_cache();

    let (created, release) = manager.create("slot").unwrap();
    let (opened, _) = manager.open("slot").unwrap();
    let (again, _) = manager.create("slot").unwrap();

    assert!(created.ptr_eq(&opened));
    assert!(created.ptr_eq(&again));
    assert_eq!(manager.len(), 1);

    release.release();
}

#[test]
fn test_open_unknown_name_reserves() {
    let (_temp, _cache, manager) = setup_cache();

    // Unlike the permanent manager, open does not require the file
    let (handle, release) = manager.open("not-yet").unwrap();

    assert_eq!(handle.lock().state(), ResourceState::Reserved);
    release.release();
}

#[test]
fn test_reserve_existing_file_fails() {
    let (_temp, cache, manager) = setup_cache();
    fs::write(cache.join("result-42"), b"stale").unwrap();

    let created = manager.create("result-42");
    let opened = manager.open("result-42");

    assert!(matches!(created, Err(StoreError::AlreadyExists(_))));
    assert!(matches!(opened, Err(StoreError::AlreadyExists(_))));
    assert!(manager.is_empty());
}

#[test]
fn test_reserved_slot_rejects_io() {
    let (_temp, _cache, manager) = setup_cache();

    let (mut handle, release) = manager.create("empty").unwrap();

    let mut buf = [0u8; 4];
    let err = handle.read(&mut buf).unwrap_err();
    assert!(matches!(StoreError::from_io(&err), Some(StoreError::NotLoaded)));

    let err = handle.seek(SeekFrom::Start(0)).unwrap_err();
    assert!(matches!(StoreError::from_io(&err), Some(StoreError::NotLoaded)));

    release.release();
}

// =============================================================================
// Two-Phase Protocol Tests
// =============================================================================

#[test]
fn test_reserve_use_open_load_release() {
    let (temp, cache, manager) = setup_cache();
    let path = cache.join("result-42");

    // Reserve a slot for a result that will be computed later
    let (slot, _reservation) = manager.create("result-42").unwrap();

    // Producer links its output in, then hands the slot over
    let output = produce(&temp, "tmp-output", b"the answer");
    slot.lock().use_file(&output).unwrap();
    slot.lock().unload();

    // Consumer finds the same slot by name and loads it
    let (mut reader, release) = manager.open("result-42").unwrap();
    assert!(reader.ptr_eq(&slot));
    reader.lock().load().unwrap();

    let mut content = Vec::new();
    reader.read_to_end(&mut content).unwrap();
    assert_eq!(content, b"the answer");

    release.release();
    assert!(!path.exists());
    assert!(output.exists()); // Producer still owns its own file
    assert!(manager.is_empty());
}

#[test]
fn test_use_file_loads_immediately() {
    let (temp, _cache, manager) = setup_cache();
    let output = produce(&temp, "out", b"ready");

    let (mut handle, release) = manager.create("direct").unwrap();
    handle.lock().use_file(&output).unwrap();

    assert!(handle.lock().is_loaded());
    let mut content = String::new();
    handle.read_to_string(&mut content).unwrap();
    assert_eq!(content, "ready");

    release.release();
}

#[test]
fn test_load_before_use_fails() {
    let (_temp, _cache, manager) = setup_cache();

    let (handle, release) = manager.create("pending").unwrap();
    let result = handle.lock().load();

    assert!(matches!(result, Err(StoreError::NotInitialized(_))));
    release.release();
}

#[test]
fn test_use_file_twice_fails() {
    let (temp, _cache, manager) = setup_cache();
    let output = produce(&temp, "out", b"once");

    let (handle, release) = manager.create("single").unwrap();
    handle.lock().use_file(&output).unwrap();
    let result = handle.lock().use_file(&output);

    assert!(matches!(result, Err(StoreError::LinkFailed { .. })));
    release.release();
}

// =============================================================================
// Release Tests
// =============================================================================

#[test]
fn test_release_unpopulated_slot() {
    let (_temp, cache, manager) = setup_cache();

    let (handle, release) = manager.create("never-filled").unwrap();
    release.release();

    assert_eq!(handle.lock().state(), ResourceState::Closed);
    assert!(!cache.join("never-filled").exists());
    assert!(manager.is_empty());
}

#[test]
fn test_double_release_is_noop() {
    let (temp, cache, manager) = setup_cache();
    let output = produce(&temp, "out", b"data");

    let (handle, release) = manager.create("twice").unwrap();
    handle.lock().use_file(&output).unwrap();

    release.release();
    assert!(!cache.join("twice").exists());

    // Further calls find nothing to release
    release.release();
    release.release();
    assert!(manager.is_empty());
}

#[test]
fn test_name_reusable_after_release() {
    let (temp, _cache, manager) = setup_cache();
    let output = produce(&temp, "out", b"v1");

    let (first, release) = manager.create("result").unwrap();
    first.lock().use_file(&output).unwrap();
    release.release();

    let (second, release) = manager.create("result").unwrap();
    assert!(!first.ptr_eq(&second));
    assert_eq!(second.lock().state(), ResourceState::Reserved);
    release.release();
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_close_removes_all_content() {
    let (temp, cache, mut manager) = setup_cache();

    for i in 0..3 {
        let name = format!("result-{}", i);
        let output = produce(&temp, &format!("out-{}", i), b"payload");
        let (handle, _) = manager.create(&name).unwrap();
        handle.lock().use_file(&output).unwrap();
    }
    let (_, _) = manager.create("unfilled").unwrap();

    manager.close().unwrap();

    assert_eq!(fs::read_dir(&cache).unwrap().count(), 0);
    assert!(manager.is_empty());
}

#[test]
fn test_close_continues_past_failing_entry() {
    let (temp, cache, mut manager) = setup_cache();

    let output_a = produce(&temp, "out-a", b"a");
    let output_c = produce(&temp, "out-c", b"c");

    let (a, _) = manager.create("a").unwrap();
    let (_b, _) = manager.create("b").unwrap();
    let (c, _) = manager.create("c").unwrap();
    a.lock().use_file(&output_a).unwrap();
    c.lock().use_file(&output_c).unwrap();

    // A directory where b's file should be makes b's close fail
    fs::create_dir(cache.join("b")).unwrap();

    let result = manager.close();

    assert!(result.is_ok()); // Entry failures are logged, not returned
    assert!(!cache.join("a").exists());
    assert!(!cache.join("c").exists());
    assert!(cache.join("b").is_dir());
    assert!(manager.is_empty());
}

#[test]
fn test_close_fails_only_for_root() {
    let (_temp, cache, mut manager) = setup_cache();
    let (_, _) = manager.create("slot").unwrap();

    fs::remove_dir_all(&cache).unwrap();
    let result = manager.close();

    assert!(matches!(result, Err(StoreError::CloseFailure { .. })));
}

#[test]
fn test_path_returns_root() {
    let (_temp, cache, manager) = setup_cache();

    assert_eq!(manager.path(), cache.as_path());
}
