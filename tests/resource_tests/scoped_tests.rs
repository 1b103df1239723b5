//! Tests for ScopedResource
//!
//! These tests verify:
//! - Reservation refuses paths that already exist
//! - Stream operations fail until the resource is loaded
//! - Load/unload transitions and their error cases
//! - Populating a reservation by hard link (use_file)
//! - Close removes the backing file and is idempotent

use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use handlestore::{ResourceState, ScopedResource, StoreError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_slot() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("slot.bin");
    (temp_dir, path)
}

/// Write `content` to a source file next to the slot
fn create_source(temp: &TempDir, content: &[u8]) -> PathBuf {
    let source = temp.path().join("source.bin");
    fs::write(&source, content).unwrap();
    source
}

fn assert_not_loaded(err: io::Error) {
    assert!(
        matches!(StoreError::from_io(&err), Some(StoreError::NotLoaded)),
        "expected NotLoaded, got {:?}",
        err
    );
}

// =============================================================================
// Reserve Tests
// =============================================================================

#[test]
fn test_reserve_new_path() {
    let (_temp, path) = setup_temp_slot();

    let resource = ScopedResource::reserve(&path).unwrap();

    assert_eq!(resource.state(), ResourceState::Reserved);
    assert_eq!(resource.path(), path.as_path());
    assert_eq!(resource.name(), "slot.bin");
    assert!(!resource.is_loaded());
    assert!(!path.exists()); // Reservation does not create the file
}

#[test]
fn test_reserve_existing_path_fails() {
    let (_temp, path) = setup_temp_slot();
    fs::write(&path, b"already here").unwrap();

    let result = ScopedResource::reserve(&path);

    assert!(matches!(result, Err(StoreError::AlreadyExists(p)) if p == path));
}

#[test]
fn test_reserve_existing_directory_fails() {
    let (_temp, path) = setup_temp_slot();
    fs::create_dir(&path).unwrap();

    let result = ScopedResource::reserve(&path);

    assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
}

// =============================================================================
// Not Loaded Tests
// =============================================================================

#[test]
fn test_read_before_load_fails() {
    let (_temp, path) = setup_temp_slot();
    let mut resource = ScopedResource::reserve(&path).unwrap();

    let mut buf = [0u8; 8];
    assert_not_loaded(resource.read(&mut buf).unwrap_err());
}

#[test]
fn test_write_before_load_fails() {
    let (_temp, path) = setup_temp_slot();
    let mut resource = ScopedResource::reserve(&path).unwrap();

    assert_not_loaded(resource.write(b"data").unwrap_err());
    assert!(!path.exists()); // No lazy materialization
}

#[test]
fn test_flush_before_load_fails() {
    let (_temp, path) = setup_temp_slot();
    let mut resource = ScopedResource::reserve(&path).unwrap();

    assert_not_loaded(resource.flush().unwrap_err());
}

#[test]
fn test_seek_before_load_fails() {
    let (_temp, path) = setup_temp_slot();
    let mut resource = ScopedResource::reserve(&path).unwrap();

    assert_not_loaded(resource.seek(SeekFrom::Start(0)).unwrap_err());
}

// =============================================================================
// Load / Unload Tests
// =============================================================================

#[test]
fn test_load_unpopulated_fails() {
    let (_temp, path) = setup_temp_slot();
    let mut resource = ScopedResource::reserve(&path).unwrap();

    let result = resource.load();

    assert!(matches!(result, Err(StoreError::NotInitialized(_))));
    assert_eq!(resource.state(), ResourceState::Reserved);
}

#[test]
fn test_load_directory_fails() {
    let (_temp, path) = setup_temp_slot();
    let mut resource = ScopedResource::reserve(&path).unwrap();
    fs::create_dir(&path).unwrap();

    let result = resource.load();

    assert!(matches!(result, Err(StoreError::NotAFile(_))));
}

#[test]
fn test_load_after_external_write() {
    let (_temp, path) = setup_temp_slot();
    let mut resource = ScopedResource::reserve(&path).unwrap();
    fs::write(&path, b"produced elsewhere").unwrap();

    resource.load().unwrap();

    assert_eq!(resource.state(), ResourceState::Loaded);
    let mut content = String::new();
    resource.read_to_string(&mut content).unwrap();
    assert_eq!(content, "produced elsewhere");
}

#[test]
fn test_load_twice_fails() {
    let (_temp, path) = setup_temp_slot();
    let mut resource = ScopedResource::reserve(&path).unwrap();
    fs::write(&path, b"x").unwrap();

    resource.load().unwrap();
    let result = resource.load();

    assert!(matches!(result, Err(StoreError::AlreadyLoaded(_))));
    assert!(resource.is_loaded()); // Still usable
}

#[test]
fn test_unload_keeps_content() {
    let (_temp, path) = setup_temp_slot();
    let mut resource = ScopedResource::reserve(&path).unwrap();
    fs::write(&path, b"keep me").unwrap();
    resource.load().unwrap();

    resource.unload();

    assert_eq!(resource.state(), ResourceState::Reserved);
    assert!(path.exists());
    let mut buf = [0u8; 4];
    assert_not_loaded(resource.read(&mut buf).unwrap_err());

    // Reload starts again from the beginning
    resource.load().unwrap();
    let mut content = Vec::new();
    resource.read_to_end(&mut content).unwrap();
    assert_eq!(content, b"keep me");
}

#[test]
fn test_unload_when_reserved_is_noop() {
    let (_temp, path) = setup_temp_slot();
    let mut resource = ScopedResource::reserve(&path).unwrap();

    resource.unload();
    resource.unload();

    assert_eq!(resource.state(), ResourceState::Reserved);
}

#[test]
fn test_write_seek_read_when_loaded() {
    let (_temp, path) = setup_temp_slot();
    let mut resource = ScopedResource::reserve(&path).unwrap();
    fs::write(&path, b"").unwrap();
    resource.load().unwrap();

    resource.write_all(b"hello world").unwrap();
    resource.flush().unwrap();
    assert_eq!(resource.seek(SeekFrom::Start(6)).unwrap(), 6);

    let mut content = String::new();
    resource.read_to_string(&mut content).unwrap();
    assert_eq!(content, "world");
    assert_eq!(fs::read(&path).unwrap(), b"hello world");
}

// =============================================================================
// Use Tests
// =============================================================================

#[test]
fn test_use_file_round_trip() {
    let (temp, path) = setup_temp_slot();
    let source = create_source(&temp, b"computed result");
    let mut resource = ScopedResource::reserve(&path).unwrap();

    resource.use_file(&source).unwrap();

    assert!(resource.is_loaded());
    let mut content = Vec::new();
    resource.read_to_end(&mut content).unwrap();
    assert_eq!(content, b"computed result");

    // Source is untouched and still owned by the producer
    assert_eq!(fs::read(&source).unwrap(), b"computed result");
}

#[test]
fn test_use_file_when_target_exists_fails() {
    let (temp, path) = setup_temp_slot();
    let source = create_source(&temp, b"new");
    let mut resource = ScopedResource::reserve(&path).unwrap();
    fs::write(&path, b"old").unwrap();

    let result = resource.use_file(&source);

    assert!(matches!(result, Err(StoreError::LinkFailed { .. })));
    assert!(!resource.is_loaded());
    assert_eq!(fs::read(&path).unwrap(), b"old");
}

#[test]
fn test_use_file_missing_source_fails() {
    let (temp, path) = setup_temp_slot();
    let mut resource = ScopedResource::reserve(&path).unwrap();

    let result = resource.use_file(temp.path().join("missing.bin"));

    assert!(matches!(result, Err(StoreError::LinkFailed { .. })));
    assert_eq!(resource.state(), ResourceState::Reserved);
}

#[test]
fn test_use_file_after_unload_fails() {
    let (temp, path) = setup_temp_slot();
    let source = create_source(&temp, b"first");
    let mut resource = ScopedResource::reserve(&path).unwrap();
    resource.use_file(&source).unwrap();
    resource.unload();

    // The slot is already populated
    let result = resource.use_file(&source);

    assert!(matches!(result, Err(StoreError::LinkFailed { .. })));
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_close_removes_backing_file() {
    let (temp, path) = setup_temp_slot();
    let source = create_source(&temp, b"data");
    let mut resource = ScopedResource::reserve(&path).unwrap();
    resource.use_file(&source).unwrap();

    resource.close().unwrap();

    assert_eq!(resource.state(), ResourceState::Closed);
    assert!(!path.exists());
    assert!(source.exists()); // Only the linked copy goes away
}

#[test]
fn test_close_unpopulated_reservation() {
    let (_temp, path) = setup_temp_slot();
    let mut resource = ScopedResource::reserve(&path).unwrap();

    resource.close().unwrap();

    assert_eq!(resource.state(), ResourceState::Closed);
}

#[test]
fn test_close_twice_is_noop() {
    let (_temp, path) = setup_temp_slot();
    let mut resource = ScopedResource::reserve(&path).unwrap();
    fs::write(&path, b"data").unwrap();
    resource.load().unwrap();

    resource.close().unwrap();
    resource.close().unwrap();

    assert_eq!(resource.state(), ResourceState::Closed);
    assert!(!path.exists());
}

#[test]
fn test_close_directory_fails() {
    let (_temp, path) = setup_temp_slot();
    let mut resource = ScopedResource::reserve(&path).unwrap();
    fs::create_dir(&path).unwrap();

    let result = resource.close();

    assert!(matches!(result, Err(StoreError::NotAFile(_))));
    assert!(path.is_dir());
}

#[test]
fn test_closed_resource_cannot_be_reused() {
    let (temp, path) = setup_temp_slot();
    let source = create_source(&temp, b"data");
    let mut resource = ScopedResource::reserve(&path).unwrap();
    resource.close().unwrap();

    assert!(matches!(resource.load(), Err(StoreError::Closed(_))));
    assert!(matches!(resource.use_file(&source), Err(StoreError::Closed(_))));
    assert!(!path.exists());

    let mut buf = [0u8; 1];
    assert_not_loaded(resource.read(&mut buf).unwrap_err());
}
