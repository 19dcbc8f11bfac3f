//! Round-trip integration tests for parzip.
//!
//! Archives are written from files on disk and read back with an
//! independent reader. This file focuses on:
//! - Entry order and directory entries
//! - Whole-file and parallel block compression
//! - Store fallback and forced Store
//! - Determinism and the fixed timestamp

mod common;

use std::fs;

use parzip::codec::MIN_PARALLEL_FILE_SIZE;
use parzip::{CompressionMethod, PathMapping, ZipOptions};
use tempfile::TempDir;

// =============================================================================
// Entry Layout
// =============================================================================

#[test]
fn test_file_and_directory_example() {
    let temp = TempDir::new().unwrap();
    let a = common::write_file(temp.path(), "a.txt", b"hello");
    let b = temp.path().join("b");
    fs::create_dir(&b).unwrap();

    let mappings = vec![
        PathMapping::new("a.txt", a, CompressionMethod::Deflate),
        PathMapping::new("b/", b, CompressionMethod::Store),
    ];
    let bytes = common::write_archive(ZipOptions::new().directories(true), mappings).unwrap();

    let entries = common::read_entries(&bytes);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "a.txt");
    assert_eq!(entries[0].data, b"hello");
    assert_eq!(entries[1].name, "b/");
    assert!(entries[1].is_dir);
}

#[test]
fn test_entries_keep_mapping_order() {
    let temp = TempDir::new().unwrap();
    let names = ["zeta.txt", "alpha.txt", "mid/beta.txt", "gamma.txt"];
    let mappings = names
        .iter()
        .map(|name| {
            let src = common::write_file(temp.path(), name, name.as_bytes());
            PathMapping::new(*name, src, CompressionMethod::Deflate)
        })
        .collect();

    let bytes = common::write_archive(ZipOptions::new().jobs(4), mappings).unwrap();
    assert_eq!(common::entry_names(&bytes), names);
}

#[test]
fn test_parent_directories_top_down() {
    let temp = TempDir::new().unwrap();
    let z = common::write_file(temp.path(), "z.txt", b"z");
    let w = common::write_file(temp.path(), "w.txt", b"w");
    let mappings = vec![
        PathMapping::new("x/y/z.txt", z, CompressionMethod::Deflate),
        PathMapping::new("x/w.txt", w, CompressionMethod::Deflate),
    ];

    let bytes = common::write_archive(ZipOptions::new().directories(true), mappings).unwrap();
    assert_eq!(
        common::entry_names(&bytes),
        ["x/", "x/y/", "x/y/z.txt", "x/w.txt"]
    );
}

#[test]
fn test_no_directory_entries_by_default() {
    let temp = TempDir::new().unwrap();
    let z = common::write_file(temp.path(), "z.txt", b"z");
    let dir = temp.path().join("d");
    fs::create_dir(&dir).unwrap();
    let mappings = vec![
        PathMapping::new("d", dir, CompressionMethod::Store),
        PathMapping::new("x/y/z.txt", z, CompressionMethod::Deflate),
    ];

    let bytes = common::write_archive(ZipOptions::new(), mappings).unwrap();
    assert_eq!(common::entry_names(&bytes), ["x/y/z.txt"]);
}

// =============================================================================
// Compression Paths
// =============================================================================

#[test]
fn test_crc_and_content_match() {
    let temp = TempDir::new().unwrap();
    let data = common::compressible_data(100_000);
    let src = common::write_file(temp.path(), "data.txt", &data);

    let bytes = common::write_archive(
        ZipOptions::new(),
        vec![PathMapping::new("data.txt", src, CompressionMethod::Deflate)],
    )
    .unwrap();

    let entries = common::read_entries(&bytes);
    assert!(!entries[0].stored);
    assert_eq!(entries[0].data, data);
    assert_eq!(entries[0].crc32, crc32fast::hash(&data));
    assert!(bytes.len() < data.len() / 10);
}

#[test]
fn test_parallel_threshold_boundary() {
    let temp = TempDir::new().unwrap();
    let threshold = MIN_PARALLEL_FILE_SIZE as usize;
    let sizes = [threshold - 1, threshold, threshold + 1, threshold + 2_500_000];

    let mut mappings = Vec::new();
    let mut expected = Vec::new();
    for (i, size) in sizes.iter().enumerate() {
        let data = common::varied_data(*size, i as u64);
        let name = format!("file{i}.txt");
        let src = common::write_file(temp.path(), &name, &data);
        mappings.push(PathMapping::new(name, src, CompressionMethod::Deflate));
        expected.push(data);
    }

    let bytes = common::write_archive(ZipOptions::new().jobs(4), mappings).unwrap();
    let entries = common::read_entries(&bytes);
    assert_eq!(entries.len(), sizes.len());
    for (entry, data) in entries.iter().zip(&expected) {
        assert!(!entry.stored, "{} should be deflated", entry.name);
        assert_eq!(entry.data.len(), data.len());
        assert!(entry.data == *data, "{} content differs", entry.name);
        assert_eq!(entry.crc32, crc32fast::hash(data));
    }
}

#[test]
fn test_parallel_matches_whole_file_ratio() {
    let temp = TempDir::new().unwrap();
    let data = common::compressible_data(MIN_PARALLEL_FILE_SIZE as usize + 1);
    let src = common::write_file(temp.path(), "big.txt", &data);

    let bytes = common::write_archive(
        ZipOptions::new().jobs(3),
        vec![PathMapping::new("big.txt", src, CompressionMethod::Deflate)],
    )
    .unwrap();

    // Dictionary carry-over keeps repetitive data tiny across block boundaries.
    assert!(bytes.len() < data.len() / 50);
    assert_eq!(common::read_entries(&bytes)[0].data, data);
}

#[test]
fn test_single_job_small_memory_budget() {
    let temp = TempDir::new().unwrap();
    let mut mappings = Vec::new();
    let mut expected = Vec::new();
    for i in 0..5u64 {
        let data = common::varied_data(200_000 + i as usize * 1000, i);
        let name = format!("f{i}");
        let src = common::write_file(temp.path(), &name, &data);
        mappings.push(PathMapping::new(name, src, CompressionMethod::Deflate));
        expected.push(data);
    }
    let big = common::varied_data(MIN_PARALLEL_FILE_SIZE as usize + 10, 99);
    let src = common::write_file(temp.path(), "big", &big);
    mappings.push(PathMapping::new("big", src, CompressionMethod::Deflate));
    expected.push(big);

    // Every entry is larger than the budget, so they are admitted one at a time.
    let options = ZipOptions::new().jobs(1).memory_limit(1024);
    let bytes = common::write_archive(options, mappings).unwrap();
    let entries = common::read_entries(&bytes);
    for (entry, data) in entries.iter().zip(&expected) {
        assert!(entry.data == *data, "{} content differs", entry.name);
    }
}

#[test]
fn test_incompressible_falls_back_to_store() {
    let temp = TempDir::new().unwrap();
    let data = common::random_data(64 * 1024, 7);
    let src = common::write_file(temp.path(), "random.bin", &data);

    let bytes = common::write_archive(
        ZipOptions::new(),
        vec![PathMapping::new("random.bin", src, CompressionMethod::Deflate)],
    )
    .unwrap();

    let entries = common::read_entries(&bytes);
    assert!(entries[0].stored);
    assert_eq!(entries[0].data, data);
}

#[test]
fn test_empty_file() {
    let temp = TempDir::new().unwrap();
    let src = common::write_file(temp.path(), "empty", b"");

    let bytes = common::write_archive(
        ZipOptions::new(),
        vec![PathMapping::new("empty", src, CompressionMethod::Deflate)],
    )
    .unwrap();

    let entries = common::read_entries(&bytes);
    assert!(entries[0].stored);
    assert!(entries[0].data.is_empty());
    assert_eq!(entries[0].crc32, 0);
}

#[test]
fn test_forced_store() {
    let temp = TempDir::new().unwrap();
    let data = common::compressible_data(10_000);
    let src = common::write_file(temp.path(), "a.txt", &data);

    let bytes = common::write_archive(
        ZipOptions::new(),
        vec![PathMapping::new("a.txt", src, CompressionMethod::Store)],
    )
    .unwrap();

    let entries = common::read_entries(&bytes);
    assert!(entries[0].stored);
    assert_eq!(entries[0].data, data);
}

// =============================================================================
// Metadata
// =============================================================================

#[test]
fn test_deterministic_output() {
    let temp = TempDir::new().unwrap();
    let mut mappings = Vec::new();
    for i in 0..8u64 {
        let name = format!("dir{}/file{i}.txt", i % 3);
        let src = common::write_file(temp.path(), &name, &common::varied_data(30_000, i));
        mappings.push(PathMapping::new(name, src, CompressionMethod::Deflate));
    }
    let big = common::write_file(
        temp.path(),
        "big.txt",
        &common::varied_data(MIN_PARALLEL_FILE_SIZE as usize + 5000, 42),
    );
    mappings.push(PathMapping::new("big.txt", big, CompressionMethod::Deflate));

    let options = ZipOptions::new().directories(true);
    let first = common::write_archive(options.clone().jobs(8), mappings.clone()).unwrap();
    let second = common::write_archive(options.jobs(2), mappings).unwrap();
    assert!(first == second, "archives differ");
}

#[test]
fn test_fixed_timestamp() {
    let temp = TempDir::new().unwrap();
    let src = common::write_file(temp.path(), "a.txt", b"a");
    let bytes = common::write_archive(
        ZipOptions::new(),
        vec![PathMapping::new("a.txt", src, CompressionMethod::Deflate)],
    )
    .unwrap();

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let modified = archive.by_index(0).unwrap().last_modified();
    assert_eq!(
        (modified.year(), modified.month(), modified.day()),
        (2008, 1, 1)
    );
    assert_eq!((modified.hour(), modified.minute()), (0, 0));
}

#[cfg(unix)]
#[test]
fn test_symlink_stored_as_link() {
    let temp = TempDir::new().unwrap();
    let link = temp.path().join("link");
    std::os::unix::fs::symlink("target/file.txt", &link).unwrap();

    let bytes = common::write_archive(
        ZipOptions::new(),
        vec![PathMapping::new("link", link, CompressionMethod::Deflate)],
    )
    .unwrap();

    let entries = common::read_entries(&bytes);
    assert!(entries[0].stored);
    assert_eq!(entries[0].data, b"target/file.txt");
    assert_eq!(entries[0].unix_mode, Some(0o120777));
}

#[cfg(unix)]
#[test]
fn test_symlink_followed() {
    let temp = TempDir::new().unwrap();
    let target = common::write_file(temp.path(), "real.txt", b"real contents");
    let link = temp.path().join("link");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    let bytes = common::write_archive(
        ZipOptions::new().store_symlinks(false),
        vec![PathMapping::new("link", link, CompressionMethod::Deflate)],
    )
    .unwrap();

    let entries = common::read_entries(&bytes);
    assert_eq!(entries[0].data, b"real contents");
    assert_eq!(entries[0].unix_mode, Some(0o100644));
}

#[cfg(unix)]
#[test]
fn test_executable_mode() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let script = common::write_file(temp.path(), "run.sh", b"#!/bin/sh\n");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let bytes = common::write_archive(
        ZipOptions::new(),
        vec![PathMapping::new("run.sh", script, CompressionMethod::Deflate)],
    )
    .unwrap();
    assert_eq!(common::read_entries(&bytes)[0].unix_mode, Some(0o100755));
}
