//! Shared test utilities for integration tests.
//!
//! Archives are read back with the `zip` crate so that every check goes
//! through an independent reader.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use parzip::{PathMapping, ZipOptions, Zipper};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One entry read back from an archive.
#[derive(Debug, Clone)]
pub struct ReadEntry {
    pub name: String,
    pub stored: bool,
    pub is_dir: bool,
    pub crc32: u32,
    pub unix_mode: Option<u32>,
    pub extra: Vec<u8>,
    pub data: Vec<u8>,
}

/// Reads every entry of an archive in central directory order.
pub fn read_entries(bytes: &[u8]) -> Vec<ReadEntry> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid archive");
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).expect("readable entry");
            let mut data = Vec::new();
            // The zip crate verifies the CRC while reading.
            file.read_to_end(&mut data).expect("entry data");
            ReadEntry {
                name: file.name().to_string(),
                stored: file.compression() == zip::CompressionMethod::Stored,
                is_dir: file.is_dir(),
                crc32: file.crc32(),
                unix_mode: file.unix_mode(),
                extra: file.extra_data().to_vec(),
                data,
            }
        })
        .collect()
}

/// Names of the entries of an archive, in order.
pub fn entry_names(bytes: &[u8]) -> Vec<String> {
    read_entries(bytes).into_iter().map(|e| e.name).collect()
}

/// Writes an archive of `mappings` into memory.
pub fn write_archive(options: ZipOptions, mappings: Vec<PathMapping>) -> parzip::Result<Vec<u8>> {
    Zipper::new(options).write_to(mappings, Vec::new())
}

/// Creates `rel` below `dir` with the given contents, creating parents.
pub fn write_file(dir: &Path, rel: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(&path, contents).expect("write file");
    path
}

/// Text-like data that compresses well.
pub fn compressible_data(len: usize) -> Vec<u8> {
    let line = b"the quick brown fox jumps over the lazy dog 0123456789\n";
    line.iter().copied().cycle().take(len).collect()
}

/// Compressible data with enough variety that blocks differ from each other.
pub fn varied_data(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let words: [&[u8]; 6] = [b"alpha ", b"beta ", b"gamma ", b"delta\n", b"epsilon ", b"zeta "];
    let mut data = Vec::with_capacity(len + 8);
    while data.len() < len {
        data.extend_from_slice(words[rng.gen_range(0..words.len())]);
    }
    data.truncate(len);
    data
}

/// Incompressible data.
pub fn random_data(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill(&mut data[..]);
    data
}
