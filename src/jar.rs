//! Jar file conventions.
//!
//! Java tooling expects `META-INF/` and `META-INF/MANIFEST.MF` to be the
//! first entries of a jar. In jar mode mappings are sorted into four
//! buckets (the `META-INF/` directory, the manifest, everything else under
//! `META-INF/`, then the rest) and alphabetically within each bucket.
//!
//! # Example
//!
//! ```rust
//! use parzip::jar;
//!
//! let mut names = vec!["b.class", "META-INF/services/x", "a.class", "META-INF/MANIFEST.MF"];
//! names.sort_by(|a, b| jar::compare_entry_names(a, b));
//! assert_eq!(
//!     names,
//!     ["META-INF/MANIFEST.MF", "META-INF/services/x", "a.class", "b.class"]
//! );
//! ```

use std::cmp::Ordering;

use crate::codec::CompressionMethod;
use crate::format::FileHeader;
use crate::mapping::PathMapping;
use crate::timestamp::DosDateTime;

/// The jar metadata directory.
pub const META_DIR: &str = "META-INF/";

/// The jar manifest.
pub const MANIFEST_FILE: &str = "META-INF/MANIFEST.MF";

/// Extra field tag marking the `META-INF/` entry of an executable jar (0xCAFE).
pub const META_DIR_EXTRA_TAG: u16 = 0xCAFE;

/// Marker that identifies manifest contents that need no generated header.
const MANIFEST_MARKER: &str = "Manifest-Version:";

/// Value written in the generated `Created-By` manifest attribute.
pub const CREATED_BY: &str = "parzip";

/// Returns the sort bucket of an entry name.
pub fn entry_bucket(name: &str) -> usize {
    if name == META_DIR {
        0
    } else if name == MANIFEST_FILE {
        1
    } else if name.starts_with(META_DIR) {
        2
    } else {
        3
    }
}

/// Orders entry names the way jar tooling expects.
pub fn compare_entry_names(a: &str, b: &str) -> Ordering {
    entry_bucket(a)
        .cmp(&entry_bucket(b))
        .then_with(|| a.cmp(b))
}

/// Stably sorts mappings by destination in jar order.
pub fn sort_mappings(mappings: &mut [PathMapping]) {
    mappings.sort_by(|a, b| compare_entry_names(&a.dest, &b.dest));
}

/// Header of the `META-INF/` directory entry.
pub fn meta_dir_header(modified: DosDateTime) -> FileHeader {
    let mut header = FileHeader::directory(META_DIR).with_modified(modified);
    header.extra = [META_DIR_EXTRA_TAG.to_le_bytes(), [0, 0]].concat();
    header
}

/// Completes manifest contents.
///
/// Contents without a `Manifest-Version:` attribute get a generated header
/// prepended and a trailing newline appended; otherwise they are kept as is.
pub fn manifest_contents(contents: &[u8]) -> Vec<u8> {
    let has_marker = contents
        .windows(MANIFEST_MARKER.len())
        .any(|window| window == MANIFEST_MARKER.as_bytes());
    if has_marker {
        return contents.to_vec();
    }
    let mut out = format!("{MANIFEST_MARKER} 1.0\nCreated-By: {CREATED_BY}\n").into_bytes();
    out.extend_from_slice(contents);
    out.push(b'\n');
    out
}

/// Header of the manifest entry for the given final contents.
pub fn manifest_header(contents: &[u8], modified: DosDateTime) -> FileHeader {
    FileHeader::file(
        MANIFEST_FILE,
        CompressionMethod::Store,
        contents.len() as u64,
        false,
    )
    .with_modified(modified)
}
