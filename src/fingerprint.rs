//! Content fingerprinting for cache keys.
//!
//! A fingerprint is a SHA-256 digest over the byte contents of all input
//! files, hashed in lexicographic path order. It identifies the file set:
//! the same bytes yield the same fingerprint regardless of argument order
//! or file names, and any content or membership change yields a new one.

use std::fs::File;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::loader::LoadError;

/// Compute the fingerprint for a set of files.
///
/// File bytes are streamed into the digest, so large inputs are never
/// buffered whole. Returns the lowercase hex digest string.
pub fn fingerprint_files(paths: &[PathBuf]) -> Result<String, LoadError> {
    let mut sorted: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
    sorted.sort();

    let mut hasher = Sha256::new();
    for path in sorted {
        let mut file = File::open(path).map_err(|e| LoadError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::io::copy(&mut file, &mut hasher).map_err(|e| LoadError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    Ok(format!("{:x}", hasher.finalize()))
}
