//! Content fingerprinting.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::StorageError;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// SHA-256 digest of a file's bytes, standard-base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wraps an already-encoded fingerprint (e.g. one loaded from the database).
    pub fn from_encoded(encoded: String) -> Self {
        Self(encoded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Streams `reader` to completion through SHA-256.
///
/// Either the whole input is consumed and a fingerprint returned, or an
/// error is returned; a partial read never yields a fingerprint.
pub fn hash_reader<R: Read>(reader: R) -> io::Result<Fingerprint> {
    let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, reader);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(Fingerprint(STANDARD.encode(hasher.finalize())))
}

/// Fingerprints the file at `path`.
pub fn hash_file(path: &Path) -> Result<Fingerprint, StorageError> {
    let read_error = |e| StorageError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    };
    let file = File::open(path).map_err(read_error)?;
    hash_reader(file).map_err(read_error)
}
