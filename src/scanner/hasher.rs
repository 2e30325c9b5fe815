//! SHA-256 file fingerprinting with streaming support.
//!
//! # Overview
//!
//! [`Fingerprinter`] reads a file in fixed-size blocks so memory stays
//! bounded regardless of file size. Every block feeds a running SHA-256
//! hasher; the first block is also kept verbatim so the content store can
//! compare it against an existing canonical entry before linking to it.
//!
//! # Example
//!
//! ```no_run
//! use rustvault::scanner::Fingerprinter;
//! use std::path::Path;
//!
//! let fp = Fingerprinter::new().fingerprint(Path::new("data.bin")).unwrap();
//! println!("{} ({} bytes)", fp.hex(), fp.size);
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::SystemTime;

use sha2::{Digest as _, Sha256};

use super::HashError;

/// Block size used for streaming reads (64 KiB).
pub const BLOCK_SIZE: usize = 64 * 1024;

/// A 256-bit SHA-256 content digest.
pub type Digest = [u8; 32];

/// Result of fingerprinting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// Total number of bytes read
    pub size: u64,
    /// SHA-256 of the full byte stream
    pub digest: Digest,
    /// The first block of the file, verbatim (shorter for small files)
    pub first_block: Vec<u8>,
    /// Modification time when the file was opened, if the platform has one.
    /// `None` for fingerprints taken from a plain reader.
    pub modified: Option<SystemTime>,
}

impl Fingerprint {
    /// Lowercase hex encoding of the digest.
    #[must_use]
    pub fn hex(&self) -> String {
        digest_to_hex(&self.digest)
    }
}

/// Streaming file fingerprinter.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    block_size: usize,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

impl Fingerprinter {
    /// Create a fingerprinter using [`BLOCK_SIZE`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            block_size: BLOCK_SIZE,
        }
    }

    /// Create a fingerprinter with a custom block size (minimum 1 byte).
    #[must_use]
    pub fn with_block_size(block_size: usize) -> Self {
        Self {
            block_size: block_size.max(1),
        }
    }

    /// Block size in bytes.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Fingerprint the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or a read fails
    /// part way through. No partial fingerprint is ever returned.
    pub fn fingerprint(&self, path: &Path) -> Result<Fingerprint, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let modified = file
            .metadata()
            .map_err(|e| HashError::from_io(path, e))?
            .modified()
            .ok();
        let mut fp = self
            .fingerprint_reader(&mut file)
            .map_err(|e| HashError::from_io(path, e))?;
        fp.modified = modified;
        Ok(fp)
    }

    /// Fingerprint any reader. Used by [`Self::fingerprint`] and tests.
    ///
    /// # Errors
    ///
    /// Propagates the first read error.
    pub fn fingerprint_reader<R: Read>(&self, reader: &mut R) -> io::Result<Fingerprint> {
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; self.block_size];
        let mut size = 0u64;
        let mut first_block = None;

        loop {
            let n = fill_block(reader, &mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            size += n as u64;
            if first_block.is_none() {
                first_block = Some(buf[..n].to_vec());
            }
            if n < buf.len() {
                break;
            }
        }

        Ok(Fingerprint {
            size,
            digest: hasher.finalize().into(),
            first_block: first_block.unwrap_or_default(),
            modified: None,
        })
    }
}

/// Read up to `len` bytes from the start of a file.
///
/// # Errors
///
/// Returns the underlying I/O error.
pub fn read_prefix(path: &Path, len: usize) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; len];
    let n = fill_block(&mut file, &mut buf)?;
    buf.truncate(n);
    Ok(buf)
}

/// Fill `buf` completely unless EOF is reached first.
fn fill_block<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Convert a digest to a lowercase hex string.
#[must_use]
pub fn digest_to_hex(digest: &Digest) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Parse a 64-character hex string into a digest.
#[must_use]
pub fn hex_to_digest(hex: &str) -> Option<Digest> {
    if hex.len() != 64 || !hex.is_ascii() {
        return None;
    }
    let mut digest = [0u8; 32];
    for (i, byte) in digest.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(digest)
}
