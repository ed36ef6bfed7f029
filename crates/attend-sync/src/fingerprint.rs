//! Content fingerprints and the in-memory store of last-seen fingerprints.

use std::collections::HashMap;
use std::fmt;

/// 128-bit MD5 digest of a file's full contents.
///
/// Collision resistance is not a requirement here; the digest only has to
/// make accidental collisions between two revisions of a file unlikely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    /// Fingerprint a byte slice.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(md5::compute(bytes).0)
    }

    /// Lowercase hex form (32 chars).
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Last-known fingerprint of every watched file seen during this run.
///
/// Keys are the path strings produced by the scanner. Entries are only ever
/// inserted or overwritten; deletions on disk are not tracked.
#[derive(Debug, Default)]
pub struct FingerprintStore {
    entries: HashMap<String, Fingerprint>,
}

impl FingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Previously recorded fingerprint for a path.
    pub fn get(&self, path: &str) -> Option<&Fingerprint> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Record the latest fingerprint, returning the one it replaced.
    pub fn record(&mut self, path: impl Into<String>, fingerprint: Fingerprint) -> Option<Fingerprint> {
        self.entries.insert(path.into(), fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
