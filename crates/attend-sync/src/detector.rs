//! Change detection against the fingerprint baseline.
//!
//! The first scan after start-up only seeds the [`FingerprintStore`]; it never
//! reports. From the second scan on, a file is reported when its path is new
//! to the store or its fingerprint differs from the recorded one.

use crate::delivery::FileSnapshot;
use crate::error::Result;
use crate::fingerprint::{Fingerprint, FingerprintStore};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A watched file whose contents changed since the previous scan.
///
/// Contents are not carried; they are read again at report time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub relative_path: String,
}

impl ChangeEvent {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            relative_path: path_key(path),
        }
    }

    /// Read the file as it is now and build the snapshot to send.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub async fn read_snapshot(&self) -> Result<FileSnapshot> {
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(FileSnapshot {
            relative_path: self.relative_path.clone(),
            contents: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

/// Store key for a scanned path.
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Decides which scanned files count as changed.
#[derive(Debug)]
pub struct ChangeDetector {
    store: FingerprintStore,
    first_pass: bool,
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self {
            store: FingerprintStore::new(),
            first_pass: true,
        }
    }

    pub fn is_first_pass(&self) -> bool {
        self.first_pass
    }

    /// End the baseline pass. Called once the first full scan has finished;
    /// the flag never comes back.
    pub fn complete_first_pass(&mut self) {
        if self.first_pass {
            debug!("Baseline seeded with {} files", self.store.len());
        }
        self.first_pass = false;
    }

    pub fn store(&self) -> &FingerprintStore {
        &self.store
    }

    /// Fingerprint one file and decide whether it changed.
    ///
    /// A read failure (for example the file vanished after it was listed)
    /// is returned as an error and leaves the store untouched.
    pub async fn detect(&mut self, path: &Path) -> Result<Option<ChangeEvent>> {
        let bytes = tokio::fs::read(path).await?;
        Ok(self.observe(path, &bytes))
    }

    /// Apply the detection policy to contents that were already read.
    pub fn observe(&mut self, path: &Path, contents: &[u8]) -> Option<ChangeEvent> {
        let key = path_key(path);
        let fingerprint = Fingerprint::of_bytes(contents);

        let changed = !self.first_pass && self.store.get(&key) != Some(&fingerprint);
        self.store.record(key, fingerprint);

        if changed {
            debug!("Change detected: {} ({})", path.display(), fingerprint);
            Some(ChangeEvent::new(path))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use tempfile::TempDir;

    #[test]
    fn test_first_pass_never_emits() {
        let mut detector = ChangeDetector::new();
        assert!(detector.is_first_pass());
        assert!(detector.observe(Path::new("./a.py"), b"x").is_none());
        assert!(detector.observe(Path::new("./b.py"), b"y").is_none());
        assert_eq!(detector.store().len(), 2);
    }

    #[test]
    fn test_changed_and_unchanged() {
        let mut detector = ChangeDetector::new();
        detector.observe(Path::new("./a.py"), b"x");
        detector.complete_first_pass();

        assert!(detector.observe(Path::new("./a.py"), b"x").is_none());

        let event = detector.observe(Path::new("./a.py"), b"z").unwrap();
        assert_eq!(event.relative_path, "./a.py");

        // recorded, so the same contents are quiet again
        assert!(detector.observe(Path::new("./a.py"), b"z").is_none());
    }

    #[test]
    fn test_new_file_after_baseline() {
        let mut detector = ChangeDetector::new();
        detector.complete_first_pass();

        assert!(detector.observe(Path::new("./c.py"), b"w").is_some());
        assert!(detector.observe(Path::new("./c.py"), b"w").is_none());
    }

    #[test]
    fn test_first_pass_flag_is_sticky() {
        let mut detector = ChangeDetector::new();
        detector.complete_first_pass();
        detector.complete_first_pass();
        assert!(!detector.is_first_pass());
    }

    #[test]
    fn test_fingerprint_idempotent() {
        let mut detector = ChangeDetector::new();
        detector.observe(Path::new("./a.py"), b"same");
        let first = *detector.store().get("./a.py").unwrap();
        detector.observe(Path::new("./a.py"), b"same");
        assert_eq!(detector.store().get("./a.py"), Some(&first));
    }

    #[tokio::test]
    async fn test_vanished_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gone.py");

        let mut detector = ChangeDetector::new();
        detector.complete_first_pass();

        let err = detector.detect(&path).await.unwrap_err();
        assert!(matches!(err, SyncError::Io(_)));
        assert!(detector.store().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_reads_current_contents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.py");
        tokio::fs::write(&path, "before").await.unwrap();

        let mut detector = ChangeDetector::new();
        detector.complete_first_pass();
        let event = detector.detect(&path).await.unwrap().unwrap();

        tokio::fs::write(&path, "after").await.unwrap();
        let snapshot = event.read_snapshot().await.unwrap();
        assert_eq!(snapshot.contents, "after");
        assert_eq!(snapshot.relative_path, path_key(&path));
    }

    #[tokio::test]
    async fn test_snapshot_lossy_utf8() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bin.py");
        tokio::fs::write(&path, [b'o', b'k', 0xff]).await.unwrap();

        let snapshot = ChangeEvent::new(&path).read_snapshot().await.unwrap();
        assert_eq!(snapshot.contents, "ok\u{fffd}");
    }
}
