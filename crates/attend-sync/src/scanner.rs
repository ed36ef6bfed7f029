//! Recursive directory scanner.
//!
//! Walks the base directory with [`ignore::WalkBuilder`], pruning ignored
//! directory names and keeping only files with a watched extension. The
//! builder's standard filters (gitignore, hidden files) are switched off so
//! the configured ignore list is the only thing that prunes.
//!
//! Symlinked directories are not followed and depth is capped at
//! `max_depth`, so a symlink cycle cannot make the walk run forever.

use crate::config::SyncConfig;
use crate::error::SyncError;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Files found by one walk of the base directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Watched files in walk order
    pub files: Vec<PathBuf>,
    /// Entries that could not be read and were skipped
    pub errors: usize,
}

/// Enumerates watched files below a base directory.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    base: PathBuf,
    watched_extensions: Vec<String>,
    ignored_dirs: Arc<Vec<String>>,
    max_depth: usize,
}

impl DirectoryScanner {
    pub fn new(base: impl Into<PathBuf>, config: &SyncConfig) -> Self {
        Self {
            base: base.into(),
            watched_extensions: config.watched_extensions.clone(),
            ignored_dirs: Arc::new(config.ignored_dirs.clone()),
            max_depth: config.max_depth,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Whether a directory with this base name is pruned from the walk.
    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignored_dirs.iter().any(|d| d == name)
    }

    /// Whether a file qualifies for monitoring based on its extension.
    pub fn is_watched(&self, path: &Path) -> bool {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self
                .watched_extensions
                .iter()
                .any(|w| w.strip_prefix('.') == Some(ext)),
            None => false,
        }
    }

    /// Walk the base directory on the blocking pool.
    ///
    /// The walk is plain `std::fs` I/O, so it is kept off the async workers.
    pub async fn scan_blocking(&self) -> Listing {
        let scanner = self.clone();
        match tokio::task::spawn_blocking(move || scanner.scan()).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!("Directory walk of {} aborted: {}", self.base.display(), e);
                Listing {
                    files: Vec::new(),
                    errors: 1,
                }
            }
        }
    }

    /// Walk the base directory once.
    ///
    /// Unreadable entries are logged and counted; the walk carries on with
    /// their siblings.
    pub fn scan(&self) -> Listing {
        let mut listing = Listing::default();

        let base_ignored = self
            .base
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| self.is_ignored_dir(n));
        if base_ignored {
            debug!("Base directory {} is in the ignore list", self.base.display());
            return listing;
        }

        let ignored = Arc::clone(&self.ignored_dirs);
        let mut walker = WalkBuilder::new(&self.base);
        walker
            .standard_filters(false)
            .follow_links(false)
            .max_depth(Some(self.max_depth))
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                !(is_dir
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| ignored.iter().any(|d| d == name)))
            });

        for entry in walker.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", SyncError::walk(e.to_string()));
                    listing.errors += 1;
                    continue;
                }
            };

            let path = entry.path();
            let is_file = match entry.file_type() {
                Some(ft) if ft.is_file() => true,
                // Symlinked files are followed; symlinked directories are not.
                Some(ft) if ft.is_symlink() => std::fs::metadata(path).is_ok_and(|m| m.is_file()),
                _ => false,
            };

            if is_file && self.is_watched(path) {
                listing.files.push(path.to_path_buf());
            }
        }

        debug!(
            "Scanned {}: {} watched files, {} errors",
            self.base.display(),
            listing.files.len(),
            listing.errors
        );
        listing
    }
}
