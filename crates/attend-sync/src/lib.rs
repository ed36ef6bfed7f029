//! Polling change tracker for attendance sessions.
//!
//! `attend-sync` watches a local directory tree and reports every change to a
//! watched file to a remote attendance endpoint, alongside a liveness ping on
//! every poll cycle. An instructor uses the reports to follow a learner's
//! edits in near real time.
//!
//! # Architecture
//!
//! - [`FingerprintStore`]: last-seen MD5 fingerprint per path, in memory only
//! - [`DirectoryScanner`]: recursive walk with ignore-list pruning and an
//!   extension filter
//! - [`ChangeDetector`]: fingerprint comparison with first-pass suppression
//! - [`ReportSink`] / [`Pinger`]: delivery seams, implemented over HTTP by
//!   [`SessionClient`]
//! - [`Watcher`]: the poll loop tying the pieces together
//!
//! There is no OS-level event watching; the agent polls.
//!
//! # Example
//!
//! ```no_run
//! use attend_sync::{SessionClient, SyncConfig, Watcher};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> attend_sync::Result<()> {
//! let mut config = SyncConfig::default();
//! config.attendance_id = "my-attendance".to_string();
//!
//! let client = SessionClient::new(&config)?;
//! let mut watcher = Watcher::new(client.clone(), client, ".", &config);
//! watcher.poll_for_changes(CancellationToken::new()).await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod delivery;
pub mod detector;
pub mod error;
pub mod fingerprint;
pub mod scanner;
pub mod watcher;

// Re-export main types
pub use client::SessionClient;
pub use config::SyncConfig;
pub use delivery::{DeliveryOutcome, FileSnapshot, Pinger, ReportSink, RetryPolicy, RetryingSink};
pub use detector::{ChangeDetector, ChangeEvent};
pub use error::{Result, SyncError};
pub use fingerprint::{Fingerprint, FingerprintStore};
pub use scanner::{DirectoryScanner, Listing};
pub use watcher::{ScanReport, Watcher};
