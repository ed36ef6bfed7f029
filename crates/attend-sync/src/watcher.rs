//! Poll loop: ping, scan, report, sleep.
//!
//! Each cycle runs strictly in this order:
//! 1. send one heartbeat (failures are logged, never fatal)
//! 2. walk the base directory and run every watched file through the
//!    [`ChangeDetector`], delivering each change as it is found
//! 3. after the very first full scan, end the baseline pass
//! 4. sleep for the poll interval
//!
//! Cycles run one after another on one task; only the directory walk is
//! handed to the blocking pool. A slow endpoint delays the next cycle but
//! cannot corrupt the fingerprint store.

use crate::config::SyncConfig;
use crate::delivery::{DeliveryOutcome, Pinger, ReportSink};
use crate::detector::{ChangeDetector, ChangeEvent};
use crate::error::SyncError;
use crate::scanner::DirectoryScanner;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Counters for one poll cycle
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub files_scanned: usize,
    pub changes_detected: usize,
    pub reports_delivered: usize,
    pub reports_skipped: usize,
    pub errors: usize,
}

/// Polling change tracker
pub struct Watcher<S, P> {
    sink: S,
    pinger: P,
    scanner: DirectoryScanner,
    detector: ChangeDetector,
    poll_interval: Duration,
    cycles: u64,
}

impl<S: ReportSink, P: Pinger> Watcher<S, P> {
    pub fn new(sink: S, pinger: P, base_path: impl Into<PathBuf>, config: &SyncConfig) -> Self {
        Self {
            sink,
            pinger,
            scanner: DirectoryScanner::new(base_path, config),
            detector: ChangeDetector::new(),
            poll_interval: config.poll_interval,
            cycles: 0,
        }
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn pinger(&self) -> &P {
        &self.pinger
    }

    /// Number of completed cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run cycles until the token is cancelled.
    pub async fn poll_for_changes(&mut self, cancel: CancellationToken) {
        info!(
            "Watching {} every {:?}",
            self.scanner.base().display(),
            self.poll_interval
        );

        while !cancel.is_cancelled() {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.run_cycle() => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!("Stopped watching after {} cycles", self.cycles);
    }

    /// One ping + full scan.
    pub async fn run_cycle(&mut self) -> ScanReport {
        if let Err(e) = self.pinger.ping().await {
            warn!("Ping failed: {}", e);
        }

        let report = self.scan().await;

        // Only after every file of the first scan has been processed.
        self.detector.complete_first_pass();
        self.cycles += 1;

        if report.changes_detected > 0 || report.errors > 0 {
            debug!("Cycle {}: {:?}", self.cycles, report);
        }
        report
    }

    async fn scan(&mut self) -> ScanReport {
        let listing = self.scanner.scan_blocking().await;
        let mut report = ScanReport {
            errors: listing.errors,
            ..ScanReport::default()
        };

        for path in &listing.files {
            report.files_scanned += 1;

            let event = match self.detector.detect(path).await {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                // Deleted between listing and read: not worth a warning.
                Err(SyncError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("Skipping {} this cycle: {}", path.display(), e);
                    report.errors += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Skipping {} this cycle: {}", path.display(), e);
                    report.errors += 1;
                    continue;
                }
            };

            report.changes_detected += 1;
            self.report_change(&event, &mut report).await;
        }

        report
    }

    async fn report_change(&self, event: &ChangeEvent, report: &mut ScanReport) {
        let snapshot = match event.read_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Could not read {} for upload: {}", event.relative_path, e);
                report.errors += 1;
                return;
            }
        };

        match self.sink.deliver(&snapshot).await {
            Ok(DeliveryOutcome::Delivered { .. }) => report.reports_delivered += 1,
            Ok(DeliveryOutcome::Skipped) => report.reports_skipped += 1,
            Err(e) => {
                warn!("Uploading: {}\tFailed: {}", event.relative_path, e);
                report.errors += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::FileSnapshot;
    use crate::error::{Result, SyncError};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<String>>,
        fail_pings: bool,
    }

    #[async_trait]
    impl ReportSink for Recorder {
        async fn deliver(&self, snapshot: &FileSnapshot) -> Result<DeliveryOutcome> {
            self.log.lock().unwrap().push(format!("deliver {}", snapshot.relative_path));
            Ok(DeliveryOutcome::Delivered { status: 201, body: String::new() })
        }
    }

    #[async_trait]
    impl Pinger for Recorder {
        async fn ping(&self) -> Result<()> {
            self.log.lock().unwrap().push("ping".to_string());
            if self.fail_pings {
                Err(SyncError::Unavailable("down".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_ping_precedes_scan() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.py");
        std::fs::write(&file, "x").unwrap();

        let recorder = std::sync::Arc::new(Recorder::default());
        let mut watcher = Watcher::new(
            recorder.clone(),
            recorder.clone(),
            temp.path(),
            &SyncConfig::default(),
        );

        watcher.run_cycle().await;
        std::fs::write(&file, "y").unwrap();
        watcher.run_cycle().await;

        let log = recorder.log.lock().unwrap().clone();
        let expected = format!("deliver {}", file.to_string_lossy());
        assert_eq!(log, vec!["ping".to_string(), "ping".to_string(), expected]);
    }

    #[tokio::test]
    async fn test_ping_failure_is_not_fatal() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.py"), "x").unwrap();

        let recorder = std::sync::Arc::new(Recorder {
            fail_pings: true,
            ..Recorder::default()
        });
        let mut watcher = Watcher::new(
            recorder.clone(),
            recorder.clone(),
            temp.path(),
            &SyncConfig::default(),
        );

        let report = watcher.run_cycle().await;
        assert_eq!(report.files_scanned, 1);
        assert!(!watcher.detector().is_first_pass());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_loop() {
        let temp = TempDir::new().unwrap();
        let recorder = std::sync::Arc::new(Recorder::default());
        let mut watcher = Watcher::new(
            recorder.clone(),
            recorder.clone(),
            temp.path(),
            &SyncConfig::default(),
        );

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            trigger.cancel();
        });

        watcher.poll_for_changes(cancel).await;
        assert_eq!(watcher.cycles(), 3);
    }
}
