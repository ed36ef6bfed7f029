//! Delivery seams between the change-detection core and the network.
//!
//! The watcher only knows about [`ReportSink`] and [`Pinger`]. The HTTP
//! implementation lives in [`crate::client`]; tests plug in recording fakes.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Whole-file snapshot sent for a single change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSnapshot {
    pub relative_path: String,
    pub contents: String,
}

/// What happened to a snapshot handed to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The endpoint answered, with any status
    Delivered { status: u16, body: String },
    /// Nothing was sent because no attendance id is set
    Skipped,
}

impl DeliveryOutcome {
    /// Delivered with a 2xx status.
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { status, .. } if (200..300).contains(status))
    }
}

/// Delivers change snapshots to the remote endpoint.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, snapshot: &FileSnapshot) -> Result<DeliveryOutcome>;
}

/// Sends content-free liveness signals.
#[async_trait]
pub trait Pinger: Send + Sync {
    async fn ping(&self) -> Result<()>;
}

#[async_trait]
impl<T: ReportSink + ?Sized> ReportSink for std::sync::Arc<T> {
    async fn deliver(&self, snapshot: &FileSnapshot) -> Result<DeliveryOutcome> {
        (**self).deliver(snapshot).await
    }
}

#[async_trait]
impl<T: Pinger + ?Sized> Pinger for std::sync::Arc<T> {
    async fn ping(&self) -> Result<()> {
        (**self).ping().await
    }
}

/// Retry behaviour for snapshot delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first; 0 disables retrying
    pub max_retries: u32,
    /// Delay before the first retry, doubled after each attempt
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(500),
        }
    }
}

/// Wraps a sink and retries transient transport failures with exponential backoff.
///
/// Responses are never retried, whatever their status.
pub struct RetryingSink<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: ReportSink> RetryingSink<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: ReportSink> ReportSink for RetryingSink<S> {
    async fn deliver(&self, snapshot: &FileSnapshot) -> Result<DeliveryOutcome> {
        let mut attempt = 0;
        let mut delay = self.policy.initial_delay;

        loop {
            match self.inner.deliver(snapshot).await {
                Ok(outcome) => {
                    if attempt > 0 {
                        info!("Delivery succeeded after {} retries", attempt);
                    }
                    return Ok(outcome);
                }
                Err(e) if attempt < self.policy.max_retries && e.is_transient() => {
                    warn!(
                        "Delivery of {} failed (attempt {}/{}): {}",
                        snapshot.relative_path,
                        attempt + 1,
                        self.policy.max_retries,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
