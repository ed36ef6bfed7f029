//! HTTP client for the attendance endpoints.
//!
//! Two calls are made against the configured base URL:
//! - `POST attendances/{id}/file_snapshots` with a JSON [`FileSnapshot`]
//! - `POST attendances/{id}/pings` with an empty body
//!
//! Endpoint paths are joined with [`Url::join`], so a base URL with a path
//! component follows RFC 3986 reference resolution: `http://host/api/` keeps
//! `api/`, while `http://host/api` has `api` replaced.

use crate::config::SyncConfig;
use crate::delivery::{DeliveryOutcome, FileSnapshot, Pinger, ReportSink};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tracing::{debug, info};
use url::Url;

/// Client bound to one attendance session.
#[derive(Clone)]
pub struct SessionClient {
    client: HttpClient,
    base_url: Url,
    attendance_id: String,
}

impl SessionClient {
    /// Create a new client from configuration
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base()?,
            attendance_id: config.attendance_id.trim().to_string(),
        })
    }

    pub fn attendance_id(&self) -> &str {
        &self.attendance_id
    }

    pub fn has_attendance_id(&self) -> bool {
        !self.attendance_id.is_empty()
    }

    /// Snapshot upload endpoint
    pub fn snapshots_url(&self) -> Result<Url> {
        self.endpoint("file_snapshots")
    }

    /// Liveness endpoint
    pub fn pings_url(&self) -> Result<Url> {
        self.endpoint("pings")
    }

    fn endpoint(&self, resource: &str) -> Result<Url> {
        let path = format!("attendances/{}/{}", self.attendance_id, resource);
        Ok(self.base_url.join(&path)?)
    }
}

#[async_trait]
impl ReportSink for SessionClient {
    async fn deliver(&self, snapshot: &FileSnapshot) -> Result<DeliveryOutcome> {
        if !self.has_attendance_id() {
            info!(
                "Uploading: {}\tNo attendance id set; file update not sent.",
                snapshot.relative_path
            );
            return Ok(DeliveryOutcome::Skipped);
        }

        let url = self.snapshots_url()?;
        let body = serde_json::to_string(snapshot)?;
        debug!("POST {} ({} bytes)", url, body.len());

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, body.len())
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;

        info!("Uploading: {}\tStatus: {}", snapshot.relative_path, status);
        if !text.is_empty() {
            info!("{}", text);
        }

        Ok(DeliveryOutcome::Delivered { status, body: text })
    }
}

#[async_trait]
impl Pinger for SessionClient {
    async fn ping(&self) -> Result<()> {
        if !self.has_attendance_id() {
            debug!("No attendance id set; ping not sent");
            return Ok(());
        }

        let url = self.pings_url()?;
        debug!("POST {}", url);
        self.client.post(url).send().await?;
        Ok(())
    }
}
