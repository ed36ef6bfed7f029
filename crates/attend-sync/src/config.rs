//! Runtime configuration for the sync agent.
//!
//! Values are layered, lowest precedence first:
//! 1. Built-in defaults ([`SyncConfig::default`])
//! 2. An optional TOML file ([`SyncConfig::from_file`])
//! 3. Environment variables ([`SyncConfig::apply_env_overrides`])
//! 4. Command-line flags (applied by the binary)
//!
//! # Example file
//!
//! ```toml
//! base_url = "https://train.skillerwhale.com"
//! watched_extensions = [".py"]
//! ignored_dirs = [".git"]
//! poll_interval_ms = 1000
//!
//! [retry]
//! max_retries = 2
//! initial_delay_ms = 250
//! ```

use crate::delivery::RetryPolicy;
use crate::error::{Result, SyncError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Production endpoint used when nothing overrides it
pub const DEFAULT_BASE_URL: &str = "https://train.skillerwhale.com";

// Environment variable names
pub const ENV_SERVER_URL: &str = "SERVER_URL";
pub const ENV_ATTENDANCE_ID: &str = "ATTENDANCE_ID";

/// Configuration for the watcher, scanner and HTTP client
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Base URL the endpoint paths are joined onto
    pub base_url: String,
    /// Session identifier; empty means "not set"
    pub attendance_id: String,
    /// File-name suffixes (with leading dot) that qualify a file for monitoring
    pub watched_extensions: Vec<String>,
    /// Directory base names that are never descended into
    pub ignored_dirs: Vec<String>,
    /// Sleep between poll cycles
    pub poll_interval: Duration,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    /// Maximum directory depth below the base path
    pub max_depth: usize,
    /// Delivery retry policy (no retries by default)
    pub retry: RetryPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            attendance_id: String::new(),
            watched_extensions: vec![".py".to_string()],
            ignored_dirs: vec![".git".to_string()],
            poll_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            max_depth: 64,
            retry: RetryPolicy::default(),
        }
    }
}

/// On-disk representation; every field is optional and falls back to defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    base_url: Option<String>,
    attendance_id: Option<String>,
    watched_extensions: Option<Vec<String>>,
    ignored_dirs: Option<Vec<String>>,
    poll_interval_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    max_depth: Option<usize>,
    retry: Option<RetryFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RetryFile {
    max_retries: Option<u32>,
    initial_delay_ms: Option<u64>,
}

impl SyncConfig {
    /// Parse configuration from TOML text, layered over the defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)
            .map_err(|e| SyncError::config(format!("Failed to parse config: {}", e)))?;

        let mut config = Self::default();
        if let Some(base_url) = file.base_url {
            config.base_url = base_url;
        }
        if let Some(attendance_id) = file.attendance_id {
            config.attendance_id = attendance_id;
        }
        if let Some(exts) = file.watched_extensions {
            config.watched_extensions = exts;
        }
        if let Some(dirs) = file.ignored_dirs {
            config.ignored_dirs = dirs;
        }
        if let Some(ms) = file.poll_interval_ms {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = file.request_timeout_ms {
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(depth) = file.max_depth {
            config.max_depth = depth;
        }
        if let Some(retry) = file.retry {
            if let Some(max_retries) = retry.max_retries {
                config.retry.max_retries = max_retries;
            }
            if let Some(ms) = retry.initial_delay_ms {
                config.retry.initial_delay = Duration::from_millis(ms);
            }
        }

        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SyncError::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        debug!("Loaded config from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Empty values are ignored so that an exported-but-blank variable does
    /// not wipe out a configured endpoint.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_SERVER_URL).filter(|v| !v.is_empty()) {
            debug!("{} override: {}", ENV_SERVER_URL, url);
            self.base_url = url;
        }
        if let Some(id) = lookup(ENV_ATTENDANCE_ID).filter(|v| !v.is_empty()) {
            self.attendance_id = id;
        }
    }

    /// Apply command-line flags, the highest-precedence layer.
    ///
    /// `None` leaves the lower layers alone, so an id or URL from the config
    /// file or environment survives when the flag is absent.
    pub fn apply_flag_overrides(
        &mut self,
        server_url: Option<String>,
        attendance_id: Option<String>,
        poll_interval: Option<Duration>,
    ) {
        if let Some(url) = server_url.filter(|v| !v.is_empty()) {
            self.base_url = url;
        }
        if let Some(id) = attendance_id.filter(|v| !v.trim().is_empty()) {
            self.attendance_id = id;
        }
        if let Some(interval) = poll_interval {
            self.poll_interval = interval;
        }
    }

    /// Whether a session identifier is configured.
    pub fn has_attendance_id(&self) -> bool {
        !self.attendance_id.trim().is_empty()
    }

    /// Parsed base URL.
    pub fn base(&self) -> Result<Url> {
        Ok(Url::parse(&self.base_url)?)
    }

    /// Check the configuration for values the agent cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.base()
            .map_err(|e| SyncError::config(format!("Invalid base_url '{}': {}", self.base_url, e)))?;

        if self.poll_interval.is_zero() {
            return Err(SyncError::config("poll interval must be greater than zero"));
        }

        if self.max_depth == 0 {
            return Err(SyncError::config("max_depth must be at least 1"));
        }

        if self.watched_extensions.is_empty() {
            return Err(SyncError::config("at least one watched extension is required"));
        }

        if let Some(bad) = self
            .watched_extensions
            .iter()
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            return Err(SyncError::config(format!(
                "watched extension '{}' must start with '.'",
                bad
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.watched_extensions, vec![".py"]);
        assert_eq!(config.ignored_dirs, vec![".git"]);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.retry.max_retries, 0);
        assert!(!config.has_attendance_id());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_layering() {
        let config = SyncConfig::from_toml_str(
            r#"
            watched_extensions = [".py", ".rb"]
            poll_interval_ms = 250

            [retry]
            max_retries = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.watched_extensions, vec![".py", ".rb"]);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.retry.max_retries, 3);
        // untouched fields keep their defaults
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.ignored_dirs, vec![".git"]);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = SyncConfig::from_toml_str("poll_interval = 5").unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_SERVER_URL, "http://localhost:3000"),
            (ENV_ATTENDANCE_ID, "abc-123"),
        ]
        .into_iter()
        .collect();

        let mut config = SyncConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.attendance_id, "abc-123");
        assert!(config.has_attendance_id());
    }

    #[test]
    fn test_blank_override_ignored() {
        let mut config = SyncConfig::default();
        config.apply_overrides(|_| Some(String::new()));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_validation() {
        let mut config = SyncConfig::default();
        config.base_url = "::not-a-url".into();
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.poll_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.watched_extensions = vec!["py".into()];
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.watched_extensions.clear();
        assert!(config.validate().is_err());

        let config = SyncConfig {
            max_depth: 0,
            ..SyncConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_depth"));

        let config = SyncConfig {
            max_depth: 1,
            ..SyncConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_attendance_id_survives_absent_flags() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("attend.toml");
        std::fs::write(&path, "attendance_id = \"abc\"\n").unwrap();

        let mut config = SyncConfig::from_file(&path).unwrap();
        config.apply_overrides(|_| None);
        config.apply_flag_overrides(None, None, None);

        assert_eq!(config.attendance_id, "abc");
        assert!(config.has_attendance_id());
    }

    #[test]
    fn test_flags_beat_file_and_env() {
        let mut config = SyncConfig::from_toml_str(
            r#"
            attendance_id = "from-file"
            base_url = "http://file.example"
            "#,
        )
        .unwrap();
        config.apply_overrides(|key| (key == ENV_SERVER_URL).then(|| "http://env.example".to_string()));
        assert_eq!(config.base_url, "http://env.example");

        config.apply_flag_overrides(
            Some("http://flag.example".into()),
            Some("from-flag".into()),
            Some(Duration::from_millis(200)),
        );
        assert_eq!(config.base_url, "http://flag.example");
        assert_eq!(config.attendance_id, "from-flag");
        assert_eq!(config.poll_interval, Duration::from_millis(200));

        // blank flags fall through
        config.apply_flag_overrides(Some(String::new()), Some("  ".into()), None);
        assert_eq!(config.base_url, "http://flag.example");
        assert_eq!(config.attendance_id, "from-flag");
    }
}
