//! Configuration loaded from YAML.
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration. `${VAR}` references are replaced with the value of
//! the environment variable before parsing; unset variables expand to an
//! empty string.

use crate::backends::{ClamAvConfig, ClamdEndpoint, TransferMode};
use crate::core::ConfigError;
use crate::monitor::DEFAULT_INTERVAL;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// How to reach clamd.
    #[serde(default)]
    pub clamd: ClamdSection,

    /// Directory walk settings.
    #[serde(default)]
    pub scan: ScanSection,

    /// Monitor loop settings.
    #[serde(default)]
    pub monitor: MonitorSection,

    /// Audit log settings.
    #[serde(default)]
    pub audit: AuditSection,
}

/// ClamAV daemon configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClamdSection {
    /// Path to the clamd Unix socket.
    #[serde(default = "default_socket_path")]
    pub socket_path: Option<PathBuf>,

    /// `host:port` of a clamd TCP listener. Takes precedence over the socket.
    #[serde(default)]
    pub tcp_address: Option<String>,

    /// `stream` (upload the bytes) or `path` (let clamd read the file).
    #[serde(default)]
    pub transfer: TransferMode,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_ms: u64,

    /// Timeout for one scan in milliseconds.
    #[serde(default = "default_scan_timeout")]
    pub scan_timeout_ms: u64,

    /// Chunk size for streaming to clamd.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Largest file that will be streamed, in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for ClamdSection {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            tcp_address: None,
            transfer: TransferMode::default(),
            connection_timeout_ms: default_connection_timeout(),
            scan_timeout_ms: default_scan_timeout(),
            chunk_size: default_chunk_size(),
            max_file_size: default_max_file_size(),
        }
    }
}

/// Directory walk settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScanSection {
    /// Follow symbolic links while walking.
    #[serde(default)]
    pub follow_symlinks: bool,
}

/// Monitor loop settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorSection {
    /// Seconds between two cycles.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
        }
    }
}

/// Audit log settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuditSection {
    /// Write audit events to `log_path`.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// JSON-lines file the events are appended to.
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            enabled: true,
            log_path: default_log_path(),
        }
    }
}

fn default_socket_path() -> Option<PathBuf> {
    Some(PathBuf::from("/var/run/clamav/clamd.ctl"))
}

fn default_connection_timeout() -> u64 {
    10_000 // 10 seconds
}

fn default_scan_timeout() -> u64 {
    300_000 // 5 minutes
}

fn default_chunk_size() -> usize {
    65536 // 64KB
}

fn default_max_file_size() -> u64 {
    100 * 1024 * 1024 // 100MB
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL.as_secs()
}

fn default_log_path() -> PathBuf {
    PathBuf::from("buddy.log")
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Loads and validates a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parses and validates YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content)?;
        // serde_yaml rejects an empty document, which should mean "all defaults".
        let config: Config = if expanded.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&expanded)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks ranges and required values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint()?;

        if self.clamd.connection_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "clamd.connection_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.clamd.scan_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "clamd.scan_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.clamd.chunk_size == 0 || self.clamd.chunk_size > u32::MAX as usize {
            return Err(ConfigError::Invalid(
                "clamd.chunk_size must be between 1 and 4294967295".into(),
            ));
        }
        if self.monitor.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "monitor.interval_secs must be greater than 0".into(),
            ));
        }
        if self.audit.enabled && self.audit.log_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "audit.log_path must be set when the audit log is enabled".into(),
            ));
        }

        Ok(())
    }

    /// The clamd endpoint: TCP if an address is set, else the Unix socket.
    pub fn endpoint(&self) -> Result<ClamdEndpoint, ConfigError> {
        if let Some(addr) = self.clamd.tcp_address.as_deref().filter(|a| !a.is_empty()) {
            return Ok(ClamdEndpoint::Tcp(addr.to_string()));
        }
        match self.clamd.socket_path.as_ref() {
            Some(path) if !path.as_os_str().is_empty() => Ok(ClamdEndpoint::Unix(path.clone())),
            _ => Err(ConfigError::Invalid(
                "either clamd.socket_path or clamd.tcp_address must be set".into(),
            )),
        }
    }

    /// Builds the ClamAV backend configuration.
    pub fn to_clamav_config(&self) -> Result<ClamAvConfig, ConfigError> {
        let config = ClamAvConfig::new()
            .with_transfer(self.clamd.transfer)
            .with_connection_timeout(Duration::from_millis(self.clamd.connection_timeout_ms))
            .with_scan_timeout(Duration::from_millis(self.clamd.scan_timeout_ms))
            .with_chunk_size(self.clamd.chunk_size)
            .with_max_file_size(self.clamd.max_file_size);

        Ok(match self.endpoint()? {
            ClamdEndpoint::Unix(path) => config.with_socket(path),
            ClamdEndpoint::Tcp(addr) => config.with_tcp(addr),
        })
    }

    /// Pause between monitor cycles.
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.interval_secs)
    }
}

/// Expand environment variables in the format ${VAR_NAME}.
fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::Invalid(e.to_string()))?;
    let expanded = re.replace_all(content, |caps: &regex::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_default()
    });
    Ok(expanded.into_owned())
}
