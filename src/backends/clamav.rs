//! ClamAV scanning backend.
//!
//! This module provides a scanner implementation that communicates with
//! ClamAV via its socket protocol (clamd).
//!
//! # Requirements
//!
//! - ClamAV daemon (clamd) must be running
//! - Access to the clamd socket (Unix socket or TCP)
//!
//! # Protocol
//!
//! Commands are sent in the `z` form (`zCOMMAND\0`); clamd answers with a
//! single NUL-terminated line and closes the connection. Two transfers are
//! supported:
//!
//! - `INSTREAM`: the file is read locally and sent as length-prefixed chunks
//!   terminated by a zero-length chunk. Works when clamd cannot read the file.
//! - `SCAN <path>`: clamd opens the file itself. Needs an absolute path the
//!   daemon user can read.

use crate::core::{ScanError, ScanVerdict, Scanner};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

const ENGINE: &str = "clamav";

/// Where clamd listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClamdEndpoint {
    /// Path to the clamd Unix socket (`LocalSocket` in clamd.conf).
    Unix(PathBuf),
    /// `host:port` of a clamd TCP listener (`TCPSocket` in clamd.conf).
    Tcp(String),
}

impl fmt::Display for ClamdEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
            Self::Tcp(addr) => write!(f, "tcp:{}", addr),
        }
    }
}

/// How file content reaches the daemon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Stream the bytes with `INSTREAM`.
    #[default]
    Stream,
    /// Send the absolute path with `SCAN` and let clamd read the file.
    Path,
}

impl FromStr for TransferMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stream" => Ok(Self::Stream),
            "path" => Ok(Self::Path),
            other => Err(format!(
                "unknown transfer mode '{}', expected 'stream' or 'path'",
                other
            )),
        }
    }
}

/// ClamAV scanner configuration.
#[derive(Debug, Clone)]
pub struct ClamAvConfig {
    /// Where clamd listens.
    pub endpoint: ClamdEndpoint,

    /// How file content reaches the daemon.
    pub transfer: TransferMode,

    /// Connection timeout.
    pub connection_timeout: Duration,

    /// Timeout for one command exchange, including the upload.
    pub scan_timeout: Duration,

    /// Size of each `INSTREAM` chunk.
    pub chunk_size: usize,

    /// Maximum file size to stream.
    pub max_file_size: u64,
}

impl Default for ClamAvConfig {
    fn default() -> Self {
        Self {
            endpoint: ClamdEndpoint::Unix(PathBuf::from("/var/run/clamav/clamd.ctl")),
            transfer: TransferMode::Stream,
            connection_timeout: Duration::from_secs(10),
            scan_timeout: Duration::from_secs(300),
            chunk_size: 64 * 1024,
            max_file_size: 100 * 1024 * 1024, // 100 MB
        }
    }
}

impl ClamAvConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a Unix socket.
    pub fn with_socket(mut self, path: impl Into<PathBuf>) -> Self {
        self.endpoint = ClamdEndpoint::Unix(path.into());
        self
    }

    /// Uses a TCP connection.
    pub fn with_tcp(mut self, address: impl Into<String>) -> Self {
        self.endpoint = ClamdEndpoint::Tcp(address.into());
        self
    }

    /// Sets the transfer mode.
    pub fn with_transfer(mut self, transfer: TransferMode) -> Self {
        self.transfer = transfer;
        self
    }

    /// Sets the connection timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Sets the scan timeout.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Sets the `INSTREAM` chunk size.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Sets the maximum file size.
    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }
}

trait ClamdStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ClamdStream for T {}

/// ClamAV scanner implementation.
///
/// Opens one connection per command, as clamd closes the socket after
/// answering a non-session command.
///
/// # Example
///
/// ```rust,ignore
/// use buddy_cleaner::backends::clamav::{ClamAvConfig, ClamAvScanner};
///
/// let config = ClamAvConfig::new()
///     .with_socket("/var/run/clamav/clamd.ctl");
///
/// let scanner = ClamAvScanner::new(config)?;
/// ```
#[derive(Debug)]
pub struct ClamAvScanner {
    config: ClamAvConfig,
}

impl ClamAvScanner {
    /// Creates a new ClamAV scanner with the given configuration.
    pub fn new(config: ClamAvConfig) -> Result<Self, ScanError> {
        if config.chunk_size == 0 || config.chunk_size > u32::MAX as usize {
            return Err(ScanError::configuration(
                "chunk_size must be between 1 and 4294967295",
            ));
        }
        if config.connection_timeout.is_zero() || config.scan_timeout.is_zero() {
            return Err(ScanError::configuration("timeouts must be greater than 0"));
        }
        #[cfg(not(unix))]
        if matches!(config.endpoint, ClamdEndpoint::Unix(_)) {
            return Err(ScanError::configuration(
                "Unix sockets not supported on this platform",
            ));
        }

        Ok(Self { config })
    }

    /// Creates a ClamAV scanner with default configuration.
    pub fn with_defaults() -> Result<Self, ScanError> {
        Self::new(ClamAvConfig::default())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClamAvConfig {
        &self.config
    }

    async fn connect(&self) -> Result<Box<dyn ClamdStream>, ScanError> {
        let connect = async {
            match &self.config.endpoint {
                #[cfg(unix)]
                ClamdEndpoint::Unix(path) => tokio::net::UnixStream::connect(path)
                    .await
                    .map(|s| Box::new(s) as Box<dyn ClamdStream>),
                #[cfg(not(unix))]
                ClamdEndpoint::Unix(_) => Err(std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "Unix sockets not supported on this platform",
                )),
                ClamdEndpoint::Tcp(addr) => tokio::net::TcpStream::connect(addr.as_str())
                    .await
                    .map(|s| Box::new(s) as Box<dyn ClamdStream>),
            }
        };

        match timeout(self.config.connection_timeout, connect).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(ScanError::connection_failed(
                ENGINE,
                format!("{}: {}", self.config.endpoint, e),
            )),
            Err(_) => Err(ScanError::timeout(ENGINE, self.config.connection_timeout)),
        }
    }

    async fn with_scan_timeout<T>(
        &self,
        exchange: impl Future<Output = Result<T, ScanError>>,
    ) -> Result<T, ScanError> {
        match timeout(self.config.scan_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(ScanError::timeout(ENGINE, self.config.scan_timeout)),
        }
    }

    /// Sends a single command and returns the daemon's reply.
    async fn command(&self, command: &[u8]) -> Result<String, ScanError> {
        let mut stream = self.connect().await?;
        self.with_scan_timeout(async {
            stream
                .write_all(&frame(command))
                .await
                .map_err(transport)?;
            read_reply(&mut stream).await
        })
        .await
    }

    /// Streams the file with `INSTREAM`.
    async fn instream(&self, path: &Path) -> Result<String, ScanError> {
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| ScanError::from_io(path, e))?;
        let size = file.metadata().await?.len();
        if size > self.config.max_file_size {
            return Err(ScanError::FileTooLarge {
                size,
                max: self.config.max_file_size,
            });
        }

        let mut stream = self.connect().await?;
        self.with_scan_timeout(async {
            if let Err(e) = self.send_chunks(&mut stream, &mut file, path).await {
                // clamd answers and hangs up once StreamMaxLength is exceeded.
                if e.is_transport() {
                    if let Ok(reply) = read_reply(&mut stream).await {
                        if !reply.is_empty() {
                            return Ok(reply);
                        }
                    }
                }
                return Err(e);
            }
            read_reply(&mut stream).await
        })
        .await
    }

    async fn send_chunks(
        &self,
        stream: &mut Box<dyn ClamdStream>,
        file: &mut tokio::fs::File,
        path: &Path,
    ) -> Result<(), ScanError> {
        stream
            .write_all(&frame(b"INSTREAM"))
            .await
            .map_err(transport)?;

        let mut buffer = vec![0u8; self.config.chunk_size];
        loop {
            let n = file
                .read(&mut buffer)
                .await
                .map_err(|e| ScanError::from_io(path, e))?;
            if n == 0 {
                break;
            }
            stream
                .write_all(&(n as u32).to_be_bytes())
                .await
                .map_err(transport)?;
            stream.write_all(&buffer[..n]).await.map_err(transport)?;
        }

        stream
            .write_all(&0u32.to_be_bytes())
            .await
            .map_err(transport)?;
        stream.flush().await.map_err(transport)
    }
}

/// Wraps a command as `z<command>\0`.
fn frame(command: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(command.len() + 2);
    framed.push(b'z');
    framed.extend_from_slice(command);
    framed.push(0);
    framed
}

fn transport(e: std::io::Error) -> ScanError {
    ScanError::connection_failed(ENGINE, e.to_string())
}

async fn read_reply(stream: &mut Box<dyn ClamdStream>) -> Result<String, ScanError> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.map_err(transport)?;
    Ok(String::from_utf8_lossy(&buf)
        .trim_end_matches(&['\0', '\n', '\r'][..])
        .to_string())
}

/// Parses a scan reply into a verdict.
///
/// `name` is what clamd echoes before the colon: `stream` for `INSTREAM`,
/// the path for `SCAN`.
///
/// - `<name>: OK` - clean
/// - `<name>: <signature> FOUND` - infected
/// - `<name>: <reason> ERROR` - engine error
fn parse_response(response: &str, name: &str) -> Result<ScanVerdict, ScanError> {
    let response = response.trim();
    let body = response
        .strip_prefix(name)
        .and_then(|rest| rest.strip_prefix(": "));

    if let Some(rest) = response.strip_suffix(" FOUND") {
        let signature = match body.and_then(|b| b.strip_suffix(" FOUND")) {
            Some(signature) => signature,
            None => rest.rsplit_once(": ").map(|(_, s)| s).unwrap_or(rest),
        }
        .trim();
        let signature = if signature.is_empty() {
            "Unknown"
        } else {
            signature
        };
        return Ok(ScanVerdict::infected(signature));
    }

    if let Some(rest) = response.strip_suffix(" ERROR") {
        let reason = body
            .and_then(|b| b.strip_suffix(" ERROR"))
            .unwrap_or(rest)
            .trim();
        return Err(ScanError::engine_error(ENGINE, reason));
    }

    if body == Some("OK") || response.ends_with(": OK") {
        return Ok(ScanVerdict::Clean);
    }

    Err(ScanError::ambiguous(ENGINE, response))
}

#[async_trait]
impl Scanner for ClamAvScanner {
    fn name(&self) -> &str {
        ENGINE
    }

    async fn scan_file(&self, path: &Path) -> Result<ScanVerdict, ScanError> {
        let start = Instant::now();

        let verdict = match self.config.transfer {
            TransferMode::Stream => {
                let reply = self.instream(path).await?;
                parse_response(&reply, "stream")?
            }
            TransferMode::Path => {
                let absolute = tokio::fs::canonicalize(path)
                    .await
                    .map_err(|e| ScanError::from_io(path, e))?;
                let mut command = b"SCAN ".to_vec();
                command.extend_from_slice(absolute.as_os_str().as_encoded_bytes());
                let reply = self.command(&command).await?;
                parse_response(&reply, &absolute.to_string_lossy())?
            }
        };

        tracing::debug!(
            path = %path.display(),
            verdict = %verdict,
            duration_ms = start.elapsed().as_millis() as u64,
            "clamd scan completed"
        );

        Ok(verdict)
    }

    async fn health_check(&self) -> Result<(), ScanError> {
        let reply = self.command(b"PING").await?;
        if reply.trim() == "PONG" {
            Ok(())
        } else {
            Err(ScanError::ambiguous(
                ENGINE,
                format!("unexpected PING reply: {}", reply),
            ))
        }
    }

    async fn version(&self) -> Option<String> {
        match self.command(b"VERSION").await {
            Ok(reply) if !reply.trim().is_empty() => Some(reply.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "clamd VERSION failed");
                None
            }
        }
    }
}
