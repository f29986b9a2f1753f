//! Service configuration loaded at startup.
//!
//! All settings are load-time constants in the spirit of a config file:
//! compiled defaults, overridable through `TUBEDOWN_*` environment variables
//! and a few CLI flags. Configuration is validated once at boot; an invalid
//! value is a startup error, never a silent fallback.
//!
//! # Example
//!
//! ```
//! use tubedown_core::config::Config;
//!
//! let config = Config::default();
//! assert_eq!(config.max_concurrent_downloads, 3);
//! config.validate().unwrap();
//! ```

use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Default cap on the size of a single downloaded file (500 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Default number of downloads allowed to stream simultaneously.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 3;

/// Default per-client admission cap within one rate window.
pub const DEFAULT_MAX_REQUESTS_PER_MINUTE: u32 = 30;

/// Lookback interval for rate admission.
pub const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Container formats the service is prepared to serve.
pub const SUPPORTED_FORMATS: [&str; 3] = ["mp4", "webm", "mp3"];

/// Preferred container format when a client expresses no choice.
pub const DEFAULT_FORMAT: &str = "mp4";

/// First port tried when no port is pinned.
pub const BASE_PORT: u16 = 8000;

/// Upper bound (exclusive) of the port scan.
pub const PORT_SCAN_END: u16 = 8020;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Errors raised while reading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment override was present but unusable.
    #[error("environment variable {var} has invalid value {value:?}")]
    InvalidEnv {
        /// The variable that failed to parse.
        var: &'static str,
        /// The raw value found in the environment.
        value: String,
    },

    /// The assembled configuration failed a sanity check.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Human-readable description of the failed check.
        reason: String,
    },
}

impl ConfigError {
    fn invalid_env(var: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidEnv {
            var,
            value: value.into(),
        }
    }

    fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

/// Runtime configuration for the whole service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory completed downloads are written to.
    pub download_dir: PathBuf,

    /// Path of the flat JSON catalog of completed downloads.
    pub catalog_file: PathBuf,

    /// Hard cap, in bytes, on a single downloaded file.
    pub max_file_size: u64,

    /// How many downloads may stream at the same time.
    pub max_concurrent_downloads: usize,

    /// Per-client admission cap within [`RATE_WINDOW`].
    pub max_requests_per_minute: u32,

    /// Domains a submitted URL must match (by host substring).
    pub allowed_domains: Vec<String>,

    /// Proxy handed to the extraction engine, e.g. `socks5://127.0.0.1:10808`.
    /// `None` runs the engine without a proxy.
    pub proxy: Option<String>,

    /// Address the HTTP listener binds to.
    pub bind_addr: IpAddr,

    /// Pinned listening port. `None` scans [`BASE_PORT`]..[`PORT_SCAN_END`]
    /// for the first free port.
    pub port: Option<u16>,

    /// Name or path of the yt-dlp executable.
    pub ytdlp_bin: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            catalog_file: PathBuf::from("videos_info.json"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            max_requests_per_minute: DEFAULT_MAX_REQUESTS_PER_MINUTE,
            allowed_domains: vec!["youtube.com".to_string(), "youtu.be".to_string()],
            proxy: None,
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: None,
            ytdlp_bin: PathBuf::from("yt-dlp"),
        }
    }
}

impl Config {
    /// Builds the configuration from defaults plus `TUBEDOWN_*` environment
    /// overrides, then validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for an unparseable override and
    /// [`ConfigError::Invalid`] when a sanity check fails.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Like [`Config::from_env`] but reading variables through `lookup`,
    /// which keeps tests independent of process state.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(dir) = parse_var::<PathBuf>(&lookup, "TUBEDOWN_DOWNLOAD_DIR")? {
            config.download_dir = dir;
        }
        if let Some(path) = parse_var::<PathBuf>(&lookup, "TUBEDOWN_CATALOG_FILE")? {
            config.catalog_file = path;
        }
        if let Some(size) = parse_var::<u64>(&lookup, "TUBEDOWN_MAX_FILE_SIZE")? {
            config.max_file_size = size;
        }
        if let Some(count) = parse_var::<usize>(&lookup, "TUBEDOWN_MAX_CONCURRENT_DOWNLOADS")? {
            config.max_concurrent_downloads = count;
        }
        if let Some(rate) = parse_var::<u32>(&lookup, "TUBEDOWN_MAX_REQUESTS_PER_MINUTE")? {
            config.max_requests_per_minute = rate;
        }
        if let Some(domains) = lookup("TUBEDOWN_ALLOWED_DOMAINS") {
            config.allowed_domains = domains
                .split(',')
                .map(str::trim)
                .filter(|domain| !domain.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(proxy) = parse_var::<String>(&lookup, "TUBEDOWN_PROXY")? {
            config.proxy = Some(proxy);
        }
        if let Some(addr) = parse_var::<IpAddr>(&lookup, "TUBEDOWN_BIND_ADDR")? {
            config.bind_addr = addr;
        }
        if let Some(port) = parse_var::<u16>(&lookup, "TUBEDOWN_PORT")? {
            config.port = Some(port);
        }
        if let Some(bin) = parse_var::<PathBuf>(&lookup, "TUBEDOWN_YTDLP_BIN")? {
            config.ytdlp_bin = bin;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for values that would misbehave at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first failed check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_file_size == 0 {
            return Err(ConfigError::invalid("max_file_size must be greater than zero"));
        }
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&self.max_concurrent_downloads) {
            return Err(ConfigError::invalid(format!(
                "max_concurrent_downloads must be {MIN_CONCURRENCY}-{MAX_CONCURRENCY}, got {}",
                self.max_concurrent_downloads
            )));
        }
        if self.max_requests_per_minute == 0 {
            return Err(ConfigError::invalid(
                "max_requests_per_minute must be at least 1",
            ));
        }
        if self.allowed_domains.iter().all(|domain| domain.is_empty()) {
            return Err(ConfigError::invalid(
                "at least one allowed domain is required",
            ));
        }
        if self.download_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid("download_dir must not be empty"));
        }
        if self.catalog_file.as_os_str().is_empty() {
            return Err(ConfigError::invalid("catalog_file must not be empty"));
        }
        if self.ytdlp_bin.as_os_str().is_empty() {
            return Err(ConfigError::invalid("ytdlp_bin must not be empty"));
        }
        Ok(())
    }

    /// The size cap expressed in whole megabytes, as shown to clients.
    #[must_use]
    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size / 1024 / 1024
    }
}

/// Reads one override through `lookup`, treating blank values as unset.
fn parse_var<T: FromStr>(
    lookup: impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::invalid_env(var, raw))
}
