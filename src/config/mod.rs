use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::resolve::LanguagePreference;

const CONFIG_FILE: &str = "config.yaml";
const APP_DIR: &str = "transcript-resolver";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream caption source settings
    pub source: SourceConfig,

    /// Resolution service settings
    pub service: ServiceConfig,
}

/// Which upstream integration provides caption tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SourceBackend {
    /// Scrape the watch page and timed-text endpoints directly
    Youtube,
    /// Delegate track discovery to the yt-dlp executable
    YtDlp,
}

impl std::fmt::Display for SourceBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceBackend::Youtube => write!(f, "youtube"),
            SourceBackend::YtDlp => write!(f, "yt-dlp"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Caption source implementation
    pub backend: SourceBackend,

    /// User agent sent to the upstream
    pub user_agent: String,

    /// Accept-Language header sent to the upstream
    pub accept_language: String,

    /// Timeout for every individual upstream HTTP request, in seconds
    pub request_timeout_secs: u64,

    /// Path to the yt-dlp executable
    pub yt_dlp_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Deadline for one whole resolution, in seconds (0 disables it)
    pub resolve_timeout_secs: u64,

    /// Preferences applied when a request does not carry any
    pub default_languages: Vec<String>,

    /// Maximum resolutions running at once in batch mode
    pub max_concurrent_requests: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            backend: SourceBackend::Youtube,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            request_timeout_secs: 15,
            yt_dlp_path: "yt-dlp".to_string(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_secs: 30,
            default_languages: Vec::new(),
            max_concurrent_requests: 4,
        }
    }
}

/// Configuration values that cannot be used
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("source.request_timeout_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("service.max_concurrent_requests must be greater than zero")]
    ZeroConcurrency,

    #[error("source.yt_dlp_path must not be empty")]
    EmptyYtDlpPath,

    #[error("service.default_languages is invalid: {0}")]
    DefaultLanguages(String),
}

impl Config {
    /// Load configuration from an explicit path, the usual locations, or defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load and validate configuration from a YAML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        let config: Config = serde_yaml::from_str(&content)
            .context("Failed to parse config file")?;

        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs_err::create_dir_all(parent)?;
            }
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Option<PathBuf> {
        // Current directory wins so a deployment can ship its config next to the binary
        let local_config = PathBuf::from(CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.source.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroRequestTimeout);
        }

        if self.service.max_concurrent_requests == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        if self.source.backend == SourceBackend::YtDlp && self.source.yt_dlp_path.trim().is_empty() {
            return Err(ConfigError::EmptyYtDlpPath);
        }

        LanguagePreference::parse(self.service.default_languages.clone())
            .map_err(|e| ConfigError::DefaultLanguages(e.to_string()))?;

        Ok(())
    }

    /// Deadline for one resolution, if any
    pub fn resolve_timeout(&self) -> Option<Duration> {
        match self.service.resolve_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Source Backend: {}", self.source.backend);
        println!("  Request Timeout: {}s", self.source.request_timeout_secs);
        if self.source.backend == SourceBackend::YtDlp {
            println!("  yt-dlp Path: {}", self.source.yt_dlp_path);
        }
        match self.resolve_timeout() {
            Some(timeout) => println!("  Resolve Timeout: {}s", timeout.as_secs()),
            None => println!("  Resolve Timeout: disabled"),
        }
        if self.service.default_languages.is_empty() {
            println!("  Default Languages: any");
        } else {
            println!("  Default Languages: {}", self.service.default_languages.join(", "));
        }
        println!("  Max Concurrent Requests: {}", self.service.max_concurrent_requests);
    }
}

impl SourceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
