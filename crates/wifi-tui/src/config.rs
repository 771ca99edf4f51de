//! Runtime configuration.
//!
//! Loaded once at startup from an optional YAML file and handed to the
//! components that need it. Nothing here is global.
//!
//! ```yaml
//! scan:
//!   fast_interval: 2s
//!   slow_interval: 10s
//!   stable_ticks: 3
//! ui:
//!   tick_rate: 250ms
//! log:
//!   filter: wifi_tui=debug
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Scan pacing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Interval while the environment may be changing
    #[serde(with = "humantime_serde")]
    pub fast_interval: Duration,
    /// Interval once results look stable
    #[serde(with = "humantime_serde")]
    pub slow_interval: Duration,
    /// Consecutive non-empty results before slowing down
    pub stable_ticks: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            fast_interval: Duration::from_secs(2),
            slow_interval: Duration::from_secs(10),
            stable_ticks: 3,
        }
    }
}

/// Presentation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Redraw interval
    #[serde(with = "humantime_serde")]
    pub tick_rate: Duration,
    /// Capacity of the inbound message channel
    pub channel_capacity: usize,
    /// Show BSSIDs in the details panel
    pub show_bssids: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_rate: Duration::from_millis(250),
            channel_capacity: 256,
            show_bssids: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    pub filter: String,
    /// Directory for the log file in TUI mode
    pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "wifi_tui=info".to_string(),
            directory: None,
        }
    }
}

impl LogConfig {
    /// Directory the log file is written to.
    pub fn directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("wifi-tui")
        })
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scan pacing
    pub scan: ScanConfig,
    /// Presentation
    pub ui: UiConfig,
    /// Logging
    pub log: LogConfig,
}

impl Config {
    /// Default location of the config file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wifi-tui").join("config.yaml"))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file yields the defaults; an unreadable or malformed one is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Parse a YAML document.
    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.scan.fast_interval.is_zero() || self.scan.slow_interval.is_zero() {
            anyhow::bail!("scan intervals must be non-zero");
        }
        if self.scan.stable_ticks == 0 {
            anyhow::bail!("scan.stable_ticks must be at least 1");
        }
        if self.ui.channel_capacity == 0 {
            anyhow::bail!("ui.channel_capacity must be at least 1");
        }
        Ok(())
    }
}
