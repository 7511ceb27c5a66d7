//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for page-harness, supporting:
//! - Environment variables for all configurable values
//! - Sensible defaults for a local chromedriver
//! - Builder-style overrides for programmatic configuration
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `PAGE_HARNESS_WEBDRIVER_URL` | WebDriver endpoint | `http://localhost:9515` |
//! | `PAGE_HARNESS_LANG` | Browser UI language | `ru` |
//! | `PAGE_HARNESS_HEADLESS` | Run the browser headless | `false` |
//! | `PAGE_HARNESS_MAXIMIZED` | Start with a maximized window | `true` |
//! | `PAGE_HARNESS_IMPLICIT_WAIT` | WebDriver implicit wait (seconds) | `0` |
//! | `PAGE_HARNESS_EXPLICIT_WAIT` | Default explicit wait (seconds) | `10` |
//! | `PAGE_HARNESS_POLL_INTERVAL_MS` | Explicit wait polling interval | `500` |
//! | `PAGE_HARNESS_LANDMARK_TIMEOUT_MS` | Per-landmark wait during page-load checks | `2000` |
//! | `PAGE_HARNESS_STABILITY_INTERVAL_MS` | Height resample interval | `1000` |
//! | `PAGE_HARNESS_REFERENCE_DIR` | Reference screenshot store | `screenshots/reference` |
//! | `PAGE_HARNESS_DIFF_DIR` | Diff screenshot store | `screenshots/diff` |
//! | `PAGE_HARNESS_PIXEL_THRESHOLD` | Per-pixel colour distance threshold | `0.1` |
//! | `PAGE_HARNESS_ARTIFACT_DIR` | Base directory for run attachments | `/tmp/page-harness` |
//!
//! # Example
//!
//! ```bash
//! export PAGE_HARNESS_WEBDRIVER_URL="http://localhost:4444"
//! export PAGE_HARNESS_HEADLESS=true
//! export PAGE_HARNESS_EXPLICIT_WAIT=20
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

// ============================================================================
// Default Values
// ============================================================================

/// Default WebDriver endpoint (chromedriver's default port)
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Default browser UI language
pub const DEFAULT_LANG: &str = "ru";

/// Default implicit wait (seconds). Explicit waits do all the polling.
pub const DEFAULT_IMPLICIT_WAIT: u64 = 0;

/// Default explicit wait (seconds)
pub const DEFAULT_EXPLICIT_WAIT: u64 = 10;

/// Default polling interval for explicit waits (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Default per-landmark wait used by the page-load heuristic (milliseconds)
pub const DEFAULT_LANDMARK_TIMEOUT_MS: u64 = 2000;

/// Default interval between the two page-height samples (milliseconds)
pub const DEFAULT_STABILITY_INTERVAL_MS: u64 = 1000;

/// Default reference screenshot directory
pub const DEFAULT_REFERENCE_DIR: &str = "screenshots/reference";

/// Default diff screenshot directory
pub const DEFAULT_DIFF_DIR: &str = "screenshots/diff";

/// Default per-pixel colour distance threshold (0..1)
pub const DEFAULT_PIXEL_THRESHOLD: f64 = 0.1;

/// Default base directory for run artifacts
pub const DEFAULT_ARTIFACT_DIR: &str = "/tmp/page-harness";

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_WEBDRIVER_URL: &str = "PAGE_HARNESS_WEBDRIVER_URL";
pub const ENV_LANG: &str = "PAGE_HARNESS_LANG";
pub const ENV_HEADLESS: &str = "PAGE_HARNESS_HEADLESS";
pub const ENV_MAXIMIZED: &str = "PAGE_HARNESS_MAXIMIZED";
pub const ENV_IMPLICIT_WAIT: &str = "PAGE_HARNESS_IMPLICIT_WAIT";
pub const ENV_EXPLICIT_WAIT: &str = "PAGE_HARNESS_EXPLICIT_WAIT";
pub const ENV_POLL_INTERVAL_MS: &str = "PAGE_HARNESS_POLL_INTERVAL_MS";
pub const ENV_LANDMARK_TIMEOUT_MS: &str = "PAGE_HARNESS_LANDMARK_TIMEOUT_MS";
pub const ENV_STABILITY_INTERVAL_MS: &str = "PAGE_HARNESS_STABILITY_INTERVAL_MS";
pub const ENV_REFERENCE_DIR: &str = "PAGE_HARNESS_REFERENCE_DIR";
pub const ENV_DIFF_DIR: &str = "PAGE_HARNESS_DIFF_DIR";
pub const ENV_PIXEL_THRESHOLD: &str = "PAGE_HARNESS_PIXEL_THRESHOLD";
pub const ENV_ARTIFACT_DIR: &str = "PAGE_HARNESS_ARTIFACT_DIR";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for page-harness
#[derive(Debug, Clone)]
pub struct Config {
    /// Browser session settings
    pub browser: BrowserSettings,
    /// Explicit wait settings
    pub waits: WaitSettings,
    /// Visual regression settings
    pub visual: VisualSettings,
    /// Artifact storage settings
    pub artifacts: ArtifactSettings,
}

/// Settings used when starting a browser session
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// WebDriver endpoint URL
    pub webdriver_url: String,
    /// Browser UI language (`--lang=`)
    pub lang: String,
    /// Run without a visible window
    pub headless: bool,
    /// Start with a maximized window
    pub maximized: bool,
    /// WebDriver implicit wait (seconds)
    pub implicit_wait: u64,
}

/// Settings for explicit waits
#[derive(Debug, Clone)]
pub struct WaitSettings {
    /// Default explicit wait (seconds)
    pub explicit_wait: u64,
    /// Poll interval (milliseconds)
    pub poll_interval_ms: u64,
    /// Per-landmark wait during page-load checks (milliseconds)
    pub landmark_timeout_ms: u64,
    /// Interval between page-height samples (milliseconds)
    pub stability_interval_ms: u64,
}

/// Settings for screenshot comparison
#[derive(Debug, Clone)]
pub struct VisualSettings {
    pub reference_dir: PathBuf,
    pub diff_dir: PathBuf,
    /// Per-pixel colour distance threshold
    pub pixel_threshold: f64,
}

/// Settings for diagnostic artifacts
#[derive(Debug, Clone)]
pub struct ArtifactSettings {
    /// Base directory for per-run attachment folders
    pub base_dir: PathBuf,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            browser: BrowserSettings::from_env(),
            waits: WaitSettings::from_env(),
            visual: VisualSettings::from_env(),
            artifacts: ArtifactSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            browser: BrowserSettings::defaults(),
            waits: WaitSettings::defaults(),
            visual: VisualSettings::defaults(),
            artifacts: ArtifactSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl BrowserSettings {
    pub fn from_env() -> Self {
        Self {
            webdriver_url: env::var(ENV_WEBDRIVER_URL)
                .unwrap_or_else(|_| DEFAULT_WEBDRIVER_URL.to_string()),
            lang: env::var(ENV_LANG).unwrap_or_else(|_| DEFAULT_LANG.to_string()),
            headless: env_flag(ENV_HEADLESS).unwrap_or(false),
            maximized: env_flag(ENV_MAXIMIZED).unwrap_or(true),
            implicit_wait: env_parse(ENV_IMPLICIT_WAIT).unwrap_or(DEFAULT_IMPLICIT_WAIT),
        }
    }

    pub fn defaults() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            lang: DEFAULT_LANG.to_string(),
            headless: false,
            maximized: true,
            implicit_wait: DEFAULT_IMPLICIT_WAIT,
        }
    }
}

impl WaitSettings {
    pub fn from_env() -> Self {
        Self {
            explicit_wait: env_parse(ENV_EXPLICIT_WAIT).unwrap_or(DEFAULT_EXPLICIT_WAIT),
            poll_interval_ms: env_parse(ENV_POLL_INTERVAL_MS).unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            landmark_timeout_ms: env_parse(ENV_LANDMARK_TIMEOUT_MS)
                .unwrap_or(DEFAULT_LANDMARK_TIMEOUT_MS),
            stability_interval_ms: env_parse(ENV_STABILITY_INTERVAL_MS)
                .unwrap_or(DEFAULT_STABILITY_INTERVAL_MS),
        }
    }

    pub fn defaults() -> Self {
        Self {
            explicit_wait: DEFAULT_EXPLICIT_WAIT,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            landmark_timeout_ms: DEFAULT_LANDMARK_TIMEOUT_MS,
            stability_interval_ms: DEFAULT_STABILITY_INTERVAL_MS,
        }
    }

    pub fn explicit_timeout(&self) -> Duration {
        Duration::from_secs(self.explicit_wait)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn landmark_timeout(&self) -> Duration {
        Duration::from_millis(self.landmark_timeout_ms)
    }

    pub fn stability_interval(&self) -> Duration {
        Duration::from_millis(self.stability_interval_ms)
    }
}

impl VisualSettings {
    pub fn from_env() -> Self {
        Self {
            reference_dir: env::var(ENV_REFERENCE_DIR)
                .unwrap_or_else(|_| DEFAULT_REFERENCE_DIR.to_string())
                .into(),
            diff_dir: env::var(ENV_DIFF_DIR)
                .unwrap_or_else(|_| DEFAULT_DIFF_DIR.to_string())
                .into(),
            pixel_threshold: env_parse(ENV_PIXEL_THRESHOLD).unwrap_or(DEFAULT_PIXEL_THRESHOLD),
        }
    }

    pub fn defaults() -> Self {
        Self {
            reference_dir: PathBuf::from(DEFAULT_REFERENCE_DIR),
            diff_dir: PathBuf::from(DEFAULT_DIFF_DIR),
            pixel_threshold: DEFAULT_PIXEL_THRESHOLD,
        }
    }
}

impl ArtifactSettings {
    pub fn from_env() -> Self {
        Self {
            base_dir: env::var(ENV_ARTIFACT_DIR)
                .unwrap_or_else(|_| DEFAULT_ARTIFACT_DIR.to_string())
                .into(),
        }
    }

    pub fn defaults() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name).ok().and_then(|s| parse_flag(&s))
}

/// Parse a boolean flag: accepts 1/0, true/false, yes/no, on/off
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
