//! Configuration schema.
//!
//! ```toml
//! [bot]
//! access_token = "..."
//! group_id = 123456
//!
//! [longpoll]
//! wait = 25
//!
//! [storage]
//! enabled = true
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! filters = { ripple_framework = "debug" }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ripple_framework::{DEFAULT_MODE, DEFAULT_VERSION, DEFAULT_WAIT, LongPollConfig};
use ripple_transport::{DEFAULT_API_URL, DEFAULT_API_VERSION, DEFAULT_TIMEOUT, HttpBotConfig};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RippleConfig {
    #[serde(default)]
    pub bot: BotConfig,

    #[serde(default)]
    pub longpoll: LongPollSettings,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Bot
// =============================================================================

/// Credentials and endpoint of the group bot.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub access_token: String,

    /// The community id; must be positive.
    #[serde(default)]
    pub group_id: i64,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// HTTP timeout in seconds. Must exceed `longpoll.wait`.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            group_id: 0,
            api_url: default_api_url(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BotConfig {
    pub fn to_http_config(&self) -> HttpBotConfig {
        HttpBotConfig::new(self.access_token.clone(), self.group_id)
            .api_url(self.api_url.clone())
            .api_version(self.api_version.clone())
            .timeout(Duration::from_secs(self.timeout_secs))
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("access_token", &"<redacted>")
            .field("group_id", &self.group_id)
            .field("api_url", &self.api_url)
            .field("api_version", &self.api_version)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

// =============================================================================
// Long-poll and storage
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongPollSettings {
    /// Seconds the server may hold a poll open.
    #[serde(default = "default_wait")]
    pub wait: u32,

    #[serde(default = "default_mode")]
    pub mode: u32,
}

impl Default for LongPollSettings {
    fn default() -> Self {
        Self {
            wait: default_wait(),
            mode: default_mode(),
        }
    }
}

impl LongPollSettings {
    pub fn to_long_poll_config(self) -> LongPollConfig {
        LongPollConfig {
            wait: self.wait,
            mode: self.mode,
            version: DEFAULT_VERSION,
        }
    }
}

fn default_wait() -> u32 {
    DEFAULT_WAIT
}

fn default_mode() -> u32 {
    DEFAULT_MODE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Keep per-peer state in memory. When off, state access fails.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Logging
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` without it.
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub close: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Target file when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include file and line of each record.
    #[serde(default)]
    pub file_location: bool,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Per-module level overrides, e.g. `ripple_framework = "trace"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}
