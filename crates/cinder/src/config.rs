//! Server configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) gives a
//! working server on `0.0.0.0:25565`.
//!
//! ```toml
//! bind_address = "0.0.0.0:25565"
//! idle_timeout_ms = 30000
//! default_locale = "en_us"
//!
//! [buffer_pool]
//! initial_capacity = 512
//!
//! [logging]
//! level = "debug"
//! json = true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use cinder_protocol::DEFAULT_LOCALE;
use cinder_transport::DEFAULT_MAX_FRAME_LEN;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Settings for one server instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the TCP listener binds to.
    pub bind_address: String,
    /// How long a new connection may stay silent before its first frame.
    pub handshake_timeout_ms: u64,
    /// How long an established connection may stay silent.
    pub idle_timeout_ms: u64,
    /// Interval between server keep-alive probes. 0 disables them.
    pub keep_alive_interval_ms: u64,
    /// Largest frame accepted or sent, in bytes.
    pub max_frame_len: usize,
    /// Locale used until a client reports its own.
    pub default_locale: String,
    /// Id manifest to load instead of the bundled one.
    pub manifest: Option<PathBuf>,
    /// Server-side translation tables (`{"en_us": {"key": "template"}}`).
    pub translations: Option<PathBuf>,
    pub buffer_pool: BufferPoolConfig,
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:25565".to_string(),
            handshake_timeout_ms: 5_000,
            idle_timeout_ms: 30_000,
            keep_alive_interval_ms: 10_000,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            default_locale: DEFAULT_LOCALE.to_string(),
            manifest: None,
            translations: None,
            buffer_pool: BufferPoolConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Sizing of the per-server [`BufferPool`](cinder_buffer::BufferPool).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BufferPoolConfig {
    /// Capacity of a freshly acquired buffer.
    pub initial_capacity: usize,
    /// Idle buffers kept for reuse.
    pub max_pooled: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 256,
            max_pooled: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set (trace, debug, info, warn,
    /// error, or a full directive string).
    pub level: String,
    /// Emit one JSON object per event instead of human-readable lines.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ServerConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_frame_len == 0 || self.max_frame_len > DEFAULT_MAX_FRAME_LEN {
            return Err(ConfigError::Invalid {
                field: "max_frame_len",
                reason: format!("must be between 1 and {DEFAULT_MAX_FRAME_LEN}"),
            });
        }
        if self.handshake_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "handshake_timeout_ms",
                reason: "must be positive".into(),
            });
        }
        if self.idle_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "idle_timeout_ms",
                reason: "must be positive".into(),
            });
        }
        if self.default_locale.is_empty() {
            return Err(ConfigError::Invalid {
                field: "default_locale",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// `None` when keep-alive probes are disabled.
    pub fn keep_alive_interval(&self) -> Option<Duration> {
        (self.keep_alive_interval_ms > 0).then(|| Duration::from_millis(self.keep_alive_interval_ms))
    }
}
