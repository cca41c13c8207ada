use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MAX_REQUESTS: u32 = 10;
pub const DEFAULT_WINDOW_MS: u64 = 60_000;

/// Quota applied to every key: `max_requests` per `window_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterConfig {
    pub max_requests: u32,
    pub window_ms: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window_ms: DEFAULT_WINDOW_MS,
        }
    }
}

impl LimiterConfig {
    /// Builds a config from a `Duration`, rejecting windows that do not
    /// round to a positive number of milliseconds.
    pub fn new(max_requests: u32, window: Duration) -> Result<Self, ConfigError> {
        let window_ms =
            u64::try_from(window.as_millis()).map_err(|_| ConfigError::WindowTooLarge(window))?;
        let config = Self {
            max_requests,
            window_ms,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_requests == 0 {
            return Err(ConfigError::ZeroMaxRequests);
        }
        if self.window_ms == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed = toml::from_str::<LimiterConfig>(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        parsed.validate()?;
        Ok(parsed)
    }
}
