use std::path::PathBuf;

/// Errors raised while building a limiter or loading its configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("max_requests must be greater than zero")]
    ZeroMaxRequests,

    #[error("window must be at least one millisecond")]
    ZeroWindow,

    #[error("window of {0:?} does not fit in a millisecond counter")]
    WindowTooLarge(std::time::Duration),

    #[error("failed to read limiter config {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse limiter config {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
