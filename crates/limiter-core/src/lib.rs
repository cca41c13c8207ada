pub mod clock;
pub mod config;
pub mod error;
pub mod limiter;
pub mod store;
pub mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LimiterConfig;
pub use error::ConfigError;
pub use limiter::{KeySnapshot, RateLimiter};
pub use store::{KeyState, KeyStore};
