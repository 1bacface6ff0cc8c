//! Host facing settings: logging verbosity and tree rendering style.

mod config;
mod log_level;

pub use config::{ConfigError, ShellConfig};
pub use log_level::{LogLevel, ParseLogLevelError, setup_tracing};
