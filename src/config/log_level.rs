use std::str::FromStr;

use snafu::Snafu;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Warn,
    Error,
    Silent,
}

impl LogLevel {
    pub fn to_tracing_level(&self) -> Option<tracing::Level> {
        match self {
            LogLevel::Debug => Some(tracing::Level::DEBUG),
            LogLevel::Info => Some(tracing::Level::INFO),
            LogLevel::Warn => Some(tracing::Level::WARN),
            LogLevel::Error => Some(tracing::Level::ERROR),
            LogLevel::Silent => None,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "silent" | "off" => Ok(LogLevel::Silent),
            _ => Err(ParseLogLevelError {
                value: s.to_string(),
            }),
        }
    }
}

/// Installs a compact fmt subscriber for `level`.
///
/// Returns `false` if the level is silent or the host already installed a
/// global subscriber.
pub fn setup_tracing(level: &LogLevel) -> bool {
    let Some(level) = level.to_tracing_level() else {
        return false;
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .without_time()
        .compact()
        .try_init()
        .is_ok()
}

#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(display("Unknown log level '{}'", value))]
pub struct ParseLogLevelError {
    value: String,
}
