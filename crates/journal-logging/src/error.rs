//! Error types for logging setup

use thiserror::Error;

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LogError {
    #[error("log file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot create rolling log file: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("global subscriber already set: {0}")]
    AlreadySet(#[from] tracing_subscriber::util::TryInitError),
}
