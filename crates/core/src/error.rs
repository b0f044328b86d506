use thiserror::Error;

/// Top-level error type used across the entire service.
///
/// The analytics core itself never fails; these variants cover the
/// configuration, cache, telemetry and transport layers around it.
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("config error: {0}")]
    Config(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("telemetry error: {0}")]
    Telemetry(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

pub type Result<T, E = PulseError> = std::result::Result<T, E>;
