use thiserror::Error;
use tonegraph_core::TonegraphError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Core error: {0}")]
    Core(#[from] TonegraphError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Tracker already running")]
    AlreadyRunning,
    #[error("Tracker not running")]
    NotRunning,
    #[error("Tracker worker disconnected")]
    Disconnected,
}
