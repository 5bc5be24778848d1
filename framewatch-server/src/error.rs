// Error types for the relay server

use crate::executor::ExecutorError;
use framewatch_eye::VisionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Vision error: {0}")]
    Vision(#[from] VisionError),

    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Transport error: {0}")]
    Transport(#[from] axum::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for ServerError {
    fn from(err: config::ConfigError) -> Self {
        ServerError::Config(err.to_string())
    }
}
