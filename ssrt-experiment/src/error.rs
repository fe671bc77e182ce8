use std::io;
use std::path::PathBuf;

use ssrt_core::RegistryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid participant data: {0}")]
    Malformed(String),
    #[error("result store unavailable: {0}")]
    Unavailable(String),
}
