//! Error types for installation steps

use std::path::PathBuf;
use std::time::Duration;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Installation errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command failed: {command}: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("timed out after {timeout:?} waiting for {probe}: {last_error}")]
    ReadinessTimeout {
        probe: String,
        timeout: Duration,
        last_error: String,
    },

    #[error("invalid kubeconfig: {message}")]
    Kubeconfig { message: String },

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cluster provisioning failed: {message}")]
    Provision { message: String },

    #[error("{message}; manifest kept at {} for a manual retry", path.display())]
    ManifestKept { path: PathBuf, message: String },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("prompt failed: {message}")]
    Prompt { message: String },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    pub fn provision(message: impl Into<String>) -> Self {
        Error::Provision {
            message: message.into(),
        }
    }

    pub fn prompt(message: impl Into<String>) -> Self {
        Error::Prompt {
            message: message.into(),
        }
    }

    pub fn kubeconfig(message: impl Into<String>) -> Self {
        Error::Kubeconfig {
            message: message.into(),
        }
    }
}
