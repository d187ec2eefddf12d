use thiserror::Error;

/// A location that carries no `/jobs/<name>/<run>` identity.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("location {location:?} does not match /jobs/<name>/<run>")]
    NoJobPath { location: String },

    #[error("invalid job name {0:?}")]
    InvalidJobName(String),
}

/// Why a request to the backend produced no usable value.
///
/// Kept `Clone` so the last failure can sit next to the last good value in a
/// store field.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {path} failed: {message}")]
    Transport { path: String, message: String },

    #[error("{path} answered HTTP {status}")]
    Status { path: String, status: u16 },

    #[error("could not decode response from {path}: {message}")]
    Decode { path: String, message: String },
}

impl FetchError {
    pub fn path(&self) -> &str {
        match self {
            FetchError::Transport { path, .. }
            | FetchError::Status { path, .. }
            | FetchError::Decode { path, .. } => path,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn decode(path: &str, err: impl std::fmt::Display) -> Self {
        FetchError::Decode {
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write config: {0}")]
    Write(#[from] std::io::Error),
}
