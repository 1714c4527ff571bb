//! Errors from reading and writing template banks.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BankError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse template {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid template {path}: {message}")]
    Invalid { path: PathBuf, message: String },

    #[error("Refusing to overwrite existing file: {0}")]
    AlreadyExists(PathBuf),

    #[error("Bank path not found: {0}")]
    NotFound(PathBuf),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl BankError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn parse(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn invalid(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }
}

/// Type alias for bank results.
pub type BankResult<T> = Result<T, BankError>;
