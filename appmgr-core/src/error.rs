//! Error types for appmgr-core.

use std::path::PathBuf;

use thiserror::Error;

/// Rejections raised while validating application and instance names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("application name is empty")]
    EmptyName,

    /// Longer than [`crate::types::NAME_SIZE`] characters.
    #[error("application name is {len} characters; the maximum is {max}")]
    NameTooLong { len: usize, max: usize },

    #[error("application name '{name}' contains invalid character {ch:?}")]
    InvalidCharacter { name: String, ch: char },

    /// A trailing digit would make `name + instance id` ambiguous.
    #[error("application name '{name}' must not end with a digit")]
    TrailingDigit { name: String },

    #[error("invalid instance id in '{input}'")]
    InvalidInstanceId { input: String },
}

/// All errors that can arise from configuration store access.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse config store at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The key exists but holds a value of another type.
    #[error("key {key} does not hold a {expected} value")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
