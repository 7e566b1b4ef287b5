use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use appmgr_core::{AddressError, StoreError};

/// The call succeeded.
pub const STATUS_SUCCESS: i32 = 0;
/// Generic failure (bad parameter, launch refused, shutdown in progress, ...).
pub const STATUS_FAILURE: i32 = -1;
/// The bus refused to buffer an outbound message.
pub const STATUS_OUT_OF_MEMORY: i32 = 0xd0;
/// A bus call or send failed.
pub const STATUS_CALL_FAILED: i32 = 0xd1;
/// A synchronous call received no reply.
pub const STATUS_REPLY_FAILED: i32 = 0xd2;

/// Failures reported by a [`crate::bus::BusTransport`].
#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus refused to buffer outbound message")]
    OutOfMemory,

    #[error("bus connection closed")]
    Disconnected,

    #[error("no reply to '{member}' within {timeout:?}")]
    Timeout { member: String, timeout: Duration },

    #[error("remote error {name}: {message}")]
    Remote { name: String, message: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON frame error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bus protocol error: {0}")]
    Protocol(String),

    #[error("bus broker is not running (socket missing: {socket})")]
    NotRunning { socket: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> BusError {
    BusError::Io {
        path: path.into(),
        source,
    }
}

/// Error surface of the client runtime. None of these are fatal: a client that
/// returned one stays usable for the next call.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("out of memory: bus refused to buffer outbound message")]
    OutOfMemory,

    #[error("bus transport error: {0}")]
    Transport(#[source] BusError),

    #[error("no reply received for '{member}'")]
    ReplyMissing { member: String },

    #[error("launching '{app}' failed (instance id {instance_id}, error code {error_code})")]
    LaunchFailed {
        app: String,
        instance_id: i32,
        error_code: i32,
    },

    #[error("application manager is shutting down")]
    ShuttingDown,

    #[error("malformed '{member}' signal: {reason}")]
    MalformedSignal { member: String, reason: String },

    #[error("config store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid client config at {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl ClientError {
    /// Numeric status reported to callers that speak exit codes.
    pub fn status_code(&self) -> i32 {
        match self {
            ClientError::OutOfMemory => STATUS_OUT_OF_MEMORY,
            ClientError::Transport(_) => STATUS_CALL_FAILED,
            ClientError::ReplyMissing { .. } => STATUS_REPLY_FAILED,
            ClientError::InvalidParameter(_)
            | ClientError::LaunchFailed { .. }
            | ClientError::ShuttingDown
            | ClientError::MalformedSignal { .. }
            | ClientError::Store(_)
            | ClientError::Config { .. }
            | ClientError::Runtime(_) => STATUS_FAILURE,
        }
    }

    pub(crate) fn malformed(member: &str, reason: impl Into<String>) -> Self {
        ClientError::MalformedSignal {
            member: member.to_owned(),
            reason: reason.into(),
        }
    }
}

impl From<AddressError> for ClientError {
    fn from(err: AddressError) -> Self {
        ClientError::InvalidParameter(err.to_string())
    }
}

impl From<BusError> for ClientError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::OutOfMemory => ClientError::OutOfMemory,
            BusError::Timeout { member, .. } => ClientError::ReplyMissing { member },
            other => ClientError::Transport(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_legacy_numbering() {
        assert_eq!(ClientError::OutOfMemory.status_code(), 0xd0);
        assert_eq!(
            ClientError::from(BusError::Disconnected).status_code(),
            0xd1
        );
        assert_eq!(
            ClientError::from(BusError::Timeout {
                member: "app_launch_call".into(),
                timeout: Duration::from_secs(1),
            })
            .status_code(),
            0xd2
        );
        assert_eq!(ClientError::ShuttingDown.status_code(), -1);
    }

    #[test]
    fn bus_out_of_memory_maps_to_client_out_of_memory() {
        assert!(matches!(
            ClientError::from(BusError::OutOfMemory),
            ClientError::OutOfMemory
        ));
    }

    #[test]
    fn address_errors_are_invalid_parameters() {
        let err = ClientError::from(AddressError::EmptyName);
        assert!(matches!(err, ClientError::InvalidParameter(_)));
        assert!(err.to_string().contains("empty"));
    }
}
