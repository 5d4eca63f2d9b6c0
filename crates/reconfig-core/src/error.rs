//! Error types for the reconfiguration controller.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for controller operations.
pub type ReconfigResult<T> = Result<T, ReconfigError>;

/// Network-level failures: the remote side never produced a usable answer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("http exchange with {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("{url} unavailable (status {status})")]
    Unavailable { url: String, status: u16 },
}

/// The store rejected a membership request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("membership request rejected (status {status}): {reason}")]
pub struct MembershipError {
    pub status: u16,
    pub reason: String,
}

impl MembershipError {
    /// Whether the store reports the member as already gone.
    pub fn is_stale_member(&self) -> bool {
        matches!(self.status, 404 | 410)
    }
}

/// Errors that can end an orchestration pass.
#[derive(Debug, Error)]
pub enum ReconfigError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Membership(#[from] MembershipError),

    #[error(
        "cluster crashed: {healthy} of {counted} started members healthy, \
         quorum cannot be restored automatically; manual intervention required"
    )]
    ClusterCrash { healthy: usize, counted: usize },

    #[error("runtime config incomplete, missing or invalid values for: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("malformed response from {url}: {reason}")]
    Protocol { url: String, reason: String },

    #[error("local identity unavailable: {0}")]
    Identity(String),

    #[error("failed to write runtime config to {path}: {source}")]
    Emit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReconfigError {
    /// Whether the failure means the remote endpoint could not be reached.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ReconfigError::Transport(_))
    }
}
