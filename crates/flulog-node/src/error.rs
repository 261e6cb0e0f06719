//! Node error types.
//!
//! These are the fatal and environmental failures of the node itself.
//! Routine protocol outcomes (bad epoch, overwritten, unwritten, trimmed)
//! are not errors; they are carried by the reply enums in [`crate::ops`].

use std::io;

use thiserror::Error;

use flulog_store::file::IoError;

/// Result type for node operations.
pub type FluResult<T> = Result<T, FluError>;

/// Errors that can occur while starting or running a node.
#[derive(Debug, Error)]
pub enum FluError {
    /// I/O error outside the memfile (directory creation, hard-state read).
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Memfile I/O error.
    #[error("memfile error: {source}")]
    Memfile {
        #[from]
        source: IoError,
    },

    /// Hard-state persistence failed; the epoch fence can no longer be
    /// made durable, so the node halts.
    #[error("hard-state persistence failed: {source}")]
    HardState { source: io::Error },

    /// Hard-state file exists but cannot be trusted.
    #[error("hard state corrupted: {reason}")]
    HardStateCorrupted { reason: String },

    /// Persisted geometry disagrees with the construction parameters.
    #[error("geometry mismatch: {field} is {stored} on disk but {configured} in config")]
    GeometryMismatch {
        field: &'static str,
        stored: u64,
        configured: u64,
    },

    /// Configuration rejected at startup.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// The node has stopped; no further requests are accepted.
    #[error("node is stopped")]
    Stopped,
}

impl FluError {
    /// Creates a hard-state corruption error.
    pub fn hard_state_corrupted(reason: impl Into<String>) -> Self {
        Self::HardStateCorrupted {
            reason: reason.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config_error(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Creates a geometry mismatch error.
    pub fn geometry_mismatch(field: &'static str, stored: u64, configured: u64) -> Self {
        Self::GeometryMismatch {
            field,
            stored,
            configured,
        }
    }

    /// Returns true if the node must halt on this error.
    ///
    /// Hard-state persistence failures are fatal: continuing without a
    /// durable epoch fence would let sealed-out clients land writes after
    /// a restart. Per-operation memfile errors only fail that operation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::HardState { .. }
                | Self::HardStateCorrupted { .. }
                | Self::GeometryMismatch { .. }
                | Self::Config { .. }
        )
    }
}
