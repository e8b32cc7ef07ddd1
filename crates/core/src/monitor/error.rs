//! Error types for the monitor module.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that prevent a run from being monitored at all.
///
/// A failing encoder is not an error: it ends the run with an `Error` event.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Encoder binary not found.
    #[error("Encoder not found at path: {path}")]
    ExecutableNotFound { path: PathBuf },

    /// The encoder could not be started.
    #[error("Failed to launch {path}: {source}")]
    LaunchFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The monitor configuration is unusable.
    #[error("Invalid monitor configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// I/O error while controlling the encoder.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    /// Whether launching again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LaunchFailed { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::Interrupted | std::io::ErrorKind::WouldBlock
            ),
            Self::Io(_) => true,
            _ => false,
        }
    }
}

/// Errors raised while probing a media file.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {path}")]
    FfprobeNotFound { path: PathBuf },

    /// FFprobe ran but rejected the file.
    #[error("Failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    /// FFprobe output could not be understood.
    #[error("Failed to parse media info: {reason}")]
    ParseError { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    pub fn parse_error(reason: impl Into<String>) -> Self {
        Self::ParseError {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_messages() {
        let err = MonitorError::ExecutableNotFound {
            path: PathBuf::from("/opt/x264"),
        };
        assert_eq!(err.to_string(), "Encoder not found at path: /opt/x264");

        let err = ProbeError::probe_failed("no streams");
        assert_eq!(err.to_string(), "Failed to probe media file: no streams");
    }

    #[test]
    fn test_is_retryable() {
        let denied = MonitorError::LaunchFailed {
            path: PathBuf::from("x264"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(!denied.is_retryable());

        let interrupted = MonitorError::LaunchFailed {
            path: PathBuf::from("x264"),
            source: io::Error::from(io::ErrorKind::Interrupted),
        };
        assert!(interrupted.is_retryable());

        let missing = MonitorError::ExecutableNotFound {
            path: PathBuf::from("x264"),
        };
        assert!(!missing.is_retryable());
    }
}
