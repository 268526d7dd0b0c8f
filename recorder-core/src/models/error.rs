use std::fmt;

use thiserror::Error;

use super::audio_models::EncodingFormat;

/// User-intent entry points, used to report which call was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Record,
    Pause,
    Resume,
    Stop,
    Play,
    Seek,
    Delete,
    LoadSource,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Record => "record",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::Play => "play",
            Self::Seek => "seek",
            Self::Delete => "delete",
            Self::LoadSource => "load-source",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while recording or playing back.
///
/// `Clone + PartialEq` so the last failure can be carried inside
/// [`SessionState::Error`](super::state::SessionState::Error).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The user declined capture access. Recoverable by calling `record` again.
    #[error("permission denied")]
    PermissionDenied,

    #[error("device not available")]
    DeviceUnavailable,

    /// The encoder cannot produce the requested format. The resource guard
    /// recovers from this locally; it never reaches the session's error state.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(EncodingFormat),

    /// Caller invoked an operation that is illegal for the current state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: Operation,
        state: &'static str,
    },

    #[error("encoder failure: {0}")]
    EncoderFailure(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    /// A pending operation was superseded by `delete` or teardown.
    #[error("cancelled")]
    Cancelled,

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Whether this failure moves the session into its error state.
    ///
    /// Format fallbacks are handled inside acquisition and invalid-state
    /// rejections are reported synchronously to the caller only.
    pub fn is_surfaced(&self) -> bool {
        !matches!(
            self,
            Self::UnsupportedFormat(_) | Self::InvalidState { .. } | Self::Cancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_message_names_operation_and_state() {
        let err = CaptureError::InvalidState {
            operation: Operation::Seek,
            state: "recording",
        };
        assert_eq!(err.to_string(), "cannot seek while recording");
    }

    #[test]
    fn only_hard_failures_are_surfaced() {
        assert!(CaptureError::PermissionDenied.is_surfaced());
        assert!(CaptureError::DeviceUnavailable.is_surfaced());
        assert!(CaptureError::EncoderFailure("flush".into()).is_surfaced());
        assert!(!CaptureError::UnsupportedFormat(EncodingFormat::Opus).is_surfaced());
        assert!(!CaptureError::Cancelled.is_surfaced());
    }
}
