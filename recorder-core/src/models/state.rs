use super::error::CaptureError;

/// Recorder/player session state machine.
///
/// State transitions:
/// ```text
/// idle ─record→ acquiring ─ok→ recording ⇄ paused-recording
///                   │                 └──────stop──────┴→ stopped ─play→ playing ⇄ paused-playback
///                   └─fail→ error                            ↑              │
///                                                            └──natural end─┘
/// any ─delete→ idle
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Acquiring,
    Recording,
    PausedRecording,
    /// A recording (or external source) is loaded with the cursor at 0.
    Stopped,
    Playing,
    PausedPlayback,
    Error(CaptureError),
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    /// Recording or paused mid-recording.
    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Recording | Self::PausedRecording)
    }

    /// States in which a playback duration is known.
    pub fn is_playback(&self) -> bool {
        matches!(self, Self::Stopped | Self::Playing | Self::PausedPlayback)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Capture resources must be held in exactly these states.
    pub fn holds_capture_resources(&self) -> bool {
        self.is_capturing()
    }

    pub fn error(&self) -> Option<&CaptureError> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Acquiring => "acquiring",
            Self::Recording => "recording",
            Self::PausedRecording => "paused-recording",
            Self::Stopped => "stopped",
            Self::Playing => "playing",
            Self::PausedPlayback => "paused-playback",
            Self::Error(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_capturing_states_hold_resources() {
        let holding: Vec<_> = [
            SessionState::Idle,
            SessionState::Acquiring,
            SessionState::Recording,
            SessionState::PausedRecording,
            SessionState::Stopped,
            SessionState::Playing,
            SessionState::PausedPlayback,
            SessionState::Error(CaptureError::PermissionDenied),
        ]
        .into_iter()
        .filter(SessionState::holds_capture_resources)
        .map(|s| s.name())
        .collect();

        assert_eq!(holding, vec!["recording", "paused-recording"]);
    }

    #[test]
    fn error_state_exposes_reason() {
        let state = SessionState::Error(CaptureError::DeviceUnavailable);
        assert!(state.is_error());
        assert_eq!(state.error(), Some(&CaptureError::DeviceUnavailable));
        assert_eq!(SessionState::Idle.error(), None);
    }
}
