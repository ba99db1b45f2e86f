//! Capture state machine of one profiling session.
//!
//! `Idle -> Capturing -> {Previewing, Stopped}`. A live session may go from
//! `Stopped` back to `Capturing`; a file-backed session stays stopped.

use crate::utils::error::StateError;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Capturing,
    Previewing,
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Capturing => "capturing",
            SessionState::Previewing => "previewing",
            SessionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Session state plus the two independently toggled data flags
///
/// `data_capture` gates ingestion of queued frames, `data_preview` gates
/// per-frame notifications. Both only matter while capturing or previewing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureState {
    state: SessionState,
    file_backed: bool,
    data_capture: bool,
    data_preview: bool,
}

impl CaptureState {
    pub fn new(file_backed: bool) -> Self {
        Self {
            state: SessionState::Idle,
            file_backed,
            data_capture: true,
            data_preview: true,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_file_backed(&self) -> bool {
        self.file_backed
    }

    /// `Idle -> Capturing`, or `Stopped -> Capturing` for live sessions
    pub fn start_capture(&mut self) -> Result<(), StateError> {
        match self.state {
            SessionState::Idle => {}
            SessionState::Stopped if !self.file_backed => {}
            SessionState::Previewing => {}
            _ => return Err(self.invalid("start capture")),
        }
        self.state = SessionState::Capturing;
        Ok(())
    }

    /// `Capturing -> Previewing`
    pub fn start_preview(&mut self) -> Result<(), StateError> {
        if self.state != SessionState::Capturing {
            return Err(self.invalid("start preview"));
        }
        self.state = SessionState::Previewing;
        Ok(())
    }

    /// `Capturing | Previewing -> Stopped`
    pub fn stop(&mut self) -> Result<(), StateError> {
        match self.state {
            SessionState::Capturing | SessionState::Previewing => {
                self.state = SessionState::Stopped;
                Ok(())
            }
            _ => Err(self.invalid("stop")),
        }
    }

    pub fn set_data_capture(&mut self, enabled: bool) {
        self.data_capture = enabled;
    }

    pub fn set_data_preview(&mut self, enabled: bool) {
        self.data_preview = enabled;
    }

    pub fn data_capture(&self) -> bool {
        self.data_capture
    }

    pub fn data_preview(&self) -> bool {
        self.data_preview
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Capturing | SessionState::Previewing)
    }

    /// Whether queued frames are processed
    pub fn should_ingest(&self) -> bool {
        self.is_active() && self.data_capture
    }

    /// Whether per-frame notifications are sent
    pub fn should_notify_frames(&self) -> bool {
        self.is_active() && self.data_preview
    }

    fn invalid(&self, action: &'static str) -> StateError {
        StateError::InvalidTransition {
            from: self.state.to_string(),
            action,
        }
    }
}
