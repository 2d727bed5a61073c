use serde::{Deserialize, Serialize};

use crate::models::device::DeviceDescriptor;
use crate::models::frame::{CapturedFrame, FrameInfo};
use crate::models::notice::Notice;
use crate::models::state::{PermissionState, RecognitionResult, SessionPhase, StreamState};

/// All mutable session state, owned by the orchestrator.
pub(crate) struct SessionContext {
    pub phase: SessionPhase,
    pub permission: PermissionState,
    pub devices: Vec<DeviceDescriptor>,
    pub selected_device_id: Option<String>,
    pub frame: Option<CapturedFrame>,
    pub recognition: RecognitionResult,
    pub notice: Option<Notice>,
    /// Set while a still is being encoded; device switches wait it out.
    pub capturing: bool,
    /// Bumped by retake and reset; continuations started under an older
    /// epoch drop their results.
    pub epoch: u64,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            permission: PermissionState::Unknown,
            devices: Vec::new(),
            selected_device_id: None,
            frame: None,
            recognition: RecognitionResult::idle(),
            notice: None,
            capturing: false,
            epoch: 0,
        }
    }

    pub fn snapshot(&self, stream_state: StreamState, preview_live: bool) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            permission: self.permission,
            devices: self.devices.clone(),
            selected_device_id: self.selected_device_id.clone(),
            stream_state,
            preview_live,
            frame: self.frame.as_ref().map(CapturedFrame::info),
            recognition: self.recognition.clone(),
            notice: self.notice.clone(),
        }
    }
}

/// Read-only view of the session for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub permission: PermissionState,
    pub devices: Vec<DeviceDescriptor>,
    pub selected_device_id: Option<String>,
    pub stream_state: StreamState,
    pub preview_live: bool,
    pub frame: Option<FrameInfo>,
    pub recognition: RecognitionResult,
    pub notice: Option<Notice>,
}

impl SessionSnapshot {
    /// Text to display: recognized text, or the fallback after a failure.
    pub fn text(&self) -> Option<&str> {
        self.recognition.text.as_deref()
    }
}
