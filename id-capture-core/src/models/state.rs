use serde::{Deserialize, Serialize};

/// Camera access as known to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Unknown,
    Prompting,
    Granted,
    Denied,
}

impl PermissionState {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Answer of a non-intrusive permission query.
///
/// `Prompt` and `Unsupported` are both indeterminate: the gate falls back to
/// an active request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionQuery {
    Granted,
    Denied,
    Prompt,
    Unsupported,
}

/// Capture session stream lifecycle.
///
/// ```text
/// idle → starting → live → stopped
///          ↓                  ↓
///         idle (failed)    starting (retake)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    Idle,
    Starting,
    Live,
    Stopped,
}

/// Orchestrator state machine.
///
/// ```text
/// idle → checking_permission → permission_denied
///                ↓
///         selecting_device ⇄ previewing → captured → recognizing → recognized
///                                            ↑           ↓
///                                            └── recognition_failed
///
/// captured / recognized / recognition_failed → retake → checking_permission
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    CheckingPermission,
    PermissionDenied,
    SelectingDevice,
    Previewing,
    Captured,
    Recognizing,
    Recognized,
    RecognitionFailed,
}

impl SessionPhase {
    /// Phases in which a device pick is honored.
    pub fn accepts_device_selection(&self) -> bool {
        matches!(self, Self::SelectingDevice | Self::Previewing)
    }

    /// Phases from which a recognition request may start.
    pub fn accepts_recognition(&self) -> bool {
        matches!(self, Self::Captured | Self::RecognitionFailed)
    }

    /// Phases from which a retake may start.
    pub fn accepts_retake(&self) -> bool {
        matches!(
            self,
            Self::Captured | Self::Recognized | Self::RecognitionFailed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionStatus {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Recognition outcome for the current captured frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub status: RecognitionStatus,
    pub text: Option<String>,
    /// Id of the frame this result belongs to.
    pub frame_id: Option<String>,
}

impl RecognitionResult {
    pub fn idle() -> Self {
        Self {
            status: RecognitionStatus::Idle,
            text: None,
            frame_id: None,
        }
    }

    pub fn for_frame(frame_id: &str) -> Self {
        Self {
            frame_id: Some(frame_id.to_string()),
            ..Self::idle()
        }
    }
}

impl Default for RecognitionResult {
    fn default() -> Self {
        Self::idle()
    }
}

/// Whether an orchestrator command changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    Ignored,
}
