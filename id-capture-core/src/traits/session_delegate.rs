use crate::models::frame::CapturedFrame;
use crate::models::notice::Notice;
use crate::models::state::{RecognitionResult, SessionPhase};
use crate::traits::recognition_engine::RecognitionProgress;

/// Event delegate for session notifications.
///
/// Called inline from the orchestrator's continuation, so implementations
/// should hand off quickly. Every method has an empty default.
pub trait SessionDelegate: Send + Sync {
    /// Called after every phase transition.
    fn on_phase_changed(&self, _phase: SessionPhase) {}

    /// Called when the user needs to be told something went wrong.
    fn on_notice(&self, _notice: &Notice) {}

    /// Called when a still frame has been captured.
    fn on_frame_captured(&self, _frame: &CapturedFrame) {}

    /// Called for each engine progress report while recognizing.
    fn on_recognition_progress(&self, _progress: &RecognitionProgress) {}

    /// Called once a recognition request resolves.
    fn on_recognition_finished(&self, _result: &RecognitionResult) {}
}

/// Delegate that ignores every event.
pub struct NoopDelegate;

impl SessionDelegate for NoopDelegate {}
