use std::sync::Arc;

use async_trait::async_trait;

use crate::models::error::CaptureError;
use crate::models::frame::CapturedFrame;

/// Advisory progress report emitted by a recognition engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionProgress {
    pub status: String,
    /// Completion ratio, 0.0–1.0.
    pub progress: f32,
}

impl RecognitionProgress {
    pub fn new(status: impl Into<String>, progress: f32) -> Self {
        Self {
            status: status.into(),
            progress: progress.clamp(0.0, 1.0),
        }
    }
}

/// Callback invoked for each progress report.
pub type ProgressCallback = Arc<dyn Fn(&RecognitionProgress) + Send + Sync + 'static>;

/// OCR backend turning a still image into text.
///
/// Implemented by:
/// - `TesseractEngine` (Linux, via the `tesseract` binary)
///
/// The engine does not guard against concurrent calls; callers serialize.
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    async fn recognize(
        &self,
        frame: &CapturedFrame,
        language_hint: &str,
        on_progress: ProgressCallback,
    ) -> Result<String, CaptureError>;
}
