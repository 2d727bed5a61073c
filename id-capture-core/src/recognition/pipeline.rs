use std::sync::Arc;

use crate::models::error::CaptureError;
use crate::models::frame::CapturedFrame;
use crate::traits::recognition_engine::{ProgressCallback, RecognitionEngine, RecognitionProgress};

/// Adapter between the orchestrator and a `RecognitionEngine`.
///
/// Every engine outcome is folded into `Ok(text)` or
/// `Err(CaptureError::RecognitionFailed(diagnostic))`; nothing else escapes.
pub struct RecognitionPipeline<E: RecognitionEngine> {
    engine: Arc<E>,
    language_hint: String,
}

impl<E: RecognitionEngine> RecognitionPipeline<E> {
    pub fn new(engine: Arc<E>, language_hint: impl Into<String>) -> Self {
        Self {
            engine,
            language_hint: language_hint.into(),
        }
    }

    pub async fn recognize(
        &self,
        frame: &CapturedFrame,
        on_progress: ProgressCallback,
    ) -> Result<String, CaptureError> {
        let frame_id = frame.id().to_string();
        let progress: ProgressCallback = Arc::new(move |p: &RecognitionProgress| {
            log::debug!(
                "recognition {}: {} ({:.0}%)",
                frame_id,
                p.status,
                p.progress * 100.0
            );
            on_progress(p);
        });

        log::info!(
            "recognizing frame {} (lang {})",
            frame.id(),
            self.language_hint
        );
        match self
            .engine
            .recognize(frame, &self.language_hint, progress)
            .await
        {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    log::warn!("recognition of {} produced no text", frame.id());
                    return Err(CaptureError::RecognitionFailed("no extractable text".into()));
                }
                log::info!("recognized {} chars from {}", text.chars().count(), frame.id());
                Ok(text.to_string())
            }
            Err(CaptureError::RecognitionFailed(diagnostic)) => {
                Err(CaptureError::RecognitionFailed(diagnostic))
            }
            Err(other) => Err(CaptureError::RecognitionFailed(other.to_string())),
        }
    }
}
