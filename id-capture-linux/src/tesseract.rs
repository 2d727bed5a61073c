//! Text recognition through the `tesseract` command-line tool.
//!
//! The encoded still is piped to `tesseract stdin stdout -l <lang>` and the
//! plain-text output is returned as-is; trimming and empty-text handling
//! happen in the core pipeline.

use std::ffi::OsString;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use id_capture_core::models::error::CaptureError;
use id_capture_core::models::frame::CapturedFrame;
use id_capture_core::traits::recognition_engine::{
    ProgressCallback, RecognitionEngine, RecognitionProgress,
};

pub struct TesseractEngine {
    program: OsString,
}

impl TesseractEngine {
    /// Use `tesseract` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("tesseract")
    }

    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecognitionEngine for TesseractEngine {
    async fn recognize(
        &self,
        frame: &CapturedFrame,
        language_hint: &str,
        on_progress: ProgressCallback,
    ) -> Result<String, CaptureError> {
        on_progress(&RecognitionProgress::new("recognizing text", 0.0));

        let mut child = Command::new(&self.program)
            .args(["stdin", "stdout", "-l", language_hint])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CaptureError::RecognitionFailed(format!(
                    "failed to launch {}: {}",
                    self.program.to_string_lossy(),
                    e
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(frame.bytes()).await.map_err(|e| {
                CaptureError::RecognitionFailed(format!("failed to send image: {}", e))
            })?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| CaptureError::RecognitionFailed(format!("tesseract did not finish: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptureError::RecognitionFailed(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        on_progress(&RecognitionProgress::new("recognizing text", 1.0));
        log::debug!(
            "tesseract read {} bytes of text from frame {}",
            output.stdout.len(),
            frame.id()
        );
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
