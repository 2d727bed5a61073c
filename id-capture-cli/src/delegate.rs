use std::io::Write;

use serde::Serialize;

use id_capture_core::{
    CapturedFrame, Notice, RecognitionProgress, RecognitionResult, SessionDelegate, SessionPhase,
};

/// SessionDelegate that reports session events on stderr.
///
/// With `json` set, every event is one JSON object per line so a wrapping
/// process can follow the session; otherwise events go to the log.
pub struct ConsoleDelegate {
    json: bool,
}

impl ConsoleDelegate {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn emit<T: Serialize>(&self, event: &str, payload: T) {
        let line = serde_json::json!({ "event": event, "payload": payload });
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{}", line);
    }
}

// -- Event payloads --

#[derive(Clone, Serialize)]
struct ProgressPayload<'a> {
    status: &'a str,
    progress: f32,
}

#[derive(Clone, Serialize)]
struct FramePayload<'a> {
    id: &'a str,
    width: u32,
    height: u32,
    size_bytes: usize,
    digest: &'a str,
}

impl SessionDelegate for ConsoleDelegate {
    fn on_phase_changed(&self, phase: SessionPhase) {
        if self.json {
            self.emit("phase-changed", phase);
        } else {
            log::info!("phase: {:?}", phase);
        }
    }

    fn on_notice(&self, notice: &Notice) {
        if self.json {
            self.emit("notice", notice);
        } else {
            eprintln!("{}", notice.message);
        }
    }

    fn on_frame_captured(&self, frame: &CapturedFrame) {
        if self.json {
            self.emit(
                "frame-captured",
                FramePayload {
                    id: frame.id(),
                    width: frame.width(),
                    height: frame.height(),
                    size_bytes: frame.bytes().len(),
                    digest: frame.digest(),
                },
            );
        } else {
            log::info!(
                "captured {}x{} still ({} bytes)",
                frame.width(),
                frame.height(),
                frame.bytes().len()
            );
        }
    }

    fn on_recognition_progress(&self, progress: &RecognitionProgress) {
        if self.json {
            self.emit(
                "recognition-progress",
                ProgressPayload {
                    status: &progress.status,
                    progress: progress.progress,
                },
            );
        } else {
            log::info!("{} ({:.0}%)", progress.status, progress.progress * 100.0);
        }
    }

    fn on_recognition_finished(&self, result: &RecognitionResult) {
        if self.json {
            self.emit("recognition-finished", result);
        } else {
            log::info!("recognition finished: {:?}", result.status);
        }
    }
}
