//! Scripted fakes for the provider, engine, surface and delegate seams.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::models::device::{MediaDeviceInfo, MediaDeviceKind, StreamConstraints};
use crate::models::error::CaptureError;
use crate::models::frame::{CapturedFrame, RawFrame};
use crate::models::notice::Notice;
use crate::models::state::{PermissionQuery, RecognitionResult, SessionPhase};
use crate::traits::media_provider::{MediaDeviceProvider, MediaStream};
use crate::traits::preview_surface::PreviewSurface;
use crate::traits::recognition_engine::{
    ProgressCallback, RecognitionEngine, RecognitionProgress,
};
use crate::traits::session_delegate::SessionDelegate;

pub(crate) fn test_frame() -> RawFrame {
    RawFrame::new(4, 2, vec![200; 4 * 2 * 3])
}

#[derive(Default)]
struct StreamLedger {
    live: AtomicUsize,
    peak: AtomicUsize,
    opened: Mutex<Vec<String>>,
    stopped: Mutex<Vec<String>>,
}

impl StreamLedger {
    fn open(&self, id: &str) {
        let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.opened.lock().push(id.to_string());
    }

    fn close(&self, id: &str) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        self.stopped.lock().push(id.to_string());
    }
}

pub(crate) struct FakeStream {
    device_id: String,
    frame: RawFrame,
    fail_frame_read: bool,
    stall: bool,
    playing: bool,
    stopped: bool,
    ledger: Arc<StreamLedger>,
}

impl MediaStream for FakeStream {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn play(&mut self) -> Result<(), CaptureError> {
        self.playing = !self.stall;
        Ok(())
    }

    fn current_frame(&self) -> Result<RawFrame, CaptureError> {
        if self.fail_frame_read {
            return Err(CaptureError::DeviceUnavailable("device unplugged".into()));
        }
        Ok(self.frame.clone())
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.playing = false;
            self.ledger.close(&self.device_id);
        }
    }

    fn is_live(&self) -> bool {
        self.playing && !self.stopped
    }
}

struct ProviderScript {
    permission: PermissionQuery,
    decline_requests: bool,
    fail_enumeration: bool,
    fail_frame_read: bool,
    stall_playback: bool,
    devices: Vec<MediaDeviceInfo>,
    failing_devices: HashSet<String>,
    frame: RawFrame,
}

/// In-memory `MediaDeviceProvider`.
///
/// Every opened stream is tracked in a ledger; a stream dropped without
/// `stop` stays counted as live, so leaks show up in `live_count`.
pub(crate) struct FakeProvider {
    script: Mutex<ProviderScript>,
    ledger: Arc<StreamLedger>,
}

impl FakeProvider {
    pub const PROBE_ID: &'static str = "<probe>";

    pub fn with_devices(ids: &[&str]) -> Self {
        let devices = ids
            .iter()
            .map(|id| MediaDeviceInfo {
                id: id.to_string(),
                label: format!("Camera {}", id),
                kind: MediaDeviceKind::VideoInput,
            })
            .collect();
        Self {
            script: Mutex::new(ProviderScript {
                permission: PermissionQuery::Granted,
                decline_requests: false,
                fail_enumeration: false,
                fail_frame_read: false,
                stall_playback: false,
                devices,
                failing_devices: HashSet::new(),
                frame: test_frame(),
            }),
            ledger: Arc::new(StreamLedger::default()),
        }
    }

    pub fn set_permission(&self, query: PermissionQuery) {
        self.script.lock().permission = query;
    }

    pub fn decline_requests(&self) {
        self.script.lock().decline_requests = true;
    }

    pub fn fail_enumeration(&self) {
        self.script.lock().fail_enumeration = true;
    }

    pub fn fail_frame_reads(&self) {
        self.script.lock().fail_frame_read = true;
    }

    /// Streams accept `play` but never report live, like a camera that
    /// stopped delivering after startup.
    pub fn stall_playback(&self) {
        self.script.lock().stall_playback = true;
    }

    pub fn fail_device(&self, id: &str) {
        self.script.lock().failing_devices.insert(id.to_string());
    }

    pub fn set_frame(&self, frame: RawFrame) {
        self.script.lock().frame = frame;
    }

    pub fn set_devices(&self, ids: &[&str]) {
        let infos = ids
            .iter()
            .map(|id| MediaDeviceInfo {
                id: id.to_string(),
                label: format!("Camera {}", id),
                kind: MediaDeviceKind::VideoInput,
            })
            .collect();
        self.set_device_infos(infos);
    }

    pub fn set_device_infos(&self, infos: Vec<MediaDeviceInfo>) {
        self.script.lock().devices = infos;
    }

    pub fn live_count(&self) -> usize {
        self.ledger.live.load(Ordering::SeqCst)
    }

    pub fn peak_live_count(&self) -> usize {
        self.ledger.peak.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> Vec<String> {
        self.ledger.opened.lock().clone()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.ledger.stopped.lock().clone()
    }
}

#[async_trait]
impl MediaDeviceProvider for FakeProvider {
    async fn query_permission(&self) -> PermissionQuery {
        self.script.lock().permission
    }

    async fn request_access(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, CaptureError> {
        // Suspend once so concurrent commands interleave like real device opens.
        tokio::task::yield_now().await;

        let script = self.script.lock();
        if script.decline_requests {
            return Err(CaptureError::PermissionDenied);
        }
        let id = match constraints {
            StreamConstraints::AnyVideo => {
                if script.devices.is_empty() {
                    return Err(CaptureError::DeviceUnavailable("no video input".into()));
                }
                Self::PROBE_ID.to_string()
            }
            StreamConstraints::ExactDevice(id) => {
                if script.failing_devices.contains(id) {
                    return Err(CaptureError::DeviceUnavailable(format!("{} is busy", id)));
                }
                if !script.devices.iter().any(|d| &d.id == id) {
                    return Err(CaptureError::DeviceUnavailable(format!("{} not found", id)));
                }
                id.clone()
            }
        };

        self.ledger.open(&id);
        Ok(Box::new(FakeStream {
            device_id: id,
            frame: script.frame.clone(),
            fail_frame_read: script.fail_frame_read,
            stall: script.stall_playback,
            playing: false,
            stopped: false,
            ledger: Arc::clone(&self.ledger),
        }))
    }

    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, CaptureError> {
        let script = self.script.lock();
        if script.fail_enumeration {
            return Err(CaptureError::Unknown("enumeration backend crashed".into()));
        }
        Ok(script.devices.clone())
    }
}

/// `RecognitionEngine` returning a scripted answer after a few suspensions.
pub(crate) struct FakeEngine {
    response: Mutex<Result<String, CaptureError>>,
    calls: AtomicUsize,
    seen_digests: Mutex<Vec<String>>,
    seen_languages: Mutex<Vec<String>>,
}

impl FakeEngine {
    pub fn answering(text: &str) -> Self {
        Self::with_response(Ok(text.to_string()))
    }

    pub fn failing(diagnostic: &str) -> Self {
        Self::with_response(Err(CaptureError::Unknown(diagnostic.to_string())))
    }

    fn with_response(response: Result<String, CaptureError>) -> Self {
        Self {
            response: Mutex::new(response),
            calls: AtomicUsize::new(0),
            seen_digests: Mutex::new(Vec::new()),
            seen_languages: Mutex::new(Vec::new()),
        }
    }

    pub fn respond_with(&self, response: Result<String, CaptureError>) {
        *self.response.lock() = response;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_digests(&self) -> Vec<String> {
        self.seen_digests.lock().clone()
    }

    pub fn seen_languages(&self) -> Vec<String> {
        self.seen_languages.lock().clone()
    }
}

#[async_trait]
impl RecognitionEngine for FakeEngine {
    async fn recognize(
        &self,
        frame: &CapturedFrame,
        language_hint: &str,
        on_progress: ProgressCallback,
    ) -> Result<String, CaptureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_digests.lock().push(frame.digest().to_string());
        self.seen_languages.lock().push(language_hint.to_string());

        on_progress(&RecognitionProgress::new("recognizing text", 0.0));
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        on_progress(&RecognitionProgress::new("recognizing text", 1.0));

        self.response.lock().clone()
    }
}

/// Surface remembering which device is attached.
#[derive(Default)]
pub(crate) struct RecordingSurface {
    attached: Mutex<Option<String>>,
    attach_count: AtomicUsize,
}

impl RecordingSurface {
    pub fn attached(&self) -> Option<String> {
        self.attached.lock().clone()
    }

    pub fn attach_count(&self) -> usize {
        self.attach_count.load(Ordering::SeqCst)
    }
}

impl PreviewSurface for RecordingSurface {
    fn attach(&self, stream: &dyn MediaStream) {
        self.attach_count.fetch_add(1, Ordering::SeqCst);
        *self.attached.lock() = Some(stream.device_id().to_string());
    }

    fn detach(&self) {
        *self.attached.lock() = None;
    }
}

#[derive(Default)]
pub(crate) struct RecordingDelegate {
    phases: Mutex<Vec<SessionPhase>>,
    notices: Mutex<Vec<Notice>>,
    progress: AtomicUsize,
    finished: Mutex<Vec<RecognitionResult>>,
    captured: AtomicUsize,
}

impl RecordingDelegate {
    pub fn phases(&self) -> Vec<SessionPhase> {
        self.phases.lock().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn progress_reports(&self) -> usize {
        self.progress.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> Vec<RecognitionResult> {
        self.finished.lock().clone()
    }

    pub fn captured(&self) -> usize {
        self.captured.load(Ordering::SeqCst)
    }
}

impl SessionDelegate for RecordingDelegate {
    fn on_phase_changed(&self, phase: SessionPhase) {
        self.phases.lock().push(phase);
    }

    fn on_notice(&self, notice: &Notice) {
        self.notices.lock().push(notice.clone());
    }

    fn on_frame_captured(&self, _frame: &CapturedFrame) {
        self.captured.fetch_add(1, Ordering::SeqCst);
    }

    fn on_recognition_progress(&self, _progress: &RecognitionProgress) {
        self.progress.fetch_add(1, Ordering::SeqCst);
    }

    fn on_recognition_finished(&self, result: &RecognitionResult) {
        self.finished.lock().push(result.clone());
    }
}
