use std::sync::Arc;

use parking_lot::Mutex;

use crate::access::device_catalog::DeviceCatalog;
use crate::access::permission_gate::PermissionGate;
use crate::models::config::SessionConfiguration;
use crate::models::device::DeviceDescriptor;
use crate::models::error::CaptureError;
use crate::models::frame::CapturedFrame;
use crate::models::notice::{Notice, NoticeKind};
use crate::models::state::{
    CommandOutcome, PermissionState, RecognitionResult, RecognitionStatus, SessionPhase,
    StreamState,
};
use crate::processing::still_encoder::StillEncoder;
use crate::recognition::pipeline::RecognitionPipeline;
use crate::session::capture::{CaptureSession, StartOutcome};
use crate::session::context::{SessionContext, SessionSnapshot};
use crate::traits::media_provider::MediaDeviceProvider;
use crate::traits::preview_surface::{DetachedSurface, PreviewSurface};
use crate::traits::recognition_engine::{ProgressCallback, RecognitionEngine, RecognitionProgress};
use crate::traits::session_delegate::{NoopDelegate, SessionDelegate};

/// Delegate notifications collected under the context lock and delivered
/// after it is released.
enum SessionEvent {
    PhaseChanged(SessionPhase),
    Notice(Notice),
    FrameCaptured(CapturedFrame),
    RecognitionFinished(RecognitionResult),
}

struct Transition<'a> {
    ctx: &'a mut SessionContext,
    events: Vec<SessionEvent>,
    stop_stream: bool,
}

impl Transition<'_> {
    fn enter(&mut self, phase: SessionPhase) {
        if self.ctx.phase != phase {
            log::info!("session phase {:?} -> {:?}", self.ctx.phase, phase);
            self.ctx.phase = phase;
            self.events.push(SessionEvent::PhaseChanged(phase));
        }
    }

    fn notify(&mut self, notice: Notice) {
        log::info!("notice {:?}: {}", notice.kind, notice.message);
        self.ctx.notice = Some(notice.clone());
        self.events.push(SessionEvent::Notice(notice));
    }

    /// Stop the live stream once the context lock is released.
    fn stop_stream(&mut self) {
        self.stop_stream = true;
    }

    fn deny(&mut self, notice: Notice) {
        self.ctx.permission = PermissionState::Denied;
        self.enter(SessionPhase::PermissionDenied);
        self.notify(notice);
    }
}

/// Capture-and-recognition state machine.
///
/// Ties the permission gate, device catalog, capture session and recognition
/// pipeline together:
/// ```text
/// [PermissionGate] → [DeviceCatalog] → [CaptureSession] → still → [RecognitionPipeline] → text
/// ```
///
/// Commands take `&self` and may be interleaved on one task. Each step
/// completes by explicitly invoking the next one; the context lock is never
/// held across a suspension point. Commands issued in a phase that does not
/// accept them return `CommandOutcome::Ignored` and change nothing.
pub struct SessionOrchestrator<P: MediaDeviceProvider, E: RecognitionEngine> {
    config: SessionConfiguration,
    gate: PermissionGate<P>,
    catalog: DeviceCatalog<P>,
    capture: CaptureSession<P>,
    pipeline: RecognitionPipeline<E>,
    context: Mutex<SessionContext>,
    delegate: Arc<dyn SessionDelegate>,
}

impl<P: MediaDeviceProvider, E: RecognitionEngine> SessionOrchestrator<P, E> {
    pub fn new(
        provider: Arc<P>,
        engine: Arc<E>,
        config: SessionConfiguration,
    ) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;

        Ok(Self {
            gate: PermissionGate::new(Arc::clone(&provider)),
            catalog: DeviceCatalog::new(Arc::clone(&provider)),
            capture: CaptureSession::new(
                provider,
                Arc::new(DetachedSurface),
                StillEncoder::new(config.still_format),
            ),
            pipeline: RecognitionPipeline::new(engine, config.language_hint.clone()),
            context: Mutex::new(SessionContext::new()),
            delegate: Arc::new(NoopDelegate),
            config,
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn SessionDelegate>) {
        self.delegate = delegate;
    }

    /// Surface the live stream is attached to. Must not call back into the
    /// orchestrator from `attach`/`detach`.
    pub fn set_preview_surface(&mut self, surface: Arc<dyn PreviewSurface>) {
        self.capture.set_surface(surface);
    }

    pub fn config(&self) -> &SessionConfiguration {
        &self.config
    }

    // --- Observable state ---

    pub fn phase(&self) -> SessionPhase {
        self.context.lock().phase
    }

    pub fn permission(&self) -> PermissionState {
        self.context.lock().permission
    }

    pub fn devices(&self) -> Vec<DeviceDescriptor> {
        self.context.lock().devices.clone()
    }

    pub fn selected_device_id(&self) -> Option<String> {
        self.context.lock().selected_device_id.clone()
    }

    pub fn captured_frame(&self) -> Option<CapturedFrame> {
        self.context.lock().frame.clone()
    }

    pub fn recognition(&self) -> RecognitionResult {
        self.context.lock().recognition.clone()
    }

    /// Recognized text, or the fallback text after a failed recognition.
    pub fn recognized_text(&self) -> Option<String> {
        self.context.lock().recognition.text.clone()
    }

    pub fn last_notice(&self) -> Option<Notice> {
        self.context.lock().notice.clone()
    }

    pub fn stream_state(&self) -> StreamState {
        self.capture.state()
    }

    pub fn is_previewing(&self) -> bool {
        self.capture.is_live()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let stream_state = self.capture.state();
        let preview_live = self.capture.is_live();
        self.context.lock().snapshot(stream_state, preview_live)
    }

    // --- Commands ---

    /// Run the permission → catalog → preview flow from `Idle`.
    pub async fn begin(&self) -> CommandOutcome {
        let epoch = self.update(|t| {
            if t.ctx.phase != SessionPhase::Idle {
                return None;
            }
            t.enter(SessionPhase::CheckingPermission);
            Some(t.ctx.epoch)
        });
        let Some(epoch) = epoch else {
            log::debug!("begin ignored: session already started");
            return CommandOutcome::Ignored;
        };

        self.establish_preview(epoch).await;
        CommandOutcome::Applied
    }

    /// Switch the preview to `device_id`.
    ///
    /// Honored only while selecting a device or previewing, and not while a
    /// still is being taken. A pick issued while an earlier one is still
    /// starting supersedes it.
    pub async fn select_device(&self, device_id: &str) -> CommandOutcome {
        let epoch = self.update(|t| {
            if !t.ctx.phase.accepts_device_selection() || t.ctx.capturing {
                return None;
            }
            if !t.ctx.devices.iter().any(|d| d.id == device_id) {
                log::warn!("device {} is not in the catalog", device_id);
                t.notify(self.notice(NoticeKind::DeviceUnavailable));
                return None;
            }
            if t.ctx.phase == SessionPhase::Previewing
                && t.ctx.selected_device_id.as_deref() == Some(device_id)
            {
                return None;
            }
            t.ctx.selected_device_id = Some(device_id.to_string());
            Some(t.ctx.epoch)
        });
        let Some(epoch) = epoch else {
            return CommandOutcome::Ignored;
        };

        self.start_device(epoch, device_id.to_string()).await;
        CommandOutcome::Applied
    }

    /// Take a still from the live preview. Ends the preview on success.
    ///
    /// The phase stays `Previewing` while the still is encoded; a second
    /// capture or a device switch in that window is ignored.
    pub async fn capture(&self) -> CommandOutcome {
        let epoch = self.update(|t| {
            if t.ctx.phase != SessionPhase::Previewing || t.ctx.capturing {
                return None;
            }
            t.ctx.capturing = true;
            Some(t.ctx.epoch)
        });
        let Some(epoch) = epoch else {
            return CommandOutcome::Ignored;
        };

        let outcome = self.capture.capture_still().await;

        let applied = self.update_if_current(epoch, |t| {
            t.ctx.capturing = false;
            match outcome {
                Ok(frame) => {
                    t.ctx.recognition = RecognitionResult::for_frame(frame.id());
                    t.ctx.frame = Some(frame.clone());
                    t.events.push(SessionEvent::FrameCaptured(frame));
                    t.enter(SessionPhase::Captured);
                }
                Err(CaptureError::NoActiveStream) => {
                    log::error!("previewing without a live stream, back to device selection");
                    t.enter(SessionPhase::SelectingDevice);
                }
                Err(e @ CaptureError::EncodingFailed(_)) => {
                    log::warn!("still capture failed: {}", e);
                    t.notify(self.notice(NoticeKind::CaptureFailed));
                }
                Err(e) => {
                    log::warn!("still capture lost the device: {}", e);
                    t.stop_stream();
                    t.enter(SessionPhase::SelectingDevice);
                    t.notify(self.notice(NoticeKind::DeviceUnavailable));
                }
            }
        });
        if applied.is_none() {
            log::debug!("session restarted while capturing, dropping the still");
        }
        CommandOutcome::Applied
    }

    /// Recognize text on the captured frame.
    ///
    /// Ignored while a recognition is already running: at most one request
    /// is in flight per frame, and it always runs to completion.
    pub async fn recognize(&self) -> CommandOutcome {
        let request = self.update(|t| {
            if t.ctx.phase == SessionPhase::Recognizing {
                log::debug!("recognition already in flight, ignoring");
                return None;
            }
            if !t.ctx.phase.accepts_recognition() {
                return None;
            }
            let Some(frame) = t.ctx.frame.clone() else {
                log::error!("{:?} without a captured frame", t.ctx.phase);
                return None;
            };
            t.ctx.recognition = RecognitionResult {
                status: RecognitionStatus::Running,
                text: None,
                frame_id: Some(frame.id().to_string()),
            };
            t.enter(SessionPhase::Recognizing);
            Some((frame, t.ctx.epoch))
        });
        let Some((frame, epoch)) = request else {
            return CommandOutcome::Ignored;
        };

        let delegate = Arc::clone(&self.delegate);
        let on_progress: ProgressCallback =
            Arc::new(move |p: &RecognitionProgress| delegate.on_recognition_progress(p));
        let outcome = self.pipeline.recognize(&frame, on_progress).await;

        let delivered = self.update_if_current(epoch, |t| {
            if t.ctx.frame.as_ref().map(CapturedFrame::id) != Some(frame.id()) {
                return false;
            }
            let frame_id = Some(frame.id().to_string());
            match outcome {
                Ok(text) => {
                    t.ctx.recognition = RecognitionResult {
                        status: RecognitionStatus::Succeeded,
                        text: Some(text),
                        frame_id,
                    };
                    t.enter(SessionPhase::Recognized);
                }
                Err(e) => {
                    log::warn!("{}", e);
                    t.ctx.recognition = RecognitionResult {
                        status: RecognitionStatus::Failed,
                        text: Some(self.config.recognition_fallback_text.clone()),
                        frame_id,
                    };
                    t.enter(SessionPhase::RecognitionFailed);
                    t.notify(self.notice(NoticeKind::RecognitionFailed));
                }
            }
            t.events
                .push(SessionEvent::RecognitionFinished(t.ctx.recognition.clone()));
            true
        });
        if delivered != Some(true) {
            log::debug!("discarding recognition result for frame {}", frame.id());
        }
        CommandOutcome::Applied
    }

    /// Discard the captured frame and its result, then go back to a live
    /// preview, re-checking permission and restarting the stream.
    pub async fn retake(&self) -> CommandOutcome {
        let epoch = self.update(|t| {
            if !t.ctx.phase.accepts_retake() {
                return None;
            }
            t.ctx.frame = None;
            t.ctx.recognition = RecognitionResult::idle();
            t.ctx.epoch += 1;
            t.enter(SessionPhase::CheckingPermission);
            Some(t.ctx.epoch)
        });
        let Some(epoch) = epoch else {
            return CommandOutcome::Ignored;
        };

        self.capture.stop();
        self.establish_preview(epoch).await;
        CommandOutcome::Applied
    }

    /// Re-enumerate devices, e.g. after a camera was plugged or unplugged.
    ///
    /// While selecting or previewing, a selection that moved restarts the
    /// stream on the new device; an empty catalog stops it. While a still is
    /// being taken only the catalog is updated.
    pub async fn refresh_devices(&self) -> CommandOutcome {
        let request = self.update(|t| {
            if !t.ctx.permission.is_granted()
                || matches!(
                    t.ctx.phase,
                    SessionPhase::Idle
                        | SessionPhase::CheckingPermission
                        | SessionPhase::PermissionDenied
                )
            {
                return None;
            }
            Some((t.ctx.epoch, t.ctx.permission, t.ctx.selected_device_id.clone()))
        });
        let Some((epoch, permission, previous)) = request else {
            return CommandOutcome::Ignored;
        };

        let refreshed = self.catalog.refresh(permission, previous.as_deref()).await;

        let restart = self
            .update_if_current(epoch, |t| {
                let refresh = match refreshed {
                    Ok(refresh) => refresh,
                    Err(CaptureError::PermissionDenied) => {
                        t.stop_stream();
                        t.deny(self.notice(NoticeKind::PermissionDenied));
                        return None;
                    }
                    Err(e) => {
                        log::warn!("device refresh failed: {}", e);
                        t.notify(self.notice(NoticeKind::DeviceUnavailable));
                        return None;
                    }
                };
                t.ctx.devices = refresh.devices;
                t.ctx.selected_device_id = refresh.selected.clone();

                if !t.ctx.phase.accepts_device_selection() || t.ctx.capturing {
                    return None;
                }
                match refresh.selected {
                    None => {
                        t.stop_stream();
                        t.enter(SessionPhase::SelectingDevice);
                        t.notify(self.notice(NoticeKind::DeviceUnavailable));
                        None
                    }
                    Some(id) => {
                        let unchanged = previous.as_deref() == Some(id.as_str());
                        let running = matches!(
                            self.capture.state(),
                            StreamState::Starting | StreamState::Live
                        );
                        if unchanged && running {
                            None
                        } else {
                            Some(id)
                        }
                    }
                }
            })
            .flatten();

        if let Some(id) = restart {
            self.start_device(epoch, id).await;
        }
        CommandOutcome::Applied
    }

    /// Application-level restart: stop everything, forget all state and run
    /// the permission flow again. The only command honored after a denial.
    pub async fn reset(&self) -> CommandOutcome {
        let epoch = self.update(|t| {
            let epoch = t.ctx.epoch + 1;
            log::info!("session reset from {:?}", t.ctx.phase);
            *t.ctx = SessionContext {
                epoch,
                ..SessionContext::new()
            };
            t.enter(SessionPhase::CheckingPermission);
            epoch
        });

        self.capture.stop();
        self.establish_preview(epoch).await;
        CommandOutcome::Applied
    }

    // --- Internal steps ---

    /// CheckingPermission → PermissionDenied | SelectingDevice → Previewing.
    async fn establish_preview(&self, epoch: u64) {
        let permission = self
            .gate
            .check_or_request(|| {
                self.update_if_current(epoch, |t| {
                    t.ctx.permission = PermissionState::Prompting;
                });
            })
            .await;

        let granted = self.update_if_current(epoch, |t| {
            if !permission.is_granted() {
                t.deny(self.notice(NoticeKind::PermissionDenied));
                return false;
            }
            t.ctx.permission = permission;
            t.enter(SessionPhase::SelectingDevice);
            true
        });

        if granted == Some(true) {
            self.refresh_and_start(epoch).await;
        }
    }

    async fn refresh_and_start(&self, epoch: u64) {
        let Some((permission, current)) = self.update_if_current(epoch, |t| {
            (t.ctx.permission, t.ctx.selected_device_id.clone())
        }) else {
            return;
        };

        let refreshed = self.catalog.refresh(permission, current.as_deref()).await;

        let target = self
            .update_if_current(epoch, |t| match refreshed {
                Ok(refresh) => {
                    t.ctx.devices = refresh.devices;
                    t.ctx.selected_device_id = refresh.selected.clone();
                    if refresh.selected.is_none() {
                        log::warn!("no video input available");
                        t.notify(self.notice(NoticeKind::DeviceUnavailable));
                    }
                    refresh.selected
                }
                Err(CaptureError::PermissionDenied) => {
                    t.deny(self.notice(NoticeKind::PermissionDenied));
                    None
                }
                Err(e) => {
                    log::warn!("device catalog unavailable: {}", e);
                    t.notify(self.notice(NoticeKind::DeviceUnavailable));
                    None
                }
            })
            .flatten();

        if let Some(device_id) = target {
            self.start_device(epoch, device_id).await;
        }
    }

    async fn start_device(&self, epoch: u64, device_id: String) {
        self.update_if_current(epoch, |t| t.enter(SessionPhase::SelectingDevice));

        let outcome = self.capture.start(&device_id).await;

        self.update_if_current(epoch, |t| match outcome {
            Ok(StartOutcome::Live) => {
                if t.ctx.phase.accepts_device_selection() {
                    t.enter(SessionPhase::Previewing);
                } else {
                    log::warn!("stream on {} went live in {:?}, stopping", device_id, t.ctx.phase);
                    t.stop_stream();
                }
            }
            Ok(StartOutcome::Superseded) => {
                log::debug!("start on {} superseded", device_id);
            }
            Err(CaptureError::PermissionDenied) => {
                t.deny(self.notice(NoticeKind::PermissionDenied));
            }
            Err(e) => {
                log::warn!("{}", e);
                t.enter(SessionPhase::SelectingDevice);
                t.notify(self.notice(NoticeKind::DeviceUnavailable));
            }
        });
    }

    fn notice(&self, kind: NoticeKind) -> Notice {
        let message = match kind {
            NoticeKind::PermissionDenied => &self.config.permission_denied_message,
            NoticeKind::DeviceUnavailable => &self.config.device_unavailable_message,
            NoticeKind::CaptureFailed => &self.config.capture_failed_message,
            NoticeKind::RecognitionFailed => &self.config.recognition_fallback_text,
        };
        Notice::new(kind, message.clone())
    }

    fn update<R>(&self, f: impl FnOnce(&mut Transition<'_>) -> R) -> R {
        let (result, events, stop_stream) = {
            let mut ctx = self.context.lock();
            let mut transition = Transition {
                ctx: &mut *ctx,
                events: Vec::new(),
                stop_stream: false,
            };
            let result = f(&mut transition);
            (result, transition.events, transition.stop_stream)
        };
        if stop_stream {
            self.capture.stop();
        }
        self.dispatch(events);
        result
    }

    /// Like `update`, but skipped (returning `None`) when a retake or reset
    /// has started a new epoch since `epoch` was read.
    fn update_if_current<R>(
        &self,
        epoch: u64,
        f: impl FnOnce(&mut Transition<'_>) -> R,
    ) -> Option<R> {
        self.update(|t| {
            if t.ctx.epoch != epoch {
                return None;
            }
            Some(f(t))
        })
    }

    fn dispatch(&self, events: Vec<SessionEvent>) {
        for event in events {
            match event {
                SessionEvent::PhaseChanged(phase) => self.delegate.on_phase_changed(phase),
                SessionEvent::Notice(notice) => self.delegate.on_notice(&notice),
                SessionEvent::FrameCaptured(frame) => self.delegate.on_frame_captured(&frame),
                SessionEvent::RecognitionFinished(result) => {
                    self.delegate.on_recognition_finished(&result)
                }
            }
        }
    }
}
