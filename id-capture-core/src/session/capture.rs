use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::device::StreamConstraints;
use crate::models::error::CaptureError;
use crate::models::frame::CapturedFrame;
use crate::models::state::StreamState;
use crate::processing::still_encoder::StillEncoder;
use crate::traits::media_provider::{MediaDeviceProvider, MediaStream};
use crate::traits::preview_surface::PreviewSurface;

/// How a `start` call ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The stream is live and attached to the preview surface.
    Live,
    /// A later `start` or `stop` took over while this one was pending; the
    /// stream it produced, if any, was stopped on arrival.
    Superseded,
}

struct StreamSlot {
    state: StreamState,
    active: Option<Box<dyn MediaStream>>,
    /// Bumped by every `start`, `stop` and capture; a pending start whose
    /// generation no longer matches has been superseded.
    generation: u64,
}

/// Owner of the single live stream.
///
/// ```text
/// idle → starting → live → stopped
///           ↓                 ↓
///         idle             starting
/// ```
///
/// At most one stream is held at a time: every `start` releases the previous
/// stream before asking the provider for a new one, and provider opens are
/// serialized so a pending open always resolves before the next one begins.
///
/// Streams are stopped after the slot lock is released; a backend `stop` may
/// block while its capture thread winds down.
pub struct CaptureSession<P: MediaDeviceProvider> {
    provider: Arc<P>,
    surface: Arc<dyn PreviewSurface>,
    encoder: StillEncoder,
    slot: Mutex<StreamSlot>,
    opening: tokio::sync::Mutex<()>,
}

impl<P: MediaDeviceProvider> CaptureSession<P> {
    pub fn new(provider: Arc<P>, surface: Arc<dyn PreviewSurface>, encoder: StillEncoder) -> Self {
        Self {
            provider,
            surface,
            encoder,
            slot: Mutex::new(StreamSlot {
                state: StreamState::Idle,
                active: None,
                generation: 0,
            }),
            opening: tokio::sync::Mutex::new(()),
        }
    }

    pub fn set_surface(&mut self, surface: Arc<dyn PreviewSurface>) {
        self.surface = surface;
    }

    pub fn state(&self) -> StreamState {
        self.slot.lock().state
    }

    pub fn is_live(&self) -> bool {
        let slot = self.slot.lock();
        slot.state == StreamState::Live && slot.active.as_ref().is_some_and(|s| s.is_live())
    }

    /// Device backing the live stream, if any.
    pub fn active_device_id(&self) -> Option<String> {
        self.slot
            .lock()
            .active
            .as_ref()
            .map(|stream| stream.device_id().to_string())
    }

    /// Open `device_id`, attach it to the preview surface and start playback.
    pub async fn start(&self, device_id: &str) -> Result<StartOutcome, CaptureError> {
        let (generation, previous) = {
            let mut slot = self.slot.lock();
            let previous = self.detach(&mut slot);
            slot.generation += 1;
            slot.state = StreamState::Starting;
            (slot.generation, previous)
        };
        Self::halt(previous);
        log::info!("starting stream on {}", device_id);

        // Queue behind any open still in flight; a start superseded while
        // waiting never reaches the provider.
        let _opening = self.opening.lock().await;
        if self.slot.lock().generation != generation {
            log::debug!("start on {} superseded before opening", device_id);
            return Ok(StartOutcome::Superseded);
        }

        let result = self
            .provider
            .request_access(&StreamConstraints::ExactDevice(device_id.to_string()))
            .await;

        let mut slot = self.slot.lock();
        if slot.generation != generation {
            drop(slot);
            if let Ok(stream) = result {
                log::debug!("start on {} superseded, stopping its stream", device_id);
                Self::halt(Some(stream));
            }
            return Ok(StartOutcome::Superseded);
        }

        let mut stream = match result {
            Ok(stream) => stream,
            Err(e) => {
                slot.state = StreamState::Idle;
                log::warn!("failed to start stream on {}: {}", device_id, e);
                return Err(Self::start_error(e));
            }
        };

        if let Err(e) = stream.play() {
            slot.state = StreamState::Idle;
            drop(slot);
            log::warn!("playback failed on {}: {}", device_id, e);
            Self::halt(Some(stream));
            return Err(Self::start_error(e));
        }

        self.surface.attach(stream.as_ref());
        slot.active = Some(stream);
        slot.state = StreamState::Live;
        log::info!("stream live on {}", device_id);
        Ok(StartOutcome::Live)
    }

    /// Stop and detach the live stream. Does nothing when none is active.
    pub fn stop(&self) {
        let previous = {
            let mut slot = self.slot.lock();
            slot.generation += 1;
            self.detach(&mut slot)
        };
        Self::halt(previous);
    }

    /// Take a still from the live stream, then end the live preview.
    ///
    /// Encoding runs on the blocking pool. On `EncodingFailed` the stream is
    /// left running so the user can try again; if the stream was stopped or
    /// replaced while encoding, the still is dropped with `NoActiveStream`.
    pub async fn capture_still(&self) -> Result<CapturedFrame, CaptureError> {
        let (generation, raw) = {
            let slot = self.slot.lock();
            match (slot.state, slot.active.as_ref()) {
                (StreamState::Live, Some(stream)) if stream.is_live() => {
                    let raw = stream.current_frame().map_err(|e| match e {
                        CaptureError::DeviceUnavailable(reason) => {
                            CaptureError::DeviceUnavailable(reason)
                        }
                        other => {
                            CaptureError::DeviceUnavailable(format!("frame read failed: {}", other))
                        }
                    })?;
                    (slot.generation, raw)
                }
                (StreamState::Live, Some(stream)) => {
                    return Err(CaptureError::DeviceUnavailable(format!(
                        "{} stopped delivering frames",
                        stream.device_id()
                    )));
                }
                _ => return Err(CaptureError::NoActiveStream),
            }
        };

        let encoder = self.encoder;
        let frame = tokio::task::spawn_blocking(move || encoder.encode(raw))
            .await
            .map_err(|e| CaptureError::EncodingFailed(format!("encoder task failed: {}", e)))??;

        let previous = {
            let mut slot = self.slot.lock();
            if slot.generation != generation {
                log::debug!("stream changed while encoding, dropping still {}", frame.id());
                return Err(CaptureError::NoActiveStream);
            }
            slot.generation += 1;
            self.detach(&mut slot)
        };
        Self::halt(previous);

        log::info!(
            "captured {}x{} still ({} bytes, sha256 {})",
            frame.width(),
            frame.height(),
            frame.bytes().len(),
            frame.digest()
        );
        Ok(frame)
    }

    /// Take the active stream out of the slot; the caller stops it once the
    /// lock is gone.
    fn detach(&self, slot: &mut StreamSlot) -> Option<Box<dyn MediaStream>> {
        let stream = slot.active.take();
        if stream.is_some() {
            self.surface.detach();
        }
        if matches!(slot.state, StreamState::Starting | StreamState::Live) {
            slot.state = StreamState::Stopped;
        }
        stream
    }

    fn halt(stream: Option<Box<dyn MediaStream>>) {
        if let Some(mut stream) = stream {
            log::debug!("stopping stream on {}", stream.device_id());
            stream.stop();
        }
    }

    fn start_error(error: CaptureError) -> CaptureError {
        match error {
            CaptureError::PermissionDenied => CaptureError::PermissionDenied,
            CaptureError::DeviceUnavailable(reason) => CaptureError::DeviceUnavailable(reason),
            other => CaptureError::DeviceUnavailable(other.to_string()),
        }
    }
}

impl<P: MediaDeviceProvider> Drop for CaptureSession<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::frame::RawFrame;
    use crate::testing::{FakeProvider, RecordingSurface};

    fn session(provider: &Arc<FakeProvider>) -> (CaptureSession<FakeProvider>, Arc<RecordingSurface>) {
        let surface = Arc::new(RecordingSurface::default());
        let session = CaptureSession::new(
            Arc::clone(provider),
            Arc::clone(&surface) as Arc<dyn PreviewSurface>,
            StillEncoder::default(),
        );
        (session, surface)
    }

    #[tokio::test]
    async fn start_attaches_live_stream() {
        let provider = Arc::new(FakeProvider::with_devices(&["a"]));
        let (session, surface) = session(&provider);
        assert_eq!(session.state(), StreamState::Idle);

        assert_eq!(session.start("a").await, Ok(StartOutcome::Live));

        assert_eq!(session.state(), StreamState::Live);
        assert_eq!(session.active_device_id().as_deref(), Some("a"));
        assert_eq!(surface.attached().as_deref(), Some("a"));
        assert_eq!(provider.live_count(), 1);
    }

    #[tokio::test]
    async fn restart_stops_previous_stream_first() {
        let provider = Arc::new(FakeProvider::with_devices(&["a", "b"]));
        let (session, surface) = session(&provider);

        session.start("a").await.unwrap();
        session.start("b").await.unwrap();

        assert_eq!(provider.stopped(), vec!["a".to_string()]);
        assert_eq!(provider.live_count(), 1);
        assert_eq!(provider.peak_live_count(), 1);
        assert_eq!(surface.attached().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn failed_start_returns_to_idle() {
        let provider = Arc::new(FakeProvider::with_devices(&["a"]));
        provider.fail_device("a");
        let (session, _surface) = session(&provider);

        let err = session.start("a").await.unwrap_err();

        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
        assert_eq!(session.state(), StreamState::Idle);
        assert_eq!(provider.live_count(), 0);
    }

    #[tokio::test]
    async fn vanished_device_is_unavailable() {
        let provider = Arc::new(FakeProvider::with_devices(&["a"]));
        let (session, _surface) = session(&provider);

        let err = session.start("gone").await.unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
    }

    #[tokio::test]
    async fn later_start_supersedes_pending_one() {
        let provider = Arc::new(FakeProvider::with_devices(&["a", "b"]));
        let (session, surface) = session(&provider);

        let (first, second) = tokio::join!(session.start("a"), session.start("b"));

        assert_eq!(first, Ok(StartOutcome::Superseded));
        assert_eq!(second, Ok(StartOutcome::Live));
        assert_eq!(provider.live_count(), 1);
        assert_eq!(session.active_device_id().as_deref(), Some("b"));
        assert_eq!(surface.attach_count(), 1);
    }

    #[tokio::test]
    async fn queued_starts_open_one_device_at_a_time() {
        let provider = Arc::new(FakeProvider::with_devices(&["a", "b", "c"]));
        let (session, surface) = session(&provider);

        let (first, second, third) =
            tokio::join!(session.start("a"), session.start("b"), session.start("c"));

        assert_eq!(first, Ok(StartOutcome::Superseded));
        assert_eq!(second, Ok(StartOutcome::Superseded));
        assert_eq!(third, Ok(StartOutcome::Live));
        // "b" was superseded while queued and never reached the provider.
        assert_eq!(provider.opened(), vec!["a".to_string(), "c".to_string()]);
        assert_eq!(provider.peak_live_count(), 1);
        assert_eq!(provider.live_count(), 1);
        assert_eq!(surface.attached().as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn stalled_stream_is_unavailable_for_capture() {
        let provider = Arc::new(FakeProvider::with_devices(&["a"]));
        provider.stall_playback();
        let (session, _surface) = session(&provider);
        session.start("a").await.unwrap();
        assert!(!session.is_live());

        let err = session.capture_still().await.unwrap_err();

        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
    }

    #[tokio::test]
    async fn stop_while_encoding_drops_the_still() {
        let provider = Arc::new(FakeProvider::with_devices(&["a"]));
        provider.set_frame(RawFrame::new(1280, 720, vec![90; 1280 * 720 * 3]));
        let (session, _surface) = session(&provider);
        session.start("a").await.unwrap();

        let (captured, ()) = tokio::join!(session.capture_still(), async { session.stop() });

        assert_eq!(captured, Err(CaptureError::NoActiveStream));
        assert_eq!(provider.live_count(), 0);
        assert_eq!(session.state(), StreamState::Stopped);
    }

    #[tokio::test]
    async fn stop_during_start_discards_the_stream() {
        let provider = Arc::new(FakeProvider::with_devices(&["a"]));
        let (session, _surface) = session(&provider);

        let (outcome, ()) = tokio::join!(session.start("a"), async { session.stop() });

        assert_eq!(outcome, Ok(StartOutcome::Superseded));
        assert_eq!(provider.live_count(), 0);
        assert_eq!(session.state(), StreamState::Stopped);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let provider = Arc::new(FakeProvider::with_devices(&["a"]));
        let (session, surface) = session(&provider);

        session.stop();
        assert_eq!(session.state(), StreamState::Idle);

        session.start("a").await.unwrap();
        session.stop();
        session.stop();

        assert_eq!(session.state(), StreamState::Stopped);
        assert_eq!(provider.stopped(), vec!["a".to_string()]);
        assert_eq!(surface.attached(), None);
    }

    #[tokio::test]
    async fn capture_stops_the_stream() {
        let provider = Arc::new(FakeProvider::with_devices(&["a"]));
        let (session, surface) = session(&provider);
        session.start("a").await.unwrap();

        let frame = session.capture_still().await.unwrap();

        assert_eq!((frame.width(), frame.height()), (4, 2));
        assert_eq!(session.state(), StreamState::Stopped);
        assert!(!session.is_live());
        assert_eq!(session.active_device_id(), None);
        assert_eq!(surface.attached(), None);
        assert_eq!(provider.live_count(), 0);
    }

    #[tokio::test]
    async fn capture_without_stream_fails() {
        let provider = Arc::new(FakeProvider::with_devices(&["a"]));
        let (session, _surface) = session(&provider);

        assert_eq!(session.capture_still().await, Err(CaptureError::NoActiveStream));

        session.start("a").await.unwrap();
        session.capture_still().await.unwrap();
        assert_eq!(session.capture_still().await, Err(CaptureError::NoActiveStream));
    }

    #[tokio::test]
    async fn encoding_failure_keeps_preview_live() {
        let provider = Arc::new(FakeProvider::with_devices(&["a"]));
        provider.set_frame(RawFrame::new(0, 0, Vec::new()));
        let (session, _surface) = session(&provider);
        session.start("a").await.unwrap();

        let err = session.capture_still().await.unwrap_err();

        assert!(matches!(err, CaptureError::EncodingFailed(_)));
        assert!(session.is_live());
    }

    #[tokio::test]
    async fn retake_restarts_after_capture() {
        let provider = Arc::new(FakeProvider::with_devices(&["a"]));
        let (session, _surface) = session(&provider);
        session.start("a").await.unwrap();
        session.capture_still().await.unwrap();

        assert_eq!(session.start("a").await, Ok(StartOutcome::Live));
        assert_eq!(provider.opened(), vec!["a".to_string(), "a".to_string()]);
        assert_eq!(provider.live_count(), 1);
    }

    #[tokio::test]
    async fn drop_releases_hardware() {
        let provider = Arc::new(FakeProvider::with_devices(&["a"]));
        {
            let (session, _surface) = session(&provider);
            session.start("a").await.unwrap();
        }
        assert_eq!(provider.live_count(), 0);
    }
}
