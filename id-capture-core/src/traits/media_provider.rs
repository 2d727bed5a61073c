use async_trait::async_trait;

use crate::models::device::{MediaDeviceInfo, StreamConstraints};
use crate::models::error::CaptureError;
use crate::models::frame::RawFrame;
use crate::models::state::PermissionQuery;

/// A live video stream handed out by a `MediaDeviceProvider`.
///
/// Holding one keeps the underlying hardware locked until `stop` is called.
pub trait MediaStream: Send + Sync {
    /// Id of the device backing this stream.
    fn device_id(&self) -> &str;

    /// Begin delivering frames.
    fn play(&mut self) -> Result<(), CaptureError>;

    /// Copy of the most recently decoded frame. A stream that is running but
    /// has not decoded its first frame yet returns an empty 0×0 frame.
    fn current_frame(&self) -> Result<RawFrame, CaptureError>;

    /// Stop every track of the stream. Safe to call more than once.
    fn stop(&mut self);

    /// Playing and still delivering frames.
    fn is_live(&self) -> bool;
}

/// Interface for platform media capture backends.
///
/// Implemented by:
/// - `V4lDeviceProvider` (Linux)
#[async_trait]
pub trait MediaDeviceProvider: Send + Sync {
    /// Non-intrusive permission query. Must not prompt the user.
    async fn query_permission(&self) -> PermissionQuery;

    /// Open a stream matching `constraints`. May prompt the user for access.
    async fn request_access(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, CaptureError>;

    /// List media devices in the order the platform reports them.
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, CaptureError>;
}
