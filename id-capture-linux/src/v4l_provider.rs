//! `MediaDeviceProvider` backed by V4L2.

use async_trait::async_trait;

use id_capture_core::models::device::{MediaDeviceInfo, StreamConstraints};
use id_capture_core::models::error::CaptureError;
use id_capture_core::models::state::PermissionQuery;
use id_capture_core::traits::media_provider::{MediaDeviceProvider, MediaStream};

use crate::device_enumerator::DeviceEnumerator;
use crate::permissions;
use crate::v4l_capture::V4lStream;

/// Camera access through `/dev/video*` nodes.
///
/// Device ids are node paths. Blocking ioctls run on tokio's blocking pool.
#[derive(Debug, Default)]
pub struct V4lDeviceProvider;

impl V4lDeviceProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaDeviceProvider for V4lDeviceProvider {
    async fn query_permission(&self) -> PermissionQuery {
        match tokio::task::spawn_blocking(permissions::check_camera_permission).await {
            Ok(query) => query,
            Err(e) => {
                log::warn!("permission probe task failed: {}", e);
                PermissionQuery::Unsupported
            }
        }
    }

    async fn request_access(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, CaptureError> {
        let path = match constraints {
            StreamConstraints::ExactDevice(path) => path.clone(),
            StreamConstraints::AnyVideo => self
                .enumerate_devices()
                .await?
                .into_iter()
                .next()
                .map(|device| device.id)
                .ok_or_else(|| CaptureError::DeviceUnavailable("no video input found".into()))?,
        };

        let stream = V4lStream::open(&path).await?;
        Ok(Box::new(stream))
    }

    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, CaptureError> {
        tokio::task::spawn_blocking(DeviceEnumerator::list_video_inputs)
            .await
            .map_err(|e| CaptureError::Unknown(format!("enumeration task failed: {}", e)))?
    }
}
