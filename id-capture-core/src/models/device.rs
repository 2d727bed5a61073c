use serde::{Deserialize, Serialize};

/// Kind of media device reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaDeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

/// Raw device entry as enumerated by a `MediaDeviceProvider`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDeviceInfo {
    pub id: String,
    pub label: String,
    pub kind: MediaDeviceKind,
}

/// A capture device the user can pick.
///
/// `id` is stable within a session. Before permission is granted the platform
/// may report an empty `id` and `label`; that is expected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: String,
    pub label: String,
}

impl From<MediaDeviceInfo> for DeviceDescriptor {
    fn from(info: MediaDeviceInfo) -> Self {
        Self {
            id: info.id,
            label: info.label,
        }
    }
}

/// Which device a stream request should open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamConstraints {
    /// Any video input; used for the permission probe.
    AnyVideo,
    /// Exactly the device with this id.
    ExactDevice(String),
}
