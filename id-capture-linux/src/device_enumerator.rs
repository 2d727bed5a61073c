//! V4L2 camera enumeration.
//!
//! Lists `/dev/video*` nodes through `v4l` and keeps only those that can
//! capture video; metadata and output nodes of the same camera are skipped.

use std::io;

use v4l::capability::Flags;
use v4l::prelude::*;

use id_capture_core::models::device::{MediaDeviceInfo, MediaDeviceKind};
use id_capture_core::models::error::CaptureError;

/// V4L2 device enumerator.
pub struct DeviceEnumerator;

impl DeviceEnumerator {
    /// List capture-capable video devices, ordered by node index.
    ///
    /// Nodes that cannot be queried are skipped. Fails with
    /// `PermissionDenied` only when every node refused access.
    pub fn list_video_inputs() -> Result<Vec<MediaDeviceInfo>, CaptureError> {
        let mut nodes = v4l::context::enum_devices();
        nodes.sort_by_key(|node| node.index());

        let mut devices = Vec::new();
        let mut denied = 0;

        for node in &nodes {
            let path = node.path().to_string_lossy().to_string();
            let caps = match Device::with_path(node.path()).and_then(|dev| dev.query_caps()) {
                Ok(caps) => caps,
                Err(e) => {
                    if e.kind() == io::ErrorKind::PermissionDenied {
                        denied += 1;
                    }
                    log::debug!("skipping {}: {}", path, e);
                    continue;
                }
            };

            if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
                log::debug!("skipping {}: no video capture capability", path);
                continue;
            }

            let label = Self::label_for(&caps.card, node.name(), &path);
            devices.push(MediaDeviceInfo {
                id: path,
                label,
                kind: MediaDeviceKind::VideoInput,
            });
        }

        if devices.is_empty() && denied > 0 && denied == nodes.len() {
            return Err(CaptureError::PermissionDenied);
        }

        log::debug!("found {} video input(s)", devices.len());
        Ok(devices)
    }

    fn label_for(card: &str, node_name: Option<String>, path: &str) -> String {
        let card = card.trim();
        if !card.is_empty() {
            return card.to_string();
        }
        node_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| path.to_string())
    }
}
