//! Capture device enumeration and selection policy.

use std::collections::HashSet;
use std::sync::Arc;

use crate::models::device::{DeviceDescriptor, MediaDeviceKind};
use crate::models::error::CaptureError;
use crate::models::state::PermissionState;
use crate::traits::media_provider::MediaDeviceProvider;

/// Result of one catalog refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRefresh {
    pub devices: Vec<DeviceDescriptor>,
    pub selected: Option<String>,
}

pub struct DeviceCatalog<P: MediaDeviceProvider> {
    provider: Arc<P>,
}

impl<P: MediaDeviceProvider> DeviceCatalog<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Re-enumerate video inputs and resolve the selection against them.
    ///
    /// Labels are only reliable once access is granted, so any other
    /// permission state is refused with `PermissionDenied`.
    pub async fn refresh(
        &self,
        permission: PermissionState,
        current: Option<&str>,
    ) -> Result<CatalogRefresh, CaptureError> {
        if !permission.is_granted() {
            return Err(CaptureError::PermissionDenied);
        }

        let infos = self
            .provider
            .enumerate_devices()
            .await
            .map_err(|e| match e {
                CaptureError::PermissionDenied => CaptureError::PermissionDenied,
                other => CaptureError::DeviceUnavailable(format!("enumeration failed: {}", other)),
            })?;

        let mut seen = HashSet::new();
        let devices: Vec<DeviceDescriptor> = infos
            .into_iter()
            .filter(|info| info.kind == MediaDeviceKind::VideoInput)
            .filter(|info| seen.insert(info.id.clone()))
            .map(DeviceDescriptor::from)
            .collect();

        let selected = resolve_selection(&devices, current);
        log::debug!(
            "catalog refreshed: {} video input(s), selected {:?}",
            devices.len(),
            selected
        );

        Ok(CatalogRefresh { devices, selected })
    }
}

/// Keep `current` if it is still listed, otherwise fall back to the first
/// device (or none when the list is empty).
pub fn resolve_selection(devices: &[DeviceDescriptor], current: Option<&str>) -> Option<String> {
    if let Some(id) = current {
        if devices.iter().any(|d| d.id == id) {
            return Some(id.to_string());
        }
        log::info!("selected device {} disappeared, falling back", id);
    }
    devices.first().map(|d| d.id.clone())
}
