//! Camera permission acquisition.
//!
//! Asks the provider for the current grant without prompting first. Only
//! when that answer is indeterminate does it open a probe stream, which
//! may show the platform prompt. The probe is released immediately so it
//! never holds the device while the real stream starts.

use std::sync::Arc;

use crate::models::device::StreamConstraints;
use crate::models::error::CaptureError;
use crate::models::state::{PermissionQuery, PermissionState};
use crate::traits::media_provider::MediaDeviceProvider;

pub struct PermissionGate<P: MediaDeviceProvider> {
    provider: Arc<P>,
}

impl<P: MediaDeviceProvider> PermissionGate<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Resolve camera access to `Granted` or `Denied`.
    ///
    /// `on_prompt` runs right before an active request is issued, so the
    /// caller can expose `PermissionState::Prompting` while the user decides.
    pub async fn check_or_request(&self, on_prompt: impl FnOnce()) -> PermissionState {
        match self.provider.query_permission().await {
            PermissionQuery::Granted => {
                log::info!("camera permission already granted");
                PermissionState::Granted
            }
            PermissionQuery::Denied => {
                log::info!("camera permission denied by platform query");
                PermissionState::Denied
            }
            query @ (PermissionQuery::Prompt | PermissionQuery::Unsupported) => {
                log::debug!("permission query indeterminate ({:?}), requesting access", query);
                on_prompt();
                self.request().await
            }
        }
    }

    async fn request(&self) -> PermissionState {
        match self.provider.request_access(&StreamConstraints::AnyVideo).await {
            Ok(mut probe) => {
                log::debug!("releasing permission probe stream on {}", probe.device_id());
                probe.stop();
                PermissionState::Granted
            }
            Err(CaptureError::PermissionDenied) => {
                log::info!("camera permission declined");
                PermissionState::Denied
            }
            Err(e) => {
                log::warn!("camera access request failed, treating as denied: {}", e);
                PermissionState::Denied
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeProvider;

    #[tokio::test]
    async fn granted_query_does_not_open_a_stream() {
        let provider = Arc::new(FakeProvider::with_devices(&["cam-a"]));
        let gate = PermissionGate::new(Arc::clone(&provider));
        let mut prompted = false;

        let state = gate.check_or_request(|| prompted = true).await;

        assert_eq!(state, PermissionState::Granted);
        assert!(!prompted);
        assert!(provider.opened().is_empty());
    }

    #[tokio::test]
    async fn denied_query_is_final() {
        let provider = Arc::new(FakeProvider::with_devices(&["cam-a"]));
        provider.set_permission(PermissionQuery::Denied);
        let gate = PermissionGate::new(Arc::clone(&provider));

        assert_eq!(gate.check_or_request(|| {}).await, PermissionState::Denied);
        assert!(provider.opened().is_empty());
    }

    #[tokio::test]
    async fn indeterminate_query_probes_and_releases() {
        let provider = Arc::new(FakeProvider::with_devices(&["cam-a"]));
        provider.set_permission(PermissionQuery::Prompt);
        let gate = PermissionGate::new(Arc::clone(&provider));
        let mut prompted = false;

        let state = gate.check_or_request(|| prompted = true).await;

        assert_eq!(state, PermissionState::Granted);
        assert!(prompted);
        assert_eq!(provider.opened(), vec![FakeProvider::PROBE_ID.to_string()]);
        assert_eq!(provider.live_count(), 0);
    }

    #[tokio::test]
    async fn declined_prompt_is_denied() {
        let provider = Arc::new(FakeProvider::with_devices(&["cam-a"]));
        provider.set_permission(PermissionQuery::Unsupported);
        provider.decline_requests();
        let gate = PermissionGate::new(Arc::clone(&provider));

        assert_eq!(gate.check_or_request(|| {}).await, PermissionState::Denied);
        assert_eq!(provider.live_count(), 0);
    }

    #[tokio::test]
    async fn missing_hardware_is_treated_as_denied() {
        let provider = Arc::new(FakeProvider::with_devices(&[]));
        provider.set_permission(PermissionQuery::Prompt);
        let gate = PermissionGate::new(provider);

        assert_eq!(gate.check_or_request(|| {}).await, PermissionState::Denied);
    }
}
