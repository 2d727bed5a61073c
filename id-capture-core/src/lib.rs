//! # id-capture-core
//!
//! Platform-agnostic identity-document capture core library.
//!
//! Provides camera permission handling, device cataloguing, the live capture
//! session, still encoding and recognition orchestration. Platform-specific
//! backends (Linux V4L2, Tesseract) implement the `MediaDeviceProvider` and
//! `RecognitionEngine` traits and plug into the generic `SessionOrchestrator`.
//!
//! ## Architecture
//!
//! ```text
//! id-capture-core (this crate)
//! ├── traits/       ← MediaDeviceProvider, MediaStream, RecognitionEngine, SessionDelegate, PreviewSurface
//! ├── models/       ← CaptureError, SessionPhase, SessionConfiguration, CapturedFrame, Notice, etc.
//! ├── access/       ← PermissionGate, DeviceCatalog
//! ├── processing/   ← StillEncoder (PNG/JPEG)
//! ├── recognition/  ← RecognitionPipeline
//! └── session/      ← CaptureSession, SessionOrchestrator (generic state machine)
//! ```

pub mod access;
pub mod models;
pub mod processing;
pub mod recognition;
pub mod session;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types at crate root for convenience.
pub use access::device_catalog::{CatalogRefresh, DeviceCatalog};
pub use access::permission_gate::PermissionGate;
pub use models::config::SessionConfiguration;
pub use models::device::{DeviceDescriptor, MediaDeviceInfo, MediaDeviceKind, StreamConstraints};
pub use models::error::CaptureError;
pub use models::frame::{CapturedFrame, FrameInfo, RawFrame, StillFormat};
pub use models::notice::{Notice, NoticeKind};
pub use models::state::{
    CommandOutcome, PermissionQuery, PermissionState, RecognitionResult, RecognitionStatus,
    SessionPhase, StreamState,
};
pub use processing::still_encoder::StillEncoder;
pub use recognition::pipeline::RecognitionPipeline;
pub use session::capture::{CaptureSession, StartOutcome};
pub use session::context::SessionSnapshot;
pub use session::orchestrator::SessionOrchestrator;
pub use traits::media_provider::{MediaDeviceProvider, MediaStream};
pub use traits::preview_surface::{DetachedSurface, PreviewSurface};
pub use traits::recognition_engine::{ProgressCallback, RecognitionEngine, RecognitionProgress};
pub use traits::session_delegate::{NoopDelegate, SessionDelegate};
