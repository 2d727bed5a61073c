use thiserror::Error;

/// Errors produced by the capture components and their platform providers.
///
/// Provider and engine failures are converted into one of these kinds at the
/// component boundary. None of them is fatal: the orchestrator turns each one
/// into a well-defined state plus, where the user needs to know, a notice.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("device not available: {0}")]
    DeviceUnavailable(String),

    #[error("no active stream")]
    NoActiveStream,

    #[error("recognition failed: {0}")]
    RecognitionFailed(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}
