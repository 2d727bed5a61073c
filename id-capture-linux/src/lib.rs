//! # id-capture-linux
//!
//! Linux backend for id-capture.
//!
//! Provides:
//! - `V4lDeviceProvider`: camera permission, enumeration and live streams over V4L2
//! - `V4lStream`: mmap capture thread keeping the latest frame as RGB8
//! - `DeviceEnumerator`: capture-capable `/dev/video*` nodes
//! - `permissions`: `/dev/video*` access check
//! - `TesseractEngine`: text recognition via the `tesseract` CLI
//!
//! ## Platform Requirements
//! - Read/write access to `/dev/video*` (usually membership in the `video` group)
//! - `tesseract` with the language data for the configured hint (e.g. `tesseract-ocr-spa`)
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use id_capture_core::{SessionConfiguration, SessionOrchestrator};
//! use id_capture_linux::{TesseractEngine, V4lDeviceProvider};
//!
//! let session = SessionOrchestrator::new(
//!     Arc::new(V4lDeviceProvider::new()),
//!     Arc::new(TesseractEngine::new()),
//!     SessionConfiguration::default(),
//! )?;
//! session.begin().await;
//! ```

#[cfg(target_os = "linux")]
pub mod device_enumerator;
#[cfg(target_os = "linux")]
pub mod permissions;
pub mod tesseract;
#[cfg(target_os = "linux")]
pub mod v4l_capture;
#[cfg(target_os = "linux")]
pub mod v4l_provider;

#[cfg(target_os = "linux")]
pub use device_enumerator::DeviceEnumerator;
pub use tesseract::TesseractEngine;
#[cfg(target_os = "linux")]
pub use v4l_capture::V4lStream;
#[cfg(target_os = "linux")]
pub use v4l_provider::V4lDeviceProvider;
