use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Encoding used for captured still frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum StillFormat {
    Png,
    Jpeg { quality: u8 },
}

impl StillFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg { .. } => "image/jpeg",
        }
    }
}

impl Default for StillFormat {
    fn default() -> Self {
        Self::Png
    }
}

/// The decoded frame currently shown by a live stream, as packed RGB8.
#[derive(Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RawFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Byte length an RGB8 buffer of these dimensions must have.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// An encoded still image produced by one capture action.
///
/// Immutable once built; the encoded bytes are shared, so clones are cheap.
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    id: String,
    format: StillFormat,
    width: u32,
    height: u32,
    bytes: Arc<[u8]>,
    digest: String,
    captured_at: String,
}

impl CapturedFrame {
    pub fn new(format: StillFormat, width: u32, height: u32, bytes: Vec<u8>) -> Self {
        let digest = format!("{:x}", Sha256::digest(&bytes));
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            format,
            width,
            height,
            bytes: Arc::from(bytes),
            digest,
            captured_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn format(&self) -> StillFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hex SHA-256 of the encoded bytes.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn captured_at(&self) -> &str {
        &self.captured_at
    }

    pub fn info(&self) -> FrameInfo {
        FrameInfo {
            id: self.id.clone(),
            mime_type: self.format.mime_type().to_string(),
            width: self.width,
            height: self.height,
            size_bytes: self.bytes.len(),
            digest: self.digest.clone(),
            captured_at: self.captured_at.clone(),
        }
    }
}

impl fmt::Debug for CapturedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedFrame")
            .field("id", &self.id)
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Serializable description of a captured frame, without the pixel data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInfo {
    pub id: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: usize,
    pub digest: String,
    pub captured_at: String,
}
