//! Still-frame encoding.
//!
//! Turns the packed RGB8 frame read from a live stream into the encoded
//! bytes of a `CapturedFrame`.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};

use crate::models::error::CaptureError;
use crate::models::frame::{CapturedFrame, RawFrame, StillFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StillEncoder {
    format: StillFormat,
}

impl StillEncoder {
    pub fn new(format: StillFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> StillFormat {
        self.format
    }

    /// Encode `raw` into a new `CapturedFrame`.
    ///
    /// Fails when the frame has no area (a stream that has not decoded its
    /// first frame yet reports 0×0) or the buffer does not match the
    /// dimensions.
    pub fn encode(&self, raw: RawFrame) -> Result<CapturedFrame, CaptureError> {
        if raw.is_empty() {
            return Err(CaptureError::EncodingFailed(format!(
                "frame has no area ({}x{})",
                raw.width, raw.height
            )));
        }
        if raw.pixels.len() != raw.expected_len() {
            return Err(CaptureError::EncodingFailed(format!(
                "expected {} bytes for {}x{} rgb, got {}",
                raw.expected_len(),
                raw.width,
                raw.height,
                raw.pixels.len()
            )));
        }

        let (width, height) = (raw.width, raw.height);
        let image = RgbImage::from_raw(width, height, raw.pixels).ok_or_else(|| {
            CaptureError::EncodingFailed("pixel buffer does not match dimensions".into())
        })?;

        let mut bytes = Vec::new();
        match self.format {
            StillFormat::Png => {
                image
                    .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
                    .map_err(|e| CaptureError::EncodingFailed(format!("png: {}", e)))?;
            }
            StillFormat::Jpeg { quality } => {
                JpegEncoder::new_with_quality(&mut bytes, quality)
                    .encode_image(&image)
                    .map_err(|e| CaptureError::EncodingFailed(format!("jpeg: {}", e)))?;
            }
        }

        Ok(CapturedFrame::new(self.format, width, height, bytes))
    }
}

impl Default for StillEncoder {
    fn default() -> Self {
        Self::new(StillFormat::Png)
    }
}
