use serde::{Deserialize, Serialize};

use super::frame::StillFormat;

/// Configuration for a capture-and-recognition session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfiguration {
    /// Locale code handed to the recognition engine (default: "spa").
    pub language_hint: String,

    /// Encoding of captured still frames (default: PNG).
    pub still_format: StillFormat,

    /// Text exposed when recognition fails, in place of any diagnostic.
    pub recognition_fallback_text: String,

    /// Notice shown when camera access is refused.
    pub permission_denied_message: String,

    /// Notice shown when the selected camera cannot be started.
    pub device_unavailable_message: String,

    /// Notice shown when a still frame cannot be taken from the live preview.
    pub capture_failed_message: String,
}

impl SessionConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.language_hint.trim().is_empty() {
            return Err("language hint must not be empty".into());
        }
        if let StillFormat::Jpeg { quality } = self.still_format {
            if !(1..=100).contains(&quality) {
                return Err(format!("unsupported jpeg quality: {}", quality));
            }
        }
        if self.recognition_fallback_text.is_empty() {
            return Err("recognition fallback text must not be empty".into());
        }
        Ok(())
    }
}

impl Default for SessionConfiguration {
    fn default() -> Self {
        Self {
            language_hint: "spa".into(),
            still_format: StillFormat::Png,
            recognition_fallback_text: "text could not be recognized".into(),
            permission_denied_message: "Camera access was not granted. Check the camera \
                permissions in your system settings and try again."
                .into(),
            device_unavailable_message: "The selected camera is not available. Pick another \
                camera."
                .into(),
            capture_failed_message: "The photo could not be taken. Try again.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(SessionConfiguration::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_jpeg_quality() {
        let config = SessionConfiguration {
            still_format: StillFormat::Jpeg { quality: 0 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_blank_language_hint() {
        let config = SessionConfiguration {
            language_hint: "  ".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SessionConfiguration = serde_json::from_str(
            r#"{ "language_hint": "eng", "still_format": { "type": "jpeg", "quality": 85 } }"#,
        )
        .unwrap();

        assert_eq!(config.language_hint, "eng");
        assert_eq!(config.still_format, StillFormat::Jpeg { quality: 85 });
        assert_eq!(
            config.recognition_fallback_text,
            SessionConfiguration::default().recognition_fallback_text
        );
    }
}
