use base64::Engine;
use tracing::debug;

use crate::audio::AudioClip;
use crate::error::{InterviewError, Result};

/// Transport-safe text form of a clip's bytes.
///
/// Always pure base64 data: any `data:<mime>;base64,` header is stripped at
/// construction, so the text is ready to put on the wire as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload(String);

impl EncodedPayload {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.starts_with("data:") {
            if let Some((header, data)) = text.split_once(',') {
                debug!("Stripped payload metadata header: {}", header);
                return Self(data.to_string());
            }
        }
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Encode a clip's bytes as base64 text. Never fails for a well-formed clip.
pub fn encode(clip: &AudioClip) -> EncodedPayload {
    EncodedPayload(base64::engine::general_purpose::STANDARD.encode(clip.bytes()))
}

/// Decode base64 text back into a playable clip tagged with `mime`.
pub fn decode(payload: &EncodedPayload, mime: &str) -> Result<AudioClip> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.as_str())
        .map_err(InterviewError::MalformedPayload)?;
    Ok(AudioClip::new(bytes, mime))
}
