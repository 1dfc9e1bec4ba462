use thiserror::Error;

/// Failure taxonomy for one interview session.
///
/// Device and permission failures end the acquire attempt; everything else is
/// scoped to a single turn and leaves the controller ready for the next one.
#[derive(Debug, Error)]
pub enum InterviewError {
    #[error("Audio capture is not supported by this host: {0}")]
    DeviceUnsupported(String),

    #[error("Capture permission denied: {0}")]
    PermissionDenied(String),

    #[error("Recording finished with no audio data")]
    EmptyRecording,

    #[error("Turn exchange failed in transport")]
    Network(#[source] reqwest::Error),

    #[error("Interview service returned status {status}")]
    Service { status: u16 },

    #[error("Reply audio is not valid base64")]
    MalformedPayload(#[source] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, InterviewError>;
