use serde::{Deserialize, Serialize};

/// One turn's request to the interview service.
#[derive(Debug, Serialize)]
pub struct TurnRequest {
    pub session_id: String,
    /// Base64 clip bytes, no data-URL prefix
    pub user_audio: String,
}

/// One turn's reply from the interview service.
///
/// Exactly one reply corresponds to one request; anything other than this
/// two-field shape is treated as a service error.
#[derive(Debug, Clone, Deserialize)]
pub struct TurnResponse {
    /// Base64 reply audio
    pub audio_output: String,
    /// Reply transcript
    pub text_output: String,
}
