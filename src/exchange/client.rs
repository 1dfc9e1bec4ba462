use std::time::Duration;

use tracing::{info, warn};

use super::messages::{TurnRequest, TurnResponse};
use crate::codec::EncodedPayload;
use crate::error::{InterviewError, Result};

/// HTTP client for the one-request-per-turn interview exchange.
///
/// Stateless per call; the controller keeps at most one submit outstanding.
/// No automatic retries: transport failures and non-success statuses are
/// surfaced to the caller as-is.
pub struct TurnClient {
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl TurnClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Submit one encoded answer clip and receive the reply clip + transcript.
    pub async fn submit(
        &self,
        session_id: &str,
        user_audio: &EncodedPayload,
    ) -> Result<TurnResponse> {
        let request = TurnRequest {
            session_id: session_id.to_string(),
            user_audio: user_audio.as_str().to_string(),
        };

        info!(
            "Submitting turn to {} (session={}, {} encoded bytes)",
            self.endpoint,
            session_id,
            user_audio.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(InterviewError::Network)?;

        let status = response.status();
        if !status.is_success() {
            warn!("Interview service rejected turn: {}", status);
            return Err(InterviewError::Service {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(InterviewError::Network)?;

        // A success status with a body that is not the two-field reply shape
        // counts as a service failure, carrying the status for diagnostics.
        match serde_json::from_str::<TurnResponse>(&body) {
            Ok(reply) => {
                info!(
                    "Turn reply received ({} transcript chars, {} encoded audio bytes)",
                    reply.text_output.len(),
                    reply.audio_output.len()
                );
                Ok(reply)
            }
            Err(e) => {
                warn!("Interview service reply is malformed: {}", e);
                Err(InterviewError::Service {
                    status: status.as_u16(),
                })
            }
        }
    }
}
