use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::config::SessionOptions;
use super::reply::{SessionStatus, TurnReply};
use crate::audio::{CaptureGateway, MediaStream, Recorder, RecordingStatus};
use crate::codec::{self, EncodedPayload};
use crate::error::Result;
use crate::exchange::TurnClient;

/// Where the session currently is in its turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    AwaitingPermission,
    Idle,
    Recording,
    Processing,
    Done,
}

/// How one finish call resolved, aside from errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// A reply was received and published.
    Replied,
    /// Recording was not active; nothing to do.
    NotRecording,
    /// Clip captured, but no session identifier, so the exchange was skipped.
    Skipped,
}

/// The session turn controller.
///
/// Owns the capture stream, the recorder, and the exchange client, and walks
/// them through `AwaitingPermission → Idle → Recording → Processing → Idle`
/// until the caller marks the interview done. Per-turn failures are caught at
/// the processing boundary and leave previously published outputs intact;
/// the stream is released on drop no matter what state the session is in.
pub struct TurnController {
    options: SessionOptions,
    client: TurnClient,
    recorder: Recorder,
    stream: Option<MediaStream>,
    phase: TurnPhase,
    exchange_in_flight: bool,
    last_reply: Option<TurnReply>,
    turns_completed: u32,
    started_at: DateTime<Utc>,
}

impl TurnController {
    pub fn new(options: SessionOptions, client: TurnClient) -> Self {
        match &options.session_id {
            Some(id) => info!("Turn controller created for session {}", id),
            None => info!("Turn controller created without a session identifier"),
        }

        Self {
            options,
            client,
            recorder: Recorder::new(),
            stream: None,
            phase: TurnPhase::AwaitingPermission,
            exchange_in_flight: false,
            last_reply: None,
            turns_completed: 0,
            started_at: Utc::now(),
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn recording_status(&self) -> RecordingStatus {
        self.recorder.status()
    }

    pub fn is_exchanging(&self) -> bool {
        self.exchange_in_flight
    }

    pub fn is_done(&self) -> bool {
        self.phase == TurnPhase::Done
    }

    pub fn turns_completed(&self) -> u32 {
        self.turns_completed
    }

    /// Last published reply, if any turn has completed.
    pub fn last_reply(&self) -> Option<&TurnReply> {
        self.last_reply.as_ref()
    }

    pub fn reply_transcript(&self) -> Option<&str> {
        self.last_reply.as_ref().map(|r| r.transcript.as_str())
    }

    pub fn reply_audio(&self) -> Option<&crate::audio::AudioClip> {
        self.last_reply.as_ref().map(|r| &r.audio)
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            phase: self.phase,
            recording: self.recorder.status(),
            exchange_in_flight: self.exchange_in_flight,
            turns_completed: self.turns_completed,
            started_at: self.started_at,
        }
    }

    /// Ask the gateway for the capture stream.
    ///
    /// On success the start action unlocks and the session moves to `Idle`;
    /// on failure it stays at `AwaitingPermission` and the caller may retry
    /// by invoking acquire again. Re-acquiring releases any previous stream
    /// before storing the replacement.
    pub async fn acquire(&mut self, gateway: &mut dyn CaptureGateway) -> Result<()> {
        if self.phase != TurnPhase::AwaitingPermission {
            debug!("Capture already acquired; ignoring");
            return Ok(());
        }

        match gateway.acquire().await {
            Ok(stream) => {
                if let Some(mut old) = self.stream.replace(stream) {
                    old.release();
                }
                self.phase = TurnPhase::Idle;
                info!("Capture ready via {} gateway", gateway.name());
                Ok(())
            }
            Err(e) => {
                error!("Capture acquire failed: {}", e);
                Err(e)
            }
        }
    }

    /// Begin recording the user's answer.
    ///
    /// Only acts from `Idle`. In every other phase (permission not granted,
    /// already recording, a turn in flight, interview done) this is a no-op,
    /// so callers may invoke it defensively.
    pub fn start_answer(&mut self) {
        if self.phase != TurnPhase::Idle {
            debug!("Ignoring start in phase {:?}", self.phase);
            return;
        }

        let Some(stream) = self.stream.as_mut() else {
            warn!("No capture stream; ignoring start");
            return;
        };

        self.recorder.start(stream);
        self.phase = TurnPhase::Recording;
    }

    /// Stop recording and run the turn: encode, exchange, decode, publish.
    ///
    /// Every per-turn failure (empty recording, transport, service status,
    /// malformed reply) restores the session to `Idle` before it is returned,
    /// and previously published outputs stay visible.
    pub async fn finish_answer(&mut self) -> Result<TurnOutcome> {
        if self.phase != TurnPhase::Recording {
            debug!("No active recording to finish");
            return Ok(TurnOutcome::NotRecording);
        }

        self.phase = TurnPhase::Processing;
        let outcome = self.process_turn().await;
        self.phase = TurnPhase::Idle;

        if let Err(e) = &outcome {
            error!("Turn failed: {}", e);
        }

        outcome
    }

    async fn process_turn(&mut self) -> Result<TurnOutcome> {
        let Some(stream) = self.stream.as_mut() else {
            warn!("No capture stream; nothing to finalize");
            return Ok(TurnOutcome::NotRecording);
        };

        let clip = match self.recorder.stop(stream).await? {
            Some(clip) => clip,
            None => return Ok(TurnOutcome::NotRecording),
        };

        let payload = codec::encode(&clip);

        let Some(session_id) = self.options.session_id.clone() else {
            info!("No session identifier; skipping exchange");
            return Ok(TurnOutcome::Skipped);
        };

        self.exchange_in_flight = true;
        let result = self.client.submit(&session_id, &payload).await;
        self.exchange_in_flight = false;
        let response = result?;

        let reply_audio = codec::decode(&EncodedPayload::new(response.audio_output), clip.mime())?;

        self.turns_completed += 1;
        self.last_reply = Some(TurnReply {
            turn_index: self.turns_completed,
            transcript: response.text_output,
            audio: reply_audio,
            received_at: Utc::now(),
        });

        match self.options.question_count {
            Some(total) => info!("Turn {}/{} complete", self.turns_completed, total),
            None => info!("Turn {} complete", self.turns_completed),
        }

        Ok(TurnOutcome::Replied)
    }

    /// Signal that the interview is complete.
    ///
    /// Freezes the published outputs and disables further turns; an active
    /// recording is abandoned without an exchange. Exclusive access means
    /// this can never interleave with an in-flight turn.
    pub fn mark_done(&mut self) {
        if self.phase == TurnPhase::Done {
            return;
        }

        if self.phase == TurnPhase::Recording {
            if let Some(stream) = self.stream.as_mut() {
                self.recorder.abandon(stream);
            }
        }

        self.phase = TurnPhase::Done;
        info!("Interview marked done after {} turn(s)", self.turns_completed);
    }
}

impl Drop for TurnController {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.as_mut() {
            stream.release();
        }
    }
}
