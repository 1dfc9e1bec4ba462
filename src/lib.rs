pub mod audio;
pub mod codec;
pub mod config;
pub mod error;
pub mod exchange;
pub mod session;

pub use audio::{
    AudioChunk, AudioClip, CaptureConfig, CaptureGateway, FileCaptureGateway, MediaStream,
    Recorder, RecordingStatus, ScriptedCaptureGateway,
};
pub use codec::EncodedPayload;
pub use config::Config;
pub use error::{InterviewError, Result};
pub use exchange::{TurnClient, TurnRequest, TurnResponse};
pub use session::{SessionOptions, SessionStatus, TurnController, TurnOutcome, TurnPhase, TurnReply};
