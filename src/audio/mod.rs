pub mod capture;
pub mod recorder;

pub use capture::{
    AudioChunk, CaptureConfig, CaptureGateway, FileCaptureGateway, MediaStream,
    ScriptedCaptureGateway,
};
pub use recorder::{AudioClip, Recorder, RecordingStatus};
