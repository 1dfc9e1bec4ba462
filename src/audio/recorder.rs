use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::capture::{AudioChunk, MediaStream};
use crate::error::{InterviewError, Result};

/// Whether a recording is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    Inactive,
    Recording,
}

/// A finalized unit of recorded audio.
///
/// Built once from the ordered chunk sequence at stop time and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    bytes: Vec<u8>,
    mime: String,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

struct ActiveRecording {
    chunk_rx: mpsc::Receiver<AudioChunk>,
    mime: String,
}

/// Turns a capture stream into discrete clips.
///
/// One recording at a time: `start` opens a capture window on the stream and
/// `stop` closes it, drains every chunk queued before the stop in arrival
/// order, and concatenates them into a clip. Both calls are idempotent
/// no-ops when the recorder is already in the requested state.
pub struct Recorder {
    status: RecordingStatus,
    active: Option<ActiveRecording>,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            status: RecordingStatus::Inactive,
            active: None,
        }
    }

    pub fn status(&self) -> RecordingStatus {
        self.status
    }

    /// Begin buffering chunks from the stream.
    pub fn start(&mut self, stream: &mut MediaStream) {
        if self.status == RecordingStatus::Recording {
            warn!("Recording already started");
            return;
        }

        let chunk_rx = stream.start_capture();
        self.active = Some(ActiveRecording {
            chunk_rx,
            mime: stream.mime().to_string(),
        });
        self.status = RecordingStatus::Recording;
        info!("Recording started");
    }

    /// Finalize the current recording into a clip.
    ///
    /// Returns `Ok(None)` when no recording was active. Fails with
    /// `EmptyRecording` when the finalized clip has zero bytes; the recorder
    /// is back at `Inactive` either way.
    pub async fn stop(&mut self, stream: &mut MediaStream) -> Result<Option<AudioClip>> {
        let Some(mut active) = self.active.take() else {
            warn!("Recording not active");
            return Ok(None);
        };

        // Close the capture window first so the chunk channel ends; everything
        // queued before the stop still drains out below.
        stream.stop_capture();
        self.status = RecordingStatus::Inactive;

        let mut bytes = Vec::new();
        let mut chunk_count = 0usize;
        while let Some(chunk) = active.chunk_rx.recv().await {
            if chunk.bytes.is_empty() {
                debug!("Discarding zero-length chunk");
                continue;
            }
            chunk_count += 1;
            bytes.extend_from_slice(&chunk.bytes);
        }

        if bytes.is_empty() {
            warn!("Recording produced no audio data");
            return Err(InterviewError::EmptyRecording);
        }

        info!(
            "Recording finalized: {} bytes from {} chunk(s) ({})",
            bytes.len(),
            chunk_count,
            active.mime
        );

        Ok(Some(AudioClip::new(bytes, active.mime)))
    }

    /// Drop the current recording without finalizing a clip.
    ///
    /// Used when the session ends mid-recording; buffered chunks are
    /// discarded.
    pub fn abandon(&mut self, stream: &mut MediaStream) {
        if self.active.take().is_none() {
            return;
        }
        stream.stop_capture();
        self.status = RecordingStatus::Inactive;
        warn!("Recording abandoned");
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}
