use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{InterviewError, Result};

/// One burst of raw audio bytes delivered by a capture track.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub bytes: Vec<u8>,
}

/// Configuration for capture sources.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// MIME kind stamped on finalized clips
    pub mime: String,
    /// Chunk size in bytes when replaying a source
    pub chunk_bytes: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            mime: "audio/wav".to_string(),
            chunk_bytes: 32 * 1024,
        }
    }
}

/// Device side of an acquired stream.
///
/// `start` opens a fresh chunk channel for one recording window; `stop` closes
/// it, after which every chunk queued before the stop drains out and the
/// channel ends. `halt` is the permanent release and must be idempotent.
pub(crate) trait CaptureTrack: Send {
    fn start(&mut self) -> mpsc::Receiver<AudioChunk>;
    fn stop(&mut self);
    fn halt(&mut self);
}

/// Live handle to an acquired capture device.
///
/// Exclusively owned by one controller. `release` stops every track and is
/// safe to call repeatedly; dropping the handle releases it as a backstop.
pub struct MediaStream {
    mime: String,
    track: Box<dyn CaptureTrack>,
    released: bool,
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("mime", &self.mime)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl MediaStream {
    pub(crate) fn new(mime: String, track: Box<dyn CaptureTrack>) -> Self {
        Self {
            mime,
            track,
            released: false,
        }
    }

    /// MIME kind of clips recorded from this stream.
    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub(crate) fn start_capture(&mut self) -> mpsc::Receiver<AudioChunk> {
        if self.released {
            warn!("Capture requested on a released stream");
            let (_tx, rx) = mpsc::channel(1);
            return rx;
        }
        self.track.start()
    }

    pub(crate) fn stop_capture(&mut self) {
        if !self.released {
            self.track.stop();
        }
    }

    /// Stop all tracks and give the device back. Idempotent.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.track.halt();
        self.released = true;
        info!("Capture stream released");
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        self.release();
    }
}

/// Capture device gateway.
///
/// `acquire` asks the host for a capture stream; a grant produces the
/// exclusively-owned `MediaStream`, a refusal is `PermissionDenied`, and a
/// host with no way to record at all is `DeviceUnsupported`.
#[async_trait::async_trait]
pub trait CaptureGateway: Send + Sync {
    async fn acquire(&mut self) -> Result<MediaStream>;

    /// Gateway name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// WAV-file gateway
// ============================================================================

/// Capture gateway that replays prerecorded WAV answers.
///
/// Each recording window replays the next file's bytes as fixed-size chunks,
/// so a whole interview can be driven from disk. Validation happens up front
/// at acquire time: an unreadable file maps to `PermissionDenied`, a missing
/// or malformed one to `DeviceUnsupported`.
pub struct FileCaptureGateway {
    paths: Vec<PathBuf>,
    config: CaptureConfig,
}

impl FileCaptureGateway {
    pub fn new(paths: Vec<PathBuf>, config: CaptureConfig) -> Self {
        Self { paths, config }
    }
}

#[async_trait::async_trait]
impl CaptureGateway for FileCaptureGateway {
    async fn acquire(&mut self) -> Result<MediaStream> {
        let mut payloads = VecDeque::with_capacity(self.paths.len());

        for path in &self.paths {
            let reader =
                hound::WavReader::open(path).map_err(|e| classify_wav_error(path, e))?;
            let spec = reader.spec();
            let duration = reader.duration() as f64 / spec.sample_rate as f64;
            info!(
                "Answer source loaded: {} ({:.1}s, {} Hz, {} ch)",
                path.display(),
                duration,
                spec.sample_rate,
                spec.channels
            );
            drop(reader);

            let bytes = fs::read(path).map_err(|e| classify_io_error(path, e))?;
            payloads.push_back(bytes);
        }

        info!("File capture ready: {} answer(s) queued", payloads.len());

        Ok(MediaStream::new(
            self.config.mime.clone(),
            Box::new(FileTrack {
                payloads,
                chunk_bytes: self.config.chunk_bytes.max(1),
                live: None,
                halted: false,
            }),
        ))
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}

fn classify_wav_error(path: &Path, err: hound::Error) -> InterviewError {
    match err {
        hound::Error::IoError(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            InterviewError::PermissionDenied(format!("{}: {}", path.display(), e))
        }
        other => InterviewError::DeviceUnsupported(format!("{}: {}", path.display(), other)),
    }
}

fn classify_io_error(path: &Path, err: io::Error) -> InterviewError {
    if err.kind() == io::ErrorKind::PermissionDenied {
        InterviewError::PermissionDenied(format!("{}: {}", path.display(), err))
    } else {
        InterviewError::DeviceUnsupported(format!("{}: {}", path.display(), err))
    }
}

struct FileTrack {
    payloads: VecDeque<Vec<u8>>,
    chunk_bytes: usize,
    // Sender for the active recording window; dropping it closes the channel.
    live: Option<mpsc::Sender<AudioChunk>>,
    halted: bool,
}

impl CaptureTrack for FileTrack {
    fn start(&mut self) -> mpsc::Receiver<AudioChunk> {
        let payload = self.payloads.pop_front().unwrap_or_default();
        let chunks: Vec<Vec<u8>> = payload
            .chunks(self.chunk_bytes)
            .map(|c| c.to_vec())
            .collect();

        debug!("File track delivering {} chunk(s)", chunks.len());

        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for bytes in chunks {
            if let Err(e) = tx.try_send(AudioChunk { bytes }) {
                warn!("Dropping file chunk: {}", e);
            }
        }
        self.live = Some(tx);
        rx
    }

    fn stop(&mut self) {
        self.live = None;
    }

    fn halt(&mut self) {
        if self.halted {
            return;
        }
        self.halted = true;
        self.live = None;
        self.payloads.clear();
    }
}

// ============================================================================
// Scripted gateway
// ============================================================================

/// Deterministic capture gateway for tests and embedders.
///
/// Each recording window delivers one scripted list of chunks, in order. The
/// gateway can be primed to refuse the next acquire, and it counts releases
/// so teardown behavior is observable.
pub struct ScriptedCaptureGateway {
    windows: Vec<Vec<Vec<u8>>>,
    mime: String,
    releases: Arc<AtomicUsize>,
    deny_next: Option<AcquireRefusal>,
}

enum AcquireRefusal {
    Permission,
    Unsupported,
}

impl ScriptedCaptureGateway {
    /// One inner `Vec<Vec<u8>>` per recording window, one `Vec<u8>` per chunk.
    pub fn new(windows: Vec<Vec<Vec<u8>>>) -> Self {
        Self {
            windows,
            mime: "audio/webm".to_string(),
            releases: Arc::new(AtomicUsize::new(0)),
            deny_next: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }

    /// Refuse the next acquire as a user permission denial.
    pub fn deny_next_acquire(&mut self) {
        self.deny_next = Some(AcquireRefusal::Permission);
    }

    /// Refuse the next acquire as a host without capture support.
    pub fn fail_next_acquire_unsupported(&mut self) {
        self.deny_next = Some(AcquireRefusal::Unsupported);
    }

    /// How many times a stream from this gateway has been released.
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CaptureGateway for ScriptedCaptureGateway {
    async fn acquire(&mut self) -> Result<MediaStream> {
        match self.deny_next.take() {
            Some(AcquireRefusal::Permission) => {
                return Err(InterviewError::PermissionDenied(
                    "scripted denial".to_string(),
                ))
            }
            Some(AcquireRefusal::Unsupported) => {
                return Err(InterviewError::DeviceUnsupported(
                    "scripted capability failure".to_string(),
                ))
            }
            None => {}
        }

        let windows = std::mem::take(&mut self.windows);
        Ok(MediaStream::new(
            self.mime.clone(),
            Box::new(ScriptedTrack {
                windows: windows.into(),
                live: None,
                releases: Arc::clone(&self.releases),
                halted: false,
            }),
        ))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct ScriptedTrack {
    windows: VecDeque<Vec<Vec<u8>>>,
    live: Option<mpsc::Sender<AudioChunk>>,
    releases: Arc<AtomicUsize>,
    halted: bool,
}

impl CaptureTrack for ScriptedTrack {
    fn start(&mut self) -> mpsc::Receiver<AudioChunk> {
        let chunks = self.windows.pop_front().unwrap_or_default();
        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for bytes in chunks {
            if let Err(e) = tx.try_send(AudioChunk { bytes }) {
                warn!("Dropping scripted chunk: {}", e);
            }
        }
        self.live = Some(tx);
        rx
    }

    fn stop(&mut self) {
        self.live = None;
    }

    fn halt(&mut self) {
        if self.halted {
            return;
        }
        self.halted = true;
        self.live = None;
        self.windows.clear();
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}
