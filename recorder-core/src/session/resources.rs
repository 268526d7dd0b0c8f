//! Capture resource guard: the input stream, analysis graph and encoder
//! session held for one recording attempt.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{EncodingFormat, StreamInfo};
use crate::models::error::CaptureError;
use crate::traits::analysis::{AnalysisProvider, Analyser};
use crate::traits::capture_provider::{CaptureProvider, ChunkCallback, Encoder, InputStream};

/// Shared slot for the analyser. The live feed reads through it; release
/// empties it under the lock, so the feed can never reach a detached graph.
pub(crate) type AnalyserSlot = Arc<Mutex<Option<Box<dyn Analyser>>>>;

/// Platform handles acquired for one recording attempt.
///
/// Dropping the guard releases whatever it still holds, so an acquisition
/// that fails half-way through cleans up on the `?` that aborts it.
pub struct CaptureResources {
    stream: Option<Box<dyn InputStream>>,
    analyser: AnalyserSlot,
    encoder: Option<Box<dyn Encoder>>,
    info: StreamInfo,
    format: EncodingFormat,
    fallback: Option<(EncodingFormat, EncodingFormat)>,
}

impl CaptureResources {
    /// Acquire stream, analyser and encoder, in that order.
    ///
    /// An `UnsupportedFormat` from the encoder is retried once with the
    /// provider's default format; the substitution is recorded in
    /// [`fallback`](Self::fallback) rather than failing the acquisition.
    pub fn acquire(
        provider: &dyn CaptureProvider,
        analysis: &dyn AnalysisProvider,
        preferred: EncodingFormat,
        device_id: Option<&str>,
        on_data: ChunkCallback,
    ) -> Result<Self, CaptureError> {
        let stream = provider.request_capture(device_id)?;
        let info = stream.info();
        let mut guard = Self {
            stream: Some(stream),
            analyser: Arc::new(Mutex::new(None)),
            encoder: None,
            info,
            format: preferred,
            fallback: None,
        };

        let analyser = analysis.attach(guard.stream()?)?;
        *guard.analyser.lock() = Some(analyser);

        let (encoder, fallback) = match provider.create_encoder(guard.stream()?, preferred, Arc::clone(&on_data)) {
            Ok(encoder) => (encoder, None),
            Err(CaptureError::UnsupportedFormat(rejected)) => {
                let default = provider.default_format();
                if default == rejected {
                    return Err(CaptureError::EncoderFailure(format!(
                        "platform default format {} is not supported",
                        default
                    )));
                }
                log::info!("Encoder rejected {}; falling back to {}", rejected, default);
                let encoder = provider
                    .create_encoder(guard.stream()?, default, on_data)
                    .map_err(|e| match e {
                        CaptureError::UnsupportedFormat(f) => {
                            CaptureError::EncoderFailure(format!("fallback format {} is not supported", f))
                        }
                        other => other,
                    })?;
                (encoder, Some((rejected, default)))
            }
            Err(e) => return Err(e),
        };

        guard.format = encoder.format();
        guard.encoder = Some(encoder);
        guard.fallback = fallback;
        log::debug!(
            "Acquired capture resources: {} Hz, {} ch, {}",
            info.sample_rate,
            info.channels,
            guard.format
        );
        Ok(guard)
    }

    fn stream(&self) -> Result<&dyn InputStream, CaptureError> {
        self.stream.as_deref().ok_or(CaptureError::DeviceUnavailable)
    }

    /// Whether the input stream is still held.
    pub fn is_held(&self) -> bool {
        self.stream.is_some()
    }

    pub fn info(&self) -> StreamInfo {
        self.info
    }

    /// Format the encoder actually produces.
    pub fn format(&self) -> EncodingFormat {
        self.format
    }

    /// `(requested, actual)` when the preferred format was substituted.
    pub fn fallback(&self) -> Option<(EncodingFormat, EncodingFormat)> {
        self.fallback
    }

    pub(crate) fn analyser_slot(&self) -> AnalyserSlot {
        Arc::clone(&self.analyser)
    }

    pub fn pause_encoder(&mut self) {
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.pause();
        }
    }

    pub fn resume_encoder(&mut self) {
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.resume();
        }
    }

    /// Hand the encoder out for finalization; the stream stays held.
    pub fn take_encoder(&mut self) -> Option<Box<dyn Encoder>> {
        self.encoder.take()
    }

    /// Release everything still held: encoder, analyser, then stream.
    ///
    /// Idempotent. An encoder that was never finalized is abandoned.
    pub fn release(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            log::debug!("Abandoning {} encoder session", encoder.format());
            drop(encoder);
        }
        if let Some(mut analyser) = self.analyser.lock().take() {
            analyser.detach();
        }
        if let Some(mut stream) = self.stream.take() {
            stream.release();
            log::debug!("Released capture stream");
        }
    }
}

impl Drop for CaptureResources {
    fn drop(&mut self) {
        self.release();
    }
}

/// Encoded chunks collected for the current attempt.
///
/// Chunks tagged with any other attempt, or arriving while closed, are
/// dropped: they belong to a recording that was stopped or deleted.
#[derive(Debug, Default)]
pub(crate) struct ChunkBuffer {
    attempt: Option<u64>,
    bytes: Vec<u8>,
}

impl ChunkBuffer {
    pub fn open(&mut self, attempt: u64) {
        self.attempt = Some(attempt);
        self.bytes.clear();
    }

    pub fn accept(&mut self, attempt: u64, chunk: &[u8]) {
        if self.attempt == Some(attempt) {
            self.bytes.extend_from_slice(chunk);
        } else {
            log::trace!("Discarding {} bytes from stale encoder (attempt {})", chunk.len(), attempt);
        }
    }

    /// Stop accepting and hand back what was collected.
    pub fn close(&mut self) -> Vec<u8> {
        self.attempt = None;
        std::mem::take(&mut self.bytes)
    }
}
