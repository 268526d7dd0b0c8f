use std::sync::Arc;

use crate::models::audio_models::{AudioSource, EncodingFormat, StreamInfo};
use crate::models::error::CaptureError;

/// Callback invoked whenever the encoder has a chunk of encoded output.
///
/// Fires on the encoder's own thread or from inside `finalize`.
pub type ChunkCallback = Arc<dyn Fn(&[u8]) + Send + Sync + 'static>;

/// Platform capture/encode facility.
///
/// Implemented by:
/// - `SynthCaptureProvider` (recorder-synth)
/// - test doubles in this crate
pub trait CaptureProvider: Send + Sync {
    /// Whether a capture device is present at all.
    fn is_available(&self) -> bool;

    /// Information about the device backing this provider.
    fn device_info(&self) -> AudioSource;

    /// Encoding used when the preferred format is rejected.
    fn default_format(&self) -> EncodingFormat;

    /// Ask the platform for a live input stream. May block on a permission prompt.
    fn request_capture(&self, device_id: Option<&str>) -> Result<Box<dyn InputStream>, CaptureError>;

    /// Start an encoder session over `stream`.
    ///
    /// Returns `CaptureError::UnsupportedFormat` when `format` cannot be produced.
    fn create_encoder(
        &self,
        stream: &dyn InputStream,
        format: EncodingFormat,
        on_data: ChunkCallback,
    ) -> Result<Box<dyn Encoder>, CaptureError>;
}

/// A live microphone stream. Exclusively owned by the session's resource guard.
pub trait InputStream: Send {
    fn info(&self) -> StreamInfo;

    /// Stop the stream and give the device back. Must be idempotent.
    fn release(&mut self);

    /// Lets backends reach their concrete stream type when attaching
    /// encoders or analysers.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// An encoder session bound to one input stream.
pub trait Encoder: Send {
    fn format(&self) -> EncodingFormat;

    /// Stop consuming input without ending the session.
    fn pause(&mut self);

    fn resume(&mut self);

    /// Flush and end the session. All remaining chunks are delivered through
    /// the data callback or the returned bytes before this returns.
    fn finalize(self: Box<Self>) -> Result<Vec<u8>, CaptureError>;
}
