//! Synthetic capture provider.
//!
//! Stands in for a microphone backend: every capture request yields a stream
//! that plays a fixed sine tone, after an optional simulated permission delay.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use recorder_core::{
    AudioSource, CaptureError, CaptureProvider, ChunkCallback, Encoder, EncodingFormat, InputStream, StreamInfo,
};

use crate::encoder::SynthEncoder;
use crate::permissions::PermissionOutcome;
use crate::stream::{SynthStream, Tone};

pub const DEVICE_ID: &str = "synth-tone";

#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    pub tone: Tone,
    pub stream: StreamInfo,
    pub permission: PermissionOutcome,
    /// How long `request_capture` blocks, as a permission prompt would.
    pub acquisition_latency: Duration,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            tone: Tone {
                frequency: 440.0,
                amplitude: 0.5,
            },
            stream: StreamInfo::default(),
            permission: PermissionOutcome::Granted,
            acquisition_latency: Duration::ZERO,
        }
    }
}

pub struct SynthCaptureProvider {
    config: SynthConfig,
    live_streams: Arc<AtomicUsize>,
}

impl SynthCaptureProvider {
    pub fn new(config: SynthConfig) -> Self {
        Self {
            config,
            live_streams: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Streams handed out and not yet released.
    pub fn live_streams(&self) -> usize {
        self.live_streams.load(Ordering::SeqCst)
    }
}

impl Default for SynthCaptureProvider {
    fn default() -> Self {
        Self::new(SynthConfig::default())
    }
}

impl CaptureProvider for SynthCaptureProvider {
    fn is_available(&self) -> bool {
        self.config.permission.device_present()
    }

    fn device_info(&self) -> AudioSource {
        AudioSource {
            id: DEVICE_ID.into(),
            name: format!("Synth tone ({:.0} Hz)", self.config.tone.frequency),
            is_default: true,
        }
    }

    fn default_format(&self) -> EncodingFormat {
        EncodingFormat::Pcm16
    }

    fn request_capture(&self, device_id: Option<&str>) -> Result<Box<dyn InputStream>, CaptureError> {
        if !self.config.acquisition_latency.is_zero() {
            thread::sleep(self.config.acquisition_latency);
        }
        self.config.permission.check()?;
        if let Some(id) = device_id {
            if id != DEVICE_ID {
                log::warn!("Unknown capture device '{}'", id);
                return Err(CaptureError::DeviceUnavailable);
            }
        }

        let stream = SynthStream::start(self.config.tone, self.config.stream, Arc::clone(&self.live_streams))?;
        Ok(Box::new(stream))
    }

    fn create_encoder(
        &self,
        stream: &dyn InputStream,
        format: EncodingFormat,
        on_data: ChunkCallback,
    ) -> Result<Box<dyn Encoder>, CaptureError> {
        let stream = stream
            .as_any()
            .downcast_ref::<SynthStream>()
            .ok_or_else(|| CaptureError::ConfigurationFailed("stream is not a synth stream".into()))?;
        Ok(Box::new(SynthEncoder::attach(stream, format, on_data)?))
    }
}
