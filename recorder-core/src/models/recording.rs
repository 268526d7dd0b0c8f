use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::audio_models::{EncodingFormat, StreamInfo};
use crate::processing::pcm;

/// A finalized recording: the encoder's opaque output plus what the
/// session measured while producing it. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub id: String,
    pub format: EncodingFormat,
    pub stream: StreamInfo,
    pub duration: Duration,
    pub data: Arc<[u8]>,
    pub checksum: String,
    pub created_at: String,
}

impl Recording {
    pub fn new(data: Vec<u8>, format: EncodingFormat, stream: StreamInfo, duration: Duration) -> Self {
        let checksum = sha256_hex(&data);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            format,
            stream,
            duration,
            data: data.into(),
            checksum,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn metadata(&self) -> RecordingMetadata {
        RecordingMetadata {
            id: self.id.clone(),
            duration_secs: self.duration.as_secs_f64(),
            format: self.format,
            sample_rate: self.stream.sample_rate,
            channels: self.stream.channels,
            byte_len: self.data.len(),
            checksum: self.checksum.clone(),
            created_at: self.created_at.clone(),
        }
    }

    /// Wrap PCM16 output in a RIFF header. `None` for any other format, or
    /// when the take is too large for a 32-bit RIFF size.
    pub fn to_wav(&self) -> Option<Vec<u8>> {
        if self.format != EncodingFormat::Pcm16 {
            return None;
        }
        let data_size = pcm::wav_data_size(self.data.len())?;
        let mut wav = Vec::with_capacity(pcm::WAV_HEADER_SIZE + self.data.len());
        wav.extend_from_slice(&pcm::wav_header(self.stream, 16, data_size));
        wav.extend_from_slice(&self.data);
        Some(wav)
    }
}

/// Serializable description of a recording, for handing to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub duration_secs: f64,
    pub format: EncodingFormat,
    pub sample_rate: u32,
    pub channels: u16,
    pub byte_len: usize,
    pub checksum: String,
    pub created_at: String,
}

impl RecordingMetadata {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Identifies what the playback path is pointed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceHandle {
    /// The session's own last recording.
    Recorded { recording_id: String },
    /// A buffer supplied by the caller; the session never recorded it.
    External { label: String },
}

/// An audio buffer loaded for playback and waveform display.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSource {
    pub handle: SourceHandle,
    pub format: EncodingFormat,
    pub stream: StreamInfo,
    pub duration: Duration,
    pub data: Arc<[u8]>,
}

impl PlaybackSource {
    pub fn external(
        label: impl Into<String>,
        data: Vec<u8>,
        format: EncodingFormat,
        stream: StreamInfo,
        duration: Duration,
    ) -> Self {
        Self {
            handle: SourceHandle::External { label: label.into() },
            format,
            stream,
            duration,
            data: data.into(),
        }
    }

    /// Builds an external source from raw PCM, deriving the duration from its length.
    pub fn external_pcm(
        label: impl Into<String>,
        data: Vec<u8>,
        format: EncodingFormat,
        stream: StreamInfo,
    ) -> Option<Self> {
        let duration = pcm::pcm_duration(format, stream, data.len())?;
        Some(Self::external(label, data, format, stream, duration))
    }

    pub fn is_external(&self) -> bool {
        matches!(self.handle, SourceHandle::External { .. })
    }

    /// Per-bucket peak amplitudes across the whole buffer (mono-mixed).
    ///
    /// `None` when the format is opaque to the core; the widget has to
    /// decode it itself.
    pub fn amplitude_envelope(&self, buckets: usize) -> Option<Vec<f32>> {
        let samples = pcm::decode(self.format, &self.data)?;
        let mono = pcm::downmix_to_mono(&samples, self.stream.channels as usize);
        Some(pcm::amplitude_envelope(&mono, buckets))
    }
}

impl From<&Recording> for PlaybackSource {
    fn from(recording: &Recording) -> Self {
        Self {
            handle: SourceHandle::Recorded {
                recording_id: recording.id.clone(),
            },
            format: recording.format,
            stream: recording.stream,
            duration: recording.duration,
            data: Arc::clone(&recording.data),
        }
    }
}

fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data).iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_recording() -> Recording {
        Recording::new(
            pcm::encode_pcm16(&[0.0, 0.5, -0.5, 1.0]),
            EncodingFormat::Pcm16,
            StreamInfo::default(),
            Duration::from_millis(1500),
        )
    }

    #[test]
    fn checksum_is_sha256_of_output() {
        let recording = Recording::new(Vec::new(), EncodingFormat::Opus, StreamInfo::default(), Duration::ZERO);
        assert_eq!(
            recording.checksum,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn metadata_json_round_trips() {
        let metadata = sample_recording().metadata();
        let json = metadata.to_json().unwrap();
        assert!(json.contains("\"format\": \"pcm16\""));
        assert_eq!(RecordingMetadata::from_json(&json).unwrap(), metadata);
    }

    #[test]
    fn wav_wraps_pcm16_only() {
        let recording = sample_recording();
        let wav = recording.to_wav().unwrap();
        assert_eq!(wav.len(), pcm::WAV_HEADER_SIZE + 8);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 8);

        let opus = Recording { format: EncodingFormat::Opus, ..recording };
        assert!(opus.to_wav().is_none());
    }

    #[test]
    fn playback_source_shares_recorded_bytes() {
        let recording = sample_recording();
        let source = PlaybackSource::from(&recording);
        assert!(!source.is_external());
        assert!(Arc::ptr_eq(&source.data, &recording.data));
        assert_eq!(source.duration, Duration::from_millis(1500));
    }

    #[test]
    fn external_pcm_derives_duration_and_envelope() {
        let samples = vec![0.25f32; 48_000];
        let source = PlaybackSource::external_pcm(
            "clip",
            pcm::encode_float32(&samples),
            EncodingFormat::Float32,
            StreamInfo::default(),
        )
        .unwrap();

        assert!(source.is_external());
        assert_eq!(source.duration, Duration::from_secs(1));
        let envelope = source.amplitude_envelope(10).unwrap();
        assert_eq!(envelope.len(), 10);
        assert!(envelope.iter().all(|&peak| (peak - 0.25).abs() < 1e-6));
    }
}
