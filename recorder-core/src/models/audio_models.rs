use std::fmt;

use serde::{Deserialize, Serialize};

/// Output encoding requested from the platform encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncodingFormat {
    /// Interleaved signed 16-bit little-endian PCM.
    Pcm16,
    /// Interleaved 32-bit float little-endian PCM.
    Float32,
    /// Compressed Opus stream; opaque to the core.
    Opus,
}

impl EncodingFormat {
    /// Whether the core can decode this format for waveform display.
    pub fn is_raw_pcm(&self) -> bool {
        matches!(self, Self::Pcm16 | Self::Float32)
    }

    /// Bytes per sample for raw PCM formats.
    pub fn bytes_per_sample(&self) -> Option<usize> {
        match self {
            Self::Pcm16 => Some(2),
            Self::Float32 => Some(4),
            Self::Opus => None,
        }
    }
}

impl fmt::Display for EncodingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pcm16 => "pcm16",
            Self::Float32 => "float32",
            Self::Opus => "opus",
        };
        f.write_str(name)
    }
}

/// Shape of the audio delivered by an input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for StreamInfo {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 1,
        }
    }
}

/// A capture device known to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// One live frequency-magnitude snapshot, magnitudes normalised to 0.0–1.0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyFrame {
    pub magnitudes: Vec<f32>,
}

impl FrequencyFrame {
    pub fn new(magnitudes: Vec<f32>) -> Self {
        Self { magnitudes }
    }

    pub fn bin_count(&self) -> usize {
        self.magnitudes.len()
    }

    /// Loudest bin in the frame.
    pub fn peak(&self) -> f32 {
        self.magnitudes.iter().copied().fold(0.0f32, f32::max)
    }
}
