//! Raw PCM helpers: sample conversion, level math, waveform envelopes and
//! the 44-byte RIFF header used to wrap PCM16 recordings.

use std::time::Duration;

use crate::models::audio_models::{EncodingFormat, StreamInfo};

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// `len` as a WAV data size, if the RIFF chunk size `36 + len` fits in 32 bits.
pub fn wav_data_size(len: usize) -> Option<u32> {
    u32::try_from(len).ok().filter(|size| size.checked_add(36).is_some())
}

/// Generate a 44-byte WAV RIFF header (PCM format code 1, little-endian).
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bit_depth / 8
/// [32-33]  block_align = channels * bit_depth / 8
/// [34-35]  bit_depth
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn wav_header(info: StreamInfo, bit_depth: u16, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let byte_rate = info.sample_rate * info.channels as u32 * bit_depth as u32 / 8;
    let block_align = info.channels * bit_depth / 8;
    let chunk_size = 36 + data_size;

    let mut header = [0u8; WAV_HEADER_SIZE];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&info.channels.to_le_bytes());
    header[24..28].copy_from_slice(&info.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Convert f32 samples `[-1.0, 1.0]` to 16-bit PCM (little-endian bytes).
///
/// Clamps out-of-range values.
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        data.extend_from_slice(&value.to_le_bytes());
    }
    data
}

pub fn encode_float32(samples: &[f32]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 4);
    for &sample in samples {
        data.extend_from_slice(&sample.to_le_bytes());
    }
    data
}

/// Encode samples into `format`, or `None` when the format is not raw PCM.
pub fn encode(format: EncodingFormat, samples: &[f32]) -> Option<Vec<u8>> {
    match format {
        EncodingFormat::Pcm16 => Some(encode_pcm16(samples)),
        EncodingFormat::Float32 => Some(encode_float32(samples)),
        EncodingFormat::Opus => None,
    }
}

/// Decode raw PCM bytes back to f32 samples. A trailing partial sample is ignored.
pub fn decode(format: EncodingFormat, bytes: &[u8]) -> Option<Vec<f32>> {
    match format {
        EncodingFormat::Pcm16 => Some(
            bytes
                .chunks_exact(2)
                .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / i16::MAX as f32)
                .collect(),
        ),
        EncodingFormat::Float32 => Some(
            bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        ),
        EncodingFormat::Opus => None,
    }
}

/// Playable length of `byte_len` bytes of raw PCM.
pub fn pcm_duration(format: EncodingFormat, info: StreamInfo, byte_len: usize) -> Option<Duration> {
    let bytes_per_frame = format.bytes_per_sample()? * info.channels.max(1) as usize;
    if info.sample_rate == 0 {
        return None;
    }
    let frames = byte_len / bytes_per_frame;
    Some(Duration::from_secs_f64(frames as f64 / info.sample_rate as f64))
}

/// Downmix interleaved multi-channel audio to mono by averaging channels per frame.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let scale = 1.0 / channels as f32;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}

/// Peak absolute level of samples.
pub fn peak_level(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}

/// Split `samples` into `buckets` equal spans and return each span's peak.
///
/// This is the amplitude overview a waveform widget draws. Returns fewer
/// buckets than requested when there are fewer samples than buckets.
pub fn amplitude_envelope(samples: &[f32], buckets: usize) -> Vec<f32> {
    if buckets == 0 || samples.is_empty() {
        return Vec::new();
    }
    let span = samples.len().div_ceil(buckets);
    samples.chunks(span).map(peak_level).collect()
}
