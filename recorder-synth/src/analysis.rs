//! Frequency analysis over a synth stream's sample tap.

use std::f32::consts::PI;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use realfft::num_complex::Complex32;
use realfft::{RealFftPlanner, RealToComplex};

use recorder_core::{Analyser, AnalysisProvider, CaptureError, FrequencyFrame, InputStream};

use crate::stream::SynthStream;
use crate::tap::SampleTap;

pub const DEFAULT_WINDOW: usize = 1_024;

/// Attaches [`FftAnalyser`]s to streams created by `SynthCaptureProvider`.
#[derive(Debug, Clone)]
pub struct FftAnalysisProvider {
    window: usize,
}

impl FftAnalysisProvider {
    /// `window` is rounded up to an even size of at least 2.
    pub fn new(window: usize) -> Self {
        Self {
            window: (window.max(2) + 1) & !1,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Default for FftAnalysisProvider {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl AnalysisProvider for FftAnalysisProvider {
    fn attach(&self, stream: &dyn InputStream) -> Result<Box<dyn Analyser>, CaptureError> {
        let stream = stream
            .as_any()
            .downcast_ref::<SynthStream>()
            .ok_or_else(|| CaptureError::ConfigurationFailed("stream is not a synth stream".into()))?;
        if !stream.is_running() {
            return Err(CaptureError::DeviceUnavailable);
        }
        Ok(Box::new(FftAnalyser::new(stream.tap(), self.window)))
    }
}

/// Hann-windowed real FFT of the newest `window` samples.
///
/// Produces `window / 2` bins from DC upward, each scaled so a full-scale
/// sine centred on a bin reads 1.0.
pub struct FftAnalyser {
    tap: Option<Arc<Mutex<SampleTap>>>,
    plan: Arc<dyn RealToComplex<f32>>,
    hann: Vec<f32>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
    scale: f32,
}

impl FftAnalyser {
    pub(crate) fn new(tap: Arc<Mutex<SampleTap>>, window: usize) -> Self {
        let plan = RealFftPlanner::<f32>::new().plan_fft_forward(window);
        let hann: Vec<f32> = (0..window).map(|i| hann_value(i, window)).collect();
        let scale = 2.0 / hann.iter().sum::<f32>().max(f32::EPSILON);
        Self {
            tap: Some(tap),
            input: plan.make_input_vec(),
            spectrum: plan.make_output_vec(),
            scratch: plan.make_scratch_vec(),
            plan,
            hann,
            scale,
        }
    }

    fn bins(&self) -> usize {
        self.hann.len() / 2
    }
}

impl Analyser for FftAnalyser {
    fn magnitude_snapshot(&mut self) -> FrequencyFrame {
        let Some(tap) = &self.tap else {
            return FrequencyFrame::default();
        };
        let window = self.hann.len();
        let samples = tap.lock().latest(window);

        // Left-pad with silence until the tap has a full window.
        let offset = window - samples.len();
        self.input[..offset].fill(0.0);
        for (i, sample) in samples.iter().enumerate() {
            self.input[offset + i] = sample * self.hann[offset + i];
        }

        if let Err(e) = self
            .plan
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
        {
            log::warn!("FFT failed: {}", e);
            return FrequencyFrame::new(vec![0.0; self.bins()]);
        }

        let magnitudes = self.spectrum[..self.bins()]
            .iter()
            .map(|bin| (bin.norm() * self.scale).clamp(0.0, 1.0))
            .collect();
        FrequencyFrame::new(magnitudes)
    }

    fn detach(&mut self) {
        if self.tap.take().is_some() {
            log::debug!("FFT analyser detached");
        }
    }
}

impl fmt::Debug for FftAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftAnalyser")
            .field("window", &self.hann.len())
            .field("attached", &self.tap.is_some())
            .finish()
    }
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }
    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tap_with(samples: &[f32]) -> Arc<Mutex<SampleTap>> {
        let mut tap = SampleTap::new(4_096);
        tap.write(samples);
        Arc::new(Mutex::new(tap))
    }

    fn sine(frequency: f32, amplitude: f32, rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| amplitude * (2.0 * PI * frequency * n as f32 / rate).sin())
            .collect()
    }

    #[test]
    fn tone_peaks_at_its_bin() {
        // 48 kHz / 1024 = 46.875 Hz per bin; 1500 Hz lands on bin 32.
        let mut analyser = FftAnalyser::new(tap_with(&sine(1_500.0, 0.8, 48_000.0, 2_048)), 1_024);

        let frame = analyser.magnitude_snapshot();

        assert_eq!(frame.bin_count(), 512);
        let (loudest, _) = frame
            .magnitudes
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |best, (i, &m)| if m > best.1 { (i, m) } else { best });
        assert_eq!(loudest, 32);
        approx::assert_abs_diff_eq!(frame.peak(), 0.8, epsilon = 0.02);
    }

    #[test]
    fn silence_is_flat() {
        let mut analyser = FftAnalyser::new(tap_with(&[0.0; 1_024]), 1_024);
        assert!(analyser.magnitude_snapshot().peak() < 1e-6);
    }

    #[test]
    fn short_tap_is_zero_padded() {
        let mut analyser = FftAnalyser::new(tap_with(&sine(1_500.0, 0.8, 48_000.0, 100)), 1_024);
        let frame = analyser.magnitude_snapshot();
        assert_eq!(frame.bin_count(), 512);
        assert!(frame.magnitudes.iter().all(|m| (0.0..=1.0).contains(m)));
    }

    #[test]
    fn detached_analyser_reads_nothing() {
        let mut analyser = FftAnalyser::new(tap_with(&[0.5; 64]), 256);
        analyser.detach();
        analyser.detach();
        assert_eq!(analyser.magnitude_snapshot().bin_count(), 0);
    }

    #[test]
    fn provider_rounds_window_to_even() {
        assert_eq!(FftAnalysisProvider::new(1_023).window(), 1_024);
        assert_eq!(FftAnalysisProvider::new(0).window(), 2);
    }
}
