//! # recorder-synth
//!
//! Synthetic capture backend for recorder-core.
//!
//! Provides:
//! - `SynthCaptureProvider`: sine-tone "microphone" with simulated permission outcomes
//! - `SynthEncoder`: raw PCM16/Float32 encoder fed by the generator thread
//! - `FftAnalysisProvider`: Hann-windowed FFT analyser over the stream's sample tap
//! - `SampleTap`: windowed buffer of the newest samples
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use recorder_core::RecorderSession;
//! use recorder_synth::{FftAnalysisProvider, SynthCaptureProvider};
//!
//! let session = RecorderSession::builder(
//!     Arc::new(SynthCaptureProvider::default()),
//!     Arc::new(FftAnalysisProvider::default()),
//! )
//! .build()?;
//! ```

pub mod analysis;
pub mod encoder;
pub mod permissions;
pub mod provider;
pub mod stream;
pub mod tap;

pub use analysis::{FftAnalyser, FftAnalysisProvider};
pub use encoder::SynthEncoder;
pub use permissions::PermissionOutcome;
pub use provider::{SynthCaptureProvider, SynthConfig, DEVICE_ID};
pub use stream::{SynthStream, Tone};
pub use tap::SampleTap;
