//! # recorder-core
//!
//! Platform-agnostic audio recorder/player session.
//!
//! Provides the session state machine, capture-resource lifetime management,
//! elapsed-time tracking, the visualization feed and the playback cursor.
//! Platform backends implement `CaptureProvider` and `AnalysisProvider` and
//! plug into `RecorderSession`.
//!
//! ## Architecture
//!
//! ```text
//! recorder-core (this crate)
//! ├── traits/       ← CaptureProvider, AnalysisProvider, SessionDelegate, VisualizationSink, Clock
//! ├── models/       ← CaptureError, SessionState, SessionConfiguration, Recording, PlaybackSource
//! ├── processing/   ← PCM encode/decode, WAV header generation, level metering
//! └── session/      ← RecorderSession, RecordButton, capture resources, timing, feeds, playback
//! ```
//!
//! ## Usage
//! ```ignore
//! use recorder_core::RecorderSession;
//!
//! let session = RecorderSession::builder(provider, analysis).build()?;
//! session.record()?.wait();
//! session.stop()?;
//! let take = session.recording();
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

#[cfg(test)]
mod test_support;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioSource, EncodingFormat, FrequencyFrame, StreamInfo};
pub use models::config::SessionConfiguration;
pub use models::error::{CaptureError, Operation};
pub use models::recording::{PlaybackSource, Recording, RecordingMetadata, SourceHandle};
pub use models::state::SessionState;
pub use session::controls::RecordButton;
pub use session::feed::FeedKind;
pub use session::recorder::{AcquisitionHandle, RecorderSession, SessionBuilder};
pub use traits::analysis::{Analyser, AnalysisProvider};
pub use traits::capture_delegate::SessionDelegate;
pub use traits::capture_provider::{CaptureProvider, ChunkCallback, Encoder, InputStream};
pub use traits::clock::{Clock, ManualClock, SystemClock};
pub use traits::visualization::VisualizationSink;
