use crate::models::audio_models::FrequencyFrame;
use crate::models::error::CaptureError;
use crate::traits::capture_provider::InputStream;

/// Platform audio-analysis facility.
pub trait AnalysisProvider: Send + Sync {
    /// Build an analysis graph reading from `stream`.
    fn attach(&self, stream: &dyn InputStream) -> Result<Box<dyn Analyser>, CaptureError>;
}

/// An attached analysis graph.
pub trait Analyser: Send {
    /// Latest frequency-magnitude frame.
    fn magnitude_snapshot(&mut self) -> FrequencyFrame;

    /// Tear down the graph. Must be idempotent.
    fn detach(&mut self);
}
