use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use recorder_core::processing::pcm;
use recorder_core::{CaptureError, ChunkCallback, Encoder, EncodingFormat};

use crate::stream::{BlockSink, SinkSlot, SynthStream};

/// Raw PCM encoder attached to a [`SynthStream`].
///
/// Every generator block is converted to the target format and delivered
/// through the data callback as one chunk. Blocks arriving while paused are
/// dropped.
pub struct SynthEncoder {
    format: EncodingFormat,
    paused: Arc<AtomicBool>,
    slot: Option<(SinkSlot, u64)>,
    emitted: Arc<AtomicUsize>,
}

impl SynthEncoder {
    pub(crate) fn attach(
        stream: &SynthStream,
        format: EncodingFormat,
        on_data: ChunkCallback,
    ) -> Result<Self, CaptureError> {
        if !format.is_raw_pcm() {
            return Err(CaptureError::UnsupportedFormat(format));
        }

        let paused = Arc::new(AtomicBool::new(false));
        let emitted = Arc::new(AtomicUsize::new(0));
        let sink: BlockSink = {
            let paused = Arc::clone(&paused);
            let emitted = Arc::clone(&emitted);
            Arc::new(move |samples: &[f32]| {
                if paused.load(Ordering::SeqCst) {
                    return;
                }
                if let Some(bytes) = pcm::encode(format, samples) {
                    emitted.fetch_add(bytes.len(), Ordering::Relaxed);
                    on_data(bytes.as_slice());
                }
            })
        };

        let slot = stream.attach_sink(sink)?;
        log::debug!("Synth {} encoder attached", format);
        Ok(Self {
            format,
            paused,
            slot: Some(slot),
            emitted,
        })
    }

    /// Bytes delivered through the data callback so far.
    pub fn bytes_emitted(&self) -> usize {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Unhook from the stream. Once this returns no further chunk is delivered.
    fn detach(&mut self) {
        let Some((slot, id)) = self.slot.take() else {
            return;
        };
        let mut current = slot.lock();
        if current.as_ref().is_some_and(|(attached, _)| *attached == id) {
            current.take();
        }
    }
}

impl Encoder for SynthEncoder {
    fn format(&self) -> EncodingFormat {
        self.format
    }

    fn pause(&mut self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&mut self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    fn finalize(mut self: Box<Self>) -> Result<Vec<u8>, CaptureError> {
        self.detach();
        log::debug!("Synth {} encoder finalized after {} bytes", self.format, self.bytes_emitted());
        // Every block was already emitted as it arrived.
        Ok(Vec::new())
    }
}

impl Drop for SynthEncoder {
    fn drop(&mut self) {
        self.detach();
    }
}
