//! Synthetic input stream.
//!
//! Generates a sine tone on a dedicated thread in ~10 ms blocks, feeding a
//! shared [`SampleTap`] for analysis and the attached encoder, if any.

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use recorder_core::{CaptureError, InputStream, StreamInfo};

use crate::tap::SampleTap;

const BLOCK: Duration = Duration::from_millis(10);

/// Mono samples kept for analysers: ~170 ms at 48 kHz.
const TAP_CAPACITY: usize = 8_192;

/// Consumer of interleaved sample blocks.
pub(crate) type BlockSink = Arc<dyn Fn(&[f32]) + Send + Sync>;

/// Encoder attachment point: `(encoder id, sink)`.
pub(crate) type SinkSlot = Arc<Mutex<Option<(u64, BlockSink)>>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency: f32,
    pub amplitude: f32,
}

pub struct SynthStream {
    info: StreamInfo,
    tap: Arc<Mutex<SampleTap>>,
    sink: SinkSlot,
    next_encoder_id: AtomicU64,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
    live_streams: Arc<AtomicUsize>,
}

impl SynthStream {
    pub(crate) fn start(tone: Tone, info: StreamInfo, live_streams: Arc<AtomicUsize>) -> Result<Self, CaptureError> {
        let tap = Arc::new(Mutex::new(SampleTap::new(TAP_CAPACITY)));
        let sink: SinkSlot = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));

        let handle = {
            let tap = Arc::clone(&tap);
            let sink = Arc::clone(&sink);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("synth-generator".into())
                .spawn(move || generate(running, tone, info, tap, sink))
                .map_err(|e| CaptureError::Unknown(format!("failed to spawn generator thread: {}", e)))?
        };

        live_streams.fetch_add(1, Ordering::SeqCst);
        log::debug!(
            "Synth stream started: {:.0} Hz tone, {} Hz, {} ch",
            tone.frequency,
            info.sample_rate,
            info.channels
        );
        Ok(Self {
            info,
            tap,
            sink,
            next_encoder_id: AtomicU64::new(0),
            running,
            handle: Some(handle),
            live_streams,
        })
    }

    pub(crate) fn tap(&self) -> Arc<Mutex<SampleTap>> {
        Arc::clone(&self.tap)
    }

    /// Install `sink` as the stream's only encoder input.
    pub(crate) fn attach_sink(&self, sink: BlockSink) -> Result<(SinkSlot, u64), CaptureError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(CaptureError::DeviceUnavailable);
        }
        let mut slot = self.sink.lock();
        if slot.is_some() {
            return Err(CaptureError::ConfigurationFailed(
                "stream already has an encoder attached".into(),
            ));
        }
        let id = self.next_encoder_id.fetch_add(1, Ordering::SeqCst);
        *slot = Some((id, sink));
        Ok((Arc::clone(&self.sink), id))
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl InputStream for SynthStream {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn release(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.join().is_err() {
            log::error!("Synth generator thread panicked");
        }
        self.sink.lock().take();
        self.live_streams.fetch_sub(1, Ordering::SeqCst);
        log::debug!("Synth stream released");
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Drop for SynthStream {
    fn drop(&mut self) {
        self.release();
    }
}

/// Generator loop. Produces as many frames as wall-clock time says are due,
/// in blocks of at most 10 ms.
fn generate(running: Arc<AtomicBool>, tone: Tone, info: StreamInfo, tap: Arc<Mutex<SampleTap>>, sink: SinkSlot) {
    let rate = f64::from(info.sample_rate.max(1));
    let channels = usize::from(info.channels.max(1));
    let block_frames = (info.sample_rate / 100).max(1) as u64;
    let step = TAU * f64::from(tone.frequency) / rate;

    let started = Instant::now();
    let mut produced: u64 = 0;
    let mut phase = 0.0f64;

    while running.load(Ordering::SeqCst) {
        thread::sleep(BLOCK);
        let due = (started.elapsed().as_secs_f64() * rate) as u64;

        while produced < due && running.load(Ordering::SeqCst) {
            let frames = (due - produced).min(block_frames) as usize;
            let mono: Vec<f32> = (0..frames)
                .map(|_| {
                    let sample = tone.amplitude * phase.sin() as f32;
                    phase = (phase + step) % TAU;
                    sample
                })
                .collect();
            produced += frames as u64;

            tap.lock().write(&mono);
            if let Some((_, deliver)) = sink.lock().as_ref() {
                if channels == 1 {
                    deliver(&mono);
                } else {
                    deliver(&interleave(&mono, channels));
                }
            }
        }
    }
}

fn interleave(mono: &[f32], channels: usize) -> Vec<f32> {
    mono.iter()
        .flat_map(|&s| std::iter::repeat(s).take(channels))
        .collect()
}
