//! Records a short synthetic tone through a full `RecorderSession` and prints
//! the recording's metadata as JSON.

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use parking_lot::Mutex;

use recorder_core::{
    CaptureError, EncodingFormat, FrequencyFrame, Recording, RecorderSession, SessionConfiguration, SessionDelegate,
    SessionState, StreamInfo, VisualizationSink,
};
use recorder_synth::{FftAnalysisProvider, PermissionOutcome, SynthCaptureProvider, SynthConfig, Tone};

/// Record a synthetic tone: record, pause, resume, stop.
#[derive(Parser, Debug)]
#[command(name = "synth-record")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Seconds to record before and after the pause
    #[arg(long, default_value = "0.5", value_parser = parse_seconds)]
    segment: Duration,

    /// Seconds to stay paused
    #[arg(long, default_value = "0.25", value_parser = parse_seconds)]
    pause: Duration,

    /// Tone frequency in Hz
    #[arg(long, default_value_t = 440.0)]
    tone: f32,

    #[arg(long, value_enum, default_value_t = Format::Pcm16)]
    format: Format,

    /// Simulated permission outcome: granted, denied or no-device
    #[arg(long, default_value = "granted")]
    permission: PermissionOutcome,

    /// Stop automatically after this many seconds
    #[arg(long, value_parser = parse_seconds)]
    max_duration: Option<Duration>,

    /// Write the take as a WAV file (pcm16 only)
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Pcm16,
    Float32,
    Opus,
}

impl From<Format> for EncodingFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Pcm16 => EncodingFormat::Pcm16,
            Format::Float32 => EncodingFormat::Float32,
            Format::Opus => EncodingFormat::Opus,
        }
    }
}

/// Parse a non-negative, finite number of seconds.
fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", value))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration '{}': {}", value, e))
}

impl Args {
    fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Logs session events.
struct ConsoleDelegate;

impl SessionDelegate for ConsoleDelegate {
    fn on_state_changed(&self, state: &SessionState) {
        log::info!("state: {}", state.name());
    }

    fn on_elapsed(&self, elapsed: Duration) {
        log::trace!("elapsed: {:.2}s", elapsed.as_secs_f64());
    }

    fn on_error(&self, error: &CaptureError) {
        log::error!("session error: {}", error);
    }

    fn on_recording_finished(&self, recording: &Recording) {
        log::info!(
            "finished: {:.2}s, {} bytes of {}",
            recording.duration.as_secs_f64(),
            recording.data.len(),
            recording.format
        );
    }
}

/// Tracks the loudest bin seen across live frames.
#[derive(Default)]
struct PeakSink {
    frames: AtomicUsize,
    loudest: Mutex<(usize, f32)>,
}

impl VisualizationSink for PeakSink {
    fn on_live_frame(&self, frame: &FrequencyFrame) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        let mut loudest = self.loudest.lock();
        for (bin, &magnitude) in frame.magnitudes.iter().enumerate() {
            if magnitude > loudest.1 {
                *loudest = (bin, magnitude);
            }
        }
    }

    fn on_playback_tick(&self, _position: Duration, _duration: Duration) {}

    fn on_finish(&self) {}
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .filter_module("recorder_core", args.log_level())
        .filter_module("recorder_synth", args.log_level())
        .filter_module("synth_record", args.log_level())
        .init();

    let stream = StreamInfo::default();
    let provider = Arc::new(SynthCaptureProvider::new(SynthConfig {
        tone: Tone {
            frequency: args.tone,
            amplitude: 0.5,
        },
        stream,
        permission: args.permission,
        acquisition_latency: Duration::from_millis(20),
    }));
    let analysis = Arc::new(FftAnalysisProvider::default());
    let sink = Arc::new(PeakSink::default());

    let mut config = SessionConfiguration {
        preferred_format: args.format.into(),
        ..Default::default()
    };
    if let Some(max) = args.max_duration {
        config = config.with_max_duration(max);
    }

    let session = RecorderSession::builder(provider, analysis.clone())
        .config(config)
        .delegate(Arc::new(ConsoleDelegate))
        .sink(sink.clone())
        .build()?;

    session.record()?.wait();
    if let Some(err) = session.error() {
        return Err(err.into());
    }

    thread::sleep(args.segment);
    // a short --max-duration may already have stopped the take
    if session.state().is_recording() {
        session.pause()?;
        thread::sleep(args.pause);
        session.resume()?;
        thread::sleep(args.segment);
    }
    if session.state().is_capturing() {
        session.stop()?;
    }

    let recording = session.recording().ok_or("session stopped without a recording")?;

    if let Some(path) = &args.wav {
        match recording.to_wav() {
            Some(wav) => {
                fs::write(path, wav)?;
                log::info!("wrote {}", path.display());
            }
            None => log::warn!("--wav needs pcm16 output; got {}", recording.format),
        }
    }

    let (bin, magnitude) = *sink.loudest.lock();
    let bin_hz = f64::from(stream.sample_rate) / analysis.window() as f64;
    let summary = serde_json::json!({
        "recording": recording.metadata(),
        "live_frames": sink.frames.load(Ordering::Relaxed),
        "dominant_hz": bin as f64 * bin_hz,
        "dominant_magnitude": magnitude,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
