use std::time::Duration;

use rodio::{OutputStream, OutputStreamBuilder, Sink, Source};
use tracing::{debug, warn};

pub const SAMPLE_RATE: u32 = 44_100;
pub const START_HZ: f32 = 440.0;
pub const TARGET_HZ: f32 = 880.0;
pub const RAMP_SECONDS: f32 = 0.1;
pub const GAIN: f32 = 0.1;

/// Continuous alert sound. Both calls are idempotent.
pub trait AlarmTone {
    fn start(&mut self);
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
}

/// Square wave that sweeps 440 Hz to 880 Hz over the first 100 ms, then holds.
#[derive(Debug, Clone)]
pub struct RisingSquareWave {
    sample_rate: u32,
    index: u64,
    phase: f32,
}

impl RisingSquareWave {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            index: 0,
            phase: 0.0,
        }
    }

    pub fn frequency_at(seconds: f32) -> f32 {
        if seconds >= RAMP_SECONDS {
            TARGET_HZ
        } else {
            START_HZ * (TARGET_HZ / START_HZ).powf(seconds.max(0.0) / RAMP_SECONDS)
        }
    }
}

impl Iterator for RisingSquareWave {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let seconds = self.index as f32 / self.sample_rate as f32;
        let sample = if self.phase < 0.5 { GAIN } else { -GAIN };
        self.phase = (self.phase + Self::frequency_at(seconds) / self.sample_rate as f32).fract();
        self.index = self.index.saturating_add(1);
        Some(sample)
    }
}

impl Source for RisingSquareWave {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// Plays [`RisingSquareWave`] on the default output device.
///
/// The device is opened on every start and released on stop. When no device
/// is available the tone stays silent; the alarm keeps firing regardless.
#[derive(Default)]
pub struct SquareTone {
    output: Option<(OutputStream, Sink)>,
}

impl SquareTone {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AlarmTone for SquareTone {
    fn start(&mut self) {
        if self.output.is_some() {
            return;
        }
        let mut stream = match OutputStreamBuilder::open_default_stream() {
            Ok(stream) => stream,
            Err(err) => {
                warn!("audio output unavailable, alarm will be silent: {err}");
                return;
            }
        };
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());
        sink.append(RisingSquareWave::new(SAMPLE_RATE));
        debug!("alarm tone started");
        self.output = Some((stream, sink));
    }

    fn stop(&mut self) {
        if let Some((stream, sink)) = self.output.take() {
            sink.stop();
            drop(stream);
            debug!("alarm tone stopped");
        }
    }

    fn is_playing(&self) -> bool {
        self.output.is_some()
    }
}

impl Drop for SquareTone {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Used with `--no-sound`; tracks state without touching audio hardware.
#[derive(Debug, Default)]
pub struct SilentTone {
    playing: bool,
}

impl AlarmTone for SilentTone {
    fn start(&mut self) {
        self.playing = true;
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

impl AlarmTone for Box<dyn AlarmTone> {
    fn start(&mut self) {
        self.as_mut().start();
    }

    fn stop(&mut self) {
        self.as_mut().stop();
    }

    fn is_playing(&self) -> bool {
        self.as_ref().is_playing()
    }
}
