use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::controller::PlaybackCommand;
use crate::waveform::WaveformBuffer;

/// Global stream handle — cpal::Stream is !Send so it can't live inside the
/// player itself. Kept alive here so output doesn't stop when the player is
/// passed around.
static PLAYBACK_STREAM: Mutex<Option<StreamHolder>> = Mutex::new(None);

/// Wrapper to make cpal::Stream storable in a Mutex (it's !Send but we only
/// touch it during setup/teardown on one thread).
struct StreamHolder(cpal::Stream);
unsafe impl Send for StreamHolder {}

struct PlayerInner {
    samples: Vec<f32>,
    sample_rate: u32,
    duration: f64,
    speed: f32,
    stream_started: bool,
}

/// The external playback engine: plays a decoded mono buffer through the
/// default output device and reports position via a lock-free atomic the
/// tick loop polls. It executes [`PlaybackCommand`]s and never touches the
/// timeline itself.
pub struct Player {
    inner: Arc<Mutex<PlayerInner>>,
    /// Lock-free position (f64 bits stored as u64)
    position: Arc<AtomicU64>,
    playing: Arc<AtomicBool>,
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

impl Player {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(PlayerInner {
                samples: Vec::new(),
                sample_rate: 44100,
                duration: 0.0,
                speed: 1.0,
                stream_started: false,
            })),
            position: Arc::new(AtomicU64::new(0)),
            playing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn position(&self) -> f64 {
        f64::from_bits(self.position.load(Ordering::Relaxed))
    }

    fn set_position(&self, pos: f64) {
        self.position.store(pos.to_bits(), Ordering::Relaxed);
    }

    pub fn duration(&self) -> f64 {
        self.inner.lock().map(|i| i.duration).unwrap_or(0.0)
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    /// Install a decoded source and start the output stream if needed.
    pub fn load(&self, buffer: &WaveformBuffer) -> Result<(), String> {
        {
            let mut inner = self.inner.lock().map_err(|e| e.to_string())?;
            inner.samples = buffer.samples.clone();
            inner.sample_rate = buffer.sample_rate;
            inner.duration = buffer.duration;
        }
        self.set_position(0.0);
        self.playing.store(false, Ordering::Relaxed);

        let needs_stream = {
            let inner = self.inner.lock().map_err(|e| e.to_string())?;
            !inner.stream_started
        };
        if needs_stream {
            let stream = build_output_stream(&self.inner, &self.position, &self.playing)?;
            stream.play().map_err(|e| format!("Failed to start output: {}", e))?;
            if let Ok(mut inner) = self.inner.lock() {
                inner.stream_started = true;
            }
            if let Ok(mut guard) = PLAYBACK_STREAM.lock() {
                *guard = Some(StreamHolder(stream));
            }
        }
        log::info!("player loaded {:.2}s of audio @ {}Hz", buffer.duration, buffer.sample_rate);
        Ok(())
    }

    pub fn play(&self) {
        self.playing.store(true, Ordering::Relaxed);
    }

    pub fn pause(&self) {
        self.playing.store(false, Ordering::Relaxed);
    }

    pub fn toggle(&self) {
        let playing = self.playing.load(Ordering::Relaxed);
        self.playing.store(!playing, Ordering::Relaxed);
    }

    pub fn seek(&self, t: f64) {
        let duration = self.duration();
        self.set_position(t.max(0.0).min(duration));
    }

    pub fn set_speed(&self, speed: f32) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.speed = speed;
        }
    }

    /// Execute one command from the loop controller.
    pub fn apply(&self, command: PlaybackCommand) {
        match command {
            PlaybackCommand::SeekTo(t) => self.seek(t),
            PlaybackCommand::Resume => self.play(),
        }
    }
}

fn build_output_stream(
    inner: &Arc<Mutex<PlayerInner>>,
    position: &Arc<AtomicU64>,
    playing: &Arc<AtomicBool>,
) -> Result<cpal::Stream, String> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or("No output device available")?;

    let supported = device
        .default_output_config()
        .map_err(|e| format!("Failed to get output config: {}", e))?;

    let out_rate = supported.sample_rate().0;
    let out_channels = supported.channels() as usize;
    let config: cpal::StreamConfig = supported.into();

    let inner_ref = inner.clone();
    let position_ref = position.clone();
    let playing_ref = playing.clone();

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if !playing_ref.load(Ordering::Relaxed) {
                    for s in data.iter_mut() {
                        *s = 0.0;
                    }
                    return;
                }

                let Ok(inner) = inner_ref.lock() else {
                    for s in data.iter_mut() {
                        *s = 0.0;
                    }
                    return;
                };

                let speed = inner.speed.max(0.01) as f64;
                let src_rate = inner.sample_rate as f64;
                let mut pos = f64::from_bits(position_ref.load(Ordering::Relaxed));

                let frame_count = data.len() / out_channels;
                for frame_idx in 0..frame_count {
                    // Stop at end of media; the host sees position pinned
                    // at the end and playing flipped off.
                    if pos >= inner.duration {
                        playing_ref.store(false, Ordering::Relaxed);
                        for s in &mut data[frame_idx * out_channels..] {
                            *s = 0.0;
                        }
                        pos = inner.duration;
                        break;
                    }

                    // Nearest-sample lookup; speed changes pitch, which is
                    // what the rate ladder asks for.
                    let sample_idx = (pos * src_rate) as usize;
                    let sample = inner.samples.get(sample_idx).copied().unwrap_or(0.0);

                    let base = frame_idx * out_channels;
                    for c in 0..out_channels {
                        data[base + c] = sample;
                    }

                    pos += speed / out_rate as f64;
                }

                position_ref.store(pos.to_bits(), Ordering::Relaxed);
            },
            |err| {
                log::error!("Playback output error: {}", err);
            },
            None,
        )
        .map_err(|e| format!("Failed to build output stream: {}", e))?;

    Ok(stream)
}
