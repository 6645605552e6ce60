use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hound::{SampleFormat, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};

/// Typed recorder errors. Surfaced to the caller as a message; the
/// timeline engine never sees these.
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
    #[error("Stream open failed: {0}")]
    StreamOpenFailed(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Already recording")]
    AlreadyRecording,
    #[error("Not recording")]
    NotRecording,
    #[error("WAV write error: {0}")]
    Wav(#[from] hound::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The playable resource a finished recording resolves to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingResult {
    pub path: String,
    pub duration: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

/// cpal::Stream is !Send; the holder keeps it alive inside the recorder,
/// which is only touched from the event thread.
struct InputHolder(cpal::Stream);
unsafe impl Send for InputHolder {}

struct ActiveRecording {
    _stream: InputHolder,
    writer: Arc<Mutex<Option<WavWriter<BufWriter<File>>>>>,
    frames_written: Arc<AtomicU64>,
    path: PathBuf,
    sample_rate: u32,
    channels: u16,
}

/// Opaque start/stop microphone capture to a timestamped f32 WAV file.
///
/// Start acquires the default input device and begins writing immediately;
/// stop finalizes the file and reports the result through the supplied
/// callback. Failures come back as [`RecorderError`] for the caller to
/// surface — recording state is simply "not recording" again afterwards.
#[derive(Default)]
pub struct Recorder {
    active: Option<ActiveRecording>,
}

fn recording_filename(now: chrono::DateTime<chrono::Local>) -> String {
    format!("shadow-rec-{}.wav", now.format("%Y%m%d-%H%M%S"))
}

fn classify_build_error(err: cpal::BuildStreamError) -> RecorderError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => {
            RecorderError::DeviceNotFound("input device disappeared".to_string())
        }
        other => {
            let msg = other.to_string();
            if msg.to_ascii_lowercase().contains("permission") {
                RecorderError::PermissionDenied(msg)
            } else {
                RecorderError::StreamOpenFailed(msg)
            }
        }
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Begin capturing from the default input device into `dir`.
    pub fn start(&mut self, dir: &Path) -> Result<(), RecorderError> {
        if self.active.is_some() {
            return Err(RecorderError::AlreadyRecording);
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| RecorderError::DeviceNotFound("no default input device".to_string()))?;

        let supported = device
            .default_input_config()
            .map_err(|e| RecorderError::BackendUnavailable(e.to_string()))?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();
        let config: cpal::StreamConfig = supported.into();

        let path = dir.join(recording_filename(chrono::Local::now()));
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let writer = Arc::new(Mutex::new(Some(WavWriter::create(&path, spec)?)));
        let frames_written = Arc::new(AtomicU64::new(0));

        let writer_ref = writer.clone();
        let frames_ref = frames_written.clone();
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let Ok(mut guard) = writer_ref.lock() else { return };
                    let Some(w) = guard.as_mut() else { return };
                    for &s in data {
                        if let Err(e) = w.write_sample(s) {
                            log::error!("WAV write error: {}", e);
                            return;
                        }
                    }
                    frames_ref.fetch_add((data.len() / channels as usize) as u64, Ordering::Relaxed);
                },
                |err| {
                    log::error!("Recording input error: {}", err);
                },
                None,
            )
            .map_err(classify_build_error)?;

        stream
            .play()
            .map_err(|e| RecorderError::StreamOpenFailed(e.to_string()))?;

        log::info!("recording to {} ({}Hz {}ch)", path.display(), sample_rate, channels);
        self.active = Some(ActiveRecording {
            _stream: InputHolder(stream),
            writer,
            frames_written,
            path,
            sample_rate,
            channels,
        });
        Ok(())
    }

    /// Stop the capture, finalize the WAV and deliver the result.
    pub fn stop(
        &mut self,
        on_complete: impl FnOnce(RecordingResult),
    ) -> Result<(), RecorderError> {
        let active = self.active.take().ok_or(RecorderError::NotRecording)?;

        // Dropping the stream stops the callback; then the writer can be
        // taken and finalized.
        drop(active._stream);
        let writer = active
            .writer
            .lock()
            .map_err(|e| RecorderError::StreamOpenFailed(e.to_string()))?
            .take();
        if let Some(w) = writer {
            w.finalize()?;
        }

        let frames = active.frames_written.load(Ordering::Relaxed);
        let result = RecordingResult {
            path: active.path.to_string_lossy().into_owned(),
            duration: frames as f64 / active.sample_rate.max(1) as f64,
            sample_rate: active.sample_rate,
            channels: active.channels,
        };
        log::info!("recording finished: {} ({:.2}s)", result.path, result.duration);
        on_complete(result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn filename_is_timestamped_wav() {
        let t = chrono::Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 30).unwrap();
        assert_eq!(recording_filename(t), "shadow-rec-20240309-140530.wav");
    }

    #[test]
    fn stop_without_start_is_not_recording() {
        let mut rec = Recorder::new();
        assert!(!rec.is_recording());
        let err = rec.stop(|_| panic!("no result expected")).unwrap_err();
        assert!(matches!(err, RecorderError::NotRecording));
    }

    #[test]
    fn error_messages_are_user_presentable() {
        let e = RecorderError::DeviceNotFound("no default input device".to_string());
        assert_eq!(e.to_string(), "Device not found: no default input device");
        let e = RecorderError::PermissionDenied("microphone access denied".to_string());
        assert!(e.to_string().contains("Permission denied"));
    }
}
