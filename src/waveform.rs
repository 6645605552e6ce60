use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Errors from the media decoding service.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Failed to open file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to probe format: {0}")]
    Probe(String),
    #[error("No audio tracks found")]
    NoAudioTrack,
    #[error("Failed to create decoder: {0}")]
    Decoder(String),
    #[error("Decoded stream is empty")]
    Empty,
}

/// Decoded amplitude buffer the engine renders from: mono samples plus the
/// media duration derived from them. The engine itself never decodes; this
/// is the collaborator that hands it a finished buffer.
#[derive(Debug, Clone)]
pub struct WaveformBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub duration: f64,
}

impl WaveformBuffer {
    /// Build from already-interleaved PCM, mixing all channels down to mono.
    pub fn from_interleaved(samples: &[f32], channels: usize, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let mono: Vec<f32> = samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        let duration = mono.len() as f64 / sample_rate.max(1) as f64;
        Self { samples: mono, sample_rate, duration }
    }

    /// Decode an audio (or video container) file into a mono buffer.
    pub fn decode_file(path: &Path) -> Result<Self, MediaError> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| MediaError::Probe(e.to_string()))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
            .ok_or(MediaError::NoAudioTrack)?;

        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
        let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| MediaError::Decoder(e.to_string()))?;

        let mut interleaved: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => {
                    log::warn!("decode stopped early: {}", e);
                    break;
                }
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(e) => {
                    log::warn!("skipping undecodable packet: {}", e);
                    continue;
                }
            };

            let spec = *decoded.spec();
            let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            interleaved.extend_from_slice(sample_buf.samples());
        }

        if interleaved.is_empty() {
            return Err(MediaError::Empty);
        }

        let buffer = Self::from_interleaved(&interleaved, channels, sample_rate);
        log::info!(
            "decoded {}: {:.2}s, {} mono samples @ {}Hz",
            path.display(),
            buffer.duration,
            buffer.samples.len(),
            buffer.sample_rate,
        );
        Ok(buffer)
    }
}
