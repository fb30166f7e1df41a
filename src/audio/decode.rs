use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, instrument, warn};

use crate::error::AudioError;

use super::buffer::AudioBuffer;

/// Audio decoder backed by symphonia
pub struct AudioDecoder;

impl AudioDecoder {
    /// Decode an audio file to a mono buffer at its native sample rate
    #[instrument]
    pub fn decode_file(path: &Path) -> Result<AudioBuffer, AudioError> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| AudioError::DecodeError(format!("unsupported format: {}", e)))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AudioError::DecodeError("no audio track".into()))?;
        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::DecodeError(format!("unsupported codec: {}", e)))?;

        let mut interleaved = Vec::<f32>::new();
        let mut channels = 1usize;

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(AudioError::DecodeError(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate = spec.rate;
                    channels = spec.channels.count();

                    let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    sample_buf.copy_interleaved_ref(decoded);
                    interleaved.extend_from_slice(sample_buf.samples());
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt packet, keep going
                    warn!(error = e, "Skipping undecodable packet");
                }
                Err(e) => return Err(AudioError::DecodeError(e.to_string())),
            }
        }

        if sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate(sample_rate));
        }
        if interleaved.is_empty() {
            return Err(AudioError::DecodeError("no samples decoded".into()));
        }

        let buffer = AudioBuffer::from_interleaved(&interleaved, channels, sample_rate);
        debug!(
            samples = buffer.len(),
            sample_rate,
            channels,
            duration_secs = buffer.duration_secs(),
            "Decode complete"
        );
        Ok(buffer)
    }
}
