mod buffer;
mod decode;
mod features;
mod render;
mod spectrogram;

pub use buffer::AudioBuffer;
pub use decode::AudioDecoder;
pub use features::InstrumentalFeatures;
#[allow(unused_imports)]
pub use features::PitchClass;
#[allow(unused_imports)]
pub use spectrogram::{MelSpectrogram, Spectrogram, StftParams};

#[cfg(test)]
pub(crate) use decode::tests::write_wav;

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::error::AudioError;

/// Tempo, texture and tonal descriptors of an audio file
#[derive(Debug, Clone, Default)]
pub struct AudioFeatureExtractor {
    params: StftParams,
}

impl AudioFeatureExtractor {
    #[allow(dead_code)]
    pub fn new(params: StftParams) -> Self {
        Self { params }
    }

    /// Compute features of a mono waveform
    #[allow(dead_code)]
    pub fn extract(&self, audio: &AudioBuffer) -> Result<InstrumentalFeatures, AudioError> {
        Ok(self.analyze(audio)?.0)
    }

    /// Features plus the dB Mel spectrogram they were derived from
    fn analyze(&self, audio: &AudioBuffer) -> Result<(InstrumentalFeatures, Vec<Vec<f32>>), AudioError> {
        if audio.sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate(audio.sample_rate));
        }
        if audio.len() < self.params.n_fft {
            return Err(AudioError::AudioTooShort(self.params.n_fft));
        }

        let spectrogram = Spectrogram::compute(&audio.samples, audio.sample_rate, &self.params);
        let freqs = spectrogram.frequencies();
        let mel = spectrogram.to_mel(self.params.n_mels);
        let band_axis = mel.band_axis(audio.sample_rate);
        let db_mel = mel.to_db();
        debug!(frames = spectrogram.n_frames(), "Spectrogram computed");

        let frame_rate = audio.sample_rate as f32 / self.params.hop as f32;
        let onset = features::onset_strength(&db_mel);
        let chroma = features::mean_chroma(&spectrogram.frames, &freqs);

        let features = InstrumentalFeatures {
            tempo: features::estimate_tempo(&onset, frame_rate),
            average_spectral_contrast: features::spectral_contrast(&mel.bands, &band_axis) / 100.0,
            spectral_bandwidth: features::spectral_bandwidth(&mel.bands, &band_axis),
            dominant_note: features::dominant_note(&chroma),
        };
        Ok((features, db_mel))
    }

    /// Decode `path` and extract features; optionally render the Mel spectrogram
    ///
    /// Rendering is best-effort: a failure is logged and the features are still returned.
    #[instrument(skip(self))]
    pub fn extract_file(
        &self,
        path: &Path,
        spectrogram_png: Option<&Path>,
    ) -> Result<InstrumentalFeatures, AudioError> {
        let audio = AudioDecoder::decode_file(path)?;
        let (features, db_mel) = self.analyze(&audio)?;

        if let Some(png) = spectrogram_png {
            match render::render_png(&db_mel, png) {
                Ok(()) => info!(path = ?png, "Mel spectrogram saved"),
                Err(e) => warn!(error = %e, "Could not render spectrogram"),
            }
        }

        info!(
            tempo = features.tempo,
            contrast = features.average_spectral_contrast,
            bandwidth = features.spectral_bandwidth,
            note = %features.dominant_note,
            "Instrumental features extracted"
        );
        Ok(features)
    }

    /// `extract_file` on the blocking pool
    pub async fn extract_file_blocking(
        &self,
        path: PathBuf,
        spectrogram_png: Option<PathBuf>,
    ) -> Result<InstrumentalFeatures, AudioError> {
        let extractor = self.clone();
        tokio::task::spawn_blocking(move || extractor.extract_file(&path, spectrogram_png.as_deref()))
            .await
            .map_err(|e| AudioError::Task(e.to_string()))?
    }
}
