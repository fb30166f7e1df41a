use std::f32::consts::PI;

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Short-time Fourier transform settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StftParams {
    pub n_fft: usize,
    pub hop: usize,
    pub n_mels: usize,
}

impl Default for StftParams {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop: 512,
            n_mels: 128,
        }
    }
}

/// Power spectrogram, one row of `n_fft / 2 + 1` bins per frame
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub frames: Vec<Vec<f32>>,
    pub sample_rate: u32,
    pub n_fft: usize,
}

impl Spectrogram {
    /// Centred, Hann-windowed power STFT; the signal is zero-padded by `n_fft / 2` on both sides
    pub fn compute(samples: &[f32], sample_rate: u32, params: &StftParams) -> Self {
        let n_fft = params.n_fft;
        let pad = n_fft / 2;

        let mut padded = vec![0.0f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let window = hann_window(n_fft);
        let fft = FftPlanner::<f32>::new().plan_fft_forward(n_fft);
        let n_bins = n_fft / 2 + 1;
        let n_frames = if padded.len() >= n_fft {
            1 + (padded.len() - n_fft) / params.hop
        } else {
            0
        };

        let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];
        let frames = (0..n_frames)
            .map(|i| {
                let start = i * params.hop;
                for (j, slot) in buffer.iter_mut().enumerate() {
                    *slot = Complex::new(padded[start + j] * window[j], 0.0);
                }
                fft.process(&mut buffer);
                buffer[..n_bins].iter().map(|c| c.norm_sqr()).collect()
            })
            .collect();

        Self {
            frames,
            sample_rate,
            n_fft,
        }
    }

    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    /// Centre frequency of each bin in Hz
    pub fn frequencies(&self) -> Vec<f32> {
        let n_bins = self.n_fft / 2 + 1;
        (0..n_bins)
            .map(|k| k as f32 * self.sample_rate as f32 / self.n_fft as f32)
            .collect()
    }

    /// Project onto the Mel filterbank
    pub fn to_mel(&self, n_mels: usize) -> MelSpectrogram {
        let filters = mel_filterbank(self.sample_rate, self.n_fft, n_mels);
        let bands = self
            .frames
            .iter()
            .map(|frame| {
                filters
                    .iter()
                    .map(|weights| weights.iter().zip(frame).map(|(w, p)| w * p).sum())
                    .collect()
            })
            .collect();
        MelSpectrogram { bands }
    }
}

/// Mel power spectrogram, one row of `n_mels` bands per frame
#[derive(Debug, Clone)]
pub struct MelSpectrogram {
    pub bands: Vec<Vec<f32>>,
}

impl MelSpectrogram {
    /// Bands read as evenly spaced bins from 0 Hz to Nyquist
    ///
    /// Contrast and bandwidth are reported on this axis so their scale matches
    /// descriptors computed straight from a Mel matrix.
    pub fn band_axis(&self, sample_rate: u32) -> Vec<f32> {
        let n_bands = self.bands.first().map_or(0, Vec::len);
        let nyquist = sample_rate as f32 / 2.0;
        (0..n_bands)
            .map(|k| k as f32 * nyquist / (n_bands.max(2) - 1) as f32)
            .collect()
    }

    /// Decibels relative to the loudest cell, floored 80 dB below it
    pub fn to_db(&self) -> Vec<Vec<f32>> {
        const AMIN: f32 = 1e-10;
        const TOP_DB: f32 = 80.0;

        let peak = self
            .bands
            .iter()
            .flatten()
            .fold(AMIN, |acc, &p| acc.max(p));
        let reference = 10.0 * peak.log10();

        self.bands
            .iter()
            .map(|frame| {
                frame
                    .iter()
                    .map(|&p| (10.0 * p.max(AMIN).log10() - reference).max(-TOP_DB))
                    .collect()
            })
            .collect()
    }
}

/// Periodic Hann window
pub fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / n as f32).cos())
        .collect()
}

pub fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

pub fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular filters spanning 0 Hz to Nyquist, one row per band
pub fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Vec<Vec<f32>> {
    let n_bins = n_fft / 2 + 1;
    let mel_max = hz_to_mel(sample_rate as f32 / 2.0);

    let hz_points: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f32 / (n_mels + 1) as f32))
        .collect();
    let bin_hz: Vec<f32> = (0..n_bins)
        .map(|k| k as f32 * sample_rate as f32 / n_fft as f32)
        .collect();

    (0..n_mels)
        .map(|m| {
            let (left, centre, right) = (hz_points[m], hz_points[m + 1], hz_points[m + 2]);
            bin_hz
                .iter()
                .map(|&f| {
                    let rising = (f - left) / (centre - left);
                    let falling = (right - f) / (right - centre);
                    rising.min(falling).max(0.0)
                })
                .collect()
        })
        .collect()
}
