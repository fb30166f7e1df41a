use std::fmt;

use serde::{Deserialize, Serialize};

/// Western pitch class, `C` = 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    #[serde(rename = "C#")]
    CSharp,
    D,
    #[serde(rename = "D#")]
    DSharp,
    E,
    F,
    #[serde(rename = "F#")]
    FSharp,
    G,
    #[serde(rename = "G#")]
    GSharp,
    A,
    #[serde(rename = "A#")]
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    /// Pitch class of the nearest equal-tempered note (A4 = 440 Hz)
    pub fn index_of_frequency(hz: f32) -> usize {
        let semitones_from_a = (12.0 * (hz / 440.0).log2()).round() as i64;
        (semitones_from_a + 9).rem_euclid(12) as usize
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptors of the instrumental track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentalFeatures {
    /// Beats per minute
    pub tempo: f32,
    /// Mean spectral contrast in dB, divided by 100
    pub average_spectral_contrast: f32,
    /// Hz
    pub spectral_bandwidth: f32,
    pub dominant_note: PitchClass,
}

impl InstrumentalFeatures {
    /// Plain-text summary handed to the prompt synthesizer
    pub fn describe(&self) -> String {
        format!(
            "Tempo: {:.1} BPM\nAverage spectral contrast: {:.3}\nSpectral bandwidth: {:.1} Hz\nDominant note: {}",
            self.tempo, self.average_spectral_contrast, self.spectral_bandwidth, self.dominant_note
        )
    }
}

/// Mean positive dB rise per Mel band between consecutive frames
pub fn onset_strength(db_mel: &[Vec<f32>]) -> Vec<f32> {
    let mut envelope = vec![0.0f32; db_mel.len()];
    for t in 1..db_mel.len() {
        let bands = db_mel[t].len().max(1) as f32;
        envelope[t] = db_mel[t]
            .iter()
            .zip(&db_mel[t - 1])
            .map(|(now, before)| (now - before).max(0.0))
            .sum::<f32>()
            / bands;
    }
    envelope
}

/// Tempo from the onset envelope autocorrelation, weighted toward 120 BPM
///
/// The weight is a log-normal prior one octave wide. Returns 0 when the
/// envelope carries no rhythmic energy.
pub fn estimate_tempo(onset: &[f32], frame_rate: f32) -> f32 {
    const START_BPM: f32 = 120.0;
    const STD_OCTAVES: f32 = 1.0;
    const MIN_BPM: f32 = 30.0;
    const MAX_BPM: f32 = 300.0;

    if onset.len() < 2 {
        return 0.0;
    }

    let min_lag = ((60.0 * frame_rate / MAX_BPM).floor() as usize).max(1);
    let max_lag = ((60.0 * frame_rate / MIN_BPM).ceil() as usize).min(onset.len() - 1);

    let mut best: Option<(f32, usize)> = None;
    for lag in min_lag..=max_lag {
        let bpm = 60.0 * frame_rate / lag as f32;
        let weight = (-0.5 * ((bpm / START_BPM).log2() / STD_OCTAVES).powi(2)).exp();
        let score = autocorrelate(onset, lag) * weight;
        if score > best.map_or(0.0, |(s, _)| s) {
            best = Some((score, lag));
        }
    }

    best.map_or(0.0, |(_, lag)| 60.0 * frame_rate / lag as f32)
}

/// Mean lagged product
fn autocorrelate(signal: &[f32], lag: usize) -> f32 {
    let n = signal.len().saturating_sub(lag);
    if n == 0 {
        return 0.0;
    }

    let sum: f32 = signal[..n]
        .iter()
        .zip(&signal[lag..])
        .map(|(a, b)| a * b)
        .sum();

    sum / n as f32
}

/// Mean peak-to-valley contrast in dB over six octave bands from 200 Hz plus the residual band
///
/// `spectrum` holds power values; `freqs` labels its columns.
pub fn spectral_contrast(spectrum: &[Vec<f32>], freqs: &[f32]) -> f32 {
    const FMIN: f32 = 200.0;
    const N_BANDS: usize = 6;
    const QUANTILE: f32 = 0.02;
    const AMIN: f32 = 1e-10;

    let mut edges = [0.0f32; N_BANDS + 2];
    for (k, edge) in edges.iter_mut().enumerate().skip(1) {
        *edge = FMIN * 2f32.powi(k as i32 - 1);
    }

    // (bins used for sorting, quantile count)
    let bands: Vec<(Vec<usize>, usize)> = (0..=N_BANDS)
        .filter_map(|k| {
            let mut bins: Vec<usize> = freqs
                .iter()
                .enumerate()
                .filter(|&(_, &f)| f >= edges[k] && (k == N_BANDS || f <= edges[k + 1]))
                .map(|(i, _)| i)
                .collect();
            let first = *bins.first()?;
            if k > 0 && first > 0 {
                bins.insert(0, first - 1);
            }
            let count = ((QUANTILE * bins.len() as f32).round() as usize).max(1);
            if k < N_BANDS && bins.len() > 1 {
                bins.pop();
            }
            Some((bins, count))
        })
        .collect();

    let mut total = 0.0f64;
    let mut cells = 0usize;
    for frame in spectrum {
        for (bins, count) in &bands {
            let mut values: Vec<f32> = bins.iter().map(|&b| frame[b]).collect();
            values.sort_by(f32::total_cmp);
            let count = (*count).min(values.len());

            let valley = values[..count].iter().sum::<f32>() / count as f32;
            let peak = values[values.len() - count..].iter().sum::<f32>() / count as f32;
            total += (10.0 * peak.max(AMIN).log10() - 10.0 * valley.max(AMIN).log10()) as f64;
            cells += 1;
        }
    }

    if cells == 0 {
        0.0
    } else {
        (total / cells as f64) as f32
    }
}

/// Second-order bandwidth around the centroid of each normalized frame, averaged
pub fn spectral_bandwidth(spectrum: &[Vec<f32>], freqs: &[f32]) -> f32 {
    if spectrum.is_empty() {
        return 0.0;
    }

    let total: f32 = spectrum
        .iter()
        .map(|frame| {
            let energy: f32 = frame.iter().sum();
            if energy <= f32::MIN_POSITIVE {
                return 0.0;
            }
            let centroid: f32 = frame.iter().zip(freqs).map(|(m, f)| m * f).sum::<f32>() / energy;
            frame
                .iter()
                .zip(freqs)
                .map(|(m, f)| (m / energy) * (f - centroid).powi(2))
                .sum::<f32>()
                .sqrt()
        })
        .sum();

    total / spectrum.len() as f32
}

/// Frame-averaged chroma, each frame normalized to its loudest class
pub fn mean_chroma(power: &[Vec<f32>], freqs: &[f32]) -> [f32; 12] {
    // A0; below this a bin carries no usable pitch
    const MIN_HZ: f32 = 27.5;

    let classes: Vec<Option<usize>> = freqs
        .iter()
        .map(|&f| (f >= MIN_HZ).then(|| PitchClass::index_of_frequency(f)))
        .collect();

    let mut mean = [0.0f32; 12];
    if power.is_empty() {
        return mean;
    }

    for frame in power {
        let mut chroma = [0.0f32; 12];
        for (p, class) in frame.iter().zip(&classes) {
            if let Some(c) = class {
                chroma[*c] += p;
            }
        }
        let max = chroma.iter().cloned().fold(0.0f32, f32::max);
        if max > 0.0 {
            for (m, c) in mean.iter_mut().zip(chroma) {
                *m += c / max;
            }
        }
    }

    for m in &mut mean {
        *m /= power.len() as f32;
    }
    mean
}

/// Strongest pitch class; ties resolve to the lowest index
pub fn dominant_note(chroma: &[f32; 12]) -> PitchClass {
    let mut best = 0;
    for (i, &value) in chroma.iter().enumerate() {
        if value > chroma[best] {
            best = i;
        }
    }
    PitchClass::from_index(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_class_mapping() {
        assert_eq!(PitchClass::index_of_frequency(440.0), 9);
        assert_eq!(PitchClass::index_of_frequency(261.63), 0);
        assert_eq!(PitchClass::index_of_frequency(880.0), 9);
        assert_eq!(PitchClass::index_of_frequency(466.16), 10);
        assert_eq!(PitchClass::from_index(1).as_str(), "C#");
        assert_eq!(serde_json::to_string(&PitchClass::FSharp).unwrap(), "\"F#\"");
    }

    #[test]
    fn test_dominant_note() {
        let mut chroma = [0.1f32; 12];
        chroma[7] = 0.9;
        assert_eq!(dominant_note(&chroma), PitchClass::G);
        assert_eq!(dominant_note(&[0.0; 12]), PitchClass::C);
    }

    #[test]
    fn test_onset_strength_only_counts_rises() {
        let db = vec![vec![-80.0, -80.0], vec![-20.0, -60.0], vec![-40.0, -60.0]];
        assert_eq!(onset_strength(&db), vec![0.0, 40.0, 0.0]);
    }

    #[test]
    fn test_tempo_from_periodic_envelope() {
        // Pulse every 25 frames at 50 frames/s = 120 BPM
        let mut envelope = vec![0.0f32; 1000];
        for t in (0..1000).step_by(25) {
            envelope[t] = 1.0;
        }
        assert!((estimate_tempo(&envelope, 50.0) - 120.0).abs() < 1e-3);
    }

    #[test]
    fn test_tempo_prior_does_not_override_true_period() {
        // Pulse every 50 frames at 50 frames/s = 60 BPM; half-period lags see nothing
        let mut envelope = vec![0.0f32; 1500];
        for t in (0..1500).step_by(50) {
            envelope[t] = 1.0;
        }
        assert!((estimate_tempo(&envelope, 50.0) - 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_tempo_of_silence_is_zero() {
        assert_eq!(estimate_tempo(&[0.0; 500], 43.0), 0.0);
        assert_eq!(estimate_tempo(&[], 43.0), 0.0);
    }

    #[test]
    fn test_flat_spectrum_has_no_contrast() {
        let freqs: Vec<f32> = (0..1025).map(|k| k as f32 * 22_050.0 / 2048.0).collect();
        let frames = vec![vec![1.0f32; 1025]; 4];
        assert!(spectral_contrast(&frames, &freqs).abs() < 1e-4);
    }

    #[test]
    fn test_peaky_spectrum_has_contrast() {
        let freqs: Vec<f32> = (0..1025).map(|k| k as f32 * 22_050.0 / 2048.0).collect();
        let mut frame = vec![0.001f32; 1025];
        for k in (0..1025).step_by(8) {
            frame[k] = 1.0;
        }
        assert!(spectral_contrast(&[frame], &freqs) > 20.0);
    }

    #[test]
    fn test_bandwidth_of_single_bin_is_zero() {
        let freqs = vec![0.0, 100.0, 200.0, 300.0];
        let narrow = vec![vec![0.0, 0.0, 1.0, 0.0]];
        let wide = vec![vec![1.0, 0.0, 0.0, 1.0]];
        assert_eq!(spectral_bandwidth(&narrow, &freqs), 0.0);
        assert!((spectral_bandwidth(&wide, &freqs) - 150.0).abs() < 1e-3);
    }

    #[test]
    fn test_describe() {
        let features = InstrumentalFeatures {
            tempo: 117.45,
            average_spectral_contrast: 0.2134,
            spectral_bandwidth: 1830.42,
            dominant_note: PitchClass::A,
        };
        assert_eq!(
            features.describe(),
            "Tempo: 117.5 BPM\nAverage spectral contrast: 0.213\nSpectral bandwidth: 1830.4 Hz\nDominant note: A"
        );
    }
}
