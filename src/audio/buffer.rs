/// Mono waveform ready for analysis
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Samples normalized to -1.0..=1.0
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Average interleaved channels down to mono
    pub fn from_interleaved(interleaved: &[f32], channels: usize, sample_rate: u32) -> Self {
        let samples = if channels <= 1 {
            interleaved.to_vec()
        } else {
            interleaved
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };
        Self::new(samples, sample_rate)
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixdown() {
        let buffer = AudioBuffer::from_interleaved(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2, 8_000);
        assert_eq!(buffer.samples, vec![0.5, 0.5, 0.0]);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_duration() {
        let buffer = AudioBuffer::new(vec![0.0; 22_050], 44_100);
        assert_eq!(buffer.duration_secs(), 0.5);
        assert_eq!(AudioBuffer::new(vec![], 0).duration_secs(), 0.0);
    }
}
