use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};
use tracing::debug;

use crate::error::AudioError;

/// Vertical pixels per Mel band
const BAND_HEIGHT: u32 = 2;

/// Render a dB Mel spectrogram (frames x bands, 0 dB peak) as a PNG, low bands at the bottom
pub fn render_png(db: &[Vec<f32>], path: &Path) -> Result<(), AudioError> {
    let width = db.len() as u32;
    let bands = db.first().map_or(0, |f| f.len()) as u32;
    if width == 0 || bands == 0 {
        return Err(AudioError::Render("empty spectrogram".into()));
    }

    let floor = db.iter().flatten().cloned().fold(0.0f32, f32::min).min(-1.0);
    let img = RgbImage::from_fn(width, bands * BAND_HEIGHT, |x, y| {
        let band = (bands - 1 - y / BAND_HEIGHT) as usize;
        let level = 1.0 - db[x as usize][band] / floor;
        heat(level.clamp(0.0, 1.0))
    });

    img.save_with_format(path, ImageFormat::Png)
        .map_err(|e| AudioError::Render(e.to_string()))?;
    debug!(path = ?path, width, height = bands * BAND_HEIGHT, "Spectrogram rendered");
    Ok(())
}

/// Black through purple and orange to pale yellow
fn heat(level: f32) -> Rgb<u8> {
    const STOPS: [(f32, [f32; 3]); 4] = [
        (0.0, [0.0, 0.0, 4.0]),
        (0.4, [114.0, 31.0, 129.0]),
        (0.75, [241.0, 96.0, 93.0]),
        (1.0, [252.0, 253.0, 191.0]),
    ];

    for pair in STOPS.windows(2) {
        let (lo, lo_rgb) = pair[0];
        let (hi, hi_rgb) = pair[1];
        if level <= hi {
            let t = (level - lo) / (hi - lo);
            let mix = |i: usize| (lo_rgb[i] + (hi_rgb[i] - lo_rgb[i]) * t).round() as u8;
            return Rgb([mix(0), mix(1), mix(2)]);
        }
    }
    Rgb([252, 253, 191])
}
