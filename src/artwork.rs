use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use image::ImageFormat;
use tracing::{debug, info, instrument};

use crate::error::ImageError;
use crate::openai::ImageBackend;
use crate::prompt::ArtPrompt;
use crate::store::{ArtifactKind, ArtifactStore};

/// A generated picture and the prompt that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImageRecord {
    pub image_path: PathBuf,
    pub prompt_used: String,
}

/// `main_prompt` followed by up to two style suggestions
pub fn final_prompt(prompt: &ArtPrompt) -> String {
    let styles: Vec<&str> = prompt
        .style_suggestions
        .iter()
        .take(2)
        .map(String::as_str)
        .collect();
    format!("{} Style: {}", prompt.main_prompt, styles.join(", "))
}

/// Requests artwork and stores it as PNG
pub struct ImageGenerator {
    backend: Arc<dyn ImageBackend>,
    store: Arc<dyn ArtifactStore>,
}

impl ImageGenerator {
    pub fn new(backend: Arc<dyn ImageBackend>, store: Arc<dyn ArtifactStore>) -> Self {
        Self { backend, store }
    }

    #[instrument(skip(self, prompt))]
    pub async fn generate(&self, prompt: &ArtPrompt, song: &str) -> Result<GeneratedImageRecord, ImageError> {
        let prompt_used = final_prompt(prompt);
        debug!(prompt = %prompt_used, "Requesting image");

        let url = self
            .backend
            .generate(&prompt_used)
            .await
            .map_err(|e| ImageError::Generation(e.to_string()))?;
        let bytes = self
            .backend
            .download(&url)
            .await
            .map_err(|e| ImageError::Generation(e.to_string()))?;
        let png = ensure_png(bytes)?;

        let handle = self.store.put(ArtifactKind::Image, song, &png)?;
        info!(path = ?handle.path, "Image saved");

        Ok(GeneratedImageRecord {
            image_path: handle.path,
            prompt_used,
        })
    }
}

/// Pass PNG through untouched, re-encode anything else the decoder understands
fn ensure_png(bytes: Vec<u8>) -> Result<Vec<u8>, ImageError> {
    if matches!(image::guess_format(&bytes), Ok(ImageFormat::Png)) {
        return Ok(bytes);
    }

    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| ImageError::Generation(format!("downloaded file is not an image: {}", e)))?;
    let mut out = Cursor::new(Vec::new());
    decoded
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| ImageError::Generation(e.to_string()))?;
    Ok(out.into_inner())
}
