pub mod transcript;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::error::{LyricArtError, OpenAiError, TranscriptionError};
use crate::store::{ArtifactHandle, ArtifactKind, ArtifactStore};

/// Speech-to-text model tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
    #[default]
    Turbo,
}

impl ModelSize {
    pub const ALL: [ModelSize; 6] = [
        ModelSize::Tiny,
        ModelSize::Base,
        ModelSize::Small,
        ModelSize::Medium,
        ModelSize::Large,
        ModelSize::Turbo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
            ModelSize::Turbo => "turbo",
        }
    }
}

impl FromStr for ModelSize {
    type Err = LyricArtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| LyricArtError::UnknownModel(s.to_string()))
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Segment exactly as the service returned it
#[derive(Debug, Clone, PartialEq)]
pub struct RawSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Unvalidated service output
#[derive(Debug, Clone, Default)]
pub struct RawTranscription {
    pub language: Option<String>,
    pub segments: Vec<RawSegment>,
}

/// Speech-to-text service
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path, model: ModelSize) -> Result<RawTranscription, OpenAiError>;
}

/// Timed span of recognized text, in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResult {
    pub detected_language: Option<String>,
    pub segments: Vec<TranscriptSegment>,
}

impl TranscriptionResult {
    /// Segment texts joined line by line
    #[allow(dead_code)]
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Check ordering and bounds of service segments
pub fn validate(raw: RawTranscription) -> Result<TranscriptionResult, TranscriptionError> {
    let mut previous_start = f64::NEG_INFINITY;
    let mut segments = Vec::with_capacity(raw.segments.len());

    for (index, segment) in raw.segments.into_iter().enumerate() {
        if !segment.start.is_finite() || !segment.end.is_finite() || segment.start < 0.0 {
            return Err(TranscriptionError::InvalidSegment {
                index,
                reason: format!("bad bounds {} .. {}", segment.start, segment.end),
            });
        }
        if segment.end < segment.start {
            return Err(TranscriptionError::InvalidSegment {
                index,
                reason: format!("ends at {} before it starts at {}", segment.end, segment.start),
            });
        }
        if segment.start < previous_start {
            return Err(TranscriptionError::InvalidSegment {
                index,
                reason: format!(
                    "starts at {} before the previous segment at {}",
                    segment.start, previous_start
                ),
            });
        }
        previous_start = segment.start;

        segments.push(TranscriptSegment {
            start: segment.start,
            end: segment.end,
            text: transcript::single_line(&segment.text),
        });
    }

    Ok(TranscriptionResult {
        detected_language: raw.language,
        segments,
    })
}

/// Runs the speech-to-text service and hands the transcript to later stages
pub struct TranscriptionAdapter {
    transcriber: Arc<dyn Transcriber>,
    store: Arc<dyn ArtifactStore>,
}

impl TranscriptionAdapter {
    pub fn new(transcriber: Arc<dyn Transcriber>, store: Arc<dyn ArtifactStore>) -> Self {
        Self { transcriber, store }
    }

    /// Transcribe `audio`; the caller has already checked that it exists
    #[instrument(skip(self), fields(model = %model))]
    pub async fn transcribe(
        &self,
        audio: &Path,
        model: ModelSize,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        info!("Transcribing");
        let raw = self.transcriber.transcribe(audio, model).await?;
        let result = validate(raw)?;
        info!(
            language = ?result.detected_language,
            segments = result.segments.len(),
            "Transcription complete"
        );
        Ok(result)
    }

    /// Write the transcript artifact for `song`
    pub fn persist(
        &self,
        song: &str,
        result: &TranscriptionResult,
    ) -> Result<ArtifactHandle, TranscriptionError> {
        let body = transcript::format(&result.segments);
        let handle = self.store.put(ArtifactKind::Transcript, song, body.as_bytes())?;
        debug!(path = ?handle.path, "Transcript stored");
        Ok(handle)
    }

    /// Re-read a stored transcript
    #[allow(dead_code)]
    pub fn load(&self, handle: &ArtifactHandle) -> Result<Vec<TranscriptSegment>, TranscriptionError> {
        let bytes = self.store.get(handle)?;
        transcript::parse(&String::from_utf8_lossy(&bytes))
    }
}
