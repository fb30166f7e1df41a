use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::analysis::{AnalysisOutcome, LyricAnalyzer};
use crate::app::{Depth, Mode, RunSettings, Stage};
use crate::artwork::{GeneratedImageRecord, ImageGenerator};
use crate::audio::{AudioFeatureExtractor, InstrumentalFeatures};
use crate::error::{LyricArtError, Result};
use crate::openai::{ChatModel, ImageBackend};
use crate::prompt::{ArtPrompt, PromptInputs, PromptSynthesizer};
use crate::sentiment::{Language, SentimentClassifier, TextClassifier};
use crate::store::{ArtifactHandle, ArtifactStore};
use crate::transcribe::{transcript, TranscriptSegment, TranscriptionAdapter, Transcriber};

/// What one run produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub song: String,
    pub mode: Mode,
    pub depth: Depth,
    /// Stages that produced output, in order
    pub completed: Vec<Stage>,
    pub detected_language: Option<String>,
    pub segments: Vec<TranscriptSegment>,
    pub transcript: Option<ArtifactHandle>,
    pub analysis: Option<AnalysisOutcome>,
    pub features: Option<InstrumentalFeatures>,
    pub art_prompt: Option<ArtPrompt>,
    pub image: Option<GeneratedImageRecord>,
}

impl PipelineReport {
    /// Whether `stage` left any output in the report
    fn produced(&self, stage: Stage) -> bool {
        match stage {
            Stage::Transcription => self.transcript.is_some(),
            Stage::Analysis => self.analysis.is_some() || self.features.is_some(),
            Stage::Prompt => self.art_prompt.is_some(),
            Stage::Image => self.image.is_some(),
        }
    }

    fn new(song: String, mode: Mode, depth: Depth) -> Self {
        Self {
            song,
            mode,
            depth,
            completed: Vec::new(),
            detected_language: None,
            segments: Vec::new(),
            transcript: None,
            analysis: None,
            features: None,
            art_prompt: None,
            image: None,
        }
    }
}

/// Sequences the stages for a mode and depth
///
/// Collaborators are optional so a run only needs credentials for the
/// stages it actually reaches.
pub struct PipelineOrchestrator {
    store: Arc<dyn ArtifactStore>,
    transcriber: Option<Arc<dyn Transcriber>>,
    classifier: Option<Arc<dyn TextClassifier>>,
    chat: Option<Arc<dyn ChatModel>>,
    images: Option<Arc<dyn ImageBackend>>,
    extractor: AudioFeatureExtractor,
    language: Option<String>,
    max_tokens: usize,
}

impl PipelineOrchestrator {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            transcriber: None,
            classifier: None,
            chat: None,
            images: None,
            extractor: AudioFeatureExtractor::default(),
            language: None,
            max_tokens: 512,
        }
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn TextClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_chat(mut self, chat: Arc<dyn ChatModel>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn with_images(mut self, images: Arc<dyn ImageBackend>) -> Self {
        self.images = Some(images);
        self
    }

    /// Lyric language; when unset the transcription's detected language is used
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Run every stage inside `settings.depth`, stopping at the first failure
    #[instrument(skip_all, fields(song = %settings.song_name(), mode = %settings.mode, depth = settings.depth.get()))]
    pub async fn run(&self, settings: &RunSettings) -> Result<PipelineReport> {
        let mut report = PipelineReport::new(settings.song_name(), settings.mode, settings.depth);
        info!(audio = ?settings.audio, "Pipeline starting");

        for stage in settings.depth.stages() {
            match stage {
                Stage::Transcription => self.transcription_stage(settings, &mut report).await?,
                Stage::Analysis => self.analysis_stage(settings, &mut report).await?,
                Stage::Prompt => self.prompt_stage(&mut report).await?,
                Stage::Image => self.image_stage(&mut report).await?,
            }
            if report.produced(stage) {
                info!(stage = stage.name(), "Stage complete");
                report.completed.push(stage);
            } else {
                debug!(stage = stage.name(), "Stage had nothing to do for this mode");
            }
        }

        Ok(report)
    }

    async fn transcription_stage(&self, settings: &RunSettings, report: &mut PipelineReport) -> Result<()> {
        if !settings.mode.uses_lyrics() {
            return Ok(());
        }

        let adapter = TranscriptionAdapter::new(
            require(&self.transcriber, Stage::Transcription)?.clone(),
            self.store.clone(),
        );
        let result = adapter.transcribe(&settings.audio, settings.model).await?;
        let handle = adapter.persist(&report.song, &result)?;

        if let Some(path) = &settings.transcript_output {
            std::fs::write(path, transcript::format(&result.segments)).map_err(|source| {
                LyricArtError::Output {
                    path: path.clone(),
                    source,
                }
            })?;
            info!(path = ?path, "Transcription saved");
        }

        report.detected_language = result.detected_language;
        report.segments = result.segments;
        report.transcript = Some(handle);
        Ok(())
    }

    async fn analysis_stage(&self, settings: &RunSettings, report: &mut PipelineReport) -> Result<()> {
        if settings.mode.uses_lyrics() {
            let handle = report
                .transcript
                .as_ref()
                .ok_or(LyricArtError::ServiceUnavailable("transcript"))?;
            let language = self
                .language
                .as_deref()
                .or(report.detected_language.as_deref());
            let sentiment = SentimentClassifier::new(
                require(&self.classifier, Stage::Analysis)?.clone(),
                Language::from_code(language),
                self.max_tokens,
            );
            let analyzer = LyricAnalyzer::new(
                sentiment,
                require(&self.chat, Stage::Analysis)?.clone(),
                self.store.clone(),
            );
            report.analysis = Some(analyzer.analyze_artifact(handle).await?);
        }

        if settings.mode.uses_instrumentals() {
            // Best-effort: the text track or the prompt stage decides what to do without features
            report.features = match self
                .extractor
                .extract_file_blocking(settings.audio.clone(), settings.spectrogram.clone())
                .await
            {
                Ok(features) => Some(features),
                Err(e) => {
                    warn!(error = %e, "Instrumental feature extraction failed, continuing without features");
                    None
                }
            };
        }

        Ok(())
    }

    async fn prompt_stage(&self, report: &mut PipelineReport) -> Result<()> {
        let record = report.analysis.as_ref().map(|a| &a.record);
        let inputs = PromptInputs {
            lyrics: record.and_then(|r| r.original_lyrics.as_deref()),
            sentiment: record.and_then(|r| r.hugging_sentiment.as_ref()),
            analysis: record.and_then(|r| r.detailed_analysis.as_ref()),
            instrumental: report.features.as_ref(),
        };

        let synthesizer = PromptSynthesizer::new(require(&self.chat, Stage::Prompt)?.clone());
        report.art_prompt = Some(synthesizer.synthesize(&inputs).await?);
        Ok(())
    }

    async fn image_stage(&self, report: &mut PipelineReport) -> Result<()> {
        let prompt = report
            .art_prompt
            .as_ref()
            .ok_or(LyricArtError::ServiceUnavailable("art prompt"))?;

        let generator = ImageGenerator::new(require(&self.images, Stage::Image)?.clone(), self.store.clone());
        report.image = Some(generator.generate(prompt, &report.song).await?);
        Ok(())
    }
}

fn require<T: ?Sized>(service: &Option<Arc<T>>, stage: Stage) -> Result<&Arc<T>> {
    service
        .as_ref()
        .ok_or(LyricArtError::ServiceUnavailable(stage.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artwork::tests::FakeImages;
    use crate::audio::PitchClass;
    use crate::error::{AnalysisError, OpenAiError, SentimentError};
    use crate::openai::ChatMessage;
    use crate::sentiment::SentimentResult;
    use crate::store::{ArtifactKind, FsArtifactStore};
    use crate::transcribe::{ModelSize, RawSegment, RawTranscription};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};

    struct FakeTranscriber;

    #[async_trait]
    impl Transcriber for FakeTranscriber {
        async fn transcribe(&self, _audio: &Path, _model: ModelSize) -> std::result::Result<RawTranscription, OpenAiError> {
            Ok(RawTranscription {
                language: Some("en".into()),
                segments: vec![
                    RawSegment {
                        start: 0.0,
                        end: 3.2,
                        text: " Under the bridge downtown".into(),
                    },
                    RawSegment {
                        start: 3.2,
                        end: 6.75,
                        text: " is where I drew some blood".into(),
                    },
                ],
            })
        }
    }

    #[derive(Default)]
    struct FakeClassifier {
        models: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextClassifier for FakeClassifier {
        async fn classify(&self, model: &str, _text: &str) -> std::result::Result<Vec<SentimentResult>, SentimentError> {
            self.models.lock().push(model.to_string());
            Ok(vec![SentimentResult {
                label: "NEGATIVE".into(),
                score: 0.97,
            }])
        }
    }

    /// Answers chat requests in order, recording the user messages
    struct QueuedChat {
        replies: Mutex<VecDeque<String>>,
        requests: Mutex<Vec<String>>,
    }

    impl QueuedChat {
        fn new(replies: &[String]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().cloned().collect()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatModel for QueuedChat {
        fn model(&self) -> &str {
            "queued"
        }

        async fn complete(&self, messages: &[ChatMessage]) -> std::result::Result<String, OpenAiError> {
            self.requests.lock().push(messages[1].content.clone());
            self.replies
                .lock()
                .pop_front()
                .ok_or(OpenAiError::EmptyResponse("scripted reply"))
        }
    }

    fn analysis_reply() -> String {
        crate::analysis::theme::tests::sample_json().to_string()
    }

    fn prompt_reply() -> String {
        serde_json::json!({
            "main_prompt": "A neon bridge over a dark river",
            "style_suggestions": ["noir", "photorealism", "cubism"],
            "color_palette": ["black", "neon pink"],
            "key_elements": ["bridge", "river"]
        })
        .to_string()
    }

    fn settings(audio: PathBuf, mode: Mode, depth: u8) -> RunSettings {
        RunSettings {
            audio,
            mode,
            depth: Depth::new(depth).unwrap(),
            model: ModelSize::Turbo,
            transcript_output: None,
            spectrogram: None,
        }
    }

    fn tone_wav(dir: &Path) -> PathBuf {
        let path = dir.join("Under the Bridge.wav");
        let samples: Vec<f32> = (0..22_050 * 2)
            .map(|i| 0.4 * (2.0 * std::f32::consts::PI * 329.63 * i as f32 / 22_050.0).sin())
            .collect();
        crate::audio::write_wav(&path, &samples, 22_050, 1);
        path
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_lyrical_depth_two() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let audio = dir.path().join("Under the Bridge.mp3");
        std::fs::write(&audio, b"stub").unwrap();

        let classifier = Arc::new(FakeClassifier::default());
        let chat = QueuedChat::new(&[analysis_reply()]);
        let orchestrator = PipelineOrchestrator::new(Arc::new(FsArtifactStore::new(&out)))
            .with_transcriber(Arc::new(FakeTranscriber))
            .with_classifier(classifier.clone())
            .with_chat(chat.clone());

        let report = orchestrator
            .run(&settings(audio, Mode::Lyrical, 2))
            .await
            .unwrap();

        assert_eq!(report.completed, vec![Stage::Transcription, Stage::Analysis]);
        assert_eq!(files_in(&out.join("transcripts")), 1);
        assert!(report.art_prompt.is_none());
        assert!(!out.join("image_results").exists());

        // Detected language picks the English model
        assert_eq!(
            classifier.models.lock()[0],
            "distilbert-base-uncased-finetuned-sst-2-english"
        );

        let record_path = &report.analysis.as_ref().unwrap().handle.path;
        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(record_path).unwrap()).unwrap();
        assert_eq!(json["hugging_sentiment"]["label"], "NEGATIVE");
        assert_eq!(json["detailed_analysis"].as_object().unwrap().len(), 6);
        assert_eq!(
            json["original_lyrics"],
            "Under the bridge downtown\nis where I drew some blood"
        );
    }

    #[tokio::test]
    async fn test_instrumental_full_depth() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let audio = tone_wav(dir.path());

        let chat = QueuedChat::new(&[prompt_reply()]);
        let images = FakeImages::ok();
        let orchestrator = PipelineOrchestrator::new(Arc::new(FsArtifactStore::new(&out)))
            .with_chat(chat.clone())
            .with_images(images.clone());

        let report = orchestrator
            .run(&settings(audio, Mode::Instrumental, 4))
            .await
            .unwrap();

        assert_eq!(report.completed, vec![Stage::Analysis, Stage::Prompt, Stage::Image]);
        assert!(!out.join("transcripts").exists());
        assert!(!out.join("analysis_results").exists());
        assert_eq!(files_in(&out.join("image_results")), 1);

        let features = report.features.as_ref().unwrap();
        assert_eq!(features.dominant_note, PitchClass::E);

        let requests = chat.requests.lock();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].contains("Instrumental Analysis:"));
        assert!(!requests[0].contains("Lyrical Analysis:"));
        assert!(!requests[0].contains("Sentiment:"));

        let image = report.image.unwrap();
        assert_eq!(
            image.prompt_used,
            "A neon bridge over a dark river Style: noir, photorealism"
        );
        assert!(image.image_path.starts_with(out.join("image_results")));
    }

    #[tokio::test]
    async fn test_hybrid_survives_undecodable_audio() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let audio = dir.path().join("broken.mp3");
        std::fs::write(&audio, b"not audio").unwrap();

        let chat = QueuedChat::new(&[analysis_reply(), prompt_reply()]);
        let orchestrator = PipelineOrchestrator::new(Arc::new(FsArtifactStore::new(&out)))
            .with_transcriber(Arc::new(FakeTranscriber))
            .with_classifier(Arc::new(FakeClassifier::default()))
            .with_chat(chat.clone());

        let report = orchestrator
            .run(&settings(audio, Mode::Hybrid, 3))
            .await
            .unwrap();

        assert!(report.features.is_none());
        assert!(report.art_prompt.is_some());
        let requests = chat.requests.lock();
        assert!(requests[1].contains("Lyrical Analysis:"));
        assert!(!requests[1].contains("Instrumental Analysis:"));
    }

    #[tokio::test]
    async fn test_skipped_stages_are_not_reported() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("broken.mp3");
        std::fs::write(&audio, b"not audio").unwrap();

        let orchestrator =
            PipelineOrchestrator::new(Arc::new(FsArtifactStore::new(dir.path().join("out"))));
        let report = orchestrator
            .run(&settings(audio, Mode::Instrumental, 2))
            .await
            .unwrap();

        assert!(report.completed.is_empty());
        assert!(report.transcript.is_none());
        assert!(report.features.is_none());
    }

    #[tokio::test]
    async fn test_instrumental_without_features_has_no_prompt_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("broken.mp3");
        std::fs::write(&audio, b"not audio").unwrap();

        let orchestrator =
            PipelineOrchestrator::new(Arc::new(FsArtifactStore::new(dir.path().join("out"))))
                .with_chat(QueuedChat::new(&[prompt_reply()]));

        let err = orchestrator
            .run(&settings(audio, Mode::Instrumental, 3))
            .await
            .unwrap_err();
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn test_analysis_failure_halts_after_persisting() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let audio = dir.path().join("song.mp3");
        std::fs::write(&audio, b"stub").unwrap();

        let chat = QueuedChat::new(&["I'd rather not answer in JSON".to_string()]);
        let orchestrator = PipelineOrchestrator::new(Arc::new(FsArtifactStore::new(&out)))
            .with_transcriber(Arc::new(FakeTranscriber))
            .with_classifier(Arc::new(FakeClassifier::default()))
            .with_chat(chat.clone())
            .with_images(FakeImages::ok());

        let err = orchestrator
            .run(&settings(audio, Mode::Lyrical, 4))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LyricArtError::Analysis(AnalysisError::Unparseable { .. })
        ));
        assert!(err.to_string().contains("I'd rather not answer in JSON"));
        assert_eq!(files_in(&out.join("analysis_results")), 1);
        assert_eq!(chat.requests.lock().len(), 1);
        assert!(!out.join("image_results").exists());
    }

    #[tokio::test]
    async fn test_missing_service_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("song.mp3");
        std::fs::write(&audio, b"stub").unwrap();

        let orchestrator =
            PipelineOrchestrator::new(Arc::new(FsArtifactStore::new(dir.path().join("out"))));
        let err = orchestrator
            .run(&settings(audio, Mode::Lyrical, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, LyricArtError::ServiceUnavailable("transcription")));
    }

    #[tokio::test]
    async fn test_transcript_output_copy() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("song.mp3");
        let copy = dir.path().join("song.txt");
        std::fs::write(&audio, b"stub").unwrap();

        let orchestrator =
            PipelineOrchestrator::new(Arc::new(FsArtifactStore::new(dir.path().join("out"))))
                .with_transcriber(Arc::new(FakeTranscriber));
        let mut run = settings(audio, Mode::Lyrical, 1);
        run.transcript_output = Some(copy.clone());

        let report = orchestrator.run(&run).await.unwrap();
        assert_eq!(report.completed, vec![Stage::Transcription]);
        assert_eq!(
            std::fs::read_to_string(copy).unwrap(),
            "[0.00 --> 3.20] Under the bridge downtown\n[3.20 --> 6.75] is where I drew some blood\n"
        );
        assert_eq!(ArtifactKind::Transcript, report.transcript.unwrap().kind);
    }
}
