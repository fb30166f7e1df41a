mod lyrics;
mod record;
pub mod theme;

pub use lyrics::{decode as decode_lyrics, lyric_text, read_lyrics};
pub use record::AnalysisRecord;
pub use theme::ThematicAnalysis;

use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use tracing::{debug, error, info, instrument, warn};

use crate::app::song_name;
use crate::error::AnalysisError;
use crate::openai::ChatModel;
use crate::sentiment::SentimentClassifier;
use crate::store::{ArtifactHandle, ArtifactKind, ArtifactStore};

/// Progress through one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisState {
    Start,
    LyricsRead,
    SentimentDone,
    ThemeAnalysisDone,
}

/// Where the lyrics come from
#[derive(Debug, Clone, Copy)]
pub enum LyricSource<'a> {
    File(&'a Path),
    Artifact(&'a ArtifactHandle),
}

impl LyricSource<'_> {
    fn path(&self) -> &Path {
        match self {
            LyricSource::File(path) => path,
            LyricSource::Artifact(handle) => &handle.path,
        }
    }
}

/// A completed run and where its record was written
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub record: AnalysisRecord,
    pub handle: ArtifactHandle,
}

/// Sentiment plus literary analysis of a lyric file
pub struct LyricAnalyzer {
    sentiment: SentimentClassifier,
    chat: Arc<dyn ChatModel>,
    store: Arc<dyn ArtifactStore>,
}

impl LyricAnalyzer {
    pub fn new(
        sentiment: SentimentClassifier,
        chat: Arc<dyn ChatModel>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            sentiment,
            chat,
            store,
        }
    }

    /// Analyze a lyric file
    pub async fn analyze(&self, path: &Path) -> Result<AnalysisOutcome, AnalysisError> {
        self.analyze_source(LyricSource::File(path)).await
    }

    /// Analyze lyrics handed over by an earlier stage
    pub async fn analyze_artifact(&self, handle: &ArtifactHandle) -> Result<AnalysisOutcome, AnalysisError> {
        self.analyze_source(LyricSource::Artifact(handle)).await
    }

    /// The record is written once whether or not the run succeeds
    #[instrument(skip(self), fields(sentiment_model = self.sentiment.model(), chat_model = self.chat.model()))]
    pub async fn analyze_source(&self, source: LyricSource<'_>) -> Result<AnalysisOutcome, AnalysisError> {
        let path = source.path();
        let mut record = AnalysisRecord::new(path, Local::now());
        let mut state = AnalysisState::Start;

        let result = self.run(source, &mut record, &mut state).await;
        if let Err(e) = &result {
            warn!(state = ?state, error = %e, "Lyric analysis failed");
            record.error = Some(e.to_string());
        }

        let persisted = self.persist(path, &record);
        match (result, persisted) {
            (Ok(()), Ok(handle)) => {
                info!(path = ?handle.path, "Analysis saved");
                Ok(AnalysisOutcome { record, handle })
            }
            (Ok(()), Err(e)) => Err(e),
            (Err(e), Ok(handle)) => {
                info!(path = ?handle.path, "Partial analysis saved");
                Err(e)
            }
            (Err(e), Err(persist)) => {
                error!(error = %persist, "Could not save partial analysis");
                Err(e)
            }
        }
    }

    fn read(&self, source: LyricSource<'_>) -> Result<String, AnalysisError> {
        match source {
            LyricSource::File(path) => read_lyrics(path),
            LyricSource::Artifact(handle) => {
                let bytes = self.store.get(handle).map_err(AnalysisError::Load)?;
                decode_lyrics(bytes, &handle.path)
            }
        }
    }

    async fn run(
        &self,
        source: LyricSource<'_>,
        record: &mut AnalysisRecord,
        state: &mut AnalysisState,
    ) -> Result<(), AnalysisError> {
        let lyrics = lyric_text(&self.read(source)?);
        debug!(chars = lyrics.len(), "Lyrics read");
        record.original_lyrics = Some(lyrics.clone());
        *state = AnalysisState::LyricsRead;

        let sentiment = self.sentiment.classify(&lyrics).await?;
        info!(label = %sentiment.label, score = sentiment.score, "Sentiment classified");
        record.hugging_sentiment = Some(sentiment);
        *state = AnalysisState::SentimentDone;

        let response = self.chat.complete(&theme::messages(&lyrics)).await?;
        let analysis = theme::parse(&response)?;
        debug!("Thematic analysis parsed");
        record.detailed_analysis = Some(analysis);
        *state = AnalysisState::ThemeAnalysisDone;

        Ok(())
    }

    fn persist(&self, path: &Path, record: &AnalysisRecord) -> Result<ArtifactHandle, AnalysisError> {
        let body = record.to_json().map_err(AnalysisError::Encode)?;
        Ok(self
            .store
            .put(ArtifactKind::Analysis, &song_name(path), &body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{OpenAiError, SentimentError};
    use crate::openai::ChatMessage;
    use crate::sentiment::{Language, SentimentResult, TextClassifier};
    use crate::store::memory::MemoryArtifactStore;
    use async_trait::async_trait;
    use std::io::Write;

    struct FixedClassifier;

    #[async_trait]
    impl TextClassifier for FixedClassifier {
        async fn classify(&self, _model: &str, _text: &str) -> Result<Vec<SentimentResult>, SentimentError> {
            Ok(vec![SentimentResult {
                label: "POSITIVE".into(),
                score: 0.93,
            }])
        }
    }

    struct FixedChat(String);

    #[async_trait]
    impl ChatModel for FixedChat {
        fn model(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, OpenAiError> {
            Ok(self.0.clone())
        }
    }

    fn analyzer(chat: &str, store: Arc<MemoryArtifactStore>) -> LyricAnalyzer {
        LyricAnalyzer::new(
            SentimentClassifier::new(Arc::new(FixedClassifier), Language::English, 512),
            Arc::new(FixedChat(chat.to_string())),
            store,
        )
    }

    fn lyrics_file(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    fn stored_record(store: &MemoryArtifactStore) -> serde_json::Value {
        let paths = store.list(ArtifactKind::Analysis);
        assert_eq!(paths.len(), 1, "exactly one record per run");
        let handle = ArtifactHandle {
            kind: ArtifactKind::Analysis,
            id: String::new(),
            path: paths[0].clone(),
        };
        serde_json::from_slice(&store.get(&handle).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_successful_run_persists_full_record() {
        let store = Arc::new(MemoryArtifactStore::new());
        let file = lyrics_file("I walk a lonely road");
        let analyzer = analyzer(&theme::tests::sample_json().to_string(), store.clone());

        let outcome = analyzer.analyze(file.path()).await.unwrap();
        assert!(outcome.record.is_complete());

        let json = stored_record(&store);
        assert_eq!(json["hugging_sentiment"]["label"], "POSITIVE");
        assert_eq!(json["detailed_analysis"].as_object().unwrap().len(), 6);
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_failed_run_persists_then_returns_error() {
        let store = Arc::new(MemoryArtifactStore::new());
        let file = lyrics_file("I walk a lonely road");
        let analyzer = analyzer("not json at all", store.clone());

        let err = analyzer.analyze(file.path()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Unparseable { .. }));

        let json = stored_record(&store);
        assert_eq!(json["original_lyrics"], "I walk a lonely road");
        assert_eq!(json["hugging_sentiment"]["score"], 0.93);
        assert!(json.get("detailed_analysis").is_none());
        assert!(json["error"].as_str().unwrap().contains("not json at all"));
    }

    #[tokio::test]
    async fn test_unreadable_file_still_persists() {
        let store = Arc::new(MemoryArtifactStore::new());
        let analyzer = analyzer("{}", store.clone());

        let err = analyzer
            .analyze(Path::new("/nonexistent/song.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Read { .. }));

        let json = stored_record(&store);
        assert_eq!(json["input_file"], "/nonexistent/song.txt");
        assert!(json.get("original_lyrics").is_none());
    }

    #[tokio::test]
    async fn test_transcript_artifact_is_analyzed_without_timestamps() {
        let store = Arc::new(MemoryArtifactStore::new());
        let handle = store
            .put(
                ArtifactKind::Transcript,
                "song",
                b"[0.00 --> 2.10] I walk a lonely road\n[2.10 --> 4.00] the only one\n",
            )
            .unwrap();
        let analyzer = analyzer(&theme::tests::sample_json().to_string(), store.clone());

        let outcome = analyzer.analyze_artifact(&handle).await.unwrap();
        assert_eq!(
            outcome.record.original_lyrics.as_deref(),
            Some("I walk a lonely road\nthe only one")
        );
        assert_eq!(store.list(ArtifactKind::Analysis).len(), 1);
    }
}
