use std::path::PathBuf;

use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum LyricArtError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Unknown mode '{0}' (expected lyrical, instrumental or hybrid)")]
    UnknownMode(String),

    #[error("Unknown model '{0}' (expected tiny, base, small, medium, large or turbo)")]
    UnknownModel(String),

    #[error("Depth must be between 1 and 4, got {0}")]
    InvalidDepth(u8),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transcription failed: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("Lyric analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Prompt generation failed: {0}")]
    Prompt(#[from] PromptError),

    #[error("{0}")]
    Image(#[from] ImageError),

    #[error("Audio processing error: {0}")]
    Audio(#[from] AudioError),

    #[error("Artifact store error: {0}")]
    Store(#[from] StoreError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("Failed to encode output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No {0} service configured")]
    ServiceUnavailable(&'static str),

    #[error("Failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors talking to the OpenAI-compatible HTTP API
#[derive(Error, Debug)]
pub enum OpenAiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Response contained no {0}")]
    EmptyResponse(&'static str),
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Missing credential: set {env} or `{key}` in the config file")]
    MissingCredential {
        env: &'static str,
        key: &'static str,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Speech-to-text errors
#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("Speech-to-text service error: {0}")]
    Service(#[from] OpenAiError),

    #[error("Segment {index} is invalid: {reason}")]
    InvalidSegment { index: usize, reason: String },

    #[error("Malformed transcript line {line}: {content}")]
    MalformedLine { line: usize, content: String },

    #[error("Failed to store transcript: {0}")]
    Store(#[from] StoreError),
}

/// Sentiment classification errors
#[derive(Error, Debug)]
pub enum SentimentError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Classifier returned no labels")]
    NoLabels,
}

/// Lyric analysis errors
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to read lyrics {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Lyrics {0} are neither UTF-8 nor Windows-1252 text")]
    Encoding(PathBuf),

    #[error("Error in sentiment analysis: {0}")]
    Sentiment(#[from] SentimentError),

    #[error("Error in GPT analysis: {0}")]
    Chat(#[from] OpenAiError),

    #[error("Error in GPT analysis: response is not valid JSON ({reason}); raw response: {raw}")]
    Unparseable { reason: String, raw: String },

    #[error("Error in GPT analysis: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to load lyrics artifact: {0}")]
    Load(#[source] StoreError),

    #[error("Failed to encode analysis record: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to persist analysis record: {0}")]
    Persist(#[from] StoreError),
}

/// Thematic analysis schema violations
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("expected a JSON object, got {0}")]
    NotAnObject(String),

    #[error("missing keys {missing:?}, unexpected keys {extra:?}")]
    Keys {
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("key '{0}' must be a string")]
    NotAString(String),
}

/// Art prompt generation errors
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("No inputs: at least one of lyrics, sentiment, analysis or instrumental features is required")]
    NoInputs,

    #[error("Error in prompt generation: {0}")]
    Chat(#[from] OpenAiError),

    #[error("Error in prompt generation: {reason}; raw response: {raw}")]
    Unparseable { reason: String, raw: String },
}

/// Image generation errors
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Error in image generation: {0}")]
    Generation(String),

    #[error("Failed to store image: {0}")]
    Store(#[from] StoreError),
}

/// Audio processing errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Audio too short for analysis (need at least {0} samples)")]
    AudioTooShort(usize),

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("Spectrogram render failed: {0}")]
    Render(String),

    #[error("Feature extraction task failed: {0}")]
    Task(String),
}

/// Artifact store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact not found: {0}")]
    NotFound(String),
}

/// Evaluation tooling errors
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Folder {0} does not exist")]
    MissingFolder(PathBuf),

    #[error("Result file {0} does not exist")]
    MissingResult(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid corpus JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result type alias for lyricart operations
pub type Result<T> = std::result::Result<T, LyricArtError>;

impl LyricArtError {
    /// Errors raised before any stage ran; nothing was written to disk
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            LyricArtError::FileNotFound(_)
                | LyricArtError::UnknownMode(_)
                | LyricArtError::UnknownModel(_)
                | LyricArtError::InvalidDepth(_)
                | LyricArtError::Config(ConfigError::MissingCredential { .. })
                | LyricArtError::Prompt(PromptError::NoInputs)
        )
    }
}
