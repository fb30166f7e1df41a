use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::{ConfigError, SentimentError};

const USER_AGENT: &str = concat!("lyricart/", env!("CARGO_PKG_VERSION"));

/// Best label with its confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: String,
    pub score: f64,
}

/// Lyric language, selects the classification model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    English,
    Arabic,
    #[default]
    Other,
}

impl Language {
    /// Map an ISO code or language name; unknown and absent map to `Other`
    pub fn from_code(code: Option<&str>) -> Self {
        match code.map(|c| c.trim().to_ascii_lowercase()).as_deref() {
            Some("en" | "english") => Language::English,
            Some("ar" | "arabic") => Language::Arabic,
            _ => Language::Other,
        }
    }

    pub fn model(&self) -> &'static str {
        match self {
            Language::English => "distilbert-base-uncased-finetuned-sst-2-english",
            Language::Arabic => "PRAli22/AraBert-Arabic-Sentiment-Analysis",
            Language::Other => "distilbert-base-multilingual-cased",
        }
    }
}

/// Hosted text-classification model
#[async_trait]
pub trait TextClassifier: Send + Sync {
    /// All labels the model produced for `text`
    async fn classify(&self, model: &str, text: &str) -> Result<Vec<SentimentResult>, SentimentError>;
}

/// Hugging Face inference API client
pub struct HuggingFaceClassifier {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    options: InferenceOptions,
}

#[derive(Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

/// Pipelines answer either per-input nested lists or a flat list
#[derive(Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<SentimentResult>>),
    Flat(Vec<SentimentResult>),
}

impl HuggingFaceClassifier {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let token = config.hf_token()?.to_string();
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.sentiment.base_url.trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait]
impl TextClassifier for HuggingFaceClassifier {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn classify(&self, model: &str, text: &str) -> Result<Vec<SentimentResult>, SentimentError> {
        let url = format!("{}/{}", self.base_url, model);
        debug!(url, "Classifying");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&InferenceRequest {
                inputs: text,
                options: InferenceOptions {
                    wait_for_model: true,
                },
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "Classification request failed");
            return Err(SentimentError::HttpStatus { status, body });
        }

        Ok(match response.json::<InferenceResponse>().await? {
            InferenceResponse::Nested(outer) => outer.into_iter().flatten().collect(),
            InferenceResponse::Flat(labels) => labels,
        })
    }
}

/// `[CLS]` and `[SEP]` added by the model's tokenizer
const SPECIAL_TOKENS: usize = 2;

/// Whitespace words that fit under a `max_tokens` subword limit
///
/// WordPiece splits lyrics into roughly 1.3 (English) to 1.7 (Arabic) tokens
/// per word, so three words are kept for every five tokens.
pub fn word_budget(max_tokens: usize) -> usize {
    max_tokens.saturating_sub(SPECIAL_TOKENS) * 3 / 5
}

/// Language-bound sentiment classifier
pub struct SentimentClassifier {
    backend: Arc<dyn TextClassifier>,
    language: Language,
    max_words: usize,
}

impl SentimentClassifier {
    pub fn new(backend: Arc<dyn TextClassifier>, language: Language, max_tokens: usize) -> Self {
        let max_words = word_budget(max_tokens);
        debug!(model = language.model(), max_tokens, max_words, "Sentiment classifier ready");
        Self {
            backend,
            language,
            max_words,
        }
    }

    pub fn model(&self) -> &'static str {
        self.language.model()
    }

    /// Classify `text`, keeping only the prefix that fits the model's token limit
    pub async fn classify(&self, text: &str) -> Result<SentimentResult, SentimentError> {
        let input = truncate_words(text, self.max_words);
        if input.len() < text.len() {
            debug!(kept = input.len(), total = text.len(), "Truncated lyrics for classification");
        }

        self.backend
            .classify(self.model(), input)
            .await?
            .into_iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .ok_or(SentimentError::NoLabels)
    }
}

/// Prefix of `text` holding at most `max_words` whitespace-separated words
pub fn truncate_words(text: &str, max_words: usize) -> &str {
    if max_words == 0 {
        return "";
    }

    let mut count = 0;
    let mut in_token = false;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if in_token && count == max_words {
                return &text[..i];
            }
            in_token = false;
        } else if !in_token {
            in_token = true;
            count += 1;
        }
    }
    text
}
