//! Configuration and credentials.
//!
//! Settings come from a TOML file (explicit path, `./lyricart.toml`, or the
//! user config dir) with environment variables taking precedence for secrets.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

const LOCAL_CONFIG: &str = "lyricart.toml";

pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
pub const HF_TOKEN_ENV: &str = "HF_TOKEN";
pub const TRANSCRIPTION_URL_ENV: &str = "LYRICART_TRANSCRIPTION_URL";

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root for transcripts/, analysis_results/ and image_results/
    pub output_dir: PathBuf,
    pub openai: OpenAiConfig,
    pub transcription: TranscriptionConfig,
    pub sentiment: SentimentConfig,
}

/// Chat completion and image generation service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub image_model: String,
    pub image_size: String,
    pub image_quality: String,
    pub timeout_secs: u64,
}

/// OpenAI-compatible speech-to-text endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub base_url: String,
    /// Falls back to the OpenAI key when unset
    pub api_key: Option<String>,
}

/// Hosted text-classification inference endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    /// Token limit of the classification models; longer text keeps its prefix
    pub max_tokens: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            openai: OpenAiConfig::default(),
            transcription: TranscriptionConfig::default(),
            sentiment: SentimentConfig::default(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: String::from("https://api.openai.com/v1"),
            chat_model: String::from("gpt-3.5-turbo"),
            image_model: String::from("dall-e-3"),
            image_size: String::from("1024x1024"),
            image_quality: String::from("standard"),
            timeout_secs: 120,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("http://localhost:8000/v1"),
            api_key: None,
        }
    }
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://api-inference.huggingface.co/models"),
            api_token: None,
            max_tokens: 512,
        }
    }
}

impl Config {
    /// Load configuration, then apply environment overrides
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match Self::locate(explicit) {
            Some(path) => Self::from_file(&path)?,
            None => {
                debug!("No config file found, using defaults");
                Config::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = ?path, "Loaded config");
        Ok(config)
    }

    fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        let local = PathBuf::from(LOCAL_CONFIG);
        if local.is_file() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("lyricart").join("config.toml"))
            .filter(|p| p.is_file())
    }

    /// Environment variables win over file values
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(key) = var(OPENAI_KEY_ENV).filter(|k| !k.is_empty()) {
            self.openai.api_key = Some(key);
        }
        if let Some(token) = var(HF_TOKEN_ENV).filter(|t| !t.is_empty()) {
            self.sentiment.api_token = Some(token);
        }
        if let Some(url) = var(TRANSCRIPTION_URL_ENV).filter(|u| !u.is_empty()) {
            self.transcription.base_url = url;
        }
    }

    pub fn openai_key(&self) -> Result<&str, ConfigError> {
        self.openai
            .api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential {
                env: OPENAI_KEY_ENV,
                key: "openai.api_key",
            })
    }

    /// Transcription key, falling back to the OpenAI key
    pub fn transcription_key(&self) -> Option<&str> {
        self.transcription
            .api_key
            .as_deref()
            .or(self.openai.api_key.as_deref())
    }

    pub fn hf_token(&self) -> Result<&str, ConfigError> {
        self.sentiment
            .api_token
            .as_deref()
            .ok_or(ConfigError::MissingCredential {
                env: HF_TOKEN_ENV,
                key: "sentiment.api_token",
            })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.openai.timeout_secs)
    }
}
