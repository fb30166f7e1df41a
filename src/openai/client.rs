use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::{Config, OpenAiConfig};
use crate::error::{ConfigError, OpenAiError};
use crate::transcribe::{ModelSize, RawSegment, RawTranscription, Transcriber};

use super::types::*;
use super::{ChatModel, ImageBackend};

const USER_AGENT: &str = concat!("lyricart/", env!("CARGO_PKG_VERSION"));

/// Client for an OpenAI-compatible REST API
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    chat_model: String,
    image_model: String,
    image_size: String,
    image_quality: String,
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        let defaults = OpenAiConfig::default();
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            chat_model: defaults.chat_model,
            image_model: defaults.image_model,
            image_size: defaults.image_size,
            image_quality: defaults.image_quality,
        })
    }

    /// Chat + image client; requires the OpenAI key
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let key = config.openai_key()?.to_string();
        let mut client = Self::new(&config.openai.base_url, Some(key), config.timeout())?;
        client.chat_model = config.openai.chat_model.clone();
        client.image_model = config.openai.image_model.clone();
        client.image_size = config.openai.image_size.clone();
        client.image_quality = config.openai.image_quality.clone();
        Ok(client)
    }

    /// Speech-to-text client against the transcription endpoint
    pub fn for_transcription(config: &Config) -> Result<Self, ConfigError> {
        Self::new(
            &config.transcription.base_url,
            config.transcription_key().map(str::to_string),
            config.timeout(),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Turn a non-2xx response into an error carrying the API message
    async fn check_status(response: Response) -> Result<Response, OpenAiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str::<ApiErrorResponse>(&text)
            .map(|e| e.error.message)
            .unwrap_or(text);
        warn!(%status, body = %body, "API request failed");
        Err(OpenAiError::HttpStatus { status, body })
    }

    /// POST a JSON body and parse the JSON response
    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, OpenAiError> {
        let url = self.url(path);
        debug!(url, "Posting");

        let response = self.authorized(self.client.post(&url)).json(body).send().await?;
        let response = Self::check_status(response).await?;

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    fn model(&self) -> &str {
        &self.chat_model
    }

    #[instrument(skip(self, messages), fields(model = %self.chat_model))]
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, OpenAiError> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages,
        };
        let response: ChatResponse = self.post_json("chat/completions", &request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(OpenAiError::EmptyResponse("message content"))?;

        debug!(chars = content.len(), "Chat completion received");
        Ok(content)
    }
}

#[async_trait]
impl ImageBackend for OpenAiClient {
    #[instrument(skip(self, prompt), fields(model = %self.image_model))]
    async fn generate(&self, prompt: &str) -> Result<String, OpenAiError> {
        let request = ImageRequest {
            model: &self.image_model,
            prompt,
            size: &self.image_size,
            quality: &self.image_quality,
            n: 1,
        };
        let response: ImageResponse = self.post_json("images/generations", &request).await?;

        let url = response
            .data
            .into_iter()
            .find_map(|d| d.url)
            .ok_or(OpenAiError::EmptyResponse("image URL"))?;

        debug!(url = %url, "Image generated");
        Ok(url)
    }

    #[instrument(skip(self))]
    async fn download(&self, url: &str) -> Result<Vec<u8>, OpenAiError> {
        let response = self.client.get(url).send().await?;
        let response = Self::check_status(response).await?;

        let mut stream = response.bytes_stream();
        let mut buffer = Vec::new();
        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
        }

        if buffer.is_empty() {
            return Err(OpenAiError::EmptyResponse("image data"));
        }

        debug!(bytes = buffer.len(), "Download complete");
        Ok(buffer)
    }
}

#[async_trait]
impl Transcriber for OpenAiClient {
    #[instrument(skip(self), fields(model = model.as_str()))]
    async fn transcribe(&self, audio: &Path, model: ModelSize) -> Result<RawTranscription, OpenAiError> {
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("audio"));
        debug!(bytes = bytes.len(), file_name, "Uploading audio");

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("model", model.as_str())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment");

        let response = self
            .authorized(self.client.post(self.url("audio/transcriptions")))
            .multipart(form)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        let parsed: TranscriptionResponse = serde_json::from_slice(&response.bytes().await?)?;

        debug!(
            language = ?parsed.language,
            segments = parsed.segments.len(),
            "Transcription received"
        );

        Ok(RawTranscription {
            language: parsed.language,
            segments: parsed
                .segments
                .into_iter()
                .map(|s| RawSegment {
                    start: s.start,
                    end: s.end,
                    text: s.text,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let client =
            OpenAiClient::new("https://api.openai.com/v1/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.url("chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = Config::default();
        assert!(matches!(
            OpenAiClient::from_config(&config),
            Err(ConfigError::MissingCredential { .. })
        ));
    }

    #[test]
    fn test_from_config_uses_models() {
        let mut config = Config::default();
        config.openai.api_key = Some("sk-test".into());
        config.openai.chat_model = "gpt-4o-mini".into();
        let client = OpenAiClient::from_config(&config).unwrap();
        assert_eq!(ChatModel::model(&client), "gpt-4o-mini");
        assert_eq!(client.image_size, "1024x1024");
    }
}
