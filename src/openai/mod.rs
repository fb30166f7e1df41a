mod client;
mod types;

pub use client::OpenAiClient;
pub use types::ChatMessage;

use async_trait::async_trait;

use crate::error::OpenAiError;

/// Chat-completion service
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for logs
    fn model(&self) -> &str;

    /// Run one completion and return the assistant text
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, OpenAiError>;
}

/// Image-generation service
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Request one image; returns the URL of the generated asset
    async fn generate(&self, prompt: &str) -> Result<String, OpenAiError>;

    /// Fetch a generated asset
    async fn download(&self, url: &str) -> Result<Vec<u8>, OpenAiError>;
}
