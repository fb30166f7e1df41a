use serde::{Deserialize, Serialize};

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a chat conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// `POST /chat/completions` body
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
}

/// `POST /chat/completions` response
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessageContent,
    #[allow(dead_code)]
    pub finish_reason: Option<String>,
}

/// Assistant message; content is null for refusals/tool calls
#[derive(Debug, Deserialize)]
pub struct ChatMessageContent {
    pub content: Option<String>,
}

/// `POST /images/generations` body
#[derive(Debug, Serialize)]
pub struct ImageRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub size: &'a str,
    pub quality: &'a str,
    pub n: u8,
}

/// `POST /images/generations` response
#[derive(Debug, Deserialize)]
pub struct ImageResponse {
    pub data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
pub struct ImageData {
    pub url: Option<String>,
    #[allow(dead_code)]
    pub revised_prompt: Option<String>,
}

/// `POST /audio/transcriptions` response with `response_format=verbose_json`
#[derive(Debug, Deserialize)]
pub struct TranscriptionResponse {
    pub language: Option<String>,
    #[allow(dead_code)]
    pub text: Option<String>,
    #[serde(default)]
    pub segments: Vec<WhisperSegment>,
}

/// Timed segment as returned by Whisper
#[derive(Debug, Deserialize)]
pub struct WhisperSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Error envelope returned by OpenAI-compatible APIs
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_shape() {
        let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("hi")];
        let body = serde_json::to_value(ChatRequest {
            model: "gpt-3.5-turbo",
            messages: &messages,
        })
        .unwrap();
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_transcription_response_parsing() {
        let json = r#"{
            "task": "transcribe",
            "language": "english",
            "duration": 8.4,
            "text": "Hello there. General Kenobi.",
            "segments": [
                {"id": 0, "seek": 0, "start": 0.0, "end": 3.2, "text": " Hello there.", "tokens": [1, 2]},
                {"id": 1, "seek": 0, "start": 3.5, "end": 8.4, "text": " General Kenobi."}
            ]
        }"#;
        let parsed: TranscriptionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.language.as_deref(), Some("english"));
        assert_eq!(parsed.segments.len(), 2);
        assert_eq!(parsed.segments[1].start, 3.5);
    }

    #[test]
    fn test_image_response_parsing() {
        let json = r#"{"created": 1, "data": [{"url": "https://img/x.png", "revised_prompt": "a sea"}]}"#;
        let parsed: ImageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.data[0].url.as_deref(), Some("https://img/x.png"));
    }

    #[test]
    fn test_api_error_parsing() {
        let json = r#"{"error": {"message": "Invalid API key", "type": "invalid_request_error"}}"#;
        let parsed: ApiErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.error.message, "Invalid API key");
    }
}
