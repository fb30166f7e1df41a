use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::analysis::ThematicAnalysis;
use crate::audio::InstrumentalFeatures;
use crate::error::PromptError;
use crate::openai::{ChatMessage, ChatModel};
use crate::sentiment::SentimentResult;

/// Longest `main_prompt` handed to the image model
pub const MAX_PROMPT_CHARS: usize = 400;

const SYSTEM: &str =
    "You are an expert at creating artistic prompts that capture the essence of literary works.";

/// Image-generation prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtPrompt {
    pub main_prompt: String,
    pub style_suggestions: Vec<String>,
    pub color_palette: Vec<String>,
    pub key_elements: Vec<String>,
}

/// Whatever earlier stages produced
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptInputs<'a> {
    pub lyrics: Option<&'a str>,
    pub sentiment: Option<&'a SentimentResult>,
    pub analysis: Option<&'a ThematicAnalysis>,
    pub instrumental: Option<&'a InstrumentalFeatures>,
}

impl PromptInputs<'_> {
    pub fn is_empty(&self) -> bool {
        self.lyrics.map_or(true, |l| l.trim().is_empty())
            && self.sentiment.is_none()
            && self.analysis.is_none()
            && self.instrumental.is_none()
    }

    /// Instruction embedding every present input; absent ones leave empty sections
    pub fn instruction(&self) -> String {
        let lyrical = self
            .analysis
            .map(|a| {
                let body: Vec<String> = a.entries().iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                format!("Lyrical Analysis:\n{}", body.join("\n"))
            })
            .unwrap_or_default();
        let instrumental = self
            .instrumental
            .map(|f| format!("Instrumental Analysis:\n{}", f.describe()))
            .unwrap_or_default();
        let sentiment = self
            .sentiment
            .map(|s| format!("Sentiment:\n{} ({:.2})", s.label, s.score))
            .unwrap_or_default();
        let lyrics = self
            .lyrics
            .filter(|l| !l.trim().is_empty())
            .map(|l| format!("Original Lyrics:\n{}", l))
            .unwrap_or_default();

        format!(
            "Based on this analysis, create an artistic prompt for DALL-E.

{lyrical}
{instrumental}
{sentiment}
{lyrics}

Create a detailed, vivid prompt that:
1. Captures the essence and emotion of the lyrics or music
2. Incorporates major themes and imagery
3. Suggests specific visual elements, colors, and composition
4. Maintains artistic cohesion
5. Includes style suggestions (e.g., realistic, surreal, abstract)

Important: Create a prompt that's optimized for DALL-E image generation.
Keep it clear, specific, and under {MAX_PROMPT_CHARS} characters.
Focus on visual elements and artistic style.
Avoid abstract concepts that can't be visualized.

Format the response as a JSON object with exactly these keys:
- main_prompt: the primary prompt text (optimized for DALL-E)
- style_suggestions: list of artistic style recommendations
- color_palette: suggested colors that match the emotional tone
- key_elements: list of important visual elements to include"
        )
    }
}

/// Turns analysis into an image prompt via a chat model
pub struct PromptSynthesizer {
    chat: Arc<dyn ChatModel>,
}

impl PromptSynthesizer {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }

    #[instrument(skip_all, fields(model = self.chat.model()))]
    pub async fn synthesize(&self, inputs: &PromptInputs<'_>) -> Result<ArtPrompt, PromptError> {
        if inputs.is_empty() {
            return Err(PromptError::NoInputs);
        }

        let messages = [ChatMessage::system(SYSTEM), ChatMessage::user(inputs.instruction())];
        let raw = self.chat.complete(&messages).await?;

        let mut prompt: ArtPrompt =
            serde_json::from_str(&raw).map_err(|e| PromptError::Unparseable {
                reason: e.to_string(),
                raw: raw.clone(),
            })?;

        let chars = prompt.main_prompt.chars().count();
        if chars > MAX_PROMPT_CHARS {
            warn!(chars, "Main prompt too long, clipping");
            prompt.main_prompt = clip_at_word(&prompt.main_prompt, MAX_PROMPT_CHARS);
        }

        info!(
            chars = prompt.main_prompt.chars().count(),
            styles = prompt.style_suggestions.len(),
            "Art prompt ready"
        );
        debug!(prompt = %prompt.main_prompt);
        Ok(prompt)
    }
}

/// At most `max` chars, cut at the last whitespace when there is one
pub fn clip_at_word(text: &str, max: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max) else {
        return text.to_string();
    };

    let head = &text[..cut];
    let end = match text[cut..].chars().next() {
        // Already on a boundary
        Some(c) if c.is_whitespace() => head.len(),
        _ => head.rfind(char::is_whitespace).unwrap_or(head.len()),
    };
    head[..end].trim_end().to_string()
}
