use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{AnalysisError, ValidationError};
use crate::openai::ChatMessage;

/// Keys of the structured literary analysis, in presentation order
pub const KEYS: [&str; 6] = [
    "major_themes_and_motifs",
    "emotional_undertones",
    "notable_imagery_and_metaphors",
    "cultural_or_historical_references",
    "key_symbols_and_their_significance",
    "overall_tone_and_atmosphere",
];

const SYSTEM: &str = "You are a literary expert specialized in analyzing lyrics and poetry. \
Provide deep, insightful analysis while maintaining objectivity.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThematicAnalysis {
    pub major_themes_and_motifs: String,
    pub emotional_undertones: String,
    pub notable_imagery_and_metaphors: String,
    pub cultural_or_historical_references: String,
    pub key_symbols_and_their_significance: String,
    pub overall_tone_and_atmosphere: String,
}

impl ThematicAnalysis {
    /// `(key, value)` pairs in `KEYS` order
    pub fn entries(&self) -> [(&'static str, &str); 6] {
        [
            (KEYS[0], &self.major_themes_and_motifs),
            (KEYS[1], &self.emotional_undertones),
            (KEYS[2], &self.notable_imagery_and_metaphors),
            (KEYS[3], &self.cultural_or_historical_references),
            (KEYS[4], &self.key_symbols_and_their_significance),
            (KEYS[5], &self.overall_tone_and_atmosphere),
        ]
    }
}

/// Chat messages requesting the analysis of `lyrics`
pub fn messages(lyrics: &str) -> Vec<ChatMessage> {
    let prompt = format!(
        "Analyze the following lyrics deeply and provide a structured analysis:

Lyrics:
{lyrics}

Please provide:
1. Major themes and motifs
2. Emotional undertones
3. Notable imagery and metaphors
4. Cultural or historical references
5. Key symbols and their significance
6. Overall tone and atmosphere

Format the response as a JSON object with exactly these keys, each mapped to a string:
{keys}
Make the analysis rich and specific, but keep each point concise.",
        keys = KEYS.join(", ")
    );

    vec![ChatMessage::system(SYSTEM), ChatMessage::user(prompt)]
}

/// Parse a chat response, retrying once with control whitespace collapsed
pub fn parse(raw: &str) -> Result<ThematicAnalysis, AnalysisError> {
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(first) => {
            debug!(error = %first, "Strict parse failed, collapsing whitespace");
            serde_json::from_str::<Value>(&collapse_control_whitespace(raw)).map_err(|e| {
                AnalysisError::Unparseable {
                    reason: e.to_string(),
                    raw: raw.to_string(),
                }
            })?
        }
    };

    Ok(validate(&value)?)
}

/// Require exactly the six string-valued keys
pub fn validate(value: &Value) -> Result<ThematicAnalysis, ValidationError> {
    let object = value
        .as_object()
        .ok_or_else(|| ValidationError::NotAnObject(kind_of(value).to_string()))?;

    let missing: Vec<String> = KEYS
        .iter()
        .filter(|k| !object.contains_key(**k))
        .map(|k| k.to_string())
        .collect();
    let mut extra: Vec<String> = object
        .keys()
        .filter(|k| !KEYS.contains(&k.as_str()))
        .cloned()
        .collect();
    extra.sort();

    if !missing.is_empty() || !extra.is_empty() {
        return Err(ValidationError::Keys { missing, extra });
    }

    let field = |key: &str| -> Result<String, ValidationError> {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ValidationError::NotAString(key.to_string()))
    };

    Ok(ThematicAnalysis {
        major_themes_and_motifs: field(KEYS[0])?,
        emotional_undertones: field(KEYS[1])?,
        notable_imagery_and_metaphors: field(KEYS[2])?,
        cultural_or_historical_references: field(KEYS[3])?,
        key_symbols_and_their_significance: field(KEYS[4])?,
        overall_tone_and_atmosphere: field(KEYS[5])?,
    })
}

/// Replace each run of `\n`, `\r`, `\t` with one space
fn collapse_control_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_run = false;
    for c in raw.chars() {
        if matches!(c, '\n' | '\r' | '\t') {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
