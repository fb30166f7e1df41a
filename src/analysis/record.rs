use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::sentiment::SentimentResult;

use super::theme::ThematicAnalysis;

/// Everything one lyric-analysis run produced, success or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub timestamp: String,
    pub input_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_lyrics: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hugging_sentiment: Option<SentimentResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_analysis: Option<ThematicAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisRecord {
    pub fn new(input: &Path, now: DateTime<Local>) -> Self {
        Self {
            timestamp: now.naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            input_file: input.display().to_string(),
            original_lyrics: None,
            hugging_sentiment: None,
            detailed_analysis: None,
            error: None,
        }
    }

    /// Pretty-printed UTF-8 JSON
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    #[allow(dead_code)]
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
            && self.original_lyrics.is_some()
            && self.hugging_sentiment.is_some()
            && self.detailed_analysis.is_some()
    }
}
