//! Transcription quality tooling
mod corpus;
mod import;
mod wer;

pub use corpus::{load_references, load_result, ResultCleaner};
pub use import::import_corpus;
pub use wer::{char_error_rate, word_error_rate};

use std::fmt;
use std::path::Path;

use tracing::{info, instrument};

use crate::error::EvalError;

/// Error rates of one model on one song
#[derive(Debug, Clone, PartialEq)]
pub struct EvalScore {
    pub song: String,
    pub model: String,
    pub wer: f64,
    pub cer: f64,
}

impl fmt::Display for EvalScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) ---> WER: {:.2}, CER: {:.2}",
            self.song, self.model, self.wer, self.cer
        )
    }
}

/// Score every reference song against each model's transcription, sorted by song
#[instrument(skip(models))]
pub fn evaluate(originals: &Path, results: &Path, models: &[String]) -> Result<Vec<EvalScore>, EvalError> {
    let references = load_references(originals)?;
    let cleaner = ResultCleaner::new()?;

    let mut scores = Vec::with_capacity(references.len() * models.len());
    for (song, reference) in &references {
        for model in models {
            let hypothesis = load_result(&cleaner, results, song, model)?;
            scores.push(EvalScore {
                song: song.clone(),
                model: model.clone(),
                wer: word_error_rate(reference, &hypothesis),
                cer: char_error_rate(reference, &hypothesis),
            });
        }
    }

    info!(songs = references.len(), models = models.len(), "Evaluation complete");
    Ok(scores)
}
