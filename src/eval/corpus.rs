//! Reference lyrics and transcription results on disk

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::error::EvalError;

/// Header lines of a reference file: the source link and a blank line
const HEADER_LINES: usize = 2;

fn strip_punctuation(line: &str) -> String {
    line.chars().filter(|c| !matches!(c, '.' | ',' | '!' | '?')).collect()
}

/// Reference lyrics as one line of words
pub fn clean_reference(text: &str) -> String {
    text.lines()
        .skip(HEADER_LINES)
        .map(|line| strip_punctuation(line).trim().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strips bracketed timestamps and punctuation from transcription results
pub struct ResultCleaner {
    brackets: Regex,
}

impl ResultCleaner {
    pub fn new() -> Result<Self, EvalError> {
        Ok(Self {
            brackets: Regex::new(r"\[.*?\]")?,
        })
    }

    pub fn clean(&self, text: &str) -> String {
        text.lines()
            .map(|line| {
                let line = self.brackets.replace_all(line, "");
                strip_punctuation(&line).trim().to_string()
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Every `.txt` reference in `folder`, keyed by song name
pub fn load_references(folder: &Path) -> Result<BTreeMap<String, String>, EvalError> {
    if !folder.is_dir() {
        return Err(EvalError::MissingFolder(folder.to_path_buf()));
    }

    let mut songs = BTreeMap::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(song) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(".txt"))
        else {
            continue;
        };

        let text = std::fs::read_to_string(&path)?;
        songs.insert(song.to_string(), clean_reference(&text));
    }

    debug!(count = songs.len(), folder = ?folder, "References loaded");
    Ok(songs)
}

/// `<results>/<song>_(<model>).txt`
pub fn result_path(results: &Path, song: &str, model: &str) -> PathBuf {
    results.join(format!("{}_({}).txt", song, model))
}

/// Cleaned transcription of `song` by `model`
pub fn load_result(cleaner: &ResultCleaner, results: &Path, song: &str, model: &str) -> Result<String, EvalError> {
    let path = result_path(results, song, model);
    let text = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => EvalError::MissingResult(path.clone()),
        _ => EvalError::Io(e),
    })?;
    Ok(cleaner.clean(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_reference_skips_header() {
        let text = "https://youtu.be/abc\n\nHello, world!\nIs it me?\n";
        assert_eq!(clean_reference(text), "Hello world Is it me");
    }

    #[test]
    fn test_clean_result_strips_timestamps() {
        let cleaner = ResultCleaner::new().unwrap();
        let text = "[0.00 --> 2.50] Hello, world!\n[2.50 --> 4.00] Is it me?\n";
        assert_eq!(cleaner.clean(text), "Hello world Is it me");
    }

    #[test]
    fn test_load_references() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("B - Two.txt"), "link\n\nsecond song\n").unwrap();
        std::fs::write(dir.path().join("A - One.txt"), "link\n\nfirst. song\n").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let refs = load_references(dir.path()).unwrap();
        assert_eq!(refs.keys().collect::<Vec<_>>(), vec!["A - One", "B - Two"]);
        assert_eq!(refs["A - One"], "first song");
    }

    #[test]
    fn test_missing_folder_and_result() {
        assert!(matches!(
            load_references(Path::new("/nonexistent/originals")),
            Err(EvalError::MissingFolder(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let cleaner = ResultCleaner::new().unwrap();
        let err = load_result(&cleaner, dir.path(), "A - One", "small").unwrap_err();
        match err {
            EvalError::MissingResult(path) => {
                assert!(path.ends_with("A - One_(small).txt"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
